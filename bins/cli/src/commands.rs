use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::Context;
use bucketbus_core::{AttachmentStore, OpendalClientFactory, SubscriptionStore};
use bucketbus_shared::{
    AppConfig, AttachmentOptions, ConnectionInfo, StorageProvider, SubscriptionOptions,
};
use tracing::info;

use crate::cli::{Cli, Command, IdArgs, OutputFormat, ReadArgs, SaveArgs, SubscriptionArgs, TopicArgs};

/// Where the stores live, from config files or a connection string.
struct Settings {
    provider: StorageProvider,
    attachments: AttachmentOptions,
    subscriptions: SubscriptionOptions,
}

impl Settings {
    fn load(connection_info: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = connection_info {
            let info = ConnectionInfo::load(path)?;
            return Ok(Self {
                provider: info.provider(),
                attachments: info.attachment_options()?,
                subscriptions: SubscriptionOptions::default(),
            });
        }

        let config = AppConfig::load()?;
        Ok(Self {
            provider: config.storage,
            attachments: config.attachments,
            subscriptions: config.subscriptions,
        })
    }

    fn factory(&self) -> OpendalClientFactory {
        OpendalClientFactory::new(self.provider.clone())
    }

    async fn attachments(&self) -> anyhow::Result<AttachmentStore<OpendalClientFactory>> {
        Ok(AttachmentStore::new(self.factory(), self.attachments.clone()).await?)
    }

    fn subscriptions(&self) -> anyhow::Result<SubscriptionStore<OpendalClientFactory>> {
        Ok(SubscriptionStore::new(
            self.factory(),
            self.subscriptions.clone(),
        )?)
    }
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load(cli.connection_info.as_deref())?;
    info!(provider = settings.provider.name(), "Using object store");

    match cli.command {
        Command::Save(args) => cmd_save(&settings, args).await,
        Command::Read(args) => cmd_read(&settings, args).await,
        Command::Metadata(args) => cmd_metadata(&settings, args, cli.format).await,
        Command::Subscribers(args) => cmd_subscribers(&settings, args, cli.format).await,
        Command::Subscribe(args) => cmd_subscribe(&settings, args).await,
        Command::Unsubscribe(args) => cmd_unsubscribe(&settings, args).await,
        Command::PurgeSubscriptions => cmd_purge(&settings).await,
    }
}

async fn cmd_save(settings: &Settings, args: SaveArgs) -> anyhow::Result<()> {
    let file = tokio::fs::File::open(&args.file)
        .await
        .with_context(|| format!("could not open {}", args.file.display()))?;
    let metadata: HashMap<String, String> = args.metadata.into_iter().collect();

    let store = settings.attachments().await?;
    store.save(&args.id, file, Some(metadata)).await?;

    info!(id = %args.id, "Attachment saved");
    Ok(())
}

async fn cmd_read(settings: &Settings, args: ReadArgs) -> anyhow::Result<()> {
    let store = settings.attachments().await?;
    let mut reader = store.read(&args.id).await?;

    let bytes = match &args.output {
        Some(path) => {
            let mut file = tokio::fs::File::create(path)
                .await
                .with_context(|| format!("could not create {}", path.display()))?;
            tokio::io::copy(&mut reader, &mut file).await?
        }
        None => tokio::io::copy(&mut reader, &mut tokio::io::stdout()).await?,
    };

    info!(id = %args.id, bytes, "Attachment read");
    Ok(())
}

async fn cmd_metadata(
    settings: &Settings,
    args: IdArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let store = settings.attachments().await?;
    let metadata: BTreeMap<String, String> =
        store.read_metadata(&args.id).await?.into_iter().collect();

    match format {
        OutputFormat::Text => {
            for (key, value) in &metadata {
                println!("{key}: {value}");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&metadata)?),
    }
    Ok(())
}

async fn cmd_subscribers(
    settings: &Settings,
    args: TopicArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let store = settings.subscriptions()?;
    let addresses = store.get_subscriber_addresses(&args.topic).await?;

    match format {
        OutputFormat::Text => {
            for address in &addresses {
                println!("{address}");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&addresses)?),
    }
    Ok(())
}

async fn cmd_subscribe(settings: &Settings, args: SubscriptionArgs) -> anyhow::Result<()> {
    settings
        .subscriptions()?
        .register_subscriber(&args.topic, &args.address)
        .await?;
    Ok(())
}

async fn cmd_unsubscribe(settings: &Settings, args: SubscriptionArgs) -> anyhow::Result<()> {
    settings
        .subscriptions()?
        .unregister_subscriber(&args.topic, &args.address)
        .await?;
    Ok(())
}

async fn cmd_purge(settings: &Settings) -> anyhow::Result<()> {
    let removed = settings.subscriptions()?.purge().await?;
    println!("Removed {removed} subscriptions");
    Ok(())
}
