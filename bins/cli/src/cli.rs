use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "bucketbus",
    about = "Message bus attachments and subscriptions in an object store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Read the S3 connection string from this file instead of the
    /// configuration files. Falls back to BUCKETBUS_S3_CONNECTIONINFO.
    #[arg(long, global = true, value_name = "FILE")]
    pub connection_info: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Store a file as an attachment
    Save(SaveArgs),
    /// Fetch an attachment payload
    Read(ReadArgs),
    /// Show the metadata of an attachment
    Metadata(IdArgs),
    /// List the subscribers of a topic
    Subscribers(TopicArgs),
    /// Subscribe an address to a topic
    Subscribe(SubscriptionArgs),
    /// Unsubscribe an address from a topic
    Unsubscribe(SubscriptionArgs),
    /// Remove every subscription
    PurgeSubscriptions,
}

#[derive(Args, Debug)]
pub struct SaveArgs {
    /// Attachment id
    pub id: String,
    /// File holding the payload
    pub file: PathBuf,
    /// Metadata entry, repeatable
    #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub metadata: Vec<(String, String)>,
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Attachment id
    pub id: String,
    /// Write the payload here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct IdArgs {
    /// Attachment id
    pub id: String,
}

#[derive(Args, Debug)]
pub struct TopicArgs {
    pub topic: String,
}

#[derive(Args, Debug)]
pub struct SubscriptionArgs {
    pub topic: String,
    /// Subscriber address, e.g. queue@machine
    pub address: String,
}

/// Split `KEY=VALUE` on the first `=`.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))
}
