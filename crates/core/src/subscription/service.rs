//! Subscription store implementation.

use bucketbus_shared::{BusError, BusResult, SubscriptionOptions};
use futures::{StreamExt, stream};
use tracing::{debug, info};

use crate::fault::translate;
use crate::storage::{ClientFactory, ObjectClient, ObjectHeaders, ensure_bucket};

/// Keeps topic subscribers as objects in one bucket.
pub struct SubscriptionStore<F: ClientFactory> {
    factory: F,
    options: SubscriptionOptions,
}

impl<F: ClientFactory> SubscriptionStore<F> {
    /// Create a store over the bucket named in `options`.
    ///
    /// The bucket is provisioned lazily, on each operation, when
    /// `auto_create_bucket` is set.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the bucket name is blank.
    pub fn new(factory: F, options: SubscriptionOptions) -> BusResult<Self> {
        options.validate()?;
        Ok(Self { factory, options })
    }

    /// Options this store was built with.
    #[must_use]
    pub fn options(&self) -> &SubscriptionOptions {
        &self.options
    }

    /// All nodes share the index.
    #[must_use]
    pub const fn is_centralized(&self) -> bool {
        true
    }

    async fn connect(&self) -> BusResult<F::Client> {
        let bucket = &self.options.bucket_name;
        let client = self
            .factory
            .connect(bucket)
            .map_err(|e| translate(e, "connect to bucket", bucket))?;

        if self.options.auto_create_bucket {
            ensure_bucket(&client)
                .await
                .map_err(|e| translate(e, "provision bucket", bucket))?;
        }
        Ok(client)
    }

    /// Addresses subscribed to `topic`, in listing order.
    ///
    /// # Errors
    ///
    /// Returns an error if the topic is empty or contains `/`, or if the
    /// bucket cannot be listed.
    pub async fn get_subscriber_addresses(&self, topic: &str) -> BusResult<Vec<String>> {
        let prefix = topic_prefix(topic)?;
        let client = self.connect().await?;

        let keys = client
            .list(&prefix)
            .await
            .map_err(|e| translate(e, "list subscribers of topic", topic))?;

        Ok(keys
            .into_iter()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .filter(|address| !address.is_empty())
            .collect())
    }

    /// Subscribe `address` to `topic`. Registering twice has no further effect.
    ///
    /// # Errors
    ///
    /// Returns an error if the topic is empty or contains `/`, if the address
    /// is empty, or if the store fails.
    pub async fn register_subscriber(&self, topic: &str, address: &str) -> BusResult<()> {
        let key = subscription_key(topic, address)?;
        let client = self.connect().await?;

        client
            .put(&key, stream::empty().boxed(), ObjectHeaders::new())
            .await
            .map_err(|e| translate(e, "register subscriber", &key))?;

        info!(topic, address, "Subscriber registered");
        Ok(())
    }

    /// Unsubscribe `address` from `topic`. Unknown subscribers are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the topic is empty or contains `/`, if the address
    /// is empty, or if the store fails.
    pub async fn unregister_subscriber(&self, topic: &str, address: &str) -> BusResult<()> {
        let key = subscription_key(topic, address)?;
        let client = self.connect().await?;

        let exists = client
            .exists(&key)
            .await
            .map_err(|e| translate(e, "look up subscriber", &key))?;
        if !exists {
            debug!(topic, address, "Subscriber already absent");
            return Ok(());
        }

        match client.delete(&key).await {
            Ok(()) => {
                info!(topic, address, "Subscriber unregistered");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(translate(e, "unregister subscriber", &key)),
        }
    }

    /// Remove every subscription of every topic. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket cannot be listed or an entry cannot be
    /// deleted.
    pub async fn purge(&self) -> BusResult<usize> {
        let client = self.connect().await?;
        let keys = client
            .list("")
            .await
            .map_err(|e| translate(e, "list bucket", &self.options.bucket_name))?;

        for key in &keys {
            match client.delete(key).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(translate(e, "delete subscription", key)),
            }
        }

        info!(bucket = %self.options.bucket_name, removed = keys.len(), "Subscriptions purged");
        Ok(keys.len())
    }
}

impl<F: ClientFactory> std::fmt::Debug for SubscriptionStore<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionStore")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Listing prefix of `topic`. A `/` inside the topic would make it a
/// sub-directory of another topic.
fn topic_prefix(topic: &str) -> BusResult<String> {
    if topic.is_empty() {
        return Err(BusError::validation("topic cannot be empty"));
    }
    if topic.contains('/') {
        return Err(BusError::validation(format!("topic '{topic}' cannot contain '/'")));
    }
    Ok(format!("{topic}/"))
}

fn subscription_key(topic: &str, address: &str) -> BusResult<String> {
    if address.is_empty() {
        return Err(BusError::validation("subscriber address cannot be empty"));
    }
    Ok(format!("{}{address}", topic_prefix(topic)?))
}
