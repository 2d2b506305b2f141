//! Capabilities a hosting message bus wires in.
//!
//! The bus only depends on these traits; [`AttachmentStore`] and
//! [`SubscriptionStore`] are the object store implementations.

use std::collections::HashMap;
use std::future::Future;

use bucketbus_shared::BusResult;
use tokio::io::AsyncRead;

use crate::attachment::{AttachmentReader, AttachmentStore};
use crate::clock::Clock;
use crate::storage::ClientFactory;
use crate::subscription::SubscriptionStore;

/// Storage for message payloads too large to travel inside a message.
pub trait DataBusStorage: Send + Sync {
    /// Payload reader returned by [`DataBusStorage::read`].
    type Reader: AsyncRead + Send + Unpin;

    /// Store the payload of `source` under `id` along with `metadata`.
    fn save<R>(
        &self,
        id: &str,
        source: R,
        metadata: Option<HashMap<String, String>>,
    ) -> impl Future<Output = BusResult<()>> + Send
    where
        R: AsyncRead + Send + Unpin + 'static;

    /// Open the payload stored under `id`.
    fn read(&self, id: &str) -> impl Future<Output = BusResult<Self::Reader>> + Send;

    /// Metadata stored under `id`.
    fn read_metadata(
        &self,
        id: &str,
    ) -> impl Future<Output = BusResult<HashMap<String, String>>> + Send;
}

/// Index of which addresses subscribe to which topics.
pub trait SubscriptionStorage: Send + Sync {
    /// Addresses subscribed to `topic`.
    fn get_subscriber_addresses(
        &self,
        topic: &str,
    ) -> impl Future<Output = BusResult<Vec<String>>> + Send;

    /// Subscribe `address` to `topic`.
    fn register_subscriber(
        &self,
        topic: &str,
        address: &str,
    ) -> impl Future<Output = BusResult<()>> + Send;

    /// Unsubscribe `address` from `topic`.
    fn unregister_subscriber(
        &self,
        topic: &str,
        address: &str,
    ) -> impl Future<Output = BusResult<()>> + Send;

    /// Whether every node sees the same subscriptions.
    fn is_centralized(&self) -> bool;
}

impl<F: ClientFactory, C: Clock> DataBusStorage for AttachmentStore<F, C> {
    type Reader = AttachmentReader;

    fn save<R>(
        &self,
        id: &str,
        source: R,
        metadata: Option<HashMap<String, String>>,
    ) -> impl Future<Output = BusResult<()>> + Send
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        AttachmentStore::save(self, id, source, metadata)
    }

    fn read(&self, id: &str) -> impl Future<Output = BusResult<AttachmentReader>> + Send {
        AttachmentStore::read(self, id)
    }

    fn read_metadata(
        &self,
        id: &str,
    ) -> impl Future<Output = BusResult<HashMap<String, String>>> + Send {
        AttachmentStore::read_metadata(self, id)
    }
}

impl<F: ClientFactory> SubscriptionStorage for SubscriptionStore<F> {
    fn get_subscriber_addresses(
        &self,
        topic: &str,
    ) -> impl Future<Output = BusResult<Vec<String>>> + Send {
        SubscriptionStore::get_subscriber_addresses(self, topic)
    }

    fn register_subscriber(
        &self,
        topic: &str,
        address: &str,
    ) -> impl Future<Output = BusResult<()>> + Send {
        SubscriptionStore::register_subscriber(self, topic, address)
    }

    fn unregister_subscriber(
        &self,
        topic: &str,
        address: &str,
    ) -> impl Future<Output = BusResult<()>> + Send {
        SubscriptionStore::unregister_subscriber(self, topic, address)
    }

    fn is_centralized(&self) -> bool {
        SubscriptionStore::is_centralized(self)
    }
}
