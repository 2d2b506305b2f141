//! Subscription index backed by an object store.
//!
//! Membership is the existence of an empty object at `<topic>/<address>`.
//! Every node reads the same bucket, so the index is centralized.

mod service;

pub use service::SubscriptionStore;
