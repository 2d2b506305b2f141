//! Shared configuration and errors for bucketbus.
//!
//! This crate provides the data every other crate agrees on:
//! - Object store provider configuration
//! - Attachment and subscription store options
//! - S3 connection strings
//! - The bus-facing error taxonomy

pub mod config;
pub mod connection;
pub mod error;

pub use config::{AppConfig, AttachmentOptions, StorageProvider, SubscriptionOptions};
pub use connection::ConnectionInfo;
pub use error::{BoxError, BusError, BusResult};
