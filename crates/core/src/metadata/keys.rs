//! Built-in metadata keys.
//!
//! These are always registered as known keys so they keep a dedicated,
//! readable header regardless of caller configuration.

/// Encoding applied to the payload, if any.
pub const CONTENT_ENCODING: &str = "DataBus.ContentEncoding";

/// Payload length in bytes. Computed on metadata reads, never stored.
pub const LENGTH: &str = "DataBus.Length";

/// Time the attachment was last read.
pub const READ_TIME: &str = "DataBus.ReadTime";

/// Time the attachment was saved.
pub const SAVE_TIME: &str = "DataBus.SaveTime";

/// All built-in keys.
pub const BUILT_IN: [&str; 4] = [CONTENT_ENCODING, LENGTH, READ_TIME, SAVE_TIME];
