//! Translation of object client errors into [`BusError`].

use bucketbus_shared::BusError;

use crate::storage::ClientError;

/// Map a client error raised while performing `action` on `subject`.
///
/// | Client error                            | Result                    |
/// |-----------------------------------------|---------------------------|
/// | `InvalidCredentials`, `InvalidConfig`    | `BusError::Configuration` |
/// | `NotFound`                              | `BusError::NotFound`      |
/// | anything else                           | `BusError::Application`   |
#[must_use]
pub fn translate(err: ClientError, action: &str, subject: &str) -> BusError {
    match err {
        ClientError::InvalidCredentials(_) => {
            BusError::configuration_caused_by("invalid credentials", err)
        }
        ClientError::InvalidConfig(_) => {
            BusError::configuration_caused_by("invalid object store configuration", err)
        }
        ClientError::NotFound(_) => BusError::not_found_caused_by(subject, err),
        _ => BusError::application(format!("could not {action} '{subject}'"), err),
    }
}
