use std::error::Error as _;

use super::*;

fn io_fault() -> std::io::Error {
    std::io::Error::other("connection reset")
}

#[test]
fn test_bus_error_codes() {
    assert_eq!(
        BusError::configuration("x").error_code(),
        "CONFIGURATION_ERROR"
    );
    assert_eq!(BusError::not_found("x").error_code(), "NOT_FOUND");
    assert_eq!(BusError::validation("x").error_code(), "VALIDATION_ERROR");
    assert_eq!(
        BusError::application("saving", io_fault()).error_code(),
        "APPLICATION_ERROR"
    );
}

#[test]
fn test_only_not_found_is_recoverable() {
    assert!(BusError::not_found("id").is_recoverable());
    assert!(!BusError::configuration("bad").is_recoverable());
    assert!(!BusError::validation("bad").is_recoverable());
    assert!(!BusError::application("saving", io_fault()).is_recoverable());
}

#[test]
fn test_bus_error_display() {
    assert_eq!(
        BusError::configuration("invalid credentials").to_string(),
        "Configuration error: invalid credentials"
    );
    assert_eq!(
        BusError::not_found("data id abc").to_string(),
        "Not found: data id abc"
    );
    assert_eq!(
        BusError::validation("key contains '='").to_string(),
        "Validation error: key contains '='"
    );
    assert_eq!(
        BusError::application("reading attachment", io_fault()).to_string(),
        "reading attachment: connection reset"
    );
}

#[test]
fn test_sources_are_preserved() {
    let err = BusError::application("listing", io_fault());
    assert_eq!(
        err.source().map(ToString::to_string).as_deref(),
        Some("connection reset")
    );

    let err = BusError::not_found_caused_by("data id abc", io_fault());
    assert!(err.source().is_some());

    let err = BusError::configuration_caused_by("invalid credentials", io_fault());
    assert!(err.source().is_some());

    assert!(BusError::not_found("data id abc").source().is_none());
}
