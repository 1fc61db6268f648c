//! Unit tests for plugin error types.

use std::sync::Arc;

use rstest::rstest;

use super::*;

#[test]
fn not_found_message_includes_name_and_count() {
    let error = PluginError::NotFound {
        name: "nix".into(),
        searched: 3,
    };
    let message = error.to_string();
    assert!(message.contains("nix"), "expected name in message: {message}");
    assert!(
        message.contains("3 search directories"),
        "expected directory count in message: {message}"
    );
}

#[rstest]
#[case::timeout(
    PluginError::Timeout {
        name: "slow".into(),
        timeout_ms: 1500,
    },
    "1500"
)]
#[case::non_zero_exit(
    PluginError::NonZeroExit {
        name: "buggy".into(),
        status: 127,
    },
    "127"
)]
fn error_message_includes_numeric_field(#[case] error: PluginError, #[case] expected_value: &str) {
    let message = error.to_string();
    assert!(
        message.contains(expected_value),
        "expected {expected_value} in message: {message}"
    );
}

#[test]
fn errors_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync + 'static>() {}
    assert_send_sync::<PluginError>();
}

#[test]
fn write_error_keeps_io_source() {
    let error = PluginError::Write {
        name: "nix".into(),
        source: Arc::new(std::io::Error::from(std::io::ErrorKind::BrokenPipe)),
    };
    let source = std::error::Error::source(&error).expect("source present");
    assert!(source.to_string().to_lowercase().contains("broken pipe"));
}

#[test]
fn plugin_name_is_exposed_for_call_errors() {
    let error = PluginError::MissingData { name: "nix".into() };
    assert_eq!(error.plugin_name(), Some("nix"));

    let json_error = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json");
    assert_eq!(PluginError::Encode(json_error).plugin_name(), None);
}
