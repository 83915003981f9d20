// crates/orchruntime/tests/config_test.rs

use orchcore::{FrameworkType, OrchError};
use orchruntime::{RuntimeConfig, DEFAULT_EXECUTION_TIMEOUT_MS, DEFAULT_MAX_DOCUMENT_BYTES};
use serde_json::json;

#[test]
fn test_defaults() {
    let config = RuntimeConfig::default();
    assert_eq!(config.max_document_bytes, 5 * 1024 * 1024);
    assert_eq!(config.max_document_bytes, DEFAULT_MAX_DOCUMENT_BYTES);
    assert_eq!(config.default_timeout_ms, DEFAULT_EXECUTION_TIMEOUT_MS);
    assert_eq!(config.event_buffer_size, 1000);
    assert!(config.adapters.is_empty());
}

#[test]
fn test_partial_json_keeps_defaults() {
    let config = RuntimeConfig::from_json(
        r#"{ "default_timeout_ms": 1500, "adapters": { "agno": { "step_delay_ms": 5 } } }"#,
    )
    .unwrap();

    assert_eq!(config.default_timeout_ms, 1500);
    assert_eq!(config.max_document_bytes, DEFAULT_MAX_DOCUMENT_BYTES);
    assert_eq!(
        config.adapter_options(&FrameworkType::new("agno")),
        json!({ "step_delay_ms": 5 })
    );
    assert_eq!(config.adapter_options(&FrameworkType::new("n8n")), json!({}));
}

#[test]
fn test_rejects_zero_limits() {
    let err = RuntimeConfig::from_json(r#"{ "max_document_bytes": 0 }"#).unwrap_err();
    assert!(matches!(err, OrchError::Config(_)));

    let err = RuntimeConfig::from_json(r#"{ "default_timeout_ms": 0 }"#).unwrap_err();
    assert!(matches!(err, OrchError::Config(_)));
}

#[test]
fn test_rejects_malformed_json() {
    let err = RuntimeConfig::from_json("{ nope").unwrap_err();
    assert!(matches!(err, OrchError::Serialization(_)));
}

#[test]
fn test_from_file() {
    let path = std::env::temp_dir().join(format!("orch-config-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "event_buffer_size": 16 }"#).unwrap();

    let config = RuntimeConfig::from_file(&path).unwrap();
    assert_eq!(config.event_buffer_size, 16);

    std::fs::remove_file(&path).unwrap();
    assert!(matches!(
        RuntimeConfig::from_file(&path),
        Err(OrchError::Io(_))
    ));
}
