//! Registry config loading integration tests

use std::io::Write;
use std::sync::Arc;

use fpe_registry::{FpeError, FpeRegistry, MockEngine, RegistryConfig};

const CONFIG: &str = r#"
[engine]
client_product = "billing-service"
max_transform_len = 64
network_timeout_secs = 30

[[profiles]]
id = "fpe-dev"
policy_url = "https://policy.example.com/policy/clientPolicy.xml"
trust_store_path = "/opt/fpe/trustStore"
cache_path = "/opt/fpe/cache"
identity = "developer@example.com"
shared_secret_env = "FPE_REGISTRY_IT_SECRET"
format = "alphanumeric"

[[profiles]]
id = "ssn"
policy_url = "https://policy.example.com/policy/clientPolicy.xml"
trust_store_path = "/opt/fpe/trustStore"
cache_path = "/opt/fpe/cache"
identity = "developer@example.com"
shared_secret = "inline-secret"
format = "numeric"
"#;

#[test]
fn test_registry_from_config_file() -> anyhow::Result<()> {
    std::env::set_var("FPE_REGISTRY_IT_SECRET", "from-env");

    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(CONFIG.as_bytes())?;

    let config = RegistryConfig::from_file(file.path())?;
    assert_eq!(config.engine.client_product, "billing-service");
    assert_eq!(config.engine.network_timeout_secs, Some(30));

    let engine = Arc::new(MockEngine::new());
    let registry = FpeRegistry::from_config(Arc::clone(&engine), &config)?;
    assert_eq!(registry.ids(), vec!["fpe-dev", "ssn"]);
    assert_eq!(registry.settings().max_transform_len, 64);

    let cipher = registry.encrypt_by_id("ssn", "078-05-1120")?;
    assert_eq!(registry.decrypt_by_id("ssn", &cipher)?, "078-05-1120");

    let long = "9".repeat(65);
    assert!(matches!(
        registry.encrypt_by_id("ssn", &long),
        Err(FpeError::Transform { .. })
    ));

    drop(registry);
    assert_eq!(engine.live_libraries(), 0);
    Ok(())
}

#[test]
fn test_missing_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = RegistryConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, FpeError::Config(_)));
}

#[test]
fn test_secret_env_unset_is_config_error() {
    let config = RegistryConfig::from_toml_str(
        r#"
[[profiles]]
id = "orphan"
policy_url = "https://policy.example.com/policy/clientPolicy.xml"
trust_store_path = "/opt/fpe/trustStore"
cache_path = "/opt/fpe/cache"
identity = "developer@example.com"
shared_secret_env = "FPE_REGISTRY_IT_NEVER_SET"
format = "alphanumeric"
"#,
    )
    .unwrap();

    let engine = Arc::new(MockEngine::new());
    let err = FpeRegistry::from_config(Arc::clone(&engine), &config)
        .err()
        .unwrap();
    assert!(matches!(err, FpeError::Config(_)));
    assert_eq!(engine.libraries_created(), 0);
}

#[test]
fn test_out_of_range_network_timeout_rejected() {
    let err = RegistryConfig::from_toml_str("[engine]\nnetwork_timeout_secs = 301\n").unwrap_err();
    assert!(matches!(err, FpeError::Config(_)));
}
