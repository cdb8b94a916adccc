//! Profile and registry configuration.
//!
//! A registry can be populated programmatically with [`ProfileConfig`]
//! values or from a TOML file:
//!
//! ```toml
//! [engine]
//! client_product = "billing-service"
//! max_transform_len = 300
//!
//! [[profiles]]
//! id = "fpe-dev"
//! policy_url = "https://policy.example.com/policy/clientPolicy.xml"
//! trust_store_path = "/opt/fpe/trustStore"
//! cache_path = "/opt/fpe/cache"
//! identity = "developer@example.com"
//! shared_secret_env = "FPE_DEV_SECRET"
//! format = "alphanumeric"
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{FpeError, Result};
use fpe_engine::DEFAULT_MAX_TRANSFORM_LEN;

/// Upper bound the engine accepts for its network timeout.
pub const MAX_NETWORK_TIMEOUT_SECS: u32 = 300;

/// Everything needed to build one FPE context.
#[derive(Clone)]
pub struct ProfileConfig {
    /// Where the engine fetches cryptographic policy from
    pub policy_url: String,
    /// Trust material for the policy server
    pub trust_store_path: String,
    /// Engine file cache directory
    pub cache_path: String,
    /// Identity known to the key management layer
    pub identity: String,
    /// Shared secret for `identity` (zeroized on drop)
    pub shared_secret: Zeroizing<String>,
    /// Format descriptor (e.g. `alphanumeric`)
    pub format: String,
}

impl ProfileConfig {
    /// Create a profile from its six settings.
    pub fn new(
        policy_url: impl Into<String>,
        trust_store_path: impl Into<String>,
        cache_path: impl Into<String>,
        identity: impl Into<String>,
        shared_secret: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            policy_url: policy_url.into(),
            trust_store_path: trust_store_path.into(),
            cache_path: cache_path.into(),
            identity: identity.into(),
            shared_secret: Zeroizing::new(shared_secret.into()),
            format: format.into(),
        }
    }

    /// Same profile with a different format.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Reject empty settings.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("policy_url", self.policy_url.as_str()),
            ("trust_store_path", self.trust_store_path.as_str()),
            ("cache_path", self.cache_path.as_str()),
            ("identity", self.identity.as_str()),
            ("shared_secret", self.shared_secret.as_str()),
            ("format", self.format.as_str()),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(FpeError::invalid(format!("{} must not be empty", name)));
            }
        }
        Ok(())
    }

    /// Short non-secret fingerprint used to tell profiles apart in logs.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [&self.policy_url, &self.identity, &self.format] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(&hasher.finalize()[..6])
    }
}

impl fmt::Debug for ProfileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileConfig")
            .field("policy_url", &self.policy_url)
            .field("trust_store_path", &self.trust_store_path)
            .field("cache_path", &self.cache_path)
            .field("identity", &self.identity)
            .field("shared_secret", &"<redacted>")
            .field("format", &self.format)
            .finish()
    }
}

/// Registry-wide settings forwarded to every context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Client product name reported to the key server
    #[serde(default = "default_client_product")]
    pub client_product: String,

    /// Client product version reported to the key server
    #[serde(default = "default_client_product_version")]
    pub client_product_version: String,

    /// Output buffer bound for protect/access
    #[serde(default = "default_max_transform_len")]
    pub max_transform_len: usize,

    /// Engine-side network timeout in seconds (1-300)
    #[serde(default)]
    pub network_timeout_secs: Option<u32>,

    /// Caller-side wait bound for the async facade
    #[serde(default)]
    pub call_timeout_ms: Option<u64>,
}

fn default_client_product() -> String { "fpe-registry".to_string() }
fn default_client_product_version() -> String { env!("CARGO_PKG_VERSION").to_string() }
fn default_max_transform_len() -> usize { DEFAULT_MAX_TRANSFORM_LEN }

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            client_product: default_client_product(),
            client_product_version: default_client_product_version(),
            max_transform_len: default_max_transform_len(),
            network_timeout_secs: None,
            call_timeout_ms: None,
        }
    }
}

impl EngineSettings {
    /// Set the output buffer bound.
    pub fn with_max_transform_len(mut self, len: usize) -> Self {
        self.max_transform_len = len;
        self
    }

    /// Set the caller-side timeout used by the async facade.
    pub fn with_call_timeout_ms(mut self, ms: u64) -> Self {
        self.call_timeout_ms = Some(ms);
        self
    }

    /// Check ranges.
    pub fn validate(&self) -> Result<()> {
        if self.max_transform_len == 0 {
            return Err(FpeError::Config(
                "max_transform_len must be greater than zero".to_string(),
            ));
        }
        if let Some(secs) = self.network_timeout_secs {
            if secs == 0 || secs > MAX_NETWORK_TIMEOUT_SECS {
                return Err(FpeError::Config(format!(
                    "network_timeout_secs must be between 1 and {}, got {}",
                    MAX_NETWORK_TIMEOUT_SECS, secs
                )));
            }
        }
        if self.client_product.is_empty() || self.client_product_version.is_empty() {
            return Err(FpeError::Config(
                "client product name and version must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// One `[[profiles]]` entry of a registry config file.
#[derive(Clone, Deserialize)]
pub struct ProfileEntry {
    /// Registry id
    pub id: String,
    pub policy_url: String,
    pub trust_store_path: String,
    pub cache_path: String,
    pub identity: String,
    /// Inline secret; takes precedence over `shared_secret_env`
    #[serde(default)]
    pub shared_secret: Option<Zeroizing<String>>,
    /// Environment variable holding the secret
    #[serde(default)]
    pub shared_secret_env: Option<String>,
    pub format: String,
}

impl ProfileEntry {
    /// Resolve the secret and build the profile.
    pub fn resolve(&self) -> Result<ProfileConfig> {
        let secret = match (&self.shared_secret, &self.shared_secret_env) {
            (Some(secret), _) => secret.clone(),
            (None, Some(var)) => std::env::var(var).map(Zeroizing::new).map_err(|_| {
                FpeError::Config(format!(
                    "profile '{}': environment variable {} is not set",
                    self.id, var
                ))
            })?,
            (None, None) => {
                return Err(FpeError::Config(format!(
                    "profile '{}': shared_secret or shared_secret_env is required",
                    self.id
                )))
            }
        };

        Ok(ProfileConfig {
            policy_url: self.policy_url.clone(),
            trust_store_path: self.trust_store_path.clone(),
            cache_path: self.cache_path.clone(),
            identity: self.identity.clone(),
            shared_secret: secret,
            format: self.format.clone(),
        })
    }
}

impl fmt::Debug for ProfileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileEntry")
            .field("id", &self.id)
            .field("policy_url", &self.policy_url)
            .field("identity", &self.identity)
            .field("shared_secret", &self.shared_secret.as_ref().map(|_| "<redacted>"))
            .field("shared_secret_env", &self.shared_secret_env)
            .field("format", &self.format)
            .finish()
    }
}

/// Registry configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub profiles: Vec<ProfileEntry>,
}

impl RegistryConfig {
    /// Parse config from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| FpeError::Config(e.to_string()))?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Load config from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| FpeError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Resolve every profile, rejecting duplicate ids.
    pub fn resolve_profiles(&self) -> Result<Vec<(String, ProfileConfig)>> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(self.profiles.len());

        for entry in &self.profiles {
            if entry.id.trim().is_empty() {
                return Err(FpeError::Config(
                    "profile id must not be empty".to_string(),
                ));
            }
            if !seen.insert(entry.id.as_str()) {
                return Err(FpeError::Config(format!(
                    "duplicate profile id '{}'",
                    entry.id
                )));
            }
            resolved.push((entry.id.clone(), entry.resolve()?));
        }

        Ok(resolved)
    }
}
