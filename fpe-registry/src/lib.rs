//! FPE Registry
//!
//! Named format-preserving encryption contexts over an [`FpeEngine`].
//!
//! ## Architecture
//!
//! ```text
//! caller ──► FpeRegistry ──► ContextHandle ──► FpeEngine
//!            (id → handle)   (library +        (mock or native)
//!                             protect/access)
//! ```
//!
//! - [`ContextHandle`]: one library context and its two transforms, created
//!   all-or-nothing and released exactly once.
//! - [`FpeRegistry`]: thread-safe map from profile id to handle.
//! - [`AsyncRegistry`]: tokio facade running engine calls on the blocking pool.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use fpe_registry::{FpeRegistry, MockEngine, ProfileConfig};
//!
//! let registry = FpeRegistry::new(Arc::new(MockEngine::new()));
//! registry.register(
//!     "fpe-dev",
//!     ProfileConfig::new(
//!         "https://policy.example.com/policy/clientPolicy.xml",
//!         "/opt/fpe/trustStore",
//!         "/opt/fpe/cache",
//!         "developer@example.com",
//!         "s3cret",
//!         "alphanumeric",
//!     ),
//! )?;
//!
//! let cipher = registry.encrypt_by_id("fpe-dev", "12-10-2005 10:27:33")?;
//! assert_eq!(cipher.len(), 19);
//! assert_eq!(registry.decrypt_by_id("fpe-dev", &cipher)?, "12-10-2005 10:27:33");
//! # Ok::<(), fpe_registry::FpeError>(())
//! ```

pub mod async_registry;
pub mod config;
pub mod context;
pub mod error;
pub mod registry;

pub use async_registry::AsyncRegistry;
pub use config::{EngineSettings, ProfileConfig, ProfileEntry, RegistryConfig};
pub use context::ContextHandle;
pub use error::{FpeError, InitStage, Result};
pub use registry::FpeRegistry;

pub use fpe_engine::{Direction, EngineError, FpeEngine, MockEngine};

#[cfg(feature = "native")]
pub use fpe_engine::NativeEngine;
