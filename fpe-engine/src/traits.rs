//! Core trait for FPE engines.
//!
//! This module defines the `FpeEngine` trait - the narrow interface the
//! registry consumes from whatever engine performs the actual transform.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Direction of a transform handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Plaintext to ciphertext
    Protect,
    /// Ciphertext to plaintext
    Access,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Protect => f.write_str("protect"),
            Direction::Access => f.write_str("access"),
        }
    }
}

/// Parameters for creating a library context.
#[derive(Debug, Clone, Copy)]
pub struct LibraryParams<'a> {
    /// Where the engine fetches cryptographic policy from
    pub policy_url: &'a str,
    /// Trust material used to verify the policy server
    pub trust_store_path: &'a str,
    /// Directory for the engine's file cache
    pub cache_path: &'a str,
    /// Client product name reported to the key server
    pub client_product: &'a str,
    /// Client product version reported to the key server
    pub client_product_version: &'a str,
    /// Engine-side network timeout in seconds (engine default when `None`)
    pub network_timeout_secs: Option<u32>,
}

/// Parameters for creating a transform handle.
#[derive(Clone, Copy)]
pub struct TransformParams<'a> {
    /// Which way this transform runs
    pub direction: Direction,
    /// Identity known to the key management layer
    pub identity: &'a str,
    /// Shared secret authenticating `identity`
    pub shared_secret: &'a str,
    /// Format descriptor (e.g. `alphanumeric`)
    pub format: &'a str,
}

impl fmt::Debug for TransformParams<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformParams")
            .field("direction", &self.direction)
            .field("identity", &self.identity)
            .field("shared_secret", &"<redacted>")
            .field("format", &self.format)
            .finish()
    }
}

/// Core trait for FPE engines.
///
/// Handles are plain values owned by the caller. Destroy operations take
/// them by value, so a handle can be released at most once and never used
/// afterwards. A transform must be destroyed before the library it was
/// created from.
///
/// `protect` and `access` may be called concurrently on the same transform;
/// implementations whose handles are not safe for that must not implement
/// `Sync` for their handle types.
pub trait FpeEngine: Send + Sync + 'static {
    /// Library context handle.
    type Library: Send + Sync;

    /// Directional transform handle.
    type Transform: Send + Sync;

    /// Engine identifier used in logs.
    fn name(&self) -> &str;

    /// Create a library context (may perform file and network I/O).
    fn create_library(&self, params: &LibraryParams<'_>) -> Result<Self::Library, EngineError>;

    /// Create a transform bound to `library`.
    fn create_transform(
        &self,
        library: &Self::Library,
        params: &TransformParams<'_>,
    ) -> Result<Self::Transform, EngineError>;

    /// Protect `input` into `out`, returning the number of bytes written.
    fn protect(
        &self,
        transform: &Self::Transform,
        input: &[u8],
        out: &mut [u8],
    ) -> Result<usize, EngineError>;

    /// Access `input` into `out`, returning the number of bytes written.
    fn access(
        &self,
        transform: &Self::Transform,
        input: &[u8],
        out: &mut [u8],
    ) -> Result<usize, EngineError>;

    /// Release a transform handle.
    fn destroy_transform(&self, transform: Self::Transform);

    /// Release a library context.
    fn destroy_library(&self, library: Self::Library);
}
