//! FPE Engine - foreign boundary to the format-preserving encryption engine
//!
//! The cryptographic transform itself lives in an external engine. This
//! crate describes what the rest of the workspace needs from that engine
//! and provides two implementations of it:
//!
//! - [`MockEngine`]: deterministic in-process engine for tests and for
//!   running without the vendor library
//! - `NativeEngine` (feature `native`): bindings to the vendor Simple API
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │          FpeEngine           │
//! │ create_library / transform   │
//! │ protect / access / destroy_* │
//! └──────────────┬───────────────┘
//!        ┌───────┴────────┐
//!        ▼                ▼
//! ┌─────────────┐  ┌──────────────┐
//! │ MockEngine  │  │ NativeEngine │
//! │ (in-proc)   │  │ (FFI)        │
//! └─────────────┘  └──────────────┘
//! ```

pub mod error;
pub mod mock;
pub mod traits;

#[cfg(feature = "native")]
pub mod native;

// Re-export main types for convenience
pub use error::EngineError;
pub use mock::{MockEngine, MockEvent, MockFault};
pub use traits::{Direction, FpeEngine, LibraryParams, TransformParams};

#[cfg(feature = "native")]
pub use native::NativeEngine;

/// Output buffer bound used by the reference deployment of the engine.
pub const DEFAULT_MAX_TRANSFORM_LEN: usize = 300;
