//! Mock FPE engine for testing.
//!
//! Performs a keyed per-position substitution that keeps every character
//! inside its class (digit, lower, upper) and leaves separators alone. It
//! is reversible and shape-preserving, which is all the registry needs to
//! observe; it is not a cipher.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::EngineError;
use crate::traits::{Direction, FpeEngine, LibraryParams, TransformParams};

/// Formats understood by the mock engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MockFormat {
    /// Letters and digits substituted, other printable ASCII preserved
    Alphanumeric,
    /// Digits substituted, letters rejected, other printable ASCII preserved
    Numeric,
}

impl MockFormat {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "alphanumeric" | "alphanum" => Some(MockFormat::Alphanumeric),
            "numeric" | "digits" => Some(MockFormat::Numeric),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            MockFormat::Alphanumeric => "alphanumeric",
            MockFormat::Numeric => "numeric",
        }
    }
}

/// Points at which a failure can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockFault {
    /// `create_library` fails
    CreateLibrary,
    /// `create_transform` fails for the protect direction
    CreateProtect,
    /// `create_transform` fails for the access direction
    CreateAccess,
    /// `protect` fails
    Protect,
    /// `access` fails
    Access,
}

/// Create/destroy calls observed by the mock, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockEvent {
    LibraryCreated(u64),
    TransformCreated { id: u64, direction: Direction },
    TransformDestroyed { id: u64, direction: Direction },
    LibraryDestroyed(u64),
}

/// Library context issued by [`MockEngine`].
#[derive(Debug)]
pub struct MockLibrary {
    id: u64,
    policy_url: String,
}

impl MockLibrary {
    /// Handle identifier, unique per engine.
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Transform handle issued by [`MockEngine`].
pub struct MockTransform {
    id: u64,
    direction: Direction,
    format: MockFormat,
    key: Zeroizing<[u8; 32]>,
}

impl MockTransform {
    /// Handle identifier, unique per engine.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Direction this transform was created for.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    fn shift(&self, position: usize) -> u32 {
        u32::from(self.key[position % self.key.len()]) + position as u32
    }
}

/// Mock engine for testing.
///
/// Configurable faults, plus counters and an event log so tests can check
/// that every handle is released exactly once and in the right order.
pub struct MockEngine {
    name: String,
    faults: Mutex<HashSet<MockFault>>,
    next_id: AtomicU64,
    libraries_created: AtomicUsize,
    libraries_destroyed: AtomicUsize,
    transforms_created: AtomicUsize,
    transforms_destroyed: AtomicUsize,
    transform_calls: AtomicU64,
    events: Mutex<Vec<MockEvent>>,
}

impl MockEngine {
    /// Create a new mock engine.
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            faults: Mutex::new(HashSet::new()),
            next_id: AtomicU64::new(1),
            libraries_created: AtomicUsize::new(0),
            libraries_destroyed: AtomicUsize::new(0),
            transforms_created: AtomicUsize::new(0),
            transforms_destroyed: AtomicUsize::new(0),
            transform_calls: AtomicU64::new(0),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Set the engine name reported in logs.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Start with a fault injected.
    pub fn with_fault(self, fault: MockFault) -> Self {
        self.inject(fault);
        self
    }

    /// Inject a fault for all subsequent calls.
    pub fn inject(&self, fault: MockFault) {
        lock(&self.faults).insert(fault);
    }

    /// Remove every injected fault.
    pub fn clear_faults(&self) {
        lock(&self.faults).clear();
    }

    /// Library contexts currently alive.
    pub fn live_libraries(&self) -> usize {
        self.libraries_created.load(Ordering::SeqCst)
            - self.libraries_destroyed.load(Ordering::SeqCst)
    }

    /// Transform handles currently alive.
    pub fn live_transforms(&self) -> usize {
        self.transforms_created.load(Ordering::SeqCst)
            - self.transforms_destroyed.load(Ordering::SeqCst)
    }

    /// Total library contexts ever created.
    pub fn libraries_created(&self) -> usize {
        self.libraries_created.load(Ordering::SeqCst)
    }

    /// Total library contexts ever destroyed.
    pub fn libraries_destroyed(&self) -> usize {
        self.libraries_destroyed.load(Ordering::SeqCst)
    }

    /// Total transforms ever destroyed.
    pub fn transforms_destroyed(&self) -> usize {
        self.transforms_destroyed.load(Ordering::SeqCst)
    }

    /// Number of protect/access calls that reached the engine.
    pub fn transform_calls(&self) -> u64 {
        self.transform_calls.load(Ordering::SeqCst)
    }

    /// Snapshot of the create/destroy event log.
    pub fn events(&self) -> Vec<MockEvent> {
        lock(&self.events).clone()
    }

    fn has_fault(&self, fault: MockFault) -> bool {
        lock(&self.faults).contains(&fault)
    }

    fn record(&self, event: MockEvent) {
        lock(&self.events).push(event);
    }

    fn derive_key(
        policy_url: &str,
        params: &TransformParams<'_>,
        format: MockFormat,
    ) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for part in [
            policy_url,
            params.identity,
            params.shared_secret,
            format.name(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        hasher.finalize().into()
    }

    fn run(
        &self,
        transform: &MockTransform,
        attempted: Direction,
        input: &[u8],
        out: &mut [u8],
    ) -> Result<usize, EngineError> {
        self.transform_calls.fetch_add(1, Ordering::SeqCst);

        if transform.direction != attempted {
            return Err(EngineError::WrongDirection { attempted });
        }
        let fault = match attempted {
            Direction::Protect => MockFault::Protect,
            Direction::Access => MockFault::Access,
        };
        if self.has_fault(fault) {
            return Err(EngineError::Status {
                code: 1,
                details: format!("injected {} failure", attempted),
            });
        }
        if input.is_empty() {
            return Err(EngineError::InvalidLength("input is empty".to_string()));
        }
        if input.len() > out.len() {
            return Err(EngineError::BufferTooSmall {
                required: input.len(),
                capacity: out.len(),
            });
        }

        for (position, (&byte, slot)) in input.iter().zip(out.iter_mut()).enumerate() {
            let shift = transform.shift(position);
            *slot = substitute(byte, shift, attempted, transform.format)?;
        }

        Ok(input.len())
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FpeEngine for MockEngine {
    type Library = MockLibrary;
    type Transform = MockTransform;

    fn name(&self) -> &str {
        &self.name
    }

    fn create_library(&self, params: &LibraryParams<'_>) -> Result<MockLibrary, EngineError> {
        if self.has_fault(MockFault::CreateLibrary) {
            return Err(EngineError::Unavailable(format!(
                "policy unreachable: {}",
                params.policy_url
            )));
        }
        if params.policy_url.is_empty() || params.trust_store_path.is_empty() {
            return Err(EngineError::InvalidArgument(
                "policy URL and trust store path are required".to_string(),
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.libraries_created.fetch_add(1, Ordering::SeqCst);
        self.record(MockEvent::LibraryCreated(id));

        Ok(MockLibrary {
            id,
            policy_url: params.policy_url.to_string(),
        })
    }

    fn create_transform(
        &self,
        library: &MockLibrary,
        params: &TransformParams<'_>,
    ) -> Result<MockTransform, EngineError> {
        let fault = match params.direction {
            Direction::Protect => MockFault::CreateProtect,
            Direction::Access => MockFault::CreateAccess,
        };
        if self.has_fault(fault) {
            return Err(EngineError::Status {
                code: 566,
                details: format!("authorization denied for {}", params.identity),
            });
        }

        let format = MockFormat::parse(params.format)
            .ok_or_else(|| EngineError::UnknownFormat(params.format.to_string()))?;
        let key = Self::derive_key(&library.policy_url, params, format);

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.transforms_created.fetch_add(1, Ordering::SeqCst);
        self.record(MockEvent::TransformCreated {
            id,
            direction: params.direction,
        });

        Ok(MockTransform {
            id,
            direction: params.direction,
            format,
            key: Zeroizing::new(key),
        })
    }

    fn protect(
        &self,
        transform: &MockTransform,
        input: &[u8],
        out: &mut [u8],
    ) -> Result<usize, EngineError> {
        self.run(transform, Direction::Protect, input, out)
    }

    fn access(
        &self,
        transform: &MockTransform,
        input: &[u8],
        out: &mut [u8],
    ) -> Result<usize, EngineError> {
        self.run(transform, Direction::Access, input, out)
    }

    fn destroy_transform(&self, transform: MockTransform) {
        self.transforms_destroyed.fetch_add(1, Ordering::SeqCst);
        self.record(MockEvent::TransformDestroyed {
            id: transform.id,
            direction: transform.direction,
        });
    }

    fn destroy_library(&self, library: MockLibrary) {
        self.libraries_destroyed.fetch_add(1, Ordering::SeqCst);
        self.record(MockEvent::LibraryDestroyed(library.id));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Rotate `byte` within its class by `shift` (forward for protect,
/// backward for access).
fn substitute(
    byte: u8,
    shift: u32,
    direction: Direction,
    format: MockFormat,
) -> Result<u8, EngineError> {
    let rotate = |base: u8, modulus: u32| -> u8 {
        let offset = u32::from(byte - base);
        let shift = shift % modulus;
        let rotated = match direction {
            Direction::Protect => (offset + shift) % modulus,
            Direction::Access => (offset + modulus - shift) % modulus,
        };
        base + rotated as u8
    };

    let mismatch = || EngineError::FormatMismatch {
        format: format.name().to_string(),
    };

    match byte {
        b'0'..=b'9' => Ok(rotate(b'0', 10)),
        b'a'..=b'z' if format == MockFormat::Alphanumeric => Ok(rotate(b'a', 26)),
        b'A'..=b'Z' if format == MockFormat::Alphanumeric => Ok(rotate(b'A', 26)),
        b'a'..=b'z' | b'A'..=b'Z' => Err(mismatch()),
        b' '..=b'~' => Ok(byte),
        _ => Err(mismatch()),
    }
}
