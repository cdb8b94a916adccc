//! Context handle - one configured connection to the FPE engine.
//!
//! A handle owns a library context plus one protect and one access
//! transform created from it. Setup is all-or-nothing: whatever was created
//! before a failing stage is released before the error is returned.
//! Release always runs access, then protect, then library.

use std::sync::Arc;

use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::config::{EngineSettings, ProfileConfig};
use crate::error::{FpeError, InitStage, Result};
use fpe_engine::{Direction, EngineError, FpeEngine, LibraryParams, TransformParams};

/// Engine resources of one context, released on drop.
///
/// Used both as the setup guard and as the live handle's storage, so any
/// exit path (error, panic, close, drop) releases exactly what exists.
struct Resources<E: FpeEngine> {
    engine: Arc<E>,
    library: Option<E::Library>,
    protect: Option<E::Transform>,
    access: Option<E::Transform>,
}

impl<E: FpeEngine> Resources<E> {
    fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            library: None,
            protect: None,
            access: None,
        }
    }

    /// Release in reverse creation order. Returns false if nothing was held.
    fn release(&mut self) -> bool {
        let mut released = false;
        if let Some(access) = self.access.take() {
            self.engine.destroy_transform(access);
            released = true;
        }
        if let Some(protect) = self.protect.take() {
            self.engine.destroy_transform(protect);
            released = true;
        }
        if let Some(library) = self.library.take() {
            self.engine.destroy_library(library);
            released = true;
        }
        released
    }
}

impl<E: FpeEngine> Drop for Resources<E> {
    fn drop(&mut self) {
        self.release();
    }
}

/// A configured FPE context.
///
/// Immutable after creation. Released by [`ContextHandle::close`] or when
/// dropped.
pub struct ContextHandle<E: FpeEngine> {
    resources: Resources<E>,
    profile: ProfileConfig,
    max_transform_len: usize,
}

impl<E: FpeEngine> ContextHandle<E> {
    /// Build a context: library context, protect transform, access transform.
    ///
    /// May block on engine file and network I/O.
    pub fn create(
        engine: Arc<E>,
        profile: ProfileConfig,
        settings: &EngineSettings,
    ) -> Result<Self> {
        profile.validate()?;
        settings.validate()?;

        let init = |stage: InitStage| {
            move |source: EngineError| FpeError::Initialization { stage, source }
        };

        let library_params = LibraryParams {
            policy_url: &profile.policy_url,
            trust_store_path: &profile.trust_store_path,
            cache_path: &profile.cache_path,
            client_product: &settings.client_product,
            client_product_version: &settings.client_product_version,
            network_timeout_secs: settings.network_timeout_secs,
        };
        let transform_params = |direction| TransformParams {
            direction,
            identity: &profile.identity,
            shared_secret: &profile.shared_secret,
            format: &profile.format,
        };

        let mut resources = Resources::new(Arc::clone(&engine));

        let library = engine
            .create_library(&library_params)
            .map_err(init(InitStage::Library))?;
        let library = &*resources.library.insert(library);

        let protect = engine
            .create_transform(library, &transform_params(Direction::Protect))
            .map_err(init(InitStage::ProtectTransform))?;
        resources.protect = Some(protect);

        let access = engine
            .create_transform(library, &transform_params(Direction::Access))
            .map_err(init(InitStage::AccessTransform))?;
        resources.access = Some(access);

        info!(
            engine = engine.name(),
            profile = %profile.fingerprint(),
            format = %profile.format,
            "FPE context created"
        );

        Ok(Self {
            resources,
            profile,
            max_transform_len: settings.max_transform_len,
        })
    }

    /// Encrypt `plaintext`, preserving its format.
    pub fn protect(&self, plaintext: &str) -> Result<String> {
        self.run(Direction::Protect, plaintext)
    }

    /// Decrypt `ciphertext` produced by [`ContextHandle::protect`].
    pub fn access(&self, ciphertext: &str) -> Result<String> {
        self.run(Direction::Access, ciphertext)
    }

    /// Release the engine resources now.
    pub fn close(mut self) {
        if self.resources.release() {
            debug!(profile = %self.profile.fingerprint(), "FPE context closed");
        }
    }

    /// The profile this context was built from.
    pub fn profile(&self) -> &ProfileConfig {
        &self.profile
    }

    /// Format descriptor of this context.
    pub fn format(&self) -> &str {
        &self.profile.format
    }

    /// Output buffer bound for transforms.
    pub fn max_transform_len(&self) -> usize {
        self.max_transform_len
    }

    fn run(&self, direction: Direction, input: &str) -> Result<String> {
        let fail = |source: EngineError| FpeError::Transform { direction, source };

        let transform = match direction {
            Direction::Protect => self.resources.protect.as_ref(),
            Direction::Access => self.resources.access.as_ref(),
        }
        .ok_or_else(|| fail(EngineError::Unavailable("context released".to_string())))?;

        let capacity = self.max_transform_len;
        if input.len() > capacity {
            return Err(fail(EngineError::BufferTooSmall {
                required: input.len(),
                capacity,
            }));
        }

        // Fresh per call: the buffer may hold plaintext
        let mut out = Zeroizing::new(vec![0u8; capacity]);
        let engine = &self.resources.engine;
        let written = match direction {
            Direction::Protect => engine.protect(transform, input.as_bytes(), &mut out),
            Direction::Access => engine.access(transform, input.as_bytes(), &mut out),
        }
        .map_err(fail)?;

        if written > capacity {
            return Err(fail(EngineError::BufferTooSmall {
                required: written,
                capacity,
            }));
        }

        let output = std::str::from_utf8(&out[..written])
            .map_err(|_| fail(EngineError::InvalidUtf8))?
            .to_string();

        debug!(
            %direction,
            input_len = input.len(),
            output_len = written,
            "FPE transform complete"
        );

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fpe_engine::{LibraryParams, MockEngine, MockEvent, MockFault, TransformParams};

    #[derive(Clone, Copy)]
    enum BadOutput {
        Overlong,
        NotUtf8,
    }

    /// Mock engine whose protect output breaks the buffer contract.
    struct BadOutputEngine {
        inner: MockEngine,
        output: BadOutput,
    }

    impl FpeEngine for BadOutputEngine {
        type Library = <MockEngine as FpeEngine>::Library;
        type Transform = <MockEngine as FpeEngine>::Transform;

        fn name(&self) -> &str {
            "bad-output-mock"
        }

        fn create_library(
            &self,
            params: &LibraryParams<'_>,
        ) -> std::result::Result<Self::Library, EngineError> {
            self.inner.create_library(params)
        }

        fn create_transform(
            &self,
            library: &Self::Library,
            params: &TransformParams<'_>,
        ) -> std::result::Result<Self::Transform, EngineError> {
            self.inner.create_transform(library, params)
        }

        fn protect(
            &self,
            _transform: &Self::Transform,
            _input: &[u8],
            out: &mut [u8],
        ) -> std::result::Result<usize, EngineError> {
            match self.output {
                BadOutput::Overlong => Ok(out.len() + 5),
                BadOutput::NotUtf8 => {
                    out[0] = 0xff;
                    Ok(1)
                }
            }
        }

        fn access(
            &self,
            transform: &Self::Transform,
            input: &[u8],
            out: &mut [u8],
        ) -> std::result::Result<usize, EngineError> {
            self.inner.access(transform, input, out)
        }

        fn destroy_transform(&self, transform: Self::Transform) {
            self.inner.destroy_transform(transform)
        }

        fn destroy_library(&self, library: Self::Library) {
            self.inner.destroy_library(library)
        }
    }

    fn bad_output_context(output: BadOutput) -> ContextHandle<BadOutputEngine> {
        let engine = Arc::new(BadOutputEngine {
            inner: MockEngine::new(),
            output,
        });
        ContextHandle::create(engine, profile(), &EngineSettings::default())
            .ok()
            .unwrap()
    }

    fn profile() -> ProfileConfig {
        ProfileConfig::new(
            "https://policy.example.com/policy/clientPolicy.xml",
            "/opt/fpe/trustStore",
            "/opt/fpe/cache",
            "developer@example.com",
            "s3cret",
            "alphanumeric",
        )
    }

    fn create(engine: &Arc<MockEngine>) -> Result<ContextHandle<MockEngine>> {
        ContextHandle::create(Arc::clone(engine), profile(), &EngineSettings::default())
    }

    #[test]
    fn test_round_trip() {
        let engine = Arc::new(MockEngine::new());
        let ctx = create(&engine).unwrap();

        let cipher = ctx.protect("12-10-2005 10:27:33").unwrap();
        assert_eq!(cipher.len(), "12-10-2005 10:27:33".len());
        assert_eq!(ctx.access(&cipher).unwrap(), "12-10-2005 10:27:33");
        assert_eq!(ctx.format(), "alphanumeric");
        assert_eq!(ctx.profile().identity, "developer@example.com");
        assert_eq!(ctx.max_transform_len(), 300);
    }

    #[test]
    fn test_close_releases_in_reverse_order() {
        let engine = Arc::new(MockEngine::new());
        let ctx = create(&engine).unwrap();
        assert_eq!(engine.live_libraries(), 1);
        assert_eq!(engine.live_transforms(), 2);

        ctx.close();

        assert_eq!(engine.live_libraries(), 0);
        assert_eq!(engine.live_transforms(), 0);
        let events = engine.events();
        assert!(matches!(
            events[3],
            MockEvent::TransformDestroyed {
                direction: Direction::Access,
                ..
            }
        ));
        assert!(matches!(
            events[4],
            MockEvent::TransformDestroyed {
                direction: Direction::Protect,
                ..
            }
        ));
        assert!(matches!(events[5], MockEvent::LibraryDestroyed(_)));
        assert_eq!(events.len(), 6);
    }

    #[test]
    fn test_drop_releases() {
        let engine = Arc::new(MockEngine::new());
        {
            let _ctx = create(&engine).unwrap();
        }
        assert_eq!(engine.libraries_destroyed(), 1);
        assert_eq!(engine.transforms_destroyed(), 2);
    }

    #[test]
    fn test_library_failure_creates_nothing() {
        let engine = Arc::new(MockEngine::new().with_fault(MockFault::CreateLibrary));
        let err = create(&engine).err().unwrap();
        assert!(matches!(
            err,
            FpeError::Initialization {
                stage: InitStage::Library,
                ..
            }
        ));
        assert_eq!(engine.libraries_created(), 0);
    }

    #[test]
    fn test_protect_transform_failure_releases_library() {
        let engine = Arc::new(MockEngine::new().with_fault(MockFault::CreateProtect));
        let err = create(&engine).err().unwrap();
        assert!(matches!(
            err,
            FpeError::Initialization {
                stage: InitStage::ProtectTransform,
                ..
            }
        ));
        assert_eq!(engine.libraries_created(), 1);
        assert_eq!(engine.live_libraries(), 0);
        assert_eq!(engine.live_transforms(), 0);
    }

    #[test]
    fn test_access_transform_failure_releases_everything() {
        let engine = Arc::new(MockEngine::new().with_fault(MockFault::CreateAccess));
        let err = create(&engine).err().unwrap();
        assert!(matches!(
            err,
            FpeError::Initialization {
                stage: InitStage::AccessTransform,
                ..
            }
        ));
        assert_eq!(engine.live_libraries(), 0);
        assert_eq!(engine.live_transforms(), 0);

        let events = engine.events();
        assert!(matches!(
            events.last(),
            Some(MockEvent::LibraryDestroyed(_))
        ));
    }

    #[test]
    fn test_unknown_format_is_initialization_error() {
        let engine = Arc::new(MockEngine::new());
        let err = ContextHandle::create(
            Arc::clone(&engine),
            profile().with_format("klingon"),
            &EngineSettings::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            FpeError::Initialization {
                stage: InitStage::ProtectTransform,
                source: EngineError::UnknownFormat(_),
            }
        ));
        assert_eq!(engine.live_libraries(), 0);
    }

    #[test]
    fn test_empty_setting_rejected_before_engine() {
        let engine = Arc::new(MockEngine::new());
        let mut bad = profile();
        bad.identity = String::new();
        let err = ContextHandle::create(Arc::clone(&engine), bad, &EngineSettings::default())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            FpeError::Initialization {
                stage: InitStage::Validate,
                ..
            }
        ));
        assert_eq!(engine.libraries_created(), 0);
    }

    #[test]
    fn test_oversized_input_fails_without_truncation() {
        let engine = Arc::new(MockEngine::new());
        let ctx = create(&engine).unwrap();

        let input = "7".repeat(301);
        let err = ctx.protect(&input).unwrap_err();
        assert!(matches!(
            err,
            FpeError::Transform {
                direction: Direction::Protect,
                source: EngineError::BufferTooSmall {
                    required: 301,
                    capacity: 300
                },
            }
        ));

        let at_limit = "7".repeat(300);
        assert_eq!(ctx.protect(&at_limit).unwrap().len(), 300);
    }

    #[test]
    fn test_overlong_engine_output_rejected() {
        let ctx = bad_output_context(BadOutput::Overlong);
        let err = ctx.protect("1234").unwrap_err();
        assert!(matches!(
            err,
            FpeError::Transform {
                direction: Direction::Protect,
                source: EngineError::BufferTooSmall {
                    required: 305,
                    capacity: 300
                },
            }
        ));
    }

    #[test]
    fn test_non_utf8_engine_output_rejected() {
        let ctx = bad_output_context(BadOutput::NotUtf8);
        let err = ctx.protect("1234").unwrap_err();
        assert!(matches!(
            err,
            FpeError::Transform {
                direction: Direction::Protect,
                source: EngineError::InvalidUtf8,
            }
        ));
    }

    #[test]
    fn test_engine_transform_failure_is_transform_error() {
        let engine = Arc::new(MockEngine::new());
        let ctx = create(&engine).unwrap();
        let err = ctx.access("naïve").unwrap_err();
        assert!(matches!(
            err,
            FpeError::Transform {
                direction: Direction::Access,
                source: EngineError::FormatMismatch { .. },
            }
        ));

        engine.inject(MockFault::Protect);
        assert!(matches!(
            ctx.protect("1234"),
            Err(FpeError::Transform {
                direction: Direction::Protect,
                ..
            })
        ));
    }

    #[test]
    fn test_concurrent_use_of_one_handle() {
        let engine = Arc::new(MockEngine::new());
        let ctx = Arc::new(create(&engine).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ctx = Arc::clone(&ctx);
                std::thread::spawn(move || {
                    for j in 0..200 {
                        let plaintext = format!("{:04}-{:04}", i, j);
                        let cipher = ctx.protect(&plaintext).unwrap();
                        assert_eq!(ctx.access(&cipher).unwrap(), plaintext);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(engine.transform_calls(), 8 * 200 * 2);
    }
}
