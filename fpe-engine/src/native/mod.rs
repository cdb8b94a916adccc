//! Native engine backed by the vendor Simple API.
//!
//! Every string handed to the library is owned by the handle it was
//! passed for and lives until that handle is destroyed. The shared secret
//! is kept in a zeroizing buffer.
//!
//! # Thread Safety
//!
//! The vendor documents LibraryContext and FPE objects as safe to share
//! between threads for similar operations, which is what `Send + Sync` on
//! the handle types below relies on. Error details are per-thread inside
//! the library, so they are read on the thread that saw the failure.

mod ffi;

use std::ffi::{CStr, CString};
use std::ptr;

use libc::{c_char, c_int, c_uint};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::error::EngineError;
use crate::traits::{Direction, FpeEngine, LibraryParams, TransformParams};

/// Library context issued by [`NativeEngine`].
pub struct NativeLibrary {
    ctx: ffi::VeLibCtx,
    _strings: Vec<CString>,
}

// SAFETY: the vendor library documents LibraryContext objects as
// thread-safe; the owned strings are never mutated after creation.
unsafe impl Send for NativeLibrary {}
unsafe impl Sync for NativeLibrary {}

/// Transform handle issued by [`NativeEngine`].
pub struct NativeTransform {
    fpe: ffi::VeFPE,
    direction: Direction,
    format: String,
    _strings: Vec<CString>,
    _secret: Zeroizing<Vec<u8>>,
}

// SAFETY: FPE objects are documented as shareable across threads for
// similar operations; each transform only ever runs one direction.
unsafe impl Send for NativeTransform {}
unsafe impl Sync for NativeTransform {}

/// Engine backed by the vendor Simple API library.
#[derive(Debug, Default)]
pub struct NativeEngine;

impl NativeEngine {
    /// Create a native engine handle.
    pub fn new() -> Self {
        Self
    }

    fn error_details(obj: ffi::VeObj) -> String {
        if obj.is_null() {
            return "no error details available".to_string();
        }
        // SAFETY: the returned pointer is owned by the library and valid
        // until the next Simple API call on this thread; it is copied
        // immediately.
        unsafe {
            let raw = ffi::VeGetErrorDetails(obj);
            if raw.is_null() {
                "no error details available".to_string()
            } else {
                CStr::from_ptr(raw).to_string_lossy().into_owned()
            }
        }
    }
}

fn c_string(field: &str, value: &str) -> Result<CString, EngineError> {
    CString::new(value)
        .map_err(|_| EngineError::InvalidArgument(format!("{} contains a NUL byte", field)))
}

fn c_secret(value: &str) -> Result<Zeroizing<Vec<u8>>, EngineError> {
    if value.as_bytes().contains(&0) {
        return Err(EngineError::InvalidArgument(
            "shared secret contains a NUL byte".to_string(),
        ));
    }
    let mut bytes = Zeroizing::new(Vec::with_capacity(value.len() + 1));
    bytes.extend_from_slice(value.as_bytes());
    bytes.push(0);
    Ok(bytes)
}

fn buffer_len(len: usize) -> Result<c_uint, EngineError> {
    c_uint::try_from(len).map_err(|_| EngineError::InvalidLength(format!("{} bytes", len)))
}

impl FpeEngine for NativeEngine {
    type Library = NativeLibrary;
    type Transform = NativeTransform;

    fn name(&self) -> &str {
        "native"
    }

    fn create_library(&self, params: &LibraryParams<'_>) -> Result<NativeLibrary, EngineError> {
        let policy_url = c_string("policy URL", params.policy_url)?;
        let trust_store = c_string("trust store path", params.trust_store_path)?;
        let cache = c_string("cache path", params.cache_path)?;
        let product = c_string("client product", params.client_product)?;
        let version = c_string("client product version", params.client_product_version)?;

        // SAFETY: the defaults static is initialised by the library; all
        // pointers stored below outlive the call and the returned context.
        let mut raw = unsafe { ffi::VeLibCtxParamsDefaults_v3 };
        raw.policyURL = policy_url.as_ptr();
        raw.trustStorePath = trust_store.as_ptr();
        raw.fileCachePath = cache.as_ptr();
        raw.clientIdProduct = product.as_ptr();
        raw.clientIdProductVersion = version.as_ptr();
        raw.encoding = ffi::VE_ENCODING_UTF8;
        if let Some(timeout) = params.network_timeout_secs {
            raw.networkTimeout = timeout as c_int;
        }

        let mut ctx: ffi::VeLibCtx = ptr::null_mut();
        // SAFETY: `raw` is a fully initialised parameter block and `ctx`
        // starts out NULL as the API requires.
        let status = unsafe { ffi::VeCreateLibCtx(&raw, &mut ctx) };
        if status != 0 {
            let details = Self::error_details(ctx.cast());
            if !ctx.is_null() {
                // SAFETY: a failed create still hands back an object that
                // must be released; destroy also NULLs `ctx`.
                unsafe { ffi::VeDestroyLibCtx(&mut ctx) };
            }
            return Err(EngineError::Status {
                code: status,
                details,
            });
        }

        debug!(policy_url = %params.policy_url, "Native library context created");

        Ok(NativeLibrary {
            ctx,
            _strings: vec![policy_url, trust_store, cache, product, version],
        })
    }

    fn create_transform(
        &self,
        library: &NativeLibrary,
        params: &TransformParams<'_>,
    ) -> Result<NativeTransform, EngineError> {
        let identity = c_string("identity", params.identity)?;
        let format = c_string("format", params.format)?;
        let secret = c_secret(params.shared_secret)?;

        // SAFETY: see `create_library`.
        let mut raw = unsafe { ffi::VeFPEParamsDefaults_v3 };
        match params.direction {
            Direction::Protect => {
                raw.protect = 1;
                raw.access = 0;
            }
            Direction::Access => {
                raw.protect = 0;
                raw.access = 1;
            }
        }
        raw.identity = identity.as_ptr();
        raw.sharedSecret = secret.as_ptr() as *const c_char;
        raw.format = format.as_ptr();
        raw.encoding = ffi::VE_ENCODING_DEFAULT;

        let mut fpe: ffi::VeFPE = ptr::null_mut();
        // SAFETY: `library.ctx` is live for as long as `library` is
        // borrowed; `fpe` starts out NULL.
        let status = unsafe { ffi::VeCreateFPE(library.ctx, &mut raw, &mut fpe) };
        if status != 0 {
            let source: ffi::VeObj = if fpe.is_null() {
                library.ctx.cast()
            } else {
                fpe.cast()
            };
            let details = Self::error_details(source);
            if !fpe.is_null() {
                // SAFETY: release the partially created object.
                unsafe { ffi::VeDestroyFPE(&mut fpe) };
            }
            return Err(EngineError::from_status(status, details, 0, params.format));
        }

        Ok(NativeTransform {
            fpe,
            direction: params.direction,
            format: params.format.to_string(),
            _strings: vec![identity, format],
            _secret: secret,
        })
    }

    fn protect(
        &self,
        transform: &NativeTransform,
        input: &[u8],
        out: &mut [u8],
    ) -> Result<usize, EngineError> {
        if transform.direction != Direction::Protect {
            return Err(EngineError::WrongDirection {
                attempted: Direction::Protect,
            });
        }

        // SAFETY: see `create_library`.
        let mut raw = unsafe { ffi::VeProtectParamsDefaults_v3 };
        raw.plaintext = input.as_ptr();
        raw.plaintextSize = buffer_len(input.len())?;
        raw.ciphertext = out.as_mut_ptr();
        raw.ciphertextBufferSize = buffer_len(out.len())?;

        // SAFETY: input and output slices outlive the call and their sizes
        // are passed alongside the pointers.
        let status = unsafe { ffi::VeProtect(transform.fpe.cast(), &mut raw) };
        if status != 0 {
            let details = Self::error_details(transform.fpe.cast());
            return Err(EngineError::from_status(
                status,
                details,
                out.len(),
                &transform.format,
            ));
        }

        let written = raw.ciphertextSize as usize;
        if written > out.len() {
            return Err(EngineError::BufferTooSmall {
                required: written,
                capacity: out.len(),
            });
        }
        Ok(written)
    }

    fn access(
        &self,
        transform: &NativeTransform,
        input: &[u8],
        out: &mut [u8],
    ) -> Result<usize, EngineError> {
        if transform.direction != Direction::Access {
            return Err(EngineError::WrongDirection {
                attempted: Direction::Access,
            });
        }

        // SAFETY: see `create_library`.
        let mut raw = unsafe { ffi::VeAccessParamsDefaults_v3 };
        raw.ciphertext = input.as_ptr();
        raw.ciphertextSize = buffer_len(input.len())?;
        raw.plaintext = out.as_mut_ptr();
        raw.plaintextBufferSize = buffer_len(out.len())?;

        // SAFETY: as for `protect`.
        let status = unsafe { ffi::VeAccess(transform.fpe.cast(), &mut raw) };
        if status != 0 {
            let details = Self::error_details(transform.fpe.cast());
            return Err(EngineError::from_status(
                status,
                details,
                out.len(),
                &transform.format,
            ));
        }

        let written = raw.plaintextSize as usize;
        if written > out.len() {
            return Err(EngineError::BufferTooSmall {
                required: written,
                capacity: out.len(),
            });
        }
        Ok(written)
    }

    fn destroy_transform(&self, transform: NativeTransform) {
        let mut fpe = transform.fpe;
        // SAFETY: the transform is consumed, so this is the only release
        // of `fpe`; its strings are dropped after the call returns.
        let status = unsafe { ffi::VeDestroyFPE(&mut fpe) };
        if status != 0 {
            warn!(status, direction = %transform.direction, "VeDestroyFPE reported failure");
        }
    }

    fn destroy_library(&self, library: NativeLibrary) {
        let mut ctx = library.ctx;
        // SAFETY: the library is consumed; callers destroy its transforms
        // first.
        let status = unsafe { ffi::VeDestroyLibCtx(&mut ctx) };
        if status != 0 {
            warn!(status, "VeDestroyLibCtx reported failure");
        }
    }
}
