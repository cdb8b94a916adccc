//! Raw declarations for the vendor Simple API.
//!
//! Layouts mirror the `_v3` parameter structures. Every parameter struct
//! must start as a copy of the library's exported defaults so the private
//! version fields are filled in.

#![allow(
    non_camel_case_types,
    non_snake_case,
    non_upper_case_globals,
    dead_code
)]

use libc::{c_char, c_int, c_uchar, c_uint, c_void};

pub const VE_ENCODING_DEFAULT: c_int = 0;
pub const VE_ENCODING_UTF8: c_int = 3;

#[repr(C)]
pub struct VeLibCtx_st {
    _private: [u8; 0],
}

#[repr(C)]
pub struct VeFPE_st {
    _private: [u8; 0],
}

pub type VeLibCtx = *mut VeLibCtx_st;
pub type VeFPE = *mut VeFPE_st;
pub type VeObj = *mut c_void;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct VeLibCtxParams {
    pub private1: c_int,
    pub private2: c_int,
    pub policyURL: *const c_char,
    pub policyFilePath: *const c_char,
    pub keyServerHost: *const c_char,
    pub enableMemoryCache: c_int,
    pub fileCachePath: *const c_char,
    pub trustStorePath: *const c_char,
    pub encoding: c_int,
    pub clientIdProduct: *const c_char,
    pub clientIdProductVersion: *const c_char,
    pub clientIdOS: *const c_char,
    pub clientIdOSVersion: *const c_char,
    pub clientIdDevice: *const c_char,
    pub clientIdDeviceVersion: *const c_char,
    pub allowShortFPE: c_int,
    pub allowNonHardwareRNG: c_int,
    pub networkTimeout: c_int,
    pub CRLChecking: c_int,
    pub diagSSLTrace: c_int,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct VeFPEParams {
    pub private1: c_int,
    pub private2: c_int,
    pub private3: *const c_char,
    pub private4: *const c_char,
    pub private5: *const c_char,
    pub protect: c_int,
    pub access: c_int,
    pub allowNetEmpty: c_int,
    pub format: *const c_char,
    pub identity: *const c_char,
    pub sharedSecret: *const c_char,
    pub username: *const c_char,
    pub password: *const c_char,
    pub clientCertificatePath: *const c_char,
    pub clientCertificatePassword: *const c_char,
    pub encoding: c_int,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct VeProtectParams {
    pub private1: c_int,
    pub private2: c_int,
    pub private3: *mut c_void,
    pub private4: *const c_char,
    pub private5: *const c_char,
    pub plaintext: *const c_uchar,
    pub plaintextSize: c_uint,
    pub tweak: *const c_uchar,
    pub tweakSize: c_uint,
    pub ciphertext: *mut c_uchar,
    pub ciphertextBufferSize: c_uint,
    pub ciphertextSize: c_uint,
    pub keyNumber: c_int,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct VeAccessParams {
    pub private1: c_int,
    pub private2: c_int,
    pub private3: *mut c_void,
    pub private4: *const c_char,
    pub private5: *const c_char,
    pub ciphertext: *const c_uchar,
    pub ciphertextSize: c_uint,
    pub tweak: *const c_uchar,
    pub tweakSize: c_uint,
    pub plaintext: *mut c_uchar,
    pub plaintextBufferSize: c_uint,
    pub plaintextSize: c_uint,
    pub masked: c_int,
}

extern "system" {
    pub static VeLibCtxParamsDefaults_v3: VeLibCtxParams;
    pub static VeFPEParamsDefaults_v3: VeFPEParams;
    pub static VeProtectParamsDefaults_v3: VeProtectParams;
    pub static VeAccessParamsDefaults_v3: VeAccessParams;

    pub fn VeCreateLibCtx(params: *const VeLibCtxParams, ctx: *mut VeLibCtx) -> c_int;
    pub fn VeDestroyLibCtx(ctx: *mut VeLibCtx) -> c_int;

    pub fn VeCreateFPE(ctx: VeLibCtx, params: *mut VeFPEParams, fpe: *mut VeFPE) -> c_int;
    pub fn VeDestroyFPE(fpe: *mut VeFPE) -> c_int;

    pub fn VeProtect(obj: VeObj, params: *mut VeProtectParams) -> c_int;
    pub fn VeAccess(obj: VeObj, params: *mut VeAccessParams) -> c_int;

    pub fn VeGetErrorDetails(obj: VeObj) -> *const c_char;
}
