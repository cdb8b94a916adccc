//! Build script for fpe-engine
//!
//! Emits link directives for the vendor Simple API library when the
//! `native` feature is enabled. Static and dynamic builds differ only in
//! the settings below:
//!
//! - `FPE_NATIVE_LIB_DIR`: directory holding the library (default `./voltage_lib`)
//! - `FPE_NATIVE_LIB`: library name without prefix/suffix (default `vibesimpledyn`)
//! - `FPE_NATIVE_LINK_KIND`: `dylib` (default) or `static`

use std::env;

const DEFAULT_LIB_DIR: &str = "./voltage_lib";
const DEFAULT_LIB: &str = "vibesimpledyn";

fn main() {
    println!("cargo:rerun-if-env-changed=FPE_NATIVE_LIB_DIR");
    println!("cargo:rerun-if-env-changed=FPE_NATIVE_LIB");
    println!("cargo:rerun-if-env-changed=FPE_NATIVE_LINK_KIND");

    if env::var_os("CARGO_FEATURE_NATIVE").is_none() {
        return;
    }

    let lib_dir = env::var("FPE_NATIVE_LIB_DIR")
        .unwrap_or_else(|_| DEFAULT_LIB_DIR.to_string());
    let lib = env::var("FPE_NATIVE_LIB").unwrap_or_else(|_| DEFAULT_LIB.to_string());
    let kind = env::var("FPE_NATIVE_LINK_KIND")
        .unwrap_or_else(|_| "dylib".to_string());

    let kind = match kind.as_str() {
        "dylib" | "static" => kind,
        other => panic!(
            "FPE_NATIVE_LINK_KIND must be `dylib` or `static`, got `{}`",
            other
        ),
    };

    println!("cargo:rustc-link-search=native={}", lib_dir);
    println!("cargo:rustc-link-lib={}={}", kind, lib);

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if kind == "dylib" && target_os != "windows" {
        println!("cargo:rustc-link-arg=-Wl,-rpath,{}", lib_dir);
    }
    if env::var("CARGO_CFG_UNIX").is_ok() {
        println!("cargo:rustc-link-lib=dylib=pthread");
    }
}
