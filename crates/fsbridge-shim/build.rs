//! Build script for fsbridge-shim
//!
//! Compiles the fixed-arity C wrappers around `open` and `fcntl`. The C
//! compiler emits the correct variadic call sequence for each target, which
//! is the whole point of the bridge.
//!
//! Also detects the Apple `fstore_t` / `fpunchhole_t` fcntl extension and
//! exposes it to the crate as `cfg(fsbridge_fstore)`.

fn main() {
    println!("cargo:rustc-check-cfg=cfg(fsbridge_fstore)");
    println!("cargo:rerun-if-changed=src/c/wrappers.c");

    let target_family = std::env::var("CARGO_CFG_TARGET_FAMILY").unwrap_or_default();
    let target_vendor = std::env::var("CARGO_CFG_TARGET_VENDOR").unwrap_or_default();

    if !target_family.split(',').any(|f| f == "unix") {
        return;
    }

    let mut build = cc::Build::new();
    build.file("src/c/wrappers.c").opt_level(2);

    // fstore_t and fpunchhole_t are Darwin-only control blocks
    if target_vendor == "apple" {
        println!("cargo:rustc-cfg=fsbridge_fstore");
        build.define("FSBRIDGE_FSTORE", None);
    }

    build.compile("fsbridge_wrappers");
}
