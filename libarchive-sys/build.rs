//! Link against the system libarchive.
//!
//! `LIBARCHIVE_LIB_DIR` adds a search path for non-standard installs,
//! `LIBARCHIVE_STATIC` switches to static linking.

use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=LIBARCHIVE_LIB_DIR");
    println!("cargo:rerun-if-env-changed=LIBARCHIVE_STATIC");

    if let Ok(dir) = env::var("LIBARCHIVE_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", dir);
    }

    let kind = if env::var_os("LIBARCHIVE_STATIC").is_some() {
        "static"
    } else {
        "dylib"
    };
    println!("cargo:rustc-link-lib={}=archive", kind);
}
