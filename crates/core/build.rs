//! pcode-core build script.
//!
//! With the `native-engine` feature, points the linker at the prebuilt
//! `libpcode` (directory taken from `PCODE_LIB_DIR`). Without it there is
//! nothing to link.

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    #[cfg(feature = "native-engine")]
    {
        link_native_library();
    }
}

#[cfg(feature = "native-engine")]
fn link_native_library() {
    println!("cargo:rerun-if-env-changed=PCODE_LIB_DIR");

    match std::env::var("PCODE_LIB_DIR") {
        Ok(dir) if !dir.is_empty() => {
            println!("cargo:rustc-link-search=native={dir}");
        }
        _ => {
            println!(
                "cargo:warning=PCODE_LIB_DIR is not set; relying on the system linker path for libpcode"
            );
        }
    }

    // libpcode is C++ underneath.
    match std::env::var("CARGO_CFG_TARGET_OS").as_deref() {
        Ok("macos") | Ok("ios") => println!("cargo:rustc-link-lib=dylib=c++"),
        Ok("windows") => {}
        _ => println!("cargo:rustc-link-lib=dylib=stdc++"),
    }
}
