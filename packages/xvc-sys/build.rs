use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=XVC_LIB_DIR");

    if env::var_os("CARGO_FEATURE_CI_CHECK").is_some() {
        return;
    }

    if let Some(dir) = env::var_os("XVC_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", dir.to_string_lossy());
    }
    for dir in ["/usr/local/lib", "/usr/lib"] {
        println!("cargo:rustc-link-search=native={}", dir);
    }

    println!("cargo:rustc-link-lib=xvcenc");
    println!("cargo:rustc-link-lib=xvcdec");

    // Both libraries are C++ underneath the C API.
    let target = env::var("TARGET").unwrap_or_default();
    if target.contains("apple") || target.contains("freebsd") {
        println!("cargo:rustc-link-lib=c++");
    } else {
        println!("cargo:rustc-link-lib=stdc++");
    }
}
