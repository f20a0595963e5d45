//! Bakes the operator's shape contract into the C ABI build.
//!
//! A host compiles one operator per (UMAX, NLU, N) triple. The degrees come
//! from `LIMBDARK_UDEG` and `LIMBDARK_YDEG`; the defaults match the
//! quadratic limb darkening on a degree-15 map used by the surface process.

use std::env;
use std::fs;
use std::path::PathBuf;

const DEFAULT_UDEG: usize = 2;
const DEFAULT_YDEG: usize = 15;

fn degree(var: &str, default: usize) -> usize {
    println!("cargo:rerun-if-env-changed={var}");
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("{var} must be a non-negative integer, got {value:?}")),
        Err(_) => default,
    }
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let udeg = degree("LIMBDARK_UDEG", DEFAULT_UDEG);
    let ydeg = degree("LIMBDARK_YDEG", DEFAULT_YDEG);

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let generated = format!(
        "/// Limb-darkening degree of this build (`UMAX`)\n\
         pub const BUILD_UDEG: usize = {udeg};\n\
         /// Map degree of this build\n\
         pub const BUILD_YDEG: usize = {ydeg};\n"
    );
    fs::write(out_dir.join("build_config.rs"), generated).expect("failed to write build_config.rs");
}
