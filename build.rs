//! Build script for `nvg`.
//!
//! Embeds build metadata (timestamp, rustc version, target triple) for the
//! `--version` banner.

use vergen_gix::{BuildBuilder, CargoBuilder, Emitter, RustcBuilder};

fn main() {
    let mut emitter = Emitter::default();

    match BuildBuilder::default().build_timestamp(true).build() {
        Ok(build) => {
            if let Err(e) = emitter.add_instructions(&build) {
                println!("cargo:warning=vergen build instructions failed: {e}");
            }
        }
        Err(e) => println!("cargo:warning=vergen build metadata unavailable: {e}"),
    }

    if let Ok(cargo) = CargoBuilder::default().target_triple(true).build() {
        if let Err(e) = emitter.add_instructions(&cargo) {
            println!("cargo:warning=vergen cargo instructions failed: {e}");
        }
    }

    if let Ok(rustc) = RustcBuilder::default().semver(true).build() {
        if let Err(e) = emitter.add_instructions(&rustc) {
            println!("cargo:warning=vergen rustc instructions failed: {e}");
        }
    }

    // Missing metadata only degrades the banner
    if let Err(e) = emitter.emit() {
        println!("cargo:warning=vergen emit failed: {e}");
    }
}
