// Copyright 2026 The shadecache Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Build Support
//!
//! This module contains the build time functionality.

use std::{fs, path::Path};

/// Sets the path for hard coding into the binary for use at runtime by the assets module.
// Packagers, see the Cargo.toml for shadecache-lib.
pub fn set_asset_default_dir() {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").expect("cargo sets CARGO_MANIFEST_DIR");
    let manifest = Path::new(&manifest_dir).join("Cargo.toml");

    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-env-changed=SHADECACHE_BUILD_ASSETS_DIR");

    // An explicit environment setting wins over the manifest metadata.
    if let Ok(dir) = std::env::var("SHADECACHE_BUILD_ASSETS_DIR") {
        println!("cargo:rustc-env=SHADECACHE_BUILD_ASSETS_DIR={dir}");
        return;
    }

    let cargo = fs::read_to_string(&manifest).expect("readable Cargo.toml");
    let parsed: toml::Value = toml::from_str(&cargo).expect("valid Cargo.toml");

    let asset_dir = parsed
        .get("package")
        .and_then(|p| p.get("metadata"))
        .and_then(|m| m.get("shadecache"))
        .and_then(|s| s.get("asset_dir"))
        .and_then(|d| d.as_str())
        .unwrap_or("assets");
    println!("cargo:rustc-env=SHADECACHE_BUILD_ASSETS_DIR={asset_dir}");
}
