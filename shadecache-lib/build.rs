// Copyright 2026 The shadecache Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use shadecache_assets as assets;

fn main() {
    assets::build::set_asset_default_dir();
    println!("cargo:rerun-if-changed=assets/shaders");
}
