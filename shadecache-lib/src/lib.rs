// Copyright 2026 The shadecache Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shader and program objects bound to their GL context, and a process-wide cache of the programs
//! every renderer needs.
//!
//! Applications pick a driver, wrap it in a [`gl::context::Context`], make it current and ask
//! [`ProgramCache::global`] for a [`BuiltinProgram`].  Custom shaders are built directly with
//! [`gl::shader::Shader`] and [`gl::program::Program`].
//!
//! Everything here runs synchronously on the calling thread.  Nothing spawns threads.

pub mod builtin;
pub mod cache;
#[cfg(feature = "cli")]
pub mod logging;

pub use shadecache_assets as assets;
pub use shadecache_gl as gl;

pub use builtin::{AssetCatalog, BuiltinProgram, Catalog, Embedded, StageSource};
pub use cache::ProgramCache;

pub mod prelude {
    pub use crate::builtin::{BuiltinProgram, Catalog};
    pub use crate::cache::ProgramCache;
    pub use shadecache_gl::prelude::*;
}

/// Asset search directories, including the install directory captured at build time.
pub fn asset_dirs() -> assets::AssetDirs {
    assets::AssetDirs::with_install_dir(option_env!("SHADECACHE_BUILD_ASSETS_DIR"))
}
