// Copyright 2026 The shadecache Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Assets
//!
//! The assets module encapsulates how lookups can vary across platforms and between usage and
//! development.  `AssetDirs` is a set of realized directories where lookups may search.  Hold onto
//! it for doing many lookups at computer speed but re-initialize it for human-speed queries.
//!
//! ## Precedence Rules
//!
//! - On **debug builds**, things are simple.  We use:
//!
//!   1. `SHADECACHE_ASSETS_DIR` enabling overrides for any purpose.
//!   2. The source tree's assets folder, below the run time `CARGO_MANIFEST_DIR`.
//!
//! - On **release builds**, life is more complex.  We use:
//!
//!   1. `SHADECACHE_ASSETS_DIR`
//!   2. The user's local data directory
//!   3. A preferred installation directory handed to [`AssetDirs::with_install_dir`], usually
//!      `SHADECACHE_BUILD_ASSETS_DIR` captured by a build script.
//!   4. The expected system directory as a backup.
//!
//! When set, `SHADECACHE_ASSETS_DIR` should point directly to an assets root i.e. a folder
//! containing a shaders directory.

use std::path::PathBuf;

use crate::{AssetError, AssetKind, Locator, ReadText};

/// Environment variable overriding every other search directory.
pub const ASSETS_DIR_VAR: &str = "SHADECACHE_ASSETS_DIR";

/// Pre-calculated and checked parent paths for reuse in asset look-ups.  Hold onto this object for
/// the duration that such paths are valid, such as when listing assets or looking up several
/// assets.
#[derive(Debug, Clone)]
pub struct AssetDirs {
    search_paths: Vec<PathBuf>,
}

impl Default for AssetDirs {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetDirs {
    /// Checks asset search directories once on construction.
    pub fn new() -> Self {
        Self::with_install_dir(None)
    }

    /// Like [`AssetDirs::new`], additionally searching `install_dir` on release builds.
    pub fn with_install_dir(install_dir: Option<&str>) -> Self {
        let mut search_paths = Vec::with_capacity(4);

        let as_assets_root = |p: PathBuf| -> Option<PathBuf> {
            p.canonicalize().ok().filter(|p| p.exists() && p.is_dir())
        };

        // Treat the given path as a parent containing an `assets/` subdir.
        let with_assets_subdir = |p: PathBuf| {
            let mut p = p;
            p.push("assets");
            as_assets_root(p)
        };

        // Always highest priority: explicit override.
        if let Ok(raw) = std::env::var(ASSETS_DIR_VAR) {
            match as_assets_root(PathBuf::from(&raw)) {
                Some(path) => search_paths.push(path),
                None => log::warn!("invalid {ASSETS_DIR_VAR} (path not found): {raw}"),
            }
        }

        if cfg!(debug_assertions) {
            std::env::var("CARGO_MANIFEST_DIR")
                .ok()
                .map(PathBuf::from)
                .and_then(with_assets_subdir)
                .into_iter()
                .for_each(|p| search_paths.push(p));
        } else {
            // Release: user home/local data dir.
            dirs::data_local_dir()
                .map(|p| p.join("shadecache"))
                .and_then(with_assets_subdir)
                .into_iter()
                .for_each(|p| search_paths.push(p));

            // Preferred installation directory (build-time).
            install_dir
                .map(PathBuf::from)
                .and_then(as_assets_root)
                .into_iter()
                .for_each(|p| search_paths.push(p));

            // Fallback system directory.
            dirs::data_dir()
                .map(|p| p.join("shadecache"))
                .and_then(with_assets_subdir)
                .into_iter()
                .for_each(|p| search_paths.push(p));
        }

        log::debug!("asset search paths: {search_paths:?}");
        AssetDirs { search_paths }
    }

    /// Search only `roots`, in order.  Roots that do not exist are skipped.
    pub fn from_roots<I>(roots: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        AssetDirs {
            search_paths: roots.into_iter().filter(|p| p.is_dir()).collect(),
        }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Checks asset paths for `name`, returning the first hit in precedence order.
    pub fn find(&self, name: &str, kind: AssetKind) -> Option<PathBuf> {
        let mut file = PathBuf::from(kind.subdir()).join(name);
        file.set_extension(kind.ext());

        let found = self
            .search_paths
            .iter()
            .map(|root| root.join(&file))
            .find(|candidate| candidate.exists());

        if found.is_none() && cfg!(debug_assertions) {
            log::warn!("{kind:?} {name} not found.");
            self.search_paths.iter().for_each(|root| {
                log::warn!("  checked: {:?}", root.join(&file));
            });
        }
        found
    }

    pub fn find_text(&self, name: &str, kind: AssetKind) -> Result<String, AssetError> {
        self.find(name, kind)
            .ok_or(AssetError::NotFound(name.to_owned()))
            .and_then(|found| std::fs::read_to_string(found).map_err(|e| e.into()))
    }
}

impl ReadText for AssetDirs {
    fn read_text(&self, locator: &Locator) -> Result<String, AssetError> {
        match locator {
            Locator::Path(path) => Ok(std::fs::read_to_string(path)?),
            Locator::Asset(name) => self.find_text(name, AssetKind::Shader),
        }
    }
}
