// Copyright 2026 The shadecache Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Assets
//!
//! Shader sources arrive either as strings compiled into the binary or as text behind a
//! [`Locator`].  Anything that can turn a locator into text implements [`ReadText`], which is the
//! only capability the GL layer depends on.
//!
//! The build support and runtime asset lookup are both feature gated to keep compile times down.
//! The build feature enables writing short build scripts.  The runtime feature enables searching
//! asset directories with [`AssetDirs`].  Use the build feature in build dependencies and the
//! runtime feature in your normal dependencies.

#[cfg(feature = "runtime")]
pub mod assets;
#[cfg(feature = "build")]
pub mod build;
#[cfg(feature = "runtime")]
pub use assets::*;

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// GLSL source text.
    Shader,
}

impl AssetKind {
    fn ext(&self) -> &'static OsStr {
        match self {
            AssetKind::Shader => OsStr::new("glsl"),
        }
    }

    fn subdir(&self) -> &'static OsStr {
        match self {
            AssetKind::Shader => OsStr::new("shaders"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("read failed: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("file not found: {0:?}")]
    NotFound(String),
    #[error("invalid locator {0:?}: {1}")]
    InvalidLocator(String, &'static str),
    #[error("asset lookup unavailable for {0:?}")]
    Unsupported(String),
}

/// Where shader text lives.
///
/// Parse one from user input with [`Locator::parse`]:
///
/// - `asset:textured_triangle/vertex` names an asset resolved against the search directories
/// - `file:///usr/share/shaders/blit.vert` is a file URL
/// - anything else is treated as a plain filesystem path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Path(PathBuf),
    Asset(String),
}

impl Locator {
    pub fn parse(raw: &str) -> Result<Self, AssetError> {
        if let Some(name) = raw.strip_prefix("asset:") {
            let name = name.trim_start_matches('/');
            if name.is_empty() {
                return Err(AssetError::InvalidLocator(raw.to_owned(), "empty asset name"));
            }
            return Ok(Locator::Asset(name.to_owned()));
        }

        // Only treat input as a URL when it has an authority marker.  Drive letters would
        // otherwise parse as URL schemes.
        if raw.contains("://") {
            let url = url::Url::parse(raw)
                .map_err(|_| AssetError::InvalidLocator(raw.to_owned(), "malformed URL"))?;
            return Self::try_from(&url);
        }

        if raw.is_empty() {
            return Err(AssetError::InvalidLocator(raw.to_owned(), "empty path"));
        }
        Ok(Locator::Path(PathBuf::from(raw)))
    }
}

impl TryFrom<&url::Url> for Locator {
    type Error = AssetError;

    fn try_from(url: &url::Url) -> Result<Self, Self::Error> {
        match url.scheme() {
            "file" => url
                .to_file_path()
                .map(Locator::Path)
                .map_err(|_| AssetError::InvalidLocator(url.to_string(), "not a local file URL")),
            _ => Err(AssetError::InvalidLocator(
                url.to_string(),
                "only file URLs are supported",
            )),
        }
    }
}

impl FromStr for Locator {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locator::parse(s)
    }
}

impl From<PathBuf> for Locator {
    fn from(path: PathBuf) -> Self {
        Locator::Path(path)
    }
}

impl From<&Path> for Locator {
    fn from(path: &Path) -> Self {
        Locator::Path(path.to_owned())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Path(path) => write!(f, "{}", path.display()),
            Locator::Asset(name) => write!(f, "asset:{name}"),
        }
    }
}

/// Resolves a [`Locator`] to text.
pub trait ReadText {
    fn read_text(&self, locator: &Locator) -> Result<String, AssetError>;
}

/// Reads plain paths only.  Asset names need search directories, see `AssetDirs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Files;

impl ReadText for Files {
    fn read_text(&self, locator: &Locator) -> Result<String, AssetError> {
        match locator {
            Locator::Path(path) => Ok(std::fs::read_to_string(path)?),
            Locator::Asset(name) => Err(AssetError::Unsupported(name.clone())),
        }
    }
}

impl<R: ReadText + ?Sized> ReadText for &R {
    fn read_text(&self, locator: &Locator) -> Result<String, AssetError> {
        (**self).read_text(locator)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_locators() {
        assert_eq!(
            Locator::parse("asset:textured_triangle/vertex").unwrap(),
            Locator::Asset("textured_triangle/vertex".to_owned())
        );
        assert_eq!(
            Locator::parse("shaders/blit.vert").unwrap(),
            Locator::Path(PathBuf::from("shaders/blit.vert"))
        );
        assert!(matches!(
            Locator::parse("asset:"),
            Err(AssetError::InvalidLocator(_, _))
        ));
        assert!(matches!(
            Locator::parse("https://example.com/blit.vert"),
            Err(AssetError::InvalidLocator(_, _))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_parse_file_url() {
        assert_eq!(
            Locator::parse("file:///tmp/blit.vert").unwrap(),
            Locator::Path(PathBuf::from("/tmp/blit.vert"))
        );
    }

    #[test]
    fn test_display_round_trips_assets() {
        let locator = Locator::Asset("blit/fragment".to_owned());
        assert_eq!(locator.to_string(), "asset:blit/fragment");
        assert_eq!(Locator::parse(&locator.to_string()).unwrap(), locator);
    }

    #[test]
    fn test_files_reads_paths_only() {
        let missing = Locator::Path(PathBuf::from("/definitely/not/here.glsl"));
        assert!(matches!(Files.read_text(&missing), Err(AssetError::ReadError(_))));

        let asset = Locator::Asset("blit/vertex".to_owned());
        assert!(matches!(Files.read_text(&asset), Err(AssetError::Unsupported(_))));
    }
}
