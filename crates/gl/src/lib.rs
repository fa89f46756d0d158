// Copyright 2026 The shadecache Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # GL
//!
//! Shader and program objects that know which context they belong to.
//!
//! Core types:
//!
//! - `Context`: a driver plus the thread-local notion of "current"
//! - `Handle`: an object name owned by exactly one wrapper, released on drop
//! - `Shader`: a single stage, compiled from a string or a `Locator`
//! - `Program`: attached shaders linked into one pipeline
//! - **Drivers**
//!   * `GlowDriver` issues real OpenGL calls
//!   * `HeadlessDriver` compiles and links in-process, for tools and tests
//!
//! Every object is only valid against the context that created it and only while that context is
//! current on the calling thread.  Violations come back as errors rather than as silently broken GL
//! state.

pub mod context;
pub mod driver;
pub mod handle;
pub mod program;
pub mod shader;

use shadecache_assets::{AssetError, Locator};

use crate::context::ContextId;
use crate::shader::ShaderStage;

pub mod prelude {
    pub use super::{ErrorCode, GlError, ERROR_DOMAIN};
    pub use crate::context::{Context, ContextId};
    pub use crate::driver::{Driver, GlslFlavor};
    pub use crate::handle::{ContextBound, Handle, ObjectKind};
    pub use crate::program::{Attachment, Program};
    pub use crate::shader::{Shader, ShaderStage};
}

/// Domain shared by every [`GlError`].  Pair it with [`ErrorCode`] to branch on failures.
pub const ERROR_DOMAIN: &str = "shadecache.gl";

/// Stable numeric codes within [`ERROR_DOMAIN`].  Values never change once published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    NoCurrentContext = 1,
    NotCurrent = 2,
    ContextMismatch = 3,
    MakeCurrentFailed = 4,
    ResourceReadFailed = 5,
    CompileFailed = 6,
    LinkingFailed = 7,
    EmptyShaderList = 8,
    AlreadyAttached = 9,
    NotAttached = 10,
}

impl ErrorCode {
    pub fn value(self) -> i32 {
        self as i32
    }
}

#[derive(thiserror::Error, Debug)]
pub enum GlError {
    #[error("no GL context is current on this thread")]
    NoCurrentContext,

    #[error("{context} is not current on this thread")]
    NotCurrent { context: ContextId },

    #[error("object belongs to {found}, expected {expected}")]
    ContextMismatch {
        expected: ContextId,
        found: ContextId,
    },

    #[error("failed to make {context} current: {reason}")]
    MakeCurrent { context: ContextId, reason: String },

    #[error("failed to read shader source {locator}: {source}")]
    ResourceRead {
        locator: Locator,
        #[source]
        source: AssetError,
    },

    #[error("{stage} shader failed to compile:\n{log}")]
    ShaderCompile { stage: ShaderStage, log: String },

    #[error("program failed to link:\n{log}")]
    Link { log: String },

    #[error("a program needs at least one shader")]
    EmptyShaderList,

    #[error("shader {shader} is already attached")]
    AlreadyAttached { shader: u32 },

    #[error("shader {shader} is not attached to program {program}")]
    NotAttached { shader: u32, program: u32 },
}

impl GlError {
    pub fn domain(&self) -> &'static str {
        ERROR_DOMAIN
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            GlError::NoCurrentContext => ErrorCode::NoCurrentContext,
            GlError::NotCurrent { .. } => ErrorCode::NotCurrent,
            GlError::ContextMismatch { .. } => ErrorCode::ContextMismatch,
            GlError::MakeCurrent { .. } => ErrorCode::MakeCurrentFailed,
            GlError::ResourceRead { .. } => ErrorCode::ResourceReadFailed,
            GlError::ShaderCompile { .. } => ErrorCode::CompileFailed,
            GlError::Link { .. } => ErrorCode::LinkingFailed,
            GlError::EmptyShaderList => ErrorCode::EmptyShaderList,
            GlError::AlreadyAttached { .. } => ErrorCode::AlreadyAttached,
            GlError::NotAttached { .. } => ErrorCode::NotAttached,
        }
    }

    /// Verbatim compiler or linker output, when the failure carries one.
    pub fn diagnostic_log(&self) -> Option<&str> {
        match self {
            GlError::ShaderCompile { log, .. } | GlError::Link { log } => Some(log),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ErrorCode::LinkingFailed.value(), 7);
        assert_eq!(ErrorCode::CompileFailed.value(), 6);

        let err = GlError::Link {
            log: "error: varying mismatch".to_owned(),
        };
        assert_eq!(err.domain(), "shadecache.gl");
        assert_eq!(err.code(), ErrorCode::LinkingFailed);
        assert_eq!(err.diagnostic_log(), Some("error: varying mismatch"));
        assert_eq!(GlError::EmptyShaderList.diagnostic_log(), None);
    }
}
