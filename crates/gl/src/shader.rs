// Copyright 2026 The shadecache Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Shader
//!
//! A single shader stage.  The name is allocated up front; source arrives later and is compiled in
//! place.  A failed compile leaves the name allocated so the caller can load corrected source into
//! the same object.

use std::fmt;

use shadecache_assets::{Locator, ReadText};

use crate::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
    Compute,
}

impl ShaderStage {
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Compute => "compute",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug)]
pub struct Shader {
    handle: Handle,
    stage: ShaderStage,
    compiled: bool,
}

impl Shader {
    /// Allocates an empty shader in `context`, which must be current.
    pub fn new(context: &Context, stage: ShaderStage) -> Result<Self, GlError> {
        Ok(Shader {
            handle: Handle::shader(context, stage)?,
            stage,
            compiled: false,
        })
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    /// Replaces the source and compiles it.  The compiler log comes back verbatim on failure.
    pub fn load_source(&mut self, code: &str) -> Result<(), GlError> {
        let context = self.handle.context();
        context.ensure_current()?;
        let driver = context.driver();
        let id = self.handle.id();

        driver.shader_source(id, code);
        driver.compile_shader(id);
        self.compiled = driver.shader_compile_status(id);

        if self.compiled {
            log::debug!("{}: compiled {} shader {id}", context.id(), self.stage);
            Ok(())
        } else {
            let log = driver.shader_info_log(id);
            log::warn!("{} shader {id} failed to compile:\n{log}", self.stage);
            Err(GlError::ShaderCompile {
                stage: self.stage,
                log,
            })
        }
    }

    /// Reads source through `reader`, then behaves as [`Shader::load_source`].  Read failures are
    /// reported as `ResourceRead` and leave the shader untouched.
    pub fn load_from<R>(&mut self, locator: &Locator, reader: &R) -> Result<(), GlError>
    where
        R: ReadText + ?Sized,
    {
        let code = reader
            .read_text(locator)
            .map_err(|source| GlError::ResourceRead {
                locator: locator.clone(),
                source,
            })?;
        self.load_source(&code)
    }
}

impl ContextBound for Shader {
    fn handle(&self) -> &Handle {
        &self.handle
    }
}
