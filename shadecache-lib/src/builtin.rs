// Copyright 2026 The shadecache Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Built-in Programs
//!
//! Programs every renderer needs, with sources for each GLSL flavour.  A [`Catalog`] decides where
//! the sources come from.  [`Embedded`] serves the copies compiled into the binary and
//! [`AssetCatalog`] reads them from asset directories, so installs can patch shaders without a
//! rebuild.
//!
//! Assets follow the embedded layout: `shaders/<flavour>/<program>/<stage>.glsl`.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use shadecache_assets::{AssetDirs, Locator, ReadText};
use shadecache_gl::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinProgram {
    /// Position and texture coordinate in, one sampled texture out.
    TexturedTriangle,
}

impl BuiltinProgram {
    pub const ALL: [BuiltinProgram; 1] = [BuiltinProgram::TexturedTriangle];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinProgram::TexturedTriangle => "textured_triangle",
        }
    }

    /// Vertex attribute bindings applied before linking.
    pub fn attributes(self) -> &'static [(u32, &'static str)] {
        match self {
            BuiltinProgram::TexturedTriangle => &[(0, "a_position"), (1, "a_texcoord")],
        }
    }

    /// Stages making up the program, in attachment order.
    pub fn stages(self) -> &'static [ShaderStage] {
        match self {
            BuiltinProgram::TexturedTriangle => &[ShaderStage::Vertex, ShaderStage::Fragment],
        }
    }

    /// Asset name for one stage, e.g. `vulkan/textured_triangle/vertex`.
    pub fn asset_name(self, flavor: GlslFlavor, stage: ShaderStage) -> String {
        format!("{flavor}/{}/{stage}", self.name())
    }
}

impl fmt::Display for BuiltinProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSource {
    pub stage: ShaderStage,
    pub code: Cow<'static, str>,
}

/// Source text for built-in programs.
pub trait Catalog: Send + Sync {
    fn sources(
        &self,
        program: BuiltinProgram,
        flavor: GlslFlavor,
    ) -> Result<Vec<StageSource>, GlError>;
}

impl<C: Catalog + ?Sized> Catalog for Box<C> {
    fn sources(
        &self,
        program: BuiltinProgram,
        flavor: GlslFlavor,
    ) -> Result<Vec<StageSource>, GlError> {
        (**self).sources(program, flavor)
    }
}

impl<C: Catalog + ?Sized> Catalog for Arc<C> {
    fn sources(
        &self,
        program: BuiltinProgram,
        flavor: GlslFlavor,
    ) -> Result<Vec<StageSource>, GlError> {
        (**self).sources(program, flavor)
    }
}

/// Sources compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct Embedded;

fn embedded(program: BuiltinProgram, flavor: GlslFlavor, stage: ShaderStage) -> &'static str {
    use BuiltinProgram::*;
    use GlslFlavor::*;
    use ShaderStage::*;

    match (program, flavor, stage) {
        (TexturedTriangle, Vulkan, Vertex) => {
            include_str!("../assets/shaders/vulkan/textured_triangle/vertex.glsl")
        }
        (TexturedTriangle, Vulkan, Fragment) => {
            include_str!("../assets/shaders/vulkan/textured_triangle/fragment.glsl")
        }
        (TexturedTriangle, OpenGl, Vertex) => {
            include_str!("../assets/shaders/opengl/textured_triangle/vertex.glsl")
        }
        (TexturedTriangle, OpenGl, Fragment) => {
            include_str!("../assets/shaders/opengl/textured_triangle/fragment.glsl")
        }
        (TexturedTriangle, _, Geometry | Compute) => "",
    }
}

impl Catalog for Embedded {
    fn sources(
        &self,
        program: BuiltinProgram,
        flavor: GlslFlavor,
    ) -> Result<Vec<StageSource>, GlError> {
        Ok(program
            .stages()
            .iter()
            .map(|&stage| StageSource {
                stage,
                code: Cow::Borrowed(embedded(program, flavor, stage)),
            })
            .collect())
    }
}

/// Sources read from asset directories every time a program is built.
#[derive(Debug, Clone)]
pub struct AssetCatalog {
    dirs: AssetDirs,
}

impl AssetCatalog {
    pub fn new(dirs: AssetDirs) -> Self {
        AssetCatalog { dirs }
    }
}

impl Catalog for AssetCatalog {
    fn sources(
        &self,
        program: BuiltinProgram,
        flavor: GlslFlavor,
    ) -> Result<Vec<StageSource>, GlError> {
        program
            .stages()
            .iter()
            .map(|&stage| {
                let locator = Locator::Asset(program.asset_name(flavor, stage));
                let code = self
                    .dirs
                    .read_text(&locator)
                    .map_err(|source| GlError::ResourceRead { locator, source })?;
                Ok(StageSource {
                    stage,
                    code: Cow::Owned(code),
                })
            })
            .collect()
    }
}
