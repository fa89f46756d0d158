// Copyright 2026 The shadecache Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Drivers
//!
//! A `Driver` is the narrow slice of the GL entry points this crate needs, plus the platform hook
//! that makes a context current.  Methods map one-to-one onto their `gl*` namesakes and share their
//! semantics, including deleting an attached shader only once it is detached.
//!
//! Callers never see invalid names: wrappers check context affinity before calling in, so drivers
//! may treat a bad name as a bug.

pub mod headless;

#[cfg(feature = "glow")]
pub mod glow;

use std::fmt;
use std::sync::Arc;

use crate::shader::ShaderStage;

/// Which GLSL dialect a driver compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlslFlavor {
    /// Desktop GLSL 330 core: combined samplers, attribute locations bound before linking.
    OpenGl,
    /// GLSL 450 as written for Vulkan: explicit locations everywhere, separate textures and
    /// samplers.
    Vulkan,
}

impl GlslFlavor {
    pub const ALL: [GlslFlavor; 2] = [GlslFlavor::OpenGl, GlslFlavor::Vulkan];

    pub fn name(self) -> &'static str {
        match self {
            GlslFlavor::OpenGl => "opengl",
            GlslFlavor::Vulkan => "vulkan",
        }
    }
}

impl fmt::Display for GlslFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub trait Driver: Send + Sync {
    fn flavor(&self) -> GlslFlavor;

    /// Binds the underlying context to the calling thread.
    fn make_current(&self) -> Result<(), String>;

    fn create_shader(&self, stage: ShaderStage) -> Result<u32, String>;
    fn shader_source(&self, shader: u32, source: &str);
    fn compile_shader(&self, shader: u32);
    fn shader_compile_status(&self, shader: u32) -> bool;
    fn shader_info_log(&self, shader: u32) -> String;
    fn delete_shader(&self, shader: u32);

    fn create_program(&self) -> Result<u32, String>;
    fn attach_shader(&self, program: u32, shader: u32);
    fn detach_shader(&self, program: u32, shader: u32);
    fn bind_attrib_location(&self, program: u32, index: u32, name: &str);
    fn link_program(&self, program: u32);
    fn program_link_status(&self, program: u32) -> bool;
    fn program_info_log(&self, program: u32) -> String;
    fn attrib_location(&self, program: u32, name: &str) -> Option<u32>;
    fn delete_program(&self, program: u32);
}

// Lets callers keep a typed reference to a driver they handed to a `Context`.
impl<D: Driver + ?Sized> Driver for Arc<D> {
    fn flavor(&self) -> GlslFlavor {
        (**self).flavor()
    }

    fn make_current(&self) -> Result<(), String> {
        (**self).make_current()
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<u32, String> {
        (**self).create_shader(stage)
    }

    fn shader_source(&self, shader: u32, source: &str) {
        (**self).shader_source(shader, source)
    }

    fn compile_shader(&self, shader: u32) {
        (**self).compile_shader(shader)
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        (**self).shader_compile_status(shader)
    }

    fn shader_info_log(&self, shader: u32) -> String {
        (**self).shader_info_log(shader)
    }

    fn delete_shader(&self, shader: u32) {
        (**self).delete_shader(shader)
    }

    fn create_program(&self) -> Result<u32, String> {
        (**self).create_program()
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        (**self).attach_shader(program, shader)
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        (**self).detach_shader(program, shader)
    }

    fn bind_attrib_location(&self, program: u32, index: u32, name: &str) {
        (**self).bind_attrib_location(program, index, name)
    }

    fn link_program(&self, program: u32) {
        (**self).link_program(program)
    }

    fn program_link_status(&self, program: u32) -> bool {
        (**self).program_link_status(program)
    }

    fn program_info_log(&self, program: u32) -> String {
        (**self).program_info_log(program)
    }

    fn attrib_location(&self, program: u32, name: &str) -> Option<u32> {
        (**self).attrib_location(program, name)
    }

    fn delete_program(&self, program: u32) {
        (**self).delete_program(program)
    }
}
