// Copyright 2026 The shadecache Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Glow Driver
//!
//! Real OpenGL through `glow`.  The windowing layer owns the platform context and hands us two
//! things: the loaded function table and a closure that makes that context current.

use std::num::NonZeroU32;

use glow::HasContext;

use super::{Driver, GlslFlavor};
use crate::shader::ShaderStage;

type MakeCurrent = dyn Fn() -> Result<(), String> + Send + Sync;

pub struct GlowDriver {
    gl: glow::Context,
    make_current: Box<MakeCurrent>,
}

// SAFETY: `glow::Context` is a table of function pointers.  Every call below happens through a
// `Context` wrapper that first checks the owning context is current on the calling thread, which is
// the only requirement GL places on cross-thread use.
unsafe impl Send for GlowDriver {}
unsafe impl Sync for GlowDriver {}

impl GlowDriver {
    /// # Safety
    ///
    /// `gl` must have been loaded for the same platform context that `make_current` binds, and that
    /// platform context must outlive the driver.
    pub unsafe fn new<F>(gl: glow::Context, make_current: F) -> Self
    where
        F: Fn() -> Result<(), String> + Send + Sync + 'static,
    {
        GlowDriver {
            gl,
            make_current: Box::new(make_current),
        }
    }

    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }
}

fn native_shader(id: u32) -> Option<glow::Shader> {
    NonZeroU32::new(id).map(glow::NativeShader)
}

fn native_program(id: u32) -> Option<glow::Program> {
    NonZeroU32::new(id).map(glow::NativeProgram)
}

fn gl_stage(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        ShaderStage::Geometry => glow::GEOMETRY_SHADER,
        ShaderStage::Compute => glow::COMPUTE_SHADER,
    }
}

impl Driver for GlowDriver {
    fn flavor(&self) -> GlslFlavor {
        GlslFlavor::OpenGl
    }

    fn make_current(&self) -> Result<(), String> {
        (self.make_current)()
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<u32, String> {
        let shader = unsafe { self.gl.create_shader(gl_stage(stage))? };
        Ok(shader.0.get())
    }

    fn shader_source(&self, shader: u32, source: &str) {
        if let Some(shader) = native_shader(shader) {
            unsafe { self.gl.shader_source(shader, source) }
        }
    }

    fn compile_shader(&self, shader: u32) {
        if let Some(shader) = native_shader(shader) {
            unsafe { self.gl.compile_shader(shader) }
        }
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        native_shader(shader).is_some_and(|shader| unsafe { self.gl.get_shader_compile_status(shader) })
    }

    fn shader_info_log(&self, shader: u32) -> String {
        native_shader(shader)
            .map(|shader| unsafe { self.gl.get_shader_info_log(shader) })
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: u32) {
        if let Some(shader) = native_shader(shader) {
            unsafe { self.gl.delete_shader(shader) }
        }
    }

    fn create_program(&self) -> Result<u32, String> {
        let program = unsafe { self.gl.create_program()? };
        Ok(program.0.get())
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        if let (Some(program), Some(shader)) = (native_program(program), native_shader(shader)) {
            unsafe { self.gl.attach_shader(program, shader) }
        }
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        if let (Some(program), Some(shader)) = (native_program(program), native_shader(shader)) {
            unsafe { self.gl.detach_shader(program, shader) }
        }
    }

    fn bind_attrib_location(&self, program: u32, index: u32, name: &str) {
        if let Some(program) = native_program(program) {
            unsafe { self.gl.bind_attrib_location(program, index, name) }
        }
    }

    fn link_program(&self, program: u32) {
        if let Some(program) = native_program(program) {
            unsafe { self.gl.link_program(program) }
        }
    }

    fn program_link_status(&self, program: u32) -> bool {
        native_program(program).is_some_and(|program| unsafe { self.gl.get_program_link_status(program) })
    }

    fn program_info_log(&self, program: u32) -> String {
        native_program(program)
            .map(|program| unsafe { self.gl.get_program_info_log(program) })
            .unwrap_or_default()
    }

    fn attrib_location(&self, program: u32, name: &str) -> Option<u32> {
        native_program(program).and_then(|program| unsafe { self.gl.get_attrib_location(program, name) })
    }

    fn delete_program(&self, program: u32) {
        if let Some(program) = native_program(program) {
            unsafe { self.gl.delete_program(program) }
        }
    }
}
