// Copyright 2026 The shadecache Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Program
//!
//! Attached shaders linked into one pipeline.
//!
//! Attach, detach and construction validate context membership and attachment state before any GL
//! call, so a failed call leaves the program exactly as it was.  A failed link leaves the program
//! unlinked but with its attachments intact: fix the offending shader and call [`Program::link`]
//! again.
//!
//! A shader stays alive on the GL side while attached, so dropping the [`Shader`] wrapper right
//! after attaching is fine.

use smallvec::SmallVec;

use crate::prelude::*;

/// A shader attached to a program, remembered by name so the wrapper may be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attachment {
    pub shader: u32,
    pub stage: ShaderStage,
}

#[derive(Debug)]
pub struct Program {
    handle: Handle,
    attached: SmallVec<Attachment, 4>,
    linked: bool,
    /// Attachments changed since the last successful link.
    stale: bool,
}

impl Program {
    /// Allocates an empty program in `context`, which must be current.
    pub fn new(context: &Context) -> Result<Self, GlError> {
        Ok(Program {
            handle: Handle::program(context)?,
            attached: SmallVec::new(),
            linked: false,
            stale: false,
        })
    }

    /// Allocates a program in the shaders' context and attaches them in order.  The program is not
    /// linked yet.
    ///
    /// Nothing is allocated unless `shaders` is non-empty, free of duplicates and confined to one
    /// context.
    pub fn with_shaders(shaders: &[&Shader]) -> Result<Self, GlError> {
        let first = shaders.first().ok_or(GlError::EmptyShaderList)?;
        let context = first.context();

        for (i, shader) in shaders.iter().enumerate() {
            shader.ensure_context(context)?;
            if shaders[..i].iter().any(|earlier| earlier.id() == shader.id()) {
                return Err(GlError::AlreadyAttached {
                    shader: shader.id(),
                });
            }
        }

        let mut program = Program::new(context)?;
        shaders
            .iter()
            .for_each(|shader| program.attach_unchecked(shader));
        Ok(program)
    }

    /// Attaches `shader`.  Re-link before using a program that was already linked.
    pub fn attach(&mut self, shader: &Shader) -> Result<(), GlError> {
        shader.ensure_context(self.handle.context())?;
        if self.position(shader).is_some() {
            return Err(GlError::AlreadyAttached {
                shader: shader.id(),
            });
        }
        self.handle.context().ensure_current()?;
        self.attach_unchecked(shader);
        Ok(())
    }

    /// Detaches `shader` without deleting it.
    pub fn detach(&mut self, shader: &Shader) -> Result<(), GlError> {
        shader.ensure_context(self.handle.context())?;
        let Some(index) = self.position(shader) else {
            return Err(GlError::NotAttached {
                shader: shader.id(),
                program: self.handle.id(),
            });
        };
        let context = self.handle.context();
        context.ensure_current()?;

        context.driver().detach_shader(self.handle.id(), shader.id());
        self.attached.remove(index);
        self.stale |= self.linked;
        log::debug!(
            "{}: detached shader {} from program {}",
            context.id(),
            shader.id(),
            self.handle.id()
        );
        Ok(())
    }

    /// Binds vertex attribute `name` to location `index`.  Takes effect at the next link; explicit
    /// `layout(location = ..)` qualifiers in the shader take precedence.
    pub fn bind_attribute(&mut self, index: u32, name: &str) -> Result<(), GlError> {
        let context = self.handle.context();
        context.ensure_current()?;
        context
            .driver()
            .bind_attrib_location(self.handle.id(), index, name);
        self.stale |= self.linked;
        Ok(())
    }

    /// Links the attached shaders.  On failure the linker log is returned verbatim and the program
    /// is left unlinked with its attachments unchanged.
    pub fn link(&mut self) -> Result<(), GlError> {
        let context = self.handle.context();
        context.ensure_current()?;
        let driver = context.driver();
        let id = self.handle.id();

        driver.link_program(id);
        self.linked = driver.program_link_status(id);
        // Either up to date or not linked at all.
        self.stale = false;

        if self.linked {
            log::debug!(
                "{}: linked program {id} ({} shaders)",
                context.id(),
                self.attached.len()
            );
            Ok(())
        } else {
            let log = driver.program_info_log(id);
            log::warn!("program {id} failed to link:\n{log}");
            Err(GlError::Link { log })
        }
    }

    /// Location of vertex attribute `name`, once linked.
    pub fn attribute_location(&self, name: &str) -> Result<Option<u32>, GlError> {
        let context = self.handle.context();
        context.ensure_current()?;
        if !self.linked {
            return Ok(None);
        }
        Ok(context.driver().attrib_location(self.handle.id(), name))
    }

    pub fn attached(&self) -> &[Attachment] {
        &self.attached
    }

    pub fn is_attached(&self, shader: &Shader) -> bool {
        self.position(shader).is_some()
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }

    /// Linked, but attachments or bindings changed since.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Linked and up to date with its attachments.
    pub fn is_ready(&self) -> bool {
        self.linked && !self.stale
    }

    fn position(&self, shader: &Shader) -> Option<usize> {
        self.attached
            .iter()
            .position(|attachment| attachment.shader == shader.id())
    }

    fn attach_unchecked(&mut self, shader: &Shader) {
        let context = self.handle.context();
        context.driver().attach_shader(self.handle.id(), shader.id());
        self.attached.push(Attachment {
            shader: shader.id(),
            stage: shader.stage(),
        });
        self.stale |= self.linked;
        log::debug!(
            "{}: attached {} shader {} to program {}",
            context.id(),
            shader.stage(),
            shader.id(),
            self.handle.id()
        );
    }
}

impl ContextBound for Program {
    fn handle(&self) -> &Handle {
        &self.handle
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::driver::headless::HeadlessDriver;
    use std::sync::Arc;

    const VERTEX: &str = "#version 450
layout(location = 0) in vec4 a_position;
layout(location = 1) in vec2 a_texcoord;
layout(location = 0) out vec2 v_texcoord;
void main() {
    v_texcoord = a_texcoord;
    gl_Position = a_position;
}
";

    const FRAGMENT: &str = "#version 450
layout(location = 0) in vec2 v_texcoord;
layout(location = 0) out vec4 o_color;
void main() {
    o_color = vec4(v_texcoord, 0.0, 1.0);
}
";

    fn current() -> (Arc<HeadlessDriver>, Context) {
        let driver = Arc::new(HeadlessDriver::new());
        let context = Context::new(driver.clone());
        context.make_current().unwrap();
        (driver, context)
    }

    fn shader(context: &Context, stage: ShaderStage, source: &str) -> Shader {
        let mut shader = Shader::new(context, stage).unwrap();
        shader.load_source(source).unwrap();
        shader
    }

    #[test]
    fn test_empty_shader_list() {
        let (driver, _context) = current();
        let err = Program::with_shaders(&[]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::EmptyShaderList);
        assert_eq!(driver.programs_created(), 0);
    }

    #[test]
    fn test_link_and_relink() {
        let (driver, context) = current();
        let vertex = shader(&context, ShaderStage::Vertex, VERTEX);
        let fragment = shader(&context, ShaderStage::Fragment, FRAGMENT);

        let mut program = Program::with_shaders(&[&vertex, &fragment]).unwrap();
        assert_eq!(program.context(), &context);
        assert_eq!(
            program.attached(),
            &[
                Attachment {
                    shader: vertex.id(),
                    stage: ShaderStage::Vertex
                },
                Attachment {
                    shader: fragment.id(),
                    stage: ShaderStage::Fragment
                },
            ]
        );
        assert!(!program.is_linked());
        assert_eq!(program.attribute_location("a_position").unwrap(), None);

        program.link().unwrap();
        assert!(program.is_ready());
        program.link().unwrap();
        assert!(program.is_ready());
        assert_eq!(driver.links(), 2);

        assert_eq!(program.attribute_location("a_position").unwrap(), Some(0));
        assert_eq!(program.attribute_location("a_texcoord").unwrap(), Some(1));
        assert_eq!(program.attribute_location("a_normal").unwrap(), None);
    }

    #[test]
    fn test_attach_twice() {
        let (_driver, context) = current();
        let vertex = shader(&context, ShaderStage::Vertex, VERTEX);
        let mut program = Program::new(&context).unwrap();

        program.attach(&vertex).unwrap();
        let err = program.attach(&vertex).unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyAttached);
        assert_eq!(program.attached().len(), 1);

        let err = Program::with_shaders(&[&vertex, &vertex]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::AlreadyAttached);
    }

    #[test]
    fn test_detach_unattached() {
        let (driver, context) = current();
        let vertex = shader(&context, ShaderStage::Vertex, VERTEX);
        let fragment = shader(&context, ShaderStage::Fragment, FRAGMENT);
        let mut program = Program::with_shaders(&[&vertex]).unwrap();

        let err = program.detach(&fragment).unwrap_err();
        assert!(matches!(
            err,
            GlError::NotAttached { shader, program: p } if shader == fragment.id() && p == program.id()
        ));

        program.detach(&vertex).unwrap();
        assert!(program.attached().is_empty());
        // Detaching does not delete.
        assert!(driver.is_live(vertex.id()));
        assert!(matches!(
            program.detach(&vertex),
            Err(GlError::NotAttached { .. })
        ));
    }

    #[test]
    fn test_context_mismatch_allocates_nothing() {
        let (driver, a) = current();
        let other = Arc::new(HeadlessDriver::new());
        let b = Context::new(other.clone());

        let vertex = shader(&a, ShaderStage::Vertex, VERTEX);
        b.make_current().unwrap();
        let fragment = shader(&b, ShaderStage::Fragment, FRAGMENT);

        let err = Program::with_shaders(&[&vertex, &fragment]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ContextMismatch);
        assert_eq!(driver.programs_created(), 0);
        assert_eq!(other.programs_created(), 0);

        a.make_current().unwrap();
        let mut program = Program::new(&a).unwrap();
        let err = program.attach(&fragment).unwrap_err();
        assert!(matches!(
            err,
            GlError::ContextMismatch { expected, found } if expected == a.id() && found == b.id()
        ));
        assert!(program.attached().is_empty());
        assert!(driver.attached_to(program.id()).is_empty());
    }

    #[test]
    fn test_failed_link_keeps_attachments() {
        let (driver, context) = current();
        let vertex = shader(&context, ShaderStage::Vertex, VERTEX);
        let mut fragment = shader(
            &context,
            ShaderStage::Fragment,
            "#version 450
layout(location = 0) in vec2 v_texcoord;
layout(location = 1) in vec4 v_tint;
layout(location = 0) out vec4 o_color;
void main() {
    o_color = v_tint * vec4(v_texcoord, 0.0, 1.0);
}
",
        );

        let mut program = Program::with_shaders(&[&vertex, &fragment]).unwrap();
        let before = program.attached().to_vec();

        let err = program.link().unwrap_err();
        assert_eq!(err.code(), ErrorCode::LinkingFailed);
        let log = err.diagnostic_log().unwrap();
        assert!(log.contains("location 1"), "{log}");
        assert!(!program.is_linked());
        assert_eq!(program.attached(), before.as_slice());
        assert_eq!(
            driver.attached_to(program.id()),
            vec![vertex.id(), fragment.id()]
        );

        // Fix the fragment shader in place and retry.
        fragment.load_source(FRAGMENT).unwrap();
        program.link().unwrap();
        assert!(program.is_ready());
    }

    #[test]
    fn test_bound_attribute_location() {
        let (_driver, context) = current();
        let vertex = shader(
            &context,
            ShaderStage::Vertex,
            "#version 450
in vec4 a_position;
void main() {
    gl_Position = a_position;
}
",
        );
        let mut program = Program::with_shaders(&[&vertex]).unwrap();
        program.bind_attribute(5, "a_position").unwrap();
        program.link().unwrap();
        assert_eq!(program.attribute_location("a_position").unwrap(), Some(5));

        // Explicit qualifiers are not moved by a binding.
        let explicit = shader(&context, ShaderStage::Vertex, VERTEX);
        let mut program = Program::with_shaders(&[&explicit]).unwrap();
        program.bind_attribute(5, "a_position").unwrap();
        program.link().unwrap();
        assert_eq!(program.attribute_location("a_position").unwrap(), Some(0));
    }

    #[test]
    fn test_failed_relink_is_not_stale() {
        let (_driver, context) = current();
        let vertex = shader(&context, ShaderStage::Vertex, VERTEX);
        let mut program = Program::with_shaders(&[&vertex]).unwrap();
        program.link().unwrap();

        let second = shader(&context, ShaderStage::Vertex, VERTEX);
        program.attach(&second).unwrap();
        assert!(program.is_stale());

        // Two vertex shaders never link.
        assert!(program.link().is_err());
        assert!(!program.is_linked());
        assert!(!program.is_stale());
        assert!(!program.is_ready());
    }

    #[test]
    fn test_changes_after_link_mark_stale() {
        let (_driver, context) = current();
        let vertex = shader(&context, ShaderStage::Vertex, VERTEX);
        let fragment = shader(&context, ShaderStage::Fragment, FRAGMENT);
        let mut program = Program::with_shaders(&[&vertex]).unwrap();
        program.link().unwrap();
        assert!(program.is_ready());

        program.attach(&fragment).unwrap();
        assert!(program.is_linked());
        assert!(program.is_stale());
        assert!(!program.is_ready());

        program.link().unwrap();
        assert!(program.is_ready());

        program.bind_attribute(3, "a_extra").unwrap();
        assert!(program.is_stale());
    }

    #[test]
    fn test_dropped_shaders_stay_attached() {
        let (driver, context) = current();
        let mut program = {
            let vertex = shader(&context, ShaderStage::Vertex, VERTEX);
            let fragment = shader(&context, ShaderStage::Fragment, FRAGMENT);
            Program::with_shaders(&[&vertex, &fragment]).unwrap()
        };
        assert_eq!(driver.live_shaders(), 2);

        program.link().unwrap();
        assert!(program.is_ready());

        drop(program);
        assert_eq!(driver.live_objects(), 0);
    }
}
