// Copyright 2026 The shadecache Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Handle
//!
//! One wrapper, one name, one deletion.  A `Handle` is not `Clone`; share it with `Arc` at a higher
//! layer if you must.

use std::fmt;

use crate::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Shader,
    Program,
}

/// An object name allocated in `context`, deleted when the handle drops.
pub struct Handle {
    id: u32,
    kind: ObjectKind,
    context: Context,
}

impl Handle {
    /// Allocates a shader name.
    ///
    /// # Panics
    ///
    /// When the driver cannot allocate a name at all.  Under correct usage this only happens when
    /// the GL context itself is lost.
    pub(crate) fn shader(context: &Context, stage: ShaderStage) -> Result<Self, GlError> {
        context.ensure_current()?;
        let id = context
            .driver()
            .create_shader(stage)
            .unwrap_or_else(|e| panic!("{}: shader allocation failed: {e}", context.id()));
        Ok(Self::adopt(context, ObjectKind::Shader, id))
    }

    /// Allocates a program name.
    ///
    /// # Panics
    ///
    /// When the driver cannot allocate a name at all.
    pub(crate) fn program(context: &Context) -> Result<Self, GlError> {
        context.ensure_current()?;
        let id = context
            .driver()
            .create_program()
            .unwrap_or_else(|e| panic!("{}: program allocation failed: {e}", context.id()));
        Ok(Self::adopt(context, ObjectKind::Program, id))
    }

    fn adopt(context: &Context, kind: ObjectKind, id: u32) -> Self {
        log::debug!("{}: created {kind:?} {id}", context.id());
        Handle {
            id,
            kind,
            context: context.clone(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn context(&self) -> &Context {
        &self.context
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.context.release(self.kind, self.id);
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("context", &self.context.id())
            .finish()
    }
}

/// Anything owning a [`Handle`].
pub trait ContextBound {
    fn handle(&self) -> &Handle;

    fn id(&self) -> u32 {
        self.handle().id()
    }

    fn context(&self) -> &Context {
        self.handle().context()
    }

    /// `ContextMismatch` unless this object lives in `expected`.
    fn ensure_context(&self, expected: &Context) -> Result<(), GlError> {
        if self.context() == expected {
            Ok(())
        } else {
            Err(GlError::ContextMismatch {
                expected: expected.id(),
                found: self.context().id(),
            })
        }
    }
}

impl ContextBound for Handle {
    fn handle(&self) -> &Handle {
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::driver::headless::HeadlessDriver;
    use std::sync::Arc;

    #[test]
    fn test_drop_deletes_once() {
        let driver = Arc::new(HeadlessDriver::new());
        let context = Context::new(driver.clone());
        context.make_current().unwrap();

        let handle = Handle::program(&context).unwrap();
        let id = handle.id();
        assert!(driver.is_live(id));
        assert_eq!(handle.kind(), ObjectKind::Program);

        drop(handle);
        assert!(!driver.is_live(id));
        assert_eq!(driver.deletes(), 1);
        Context::clear_current();
    }

    #[test]
    fn test_allocation_requires_current() {
        let driver = Arc::new(HeadlessDriver::new());
        let context = Context::new(driver.clone());
        Context::clear_current();

        assert!(matches!(
            Handle::shader(&context, ShaderStage::Vertex),
            Err(GlError::NoCurrentContext)
        ));
        assert_eq!(driver.live_objects(), 0);
    }

    #[test]
    fn test_off_context_drop_is_deferred() {
        let driver = Arc::new(HeadlessDriver::new());
        let context = Context::new(driver.clone());
        context.make_current().unwrap();
        let handle = Handle::shader(&context, ShaderStage::Fragment).unwrap();
        let id = handle.id();

        // Drop on a thread where nothing is current.
        std::thread::spawn(move || drop(handle)).join().unwrap();
        assert!(driver.is_live(id));
        assert_eq!(context.pending_orphans(), 1);

        assert_eq!(context.collect_orphans().unwrap(), 1);
        assert!(!driver.is_live(id));
        assert_eq!(context.pending_orphans(), 0);
        Context::clear_current();
    }

    #[test]
    fn test_orphans_flush_on_make_current() {
        let driver = Arc::new(HeadlessDriver::new());
        let context = Context::new(driver.clone());
        let other = Context::new(HeadlessDriver::new());

        context.make_current().unwrap();
        let handle = Handle::program(&context).unwrap();
        let id = handle.id();

        other.make_current().unwrap();
        drop(handle);
        assert!(driver.is_live(id));

        context.make_current().unwrap();
        assert!(!driver.is_live(id));
        Context::clear_current();
    }

    #[test]
    fn test_ensure_context() {
        let a = Context::new(HeadlessDriver::new());
        let b = Context::new(HeadlessDriver::new());
        a.make_current().unwrap();
        let handle = Handle::program(&a).unwrap();

        assert!(handle.ensure_context(&a).is_ok());
        assert!(matches!(
            handle.ensure_context(&b),
            Err(GlError::ContextMismatch { expected, found }) if expected == b.id() && found == a.id()
        ));
        Context::clear_current();
    }
}
