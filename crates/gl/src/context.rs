// Copyright 2026 The shadecache Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Context
//!
//! A `Context` is a clonable reference to one driver.  Clones compare equal; two contexts built
//! from different drivers never do, even if the drivers happen to be the same type.
//!
//! "Current" is tracked per thread.  Objects may only be touched while their context is current on
//! the acting thread.  Which threads may hold a context current at once is up to the driver: real
//! platforms allow one, the headless driver allows any number.
//!
//! ## Deletion
//!
//! Dropping a handle while its context is current deletes the object right away.  Otherwise the
//! name is parked on the context as an orphan and deleted the next time the context is made current
//! (or on [`Context::collect_orphans`]).  Names are never deleted against the wrong context.

use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::driver::{Driver, GlslFlavor};
use crate::handle::ObjectKind;
use crate::prelude::*;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: RefCell<Option<Context>> = const { RefCell::new(None) };
}

/// Process-unique context identity.  Never reused, so it is safe to key caches with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "context #{}", self.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct Orphan {
    kind: ObjectKind,
    id: u32,
}

struct Inner {
    id: ContextId,
    driver: Box<dyn Driver>,
    orphans: Mutex<Vec<Orphan>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let orphans = self.orphans.get_mut().len();
        if orphans > 0 {
            // The driver tears down the real context, which frees every remaining name.
            log::debug!("{} dropped with {orphans} orphaned objects", self.id);
        }
    }
}

#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Context {
    pub fn new<D: Driver + 'static>(driver: D) -> Self {
        let id = ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed));
        log::debug!("created {id} ({:?} GLSL)", driver.flavor());
        Context {
            inner: Arc::new(Inner {
                id,
                driver: Box::new(driver),
                orphans: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    /// The GLSL dialect this context's driver compiles.
    pub fn flavor(&self) -> GlslFlavor {
        self.inner.driver.flavor()
    }

    /// Binds this context to the calling thread and flushes deletions that were deferred while it
    /// was not current.
    pub fn make_current(&self) -> Result<(), GlError> {
        self.inner
            .driver
            .make_current()
            .map_err(|reason| GlError::MakeCurrent {
                context: self.id(),
                reason,
            })?;
        let previous = CURRENT.with(|current| current.borrow_mut().replace(self.clone()));
        // Dropped outside the borrow.
        drop(previous);
        self.delete_orphans();
        Ok(())
    }

    /// The context current on the calling thread.
    pub fn current() -> Result<Context, GlError> {
        CURRENT
            .try_with(|current| current.borrow().clone())
            .ok()
            .flatten()
            .ok_or(GlError::NoCurrentContext)
    }

    /// Forgets the calling thread's current context, returning it.
    ///
    /// Only the bookkeeping is cleared.  Releasing the context at the platform level is the
    /// windowing layer's business.
    pub fn clear_current() -> Option<Context> {
        CURRENT
            .try_with(|current| current.borrow_mut().take())
            .ok()
            .flatten()
    }

    pub fn is_current(&self) -> bool {
        CURRENT
            .try_with(|current| {
                current
                    .borrow()
                    .as_ref()
                    .is_some_and(|current| current == self)
            })
            .unwrap_or(false)
    }

    /// `Ok` when this context is current on the calling thread.
    pub fn ensure_current(&self) -> Result<(), GlError> {
        if self.is_current() {
            return Ok(());
        }
        match Context::current() {
            Ok(_) => Err(GlError::NotCurrent { context: self.id() }),
            Err(e) => Err(e),
        }
    }

    /// Deletes objects whose wrappers were dropped while this context was not current.  Returns
    /// how many were deleted.
    pub fn collect_orphans(&self) -> Result<usize, GlError> {
        self.ensure_current()?;
        Ok(self.delete_orphans())
    }

    /// Deferred deletions waiting for this context to become current.
    pub fn pending_orphans(&self) -> usize {
        self.inner.orphans.lock().len()
    }

    pub(crate) fn driver(&self) -> &dyn Driver {
        self.inner.driver.as_ref()
    }

    /// Deletes `id` now if possible, otherwise parks it until the context is current.
    pub(crate) fn release(&self, kind: ObjectKind, id: u32) {
        if self.is_current() {
            delete(self.driver(), kind, id);
        } else {
            log::trace!("deferring delete of {kind:?} {id} until {} is current", self.id());
            self.inner.orphans.lock().push(Orphan { kind, id });
        }
    }

    fn delete_orphans(&self) -> usize {
        let orphans = std::mem::take(&mut *self.inner.orphans.lock());
        orphans
            .iter()
            .for_each(|orphan| delete(self.driver(), orphan.kind, orphan.id));
        if !orphans.is_empty() {
            log::debug!("{} deleted {} orphaned objects", self.id(), orphans.len());
        }
        orphans.len()
    }
}

fn delete(driver: &dyn Driver, kind: ObjectKind, id: u32) {
    match kind {
        ObjectKind::Shader => driver.delete_shader(id),
        ObjectKind::Program => driver.delete_program(id),
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Context {}

impl std::hash::Hash for Context {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.inner.id)
            .field("flavor", &self.flavor())
            .finish()
    }
}
