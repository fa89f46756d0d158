// Copyright 2026 The shadecache Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Program Cache
//!
//! Built-in programs, built at most once per context.
//!
//! The map lock is only held long enough to find or insert the slot for a key.  The slot lock is
//! held across check-then-build, so racing callers for one key wait on a single build while other
//! keys proceed.  A failed build leaves the slot empty and the next caller tries again.
//!
//! Entries live until [`ProgramCache::purge_context`] or until the cache itself drops.  The global
//! cache is never dropped, so purge contexts you are done with.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use shadecache_gl::prelude::*;

use crate::builtin::{BuiltinProgram, Catalog, Embedded};

type Key = (ContextId, BuiltinProgram);
type Slot = Arc<Mutex<Option<Arc<Program>>>>;

static GLOBAL: OnceLock<ProgramCache> = OnceLock::new();

pub struct ProgramCache {
    catalog: Box<dyn Catalog>,
    slots: Mutex<HashMap<Key, Slot>>,
}

impl Default for ProgramCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramCache {
    /// A cache serving the embedded sources.
    pub fn new() -> Self {
        Self::with_catalog(Embedded)
    }

    pub fn with_catalog<C: Catalog + 'static>(catalog: C) -> Self {
        ProgramCache {
            catalog: Box::new(catalog),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide cache, created on first use.
    pub fn global() -> &'static ProgramCache {
        GLOBAL.get_or_init(ProgramCache::new)
    }

    /// Returns the linked `program` for `context`, building it on first request.  `context` must be
    /// current on the calling thread whenever a build is needed.
    pub fn program_for(
        &self,
        program: BuiltinProgram,
        context: &Context,
    ) -> Result<Arc<Program>, GlError> {
        let key = (context.id(), program);
        let slot = self.slots.lock().entry(key).or_default().clone();

        let mut entry = slot.lock();
        if let Some(cached) = entry.as_ref() {
            log::debug!("{}: cache hit for {program}", context.id());
            return Ok(cached.clone());
        }

        log::debug!("{}: building {program}", context.id());
        let built = Arc::new(self.build(program, context)?);
        *entry = Some(built.clone());
        Ok(built)
    }

    /// Forgets every program built for `context`, returning how many were dropped.  Programs still
    /// held elsewhere stay alive until their last `Arc` goes.
    pub fn purge_context(&self, context: &Context) -> usize {
        let id = context.id();
        let mut slots = self.slots.lock();
        let before = slots.len();
        slots.retain(|(owner, _), _| *owner != id);
        let purged = before - slots.len();
        if purged > 0 {
            log::debug!("{id}: purged {purged} cached programs");
        }
        purged
    }

    /// Number of keys with a slot, including ones whose build failed.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Compiles each stage, binds attributes and links.  Shader wrappers drop on return; the
    /// program keeps them alive on the GL side.
    fn build(&self, program: BuiltinProgram, context: &Context) -> Result<Program, GlError> {
        context.ensure_current()?;
        let sources = self.catalog.sources(program, context.flavor())?;

        let shaders = sources
            .iter()
            .map(|source| {
                let mut shader = Shader::new(context, source.stage)?;
                shader.load_source(&source.code)?;
                Ok(shader)
            })
            .collect::<Result<Vec<_>, GlError>>()?;

        let refs: Vec<&Shader> = shaders.iter().collect();
        let mut linked = Program::with_shaders(&refs)?;
        for &(index, name) in program.attributes() {
            linked.bind_attribute(index, name)?;
        }
        linked.link()?;
        Ok(linked)
    }
}
