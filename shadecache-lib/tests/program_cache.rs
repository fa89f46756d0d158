// Copyright 2026 The shadecache Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use shadecache_lib::gl::driver::headless::HeadlessDriver;
use shadecache_lib::prelude::*;
use shadecache_lib::{Embedded, StageSource};

fn current(driver: &Arc<HeadlessDriver>) -> Context {
    let context = Context::new(driver.clone());
    context.make_current().unwrap();
    context
}

#[test]
fn same_context_same_program() {
    let driver = Arc::new(HeadlessDriver::new());
    let context = current(&driver);
    let cache = ProgramCache::new();

    let first = cache
        .program_for(BuiltinProgram::TexturedTriangle, &context)
        .unwrap();
    let second = cache
        .program_for(BuiltinProgram::TexturedTriangle, &context)
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.id(), second.id());
    assert_eq!(first.context(), &context);
    assert_eq!(first.attribute_location("a_position").unwrap(), Some(0));
    assert_eq!(first.attribute_location("a_texcoord").unwrap(), Some(1));
    assert_eq!(driver.programs_created(), 1);
}

#[test]
fn contexts_get_distinct_programs() {
    let driver_a = Arc::new(HeadlessDriver::new());
    let driver_b = Arc::new(HeadlessDriver::new());
    let cache = ProgramCache::new();

    let a = current(&driver_a);
    let program_a = cache
        .program_for(BuiltinProgram::TexturedTriangle, &a)
        .unwrap();

    let b = current(&driver_b);
    let program_b = cache
        .program_for(BuiltinProgram::TexturedTriangle, &b)
        .unwrap();

    assert!(!Arc::ptr_eq(&program_a, &program_b));
    assert_eq!(program_a.context(), &a);
    assert_eq!(program_b.context(), &b);
    assert_eq!(cache.len(), 2);

    // A hit never needs the context to be current.
    let again = cache
        .program_for(BuiltinProgram::TexturedTriangle, &a)
        .unwrap();
    assert!(Arc::ptr_eq(&program_a, &again));
}

#[test]
fn concurrent_requests_build_once() {
    const THREADS: usize = 8;

    let driver = Arc::new(HeadlessDriver::new());
    let context = Context::new(driver.clone());
    let cache = Arc::new(ProgramCache::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let context = context.clone();
            let cache = cache.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                context.make_current().unwrap();
                barrier.wait();
                let program = cache
                    .program_for(BuiltinProgram::TexturedTriangle, &context)
                    .unwrap();
                let id = program.id();
                Context::clear_current();
                (program, id)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let (first, first_id) = &results[0];
    for (program, id) in &results {
        assert!(Arc::ptr_eq(first, program));
        assert_eq!(first_id, id);
    }
    assert_eq!(driver.programs_created(), 1);
    assert_eq!(driver.links(), 1);
}

/// Serves broken fragment source until told otherwise.
struct Flaky {
    broken: AtomicBool,
    calls: AtomicUsize,
}

impl Catalog for Flaky {
    fn sources(
        &self,
        program: BuiltinProgram,
        flavor: GlslFlavor,
    ) -> Result<Vec<StageSource>, GlError> {
        self.calls.fetch_add(1, Ordering::AcqRel);
        let mut sources = Embedded.sources(program, flavor)?;
        if self.broken.load(Ordering::Acquire) {
            for source in &mut sources {
                if source.stage == ShaderStage::Fragment {
                    source.code = Cow::Owned(source.code.replace("v_texcoord);", "v_texcoord)"));
                }
            }
        }
        Ok(sources)
    }
}

#[test]
fn failed_builds_are_not_cached() {
    let driver = Arc::new(HeadlessDriver::new());
    let context = current(&driver);
    let flaky = Arc::new(Flaky {
        broken: AtomicBool::new(true),
        calls: AtomicUsize::new(0),
    });
    let cache = ProgramCache::with_catalog(flaky.clone());

    let err = cache
        .program_for(BuiltinProgram::TexturedTriangle, &context)
        .unwrap_err();
    assert_eq!(err.domain(), ERROR_DOMAIN);
    assert_eq!(err.code(), ErrorCode::CompileFailed);
    assert!(err.diagnostic_log().is_some_and(|log| !log.is_empty()));
    // Shaders from the failed attempt are already gone.
    assert_eq!(driver.programs_created(), 0);
    assert_eq!(driver.live_objects(), 0);

    flaky.broken.store(false, Ordering::Release);
    let program = cache
        .program_for(BuiltinProgram::TexturedTriangle, &context)
        .unwrap();
    assert!(program.is_ready());
    assert_eq!(flaky.calls.load(Ordering::Acquire), 2);

    cache
        .program_for(BuiltinProgram::TexturedTriangle, &context)
        .unwrap();
    assert_eq!(flaky.calls.load(Ordering::Acquire), 2);
}

#[test]
fn link_failures_propagate() {
    struct Mismatched;

    impl Catalog for Mismatched {
        fn sources(
            &self,
            program: BuiltinProgram,
            flavor: GlslFlavor,
        ) -> Result<Vec<StageSource>, GlError> {
            let mut sources = Embedded.sources(program, flavor)?;
            for source in &mut sources {
                if source.stage == ShaderStage::Fragment {
                    source.code = Cow::Owned(source.code.replace("location = 0) in", "location = 4) in"));
                }
            }
            Ok(sources)
        }
    }

    let driver = Arc::new(HeadlessDriver::new());
    let context = current(&driver);
    let cache = ProgramCache::with_catalog(Mismatched);

    let err = cache
        .program_for(BuiltinProgram::TexturedTriangle, &context)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::LinkingFailed);
    assert!(err.diagnostic_log().unwrap().contains("location 4"));
    assert_eq!(driver.live_objects(), 0);
}

#[test]
fn purge_releases_entries() {
    let driver = Arc::new(HeadlessDriver::new());
    let context = current(&driver);
    let cache = ProgramCache::new();

    cache
        .program_for(BuiltinProgram::TexturedTriangle, &context)
        .unwrap();
    assert_eq!(driver.live_programs(), 1);

    assert_eq!(cache.purge_context(&context), 1);
    assert!(cache.is_empty());
    assert_eq!(driver.live_objects(), 0);

    cache
        .program_for(BuiltinProgram::TexturedTriangle, &context)
        .unwrap();
    assert_eq!(driver.programs_created(), 2);
}

#[test]
fn global_cache_is_shared() {
    let driver = Arc::new(HeadlessDriver::new());
    let context = current(&driver);

    let first = ProgramCache::global()
        .program_for(BuiltinProgram::TexturedTriangle, &context)
        .unwrap();
    let second = ProgramCache::global()
        .program_for(BuiltinProgram::TexturedTriangle, &context)
        .unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(std::ptr::eq(ProgramCache::global(), ProgramCache::global()));

    assert_eq!(ProgramCache::global().purge_context(&context), 1);
}
