// Copyright 2026 The shadecache Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Headless Driver
//!
//! An in-process stand-in for a GL implementation.  Shaders are parsed and validated with naga's
//! GLSL frontend, so it accepts the [`GlslFlavor::Vulkan`] dialect.  Linking checks what a real
//! linker would reject at the stage boundary:
//!
//! - every attached shader is compiled, at most one per stage
//! - compute is never mixed with graphics stages
//! - graphics programs have a vertex shader
//! - every fragment input is written by the vertex shader with the same type
//!
//! Object naming follows GL: shaders and programs share one name space, and deleting an attached
//! shader only flags it until the last program lets go.  Names are never reused.
//!
//! The driver is internally synchronized and any number of threads may treat it as current.
//! Counters are exposed so tests can assert on how much work happened.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use naga::valid::{Capabilities, ValidationFlags, Validator};
use parking_lot::Mutex;

use super::{Driver, GlslFlavor};
use crate::shader::ShaderStage;

#[derive(Default)]
pub struct HeadlessDriver {
    state: Mutex<State>,
    refuse_current: Mutex<Option<String>>,
    programs_created: AtomicUsize,
    links: AtomicUsize,
    deletes: AtomicUsize,
}

#[derive(Default)]
struct State {
    last_name: u32,
    shaders: HashMap<u32, ShaderObject>,
    programs: HashMap<u32, ProgramObject>,
}

struct ShaderObject {
    stage: ShaderStage,
    source: String,
    module: Option<naga::Module>,
    info_log: String,
    /// Inputs declared with `layout(location = ..)`.  Bindings never move these.
    explicit_inputs: HashSet<String>,
    delete_pending: bool,
    attachments: usize,
}

#[derive(Default)]
struct ProgramObject {
    attached: Vec<u32>,
    bound: HashMap<String, u32>,
    linked: bool,
    info_log: String,
    attributes: HashMap<String, u32>,
}

impl HeadlessDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later `make_current` fail with `reason`, as a lost surface would.
    pub fn refuse_make_current(&self, reason: &str) {
        *self.refuse_current.lock() = Some(reason.to_owned());
    }

    pub fn programs_created(&self) -> usize {
        self.programs_created.load(Ordering::Acquire)
    }

    pub fn links(&self) -> usize {
        self.links.load(Ordering::Acquire)
    }

    /// `glDelete*` calls received, including ones that only flagged an attached shader.
    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::Acquire)
    }

    /// Whether `name` still refers to a shader or program.
    pub fn is_live(&self, name: u32) -> bool {
        let state = self.state.lock();
        state.shaders.contains_key(&name) || state.programs.contains_key(&name)
    }

    pub fn live_shaders(&self) -> usize {
        self.state.lock().shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.lock().programs.len()
    }

    pub fn live_objects(&self) -> usize {
        let state = self.state.lock();
        state.shaders.len() + state.programs.len()
    }

    /// Shader names attached to `program`, in attachment order.
    pub fn attached_to(&self, program: u32) -> Vec<u32> {
        self.state
            .lock()
            .programs
            .get(&program)
            .map(|p| p.attached.clone())
            .unwrap_or_default()
    }
}

impl State {
    fn allocate(&mut self) -> u32 {
        self.last_name += 1;
        self.last_name
    }

    /// Drops one attachment from `shader`, freeing it if it was waiting on that.
    fn release_attachment(&mut self, shader: u32) {
        let free = match self.shaders.get_mut(&shader) {
            Some(object) => {
                object.attachments = object.attachments.saturating_sub(1);
                object.attachments == 0 && object.delete_pending
            }
            None => false,
        };
        if free {
            self.shaders.remove(&shader);
            log::trace!("headless: freed flagged shader {shader}");
        }
    }
}

impl Driver for HeadlessDriver {
    fn flavor(&self) -> GlslFlavor {
        GlslFlavor::Vulkan
    }

    fn make_current(&self) -> Result<(), String> {
        match self.refuse_current.lock().as_ref() {
            Some(reason) => Err(reason.clone()),
            None => Ok(()),
        }
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<u32, String> {
        let mut state = self.state.lock();
        let name = state.allocate();
        state.shaders.insert(
            name,
            ShaderObject {
                stage,
                source: String::new(),
                module: None,
                info_log: String::new(),
                explicit_inputs: HashSet::new(),
                delete_pending: false,
                attachments: 0,
            },
        );
        Ok(name)
    }

    fn shader_source(&self, shader: u32, source: &str) {
        match self.state.lock().shaders.get_mut(&shader) {
            Some(object) => object.source = source.to_owned(),
            None => log::error!("headless: shader_source on unknown shader {shader}"),
        }
    }

    fn compile_shader(&self, shader: u32) {
        let mut state = self.state.lock();
        let Some(object) = state.shaders.get_mut(&shader) else {
            log::error!("headless: compile_shader on unknown shader {shader}");
            return;
        };
        match compile(object.stage, &object.source) {
            Ok(module) => {
                object.module = Some(module);
                object.explicit_inputs = explicit_inputs(&object.source);
                object.info_log.clear();
            }
            Err(log) => {
                object.module = None;
                object.explicit_inputs.clear();
                object.info_log = log;
            }
        }
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        self.state
            .lock()
            .shaders
            .get(&shader)
            .is_some_and(|object| object.module.is_some())
    }

    fn shader_info_log(&self, shader: u32) -> String {
        self.state
            .lock()
            .shaders
            .get(&shader)
            .map(|object| object.info_log.clone())
            .unwrap_or_default()
    }

    fn delete_shader(&self, shader: u32) {
        self.deletes.fetch_add(1, Ordering::AcqRel);
        let mut state = self.state.lock();
        let attached = match state.shaders.get_mut(&shader) {
            Some(object) if object.attachments > 0 => {
                object.delete_pending = true;
                true
            }
            Some(_) => false,
            None => return,
        };
        if !attached {
            state.shaders.remove(&shader);
        }
    }

    fn create_program(&self) -> Result<u32, String> {
        self.programs_created.fetch_add(1, Ordering::AcqRel);
        let mut state = self.state.lock();
        let name = state.allocate();
        state.programs.insert(name, ProgramObject::default());
        Ok(name)
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        let mut state = self.state.lock();
        if !state.shaders.contains_key(&shader) {
            log::error!("headless: attach of unknown shader {shader}");
            return;
        }
        let Some(object) = state.programs.get_mut(&program) else {
            log::error!("headless: attach to unknown program {program}");
            return;
        };
        object.attached.push(shader);
        if let Some(shader) = state.shaders.get_mut(&shader) {
            shader.attachments += 1;
        }
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        let mut state = self.state.lock();
        let Some(object) = state.programs.get_mut(&program) else {
            log::error!("headless: detach from unknown program {program}");
            return;
        };
        let before = object.attached.len();
        object.attached.retain(|attached| *attached != shader);
        if object.attached.len() != before {
            state.release_attachment(shader);
        }
    }

    fn bind_attrib_location(&self, program: u32, index: u32, name: &str) {
        if let Some(object) = self.state.lock().programs.get_mut(&program) {
            object.bound.insert(name.to_owned(), index);
        }
    }

    fn link_program(&self, program: u32) {
        self.links.fetch_add(1, Ordering::AcqRel);
        let mut state = self.state.lock();
        let Some(attached) = state.programs.get(&program).map(|p| p.attached.clone()) else {
            log::error!("headless: link of unknown program {program}");
            return;
        };
        let result = link(&state, &attached);
        if let Some(object) = state.programs.get_mut(&program) {
            match result {
                Ok(inputs) => {
                    // Explicit locations win over bindings, which only place the rest.
                    object.attributes = inputs
                        .into_iter()
                        .map(|input| {
                            let location = match object.bound.get(&input.name) {
                                Some(&bound) if !input.explicit => bound,
                                _ => input.location,
                            };
                            (input.name, location)
                        })
                        .collect();
                    object.linked = true;
                    object.info_log.clear();
                }
                Err(log) => {
                    object.attributes.clear();
                    object.linked = false;
                    object.info_log = log;
                }
            }
        }
    }

    fn program_link_status(&self, program: u32) -> bool {
        self.state
            .lock()
            .programs
            .get(&program)
            .is_some_and(|object| object.linked)
    }

    fn program_info_log(&self, program: u32) -> String {
        self.state
            .lock()
            .programs
            .get(&program)
            .map(|object| object.info_log.clone())
            .unwrap_or_default()
    }

    fn attrib_location(&self, program: u32, name: &str) -> Option<u32> {
        self.state
            .lock()
            .programs
            .get(&program)
            .filter(|object| object.linked)
            .and_then(|object| object.attributes.get(name).copied())
    }

    fn delete_program(&self, program: u32) {
        self.deletes.fetch_add(1, Ordering::AcqRel);
        let mut state = self.state.lock();
        if let Some(object) = state.programs.remove(&program) {
            object
                .attached
                .iter()
                .for_each(|shader| state.release_attachment(*shader));
        }
    }
}

fn compile(stage: ShaderStage, source: &str) -> Result<naga::Module, String> {
    let naga_stage = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
        ShaderStage::Compute => naga::ShaderStage::Compute,
        ShaderStage::Geometry => {
            return Err("error: geometry shaders are not supported by the headless driver".into())
        }
    };
    if source.trim().is_empty() {
        return Err("error: shader source is empty".into());
    }

    let mut frontend = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options::from(naga_stage);
    let module = frontend
        .parse(&options, source)
        .map_err(|errors| non_empty(errors.emit_to_string(source)))?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|error| non_empty(error.emit_to_string(source)))?;

    Ok(module)
}

/// Names of `in` declarations carrying an explicit `layout(location = ..)`.
///
/// naga assigns locations to unqualified inputs itself, so the source is the only place left that
/// tells the two apart.
fn explicit_inputs(source: &str) -> HashSet<String> {
    let code = source
        .lines()
        .map(|line| line.split("//").next().unwrap_or(""))
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");

    code.split(';')
        .map(|statement| statement.rsplit(['{', '}']).next().unwrap_or(statement))
        .filter(|declaration| declaration.contains("location"))
        .filter_map(|declaration| {
            let words: Vec<&str> = declaration
                .split(|c: char| !(c.is_alphanumeric() || c == '_'))
                .filter(|word| !word.is_empty())
                .collect();
            if words.contains(&"in") {
                words.last().map(|name| (*name).to_owned())
            } else {
                None
            }
        })
        .collect()
}

fn non_empty(log: String) -> String {
    if log.trim().is_empty() {
        "error: compilation failed".to_owned()
    } else {
        log
    }
}

/// One location-bound input or output of an entry point.
struct Varying {
    location: u32,
    name: Option<String>,
    ty: naga::TypeInner,
}

impl Varying {
    fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("`{name}`"),
            None => "(unnamed)".to_owned(),
        }
    }
}

#[derive(Clone, Copy)]
enum Side {
    Inputs,
    Outputs,
}

fn varyings(module: &naga::Module, stage: naga::ShaderStage, side: Side) -> Vec<Varying> {
    let mut found = Vec::new();
    let Some(entry) = module.entry_points.iter().find(|ep| ep.stage == stage) else {
        return found;
    };
    match side {
        Side::Inputs => entry.function.arguments.iter().for_each(|arg| {
            collect(module, arg.binding.as_ref(), arg.ty, arg.name.as_deref(), &mut found)
        }),
        Side::Outputs => {
            if let Some(result) = &entry.function.result {
                collect(module, result.binding.as_ref(), result.ty, None, &mut found);
            }
        }
    }
    found
}

fn collect(
    module: &naga::Module,
    binding: Option<&naga::Binding>,
    ty: naga::Handle<naga::Type>,
    name: Option<&str>,
    found: &mut Vec<Varying>,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => found.push(Varying {
            location: *location,
            name: name.map(str::to_owned),
            ty: module.types[ty].inner.clone(),
        }),
        // Built-ins such as gl_Position never cross the stage interface by location.
        Some(_) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                members.iter().for_each(|member| {
                    collect(
                        module,
                        member.binding.as_ref(),
                        member.ty,
                        member.name.as_deref(),
                        found,
                    )
                });
            }
        }
    }
}

fn type_name(inner: &naga::TypeInner) -> String {
    fn prefix(kind: naga::ScalarKind) -> Option<(&'static str, &'static str)> {
        match kind {
            naga::ScalarKind::Float => Some(("float", "vec")),
            naga::ScalarKind::Sint => Some(("int", "ivec")),
            naga::ScalarKind::Uint => Some(("uint", "uvec")),
            naga::ScalarKind::Bool => Some(("bool", "bvec")),
            _ => None,
        }
    }
    match inner {
        naga::TypeInner::Scalar(scalar) => match prefix(scalar.kind) {
            Some((name, _)) => name.to_owned(),
            None => format!("{inner:?}"),
        },
        naga::TypeInner::Vector { size, scalar } => match prefix(scalar.kind) {
            Some((_, vec)) => format!("{vec}{}", *size as u8),
            None => format!("{inner:?}"),
        },
        naga::TypeInner::Matrix { columns, rows, .. } => {
            format!("mat{}x{}", *columns as u8, *rows as u8)
        }
        _ => format!("{inner:?}"),
    }
}

/// A named vertex input and where the compiler put it.
struct VertexInput {
    name: String,
    location: u32,
    explicit: bool,
}

/// Returns the vertex inputs on success, the info log on failure.
fn link(state: &State, attached: &[u32]) -> Result<Vec<VertexInput>, String> {
    if attached.is_empty() {
        return Err("error: no shaders attached".to_owned());
    }

    let mut errors = Vec::new();
    let mut stages: Vec<(ShaderStage, &naga::Module)> = Vec::with_capacity(attached.len());
    for id in attached {
        let Some(shader) = state.shaders.get(id) else {
            errors.push(format!("error: shader {id} does not exist"));
            continue;
        };
        match &shader.module {
            None => errors.push(format!("error: {} shader {id} is not compiled", shader.stage)),
            Some(_) if stages.iter().any(|(stage, _)| *stage == shader.stage) => errors.push(
                format!("error: more than one {} shader attached", shader.stage),
            ),
            Some(module) => stages.push((shader.stage, module)),
        }
    }
    if !errors.is_empty() {
        return Err(errors.join("\n"));
    }

    let module_for = |wanted: ShaderStage| {
        stages
            .iter()
            .find(|(stage, _)| *stage == wanted)
            .map(|(_, module)| *module)
    };

    if module_for(ShaderStage::Compute).is_some() {
        if stages.len() > 1 {
            return Err("error: compute shaders cannot be linked with graphics stages".to_owned());
        }
        return Ok(Vec::new());
    }

    let Some(vertex) = module_for(ShaderStage::Vertex) else {
        return Err("error: a graphics program needs a vertex shader".to_owned());
    };

    if let Some(fragment) = module_for(ShaderStage::Fragment) {
        let outputs = varyings(vertex, naga::ShaderStage::Vertex, Side::Outputs);
        let inputs = varyings(fragment, naga::ShaderStage::Fragment, Side::Inputs);
        for input in &inputs {
            match outputs.iter().find(|output| output.location == input.location) {
                None => errors.push(format!(
                    "error: fragment input {} at location {} is not written by the vertex shader",
                    input.label(),
                    input.location
                )),
                Some(output) if output.ty != input.ty => errors.push(format!(
                    "error: location {} is {} in the vertex shader but {} in the fragment shader",
                    input.location,
                    type_name(&output.ty),
                    type_name(&input.ty)
                )),
                Some(_) => {}
            }
        }
    }
    if !errors.is_empty() {
        return Err(errors.join("\n"));
    }

    let explicit = attached
        .iter()
        .filter_map(|id| state.shaders.get(id))
        .find(|shader| shader.stage == ShaderStage::Vertex)
        .map(|shader| &shader.explicit_inputs);

    Ok(varyings(vertex, naga::ShaderStage::Vertex, Side::Inputs)
        .into_iter()
        .filter_map(|input| {
            let name = input.name?;
            Some(VertexInput {
                explicit: explicit.is_some_and(|set| set.contains(&name)),
                name,
                location: input.location,
            })
        })
        .collect())
}
