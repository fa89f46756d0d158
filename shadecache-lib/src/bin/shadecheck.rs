// Copyright 2026 The shadecache Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Shadecheck
//!
//! Compiles and links shaders against the headless driver, so broken GLSL is caught before it ever
//! reaches a GPU.
//!
//! ## Usage
//!
//! ```text
//! shadecheck link --vertex asset:vulkan/textured_triangle/vertex \
//!                 --fragment ./blit.frag --bind 0=a_position
//! shadecheck builtin
//! shadecheck builtin --flavor opengl
//! ```
//!
//! Locators are `asset:` names, `file://` URLs or plain paths.  Compiler and linker output is
//! printed verbatim.
//!
//! (Try --help)

use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};

use shadecache_lib::{
    self as shadecache,
    assets::{AssetDirs, Locator, ASSETS_DIR_VAR},
    gl::driver::headless::HeadlessDriver,
    logging::{self, LoggingConfig},
    prelude::*,
    AssetCatalog, Embedded,
};

#[derive(Parser, Debug)]
#[command(name = "shadecheck")]
#[command(about = "Compile and link GLSL against the headless driver.", long_about = None)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Debug logging for shadecache crates
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile the given stages, link them and print attribute locations
    Link(LinkArgs),
    /// Build every built-in program
    Builtin(BuiltinArgs),
}

#[derive(Args, Debug)]
struct LinkArgs {
    #[arg(long)]
    vertex: Locator,
    #[arg(long)]
    fragment: Locator,
    /// Compiled like the others; the headless driver rejects geometry shaders as a compile error
    #[arg(long)]
    geometry: Option<Locator>,
    /// Bind an attribute before linking, as INDEX=NAME
    #[arg(long = "bind", value_parser = parse_binding)]
    bindings: Vec<(u32, String)>,
    /// Extra attribute names to report
    #[arg(long = "attribute")]
    attributes: Vec<String>,
}

#[derive(Args, Debug)]
struct BuiltinArgs {
    #[arg(long, value_enum, default_value_t = FlavorChoice::Vulkan)]
    flavor: FlavorChoice,
    /// Read sources from the asset directories instead of the embedded copies
    #[arg(long)]
    assets: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum FlavorChoice {
    /// GLSL 450, checked with the headless driver
    Vulkan,
    /// GLSL 330 core, printed only
    Opengl,
}

impl From<FlavorChoice> for GlslFlavor {
    fn from(choice: FlavorChoice) -> Self {
        match choice {
            FlavorChoice::Vulkan => GlslFlavor::Vulkan,
            FlavorChoice::Opengl => GlslFlavor::OpenGl,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum ShadecheckError {
    #[error(transparent)]
    Gl(#[from] GlError),
    #[error("{locator} needs an asset directory but none was found, set {var}", var = ASSETS_DIR_VAR)]
    NoAssetDirs { locator: String },
}

/// Asset lookups fail one by one with `NotFound` when nothing is searched at all.  Catch that
/// up front.
fn require_asset_dirs(dirs: AssetDirs, locator: &str) -> Result<AssetDirs, ShadecheckError> {
    if dirs.search_paths().is_empty() {
        return Err(ShadecheckError::NoAssetDirs {
            locator: locator.to_owned(),
        });
    }
    Ok(dirs)
}

fn parse_binding(raw: &str) -> Result<(u32, String), String> {
    let (index, name) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected INDEX=NAME, got {raw:?}"))?;
    let index = index
        .trim()
        .parse()
        .map_err(|e| format!("bad attribute index {index:?}: {e}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing attribute name in {raw:?}"));
    }
    Ok((index, name.to_owned()))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(if cli.verbose {
        LoggingConfig::verbose()
    } else {
        LoggingConfig::default()
    });

    let result = match cli.command {
        None => unreachable!(),
        Some(Command::Link(a)) => cmd_link(a),
        Some(Command::Builtin(a)) => cmd_builtin(a),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(ShadecheckError::Gl(e)) => {
            log::error!("{e}");
            eprintln!("{} error {}", e.domain(), e.code().value());
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn headless_context() -> Result<Context, ShadecheckError> {
    let context = Context::new(HeadlessDriver::new());
    context.make_current()?;
    Ok(context)
}

fn cmd_link(args: LinkArgs) -> Result<(), ShadecheckError> {
    let context = headless_context()?;
    let mut dirs = shadecache::asset_dirs();

    let mut stages = vec![
        (ShaderStage::Vertex, args.vertex),
        (ShaderStage::Fragment, args.fragment),
    ];
    if let Some(geometry) = args.geometry {
        stages.push((ShaderStage::Geometry, geometry));
    }

    if let Some((_, locator)) = stages
        .iter()
        .find(|(_, locator)| matches!(locator, Locator::Asset(_)))
    {
        dirs = require_asset_dirs(dirs, &locator.to_string())?;
    }

    let mut shaders = Vec::with_capacity(stages.len());
    for (stage, locator) in &stages {
        let mut shader = Shader::new(&context, *stage)?;
        shader.load_from(locator, &dirs)?;
        println!("compiled {:<8} {locator}", stage.name());
        shaders.push(shader);
    }

    let refs: Vec<&Shader> = shaders.iter().collect();
    let mut program = Program::with_shaders(&refs)?;
    for (index, name) in &args.bindings {
        program.bind_attribute(*index, name)?;
    }
    program.link()?;
    println!("linked program {}", program.id());

    let mut names: Vec<&str> = Vec::new();
    args.bindings
        .iter()
        .map(|(_, name)| name.as_str())
        .chain(args.attributes.iter().map(String::as_str))
        .for_each(|name| {
            if !names.contains(&name) {
                names.push(name);
            }
        });
    print_attributes(&program, &names)
}

fn cmd_builtin(args: BuiltinArgs) -> Result<(), ShadecheckError> {
    let flavor = GlslFlavor::from(args.flavor);
    let catalog: Box<dyn Catalog> = if args.assets {
        let dirs = require_asset_dirs(shadecache::asset_dirs(), "built-in sources")?;
        Box::new(AssetCatalog::new(dirs))
    } else {
        Box::new(Embedded)
    };

    if flavor != GlslFlavor::Vulkan {
        log::warn!("the headless driver only checks vulkan GLSL, printing {flavor} sources");
        for program in BuiltinProgram::ALL {
            for source in catalog.sources(program, flavor)? {
                println!("// {program} {} ({flavor})", source.stage);
                println!("{}", source.code);
            }
        }
        return Ok(());
    }

    let context = headless_context()?;
    let cache = ProgramCache::with_catalog(catalog);
    for builtin in BuiltinProgram::ALL {
        let program = cache.program_for(builtin, &context)?;
        println!("ok {builtin} (program {})", program.id());
        let names: Vec<&str> = builtin.attributes().iter().map(|(_, n)| *n).collect();
        print_attributes(&program, &names)?;
    }
    Ok(())
}

fn print_attributes(program: &Program, names: &[&str]) -> Result<(), ShadecheckError> {
    if names.is_empty() {
        return Ok(());
    }
    println!("  {:<20} location", "attribute");
    for name in names {
        match program.attribute_location(name)? {
            Some(location) => println!("  {name:<20} {location}"),
            None => println!("  {name:<20} -"),
        }
    }
    Ok(())
}
