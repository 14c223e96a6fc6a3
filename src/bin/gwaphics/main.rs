//! gwaphics CLI - build a path-tracer scene from a JSON description.

use anyhow::{bail, Context};
use gwaphics::prelude::*;
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Parsed command line.
struct Options {
    level: &'static str,
    validate: bool,
    dump: Option<PathBuf>,
    scene: PathBuf,
}

enum Command {
    Run(Options),
    Help,
    Version,
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    let opts = match parse_args(&args) {
        Ok(Command::Run(opts)) => opts,
        Ok(Command::Help) => {
            print_help();
            return;
        }
        Ok(Command::Version) => {
            print_version();
            return;
        }
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Usage: gwaphics [OPTIONS] <scene.json>");
            std::process::exit(2);
        }
    };

    init_tracing(opts.level);

    if let Err(e) = run(&opts) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let mut level = "info";
    let mut validate = false;
    let mut dump = None;
    let mut scene = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" | "help" => return Ok(Command::Help),
            "-V" | "--version" => return Ok(Command::Version),
            "-q" | "--quiet" => level = "error",
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "--validate" => validate = true,
            "--dump" => {
                let dir = iter.next().context("--dump needs a directory")?;
                dump = Some(PathBuf::from(dir));
            }
            s if s.starts_with('-') => bail!("unknown option '{s}'"),
            s => {
                if scene.replace(PathBuf::from(s)).is_some() {
                    bail!("more than one scene file given");
                }
            }
        }
    }

    let scene = scene.context("missing scene file argument")?;
    Ok(Command::Run(Options {
        level,
        validate,
        dump,
        scene,
    }))
}

/// `RUST_LOG` wins over the verbosity flags when set.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gwaphics={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(opts: &Options) -> anyhow::Result<()> {
    let desc = SceneDescription::load(&opts.scene)
        .with_context(|| format!("loading {}", opts.scene.display()))?;
    let scene = desc.build_scene()?;

    print_summary(&scene);

    if opts.validate {
        scene.validate().context("scene validation failed")?;
        println!("validate:   ok");
    }
    if let Some(dir) = &opts.dump {
        dump_buffers(&scene, dir)?;
    }
    Ok(())
}

fn print_summary(scene: &Scene) {
    let stats = scene.stats();
    let bounds = scene.bounds();
    println!("models:     {}", scene.models().len());
    println!("materials:  {}", scene.materials().len());
    println!("vertices:   {}", scene.vertex_count());
    println!("triangles:  {}", scene.triangle_count());
    println!(
        "bvh:        {} nodes, {} leaves, depth {}, largest leaf {}",
        stats.nodes_used, stats.leaf_count, stats.max_depth, stats.max_leaf_size
    );
    println!("build time: {:.2?}", stats.build_time);
    println!("bounds:     {:?}", bounds);
    println!("gpu bytes:  {}", scene.gpu_data().total_bytes());
}

fn dump_buffers(scene: &Scene, dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    for (label, bytes) in scene.gpu_data().buffers() {
        let path = dir.join(format!("{}.bin", label.to_lowercase()));
        std::fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!("wrote {} ({} bytes)", path.display(), bytes.len());
    }
    Ok(())
}

fn print_version() {
    println!(
        "gwaphics {} (built {} {})",
        env!("CARGO_PKG_VERSION"),
        option_env!("GWAPHICS_BUILD_DATE").unwrap_or("unknown"),
        option_env!("GWAPHICS_BUILD_TIME").unwrap_or("")
    );
}

fn print_help() {
    println!("gwaphics - path tracer scene builder");
    println!();
    println!("USAGE:");
    println!("    gwaphics [OPTIONS] <scene.json>");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Only show errors");
    println!("    --validate       Check BVH and index invariants after the build");
    println!("    --dump <dir>     Write the GPU buffers as raw .bin files");
    println!("    -V, --version    Show version and build date");
    println!("    -h, --help       Show this help");
    println!();
    println!("EXAMPLES:");
    println!("    gwaphics scenes/cornell.json");
    println!("    gwaphics -v --validate scenes/cornell.json");
    println!("    gwaphics --dump out/ scenes/cornell.json");
    println!();
    println!("NOTES:");
    println!("    - Model paths in the scene file are relative to the scene file");
    println!("    - RUST_LOG overrides -q/-v/-vv");
}
