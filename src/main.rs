//! scenegex CLI
//!
//! Command-line interface for exporting scene snapshots to OpenGEX-style
//! documents, inspecting snapshots, and validating them.

use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use scenegex_export::{export_scene, ExportOptions};
use scenegex_scene::{NodeData, RestPose, Scene};

/// scenegex - OpenGEX scene exporter
#[derive(Parser)]
#[command(name = "scenegex")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format for structured data
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Export a scene snapshot to an OpenGEX document
    Export(ExportArgs),

    /// Show information about a scene snapshot
    Info(InfoArgs),

    /// Validate a scene snapshot without exporting it
    Validate(ValidateArgs),
}

#[derive(Args)]
struct ExportArgs {
    /// Path to the scene snapshot (JSON)
    input: PathBuf,

    /// Output document path
    #[arg(short, long)]
    output: PathBuf,

    /// Export only nodes flagged as selected
    #[arg(long)]
    selection_only: bool,

    /// Bake every animated transform to per-frame matrices
    #[arg(long)]
    sample_animation: bool,

    /// Write floats as IEEE-754 bit patterns
    #[arg(long)]
    hex_floats: bool,

    /// Skip vertex color arrays
    #[arg(long)]
    no_colors: bool,

    /// Skip texture coordinate arrays
    #[arg(long)]
    no_uvs: bool,

    /// Skip normal arrays
    #[arg(long)]
    no_normals: bool,

    /// Skip material structures and references
    #[arg(long)]
    no_materials: bool,

    /// Bake rest transforms of leaf mesh nodes into their geometry
    #[arg(long)]
    apply_transforms: bool,
}

#[derive(Args)]
struct InfoArgs {
    /// Path to the scene snapshot (JSON)
    input: PathBuf,
}

#[derive(Args)]
struct ValidateArgs {
    /// Path to the scene snapshot (JSON)
    input: PathBuf,
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .with_file(verbosity >= 3)
        .with_line_number(verbosity >= 3)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Export(args) => cmd_export(args),
        Commands::Info(args) => cmd_info(args, cli.format),
        Commands::Validate(args) => cmd_validate(args),
    }
}

fn load_scene(path: &PathBuf) -> Result<Scene> {
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open snapshot {:?}", path))?;
    let reader = io::BufReader::new(file);
    let scene = Scene::from_json(reader)
        .with_context(|| format!("Failed to parse snapshot {:?}", path))?;
    Ok(scene)
}

fn cmd_export(args: ExportArgs) -> Result<()> {
    info!("Loading snapshot: {:?}", args.input);
    let mut scene = load_scene(&args.input)?;

    if args.apply_transforms {
        scene.apply_transforms();
    }

    let options = ExportOptions {
        export_selection_only: args.selection_only,
        force_sampled_animation: args.sample_animation,
        float_as_hex: args.hex_floats,
        export_vertex_colors: !args.no_colors,
        export_uvs: !args.no_uvs,
        export_normals: !args.no_normals,
        export_materials: !args.no_materials,
    };

    let document = export_scene(&scene, &RestPose, &options)
        .context("Export failed")?;

    fs::write(&args.output, &document)
        .with_context(|| format!("Failed to write {:?}", args.output))?;

    println!("Exported {} bytes to {:?}", document.len(), args.output);
    Ok(())
}

fn cmd_info(args: InfoArgs, format: OutputFormat) -> Result<()> {
    let scene = load_scene(&args.input)?;
    let settings = scene.settings;

    let mesh_nodes = scene
        .nodes
        .iter()
        .filter(|n| matches!(n.data, NodeData::Mesh(_)))
        .count();
    let animated_nodes = scene.nodes.iter().filter(|n| !n.curves.is_empty()).count();

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "path": args.input,
                "nodes": scene.nodes.len(),
                "roots": scene.roots.len(),
                "mesh_nodes": mesh_nodes,
                "animated_nodes": animated_nodes,
                "meshes": scene.meshes.len(),
                "armatures": scene.armatures.len(),
                "lights": scene.lights.len(),
                "cameras": scene.cameras.len(),
                "materials": scene.materials.len(),
                "frame_start": settings.frame_start,
                "frame_end": settings.frame_end,
                "fps": settings.fps,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("Scene snapshot: {:?}", args.input);
            println!("  Nodes:          {}", scene.nodes.len());
            println!("  Roots:          {}", scene.roots.len());
            println!("  Mesh nodes:     {}", mesh_nodes);
            println!("  Animated nodes: {}", animated_nodes);
            println!("  Meshes:         {}", scene.meshes.len());
            println!("  Armatures:      {}", scene.armatures.len());
            println!("  Lights:         {}", scene.lights.len());
            println!("  Cameras:        {}", scene.cameras.len());
            println!("  Materials:      {}", scene.materials.len());
            println!(
                "  Frame range:    {}..{} @ {} fps",
                settings.frame_start, settings.frame_end, settings.fps
            );
        }
    }

    Ok(())
}

fn cmd_validate(args: ValidateArgs) -> Result<()> {
    let scene = load_scene(&args.input)?;

    if let Err(e) = scene.validate() {
        bail!("Snapshot {:?} is invalid: {}", args.input, e);
    }

    println!("Snapshot {:?} is valid", args.input);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "nodes": [{"name": "box"}],
        "roots": [0]
    }"#;

    fn write_snapshot(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("scene.json");
        fs::write(&path, SNAPSHOT).unwrap();
        path
    }

    #[test]
    fn test_load_scene_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_snapshot(&dir);

        let scene = load_scene(&path).unwrap();
        assert_eq!(scene.nodes.len(), 1);
        assert_eq!(scene.nodes[0].name, "box");
    }

    #[test]
    fn test_load_scene_missing_file() {
        let path = PathBuf::from("/nonexistent/scene.json");
        assert!(load_scene(&path).is_err());
    }

    #[test]
    fn test_export_writes_document() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_snapshot(&dir);
        let output = dir.path().join("scene.ogex");

        let args = ExportArgs {
            input,
            output: output.clone(),
            selection_only: false,
            sample_animation: false,
            hex_floats: false,
            no_colors: false,
            no_uvs: false,
            no_normals: false,
            no_materials: false,
            apply_transforms: false,
        };
        cmd_export(args).unwrap();

        let text = fs::read_to_string(&output).unwrap();
        assert!(text.starts_with("Metric (key = \"distance\")"));
        assert!(text.contains("Node $node1"));
    }

    #[test]
    fn test_export_rejects_rootless_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("empty.json");
        fs::write(&input, r#"{"nodes": [], "roots": []}"#).unwrap();

        let args = ExportArgs {
            input,
            output: dir.path().join("out.ogex"),
            selection_only: false,
            sample_animation: false,
            hex_floats: false,
            no_colors: false,
            no_uvs: false,
            no_normals: false,
            no_materials: false,
            apply_transforms: false,
        };
        assert!(cmd_export(args).is_err());
    }
}
