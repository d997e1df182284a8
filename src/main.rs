use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use torso_export::scene_graph::load_scene;
use torso_export::{ExportConfig, ExportCoordinator, GlbExporter};

/// Export the torso structures of a scene dump as a GLB model and metadata.
#[derive(Parser)]
#[command(name = "torso-export")]
#[command(version, about, long_about = None)]
struct Args {
    /// Scene dump (.json) or glTF file (.gltf, .glb)
    scene: PathBuf,

    /// Export configuration (JSON); defaults are used for missing fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for the model file
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Directory for the metadata file
    #[arg(long)]
    metadata_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ExportConfig::load(path)?,
        None => ExportConfig::default(),
    };
    if let Some(dir) = args.output_dir {
        config.output.model_dir = dir;
    }
    if let Some(dir) = args.metadata_dir {
        config.output.metadata_dir = dir;
    }

    let scene = load_scene(&args.scene)?;
    let paths = config.output.clone();

    let mut coordinator = ExportCoordinator::new(config, GlbExporter::new());
    let output = coordinator
        .run(&scene)
        .with_context(|| format!("Export of {} failed", args.scene.display()))?;

    output.summary.log();
    output.write(&paths)?;

    Ok(())
}
