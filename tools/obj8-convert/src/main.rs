//! obj8 - X-Plane OBJ8 converter
//!
//! # Commands
//!
//! - `obj8 export` - Write a scene as an OBJ8 object
//! - `obj8 import` - Read an OBJ8 object into a scene
//! - `obj8 check` - Parse an OBJ8 object and report what would be imported

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use obj8_common::OBJ8_EXT;
use obj8_convert::config::load_or_default;
use obj8_convert::{export_file, import_file, ImportConfig};
use obj8_shared::Scene;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "obj8")]
#[command(about = "Convert scenes to and from X-Plane OBJ8")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a scene to OBJ8
    Export {
        /// Input scene (.json)
        scene: PathBuf,

        /// Output .obj file (default: next to the scene)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path to obj8.toml
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Import an OBJ8 file into a scene
    Import {
        /// Input .obj file
        input: PathBuf,

        /// Output scene (default: --into, or next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Existing scene to add the object to
        #[arg(long)]
        into: Option<PathBuf>,

        /// Path to obj8.toml
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Parse an OBJ8 file without writing anything
    Check {
        /// Input .obj file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            scene,
            output,
            config,
        } => {
            let config = load_or_default(config.as_deref())?;
            let output = output.unwrap_or_else(|| scene.with_extension(OBJ8_EXT));
            tracing::info!("Exporting {:?} -> {:?}", scene, output);

            let loaded = Scene::load(&scene)?;
            let scene_dir = scene.parent().unwrap_or_else(|| Path::new("."));
            let report = export_file(&loaded, scene_dir, &output, &config.export)
                .with_context(|| format!("Failed to export {:?}", scene))?;
            for warning in &report.warnings {
                tracing::warn!("{}", warning);
            }
            tracing::info!("Done!");
        }

        Commands::Import {
            input,
            output,
            into,
            config,
        } => {
            let config = load_or_default(config.as_deref())?;
            let mut scene = match &into {
                Some(path) => Scene::load(path)?,
                None => Scene::default(),
            };
            let output = output
                .or(into)
                .unwrap_or_else(|| input.with_extension("json"));
            tracing::info!("Importing {:?} -> {:?}", input, output);

            import_file(&input, &mut scene, &config.import)
                .with_context(|| format!("Failed to import {:?}", input))?;
            scene.save(&output)?;
            tracing::info!("Done!");
        }

        Commands::Check { input } => {
            let mut scene = Scene::default();
            let report = import_file(&input, &mut scene, &ImportConfig::default())
                .with_context(|| format!("Failed to import {:?}", input))?;
            tracing::info!(
                "{:?}: {} triangles, {} materials, {} animated components, {} warnings",
                input,
                report.triangles,
                scene.materials.len(),
                report.components,
                report.warnings.len()
            );
        }
    }

    Ok(())
}
