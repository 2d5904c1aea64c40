//! scene-canon - scene normalization tool
//!
//! Reads scene records (JSON) or glTF/GLB assets and writes the canonical
//! scene: consolidated skeletons, shading graphs and mesh validation reports.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use scene_canon::{adapters, formats, CanonConfig, CanonicalScene, SceneRecords};

#[derive(Parser)]
#[command(name = "scene-canon")]
#[command(about = "Scene normalization tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Canonicalize a scene records file
    Convert {
        /// Input scene records (JSON)
        records: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path to canon.toml
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Log warnings as well as errors
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a scene records file without writing anything
    Check {
        /// Input scene records (JSON)
        records: PathBuf,

        /// Path to canon.toml
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Log warnings as well as errors
        #[arg(short, long)]
        verbose: bool,
    },

    /// Canonicalize a glTF/GLB asset
    Gltf {
        /// Input glTF/GLB file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path to canon.toml
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Log warnings as well as errors
        #[arg(short, long)]
        verbose: bool,
    },
}

fn load_config(path: Option<&Path>) -> Result<CanonConfig> {
    match path {
        Some(path) => CanonConfig::load(path)
            .with_context(|| format!("Failed to load config: {:?}", path)),
        None => Ok(CanonConfig::default()),
    }
}

fn load_records(path: &Path, config: CanonConfig) -> Result<CanonicalScene> {
    let records = SceneRecords::load(path)
        .with_context(|| format!("Failed to load scene records: {:?}", path))?;
    records
        .canonicalize(config)
        .with_context(|| format!("Failed to canonicalize {:?}", path))
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            records,
            output,
            config,
            verbose,
        } => {
            let config = load_config(config.as_deref())?;
            let verbose = verbose || config.output.verbose;
            tracing::info!("Converting {:?}", records);
            let scene = load_records(&records, config)?;
            scene.diagnostics.log(verbose);
            formats::write_canonical_scene_to(output.as_deref(), &scene)?;
            tracing::info!("Done!");
        }

        Commands::Check {
            records,
            config,
            verbose,
        } => {
            let config = load_config(config.as_deref())?;
            let verbose = verbose || config.output.verbose;
            tracing::info!("Checking {:?}", records);
            let scene = load_records(&records, config)?;
            scene.diagnostics.log(verbose);
            if !scene.passed {
                anyhow::bail!(
                    "{:?} failed validation ({} diagnostics)",
                    records,
                    scene.diagnostics.len()
                );
            }
            tracing::info!("Scene is valid!");
        }

        Commands::Gltf {
            input,
            output,
            config,
            verbose,
        } => {
            let config = load_config(config.as_deref())?;
            let verbose = verbose || config.output.verbose;
            tracing::info!("Converting {:?}", input);
            let scene = adapters::load_gltf(&input)?.canonicalize(config);
            scene.diagnostics.log(verbose);
            formats::write_canonical_scene_to(output.as_deref(), &scene)?;
            tracing::info!("Done!");
        }
    }

    Ok(())
}
