//! vsvis CLI: inspect detection files from the command line.
//!
//! Lists the structure of an HDF5 file, resolves logical frame indices to
//! datasets and dumps the coordinates of single frames.
#![allow(clippy::uninlined_format_args, clippy::cast_precision_loss)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use serde_json::json;
use thiserror::Error;
use vsvis_core::{
    Category, Controller, DatasetIndex, DatasetShape, FrameSource, MarkerFactory, ViewerConfig,
};
use vsvis_io::{CoordinateSource, DataSource, Hdf5Store, Store};

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    VsvisIo(#[from] vsvis_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] vsvis_core::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Inspect HDF5 detection files.
#[derive(Parser)]
#[command(name = "vsvis")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Viewer configuration (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Datasets addressed as one virtual sequence.
#[derive(Args)]
struct DatasetArgs {
    /// Input HDF5 file
    input: PathBuf,

    /// Dataset path; repeat to index several datasets
    #[arg(short, long = "dataset", required = true)]
    datasets: Vec<String>,

    /// Axis the datasets are stacked along; omit to use one dataset per frame
    #[arg(short, long)]
    axis: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// List every dataset in a file with its shape
    Info {
        /// Input HDF5 file
        input: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Resolve a logical index to a dataset and offset
    Lookup {
        #[command(flatten)]
        selection: DatasetArgs,

        /// Logical frame index
        #[arg(allow_hyphen_values = true)]
        index: i64,
    },

    /// Print the coordinates of one frame
    Frame {
        #[command(flatten)]
        selection: DatasetArgs,

        /// Probability dataset per coordinate dataset, joined column-wise
        #[arg(short, long = "probabilities")]
        probabilities: Vec<String>,

        /// Logical frame index
        index: usize,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Walk every frame through the marker cache and report its statistics
    Scan {
        #[command(flatten)]
        selection: DatasetArgs,
    },
}

fn load_config(path: Option<&Path>) -> Result<ViewerConfig> {
    let Some(path) = path else {
        return Ok(ViewerConfig::default());
    };
    let text = std::fs::read_to_string(path)?;
    let config: ViewerConfig = serde_json::from_str(&text)?;
    config.validate()?;
    info!("loaded configuration from {}", path.display());
    Ok(config)
}

fn open(path: &Path, config: &ViewerConfig) -> Result<Arc<dyn Store>> {
    if !config.is_hdf5_path(&path.to_string_lossy()) {
        warn!(
            "{} does not have an HDF5 extension ({})",
            path.display(),
            config.hdf5_extensions.join(", ")
        );
    }
    Ok(Arc::new(Hdf5Store::open(path)?))
}

fn coordinate_source(
    store: Arc<dyn Store>,
    selection: &DatasetArgs,
    probabilities: &[String],
) -> Result<DataSource> {
    if probabilities.is_empty() {
        Ok(DataSource::flat(store, &selection.datasets, selection.axis)?)
    } else {
        Ok(DataSource::zipped(
            store,
            &[selection.datasets.clone(), probabilities.to_vec()],
        )?)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Info { input, json } => {
            let store = open(&input, &config)?;
            let datasets = store.list_datasets()?;
            if json {
                let entries: Vec<_> = datasets
                    .iter()
                    .map(|d| json!({ "name": d.name, "shape": d.shape }))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                println!("File: {}", input.display());
                for dataset in &datasets {
                    let dims: Vec<String> = dataset.shape.iter().map(ToString::to_string).collect();
                    println!("  {:<40} ({})", dataset.name, dims.join(", "));
                }
                println!("Datasets: {}", datasets.len());
            }
            store.close();
        }

        Commands::Lookup { selection, index } => {
            let store = open(&selection.input, &config)?;
            let shapes = selection
                .datasets
                .iter()
                .map(|name| Ok(DatasetShape::new(name.as_str(), store.shape(name)?)))
                .collect::<Result<Vec<_>>>()?;
            let flat = DatasetIndex::build(&shapes, selection.axis)?;
            let slice = flat.lookup(index)?;
            println!("Total length: {}", flat.total_length());
            match selection.axis {
                Some(axis) => println!(
                    "{} -> {} [axis {} offset {}]",
                    index,
                    slice.name,
                    axis,
                    slice.offset()
                ),
                None => println!("{} -> {}", index, slice.name),
            }
        }

        Commands::Frame {
            selection,
            probabilities,
            index,
            json,
        } => {
            let store = open(&selection.input, &config)?;
            let source = CoordinateSource::new(coordinate_source(store, &selection, &probabilities)?);
            let frame = source.fetch(index)?;
            if json {
                let rows: Vec<_> = frame
                    .iter()
                    .map(|(x, y, p)| json!({ "x": x, "y": y, "probability": p }))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!("Frame {} ({} points)", index, frame.len());
                for (row, (x, y, p)) in frame.iter().enumerate() {
                    match p {
                        Some(p) => println!("{:>5}  {:>10.3} {:>10.3} {:>6.3}", row, x, y, p),
                        None => println!("{:>5}  {:>10.3} {:>10.3}", row, x, y),
                    }
                }
            }
        }

        Commands::Scan { selection } => {
            let store = open(&selection.input, &config)?;
            let source = CoordinateSource::new(DataSource::flat(
                store,
                &selection.datasets,
                selection.axis,
            )?);
            let frames = source.len();
            let factory: MarkerFactory = config.ground_truth.factory();
            let mut controller = Controller::headless(&config);
            controller.set_source(Category::GroundTruth, Box::new(source), factory)?;

            let mut markers = 0usize;
            for frame in 0..frames {
                controller.set_index(frame)?;
                markers += controller
                    .markers(Category::GroundTruth)?
                    .map_or(0, |m| m.len());
            }

            let scene = controller.scene();
            let stats = scene.stats(Category::GroundTruth).unwrap_or_default();
            println!("Frames: {}", frames);
            println!("Markers: {}", markers);
            println!(
                "Resident: {} (buffer {})",
                scene.resident_count(Category::GroundTruth),
                scene.buffer_size()
            );
            println!(
                "Hits: {}  Misses: {}  Evictions: {}",
                stats.hits, stats.misses, stats.evictions
            );
            if frames > 0 {
                println!(
                    "Mean markers per frame: {:.1}",
                    markers as f64 / frames as f64
                );
            }
        }
    }

    Ok(())
}
