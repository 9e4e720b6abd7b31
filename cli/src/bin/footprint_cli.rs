use clap::{Parser, Subcommand, ValueEnum};
use cli::{AnnotateJob, CliError};
use color_eyre::eyre::Result;
use footprint::{
    build_annotations, discover_images, write_annotations, ComponentEngineLoader, Extent,
    FootprintCollection, FootprintError, OutputFormat, PredictOptions, Predictor, PredictorConfig,
    TileIndex,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict building footprints in a single image
    Predict {
        /// Path to the engine weights file
        #[arg(short, long)]
        weights: PathBuf,
        /// Image to predict on
        #[arg(short, long)]
        image: PathBuf,
        /// World extent of the image as min_x,min_y,max_x,max_y
        #[arg(long, value_parser = parse_extent, allow_hyphen_values = true)]
        extent: Option<Extent>,
        /// Mosaic position of the image as column,row
        #[arg(long, value_parser = parse_tile, allow_hyphen_values = true)]
        tile: Option<TileIndex>,
        /// Keep the traced outlines instead of snapping them to right angles
        #[arg(long)]
        no_rectangularize: bool,
        /// Predictor configuration (.toml or .json)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output file; printed to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format (geojson or json)
        #[arg(long, default_value = "geojson", value_parser = parse_format)]
        format: OutputFormat,
    },
    /// Write annotation records for a directory of numbered images
    Annotate {
        /// Job file (.toml or .json); replaces the other arguments
        #[arg(short, long)]
        job: Option<PathBuf>,
        /// Path to the engine weights file
        #[arg(short, long)]
        weights: Option<PathBuf>,
        /// Directory searched recursively for images
        #[arg(short, long)]
        images: Option<PathBuf>,
        /// Annotation records output file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Extension of the images to pick up
        #[arg(long, default_value = "jpg")]
        extension: String,
        /// Predictor configuration (.toml or .json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the JSON schema of a configuration file
    Schema {
        #[arg(value_enum, default_value = "predictor")]
        kind: SchemaKind,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaKind {
    Predictor,
    Job,
}

fn parse_extent(s: &str) -> Result<Extent, String> {
    s.parse().map_err(|e: FootprintError| e.to_string())
}

fn parse_tile(s: &str) -> Result<TileIndex, String> {
    s.parse().map_err(|e: FootprintError| e.to_string())
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    s.parse().map_err(|_| format!("unknown format {s:?}, use geojson or json"))
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Predict {
            weights,
            image,
            extent,
            tile,
            no_rectangularize,
            config,
            output,
            format,
        } => {
            let mut options = PredictOptions::default().with_rectangularization(!no_rectangularize);
            if let Some(extent) = extent {
                options = options.with_extent(extent);
            }
            if let Some(tile) = tile {
                options = options.with_tile(tile);
            }
            predict(&weights, &image, load_config(config.as_deref())?, &options, output.as_deref(), format)?;
        }
        Commands::Annotate {
            job,
            weights,
            images,
            output,
            extension,
            config,
        } => {
            let job = match (job, weights, images, output) {
                (Some(path), ..) => AnnotateJob::from_file(path)?,
                (None, Some(weights), Some(images), Some(output)) => {
                    let mut job = AnnotateJob::new(weights, images, output);
                    job.image_extension = extension;
                    job.predictor = load_config(config.as_deref())?;
                    job
                }
                _ => return Err(CliError::IncompleteJob.into()),
            };
            annotate(&job)?;
        }
        Commands::Schema { kind } => {
            let schema = match kind {
                SchemaKind::Predictor => serde_json::to_string_pretty(&PredictorConfig::schema())?,
                SchemaKind::Job => serde_json::to_string_pretty(&AnnotateJob::schema())?,
            };
            println!("{schema}");
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PredictorConfig> {
    Ok(match path {
        Some(path) => {
            let config = PredictorConfig::from_file(path)?;
            config.validate()?;
            config
        }
        None => PredictorConfig::default(),
    })
}

fn predict(
    weights: &Path,
    image: &Path,
    config: PredictorConfig,
    options: &PredictOptions,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let predictor = Predictor::new(weights, ComponentEngineLoader, config)?;
    let footprints = predictor.predict_path(image, options)?;
    info!("Found {} footprints in {:?}", footprints.len(), image);

    let content = match format {
        OutputFormat::Geojson => {
            FootprintCollection::new(footprints, options.extent.is_some()).to_geojson_string()?
        }
        OutputFormat::Json => serde_json::to_string_pretty(&footprints)?,
    };

    match output {
        Some(path) => {
            std::fs::write(path, content)?;
            info!("Saved {} output to: {:?}", format, path);
        }
        None => println!("{content}"),
    }
    Ok(())
}

fn annotate(job: &AnnotateJob) -> Result<()> {
    let images = discover_images(&job.images_dir, &job.image_extension)?;
    if images.is_empty() {
        warn!("No *.{} images found below {:?}", job.image_extension, job.images_dir);
    }
    info!("Annotating {} images", images.len());

    let predictor = Predictor::new(&job.weights, ComponentEngineLoader, job.predictor.clone())?;
    let records = build_annotations(&predictor, &images)?;
    write_annotations(&job.output, &records)?;

    info!("Wrote {} annotation records to {:?}", records.len(), job.output);
    Ok(())
}
