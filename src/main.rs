use anyhow::{bail, Context, Result};
use clap::Parser;
use gallop::c3d::C3dDecoder;
use gallop::{read_with, ProcessingConfig};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gallop")]
#[command(about = "Summarise a C3D gait trial as JSON", long_about = None)]
struct Args {
    /// Trial file (.c3d or .c3d.gz)
    #[arg(value_name = "TRIAL")]
    path: PathBuf,

    /// JSON processing config (marker/analog cutoffs, order)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Marker low-pass cutoff in Hz (overrides config)
    #[arg(long)]
    marker_cutoff: Option<f64>,

    /// Analog low-pass cutoff in Hz (overrides config)
    #[arg(long)]
    analog_cutoff: Option<f64>,

    /// Largest |cos| accepted between a platform's X and Y corner edges
    #[arg(long)]
    max_edge_skew: Option<f64>,

    /// Filter markers and analog channels before summarising
    #[arg(long, default_value_t = false)]
    filter: bool,

    /// Write the summary here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn processing_config(args: &Args) -> Result<ProcessingConfig> {
    let mut config = match &args.config {
        Some(path) => ProcessingConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ProcessingConfig::default(),
    };
    if let Some(cutoff) = args.marker_cutoff {
        config.marker_cutoff_hz = cutoff;
    }
    if let Some(cutoff) = args.analog_cutoff {
        config.analog_cutoff_hz = cutoff;
    }
    if let Some(skew) = args.max_edge_skew {
        config.max_edge_skew = skew;
    }
    if !args.filter && (args.marker_cutoff.is_some() || args.analog_cutoff.is_some()) {
        bail!("--marker-cutoff/--analog-cutoff need --filter");
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = processing_config(&args)?;

    let mut trial = read_with(&args.path, &C3dDecoder, &config)?;
    if args.filter {
        log::info!(
            "Filtering: markers {} Hz, analog {} Hz, order {}",
            config.marker_cutoff_hz,
            config.analog_cutoff_hz,
            config.order
        );
        trial = trial.filtered(&config)?;
    }

    let mut summary = serde_json::to_value(trial.summary())?;
    if args.filter {
        summary["filter"] = serde_json::to_value(&config)?;
    }
    let text = serde_json::to_string_pretty(&summary)?;

    match &args.output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            log::info!("Summary written to {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}
