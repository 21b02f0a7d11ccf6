//! Wrist accelerometer movement feature CLI
//!
//! Extracts windowed feature tables from `ts,x,y,z` recordings, prints the
//! preset pipeline declarations and writes simulated recordings.

mod io;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wam_processing::{FeaturePipeline, PipelineConfig, UseCase};
use wam_simulation::{AccelSimulator, MovementPattern, SimulationConfig};

#[derive(Parser)]
#[command(name = "wam-features")]
#[command(version)]
#[command(about = "Windowed movement features from wrist accelerometer recordings", long_about = None)]
struct Cli {
    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a feature table from a recording
    Extract {
        /// Recording file (`ts,x,y,z` rows, or a JSON sample array)
        #[arg(long, short)]
        input: PathBuf,

        /// Sampling rate of the recording in Hz
        #[arg(long)]
        fs: f64,

        /// Preset pipeline to run
        #[arg(long, value_enum, default_value = "gait")]
        use_case: UseCaseArg,

        /// JSON pipeline declaration; overrides --use-case
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output file (stdout if omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Evaluate windows on worker threads
        #[arg(long)]
        parallel: bool,
    },

    /// Print preset pipeline declarations and their columns
    Presets {
        #[arg(long, value_enum)]
        use_case: Option<UseCaseArg>,
    },

    /// Write a simulated recording as `ts,x,y,z` rows
    Simulate {
        #[arg(long, value_enum, default_value = "tremor")]
        pattern: PatternArg,

        /// Duration in seconds
        #[arg(long, default_value = "60")]
        seconds: f64,

        /// Sampling rate in Hz
        #[arg(long, default_value = "100")]
        fs: f64,

        /// Sensor noise standard deviation (g)
        #[arg(long, default_value = "0.01")]
        noise: f64,

        #[arg(long)]
        seed: Option<u64>,

        /// Output file (stdout if omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum UseCaseArg {
    Gait,
    Tremor,
    Bradykinesia,
    TremorAmplitude,
}

impl From<UseCaseArg> for UseCase {
    fn from(arg: UseCaseArg) -> Self {
        match arg {
            UseCaseArg::Gait => UseCase::Gait,
            UseCaseArg::Tremor => UseCase::Tremor,
            UseCaseArg::Bradykinesia => UseCase::Bradykinesia,
            UseCaseArg::TremorAmplitude => UseCase::TremorAmplitude,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PatternArg {
    Rest,
    Tremor,
    Gait,
    Voluntary,
}

impl From<PatternArg> for MovementPattern {
    fn from(arg: PatternArg) -> Self {
        match arg {
            PatternArg::Rest => MovementPattern::Rest,
            PatternArg::Tremor => MovementPattern::resting_tremor(),
            PatternArg::Gait => MovementPattern::walking(),
            PatternArg::Voluntary => MovementPattern::reaching(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Extract {
            input,
            fs,
            use_case,
            config,
            output,
            parallel,
        } => cmd_extract(input, fs, use_case.into(), config, output, parallel),
        Commands::Presets { use_case } => cmd_presets(use_case.map(Into::into)),
        Commands::Simulate {
            pattern,
            seconds,
            fs,
            noise,
            seed,
            output,
        } => cmd_simulate(pattern.into(), seconds, fs, noise, seed, output),
    }
}

fn cmd_extract(
    input: PathBuf,
    sampling_rate: f64,
    use_case: UseCase,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    parallel: bool,
) -> Result<()> {
    let config = match config {
        Some(path) => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("failed to read pipeline config {}", path.display()))?;
            PipelineConfig::from_json(&text)?
        }
        None => PipelineConfig::for_use_case(use_case)?,
    };
    let config = if parallel { config.with_parallel(true) } else { config };

    let recording = io::read_recording(&input, sampling_rate)?;
    let pipeline = FeaturePipeline::new(config, sampling_rate)?;
    tracing::info!(
        pipeline = %pipeline.config().name,
        samples = recording.len(),
        duration_s = recording.duration(),
        "extracting features"
    );

    let (table, report) = pipeline.run_with_report(&recording)?;
    let document = json!({
        "recording": recording.id(),
        "use_case": pipeline.config().use_case,
        "sampling_rate": sampling_rate,
        "window_seconds": pipeline.config().window_seconds,
        "table": table,
        "report": report,
    });

    write_output(output, &serde_json::to_string_pretty(&document)?)
}

fn cmd_presets(use_case: Option<UseCase>) -> Result<()> {
    let selected: Vec<UseCase> = match use_case {
        Some(use_case) => vec![use_case],
        None => UseCase::PRESETS.to_vec(),
    };

    let mut presets = Vec::with_capacity(selected.len());
    for use_case in selected {
        let config = PipelineConfig::for_use_case(use_case)?;
        let columns: Vec<String> = config
            .features
            .iter()
            .flat_map(|f| f.keys())
            .map(|key| key.display_name())
            .collect();
        presets.push(json!({ "config": config, "columns": columns }));
    }

    println!("{}", serde_json::to_string_pretty(&presets)?);
    Ok(())
}

fn cmd_simulate(
    pattern: MovementPattern,
    seconds: f64,
    sampling_rate: f64,
    noise: f64,
    seed: Option<u64>,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = SimulationConfig {
        seed,
        ..SimulationConfig::new(pattern, sampling_rate).with_noise(noise)
    };
    let recording = AccelSimulator::new(config)?.generate(seconds)?;
    tracing::info!(pattern = %pattern.description(), samples = recording.len(), "recording simulated");

    write_output(output, &io::format_table(&recording))
}

fn write_output(output: Option<PathBuf>, contents: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "output written");
        }
        None => println!("{contents}"),
    }
    Ok(())
}
