use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::*;
use lactrs::config::{ConfigLoader, ModelParameters, ParameterSet};
use lactrs::engine::LactateEngine;
use lactrs::hybrid::AcidBathInput;
use lactrs::import::load_stages;
use lactrs::logging::{init_logging, LogConfig, LogFormat};
use lactrs::models::{Discipline, TestInput};
use lactrs::race::AthleteLevel;
use lactrs::{protocol, report};
use std::io::Read;
use std::path::PathBuf;

/// lactrs - Lactate step test analysis
///
/// Derives thresholds, metabolic type, VO2max, resilience and race
/// projections from incremental running tests.
#[derive(Parser)]
#[command(name = "lactrs")]
#[command(version)]
#[command(about = "Lactate step test analysis", long_about = None)]
struct Cli {
    /// Model parameter file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Named calibration (canonical, legacy_strict, conservative)
    #[arg(short, long, value_name = "SET")]
    preset: Option<String>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log format on stderr (compact, pretty, json)
    #[arg(long, global = true, default_value = "compact")]
    log_format: LogFormat,

    /// Also write JSON logs to this file
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Append to the log file instead of rolling it daily
    #[arg(long, global = true)]
    no_log_rotation: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a step test from a CSV or JSON stage file
    Analyze {
        /// Stage file (speed, lactate, heart_rate)
        #[arg(short, long)]
        file: PathBuf,

        /// Body weight in kg
        #[arg(short, long, default_value_t = TestInput::DEFAULT_WEIGHT_KG)]
        weight: f64,

        /// Height in cm
        #[arg(long, default_value_t = TestInput::DEFAULT_HEIGHT_CM)]
        height: f64,

        /// Shoulder width in cm
        #[arg(long, default_value_t = TestInput::DEFAULT_WIDTH_CM)]
        width: f64,

        /// Peak speed in km/h (defaults to the fastest stage)
        #[arg(long)]
        v_max: Option<f64>,

        /// run or hybrid
        #[arg(short, long, default_value = "hybrid")]
        discipline: Discipline,

        /// Test was not run to exhaustion; use the fixed-offset LT2
        #[arg(long)]
        submaximal: bool,

        /// Athlete level for the level-model projections (elite, ambitious, amateur)
        #[arg(short, long, default_value = "ambitious")]
        level: AthleteLevel,

        /// Print the JSON record instead of the report
        #[arg(long)]
        json: bool,
    },

    /// Analyze several stage files in parallel
    Batch {
        /// Stage files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// run or hybrid
        #[arg(short, long, default_value = "hybrid")]
        discipline: Discipline,
    },

    /// Evaluate an acid-bath interval
    AcidBath {
        #[arg(short, long, default_value_t = TestInput::DEFAULT_WEIGHT_KG)]
        weight: f64,

        /// Average bike power in watts
        #[arg(long)]
        watts: f64,

        /// Lactate before the interval (mmol/L)
        #[arg(long)]
        baseline: f64,

        /// Lactate right after the interval (mmol/L)
        #[arg(long)]
        peak: f64,

        /// Lactate after recovery (mmol/L)
        #[arg(long)]
        recovery: f64,

        /// Fresh run pace in m/s
        #[arg(long)]
        base_pace: f64,

        #[arg(long)]
        json: bool,
    },

    /// Answer a JSON protocol request read from a file or stdin
    Request {
        /// Request file; stdin when omitted
        file: Option<PathBuf>,
    },

    /// Manage the model parameter file
    Config {
        /// Write the selected parameters to the config path
        #[arg(long)]
        init: bool,

        /// Print the active parameters as TOML
        #[arg(long)]
        show: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::from_verbosity(cli.verbose)
        .with_format(cli.log_format)
        .with_file(cli.log_file.clone(), !cli.no_log_rotation);
    init_logging(&log_config)?;

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(ConfigLoader::default_config_path);
    let params = load_parameters(&config_path, cli.preset.as_deref())?;
    let engine = LactateEngine::new(params).context("Invalid model parameters")?;

    match cli.command {
        Commands::Analyze {
            file,
            weight,
            height,
            width,
            v_max,
            discipline,
            submaximal,
            level,
            json,
        } => {
            let stages = load_stages(&file)
                .with_context(|| format!("Failed to load stages from {}", file.display()))?;
            let input = TestInput::new(stages)
                .with_biometrics(weight, height, width)
                .with_discipline(discipline)
                .with_all_out(!submaximal)
                .with_v_max(v_max)
                .with_athlete_level(level);

            let mut stdout = std::io::stdout();
            if discipline == Discipline::Hybrid && input.stages.len() == 3 {
                let metrics = engine.analyze_hybrid(&input).map_err(user_error)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&metrics)?);
                } else {
                    report::write_hybrid_report(&mut stdout, &metrics, Utc::now())?;
                }
            } else {
                let record = engine.analyze(&input).map_err(user_error)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&record)?);
                } else {
                    report::write_metrics_report(&mut stdout, &record, Utc::now())?;
                }
            }
        }

        Commands::Batch { files, discipline } => {
            println!("{}", format!("Analyzing {} tests...", files.len()).cyan().bold());
            let inputs = files
                .iter()
                .map(|file| {
                    load_stages(file)
                        .map(|stages| TestInput::new(stages).with_discipline(discipline))
                        .with_context(|| format!("Failed to load stages from {}", file.display()))
                })
                .collect::<Result<Vec<_>>>()?;

            for (file, result) in files.iter().zip(engine.analyze_batch(&inputs)) {
                match result {
                    Ok(record) => println!(
                        "{} {}: LT1 {:.2} km/h, LT2 {:.2} km/h, {}",
                        "✓".green(),
                        file.display(),
                        record.thresholds.lt1_speed,
                        record.thresholds.lt2_speed,
                        record.metabolic_type
                    ),
                    Err(e) => println!("{} {}: {}", "✗".red(), file.display(), e.user_message()),
                }
            }
        }

        Commands::AcidBath {
            weight,
            watts,
            baseline,
            peak,
            recovery,
            base_pace,
            json,
        } => {
            let result = engine
                .analyze_acid_bath(&AcidBathInput {
                    weight_kg: weight,
                    bike_watt_avg: watts,
                    lactate_baseline: baseline,
                    lactate_peak: peak,
                    lactate_recovery: recovery,
                    base_pace_mps: base_pace,
                })
                .map_err(user_error)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                report::write_acid_bath_report(&mut std::io::stdout().lock(), &result, Utc::now())?;
            }
        }

        Commands::Request { file } => {
            let request = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read request {}", path.display()))?,
                None => {
                    let mut buffer = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buffer)
                        .context("Failed to read request from stdin")?;
                    buffer
                }
            };
            println!("{}", protocol::handle_json(&engine, &request));
        }

        Commands::Config { init, show } => {
            if init {
                let content = match cli.preset.as_deref() {
                    Some(name) => ConfigLoader::preset_template(name.parse::<ParameterSet>()?)?,
                    None => ConfigLoader::export_to_string(engine.parameters())?,
                };
                if let Some(dir) = config_path.parent() {
                    std::fs::create_dir_all(dir)?;
                }
                std::fs::write(&config_path, content)
                    .with_context(|| format!("Failed to write {}", config_path.display()))?;
                println!(
                    "{}",
                    format!("✓ Parameters written to {}", config_path.display()).green()
                );
            }
            if show || !init {
                print!("{}", ConfigLoader::export_to_string(engine.parameters())?);
            }
        }
    }

    Ok(())
}

fn load_parameters(path: &std::path::Path, preset: Option<&str>) -> Result<ModelParameters> {
    if let Some(name) = preset {
        let set: ParameterSet = name.parse()?;
        tracing::info!(preset = set.name(), "Using named parameter set");
        return Ok(set.parameters());
    }
    ConfigLoader::load_with_defaults(path)
        .with_context(|| format!("Failed to load parameters from {}", path.display()))
}

fn user_error(err: lactrs::LactrsError) -> anyhow::Error {
    anyhow::anyhow!("{}", err.user_message().as_str().red())
}
