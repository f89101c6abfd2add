use std::path::PathBuf;
use structopt::StructOpt;

use credwatch::config::Config;
use credwatch::detection::DetectionEngine;
use credwatch::enrichment::enrich_all;
use credwatch::input::AuthLogParser;
use credwatch::output::{OutputFormat, OutputHandler, Report};

/// Credential attack detection over authentication logs
#[derive(StructOpt, Debug)]
#[structopt(name = "credwatch", about = "Credential attack detection CLI")]
pub enum Cli {
    /// Analyze an auth log and write a ranked incident report
    Analyze {
        /// Path to the auth log (overrides the configuration)
        #[structopt(short, long)]
        file: Option<PathBuf>,
        /// Path to configuration file
        #[structopt(short, long)]
        config: Option<PathBuf>,
        /// Output format: json, jsonl or console (overrides the configuration)
        #[structopt(long)]
        format: Option<String>,
        /// Output file; use "-" for stdout (overrides the configuration)
        #[structopt(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate a default configuration file
    Config {
        /// Output path for the configuration file
        #[structopt(short, long, default_value = "credwatch.toml")]
        output: PathBuf,
    },
    /// Parse and display auth events from a file
    Parse {
        /// Path to log file
        #[structopt(short, long)]
        file: PathBuf,
        /// Number of events to show
        #[structopt(short, long, default_value = "10")]
        lines: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    match Cli::from_args() {
        Cli::Analyze { file, config, format, output } => {
            let mut config = match config {
                Some(path) => Config::from_file(&path)?,
                None => {
                    log::warn!("No configuration given, using defaults");
                    Config::default()
                }
            };
            if let Some(format) = format {
                config.output.format = format;
            }
            if let Some(output) = output {
                config.output.file_path = if output.as_os_str() == "-" { None } else { Some(output) };
            }

            let log_path = file
                .or_else(|| config.input.file_path.clone())
                .ok_or("No auth log given; pass --file or set input.file_path")?;
            if !log_path.exists() {
                eprintln!("File not found: {:?}", log_path);
                std::process::exit(1);
            }

            run_analysis(&config, &log_path)?;
        }
        Cli::Config { output } => {
            Config::default().to_file(&output)?;
            println!("Default configuration written to: {:?}", output);
        }
        Cli::Parse { file, lines } => {
            if !file.exists() {
                eprintln!("File not found: {:?}", file);
                std::process::exit(1);
            }

            let parser = AuthLogParser::with_current_year()?;
            let events = parser.parse_file(&file)?;
            let display_count = std::cmp::min(lines, events.len());

            println!("Parsed {} event(s) (showing {}):\n", events.len(), display_count);
            for event in events.iter().take(display_count) {
                println!(
                    "  {} {:?} user={} ip={}",
                    event.timestamp,
                    event.status,
                    event.username().unwrap_or("-"),
                    event.ip().unwrap_or("-")
                );
            }
        }
    }

    Ok(())
}

fn run_analysis(config: &Config, log_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let parser = match config.input.year {
        Some(year) => AuthLogParser::new(year)?,
        None => AuthLogParser::with_current_year()?,
    };
    let events = parser.parse_file(log_path)?;

    let engine = DetectionEngine::from_config(&config.detection)?;
    log::info!("Detectors enabled: {}", engine.detector_names().join(", "));

    let enriched = enrich_all(engine.run_batches(&events));
    if let Some(top) = enriched.first() {
        log::info!(
            "Top incident: [{}] {}",
            top.risk_score(),
            top.incident().describe()
        );
    }

    let report = Report::build(&events, enriched);
    let format = OutputFormat::from_name(&config.output.format);
    let mut handler = OutputHandler::new(format, config.output.file_path.clone())?;
    handler.write_report(&report)?;

    if let Some(ref path) = config.output.file_path {
        if format != OutputFormat::Console {
            log::info!("Report written to {:?}", path);
        }
    }
    Ok(())
}
