pub mod report;

pub use report::{IpCount, Report, RiskBuckets, Summary};

use crate::enrichment::RiskLevel;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while writing reports
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Jsonl,
    Console,
}

impl OutputFormat {
    pub fn from_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "jsonl" => OutputFormat::Jsonl,
            "console" => OutputFormat::Console,
            other => {
                log::warn!("Unknown output format '{}', falling back to json", other);
                OutputFormat::Json
            }
        }
    }
}

/// Writes reports to a file or stdout
pub struct OutputHandler {
    format: OutputFormat,
    writer: Option<Box<dyn Write + Send>>,
}

impl OutputHandler {
    /// Create a new output handler
    ///
    /// An existing file at `file_path` is overwritten. Console output always
    /// goes to stdout.
    pub fn new(format: OutputFormat, file_path: Option<PathBuf>) -> Result<Self, OutputError> {
        let writer: Option<Box<dyn Write + Send>> = match (&format, file_path) {
            (OutputFormat::Console, _) => None,
            (_, Some(path)) => {
                let file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(path)?;
                Some(Box::new(BufWriter::new(file)))
            }
            (_, None) => None,
        };

        Ok(OutputHandler { format, writer })
    }

    /// Write a full report
    pub fn write_report(&mut self, report: &Report) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(report)?;
                self.write_output(&format!("{}\n", json))?;
            }
            OutputFormat::Jsonl => {
                for incident in &report.incidents {
                    let json = serde_json::to_string(incident)?;
                    self.write_output(&format!("{}\n", json))?;
                }
            }
            OutputFormat::Console => {
                self.write_output(&render_console(report))?;
            }
        }
        self.flush()
    }

    fn write_output(&mut self, data: &str) -> Result<(), OutputError> {
        match &mut self.writer {
            Some(writer) => writer.write_all(data.as_bytes())?,
            None => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(data.as_bytes())?;
                stdout.flush()?;
            }
        }
        Ok(())
    }

    /// Flush any buffered output
    pub fn flush(&mut self) -> Result<(), OutputError> {
        if let Some(writer) = &mut self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}

fn render_console(report: &Report) -> String {
    let summary = &report.summary;
    let mut out = format!(
        "Events: {}  Incidents: {} (high {}, medium {}, low {})\n",
        summary.total_events,
        summary.total_incidents,
        summary.risk_buckets.high,
        summary.risk_buckets.medium,
        summary.risk_buckets.low
    );

    if !report.top_ips.is_empty() {
        let top: Vec<String> = report
            .top_ips
            .iter()
            .map(|c| format!("{} ({})", c.ip, c.events))
            .collect();
        out.push_str(&format!("Top IPs: {}\n", top.join(", ")));
    }

    for enriched in &report.incidents {
        let incident = enriched.incident();
        out.push_str(&format!(
            "[{:>3} {}] {} {} - {} (window {}s)\n",
            enriched.risk_score(),
            RiskLevel::from_score(enriched.risk_score()),
            enriched.severity(),
            incident.incident_type(),
            incident.describe(),
            incident.window().num_seconds()
        ));
        for line in incident.evidence() {
            out.push_str(&format!("      {}\n", line));
        }
    }
    out
}
