//! Input side: turning raw auth logs into events

pub mod auth_log;

pub use auth_log::AuthLogParser;

use thiserror::Error;

/// Errors that can occur while reading auth logs
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Empty line")]
    EmptyLine,

    #[error("No usable timestamp in line: {0}")]
    MissingTimestamp(String),
}
