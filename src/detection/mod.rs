//! Windowed credential attack detectors
//!
//! Each detector consumes the full, read-only event slice and returns at
//! most one incident per grouping key.

pub mod brute_force;
pub mod engine;
pub mod fail_then_success;
pub mod spray;
pub mod window;

pub use brute_force::{AccountBruteForceDetector, IpBruteForceDetector};
pub use engine::DetectionEngine;
pub use fail_then_success::FailThenSuccessDetector;
pub use spray::IpMultiAccountDetector;

use chrono::Duration;
use thiserror::Error;

use crate::models::{AuthEvent, Incident};

/// Default sliding window (5 minutes)
pub const DEFAULT_WINDOW_SECONDS: i64 = 300;
/// Default number of failures that constitutes brute force
pub const DEFAULT_FAIL_THRESHOLD: usize = 5;
/// Default number of distinct IPs for account brute force
pub const DEFAULT_IP_THRESHOLD: usize = 3;
/// Default number of distinct accounts for a spray
pub const DEFAULT_USER_THRESHOLD: usize = 3;

/// Errors raised when a detector is given meaningless parameters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectionError {
    #[error("Window must be positive, got {0} seconds")]
    InvalidWindow(i64),

    #[error("Window of {0} seconds is out of range")]
    WindowOutOfRange(i64),

    #[error("Threshold '{name}' must be positive, got {value}")]
    InvalidThreshold { name: &'static str, value: usize },
}

/// A detection strategy over a batch of authentication events
pub trait Detector: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Run over `events` and return the incidents found
    fn detect(&self, events: &[AuthEvent]) -> Vec<Incident>;
}

pub(crate) fn validate_window(window: Duration) -> Result<Duration, DetectionError> {
    if window <= Duration::zero() {
        return Err(DetectionError::InvalidWindow(window.num_seconds()));
    }
    Ok(window)
}

pub(crate) fn validate_threshold(name: &'static str, value: usize) -> Result<usize, DetectionError> {
    if value == 0 {
        return Err(DetectionError::InvalidThreshold { name, value });
    }
    Ok(value)
}
