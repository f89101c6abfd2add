//! Fail-then-success correlation
//!
//! A successful login preceded, within the window, by failed attempts on
//! the same account suggests a guessed or leaked credential.

use chrono::Duration;

use super::window::{distinct_sorted, evidence, group_sorted};
use super::{validate_window, DetectionError, Detector, DEFAULT_WINDOW_SECONDS};
use crate::models::{AuthEvent, Incident};

/// Failed lines kept as evidence, the success line is appended after them
const FAIL_EVIDENCE_CAP: usize = 5;

/// Correlates failed logins with a later success for the same username
#[derive(Debug, Clone)]
pub struct FailThenSuccessDetector {
    window: Duration,
}

impl FailThenSuccessDetector {
    pub fn new(window: Duration) -> Result<Self, DetectionError> {
        Ok(FailThenSuccessDetector {
            window: validate_window(window)?,
        })
    }

    /// Fail events positioned before `success_idx` and within the window
    fn recent_fails<'a>(&self, events: &[&'a AuthEvent], success_idx: usize) -> Vec<&'a AuthEvent> {
        let success_time = events[success_idx].timestamp;
        events[..success_idx]
            .iter()
            .filter(|e| e.status.is_fail())
            .filter(|e| {
                let dt = success_time - e.timestamp;
                dt >= Duration::zero() && dt <= self.window
            })
            .copied()
            .collect()
    }
}

impl Default for FailThenSuccessDetector {
    fn default() -> Self {
        FailThenSuccessDetector {
            window: Duration::seconds(DEFAULT_WINDOW_SECONDS),
        }
    }
}

impl Detector for FailThenSuccessDetector {
    fn name(&self) -> &'static str {
        "fail_then_success"
    }

    fn detect(&self, events: &[AuthEvent]) -> Vec<Incident> {
        let mut incidents = Vec::new();
        let groups = group_sorted(
            events,
            |e| e.username(),
            |e| e.status.is_fail() || e.status.is_success(),
        );

        for group in groups {
            for (idx, success) in group.events.iter().enumerate() {
                if !success.status.is_success() {
                    continue;
                }

                let fails = self.recent_fails(&group.events, idx);
                if fails.is_empty() {
                    continue;
                }

                log::debug!(
                    "Account '{}' succeeded after {} failed attempts",
                    group.key,
                    fails.len()
                );
                let mut lines = evidence(&fails, FAIL_EVIDENCE_CAP);
                lines.push(success.raw.clone());

                incidents.push(Incident::FailThenSuccess {
                    username: group.key.to_string(),
                    fail_count: fails.len(),
                    ips: distinct_sorted(&fails, |e| e.ip()),
                    window: self.window,
                    success_time: success.timestamp,
                    evidence: lines,
                });
                break;
            }
        }

        incidents
    }
}
