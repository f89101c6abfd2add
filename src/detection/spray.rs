//! Credential spray detection: one IP trying many accounts

use chrono::Duration;

use super::window::{distinct_sorted, evidence, first_triggering_window_distinct, group_sorted};
use super::{validate_threshold, validate_window, DetectionError, Detector};
use super::{DEFAULT_USER_THRESHOLD, DEFAULT_WINDOW_SECONDS};
use crate::models::{AuthEvent, AuthStatus, Incident};

const EVIDENCE_CAP: usize = 8;

/// Username recorded for events that carry none
const UNKNOWN_USER: &str = "unknown";

/// Detects a single IP touching many distinct accounts within the window
#[derive(Debug, Clone)]
pub struct IpMultiAccountDetector {
    window: Duration,
    user_threshold: usize,
    /// Only consider failed attempts; when false, successes count too
    fail_only: bool,
}

impl IpMultiAccountDetector {
    pub fn new(window: Duration, user_threshold: usize, fail_only: bool) -> Result<Self, DetectionError> {
        Ok(IpMultiAccountDetector {
            window: validate_window(window)?,
            user_threshold: validate_threshold("user_threshold", user_threshold)?,
            fail_only,
        })
    }

    fn accepts(&self, event: &AuthEvent) -> bool {
        match event.status {
            AuthStatus::Fail => true,
            AuthStatus::Success => !self.fail_only,
            AuthStatus::Other => false,
        }
    }
}

impl Default for IpMultiAccountDetector {
    fn default() -> Self {
        IpMultiAccountDetector {
            window: Duration::seconds(DEFAULT_WINDOW_SECONDS),
            user_threshold: DEFAULT_USER_THRESHOLD,
            fail_only: true,
        }
    }
}

fn username_or_unknown(event: &AuthEvent) -> Option<&str> {
    Some(event.username().unwrap_or(UNKNOWN_USER))
}

impl Detector for IpMultiAccountDetector {
    fn name(&self) -> &'static str {
        "ip_multi_account"
    }

    fn detect(&self, events: &[AuthEvent]) -> Vec<Incident> {
        let mut incidents = Vec::new();

        for group in group_sorted(events, |e| e.ip(), |e| self.accepts(e)) {
            let hit = first_triggering_window_distinct(&group.events, self.window, username_or_unknown, |_, users| {
                users >= self.user_threshold
            });

            if let Some(w) = hit {
                let users = distinct_sorted(w, username_or_unknown);
                log::debug!("IP {} touched {} accounts", group.key, users.len());
                incidents.push(Incident::IpMultiAccount {
                    ip: group.key.to_string(),
                    user_count: users.len(),
                    users,
                    window: self.window,
                    start_time: w[0].timestamp,
                    end_time: w[w.len() - 1].timestamp,
                    evidence: evidence(w, EVIDENCE_CAP),
                });
            }
        }

        incidents
    }
}
