//! Brute force detection
//!
//! Two flavours share the sliding window skeleton:
//! - per-IP: one source address failing repeatedly
//! - per-account: one username failing repeatedly from several addresses

use chrono::Duration;

use super::window::{
    distinct_sorted, evidence, first_triggering_window, first_triggering_window_distinct, group_sorted,
};
use super::{validate_threshold, validate_window, DetectionError, Detector};
use super::{DEFAULT_FAIL_THRESHOLD, DEFAULT_IP_THRESHOLD, DEFAULT_WINDOW_SECONDS};
use crate::models::{AuthEvent, Incident};

const EVIDENCE_CAP: usize = 5;

/// Detects many failed logins from a single IP within the window
#[derive(Debug, Clone)]
pub struct IpBruteForceDetector {
    window: Duration,
    fail_threshold: usize,
}

impl IpBruteForceDetector {
    pub fn new(window: Duration, fail_threshold: usize) -> Result<Self, DetectionError> {
        Ok(IpBruteForceDetector {
            window: validate_window(window)?,
            fail_threshold: validate_threshold("fail_threshold", fail_threshold)?,
        })
    }
}

impl Default for IpBruteForceDetector {
    fn default() -> Self {
        IpBruteForceDetector {
            window: Duration::seconds(DEFAULT_WINDOW_SECONDS),
            fail_threshold: DEFAULT_FAIL_THRESHOLD,
        }
    }
}

impl Detector for IpBruteForceDetector {
    fn name(&self) -> &'static str {
        "ip_brute_force"
    }

    fn detect(&self, events: &[AuthEvent]) -> Vec<Incident> {
        let mut incidents = Vec::new();

        for group in group_sorted(events, |e| e.ip(), |e| e.status.is_fail()) {
            let hit = first_triggering_window(&group.events, self.window, |w| {
                w.len() >= self.fail_threshold
            });

            if let Some(w) = hit {
                log::debug!("IP {} crossed the failure threshold ({} fails)", group.key, w.len());
                incidents.push(Incident::BruteForce {
                    ip: group.key.to_string(),
                    count: w.len(),
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

/// Detects many failed logins against one account from several IPs
#[derive(Debug, Clone)]
pub struct AccountBruteForceDetector {
    window: Duration,
    fail_threshold: usize,
    ip_threshold: usize,
}

impl AccountBruteForceDetector {
    pub fn new(
        window: Duration,
        fail_threshold: usize,
        ip_threshold: usize,
    ) -> Result<Self, DetectionError> {
        Ok(AccountBruteForceDetector {
            window: validate_window(window)?,
            fail_threshold: validate_threshold("fail_threshold", fail_threshold)?,
            ip_threshold: validate_threshold("ip_threshold", ip_threshold)?,
        })
    }
}

impl Default for AccountBruteForceDetector {
    fn default() -> Self {
        AccountBruteForceDetector {
            window: Duration::seconds(DEFAULT_WINDOW_SECONDS),
            fail_threshold: DEFAULT_FAIL_THRESHOLD,
            ip_threshold: DEFAULT_IP_THRESHOLD,
        }
    }
}

impl Detector for AccountBruteForceDetector {
    fn name(&self) -> &'static str {
        "account_brute_force"
    }

    fn detect(&self, events: &[AuthEvent]) -> Vec<Incident> {
        let mut incidents = Vec::new();

        for group in group_sorted(events, |e| e.username(), |e| e.status.is_fail()) {
            let hit = first_triggering_window_distinct(&group.events, self.window, |e| e.ip(), |fails, ips| {
                fails >= self.fail_threshold && ips >= self.ip_threshold
            });

            if let Some(w) = hit {
                let ips = distinct_sorted(w, |e| e.ip());
                log::debug!(
                    "Account '{}' crossed the failure threshold ({} fails from {} IPs)",
                    group.key,
                    w.len(),
                    ips.len()
                );
                incidents.push(Incident::AccountBruteForce {
                    username: group.key.to_string(),
                    count: w.len(),
                    ip_count: ips.len(),
                    ips,
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
