//! Runs the configured detectors over one batch of events

use std::thread;

use chrono::Duration;

use super::{
    AccountBruteForceDetector, DetectionError, Detector, FailThenSuccessDetector,
    IpBruteForceDetector, IpMultiAccountDetector,
};
use crate::config::DetectionConfig;
use crate::models::{AuthEvent, Incident};

/// Holds a validated set of detectors
///
/// Detectors only read the shared event slice, so each one runs on its own
/// scoped thread. Output is collected in detector order.
pub struct DetectionEngine {
    detectors: Vec<Box<dyn Detector>>,
}

impl DetectionEngine {
    /// Build the enabled detectors, rejecting invalid parameters up front
    pub fn from_config(config: &DetectionConfig) -> Result<Self, DetectionError> {
        let window = Duration::try_seconds(config.window_seconds)
            .ok_or(DetectionError::WindowOutOfRange(config.window_seconds))?;
        let mut detectors: Vec<Box<dyn Detector>> = Vec::new();

        if config.enable_ip_brute_force {
            detectors.push(Box::new(IpBruteForceDetector::new(window, config.fail_threshold)?));
        }
        if config.enable_account_brute_force {
            detectors.push(Box::new(AccountBruteForceDetector::new(
                window,
                config.fail_threshold,
                config.ip_threshold,
            )?));
        }
        if config.enable_fail_then_success {
            detectors.push(Box::new(FailThenSuccessDetector::new(window)?));
        }
        if config.enable_ip_multi_account {
            detectors.push(Box::new(IpMultiAccountDetector::new(
                window,
                config.user_threshold,
                config.fail_only,
            )?));
        }

        Ok(DetectionEngine { detectors })
    }

    pub fn detector_names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Run every detector and return the incidents grouped per detector
    pub fn run_batches(&self, events: &[AuthEvent]) -> Vec<Vec<Incident>> {
        if events.is_empty() {
            return self.detectors.iter().map(|_| Vec::new()).collect();
        }

        thread::scope(|scope| {
            let handles: Vec<_> = self
                .detectors
                .iter()
                .map(|detector| {
                    let detector: &dyn Detector = &**detector;
                    (detector.name(), scope.spawn(move || detector.detect(events)))
                })
                .collect();

            handles
                .into_iter()
                .map(|(name, handle)| match handle.join() {
                    Ok(incidents) => {
                        log::info!("[{}] incidents found: {}", name, incidents.len());
                        incidents
                    }
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }

    /// Run every detector and concatenate their output
    pub fn run(&self, events: &[AuthEvent]) -> Vec<Incident> {
        self.run_batches(events).into_iter().flatten().collect()
    }
}

impl Default for DetectionEngine {
    fn default() -> Self {
        let detectors: Vec<Box<dyn Detector>> = vec![
            Box::new(IpBruteForceDetector::default()) as Box<dyn Detector>,
            Box::new(AccountBruteForceDetector::default()),
            Box::new(FailThenSuccessDetector::default()),
            Box::new(IpMultiAccountDetector::default()),
        ];
        DetectionEngine { detectors }
    }
}
