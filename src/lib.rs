pub mod config;
pub mod detection;
pub mod enrichment;
pub mod input;
pub mod models;
pub mod output;

// Re-export commonly used types
pub use config::{Config, DetectionConfig};
pub use detection::{DetectionEngine, DetectionError, Detector};
pub use enrichment::{enrich, enrich_all, risk_score, RiskLevel};
pub use input::AuthLogParser;
pub use models::{AuthEvent, AuthStatus, EnrichedIncident, Incident, IncidentType, Severity};
pub use output::{OutputFormat, OutputHandler, Report};

/// Run every enabled detector over `events` and rank the result
pub fn analyze(
    events: &[AuthEvent],
    config: &DetectionConfig,
) -> Result<Vec<EnrichedIncident>, DetectionError> {
    let engine = DetectionEngine::from_config(config)?;
    Ok(enrich_all(engine.run_batches(events)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(minutes: i64, seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 7, 11, 0, 0).unwrap()
            + Duration::minutes(minutes)
            + Duration::seconds(seconds)
    }

    fn event(ts: DateTime<Utc>, status: AuthStatus, user: &str, ip: &str) -> AuthEvent {
        AuthEvent::new(ts, status, format!("{:?} user={} ip={} at={}", status, user, ip, ts))
            .with_username(user)
            .with_ip(ip)
    }

    fn incidents_of(enriched: &[EnrichedIncident], kind: IncidentType) -> Vec<&Incident> {
        enriched
            .iter()
            .map(|e| e.incident())
            .filter(|i| i.incident_type() == kind)
            .collect()
    }

    #[test]
    fn test_ip_brute_force_scenario() {
        let events: Vec<AuthEvent> = (0..6)
            .map(|i| event(at(0, i * 45), AuthStatus::Fail, "root", "10.0.0.5"))
            .collect();

        let enriched = analyze(&events, &DetectionConfig::default()).unwrap();
        let brute = incidents_of(&enriched, IncidentType::BruteForce);
        assert_eq!(brute.len(), 1);
        assert_eq!(brute[0].volume(), 6);
        assert_eq!(brute[0].severity(), Severity::Critical);
    }

    #[test]
    fn test_account_brute_force_scenario() {
        let ips = ["1.1.1.1", "2.2.2.2", "3.3.3.3", "1.1.1.1", "2.2.2.2"];
        let events: Vec<AuthEvent> = ips
            .iter()
            .enumerate()
            .map(|(i, ip)| event(at(i as i64, 0), AuthStatus::Fail, "alice", ip))
            .collect();

        let enriched = analyze(&events, &DetectionConfig::default()).unwrap();
        let account = incidents_of(&enriched, IncidentType::AccountBruteForce);
        assert_eq!(account.len(), 1);
        match account[0] {
            Incident::AccountBruteForce { ip_count, count, .. } => {
                assert_eq!(*ip_count, 3);
                assert_eq!(*count, 5);
            }
            other => panic!("unexpected incident {:?}", other),
        }
    }

    #[test]
    fn test_fail_then_success_scenario() {
        let events = vec![
            event(at(0, 0), AuthStatus::Fail, "bob", "10.0.0.7"),
            event(at(2, 0), AuthStatus::Success, "bob", "10.0.0.7"),
        ];

        let enriched = analyze(&events, &DetectionConfig::default()).unwrap();
        assert_eq!(enriched.len(), 1);
        let incident = enriched[0].incident();
        assert_eq!(incident.incident_type(), IncidentType::FailThenSuccess);
        assert_eq!(incident.volume(), 1);
        assert_eq!(incident.evidence().len(), 2);
        assert_eq!(enriched[0].risk_score(), 88);
    }

    #[test]
    fn test_empty_input_scenario() {
        let enriched = analyze(&[], &DetectionConfig::default()).unwrap();
        assert!(enriched.is_empty());
    }

    #[test]
    fn test_invalid_configuration_aborts() {
        let config = DetectionConfig {
            fail_threshold: 0,
            ..DetectionConfig::default()
        };
        assert!(analyze(&[], &config).is_err());
    }

    #[test]
    fn test_ranking_is_stable_across_runs() {
        let mut events: Vec<AuthEvent> = (0..6)
            .map(|i| event(at(0, i * 10), AuthStatus::Fail, "root", "10.0.0.5"))
            .collect();
        events.extend((0..3).map(|i| {
            event(at(10, i * 10), AuthStatus::Fail, &format!("user{}", i), "10.0.0.9")
        }));
        events.extend((0..3).map(|i| {
            event(at(20, i * 10), AuthStatus::Fail, &format!("svc{}", i), "10.0.0.8")
        }));

        let first = analyze(&events, &DetectionConfig::default()).unwrap();
        let second = analyze(&events, &DetectionConfig::default()).unwrap();
        assert_eq!(first, second);

        let scores: Vec<u8> = first.iter().map(|e| e.risk_score()).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));

        // The two sprays tie and keep detection order
        let sprays = incidents_of(&first, IncidentType::IpMultiAccount);
        let subjects: Vec<&str> = sprays.iter().map(|i| i.subject()).collect();
        assert_eq!(subjects, vec!["10.0.0.9", "10.0.0.8"]);
    }
}
