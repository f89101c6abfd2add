//! Risk scoring and ranking of incidents
//!
//! Incidents from every detector are merged, scored on a 0-100 scale from
//! their severity, type and volume, and sorted highest risk first. Ties keep
//! their input order.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{EnrichedIncident, Incident, IncidentType, Severity};

/// Upper bound of any risk score
pub const MAX_RISK_SCORE: u8 = 100;

/// Cap on the volume contribution
const MAX_COUNT_BOOST: usize = 30;

/// Points per unit of volume
const COUNT_BOOST_STEP: usize = 3;

fn severity_base(severity: Severity) -> usize {
    match severity {
        Severity::Low => 10,
        Severity::Medium => 30,
        Severity::High => 60,
        Severity::Critical => 90,
    }
}

fn type_bonus(incident_type: IncidentType) -> usize {
    match incident_type {
        IncidentType::BruteForce => 10,
        IncidentType::AccountBruteForce => 15,
        IncidentType::FailThenSuccess => 25,
        IncidentType::IpMultiAccount => 0,
    }
}

/// `min(100, base + type_bonus + min(30, 3 * volume))`
pub fn risk_score(incident: &Incident) -> u8 {
    let count_boost = incident
        .volume()
        .saturating_mul(COUNT_BOOST_STEP)
        .min(MAX_COUNT_BOOST);
    let total = severity_base(incident.severity()) + type_bonus(incident.incident_type()) + count_boost;
    total.min(MAX_RISK_SCORE as usize) as u8
}

/// Score incidents and sort them by descending risk
///
/// The sort is stable, so equal scores keep their relative input order.
pub fn enrich<I>(incidents: I) -> Vec<EnrichedIncident>
where
    I: IntoIterator<Item = Incident>,
{
    let mut enriched: Vec<EnrichedIncident> = incidents
        .into_iter()
        .map(|incident| {
            let score = risk_score(&incident);
            EnrichedIncident::new(incident, score)
        })
        .collect();

    enriched.sort_by(|a, b| b.risk_score().cmp(&a.risk_score()));
    log::info!("[enriched] incidents ranked: {}", enriched.len());
    enriched
}

/// Concatenate per-detector outputs and enrich them
pub fn enrich_all(batches: Vec<Vec<Incident>>) -> Vec<EnrichedIncident> {
    enrich(batches.into_iter().flatten())
}

/// Coarse risk bucket used in report summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        if score >= 70 {
            RiskLevel::High
        } else if score >= 40 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn brute_force(ip: &str, count: usize) -> Incident {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        Incident::BruteForce {
            ip: ip.to_string(),
            count,
            window: Duration::minutes(5),
            start_time: t,
            end_time: t,
            evidence: vec![],
        }
    }

    fn spray(ip: &str, user_count: usize) -> Incident {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        Incident::IpMultiAccount {
            ip: ip.to_string(),
            user_count,
            users: vec![],
            window: Duration::minutes(5),
            start_time: t,
            end_time: t,
            evidence: vec![],
        }
    }

    fn fail_then_success(user: &str, fail_count: usize) -> Incident {
        Incident::FailThenSuccess {
            username: user.to_string(),
            fail_count,
            ips: vec![],
            window: Duration::minutes(5),
            success_time: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
            evidence: vec![],
        }
    }

    fn account(user: &str, count: usize) -> Incident {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        Incident::AccountBruteForce {
            username: user.to_string(),
            count,
            ip_count: 3,
            ips: vec![],
            window: Duration::minutes(5),
            start_time: t,
            end_time: t,
            evidence: vec![],
        }
    }

    #[test]
    fn test_score_formula() {
        // HIGH 60 + FAIL_THEN_SUCCESS 25 + 3*1
        assert_eq!(risk_score(&fail_then_success("bob", 1)), 88);
        // HIGH 60, no type bonus, no volume field
        assert_eq!(risk_score(&spray("10.0.0.1", 12)), 60);
        // CRITICAL 90 + 10 + 6, capped
        assert_eq!(risk_score(&brute_force("10.0.0.1", 2)), 100);
    }

    #[test]
    fn test_score_bounded() {
        for count in [0, 1, 5, 10, 11, 1000, usize::MAX] {
            for incident in [
                brute_force("a", count),
                account("a", count),
                spray("a", count),
                fail_then_success("a", count),
            ] {
                assert!(risk_score(&incident) <= MAX_RISK_SCORE);
            }
        }
    }

    #[test]
    fn test_count_boost_caps_at_thirty() {
        assert_eq!(risk_score(&fail_then_success("a", 4)), 97);
        assert_eq!(risk_score(&fail_then_success("a", 10)), 100);
        assert_eq!(risk_score(&fail_then_success("a", 0)), 85);
    }

    #[test]
    fn test_sorted_descending() {
        let enriched = enrich(vec![
            spray("10.0.0.9", 4),
            fail_then_success("bob", 1),
            brute_force("10.0.0.5", 6),
        ]);
        let scores: Vec<u8> = enriched.iter().map(|e| e.risk_score()).collect();
        assert_eq!(scores, vec![100, 88, 60]);
        assert_eq!(enriched[2].incident().incident_type(), IncidentType::IpMultiAccount);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let enriched = enrich(vec![
            spray("first", 3),
            brute_force("a", 9),
            spray("second", 3),
            account("b", 9),
            spray("third", 3),
        ]);
        let subjects: Vec<&str> = enriched.iter().map(|e| e.incident().subject()).collect();
        assert_eq!(subjects, vec!["a", "b", "first", "second", "third"]);
    }

    #[test]
    fn test_enrichment_is_idempotent() {
        let input = vec![
            spray("x", 3),
            fail_then_success("u", 2),
            spray("y", 3),
            brute_force("z", 5),
        ];
        let once = enrich(input.clone());
        let twice = enrich(once.iter().map(|e| e.incident().clone()));
        assert_eq!(once, enrich(input));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_enrich_all_concatenates() {
        let enriched = enrich_all(vec![
            vec![brute_force("a", 5)],
            vec![],
            vec![fail_then_success("b", 1), spray("c", 3)],
        ]);
        assert_eq!(enriched.len(), 3);
        assert_eq!(enriched[0].severity(), Severity::Critical);
    }

    #[test]
    fn test_empty_input() {
        assert!(enrich(Vec::<Incident>::new()).is_empty());
        assert!(enrich_all(Vec::new()).is_empty());
    }

    #[test]
    fn test_risk_levels() {
        assert_eq!(RiskLevel::from_score(100), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(70), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(69), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(40), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(39), RiskLevel::Low);
    }
}
