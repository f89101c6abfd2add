use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::enrichment::RiskLevel;
use crate::models::{AuthEvent, EnrichedIncident};

/// How many source IPs the report lists
const TOP_IPS: usize = 3;

/// Incident counts per risk bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RiskBuckets {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl RiskBuckets {
    fn add(&mut self, score: u8) {
        match RiskLevel::from_score(score) {
            RiskLevel::High => self.high += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::Low => self.low += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total_events: usize,
    pub total_incidents: usize,
    pub risk_buckets: RiskBuckets,
    pub by_type: BTreeMap<&'static str, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpCount {
    pub ip: String,
    pub events: usize,
}

/// Everything handed to the export layer for one run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub summary: Summary,
    pub top_ips: Vec<IpCount>,
    pub incidents: Vec<EnrichedIncident>,
}

impl Report {
    pub fn build(events: &[AuthEvent], incidents: Vec<EnrichedIncident>) -> Self {
        let mut risk_buckets = RiskBuckets::default();
        let mut by_type = BTreeMap::new();
        for incident in &incidents {
            risk_buckets.add(incident.risk_score());
            *by_type.entry(incident.incident().incident_type().as_str()).or_insert(0) += 1;
        }

        Report {
            summary: Summary {
                total_events: events.len(),
                total_incidents: incidents.len(),
                risk_buckets,
                by_type,
            },
            top_ips: top_ips(events, TOP_IPS),
            incidents,
        }
    }
}

/// Most frequent source IPs; ties keep first-seen order
fn top_ips(events: &[AuthEvent], limit: usize) -> Vec<IpCount> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<IpCount> = Vec::new();

    for ip in events.iter().filter_map(|e| e.ip()) {
        let slot = *index.entry(ip).or_insert_with(|| {
            counts.push(IpCount { ip: ip.to_string(), events: 0 });
            counts.len() - 1
        });
        counts[slot].events += 1;
    }

    counts.sort_by(|a, b| b.events.cmp(&a.events));
    counts.truncate(limit);
    counts
}
