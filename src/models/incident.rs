use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Incident severity, fixed per incident type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        };
        write!(f, "{}", s)
    }
}

/// Discriminant of [`Incident`], handy for counting and lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentType {
    BruteForce,
    AccountBruteForce,
    IpMultiAccount,
    FailThenSuccess,
}

impl IncidentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentType::BruteForce => "BRUTE_FORCE",
            IncidentType::AccountBruteForce => "ACCOUNT_BRUTE_FORCE",
            IncidentType::IpMultiAccount => "IP_MULTI_ACCOUNT",
            IncidentType::FailThenSuccess => "FAIL_THEN_SUCCESS",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            IncidentType::BruteForce | IncidentType::AccountBruteForce => Severity::Critical,
            IncidentType::IpMultiAccount | IncidentType::FailThenSuccess => Severity::High,
        }
    }
}

impl fmt::Display for IncidentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected credential attack pattern
///
/// One variant per detector. Every variant carries the window the detector
/// ran with and a capped sample of raw lines as evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Incident {
    /// Many failed logins from one IP
    BruteForce {
        ip: String,
        count: usize,
        #[serde(rename = "window_seconds", with = "window_seconds")]
        window: Duration,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        evidence: Vec<String>,
    },
    /// Many failed logins against one account from several IPs
    AccountBruteForce {
        username: String,
        count: usize,
        ip_count: usize,
        ips: Vec<String>,
        #[serde(rename = "window_seconds", with = "window_seconds")]
        window: Duration,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        evidence: Vec<String>,
    },
    /// One IP failing against many accounts (credential spray)
    IpMultiAccount {
        ip: String,
        user_count: usize,
        users: Vec<String>,
        #[serde(rename = "window_seconds", with = "window_seconds")]
        window: Duration,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        evidence: Vec<String>,
    },
    /// Failed logins followed by a successful one for the same account
    FailThenSuccess {
        username: String,
        fail_count: usize,
        ips: Vec<String>,
        #[serde(rename = "window_seconds", with = "window_seconds")]
        window: Duration,
        success_time: DateTime<Utc>,
        evidence: Vec<String>,
    },
}

impl Incident {
    pub fn incident_type(&self) -> IncidentType {
        match self {
            Incident::BruteForce { .. } => IncidentType::BruteForce,
            Incident::AccountBruteForce { .. } => IncidentType::AccountBruteForce,
            Incident::IpMultiAccount { .. } => IncidentType::IpMultiAccount,
            Incident::FailThenSuccess { .. } => IncidentType::FailThenSuccess,
        }
    }

    pub fn severity(&self) -> Severity {
        self.incident_type().severity()
    }

    /// Primary volume figure: `count`, else `fail_count`, else 0
    pub fn volume(&self) -> usize {
        match self {
            Incident::BruteForce { count, .. } | Incident::AccountBruteForce { count, .. } => *count,
            Incident::FailThenSuccess { fail_count, .. } => *fail_count,
            Incident::IpMultiAccount { .. } => 0,
        }
    }

    /// The grouping key the incident was raised for (an IP or a username)
    pub fn subject(&self) -> &str {
        match self {
            Incident::BruteForce { ip, .. } | Incident::IpMultiAccount { ip, .. } => ip,
            Incident::AccountBruteForce { username, .. }
            | Incident::FailThenSuccess { username, .. } => username,
        }
    }

    pub fn window(&self) -> Duration {
        match self {
            Incident::BruteForce { window, .. }
            | Incident::AccountBruteForce { window, .. }
            | Incident::IpMultiAccount { window, .. }
            | Incident::FailThenSuccess { window, .. } => *window,
        }
    }

    pub fn evidence(&self) -> &[String] {
        match self {
            Incident::BruteForce { evidence, .. }
            | Incident::AccountBruteForce { evidence, .. }
            | Incident::IpMultiAccount { evidence, .. }
            | Incident::FailThenSuccess { evidence, .. } => evidence,
        }
    }

    /// Human readable one-line summary
    pub fn describe(&self) -> String {
        match self {
            Incident::BruteForce { ip, count, window, .. } => format!(
                "IP {} produced {} failed logins within {}s",
                ip,
                count,
                window.num_seconds()
            ),
            Incident::AccountBruteForce { username, count, ip_count, window, .. } => format!(
                "Account '{}' had {} failed logins from {} IPs within {}s",
                username,
                count,
                ip_count,
                window.num_seconds()
            ),
            Incident::IpMultiAccount { ip, user_count, window, .. } => format!(
                "IP {} failed against {} accounts within {}s",
                ip,
                user_count,
                window.num_seconds()
            ),
            Incident::FailThenSuccess { username, fail_count, window, .. } => format!(
                "Account '{}' logged in after {} failed attempts within {}s",
                username,
                fail_count,
                window.num_seconds()
            ),
        }
    }
}

/// An incident with its risk score attached
///
/// Only produced by the enrichment stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedIncident {
    #[serde(flatten)]
    incident: Incident,
    severity: Severity,
    risk_score: u8,
}

impl EnrichedIncident {
    pub(crate) fn new(incident: Incident, risk_score: u8) -> Self {
        EnrichedIncident {
            severity: incident.severity(),
            incident,
            risk_score,
        }
    }

    pub fn incident(&self) -> &Incident {
        &self.incident
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn risk_score(&self) -> u8 {
        self.risk_score
    }
}

mod window_seconds {
    use chrono::Duration;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(window: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(window.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(deserializer)?;
        Duration::try_seconds(secs)
            .ok_or_else(|| D::Error::custom(format!("window of {} seconds is out of range", secs)))
    }
}
