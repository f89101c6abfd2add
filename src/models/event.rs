use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a single authentication attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    Fail,
    Success,
    Other,
}

impl AuthStatus {
    pub fn is_fail(self) -> bool {
        self == AuthStatus::Fail
    }

    pub fn is_success(self) -> bool {
        self == AuthStatus::Success
    }
}

/// A parsed authentication event
///
/// `username` may legitimately be `"unknown"`, which is a distinct value
/// from `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthEvent {
    pub timestamp: DateTime<Utc>,
    pub ip: Option<String>,
    pub username: Option<String>,
    pub status: AuthStatus,
    /// Source log line, kept verbatim for evidence
    pub raw: String,
}

impl AuthEvent {
    pub fn new(timestamp: DateTime<Utc>, status: AuthStatus, raw: impl Into<String>) -> Self {
        AuthEvent {
            timestamp,
            ip: None,
            username: None,
            status,
            raw: raw.into(),
        }
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn ip(&self) -> Option<&str> {
        self.ip.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }
}
