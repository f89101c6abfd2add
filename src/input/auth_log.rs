use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use regex::Regex;
use std::net::IpAddr;
use std::path::Path;

use super::ParseError;
use crate::models::{AuthEvent, AuthStatus};

/// Lower-cased fragments marking a failed attempt
///
/// Only the line that closes an attempt counts. The `Invalid user`,
/// `Connection closed by invalid user` and pam_unix `authentication failure`
/// lines sshd writes around the same attempt stay `Other`.
const FAIL_MARKERS: &[&str] = &["failed password", "failed login", "failed publickey"];

/// Lower-cased fragments marking a successful login
const SUCCESS_MARKERS: &[&str] = &["accepted"];

/// Parses auth.log style lines into [`AuthEvent`]s
///
/// Understands the classic syslog prefix (`Jan  7 11:48:14 host sshd[1]: ...`)
/// and RFC 3339 prefixed lines (`2024-01-07T11:48:14+00:00 host ...`).
/// Syslog timestamps carry no year, so one is injected.
pub struct AuthLogParser {
    year: i32,
    ipv4: Regex,
    address_hint: Regex,
    user_patterns: Vec<Regex>,
}

impl AuthLogParser {
    pub fn new(year: i32) -> Result<Self, ParseError> {
        Ok(AuthLogParser {
            year,
            ipv4: Regex::new(r"\b(\d{1,3}(?:\.\d{1,3}){3})\b")?,
            address_hint: Regex::new(r"(?:\bfrom|\brhost=)\s*([0-9A-Fa-f:.]+)")?,
            user_patterns: vec![
                Regex::new(r"(?i)\binvalid user (\S+)")?,
                Regex::new(r"\bfor (\S+) from\b")?,
                Regex::new(r"\buser=(\S+)")?,
                Regex::new(r"\bfor (\S+)")?,
            ],
        })
    }

    /// Parser that assumes the current year for syslog timestamps
    pub fn with_current_year() -> Result<Self, ParseError> {
        Self::new(Utc::now().year())
    }

    /// Parse a single line
    pub fn parse_line(&self, line: &str) -> Result<AuthEvent, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ParseError::EmptyLine);
        }

        let timestamp = self
            .parse_timestamp(line)
            .ok_or_else(|| ParseError::MissingTimestamp(line.to_string()))?;

        let mut event = AuthEvent::new(timestamp, classify(line), line);
        event.ip = self.extract_ip(line);
        event.username = self.extract_user(line);
        Ok(event)
    }

    /// Parse every line of `content`, dropping lines that cannot be used
    pub fn parse_str(&self, content: &str) -> Vec<AuthEvent> {
        let mut events = Vec::new();
        let mut skipped = 0usize;

        for line in content.lines() {
            match self.parse_line(line) {
                Ok(event) => events.push(event),
                Err(ParseError::EmptyLine) => {}
                Err(e) => {
                    skipped += 1;
                    log::debug!("Skipping line: {}", e);
                }
            }
        }

        if skipped > 0 {
            log::info!("Skipped {} line(s) without a usable timestamp", skipped);
        }
        events
    }

    /// Read and parse a whole log file
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    pub fn parse_file(&self, path: &Path) -> Result<Vec<AuthEvent>, ParseError> {
        let bytes = std::fs::read(path)?;
        let content = String::from_utf8_lossy(&bytes);
        let events = self.parse_str(&content);
        log::info!("Parsed {} auth event(s) from {:?}", events.len(), path);
        Ok(events)
    }

    fn parse_timestamp(&self, line: &str) -> Option<DateTime<Utc>> {
        let mut parts = line.split_whitespace();
        let first = parts.next()?;

        if let Ok(ts) = DateTime::parse_from_rfc3339(first) {
            return Some(ts.with_timezone(&Utc));
        }

        // "Jan  7 11:48:14" -> "2024 Jan 7 11:48:14"
        let day = parts.next()?;
        let time = parts.next()?;
        let full = format!("{} {} {} {}", self.year, first, day, time);
        NaiveDateTime::parse_from_str(&full, "%Y %b %d %H:%M:%S")
            .ok()
            .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
    }

    fn extract_ip(&self, line: &str) -> Option<String> {
        let v4 = self
            .ipv4
            .captures_iter(line)
            .filter_map(|c| c.get(1))
            .find(|m| m.as_str().parse::<IpAddr>().is_ok());
        if let Some(m) = v4 {
            return Some(m.as_str().to_string());
        }

        self.address_hint
            .captures_iter(line)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim_end_matches(|c: char| c == '.' || c == ':'))
            .find(|s| s.parse::<IpAddr>().is_ok())
            .map(str::to_string)
    }

    fn extract_user(&self, line: &str) -> Option<String> {
        self.user_patterns
            .iter()
            .filter_map(|re| re.captures(line))
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim_end_matches(|c: char| c == ',' || c == ';'))
            .find(|user| !user.is_empty() && *user != "from")
            .map(str::to_string)
    }
}

fn classify(line: &str) -> AuthStatus {
    let lower = line.to_lowercase();
    if FAIL_MARKERS.iter().any(|m| lower.contains(*m)) {
        AuthStatus::Fail
    } else if SUCCESS_MARKERS.iter().any(|m| lower.contains(*m)) {
        AuthStatus::Success
    } else {
        AuthStatus::Other
    }
}
