pub mod event;
pub mod incident;

pub use event::{AuthEvent, AuthStatus};
pub use incident::{EnrichedIncident, Incident, IncidentType, Severity};
