// src/pipeline/artifact.rs

//! Artifact name templates.

use crate::models::FetchAttempt;

const TIMESTAMP: &str = "{timestamp}";
const ID: &str = "{id}";

/// Derives a destination name for each attempt from a template.
///
/// `{timestamp}` expands to the attempt start time (`%Y%m%dT%H%M%SZ`, UTC)
/// and `{id}` to its correlation ID. Templates without placeholders name a
/// fixed artifact, which the store will refuse to commit twice.
#[derive(Debug, Clone)]
pub struct ArtifactNamer {
    template: String,
}

impl ArtifactNamer {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn is_fixed(&self) -> bool {
        !self.template.contains(TIMESTAMP) && !self.template.contains(ID)
    }

    pub fn name_for(&self, attempt: &FetchAttempt) -> String {
        self.template
            .replace(
                TIMESTAMP,
                &attempt.started_at.format("%Y%m%dT%H%M%SZ").to_string(),
            )
            .replace(ID, &attempt.id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceDescriptor;
    use chrono::TimeZone;

    fn attempt() -> FetchAttempt {
        let mut attempt =
            FetchAttempt::begin(SourceDescriptor::parse("file:///tmp/x").unwrap()).unwrap();
        attempt.started_at = chrono::Utc.with_ymd_and_hms(2026, 3, 7, 9, 5, 1).unwrap();
        attempt
    }

    #[test]
    fn test_timestamp_placeholder() {
        let namer = ArtifactNamer::new("{timestamp}.blob");
        assert_eq!(namer.name_for(&attempt()), "20260307T090501Z.blob");
        assert!(!namer.is_fixed());
    }

    #[test]
    fn test_id_placeholder() {
        let attempt = attempt();
        let namer = ArtifactNamer::new("feed-{id}.json");
        assert_eq!(namer.name_for(&attempt), format!("feed-{}.json", attempt.id));
    }

    #[test]
    fn test_fixed_name() {
        let namer = ArtifactNamer::new("testname.blob");
        assert!(namer.is_fixed());
        assert_eq!(namer.name_for(&attempt()), "testname.blob");
    }
}
