//! Summary of a batch run.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::PlaceOutcome;

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub succeeded: usize,
    pub failed: usize,
    pub places: Vec<PlaceOutcome>,
}

impl BatchReport {
    pub fn new(
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        places: Vec<PlaceOutcome>,
    ) -> Self {
        let succeeded = places.iter().filter(|p| p.is_success()).count();
        Self {
            started_at,
            finished_at,
            succeeded,
            failed: places.len() - succeeded,
            places,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &PlaceOutcome> {
        self.places.iter().filter(|p| !p.is_success())
    }

    /// Find a place's outcome by display name
    pub fn get(&self, display_name: &str) -> Option<&PlaceOutcome> {
        self.places.iter().find(|p| p.display_name == display_name)
    }

    /// Write the report as pretty-printed JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineError;
    use std::path::PathBuf;

    #[test]
    fn test_counts_and_json() {
        let failed = PlaceOutcome::failure(
            "Lot",
            &PipelineError::MissingMiddleAsset(PathBuf::from("inputs/fond.png")),
        );
        let now = Utc::now();
        let report = BatchReport::new(now, now, vec![failed]);

        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures().count(), 1);
        assert!(report.get("Lot").is_some());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        report.write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["failed"], 1);
        assert_eq!(value["places"][0]["display_name"], "Lot");
        assert_eq!(value["places"][0]["status"], "failed");
        assert_eq!(value["places"][0]["kind"], "missing_middle_asset");
    }
}
