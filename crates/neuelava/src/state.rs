use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use renderer::SessionSummary;
use serde::{Deserialize, Serialize};

/// What the last session left behind, stored as `state.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppState {
    pub last_mask: Option<usize>,
    pub theme: Option<String>,
    /// RFC 3339 timestamp of the most recent export.
    pub last_export: Option<String>,
}

impl AppState {
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read state file at {}", path.display()))?;
            let state: Self = toml::from_str(&contents)
                .with_context(|| format!("failed to parse state file at {}", path.display()))?;
            Ok(state)
        } else {
            Ok(Self::default())
        }
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        let dir = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("state path has no parent: {}", path.display()))?;
        fs::create_dir_all(dir).with_context(|| {
            format!(
                "failed to prepare directory for state file at {}",
                dir.display()
            )
        })?;
        let serialized = toml::to_string_pretty(self)
            .with_context(|| "failed to serialize state file to TOML".to_string())?;
        fs::write(path, serialized)
            .with_context(|| format!("failed to write state file to {}", path.display()))?;
        Ok(())
    }

    /// Folds a finished session in. Returns whether anything changed.
    pub fn record_session(&mut self, summary: &SessionSummary, now: chrono::DateTime<chrono::Utc>) -> bool {
        let previous = self.clone();
        self.last_mask = Some(summary.mask_index);
        if summary.theme.is_some() {
            self.theme = summary.theme.clone();
        }
        if !summary.exports.is_empty() {
            self.record_export(now);
        }
        *self != previous
    }

    pub fn record_export(&mut self, now: chrono::DateTime<chrono::Utc>) {
        self.last_export = Some(now.to_rfc3339());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let state = AppState::load_or_default(&dir.path().join("state.toml")).unwrap();
        assert_eq!(state, AppState::default());
    }

    #[test]
    fn persists_and_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/state.toml");
        let state = AppState {
            last_mask: Some(4),
            theme: Some("Cool".into()),
            last_export: None,
        };
        state.persist(&path).unwrap();
        assert_eq!(AppState::load_or_default(&path).unwrap(), state);
    }

    #[test]
    fn records_sessions() {
        let now = chrono::Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let mut state = AppState::default();
        let summary = SessionSummary {
            mask_index: 3,
            theme: Some("Warm".into()),
            exports: vec![PathBuf::from("neue-lava-1.png")],
        };
        assert!(state.record_session(&summary, now));
        assert_eq!(state.last_mask, Some(3));
        assert_eq!(state.theme.as_deref(), Some("Warm"));
        assert_eq!(state.last_export.as_deref(), Some("2025-03-01T12:00:00+00:00"));
        assert!(!state.record_session(&summary, now));
    }

    #[test]
    fn rejects_corrupt_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.toml");
        std::fs::write(&path, "last_mask = \"three\"").unwrap();
        assert!(AppState::load_or_default(&path).is_err());
    }
}
