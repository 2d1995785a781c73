//! JSON-file-backed profile/tracking source.
//!
//! A single document with a `profiles` list and a `tracking` list stands
//! in for the external system of record during local operation and tests.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::{ProfileRef, ProfileState};
use crate::error::{CadenceError, Result};
use crate::sources::{ProfileSource, StateSource};

#[derive(Debug, Default, Serialize, Deserialize)]
struct SourceDocument {
    #[serde(default)]
    profiles: Vec<ProfileRef>,
    #[serde(default)]
    tracking: Vec<ProfileState>,
}

/// File-backed implementation of both collaborator traits.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_document(&self) -> Result<SourceDocument> {
        let raw = fs::read_to_string(&self.path).map_err(|e| {
            CadenceError::Source(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| CadenceError::Source(format!("malformed source file {}: {}", self.path.display(), e)))
    }

    fn write_document(&self, document: &SourceDocument) -> Result<()> {
        let body = serde_json::to_string_pretty(document)?;
        fs::write(&self.path, body).map_err(|e| {
            CadenceError::Source(format!("failed to write {}: {}", self.path.display(), e))
        })
    }
}

impl ProfileSource for FileSource {
    fn list_profiles(&self) -> Result<Vec<ProfileRef>> {
        let document = self.read_document()?;
        Ok(document.profiles.into_iter().filter(|p| !p.id.is_empty()).collect())
    }
}

impl StateSource for FileSource {
    fn initialize_tracking(&self) -> Result<()> {
        let mut document = self.read_document()?;
        let tracked: std::collections::HashSet<String> =
            document.tracking.iter().map(|s| s.id.clone()).collect();
        let mut added = 0;
        for profile in &document.profiles {
            if profile.id.is_empty() || tracked.contains(&profile.id) {
                continue;
            }
            document.tracking.push(ProfileState {
                id: profile.id.clone(),
                name: profile.name.clone(),
                last_engaged: None,
                status: "active".to_string(),
                consecutive_skips: 0,
            });
            added += 1;
        }
        if added > 0 {
            self.write_document(&document)?;
            tracing::info!(added, "seeded tracking records for new profiles");
        }
        Ok(())
    }

    fn tracked_states(&self) -> Result<Vec<ProfileState>> {
        Ok(self.read_document()?.tracking)
    }
}
