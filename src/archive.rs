use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::storage::{KeyValueStore, ARCHIVE};

/// A saved summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub id: String,
    pub summary: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

pub fn decode(raw: &str) -> Result<Vec<ArchiveEntry>> {
    Ok(serde_json::from_str(raw)?)
}

pub fn encode(entries: &[ArchiveEntry]) -> Result<String> {
    Ok(serde_json::to_string(entries)?)
}

/// Saved summaries, most recent first.
///
/// Every mutation rewrites the whole list under the archive key; the
/// in-memory list only changes once that write succeeded.
pub struct ArchiveStore {
    store: Arc<dyn KeyValueStore>,
    entries: Vec<ArchiveEntry>,
}

impl ArchiveStore {
    /// Loads the archive. A value that fails to parse is logged and replaced by an empty archive.
    pub fn open(store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let entries = match store.get(ARCHIVE)? {
            Some(raw) => decode(&raw).unwrap_or_else(|e| {
                error!(error = %e, "Failed to parse saved archive, starting empty");
                Vec::new()
            }),
            None => Vec::new(),
        };
        info!(entries = entries.len(), "Archive loaded");
        Ok(Self { store, entries })
    }

    pub fn list(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn new_id(&self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    pub fn add(&mut self, summary: &str, url: &str) -> Result<ArchiveEntry> {
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(AppError::ValidationError("Cannot archive an empty summary".into()));
        }

        let entry = ArchiveEntry {
            id: self.new_id(),
            summary: summary.to_string(),
            url: url.trim().to_string(),
            timestamp: Utc::now(),
        };

        let mut updated = Vec::with_capacity(self.entries.len() + 1);
        updated.push(entry.clone());
        updated.extend(self.entries.iter().cloned());
        self.commit(updated)?;

        info!(id = entry.id.as_str(), "Summary archived");
        Ok(entry)
    }

    /// Removes the entry with `id`; returns whether one was removed.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let updated: Vec<ArchiveEntry> = self.entries.iter().filter(|e| e.id != id).cloned().collect();
        let removed = updated.len() != self.entries.len();
        self.commit(updated)?;

        if removed {
            info!(id, "Summary removed from archive");
        }
        Ok(removed)
    }

    fn commit(&mut self, entries: Vec<ArchiveEntry>) -> Result<()> {
        self.store.set(ARCHIVE, &encode(&entries)?)?;
        self.entries = entries;
        Ok(())
    }
}
