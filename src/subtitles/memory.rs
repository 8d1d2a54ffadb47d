use std::collections::BTreeMap;
use std::io;
use std::sync::{Mutex, MutexGuard};

use super::{artifact_name, SubtitleStore};
use crate::video::VideoId;
use crate::SummarizerError;

/// In-memory subtitle store, used where touching the filesystem is unwanted
#[derive(Default)]
pub struct MemorySubtitleStore {
    files: Mutex<BTreeMap<String, String>>,
    preferred: Vec<String>,
}

impl MemorySubtitleStore {
    pub fn new(preferred: Vec<String>) -> Self {
        Self {
            files: Mutex::new(BTreeMap::new()),
            preferred,
        }
    }

    /// Add or replace an entry by file name
    pub fn insert(&self, name: &str, contents: &str) {
        self.files().insert(name.to_string(), contents.to_string());
    }

    /// Add an artifact using the on-disk naming convention
    pub fn insert_artifact(&self, video_id: &VideoId, lang: &str, contents: &str) {
        self.insert(&artifact_name(video_id, lang), contents);
    }

    /// All stored names in order
    pub fn names(&self) -> Vec<String> {
        self.files().keys().cloned().collect()
    }

    fn files(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SubtitleStore for MemorySubtitleStore {
    fn output_template(&self) -> String {
        "%(id)s.%(ext)s".to_string()
    }

    fn preferred_languages(&self) -> &[String] {
        &self.preferred
    }

    fn entries(&self, video_id: &VideoId) -> Result<Vec<String>, SummarizerError> {
        let prefix = format!("{}.", video_id);
        Ok(self
            .files()
            .keys()
            .filter(|name| name.starts_with(&prefix))
            .cloned()
            .collect())
    }

    fn read(&self, name: &str) -> Result<String, SummarizerError> {
        self.files()
            .get(name)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, name.to_string()).into())
    }

    fn remove(&self, name: &str) -> Result<(), SummarizerError> {
        self.files()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, name.to_string()).into())
    }
}
