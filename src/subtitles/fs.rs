use std::path::{Path, PathBuf};

use super::SubtitleStore;
use crate::video::VideoId;
use crate::SummarizerError;

/// Subtitle artifacts stored as plain files in one directory
pub struct FsSubtitleStore {
    dir: PathBuf,
    preferred: Vec<String>,
}

impl FsSubtitleStore {
    pub fn new(dir: impl Into<PathBuf>, preferred: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            preferred,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SubtitleStore for FsSubtitleStore {
    fn output_template(&self) -> String {
        self.dir.join("%(id)s.%(ext)s").to_string_lossy().into_owned()
    }

    fn preferred_languages(&self) -> &[String] {
        &self.preferred
    }

    fn entries(&self, video_id: &VideoId) -> Result<Vec<String>, SummarizerError> {
        let prefix = format!("{}.", video_id);
        let mut names = Vec::new();

        for entry in fs_err::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with(&prefix) {
                    names.push(name.to_string());
                }
            }
        }

        Ok(names)
    }

    fn read(&self, name: &str) -> Result<String, SummarizerError> {
        let bytes = fs_err::read(self.dir.join(name))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn remove(&self, name: &str) -> Result<(), SummarizerError> {
        fs_err::remove_file(self.dir.join(name))?;
        Ok(())
    }
}
