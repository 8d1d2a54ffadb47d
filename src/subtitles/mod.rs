use tracing::{debug, info, warn};

use crate::video::VideoId;
use crate::SummarizerError;

pub mod fs;
pub mod memory;
pub mod srt;

pub use fs::FsSubtitleStore;
pub use memory::MemorySubtitleStore;
pub use srt::flatten_srt;

/// Subtitle format requested from yt-dlp and expected on disk
pub const SUBTITLE_EXT: &str = "srt";

/// Suffix yt-dlp uses for files that are still being written
const PARTIAL_SUFFIX: &str = ".part";

/// Cache of subtitle artifacts named `{video_id}.{lang}.{ext}`.
///
/// Implementors only provide the raw file primitives; lookup, language preference
/// and cleanup are shared so every backend behaves the same way.
pub trait SubtitleStore: Send + Sync {
    /// yt-dlp `--output` template that makes artifacts land in this store
    fn output_template(&self) -> String;

    /// Language tags preferred when several artifacts exist, most wanted first
    fn preferred_languages(&self) -> &[String];

    /// Names of all entries starting with `{video_id}.`
    fn entries(&self, video_id: &VideoId) -> Result<Vec<String>, SummarizerError>;

    /// Raw contents of a single entry
    fn read(&self, name: &str) -> Result<String, SummarizerError>;

    /// Delete a single entry
    fn remove(&self, name: &str) -> Result<(), SummarizerError>;

    /// Load and flatten the preferred artifact for a video.
    ///
    /// Fails with `NoSubtitles` when nothing was downloaded and `EmptyTranscript`
    /// when the chosen file flattens to nothing.
    fn load(&self, video_id: &VideoId) -> Result<String, SummarizerError> {
        let mut candidates: Vec<String> = self
            .entries(video_id)?
            .into_iter()
            .filter(|name| artifact_language(name, video_id).is_some())
            .collect();

        if candidates.is_empty() {
            return Err(SummarizerError::NoSubtitles);
        }

        candidates.sort();
        let chosen = choose_artifact(&candidates, video_id, self.preferred_languages());
        debug!(video_id = %video_id, file = %chosen, "reading subtitles");

        let transcript = flatten_srt(&self.read(chosen)?);
        if transcript.is_empty() {
            return Err(SummarizerError::EmptyTranscript);
        }

        Ok(transcript)
    }

    /// Transcript from an artifact left by an earlier download, if it has any text
    fn find_existing(&self, video_id: &VideoId) -> Option<String> {
        match self.load(video_id) {
            Ok(transcript) => Some(transcript),
            Err(SummarizerError::NoSubtitles) | Err(SummarizerError::EmptyTranscript) => None,
            Err(e) => {
                warn!(video_id = %video_id, error = %e, "failed to read existing subtitles");
                None
            }
        }
    }

    /// Remove every artifact of a video, including partial downloads.
    ///
    /// Best effort: failures are logged and the number of removed files is returned.
    fn clean_up(&self, video_id: &VideoId) -> usize {
        let entries = match self.entries(video_id) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(video_id = %video_id, error = %e, "failed to list subtitle files");
                return 0;
            }
        };

        let mut removed = 0;
        for name in entries.iter().filter(|name| is_artifact(name, video_id)) {
            match self.remove(name) {
                Ok(()) => {
                    info!(file = %name, "removed subtitle file");
                    removed += 1;
                }
                Err(e) => warn!(file = %name, error = %e, "failed to remove subtitle file"),
            }
        }
        removed
    }
}

/// File name for an artifact of the given language
pub fn artifact_name(video_id: &VideoId, lang: &str) -> String {
    format!("{}.{}.{}", video_id, lang, SUBTITLE_EXT)
}

/// Language part of a complete artifact name, `None` for anything else
pub fn artifact_language<'a>(name: &'a str, video_id: &VideoId) -> Option<&'a str> {
    let rest = name.strip_prefix(video_id.as_str())?.strip_prefix('.')?;
    let lang = rest.strip_suffix(SUBTITLE_EXT)?.strip_suffix('.')?;
    if lang.is_empty() {
        None
    } else {
        Some(lang)
    }
}

/// Complete or partially written artifact of this video
fn is_artifact(name: &str, video_id: &VideoId) -> bool {
    let complete = name.strip_suffix(PARTIAL_SUFFIX).unwrap_or(name);
    artifact_language(complete, video_id).is_some()
}

/// Whether an artifact language (`ru`, `ru-RU`, `en-orig`) belongs to a tag
fn language_matches(lang: &str, preferred: &str) -> bool {
    let lang = lang.to_lowercase();
    let preferred = preferred.to_lowercase();
    lang == preferred || lang.starts_with(&format!("{}-", preferred))
}

/// Pick the artifact of the most preferred language, else the first by name.
///
/// `candidates` must be sorted and non-empty.
fn choose_artifact<'a>(candidates: &'a [String], video_id: &VideoId, preferred: &[String]) -> &'a str {
    preferred
        .iter()
        .find_map(|wanted| {
            candidates.iter().find(|name| {
                artifact_language(name, video_id)
                    .map(|lang| language_matches(lang, wanted))
                    .unwrap_or(false)
            })
        })
        .unwrap_or(&candidates[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRT: &str = "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n2\n00:00:02,000 --> 00:00:03,000\nworld\n";

    fn video() -> VideoId {
        VideoId::new("abc123").unwrap()
    }

    fn store() -> MemorySubtitleStore {
        MemorySubtitleStore::new(vec!["ru".to_string(), "en".to_string()])
    }

    #[test]
    fn test_artifact_language() {
        let id = video();
        assert_eq!(artifact_language("abc123.ru.srt", &id), Some("ru"));
        assert_eq!(artifact_language("abc123.en-US.srt", &id), Some("en-US"));
        assert_eq!(artifact_language("abc123.srt", &id), None);
        assert_eq!(artifact_language("abc123.ru.vtt", &id), None);
        assert_eq!(artifact_language("abc1234.ru.srt", &id), None);
        assert_eq!(artifact_language("abc123.ru.srt.part", &id), None);
    }

    #[test]
    fn test_is_artifact_includes_partial_files() {
        let id = video();
        assert!(is_artifact("abc123.ru.srt", &id));
        assert!(is_artifact("abc123.ru.srt.part", &id));
        assert!(!is_artifact("abc123.info.json", &id));
    }

    #[test]
    fn test_prefers_primary_language() {
        let store = store();
        store.insert("abc123.de.srt", "1\n00:00:01,000 --> 00:00:02,000\nHallo\n");
        store.insert("abc123.en.srt", "1\n00:00:01,000 --> 00:00:02,000\nHello\n");
        store.insert("abc123.ru-RU.srt", "1\n00:00:01,000 --> 00:00:02,000\nПривет\n");

        assert_eq!(store.load(&video()).unwrap(), "Привет");
    }

    #[test]
    fn test_falls_back_to_secondary_then_first() {
        let store = store();
        store.insert("abc123.en-GB.srt", "1\n00:00:01,000 --> 00:00:02,000\nHello\n");
        store.insert("abc123.de.srt", "1\n00:00:01,000 --> 00:00:02,000\nHallo\n");
        assert_eq!(store.load(&video()).unwrap(), "Hello");

        let store = self::store();
        store.insert("abc123.fr.srt", "1\n00:00:01,000 --> 00:00:02,000\nBonjour\n");
        store.insert("abc123.de.srt", "1\n00:00:01,000 --> 00:00:02,000\nHallo\n");
        assert_eq!(store.load(&video()).unwrap(), "Hallo");
    }

    #[test]
    fn test_load_missing_and_empty() {
        let store = store();
        assert!(matches!(store.load(&video()), Err(SummarizerError::NoSubtitles)));

        store.insert("abc123.ru.srt", "1\n00:00:01,000 --> 00:00:02,000\n\n");
        assert!(matches!(store.load(&video()), Err(SummarizerError::EmptyTranscript)));
    }

    #[test]
    fn test_find_existing_treats_empty_as_missing() {
        let store = store();
        assert_eq!(store.find_existing(&video()), None);

        store.insert("abc123.ru.srt", "\n\n");
        assert_eq!(store.find_existing(&video()), None);

        store.insert("abc123.ru.srt", SRT);
        assert_eq!(store.find_existing(&video()).as_deref(), Some("Hello world"));
    }

    #[test]
    fn test_clean_up_removes_only_this_video() {
        let store = store();
        store.insert("abc123.ru.srt", SRT);
        store.insert("abc123.en.srt", SRT);
        store.insert("abc123.en.srt.part", "");
        store.insert("other.ru.srt", SRT);

        assert_eq!(store.clean_up(&video()), 3);
        assert_eq!(store.names(), vec!["other.ru.srt".to_string()]);
        assert_eq!(store.clean_up(&video()), 0);
    }
}
