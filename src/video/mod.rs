use std::fmt;

use url::Url;

use crate::SummarizerError;

/// Hosts that serve the regular watch page
const WATCH_HOSTS: &[&str] = &[
    "www.youtube.com",
    "youtube.com",
    "m.youtube.com",
    "music.youtube.com",
];

/// Short-link host, the identifier is the whole path
const SHORT_LINK_HOST: &str = "youtu.be";

const SHORTS_PREFIX: &str = "/shorts/";

/// Canonical YouTube video identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VideoId(String);

impl VideoId {
    /// Wrap an already-extracted identifier, rejecting empty input
    pub fn new(id: impl Into<String>) -> Result<Self, SummarizerError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(SummarizerError::InvalidInput("empty video id".to_string()));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Watch page handed to yt-dlp
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Parse a free-form link into a canonical video identifier.
///
/// Accepts watch pages (`/watch?v=ID`, `/?v=ID`), shorts (`/shorts/ID`), short links
/// (`youtu.be/ID`) and, for any other path on a known host, the last path segment.
/// Links without a scheme are treated as `https`.
pub fn resolve(raw: &str) -> Result<VideoId, SummarizerError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(SummarizerError::InvalidInput("empty input".to_string()));
    }

    let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    let parsed = Url::parse(&with_scheme)
        .map_err(|_| SummarizerError::InvalidInput(raw.to_string()))?;

    let host = parsed
        .host_str()
        .map(|h| h.to_lowercase())
        .ok_or_else(|| SummarizerError::InvalidInput(raw.to_string()))?;

    if host == SHORT_LINK_HOST {
        let id = parsed.path().trim_matches('/');
        return VideoId::new(id).map_err(|_| SummarizerError::InvalidInput(raw.to_string()));
    }

    if !WATCH_HOSTS.contains(&host.as_str()) {
        return Err(SummarizerError::UnsupportedHost(host));
    }

    let path = parsed.path();
    if path == "/watch" || path == "/" || path.is_empty() {
        let id = parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();
        return VideoId::new(id).map_err(|_| SummarizerError::InvalidInput(raw.to_string()));
    }

    if let Some(rest) = path.strip_prefix(SHORTS_PREFIX) {
        let id = rest.split('/').next().unwrap_or_default();
        return VideoId::new(id).map_err(|_| SummarizerError::InvalidInput(raw.to_string()));
    }

    path.split('/')
        .filter(|segment| !segment.is_empty())
        .last()
        .map(VideoId::new)
        .unwrap_or_else(|| Err(SummarizerError::InvalidInput(raw.to_string())))
}

/// Cheap admission heuristic, does not guarantee that `resolve` succeeds
pub fn looks_like_video_link(text: &str) -> bool {
    text.to_lowercase().contains("youtu")
}
