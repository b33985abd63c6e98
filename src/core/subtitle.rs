use std::path::Path;

use super::uri;
use crate::shared::constants;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleSource {
    None,
    Explicit,
    Inferred,
}

/// Subtitle decision for one media item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleChoice {
    pub source: SubtitleSource,
    pub resolved_uri: Option<String>,
}

impl SubtitleChoice {
    pub fn none() -> Self {
        Self {
            source: SubtitleSource::None,
            resolved_uri: None,
        }
    }

    fn with(source: SubtitleSource, uri: String) -> Self {
        Self {
            source,
            resolved_uri: Some(uri),
        }
    }
}

/// Picks the subtitle for `primary`: the explicit path when given,
/// otherwise a same-named `.srt` next to a local media file.
///
/// A missing or unreadable sibling is a plain miss, never an error.
pub fn resolve(primary: &str, explicit: Option<&str>) -> SubtitleChoice {
    if let Some(path) = explicit {
        return match uri::normalize(path) {
            Ok(resolved) => SubtitleChoice::with(SubtitleSource::Explicit, resolved),
            Err(err) => {
                crate::utils::logger::warn(&format!("subtitle path '{}' ignored: {}", path, err));
                SubtitleChoice::none()
            }
        };
    }

    let Some(media) = uri::normalize(primary)
        .ok()
        .and_then(|primary| uri::to_local_path(&primary))
    else {
        return SubtitleChoice::none();
    };

    match sibling_subtitle(&media) {
        Some(found) => SubtitleChoice::with(SubtitleSource::Inferred, found),
        None => SubtitleChoice::none(),
    }
}

fn sibling_subtitle(media: &Path) -> Option<String> {
    let candidate = media.with_extension(constants::SUBTITLE_EXTENSION);
    if candidate == media || !candidate.try_exists().unwrap_or(false) {
        return None;
    }
    crate::utils::logger::debug(&format!("found subtitle {}", candidate.display()));
    uri::normalize(&candidate.to_string_lossy()).ok()
}
