use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("empty media location")]
    Empty,
    #[error("cannot resolve the working directory")]
    WorkingDir(#[source] std::io::Error),
    #[error("'{0}' cannot be expressed as a file URI")]
    NotRepresentable(String),
}

/// Canonical URI for a command-line token, resolving relative paths
/// against the current working directory.
pub fn normalize(token: &str) -> Result<String, NormalizeError> {
    if looks_like_uri(token) {
        return normalize_in(token, Path::new("/"));
    }
    let base = std::env::current_dir().map_err(NormalizeError::WorkingDir)?;
    normalize_in(token, &base)
}

/// Canonical URI for `token` with relative paths resolved against `base`.
///
/// Never touches the filesystem. Applying it to its own output returns the
/// same string.
pub fn normalize_in(token: &str, base: &Path) -> Result<String, NormalizeError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(NormalizeError::Empty);
    }

    if looks_like_uri(token) {
        if let Ok(url) = Url::parse(token) {
            return Ok(url.to_string());
        }
    }

    let path = Path::new(token);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    Url::from_file_path(lexical_clean(&absolute))
        .map(|url| url.to_string())
        .map_err(|_| NormalizeError::NotRepresentable(token.to_string()))
}

/// Local filesystem path behind a `file://` URI.
pub fn to_local_path(uri: &str) -> Option<PathBuf> {
    let url = Url::parse(uri).ok()?;
    if url.scheme() != "file" {
        return None;
    }
    url.to_file_path().ok()
}

/// Short name for display: the last path segment, decoded.
pub fn display_name(uri: &str) -> String {
    if let Some(name) = to_local_path(uri)
        .as_deref()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
    {
        return name;
    }
    Url::parse(uri)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
                .filter(|segment| !segment.is_empty())
        })
        .unwrap_or_else(|| uri.to_string())
}

// A bare "c:\\movie.mp4" parses as a URI with scheme "c"; require an
// authority marker before trusting the parser.
fn looks_like_uri(token: &str) -> bool {
    match token.split_once("://") {
        Some((scheme, _)) => {
            scheme.len() > 1
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

fn lexical_clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}
