use super::uri::{self, NormalizeError};

/// A token that could not be turned into a URI and was left out.
#[derive(Debug)]
pub struct DroppedEntry {
    pub token: String,
    pub reason: NormalizeError,
}

/// Ordered, read-only list of normalized URIs plus the playing position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackList {
    items: Vec<String>,
    current: Option<usize>,
}

impl PlaybackList {
    /// Normalizes every token in command-line order. Tokens that fail are
    /// reported back and skipped; the rest keep their relative order.
    pub fn build<I, S>(tokens: I) -> (Self, Vec<DroppedEntry>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::build_with(tokens, uri::normalize)
    }

    pub fn build_with<I, S, F>(tokens: I, mut normalize: F) -> (Self, Vec<DroppedEntry>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: FnMut(&str) -> Result<String, NormalizeError>,
    {
        let mut items = Vec::new();
        let mut dropped = Vec::new();

        for token in tokens {
            let token = token.as_ref();
            match normalize(token) {
                Ok(uri) => items.push(uri),
                Err(reason) => dropped.push(DroppedEntry {
                    token: token.to_string(),
                    reason,
                }),
            }
        }

        (Self::from_uris(items), dropped)
    }

    /// Wraps URIs that are already normalized.
    pub fn from_uris(items: Vec<String>) -> Self {
        let current = if items.is_empty() { None } else { Some(0) };
        Self { items, current }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// `None` for an empty list.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&str> {
        self.current.and_then(|index| self.items.get(index)).map(String::as_str)
    }

    /// Moves to the next entry, returning it, or stays put at the end.
    pub fn advance(&mut self) -> Option<&str> {
        let next = self.current? + 1;
        if next >= self.items.len() {
            return None;
        }
        self.current = Some(next);
        self.items.get(next).map(String::as_str)
    }
}
