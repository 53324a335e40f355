//! Tile URL formatting and URL sets.

use std::collections::hash_set;
use std::collections::HashSet;

use crate::coord::TileCoord;

/// Default tile server.
pub const DEFAULT_BASE_URL: &str = "http://a.tile.openstreetmap.org";

/// Formats tile coordinates as `{base_url}/{zoom}/{col}/{row}.png`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileUrlTemplate {
    base_url: String,
}

impl TileUrlTemplate {
    /// Creates a template for `base_url`; a trailing `/` is dropped.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the tile at `coord`.
    pub fn url(&self, coord: &TileCoord) -> String {
        format!(
            "{}/{}/{}/{}.png",
            self.base_url, coord.zoom, coord.col, coord.row
        )
    }
}

impl Default for TileUrlTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Duplicate-free set of tile URLs.
///
/// Built fresh for each request and handed to the caller, who owns it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileUrlSet {
    urls: HashSet<String>,
}

impl TileUrlSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            urls: HashSet::with_capacity(capacity),
        }
    }

    /// Adds a URL; returns false if it was already present.
    pub fn insert(&mut self, url: String) -> bool {
        self.urls.insert(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }

    /// Merges `other` into this set.
    pub fn extend_from(&mut self, other: TileUrlSet) {
        self.urls.extend(other.urls);
    }

    /// Returns the URLs in lexicographic order.
    pub fn into_sorted_vec(self) -> Vec<String> {
        let mut urls: Vec<String> = self.urls.into_iter().collect();
        urls.sort();
        urls
    }
}

impl FromIterator<String> for TileUrlSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            urls: iter.into_iter().collect(),
        }
    }
}

impl Extend<String> for TileUrlSet {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        self.urls.extend(iter);
    }
}

impl IntoIterator for TileUrlSet {
    type Item = String;
    type IntoIter = hash_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.urls.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template() {
        let template = TileUrlTemplate::default();
        assert_eq!(
            template.url(&TileCoord::new(16, 19295, 24640)),
            "http://a.tile.openstreetmap.org/16/19295/24640.png"
        );
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let template = TileUrlTemplate::new("https://tiles.example.com/osm/");
        assert_eq!(template.base_url(), "https://tiles.example.com/osm");
        assert_eq!(
            template.url(&TileCoord::new(1, 1, 0)),
            "https://tiles.example.com/osm/1/1/0.png"
        );
    }

    #[test]
    fn test_url_set_deduplicates() {
        let mut set = TileUrlSet::new();
        assert!(set.insert("a".into()));
        assert!(!set.insert("a".into()));
        assert_eq!(set.len(), 1);
        assert!(set.contains("a"));
    }

    #[test]
    fn test_url_set_merge_and_sort() {
        let mut left: TileUrlSet = ["b".to_string(), "a".to_string()].into_iter().collect();
        let right: TileUrlSet = ["c".to_string(), "a".to_string()].into_iter().collect();
        left.extend_from(right);
        assert_eq!(left.into_sorted_vec(), vec!["a", "b", "c"]);
    }
}
