//! Normalized records shared by every resolver.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Movie or series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Movie,
    Series,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie => f.write_str("movie"),
            Self::Series => f.write_str("series"),
        }
    }
}

/// A search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    /// `<source>:<payload>`, resolvable by the same source with no other state.
    pub id: String,
    pub kind: ContentKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    /// Source-specific extras (e.g. `quality`).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

/// Full metadata for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailRecord {
    pub id: String,
    pub kind: ContentKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub genres: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_year: Option<u32>,
    /// One entry for a movie, one per episode for a series.
    pub children: Vec<ChildEntry>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

/// One playable unit inside a [`DetailRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChildEntry {
    /// Feeds back into `resolve_playback`.
    pub id: String,
    pub title: String,
    pub season: u32,
    pub episode: u32,
}

/// One resolved playable URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamCandidate {
    /// Quality or server hint.
    pub label: String,
    pub url: String,
    pub source_name: String,
}

impl StreamCandidate {
    pub fn new(label: impl Into<String>, url: impl Into<String>, source: &str) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
            source_name: source.to_string(),
        }
    }
}

/// Sort children by (season, episode) and drop repeated pairs, keeping the first.
pub fn order_children(children: &mut Vec<ChildEntry>) {
    children.sort_by_key(|c| (c.season, c.episode));
    children.dedup_by_key(|c| (c.season, c.episode));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(season: u32, episode: u32, id: &str) -> ChildEntry {
        ChildEntry {
            id: id.to_string(),
            title: String::new(),
            season,
            episode,
        }
    }

    #[test]
    fn order_children_sorts_and_dedups() {
        let mut children = vec![
            child(2, 1, "a"),
            child(1, 3, "b"),
            child(1, 1, "c"),
            child(1, 3, "d"),
        ];
        order_children(&mut children);
        let ids: Vec<_> = children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["c", "b", "a"]);
    }

    #[test]
    fn candidate_serializes_camel_case() {
        let json = serde_json::to_value(StreamCandidate::new("1080p", "https://x/y.m3u8", "Gogoanime"))
            .unwrap();
        assert_eq!(json["sourceName"], "Gogoanime");
        assert_eq!(json["label"], "1080p");
    }

    #[test]
    fn kind_displays_lowercase() {
        assert_eq!(ContentKind::Series.to_string(), "series");
        assert_eq!(serde_json::to_value(ContentKind::Movie).unwrap(), "movie");
    }
}
