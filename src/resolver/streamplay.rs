//! StreamPlay: TMDB-backed metadata.
//!
//! Ids:
//! - item: `StreamPlay:<tmdb id>:<movie|tv>`
//! - child: `StreamPlay:<tmdb id>:<movie|tv>:<season>:<episode>` (movies use `0:0`)
//!
//! Playback has no extractor yet; it answers with a single placeholder
//! candidate naming the TMDB id.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{id_payload, or_empty, Resolver};
use crate::config::ResolutionConfig;
use crate::error::{ResolveError, Result};
use crate::http_client::HttpClient;
use crate::model::{
    order_children, ChildEntry, ContentItem, ContentKind, DetailRecord, StreamCandidate,
};
use crate::rank::truncate;

const PROVIDER_NAME: &str = "StreamPlay";
const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
const TMDB_IMAGE_URL: &str = "https://image.tmdb.org/t/p/original";
const TMDB_API_KEY: &str = "1f54bd990f1cdfb230adb312546d765d";
const DETAIL_APPEND: &str = "credits,external_ids,videos,recommendations,seasons";
const PLACEHOLDER_URL: &str = "https://example.com/placeholder/stream";

pub struct StreamPlayResolver {
    client: HttpClient,
    api_url: String,
    api_key: String,
}

impl StreamPlayResolver {
    pub fn new(client: HttpClient) -> Self {
        Self::with_base_url(client, TMDB_BASE_URL)
    }

    pub fn with_base_url(client: HttpClient, api_url: &str) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: TMDB_API_KEY.to_string(),
        }
    }

    /// Use a different TMDB API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    async fn try_search(&self, query: &str) -> Result<Vec<ContentItem>> {
        let url = format!(
            "{}/search/multi?api_key={}&language=en-US&query={}&include_adult=false",
            self.api_url,
            urlencoding::encode(&self.api_key),
            urlencoding::encode(query)
        );
        let page: SearchPage = self.client.fetch_json(&url, &[]).await?;
        Ok(page.results.into_iter().filter_map(search_item).collect())
    }

    async fn try_load_detail(&self, id: &str) -> Result<DetailRecord> {
        let target = TmdbId::parse(id)?;
        let url = format!(
            "{}/{}/{}?api_key={}&language=en-US&append_to_response={DETAIL_APPEND}",
            self.api_url,
            target.media_type.path(),
            target.tmdb_id,
            urlencoding::encode(&self.api_key),
        );
        let media: MediaDetail = self.client.fetch_json(&url, &[]).await?;
        Ok(detail_record(id, &target, media))
    }
}

#[async_trait]
impl Resolver for StreamPlayResolver {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn search(&self, query: &str, _config: &ResolutionConfig) -> Vec<ContentItem> {
        or_empty(PROVIDER_NAME, "search", query, self.try_search(query).await)
    }

    async fn load_detail(&self, id: &str, _config: &ResolutionConfig) -> Option<DetailRecord> {
        or_empty(
            PROVIDER_NAME,
            "detail",
            id,
            self.try_load_detail(id).await.map(Some),
        )
    }

    async fn resolve_playback(&self, id: &str, config: &ResolutionConfig) -> Vec<StreamCandidate> {
        let candidates = or_empty(PROVIDER_NAME, "playback", id, placeholder(id));
        // no quality label to filter on
        truncate(candidates, config)
    }
}

fn placeholder(id: &str) -> Result<Vec<StreamCandidate>> {
    let target = TmdbId::parse(id)?;
    debug!(tmdb_id = target.tmdb_id, "No stream extractor, returning placeholder");
    Ok(vec![StreamCandidate::new(
        format!("[{PROVIDER_NAME}] TMDB ID: {}", target.tmdb_id),
        format!("{PLACEHOLDER_URL}/{}", target.tmdb_id),
        PROVIDER_NAME,
    )])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "movie" => Some(Self::Movie),
            "tv" => Some(Self::Tv),
            _ => None,
        }
    }

    fn path(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Tv => "tv",
        }
    }

    fn kind(self) -> ContentKind {
        match self {
            Self::Movie => ContentKind::Movie,
            Self::Tv => ContentKind::Series,
        }
    }
}

/// The `<tmdb id>:<media type>` head of a StreamPlay id.
#[derive(Debug, PartialEq, Eq)]
struct TmdbId {
    tmdb_id: u64,
    media_type: MediaType,
}

impl TmdbId {
    fn parse(id: &str) -> Result<Self> {
        let payload = id_payload(id, PROVIDER_NAME)?;
        let mut parts = payload.split(':');
        let tmdb_id = parts.next().and_then(|p| p.parse().ok());
        let media_type = parts.next().and_then(MediaType::parse);
        match (tmdb_id, media_type) {
            (Some(tmdb_id), Some(media_type)) => Ok(Self {
                tmdb_id,
                media_type,
            }),
            _ => Err(ResolveError::InvalidId(id.to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: u64,
    media_type: Option<String>,
    title: Option<String>,
    name: Option<String>,
    original_title: Option<String>,
    original_name: Option<String>,
    poster_path: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MediaDetail {
    title: Option<String>,
    name: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    #[serde(default)]
    genres: Vec<Genre>,
    external_ids: Option<ExternalIds>,
    #[serde(default)]
    seasons: Vec<Season>,
}

#[derive(Debug, Deserialize)]
struct Genre {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    imdb_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Season {
    season_number: u32,
    #[serde(default)]
    episode_count: u32,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn image_url(path: Option<String>) -> Option<String> {
    non_empty(path).map(|p| format!("{TMDB_IMAGE_URL}{p}"))
}

/// Year from the first four characters of a TMDB date.
fn date_year(primary: Option<&str>, fallback: Option<&str>) -> Option<u32> {
    let date = primary
        .filter(|d| !d.is_empty())
        .or(fallback.filter(|d| !d.is_empty()))?;
    date.get(..4)?.parse().ok()
}

fn search_item(media: SearchResult) -> Option<ContentItem> {
    let media_type = MediaType::parse(media.media_type.as_deref()?)?;
    let year = date_year(
        media.release_date.as_deref(),
        media.first_air_date.as_deref(),
    );
    let title = non_empty(media.title)
        .or_else(|| non_empty(media.name))
        .or_else(|| non_empty(media.original_title))
        .or_else(|| non_empty(media.original_name))?;

    Some(ContentItem {
        id: format!("{PROVIDER_NAME}:{}:{}", media.id, media_type.path()),
        kind: media_type.kind(),
        title,
        poster_url: image_url(media.poster_path),
        year,
        extra: BTreeMap::new(),
    })
}

fn detail_record(id: &str, target: &TmdbId, media: MediaDetail) -> DetailRecord {
    let release_year = date_year(
        media.release_date.as_deref(),
        media.first_air_date.as_deref(),
    );
    let title = non_empty(media.title)
        .or_else(|| non_empty(media.name))
        .unwrap_or_default();

    let children = match target.media_type {
        MediaType::Movie => vec![ChildEntry {
            id: format!("{PROVIDER_NAME}:{}:movie:0:0", target.tmdb_id),
            title: title.clone(),
            season: 0,
            episode: 0,
        }],
        MediaType::Tv => {
            let mut children: Vec<ChildEntry> = media
                .seasons
                .iter()
                .filter(|s| s.season_number > 0)
                .flat_map(|s| {
                    (1..=s.episode_count).map(move |e| ChildEntry {
                        id: format!(
                            "{PROVIDER_NAME}:{}:tv:{}:{e}",
                            target.tmdb_id, s.season_number
                        ),
                        title: format!("S{} E{e}", s.season_number),
                        season: s.season_number,
                        episode: e,
                    })
                })
                .collect();
            order_children(&mut children);
            children
        }
    };

    let mut extra = BTreeMap::new();
    if let Some(imdb) = media.external_ids.and_then(|x| non_empty(x.imdb_id)) {
        extra.insert("imdbId".to_string(), imdb);
    }

    DetailRecord {
        id: id.to_string(),
        kind: target.media_type.kind(),
        title,
        poster_url: image_url(media.poster_path),
        description: non_empty(media.overview),
        genres: media.genres.into_iter().map(|g| g.name).collect(),
        release_year,
        children,
        extra,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_item_and_child_ids() {
        assert_eq!(
            TmdbId::parse("StreamPlay:603:movie").unwrap(),
            TmdbId {
                tmdb_id: 603,
                media_type: MediaType::Movie
            }
        );
        assert_eq!(
            TmdbId::parse("StreamPlay:1399:tv:2:5").unwrap().media_type,
            MediaType::Tv
        );
        assert!(TmdbId::parse("StreamPlay:603").is_err());
        assert!(TmdbId::parse("StreamPlay:abc:movie").is_err());
        assert!(TmdbId::parse("StreamPlay:603:person").is_err());
        assert!(TmdbId::parse("Bflix:603:movie").is_err());
    }

    #[test]
    fn search_keeps_movies_and_tv_only() {
        let page: SearchPage = serde_json::from_str(
            r#"{"results":[
                {"id":603,"media_type":"movie","title":"The Matrix","poster_path":"/m.jpg","release_date":"1999-03-30"},
                {"id":1399,"media_type":"tv","name":"","original_name":"Game of Thrones","first_air_date":"2011-04-17"},
                {"id":6384,"media_type":"person","name":"Keanu Reeves"},
                {"id":7,"media_type":"movie"}
            ]}"#,
        )
        .unwrap();
        let items: Vec<_> = page.results.into_iter().filter_map(search_item).collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "StreamPlay:603:movie");
        assert_eq!(items[0].kind, ContentKind::Movie);
        assert_eq!(items[0].year, Some(1999));
        assert_eq!(
            items[0].poster_url.as_deref(),
            Some("https://image.tmdb.org/t/p/original/m.jpg")
        );
        assert_eq!(items[1].id, "StreamPlay:1399:tv");
        assert_eq!(items[1].title, "Game of Thrones");
        assert_eq!(items[1].kind, ContentKind::Series);
        assert_eq!(items[1].year, Some(2011));
        assert!(items[1].poster_url.is_none());
    }

    #[test]
    fn date_year_handles_short_and_empty() {
        assert_eq!(date_year(Some(""), Some("2020-01-01")), Some(2020));
        assert_eq!(date_year(Some("19"), None), None);
        assert_eq!(date_year(None, None), None);
    }

    #[test]
    fn tv_children_follow_declared_counts() {
        let media: MediaDetail = serde_json::from_str(
            r#"{"name":"Show","genres":[{"id":1,"name":"Drama"}],
                "external_ids":{"imdb_id":"tt0944947"},
                "seasons":[
                  {"season_number":2,"episode_count":2},
                  {"season_number":0,"episode_count":5},
                  {"season_number":1,"episode_count":3},
                  {"season_number":3,"episode_count":0}
                ]}"#,
        )
        .unwrap();
        let target = TmdbId::parse("StreamPlay:1399:tv").unwrap();
        let record = detail_record("StreamPlay:1399:tv", &target, media);

        assert_eq!(record.kind, ContentKind::Series);
        assert_eq!(record.genres, ["Drama"]);
        assert_eq!(record.extra.get("imdbId").map(String::as_str), Some("tt0944947"));
        let pairs: Vec<_> = record.children.iter().map(|c| (c.season, c.episode)).collect();
        assert_eq!(pairs, [(1, 1), (1, 2), (1, 3), (2, 1), (2, 2)]);
        assert_eq!(record.children[3].id, "StreamPlay:1399:tv:2:1");
        assert_eq!(record.children[3].title, "S2 E1");
    }

    #[test]
    fn movie_has_single_zero_child() {
        let media: MediaDetail =
            serde_json::from_str(r#"{"title":"The Matrix","release_date":"1999-03-30"}"#).unwrap();
        let target = TmdbId::parse("StreamPlay:603:movie").unwrap();
        let record = detail_record("StreamPlay:603:movie", &target, media);
        assert_eq!(record.release_year, Some(1999));
        assert_eq!(record.children.len(), 1);
        assert_eq!(record.children[0].id, "StreamPlay:603:movie:0:0");
        assert_eq!((record.children[0].season, record.children[0].episode), (0, 0));
        assert!(record.extra.is_empty());
    }

    #[test]
    fn placeholder_names_tmdb_id() {
        let candidates = placeholder("StreamPlay:1399:tv:1:2").unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].label, "[StreamPlay] TMDB ID: 1399");
        assert_eq!(
            candidates[0].url,
            "https://example.com/placeholder/stream/1399"
        );
        assert!(placeholder("StreamPlay:oops").is_err());
    }
}
