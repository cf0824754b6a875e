//! Bflix catalog resolver.
//!
//! Every catalog request carries a `vrf` token ([`crate::crypto::vrf`]) built
//! from the query or film id. Playback goes through the film's "servers"
//! listing: the matching episode anchor holds a `data-ep` JSON map of
//! server id → internal id, and each allowed server yields one VRF-encoded URL.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{absolute_url, id_payload, or_empty, Resolver};
use crate::config::ResolutionConfig;
use crate::crypto::vrf;
use crate::error::{ResolveError, Result};
use crate::extract::{Document, DocumentKind, Node};
use crate::http_client::HttpClient;
use crate::model::{
    order_children, ChildEntry, ContentItem, ContentKind, DetailRecord, StreamCandidate,
};
use crate::rank::rank;

const PROVIDER_NAME: &str = "Bflix";
const MAIN_URL: &str = "https://bflix.ru";
const MAIN_KEY: &str = "OrAimkpzm6phmN3j";

/// Servers queried during playback, in this order.
const SERVER_IDS: [&str; 5] = ["28", "35", "40", "41", "43"];

pub struct BflixResolver {
    client: HttpClient,
    main_url: String,
}

impl BflixResolver {
    pub fn new(client: HttpClient) -> Self {
        Self::with_base_url(client, MAIN_URL)
    }

    pub fn with_base_url(client: HttpClient, main_url: &str) -> Self {
        Self {
            client,
            main_url: main_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        self.client
            .fetch_text(url, &[("Referer", self.main_url.as_str())])
            .await
    }

    async fn film(&self, path: &str) -> Result<FilmPage> {
        let html = self.fetch(&absolute_url(&self.main_url, path)).await?;
        parse_film_page(&html)
    }

    /// Raw JSON of the film's servers listing.
    async fn servers(&self, film_id: &str) -> Result<String> {
        let url = format!(
            "{}/ajax/film/servers?id={}&vrf={}",
            self.main_url,
            urlencoding::encode(film_id),
            vrf::encode(film_id, MAIN_KEY)?
        );
        self.fetch(&url).await
    }

    async fn try_search(&self, query: &str) -> Result<Vec<ContentItem>> {
        let url = format!(
            "{}/search?keyword={}&vrf={}",
            self.main_url,
            urlencoding::encode(query),
            vrf::encode(query, MAIN_KEY)?
        );
        let html = self.fetch(&url).await?;
        Ok(parse_search_page(&html))
    }

    async fn try_load_detail(&self, id: &str) -> Result<DetailRecord> {
        let path = id_payload(id, PROVIDER_NAME)?;
        let page = self.film(path).await?;
        let kind = kind_of(path);

        let children = match kind {
            ContentKind::Movie => vec![ChildEntry {
                id: format!("{PROVIDER_NAME}:{path}"),
                title: page.title.clone(),
                season: 1,
                episode: 1,
            }],
            ContentKind::Series => {
                let servers = self.servers(&page.film_id).await?;
                let mut episodes = parse_episodes(&servers)?;
                order_children(&mut episodes);
                episodes
            }
        };
        debug!(children = children.len(), "Loaded film detail");

        Ok(DetailRecord {
            id: id.to_string(),
            kind,
            title: page.title,
            poster_url: page.poster_url,
            description: page.description,
            genres: page.genres,
            release_year: None,
            children,
            extra: BTreeMap::new(),
        })
    }

    async fn try_resolve_playback(&self, id: &str) -> Result<Vec<StreamCandidate>> {
        let path = id_payload(id, PROVIDER_NAME)?;
        let page = self.film(path).await?;
        let servers = self.servers(&page.film_id).await?;
        let server_map = server_map(&servers, path)?;

        let mut candidates = Vec::new();
        for server_id in SERVER_IDS {
            let Some(internal_id) = server_map.get(server_id) else {
                continue;
            };
            match self.server_url(internal_id).await {
                Ok(url) => {
                    let kind = if url.contains(".m3u8") { "HLS" } else { "Direct" };
                    candidates.push(StreamCandidate::new(
                        format!("Server {server_id} ({kind})"),
                        url,
                        PROVIDER_NAME,
                    ));
                }
                Err(e) => warn!("{PROVIDER_NAME} server {server_id} failed for {id}: {e}"),
            }
        }
        Ok(candidates)
    }

    async fn server_url(&self, internal_id: &str) -> Result<String> {
        let url = format!(
            "{}/ajax/episode/info?id={}",
            self.main_url,
            urlencoding::encode(internal_id)
        );
        let info: EpisodeInfo = self
            .client
            .fetch_json(&url, &[("Referer", self.main_url.as_str())])
            .await?;
        let sealed = info
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ResolveError::missing("episode info url"))?;
        Ok(vrf::decode(&sealed, MAIN_KEY)?)
    }
}

#[async_trait]
impl Resolver for BflixResolver {
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
        let candidates = or_empty(
            PROVIDER_NAME,
            "playback",
            id,
            self.try_resolve_playback(id).await,
        );
        rank(candidates, config)
    }
}

#[derive(Debug, Deserialize)]
struct EpisodeInfo {
    url: Option<String>,
}

fn kind_of(path: &str) -> ContentKind {
    if path.contains("/movie/") {
        ContentKind::Movie
    } else {
        ContentKind::Series
    }
}

fn parse_search_page(html: &str) -> Vec<ContentItem> {
    let doc = Document::parse(html, DocumentKind::Html);
    doc.select(".filmlist div.item")
        .iter()
        .filter_map(|row| {
            let title = row.text_of("h3 a")?;
            let href = row
                .select_first("a")
                .and_then(|a| a.attr("href"))
                .map(str::trim)
                .filter(|h| !h.is_empty())?;

            let mut extra = BTreeMap::new();
            if let Some(quality) = row.text_of("div.quality") {
                extra.insert("quality".to_string(), quality);
            }

            Some(ContentItem {
                id: format!("{PROVIDER_NAME}:{href}"),
                kind: kind_of(href),
                title,
                poster_url: row
                    .select_first("a.poster img")
                    .and_then(|img| img.first_attr(&["data-src", "src"]))
                    .map(str::to_string),
                year: None,
                extra,
            })
        })
        .collect()
}

#[derive(Debug)]
struct FilmPage {
    film_id: String,
    title: String,
    poster_url: Option<String>,
    description: Option<String>,
    genres: Vec<String>,
}

fn parse_film_page(html: &str) -> Result<FilmPage> {
    let doc = Document::parse(html, DocumentKind::Html);
    let film_id = doc
        .attr_of("div#watch", "data-id")
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ResolveError::missing("div#watch data-id"))?;

    let genres = doc
        .select("div.info .meta div")
        .into_iter()
        .find(|n| n.text().contains("Genre"))
        .map(|n| {
            n.select("a")
                .iter()
                .map(Node::text)
                .filter(|g| !g.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Ok(FilmPage {
        film_id: film_id.trim().to_string(),
        title: doc.text_of("div.info h1").unwrap_or_default(),
        poster_url: doc.first_attr(&["img.poster", ".info .poster img"], "src"),
        description: doc.text_of(".info .desc"),
        genres,
    })
}

/// Episode anchors from the servers listing, in listing order.
fn parse_episodes(servers_json: &str) -> Result<Vec<ChildEntry>> {
    let doc = servers_fragment(servers_json)?;
    Ok(doc
        .select("div.episode a")
        .iter()
        .enumerate()
        .filter_map(|(i, a)| {
            let href = a.attr("href").map(str::trim).filter(|h| !h.is_empty())?;
            let fallback = u32::try_from(i + 1).unwrap_or(u32::MAX);
            let (season, episode) = a
                .attr("data-kname")
                .and_then(parse_kname)
                .unwrap_or((1, fallback));
            let title = a
                .text_of("span.name")
                .unwrap_or_else(|| format!("Episode {episode}"));
            Some(ChildEntry {
                id: format!("{PROVIDER_NAME}:{href}"),
                title,
                season,
                episode,
            })
        })
        .collect())
}

/// `"<season>-<episode>"`.
fn parse_kname(kname: &str) -> Option<(u32, u32)> {
    let (season, episode) = kname.split_once('-')?;
    Some((season.trim().parse().ok()?, episode.trim().parse().ok()?))
}

fn servers_fragment(servers_json: &str) -> Result<Document> {
    Document::from_json_field(servers_json, "html")
        .ok_or_else(|| ResolveError::missing("servers html"))
}

/// Server id → internal id for the block matching `path`.
///
/// Movies use the first block. Episodes match on exact href, then on the
/// href without a trailing `-full`.
fn server_map(servers_json: &str, path: &str) -> Result<BTreeMap<String, String>> {
    let doc = servers_fragment(servers_json)?;

    let anchor = if kind_of(path) == ContentKind::Movie {
        doc.select_first("div.episode a")
    } else {
        let anchors = doc.select("div.episode a");
        let by_href = |target: &str| {
            anchors
                .iter()
                .copied()
                .find(|a| a.attr("href").map(str::trim) == Some(target))
        };
        by_href(path).or_else(|| path.strip_suffix("-full").and_then(by_href))
    };

    let raw = anchor
        .ok_or_else(|| ResolveError::missing("episode block"))?
        .attr("data-ep")
        .ok_or_else(|| ResolveError::missing("server map"))?;

    let parsed: serde_json::Map<String, Value> = serde_json::from_str(raw)?;
    Ok(parsed
        .into_iter()
        .filter_map(|(server, value)| {
            let internal = match value {
                Value::String(s) if !s.is_empty() => s,
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            Some((server, internal))
        })
        .collect())
}
