//! Gogoanime catalog resolver.
//!
//! Search and detail are plain HTML scraping plus one AJAX episode list.
//! Playback walks the embedded player:
//!
//! 1. episode page → `div.play-video iframe` → player URL and content id
//! 2. content id → AES encrypted with the fixed request key
//! 3. player page → optional `data-value` payload whose trailing query
//!    parameters join the request (dropped silently if it does not decrypt)
//! 4. `<player origin>/encrypt-ajax.php` → `{"data": "..."}` envelope
//! 5. envelope decrypted with the separate response key → `source` and
//!    `source_bk` arrays of `{file, label}`
//!
//! Series episodes are season 1; a movie is a single season 1 / episode 1 entry.

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{absolute_url, first_number, first_year, id_payload, or_empty, Resolver};
use crate::config::ResolutionConfig;
use crate::crypto::{decrypt, derive_key, encrypt, BASE64_LENIENT, DERIVED_KEY_LEN};
use crate::error::{ResolveError, Result};
use crate::extract::{Document, DocumentKind};
use crate::http_client::HttpClient;
use crate::model::{
    order_children, ChildEntry, ContentItem, ContentKind, DetailRecord, StreamCandidate,
};
use crate::rank::rank;

const PROVIDER_NAME: &str = "Gogoanime";
const MAIN_URL: &str = "https://anitaku.to";
const AJAX_URL: &str = "https://ajax.gogo-load.com";

// Player key material, copied from the site's player script. Upstream rotates
// these without notice; when playback starts returning nothing, check here first.
const PLAYER_IV: &str = "3134003223491201";
const PLAYER_KEY: &str = "37911490979715163134003223491201";
const PLAYER_DECRYPT_KEY: &str = "54674138327930866480207815084989";

const UNKNOWN_QUALITY: &str = "Unknown Quality";

pub struct GogoanimeResolver {
    client: HttpClient,
    main_url: String,
    ajax_url: String,
    adaptive_keys: bool,
}

impl GogoanimeResolver {
    pub fn new(client: HttpClient) -> Self {
        Self::with_base_urls(client, MAIN_URL, AJAX_URL)
    }

    /// Point the resolver at different catalog and AJAX hosts.
    pub fn with_base_urls(client: HttpClient, main_url: &str, ajax_url: &str) -> Self {
        Self {
            client,
            main_url: main_url.trim_end_matches('/').to_string(),
            ajax_url: ajax_url.trim_end_matches('/').to_string(),
            adaptive_keys: false,
        }
    }

    /// Derive the request key from the player page when it advertises an IV.
    #[must_use]
    pub fn with_adaptive_keys(mut self, enabled: bool) -> Self {
        self.adaptive_keys = enabled;
        self
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        self.client
            .fetch_text(url, &[("Referer", self.main_url.as_str())])
            .await
    }

    async fn try_search(&self, query: &str) -> Result<Vec<ContentItem>> {
        let url = format!(
            "{}/search.html?keyword={}",
            self.main_url,
            urlencoding::encode(query)
        );
        let html = self.fetch(&url).await?;
        Ok(parse_search_page(&html))
    }

    async fn try_load_detail(&self, id: &str) -> Result<DetailRecord> {
        let payload = id_payload(id, PROVIDER_NAME)?;
        let html = self
            .fetch(&absolute_url(&self.main_url, &detail_path(payload)))
            .await?;
        let page = parse_detail_page(&html)?;

        let list_url = format!(
            "{}/ajax/load-list-episode?ep_start=0&ep_end=2000&id={}",
            self.ajax_url,
            urlencoding::encode(&page.movie_id)
        );
        let list_html = self.fetch(&list_url).await?;
        let mut episodes = parse_episode_list(&list_html);
        order_children(&mut episodes);
        debug!(episodes = episodes.len(), "Loaded episode list");

        let children = match page.kind {
            ContentKind::Series => episodes,
            ContentKind::Movie => {
                let first = episodes
                    .into_iter()
                    .next()
                    .ok_or_else(|| ResolveError::missing("movie episode link"))?;
                vec![ChildEntry {
                    id: first.id,
                    title: page.title.clone(),
                    season: 1,
                    episode: 1,
                }]
            }
        };

        let mut extra = BTreeMap::new();
        if let Some(status) = page.status {
            extra.insert("status".to_string(), status);
        }

        Ok(DetailRecord {
            id: id.to_string(),
            kind: page.kind,
            title: page.title,
            poster_url: page.poster_url,
            description: page.description,
            genres: page.genres,
            release_year: page.year,
            children,
            extra,
        })
    }

    async fn try_resolve_playback(&self, id: &str) -> Result<Vec<StreamCandidate>> {
        let path = id_payload(id, PROVIDER_NAME)?;
        let episode_html = self.fetch(&absolute_url(&self.main_url, path)).await?;
        let player = locate_player(&episode_html, &self.main_url)?;
        debug!(content_id = %player.content_id, player = %player.url, "Located embedded player");

        let player_html = self.fetch(player.url.as_str()).await?;
        let (keys, extra_params) =
            inspect_player_page(&player_html, &player.content_id, self.adaptive_keys);
        let query = ajax_query(&player.content_id, &keys, extra_params.as_deref())?;

        let ajax_url = format!(
            "{}/encrypt-ajax.php?{query}",
            player.url.origin().ascii_serialization()
        );
        let body = self
            .client
            .fetch_text(
                &ajax_url,
                &[
                    ("X-Requested-With", "XMLHttpRequest"),
                    ("Referer", self.main_url.as_str()),
                ],
            )
            .await?;

        open_envelope(&body, &keys)
    }
}

#[async_trait]
impl Resolver for GogoanimeResolver {
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

/// Item ids carry either the bare category slug or a full path.
fn detail_path(payload: &str) -> String {
    if payload.starts_with('/') {
        payload.to_string()
    } else {
        format!("/category/{payload}")
    }
}

fn parse_search_page(html: &str) -> Vec<ContentItem> {
    let doc = Document::parse(html, DocumentKind::Html);
    doc.select(".last_episodes li")
        .iter()
        .filter_map(|row| {
            let link = row.select_first(".name a")?;
            let raw_title = link.text();
            let href = link.attr("href")?.trim();
            let title = raw_title.replace(" (Dub)", "").trim().to_string();
            if title.is_empty() || href.is_empty() {
                return None;
            }

            let mut extra = BTreeMap::new();
            if raw_title.contains("(Dub)") {
                extra.insert("dub".to_string(), "true".to_string());
            }

            Some(ContentItem {
                id: format!("{PROVIDER_NAME}:{}", href.replace("/category/", "")),
                kind: ContentKind::Series,
                title,
                poster_url: row
                    .select_first("img")
                    .and_then(|img| img.first_attr(&["src", "data-src"]))
                    .map(str::to_string),
                year: row.text_of(".released").and_then(|t| first_year(&t)),
                extra,
            })
        })
        .collect()
}

/// Fields scraped from an anime info page.
#[derive(Debug)]
struct DetailPage {
    title: String,
    kind: ContentKind,
    poster_url: Option<String>,
    description: Option<String>,
    genres: Vec<String>,
    year: Option<u32>,
    status: Option<String>,
    movie_id: String,
}

fn parse_detail_page(html: &str) -> Result<DetailPage> {
    let doc = Document::parse(html, DocumentKind::Html);
    let body = doc
        .select_first("#wrapper_bg .anime_info_body_bg")
        .ok_or_else(|| ResolveError::missing("anime info block"))?;
    let title = body
        .text_of("h1")
        .ok_or_else(|| ResolveError::missing("title"))?;

    let mut page = DetailPage {
        title,
        kind: ContentKind::Series,
        poster_url: body
            .select_first("img")
            .and_then(|img| img.first_attr(&["src", "data-src"]))
            .map(str::to_string),
        description: None,
        genres: Vec::new(),
        year: None,
        status: None,
        movie_id: String::new(),
    };

    for line in body.select("p.type") {
        let text = line.text();
        if let Some(plot) = text.strip_prefix("Plot Summary:") {
            page.description = Some(plot.trim().to_string()).filter(|d| !d.is_empty());
        } else if text.starts_with("Genre:") {
            page.genres = line
                .select("a")
                .iter()
                .map(|a| {
                    a.first_attr(&["title"])
                        .map_or_else(|| a.text(), str::to_string)
                        .trim_matches(|c: char| c == ',' || c.is_whitespace())
                        .to_string()
                })
                .filter(|g| !g.is_empty())
                .collect();
        } else if text.starts_with("Released:") {
            page.year = first_year(&text);
        } else if let Some(status) = text.strip_prefix("Status:") {
            page.status = Some(status.trim().to_string()).filter(|s| !s.is_empty());
        } else if let Some(kind) = text.strip_prefix("Type:") {
            if kind.to_lowercase().contains("movie") {
                page.kind = ContentKind::Movie;
            }
        }
    }

    page.movie_id = doc
        .attr_of("#movie_id", "value")
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ResolveError::missing("#movie_id"))?;

    Ok(page)
}

/// Episode links come newest first; they are returned in page order reversed.
fn parse_episode_list(html: &str) -> Vec<ChildEntry> {
    let doc = Document::parse(html, DocumentKind::Fragment);
    doc.select("a")
        .iter()
        .rev()
        .filter_map(|a| {
            let href = a.attr("href")?.trim();
            if href.is_empty() {
                return None;
            }
            let name = a.text_of(".name").unwrap_or_default().replace("EP", "");
            let episode = first_number(&name).unwrap_or(1);
            Some(ChildEntry {
                id: format!("{PROVIDER_NAME}:{href}"),
                title: format!("Episode {episode}"),
                season: 1,
                episode,
            })
        })
        .collect()
}

/// The embedded player referenced by an episode page.
#[derive(Debug)]
struct PlayerRef {
    url: Url,
    content_id: String,
}

fn locate_player(html: &str, base: &str) -> Result<PlayerRef> {
    let doc = Document::parse(html, DocumentKind::Html);
    let src = doc
        .attr_of("div.play-video iframe", "src")
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ResolveError::missing("player iframe"))?;
    let url = Url::parse(&absolute_url(base, src.trim()))
        .map_err(|e| ResolveError::missing(format!("valid player url ({e})")))?;

    // raw, not percent-decoded: the id is echoed back verbatim as `alias`
    let content_id = url
        .query()
        .and_then(|q| q.split('&').find_map(|p| p.strip_prefix("id=")))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ResolveError::missing("content id"))?;

    Ok(PlayerRef { url, content_id })
}

/// IV plus the request and response keys for one playback call.
#[derive(Debug, Clone, PartialEq, Eq)]
struct KeyMaterial {
    iv: String,
    key: String,
    decrypt_key: String,
}

impl KeyMaterial {
    fn fixed() -> Self {
        Self {
            iv: PLAYER_IV.to_string(),
            key: PLAYER_KEY.to_string(),
            decrypt_key: PLAYER_DECRYPT_KEY.to_string(),
        }
    }

    /// Keys derived from the IV in `div.wrapper[class*=container-]` and the
    /// base64-decoded content id. One key serves both directions.
    fn adaptive(player: &Document, content_id: &str) -> Option<Self> {
        let class = player.attr_of("div.wrapper", "class")?;
        let iv: String = class
            .split("container-")
            .nth(1)?
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        if iv.len() != 16 {
            return None;
        }

        let decoded = BASE64_LENIENT.decode(content_id).ok()?;
        let seed = format!("{}{iv}", String::from_utf8_lossy(&decoded));
        let key = derive_key(&seed);
        if key.len() != DERIVED_KEY_LEN {
            return None;
        }

        Some(Self {
            iv,
            decrypt_key: key.clone(),
            key,
        })
    }
}

/// Pick key material and recover the auxiliary query parameters, if any.
fn inspect_player_page(
    html: &str,
    content_id: &str,
    adaptive: bool,
) -> (KeyMaterial, Option<String>) {
    let doc = Document::parse(html, DocumentKind::Html);

    let keys = if adaptive {
        KeyMaterial::adaptive(&doc, content_id).unwrap_or_else(|| {
            debug!("Player page has no usable IV, using fixed keys");
            KeyMaterial::fixed()
        })
    } else {
        KeyMaterial::fixed()
    };

    let extra = doc
        .attr_of(r#"script[data-name="episode"]"#, "data-value")
        .and_then(|sealed| match decrypt(&sealed, &keys.iv, &keys.key) {
            Ok(plain) => plain
                .split_once('&')
                .map(|(_, rest)| rest.to_string())
                .filter(|rest| !rest.is_empty()),
            Err(e) => {
                debug!("Auxiliary player payload unusable, sending id-only request: {e}");
                None
            }
        });

    (keys, extra)
}

fn ajax_query(content_id: &str, keys: &KeyMaterial, extra: Option<&str>) -> Result<String> {
    let encrypted = encrypt(content_id, &keys.iv, &keys.key)?;
    let mut query = format!("id={}&alias={content_id}", urlencoding::encode(&encrypted));
    if let Some(extra) = extra {
        query.push('&');
        query.push_str(extra);
    }
    Ok(query)
}

#[derive(Debug, Deserialize)]
struct Envelope {
    data: String,
}

#[derive(Debug, Default, Deserialize)]
struct PlayerSources {
    #[serde(default)]
    source: Vec<SourceEntry>,
    #[serde(default, alias = "sourceBk")]
    source_bk: Vec<SourceEntry>,
}

#[derive(Debug, Deserialize)]
struct SourceEntry {
    file: Option<String>,
    label: Option<String>,
}

fn open_envelope(body: &str, keys: &KeyMaterial) -> Result<Vec<StreamCandidate>> {
    let envelope: Envelope = serde_json::from_str(body)?;
    let plain = decrypt(&envelope.data, &keys.iv, &keys.decrypt_key)?;
    let sources: PlayerSources = serde_json::from_str(&plain)?;

    Ok(sources
        .source
        .into_iter()
        .chain(sources.source_bk)
        .filter_map(|s| {
            let file = s.file.filter(|f| !f.is_empty())?;
            let label = s
                .label
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_QUALITY.to_string());
            Some(StreamCandidate::new(label, file, PROVIDER_NAME))
        })
        .collect())
}
