//! Per-source resolvers behind one contract.
//!
//! # Architecture
//!
//! - [`Resolver`]: async trait with the three normalized operations
//! - [`ResolverRouter`]: dispatches `<source>:<payload>` ids to the owning resolver
//! - [`gogoanime`], [`bflix`], [`streamplay`]: the concrete sources
//!
//! Each resolver builds its pipeline from private hops returning
//! [`crate::error::Result`]. The trait methods never fail: an error at any hop
//! is logged and turned into an empty list or `None`.
//!
//! # Example
//!
//! ```rust,no_run
//! use cinefetch::config::ResolutionConfig;
//! use cinefetch::resolver::ResolverRouter;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let router = ResolverRouter::new()?;
//! let config = ResolutionConfig::default();
//!
//! for item in router.search("frieren", &config).await {
//!     println!("{} {}", item.id, item.title);
//! }
//! # Ok(())
//! # }
//! ```

pub mod bflix;
pub mod gogoanime;
pub mod streamplay;

use std::sync::LazyLock;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::{AppConfig, ResolutionConfig};
use crate::error::{ResolveError, Result};
use crate::http_client::HttpClient;
use crate::model::{ContentItem, DetailRecord, StreamCandidate};

pub use bflix::BflixResolver;
pub use gogoanime::GogoanimeResolver;
pub use streamplay::StreamPlayResolver;

/// One content source.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Source name, also the id prefix (e.g. `"Gogoanime"`).
    fn name(&self) -> &'static str;

    /// Returns `true` if `id` carries this resolver's prefix.
    fn matches(&self, id: &str) -> bool {
        id.split_once(':')
            .is_some_and(|(prefix, _)| prefix.eq_ignore_ascii_case(self.name()))
    }

    /// Search the catalog. Rows missing a title or link are skipped.
    async fn search(&self, query: &str, config: &ResolutionConfig) -> Vec<ContentItem>;

    /// Load full metadata for an item id returned by [`Resolver::search`].
    async fn load_detail(&self, id: &str, config: &ResolutionConfig) -> Option<DetailRecord>;

    /// Resolve a child-entry id into ranked, capped stream candidates.
    async fn resolve_playback(&self, id: &str, config: &ResolutionConfig) -> Vec<StreamCandidate>;
}

/// Split `<source>:<payload>` and check the source.
pub(crate) fn id_payload<'a>(id: &'a str, source: &str) -> Result<&'a str> {
    match id.split_once(':') {
        Some((prefix, payload)) if prefix.eq_ignore_ascii_case(source) && !payload.is_empty() => {
            Ok(payload)
        }
        _ => Err(ResolveError::InvalidId(id.to_string())),
    }
}

/// Log a failed hop and fall back to an empty value.
pub(crate) fn or_empty<T: Default>(source: &str, op: &str, subject: &str, result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("{source} {op} failed for {subject}: {e}");
            T::default()
        }
    }
}

/// Turn a path or protocol-relative URL into an absolute one.
pub(crate) fn absolute_url(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else if href.starts_with('/') {
        format!("{}{href}", base.trim_end_matches('/'))
    } else {
        format!("{}/{href}", base.trim_end_matches('/'))
    }
}

/// First four-digit run in `text`, read as a year.
pub(crate) fn first_year(text: &str) -> Option<u32> {
    static YEAR_REGEX: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"(\d{4})").unwrap());

    YEAR_REGEX
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// First run of digits in `text`.
pub(crate) fn first_number(text: &str) -> Option<u32> {
    static NUMBER_REGEX: LazyLock<regex::Regex> =
        LazyLock::new(|| regex::Regex::new(r"(\d+)").unwrap());

    NUMBER_REGEX
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Routes ids to the resolver that issued them.
///
/// Resolvers are checked in registration order. Searches fan out sequentially
/// over the enabled resolvers and concatenate in that order.
pub struct ResolverRouter {
    resolvers: Vec<Box<dyn Resolver>>,
}

impl ResolverRouter {
    /// Create a router with all built-in resolvers and default settings.
    pub fn new() -> Result<Self> {
        Self::from_config(&AppConfig::default())
    }

    /// Create a router with all built-in resolvers configured from `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = HttpClient::new()?;
        let mut gogo = GogoanimeResolver::new(client.clone());
        if config.gogoanime.adaptive_keys {
            gogo = gogo.with_adaptive_keys(true);
        }
        let mut streamplay = StreamPlayResolver::new(client.clone());
        if let Some(key) = &config.tmdb_api_key {
            streamplay = streamplay.with_api_key(key.clone());
        }

        Ok(Self::with_resolvers(vec![
            Box::new(gogo),
            Box::new(BflixResolver::new(client)),
            Box::new(streamplay),
        ]))
    }

    /// Create a router over an explicit resolver list.
    pub fn with_resolvers(resolvers: Vec<Box<dyn Resolver>>) -> Self {
        Self { resolvers }
    }

    /// Names of all registered resolvers, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    /// Name of the resolver that issued `id`, enabled or not.
    pub fn owner(&self, id: &str) -> Option<&'static str> {
        self.resolvers.iter().find(|r| r.matches(id)).map(|r| r.name())
    }

    fn route(&self, id: &str, config: &ResolutionConfig) -> Option<&dyn Resolver> {
        let resolver = self.resolvers.iter().find(|r| r.matches(id))?;
        if !config.provider_enabled(resolver.name()) {
            debug!("Resolver {} disabled for {id}", resolver.name());
            return None;
        }
        debug!("Matched resolver: {}", resolver.name());
        Some(resolver.as_ref())
    }

    /// Search every enabled resolver.
    pub async fn search(&self, query: &str, config: &ResolutionConfig) -> Vec<ContentItem> {
        let mut items = Vec::new();
        for resolver in &self.resolvers {
            if config.provider_enabled(resolver.name()) {
                items.extend(resolver.search(query, config).await);
            }
        }
        items
    }

    /// Load detail from the resolver owning `id`.
    pub async fn load_detail(&self, id: &str, config: &ResolutionConfig) -> Option<DetailRecord> {
        self.route(id, config)?.load_detail(id, config).await
    }

    /// Resolve playback through the resolver owning `id`.
    pub async fn resolve_playback(
        &self,
        id: &str,
        config: &ResolutionConfig,
    ) -> Vec<StreamCandidate> {
        match self.route(id, config) {
            Some(resolver) => resolver.resolve_playback(id, config).await,
            None => Vec::new(),
        }
    }
}
