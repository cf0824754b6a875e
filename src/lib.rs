//! `cinefetch` - media source resolution
//!
//! Turns a search query into normalized items, an item into a detail record,
//! and a detail child into directly playable stream URLs, across sources that
//! each expose their data differently.
//!
//! # Features
//!
//! - **Resolvers**: Gogoanime (HTML + encrypted player AJAX), Bflix (HTML +
//!   VRF-signed server lookups), StreamPlay (TMDB JSON API)
//! - **Crypto**: AES-CBC envelope recovery and key derivation, RC4 VRF tokens
//! - **Ranking**: quality filter, quality ladder ordering, result ceiling
//! - **Fail to empty**: a broken source answers with nothing instead of an error
//!
//! # Example
//!
//! ```rust,no_run
//! use cinefetch::{ResolutionConfig, ResolverRouter};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let router = ResolverRouter::new()?;
//!     let config = ResolutionConfig::default().with_result_limit(3);
//!
//!     let items = router.search("cowboy bebop", &config).await;
//!     if let Some(item) = items.first() {
//!         if let Some(detail) = router.load_detail(&item.id, &config).await {
//!             if let Some(first) = detail.children.first() {
//!                 for stream in router.resolve_playback(&first.id, &config).await {
//!                     println!("{} {}", stream.label, stream.url);
//!                 }
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crypto;
pub mod error;
pub mod extract;
pub mod http_client;
pub mod model;
pub mod rank;
pub mod resolver;

pub use config::{AppConfig, Quality, ResolutionConfig, SortMode};
pub use error::ResolveError;
pub use http_client::HttpClient;
pub use model::{ChildEntry, ContentItem, ContentKind, DetailRecord, StreamCandidate};
pub use resolver::{
    BflixResolver, GogoanimeResolver, Resolver, ResolverRouter, StreamPlayResolver,
};

/// Version of cinefetch
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
