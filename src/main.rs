//! `cinefetch` CLI - search sources, load details, resolve playable streams

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cinefetch::{AppConfig, Quality, ResolutionConfig, ResolverRouter, SortMode};

#[derive(Parser)]
#[command(name = "cinefetch")]
#[command(about = "Resolve media metadata and playable streams from several sources")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Preferred quality token (e.g. 1080p), or "any"
    #[arg(short, long, global = true)]
    quality: Option<String>,

    /// Maximum number of streams to return
    #[arg(short, long, global = true, allow_negative_numbers = true)]
    limit: Option<i64>,

    /// Sort mode: quality-first, size-first or speed-first
    #[arg(short, long, global = true)]
    sort: Option<String>,

    /// Only use these sources (comma-separated)
    #[arg(short, long, global = true, value_delimiter = ',')]
    providers: Vec<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search every enabled source
    Search {
        /// Search terms
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Load the detail record for an item id
    Meta {
        /// Item id from `search` (e.g. "Gogoanime:naruto")
        id: String,
    },

    /// Resolve playable streams for a child id
    Streams {
        /// Child id from `meta` (e.g. "StreamPlay:603:movie:0:0")
        id: String,
    },

    /// List registered sources
    Providers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let app = AppConfig::load()?;
    let config = resolution_config(&cli, app.resolution.clone())?;
    let router = ResolverRouter::from_config(&app)?;

    match &cli.command {
        Commands::Search { query } => {
            cmd_search(&router, &query.join(" "), &config, cli.json).await?;
        }
        Commands::Meta { id } => {
            ensure_known(&router, id)?;
            cmd_meta(&router, id, &config, cli.json).await?;
        }
        Commands::Streams { id } => {
            ensure_known(&router, id)?;
            cmd_streams(&router, id, &config, cli.json).await?;
        }
        Commands::Providers => {
            cmd_providers(&router, &config, cli.json)?;
        }
    }

    Ok(())
}

/// Log to stderr. `-v` wins over `CINEFETCH_LOG`, which wins over `RUST_LOG`.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("cinefetch=debug")
    } else {
        std::env::var("CINEFETCH_LOG")
            .ok()
            .and_then(|v| EnvFilter::try_new(v).ok())
            .or_else(|| EnvFilter::try_from_default_env().ok())
            .unwrap_or_else(|| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Layer command-line flags over the config file.
fn resolution_config(cli: &Cli, mut config: ResolutionConfig) -> Result<ResolutionConfig> {
    if let Some(quality) = &cli.quality {
        let quality: Quality = quality.parse().unwrap_or_default();
        config = config.with_quality(quality);
    }
    if let Some(limit) = cli.limit {
        config = config.with_result_limit(limit);
    }
    if let Some(sort) = &cli.sort {
        let mode: SortMode = sort.parse()?;
        config = config.with_sort_mode(mode);
    }
    if !cli.providers.is_empty() {
        config = config.with_providers(
            cli.providers
                .iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty()),
        );
    }
    Ok(config)
}

fn ensure_known(router: &ResolverRouter, id: &str) -> Result<()> {
    if router.owner(id).is_none() {
        anyhow::bail!(
            "no source issues id {id:?} (known sources: {})",
            router.names().join(", ")
        );
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to encode JSON")?;
    println!("{text}");
    Ok(())
}

async fn cmd_search(
    router: &ResolverRouter,
    query: &str,
    config: &ResolutionConfig,
    json: bool,
) -> Result<()> {
    let items = router.search(query, config).await;
    if json {
        return print_json(&items);
    }

    println!("🔍 {query}: {} results", items.len());
    for item in &items {
        let year = item.year.map(|y| format!(" ({y})")).unwrap_or_default();
        println!("  [{}] {}{year}", item.kind, item.title);
        println!("      {}", item.id);
    }
    Ok(())
}

async fn cmd_meta(
    router: &ResolverRouter,
    id: &str,
    config: &ResolutionConfig,
    json: bool,
) -> Result<()> {
    let Some(detail) = router.load_detail(id, config).await else {
        anyhow::bail!("no detail found for {id}");
    };
    if json {
        return print_json(&detail);
    }

    println!("🎬 {} [{}]", detail.title, detail.kind);
    if let Some(year) = detail.release_year {
        println!("   Year: {year}");
    }
    if !detail.genres.is_empty() {
        println!("   Genres: {}", detail.genres.join(", "));
    }
    for (key, value) in &detail.extra {
        println!("   {key}: {value}");
    }
    if let Some(description) = &detail.description {
        println!("\n{description}\n");
    }

    println!("📺 {} entries", detail.children.len());
    for child in &detail.children {
        println!(
            "  S{:02}E{:02} {}  {}",
            child.season, child.episode, child.title, child.id
        );
    }
    Ok(())
}

async fn cmd_streams(
    router: &ResolverRouter,
    id: &str,
    config: &ResolutionConfig,
    json: bool,
) -> Result<()> {
    let streams = router.resolve_playback(id, config).await;
    if json {
        return print_json(&streams);
    }

    if streams.is_empty() {
        println!("⚠️  No streams for {id}");
        return Ok(());
    }
    for stream in &streams {
        println!("▶️  [{}] {}", stream.source_name, stream.label);
        println!("    {}", stream.url);
    }
    Ok(())
}

fn cmd_providers(router: &ResolverRouter, config: &ResolutionConfig, json: bool) -> Result<()> {
    #[derive(Serialize)]
    struct ProviderRow {
        name: &'static str,
        enabled: bool,
    }

    let rows: Vec<ProviderRow> = router
        .names()
        .into_iter()
        .map(|name| ProviderRow {
            name,
            enabled: config.provider_enabled(name),
        })
        .collect();

    if json {
        return print_json(&rows);
    }
    for row in &rows {
        let mark = if row.enabled { "✓" } else { "✗" };
        println!("{mark} {}", row.name);
    }
    Ok(())
}
