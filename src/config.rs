//! Caller preferences and the optional `~/.config/cinefetch/config.toml`.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Result ceiling used when none (or a non-positive one) is given.
pub const DEFAULT_RESULT_LIMIT: usize = 5;

/// Requested stream quality.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Quality {
    /// No filtering.
    #[default]
    Any,
    /// A label token such as `1080p`.
    Token(String),
}

impl FromStr for Quality {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("any") {
            Ok(Self::Any)
        } else {
            Ok(Self::Token(s.to_string()))
        }
    }
}

impl<'de> Deserialize<'de> for Quality {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(raw.parse().unwrap_or_default())
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Token(t) => f.write_str(t),
        }
    }
}

/// Candidate ordering policy.
///
/// Only `QualityFirst` reorders anything; the other two are accepted and
/// leave the resolver's order untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    #[default]
    QualityFirst,
    SizeFirst,
    SpeedFirst,
}

impl FromStr for SortMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "quality-first" | "quality" => Ok(Self::QualityFirst),
            "size-first" | "size" => Ok(Self::SizeFirst),
            "speed-first" | "speed" => Ok(Self::SpeedFirst),
            other => anyhow::bail!(
                "unknown sort mode: {other} (expected quality-first, size-first or speed-first)"
            ),
        }
    }
}

/// Preferences passed by reference through one pipeline call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionConfig {
    /// Enabled source names; empty means every registered source.
    pub providers: BTreeSet<String>,
    pub preferred_quality: Quality,
    result_limit: usize,
    pub sort_mode: SortMode,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            providers: BTreeSet::new(),
            preferred_quality: Quality::Any,
            result_limit: DEFAULT_RESULT_LIMIT,
            sort_mode: SortMode::QualityFirst,
        }
    }
}

impl ResolutionConfig {
    #[must_use]
    pub fn with_providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.providers = providers.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.preferred_quality = quality;
        self
    }

    /// Non-positive limits fall back to [`DEFAULT_RESULT_LIMIT`].
    #[must_use]
    pub fn with_result_limit(mut self, limit: i64) -> Self {
        self.result_limit = normalize_limit(Some(limit));
        self
    }

    #[must_use]
    pub fn with_sort_mode(mut self, mode: SortMode) -> Self {
        self.sort_mode = mode;
        self
    }

    /// Effective result ceiling, always positive.
    pub fn result_limit(&self) -> usize {
        self.result_limit
    }

    /// Whether `provider` is enabled (case-insensitive).
    pub fn provider_enabled(&self, provider: &str) -> bool {
        self.providers.is_empty()
            || self
                .providers
                .iter()
                .any(|p| p.eq_ignore_ascii_case(provider))
    }
}

fn normalize_limit(limit: Option<i64>) -> usize {
    match limit {
        Some(n) if n > 0 => usize::try_from(n).unwrap_or(DEFAULT_RESULT_LIMIT),
        _ => DEFAULT_RESULT_LIMIT,
    }
}

/// `[resolution]` table as written on disk.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "snake_case")]
struct RawResolution {
    providers: Vec<String>,
    preferred_quality: Option<Quality>,
    result_limit: Option<i64>,
    sort_mode: Option<SortMode>,
}

impl From<RawResolution> for ResolutionConfig {
    fn from(raw: RawResolution) -> Self {
        Self {
            providers: raw.providers.into_iter().collect(),
            preferred_quality: raw.preferred_quality.unwrap_or_default(),
            result_limit: normalize_limit(raw.result_limit),
            sort_mode: raw.sort_mode.unwrap_or_default(),
        }
    }
}

/// `[gogoanime]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GogoanimeSettings {
    /// Derive the request key from the player page instead of the fixed pair.
    pub adaptive_keys: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    resolution: RawResolution,
    tmdb_api_key: Option<String>,
    gogoanime: GogoanimeSettings,
}

/// Everything loaded from the config file.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub resolution: ResolutionConfig,
    /// Overrides the built-in StreamPlay/TMDB key.
    pub tmdb_api_key: Option<String>,
    pub gogoanime: GogoanimeSettings,
}

impl AppConfig {
    /// Load from the default location.
    ///
    /// A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("invalid TOML in {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(Self {
            resolution: file.resolution.into(),
            tmdb_api_key: file.tmdb_api_key.filter(|k| !k.trim().is_empty()),
            gogoanime: file.gogoanime,
        })
    }
}

/// Return the path to the config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cinefetch")
        .join("config.toml")
}
