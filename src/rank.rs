//! Filtering, ordering and capping of stream candidates.
//!
//! A pure function of `(candidates, config)`:
//!
//! 1. **Filter**: with a preferred quality other than `any`, keep labels that
//!    contain the token's numeric part (`"1080p"` keeps `"HD 1080"`). No
//!    fallback: nothing matching means nothing returned.
//! 2. **Order**: under [`SortMode::QualityFirst`], stable sort along
//!    [`QUALITY_LADDER`]; labels off the ladder keep their relative order
//!    after every ladder match.
//! 3. **Cap**: keep at most [`ResolutionConfig::result_limit`] entries.

use crate::config::{Quality, ResolutionConfig, SortMode};
use crate::model::StreamCandidate;

/// Descending quality ordering used for ranking.
pub const QUALITY_LADDER: [&str; 4] = ["2160p", "1080p", "720p", "480p"];

/// Filter, order and truncate `candidates` per `config`.
pub fn rank(candidates: Vec<StreamCandidate>, config: &ResolutionConfig) -> Vec<StreamCandidate> {
    let mut kept = match &config.preferred_quality {
        Quality::Any => candidates,
        Quality::Token(token) => {
            let needle = quality_needle(token);
            candidates
                .into_iter()
                .filter(|c| c.label.to_lowercase().contains(&needle))
                .collect()
        }
    };

    match config.sort_mode {
        SortMode::QualityFirst => kept.sort_by_key(|c| ladder_index(&c.label).unwrap_or(usize::MAX)),
        SortMode::SizeFirst | SortMode::SpeedFirst => {}
    }

    truncate(kept, config)
}

/// Only apply the result ceiling.
pub fn truncate(
    mut candidates: Vec<StreamCandidate>,
    config: &ResolutionConfig,
) -> Vec<StreamCandidate> {
    candidates.truncate(config.result_limit());
    candidates
}

/// Position of `label` on [`QUALITY_LADDER`], if any rung matches.
pub fn ladder_index(label: &str) -> Option<usize> {
    let label = label.to_lowercase();
    QUALITY_LADDER
        .iter()
        .position(|rung| label.contains(&quality_needle(rung)))
}

/// Numeric part of a quality token, or the whole lowercased token if it has none.
fn quality_needle(token: &str) -> String {
    let digits: String = token.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        token.trim().to_lowercase()
    } else {
        digits
    }
}
