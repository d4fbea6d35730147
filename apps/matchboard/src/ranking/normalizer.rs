//! Score normalizer: folds every upstream score shape into one `NormalizedScore`.
//!
//! Normalization is total: out-of-range and non-finite inputs are clamped, never
//! rejected. Inputs that cannot produce a confident score come back as `0.0` with
//! `ambiguous = true` so the UI can render "score unavailable".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::RawScore;

// ────────────────────────────────────────────────────────────────────────────
// Quality tiers
// ────────────────────────────────────────────────────────────────────────────

/// Tier thresholds in percent space, closed-above at each boundary.
const EXCELLENT_PERCENT: f64 = 85.0;
const GOOD_PERCENT: f64 = 70.0;
const FAIR_PERCENT: f64 = 50.0;

/// Coarse quality bucket. Declaration order is the ordering: Low < Fair < Good < Excellent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    Fair,
    Good,
    Excellent,
}

impl QualityTier {
    pub const ALL: [QualityTier; 4] = [
        QualityTier::Excellent,
        QualityTier::Good,
        QualityTier::Fair,
        QualityTier::Low,
    ];

    /// The single tier rule shared by every view.
    pub fn from_value(value: f64) -> Self {
        let percent = value * 100.0;
        if percent >= EXCELLENT_PERCENT {
            QualityTier::Excellent
        } else if percent >= GOOD_PERCENT {
            QualityTier::Good
        } else if percent >= FAIR_PERCENT {
            QualityTier::Fair
        } else {
            QualityTier::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityTier::Excellent => "Excellent match",
            QualityTier::Good => "Good match",
            QualityTier::Fair => "Fair match",
            QualityTier::Low => "Low match",
        }
    }

    /// Badge colour key for summary cards.
    pub fn badge(self) -> &'static str {
        match self {
            QualityTier::Excellent => "green",
            QualityTier::Good => "blue",
            QualityTier::Fair => "amber",
            QualityTier::Low => "grey",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Normalized score
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedScore {
    pub value: f64, // 0.0 - 1.0
    pub tier: QualityTier,
    pub ambiguous: bool,
}

impl NormalizedScore {
    fn confident(value: f64) -> Self {
        Self {
            value,
            tier: QualityTier::from_value(value),
            ambiguous: false,
        }
    }

    fn unavailable() -> Self {
        Self {
            value: 0.0,
            tier: QualityTier::Low,
            ambiguous: true,
        }
    }

    pub fn percent(&self) -> f64 {
        self.value * 100.0
    }
}

/// Caller-supplied weights for sub-score components, keyed by component name.
pub type ScoreWeights = BTreeMap<String, f64>;

// ────────────────────────────────────────────────────────────────────────────
// Normalizer
// ────────────────────────────────────────────────────────────────────────────

/// Normalizer configured with optional sub-score weights.
#[derive(Debug, Clone, Default)]
pub struct ScoreNormalizer {
    weights: Option<ScoreWeights>,
}

impl ScoreNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty weight map behaves like no weights at all.
    pub fn with_weights(weights: ScoreWeights) -> Self {
        Self {
            weights: (!weights.is_empty()).then_some(weights),
        }
    }

    pub fn normalize(&self, raw: &RawScore) -> NormalizedScore {
        normalize(raw, self.weights.as_ref())
    }
}

/// Converts any `RawScore` into a `NormalizedScore`. Never fails.
pub fn normalize(raw: &RawScore, weights: Option<&ScoreWeights>) -> NormalizedScore {
    match raw {
        RawScore::Percent { value } => clamp_to_score(*value / 100.0),
        RawScore::Fraction { value } => clamp_to_score(*value),
        RawScore::SubScores { components } => {
            normalize_sub_scores(components, weights.filter(|w| !w.is_empty()))
        }
    }
}

fn clamp_to_score(value: f64) -> NormalizedScore {
    if value.is_nan() {
        return NormalizedScore::unavailable();
    }
    NormalizedScore::confident(value.clamp(0.0, 1.0))
}

/// Weighted (or plain) mean over the components that are actually present.
/// Weights are renormalized over the intersection of weight and component keys,
/// so a missing component never drags the score towards zero.
fn normalize_sub_scores(
    components: &BTreeMap<String, f64>,
    weights: Option<&ScoreWeights>,
) -> NormalizedScore {
    let present: Vec<(&str, f64)> = components
        .iter()
        .filter(|(_, v)| !v.is_nan())
        .map(|(k, v)| (k.as_str(), v.clamp(0.0, 1.0)))
        .collect();

    if present.is_empty() {
        return NormalizedScore::unavailable();
    }

    let value = match weights {
        Some(weights) => {
            let mut total_weight = 0.0_f64;
            let mut weighted_sum = 0.0_f64;
            for (key, component) in &present {
                let Some(weight) = weights.get(*key) else {
                    continue;
                };
                let weight = if weight.is_finite() { weight.max(0.0) } else { 0.0 };
                total_weight += weight;
                weighted_sum += weight * component;
            }
            if total_weight <= 0.0 {
                return NormalizedScore::unavailable();
            }
            weighted_sum / total_weight
        }
        None => present.iter().map(|(_, v)| v).sum::<f64>() / present.len() as f64,
    };

    NormalizedScore::confident(value.clamp(0.0, 1.0))
}
