use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ranking::normalizer::QualityTier;
use crate::ranking::pipeline::ScoredMatch;

/// Summary numbers behind the dashboard cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub average_percent: u32,
    pub max_percent: u32,
    pub min_percent: u32,
    /// Always holds all four tiers.
    pub count_by_tier: BTreeMap<QualityTier, usize>,
    pub ambiguous_count: usize,
}

impl Stats {
    fn empty() -> Self {
        Self {
            total: 0,
            average_percent: 0,
            max_percent: 0,
            min_percent: 0,
            count_by_tier: QualityTier::ALL.into_iter().map(|t| (t, 0)).collect(),
            ambiguous_count: 0,
        }
    }
}

/// Aggregates the post-filter, pre-pagination set in a single pass, reusing the
/// scores already attached to each match. Percentages round half away from zero.
pub fn aggregate(matches: &[ScoredMatch]) -> Stats {
    let mut stats = Stats::empty();
    if matches.is_empty() {
        return stats;
    }

    let mut sum = 0.0_f64;
    let mut max = f64::MIN;
    let mut min = f64::MAX;

    for m in matches {
        let percent = m.score.percent();
        sum += percent;
        max = max.max(percent);
        min = min.min(percent);
        *stats.count_by_tier.entry(m.score.tier).or_insert(0) += 1;
        if m.score.ambiguous {
            stats.ambiguous_count += 1;
        }
    }

    stats.total = matches.len();
    stats.average_percent = round_percent(sum / matches.len() as f64);
    stats.max_percent = round_percent(max);
    stats.min_percent = round_percent(min);
    stats
}

fn round_percent(percent: f64) -> u32 {
    percent.round().clamp(0.0, 100.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchRecord, RawScore};
    use crate::ranking::pipeline::RankedListPipeline;

    fn scored(records: Vec<MatchRecord>) -> Vec<ScoredMatch> {
        RankedListPipeline::default().score(&records)
    }

    #[test]
    fn test_empty_input_is_all_zero() {
        let stats = aggregate(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.average_percent, 0);
        assert_eq!(stats.max_percent, 0);
        assert_eq!(stats.min_percent, 0);
        assert_eq!(stats.count_by_tier.len(), 4);
        assert!(stats.count_by_tier.values().all(|c| *c == 0));
    }

    #[test]
    fn test_identical_records() {
        let records: Vec<MatchRecord> = (0..6)
            .map(|i| MatchRecord::new(format!("R{i}"), RawScore::Fraction { value: 0.9 }))
            .collect();
        let stats = aggregate(&scored(records));
        assert_eq!(stats.total, 6);
        assert_eq!(stats.average_percent, 90);
        assert_eq!(stats.count_by_tier[&QualityTier::Excellent], 6);
        assert_eq!(stats.count_by_tier[&QualityTier::Low], 0);
    }

    #[test]
    fn test_half_rounds_away_from_zero() {
        let records = vec![
            MatchRecord::new("a", RawScore::Percent { value: 60.0 }),
            MatchRecord::new("b", RawScore::Percent { value: 61.0 }),
        ];
        let stats = aggregate(&scored(records));
        assert_eq!(stats.average_percent, 61);
        assert_eq!(stats.max_percent, 61);
        assert_eq!(stats.min_percent, 60);
    }

    #[test]
    fn test_ambiguous_scores_are_counted() {
        let records = vec![
            MatchRecord::new("a", RawScore::SubScores { components: Default::default() }),
            MatchRecord::new("b", RawScore::Fraction { value: 0.72 }),
        ];
        let stats = aggregate(&scored(records));
        assert_eq!(stats.ambiguous_count, 1);
        assert_eq!(stats.count_by_tier[&QualityTier::Low], 1);
        assert_eq!(stats.count_by_tier[&QualityTier::Good], 1);
        assert_eq!(stats.min_percent, 0);
        assert_eq!(stats.max_percent, 72);
    }

    #[test]
    fn test_tier_counts_serialize_as_object() {
        let json = serde_json::to_value(aggregate(&[])).unwrap();
        assert_eq!(json["countByTier"]["excellent"], 0);
        assert_eq!(json["averagePercent"], 0);
    }
}
