// Match ranking: score normalization, the filter/sort/paginate pipeline and
// dashboard statistics. Everything here is pure and synchronous.

pub mod normalizer;
pub mod pipeline;
pub mod stats;

pub use normalizer::{normalize, NormalizedScore, QualityTier, ScoreNormalizer, ScoreWeights};
pub use pipeline::{
    filter_scored, rank_scored, CategoryFilter, FilterState, NumericRange, PageWindow,
    RankedListPipeline, RankedPage, ScoredMatch, SortDirection, SortField, SortSpec,
};
pub use stats::{aggregate, Stats};
