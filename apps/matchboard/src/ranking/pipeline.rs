//! Ranked list pipeline: normalize, filter, sort and paginate match records.
//!
//! The pipeline is a pure function of its inputs: records are never mutated and
//! repeated calls with the same arguments yield identical pages.
//!
//! Fixed order:
//! 1. Normalize every record's score
//! 2. `min_score` filter, compared in percent space
//! 3. Categorical, boolean and range filters as a fail-closed conjunction
//! 4. Sort by `SortSpec`, ties broken by `subject_id` ascending
//! 5. Clamp the page index and slice

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::models::{AttributeValue, MatchRecord};
use crate::ranking::normalizer::{NormalizedScore, ScoreNormalizer};
use crate::ranking::stats::{aggregate, Stats};

// ────────────────────────────────────────────────────────────────────────────
// Filters
// ────────────────────────────────────────────────────────────────────────────

/// A categorical filter value: a single scalar or a set of accepted scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryFilter {
    One(AttributeValue),
    AnyOf(Vec<AttributeValue>),
}

impl CategoryFilter {
    fn accepts(&self, value: &AttributeValue) -> bool {
        match self {
            CategoryFilter::One(expected) => expected.matches(value),
            CategoryFilter::AnyOf(options) => options.iter().any(|o| o.matches(value)),
        }
    }
}

/// Inclusive numeric bounds over an attribute such as `experienceYears`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NumericRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl NumericRange {
    fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

/// Immutable filter value object. Every UI change produces a new `FilterState`
/// through the `with_*` builders, which keeps cache diffing a plain `==`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterState {
    pub min_score: f64,
    pub categorical_filters: BTreeMap<String, CategoryFilter>,
    pub boolean_filters: BTreeMap<String, bool>,
    pub range_filters: BTreeMap<String, NumericRange>,
}

impl FilterState {
    pub fn with_min_score(&self, min_score: f64) -> Self {
        Self {
            min_score: clamp_min_score(min_score),
            ..self.clone()
        }
    }

    pub fn with_category(&self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        let mut next = self.clone();
        next.categorical_filters
            .insert(key.into(), CategoryFilter::One(value.into()));
        next
    }

    pub fn with_any_of<V: Into<AttributeValue>>(
        &self,
        key: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let mut next = self.clone();
        next.categorical_filters.insert(
            key.into(),
            CategoryFilter::AnyOf(values.into_iter().map(Into::into).collect()),
        );
        next
    }

    pub fn with_flag(&self, key: impl Into<String>, value: bool) -> Self {
        let mut next = self.clone();
        next.boolean_filters.insert(key.into(), value);
        next
    }

    pub fn with_range(&self, key: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        let mut next = self.clone();
        next.range_filters
            .insert(key.into(), NumericRange { min, max });
        next
    }

    pub fn without(&self, key: &str) -> Self {
        let mut next = self.clone();
        next.categorical_filters.remove(key);
        next.boolean_filters.remove(key);
        next.range_filters.remove(key);
        next
    }

    /// Step 2 of the pipeline. Compared in percent space so thresholds such as
    /// 50/70/85 behave the same whichever scale the score arrived in.
    pub fn passes_min_score(&self, score: &NormalizedScore) -> bool {
        score.value * 100.0 >= clamp_min_score(self.min_score) * 100.0
    }

    /// Step 3 of the pipeline. A missing attribute rejects the record.
    pub fn passes_attributes(&self, record: &MatchRecord) -> bool {
        let categorical = self.categorical_filters.iter().all(|(key, filter)| {
            record
                .attribute(key)
                .map_or(false, |value| filter.accepts(value))
        });
        let boolean = self.boolean_filters.iter().all(|(key, expected)| {
            record
                .attribute(key)
                .and_then(AttributeValue::as_bool)
                .map_or(false, |actual| actual == *expected)
        });
        let range = self.range_filters.iter().all(|(key, bounds)| {
            record
                .attribute(key)
                .and_then(AttributeValue::as_f64)
                .map_or(false, |value| bounds.contains(value))
        });
        categorical && boolean && range
    }
}

fn clamp_min_score(min_score: f64) -> f64 {
    if min_score.is_nan() {
        0.0
    } else {
        min_score.clamp(0.0, 1.0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sorting and paging
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Score,
    Experience,
    Location,
    Date,
}

impl SortField {
    /// Attribute backing each non-score sort field.
    pub fn attribute_key(self) -> Option<&'static str> {
        match self {
            SortField::Score => None,
            SortField::Experience => Some("experienceYears"),
            SortField::Location => Some("location"),
            SortField::Date => Some("date"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Defaults to `{ score, desc }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortSpec {
    #[serde(default)]
    pub field: SortField,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }
}

pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageWindow {
    pub page_size: usize,
    #[serde(default)]
    pub page_index: usize,
}

impl PageWindow {
    pub fn new(page_size: usize, page_index: usize) -> Self {
        Self {
            page_size,
            page_index,
        }
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.page_size == 0 {
            return Err(EngineError::InvalidArgument(
                "page size must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PageWindow {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, 0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Output models
// ────────────────────────────────────────────────────────────────────────────

/// A match record paired with its derived score. The source record is cloned,
/// never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMatch {
    #[serde(flatten)]
    pub record: MatchRecord,
    pub score: NormalizedScore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedPage {
    pub items: Vec<ScoredMatch>,
    pub total_matched: usize,
    pub page_count: usize,
    /// Page actually served after clamping.
    pub page_index: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct RankedListPipeline {
    normalizer: ScoreNormalizer,
}

impl RankedListPipeline {
    pub fn new(normalizer: ScoreNormalizer) -> Self {
        Self { normalizer }
    }

    /// Step 1: derive a score for every record.
    pub fn score(&self, records: &[MatchRecord]) -> Vec<ScoredMatch> {
        records
            .iter()
            .map(|record| ScoredMatch {
                score: self.normalizer.normalize(&record.raw_score),
                record: record.clone(),
            })
            .collect()
    }

    /// Steps 1-3: the post-filter, pre-pagination set. This is what `aggregate`
    /// should be fed so summary counts ignore the page being displayed.
    pub fn filtered(&self, records: &[MatchRecord], filters: &FilterState) -> Vec<ScoredMatch> {
        filter_scored(self.score(records), filters)
    }

    pub fn rank(
        &self,
        records: &[MatchRecord],
        filters: &FilterState,
        sort: &SortSpec,
        page: &PageWindow,
    ) -> Result<RankedPage, EngineError> {
        rank_scored(self.filtered(records, filters), sort, page)
    }

    /// Ranks a page and summarizes the whole filtered set in one normalization pass.
    pub fn rank_with_stats(
        &self,
        records: &[MatchRecord],
        filters: &FilterState,
        sort: &SortSpec,
        page: &PageWindow,
    ) -> Result<(RankedPage, Stats), EngineError> {
        page.validate()?;
        let filtered = self.filtered(records, filters);
        let stats = aggregate(&filtered);
        Ok((rank_scored(filtered, sort, page)?, stats))
    }
}

/// Steps 2-3 over already-scored matches, so normalized values are reused.
pub fn filter_scored(scored: Vec<ScoredMatch>, filters: &FilterState) -> Vec<ScoredMatch> {
    scored
        .into_iter()
        .filter(|m| filters.passes_min_score(&m.score))
        .filter(|m| filters.passes_attributes(&m.record))
        .collect()
}

/// Steps 4-5 over an already-filtered set. Scores are taken as given, never
/// recomputed from the raw score.
pub fn rank_scored(
    filtered: Vec<ScoredMatch>,
    sort: &SortSpec,
    page: &PageWindow,
) -> Result<RankedPage, EngineError> {
    page.validate()?;
    Ok(paginate(filtered, sort, page))
}

fn paginate(mut filtered: Vec<ScoredMatch>, sort: &SortSpec, page: &PageWindow) -> RankedPage {
    filtered.sort_by(|a, b| compare_matches(a, b, sort));

    let total_matched = filtered.len();
    let page_count = total_matched.div_ceil(page.page_size);
    let page_index = page.page_index.min(page_count.saturating_sub(1));

    let items: Vec<ScoredMatch> = filtered
        .into_iter()
        .skip(page_index * page.page_size)
        .take(page.page_size)
        .collect();

    RankedPage {
        items,
        total_matched,
        page_count,
        page_index,
    }
}

fn compare_matches(a: &ScoredMatch, b: &ScoredMatch, sort: &SortSpec) -> Ordering {
    let primary = match sort.field.attribute_key() {
        None => sort.direction.apply(a.score.value.total_cmp(&b.score.value)),
        Some(key) => compare_attribute(a.record.attribute(key), b.record.attribute(key), sort.direction),
    };
    primary.then_with(|| a.record.subject_id.cmp(&b.record.subject_id))
}

/// Records lacking the attribute go last in either direction.
fn compare_attribute(
    a: Option<&AttributeValue>,
    b: Option<&AttributeValue>,
    direction: SortDirection,
) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => direction.apply(a.sort_cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
