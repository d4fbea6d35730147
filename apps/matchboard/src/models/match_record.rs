use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A scalar facet attached to a match record (job type, location, salary fit, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl AttributeValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Equality used by categorical filters. Text compares ASCII case-insensitively;
    /// values of different kinds never match.
    pub fn matches(&self, other: &AttributeValue) -> bool {
        match (self, other) {
            (AttributeValue::Bool(a), AttributeValue::Bool(b)) => a == b,
            (AttributeValue::Number(a), AttributeValue::Number(b)) => a == b,
            (AttributeValue::Text(a), AttributeValue::Text(b)) => {
                a.trim().eq_ignore_ascii_case(b.trim())
            }
            _ => false,
        }
    }

    /// Total order used when sorting by an attribute.
    /// Mixed kinds order as bool < number < text.
    pub fn sort_cmp(&self, other: &AttributeValue) -> Ordering {
        match (self, other) {
            (AttributeValue::Bool(a), AttributeValue::Bool(b)) => a.cmp(b),
            (AttributeValue::Number(a), AttributeValue::Number(b)) => a.total_cmp(b),
            (AttributeValue::Text(a), AttributeValue::Text(b)) => a
                .to_ascii_lowercase()
                .cmp(&b.to_ascii_lowercase())
                .then_with(|| a.cmp(b)),
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            AttributeValue::Bool(_) => 0,
            AttributeValue::Number(_) => 1,
            AttributeValue::Text(_) => 2,
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Number(value as f64)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

/// Score exactly as returned by one of the upstream ranking strategies.
/// The tag removes any guessing about whether a number is a percent or a fraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum RawScore {
    #[serde(rename = "percent0to100")]
    Percent { value: f64 },

    #[serde(rename = "fraction0to1")]
    Fraction { value: f64 },

    /// Per-dimension breakdown (qualification, experience, skills, location, ...),
    /// each component a fraction in 0-1.
    #[serde(rename = "subScores")]
    SubScores { components: BTreeMap<String, f64> },
}

/// One candidate-to-job or job-to-candidate pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub subject_id: String,
    pub raw_score: RawScore,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Ordered, advisory reasons. Never used in ranking.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub explanation: Vec<String>,
}

impl MatchRecord {
    pub fn new(subject_id: impl Into<String>, raw_score: RawScore) -> Self {
        Self {
            subject_id: subject_id.into(),
            raw_score,
            attributes: BTreeMap::new(),
            explanation: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_score_deserializes_by_kind_tag() {
        let percent: RawScore =
            serde_json::from_value(json!({"kind": "percent0to100", "value": 72})).unwrap();
        assert_eq!(percent, RawScore::Percent { value: 72.0 });

        let fraction: RawScore =
            serde_json::from_value(json!({"kind": "fraction0to1", "value": 0.4})).unwrap();
        assert_eq!(fraction, RawScore::Fraction { value: 0.4 });

        let sub: RawScore = serde_json::from_value(json!({
            "kind": "subScores",
            "components": {"skills": 0.9, "location": 0.5}
        }))
        .unwrap();
        match sub {
            RawScore::SubScores { components } => assert_eq!(components.len(), 2),
            other => panic!("unexpected variant {other:?}"),
        }
    }

    #[test]
    fn test_match_record_accepts_mixed_attributes() {
        let record: MatchRecord = serde_json::from_value(json!({
            "subjectId": "J7",
            "rawScore": {"kind": "fraction0to1", "value": 0.8},
            "attributes": {"jobType": "full-time", "salaryFit": true, "experienceYears": 4}
        }))
        .unwrap();

        assert_eq!(record.attribute("jobType"), Some(&AttributeValue::from("full-time")));
        assert_eq!(record.attribute("salaryFit"), Some(&AttributeValue::Bool(true)));
        assert_eq!(record.attribute("experienceYears").and_then(|v| v.as_f64()), Some(4.0));
        assert!(record.explanation.is_empty());
    }

    #[test]
    fn test_text_match_is_case_insensitive() {
        assert!(AttributeValue::from("Remote").matches(&AttributeValue::from("remote ")));
        assert!(!AttributeValue::from("1").matches(&AttributeValue::Number(1.0)));
    }

    #[test]
    fn test_sort_cmp_orders_mixed_kinds() {
        let b = AttributeValue::Bool(true);
        let n = AttributeValue::Number(3.0);
        let t = AttributeValue::from("a");
        assert_eq!(b.sort_cmp(&n), Ordering::Less);
        assert_eq!(t.sort_cmp(&n), Ordering::Greater);
        assert_eq!(
            AttributeValue::from("berlin").sort_cmp(&AttributeValue::from("Amsterdam")),
            Ordering::Greater
        );
    }
}
