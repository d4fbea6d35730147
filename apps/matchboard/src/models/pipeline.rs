use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// Recruiter funnel stage. `Hired` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Saved,
    Invited,
    Screening,
    Interview,
    Offer,
    Hired,
    Rejected,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Saved,
        Stage::Invited,
        Stage::Screening,
        Stage::Interview,
        Stage::Offer,
        Stage::Hired,
        Stage::Rejected,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Hired | Stage::Rejected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Saved => "saved",
            Stage::Invited => "invited",
            Stage::Screening => "screening",
            Stage::Interview => "interview",
            Stage::Offer => "offer",
            Stage::Hired => "hired",
            Stage::Rejected => "rejected",
        }
    }

    /// Column heading used by the kanban board.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Saved => "Saved",
            Stage::Invited => "Invited",
            Stage::Screening => "Screening",
            Stage::Interview => "Interview",
            Stage::Offer => "Offer",
            Stage::Hired => "Hired",
            Stage::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| EngineError::InvalidArgument(format!("unknown pipeline stage '{s}'")))
    }
}

/// A saved candidate under recruiter review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineEntry {
    pub id: String,
    pub subject_id: String,
    pub stage: Stage,
    pub match_score_at_save_time: f64,
    pub saved_at: DateTime<Utc>,
}

impl PipelineEntry {
    pub fn new(id: impl Into<String>, subject_id: impl Into<String>, match_score: f64) -> Self {
        Self {
            id: id.into(),
            subject_id: subject_id.into(),
            stage: Stage::Saved,
            match_score_at_save_time: match_score,
            saved_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_hired_and_rejected_are_terminal() {
        let terminal: Vec<Stage> = Stage::ALL.into_iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![Stage::Hired, Stage::Rejected]);
    }

    #[test]
    fn test_stage_parses_case_insensitively() {
        assert_eq!("Interview".parse::<Stage>().unwrap(), Stage::Interview);
        assert_eq!(" offer ".parse::<Stage>().unwrap(), Stage::Offer);
        assert!(matches!(
            "archived".parse::<Stage>(),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_stage_labels_are_column_headings() {
        let labels: Vec<&str> = Stage::ALL.into_iter().map(Stage::label).collect();
        assert_eq!(
            labels,
            vec!["Saved", "Invited", "Screening", "Interview", "Offer", "Hired", "Rejected"]
        );
        assert_eq!(Stage::Offer.to_string(), "offer");
    }

    #[test]
    fn test_stage_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Stage::Screening).unwrap(), "\"screening\"");
    }

    #[test]
    fn test_new_entry_starts_saved() {
        let entry = PipelineEntry::new("p1", "C42", 0.81);
        assert_eq!(entry.stage, Stage::Saved);
        assert_eq!(entry.subject_id, "C42");
    }
}
