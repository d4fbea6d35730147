pub mod match_record;
pub mod pipeline;

pub use match_record::{AttributeValue, MatchRecord, RawScore};
pub use pipeline::{PipelineEntry, Stage};
