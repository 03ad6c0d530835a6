pub mod issue;
pub mod scoring;
pub mod time_serde;

pub use issue::{
	CounterKind, IssueRecord, Metadata, NewIssue, RejectCode, UnknownCounterKind, matches_filters,
};
