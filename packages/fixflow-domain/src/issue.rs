use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

pub type Metadata = Map<String, Value>;

/// An issue as returned to readers. The embedding is stored next to it but never exposed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRecord {
	pub id: Uuid,
	pub title: String,
	pub content: String,
	pub solution: String,
	pub tags: Vec<String>,
	pub metadata: Metadata,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
	pub view_count: u64,
	pub useful_count: u64,
}
impl IssueRecord {
	/// Materializes a fresh record with zeroed counters.
	pub fn create(candidate: &NewIssue, now: OffsetDateTime) -> Self {
		Self {
			id: Uuid::new_v4(),
			title: candidate.title.clone(),
			content: candidate.content.clone(),
			solution: candidate.solution.clone(),
			tags: candidate.tags.clone(),
			metadata: candidate.metadata.clone(),
			created_at: now,
			updated_at: now,
			view_count: 0,
			useful_count: 0,
		}
	}

	/// Adds one to the counter for `kind` and stamps `updated_at`.
	pub fn bump(&mut self, kind: CounterKind, now: OffsetDateTime) {
		let counter = match kind {
			CounterKind::View => &mut self.view_count,
			CounterKind::Useful => &mut self.useful_count,
		};

		*counter = counter.saturating_add(1);
		self.updated_at = now;
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewIssue {
	pub title: String,
	pub content: String,
	pub solution: String,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default)]
	pub metadata: Metadata,
}
impl NewIssue {
	pub fn validate(&self) -> Result<(), RejectCode> {
		if self.title.trim().is_empty() {
			return Err(RejectCode::EmptyTitle);
		}
		if self.content.trim().is_empty() {
			return Err(RejectCode::EmptyContent);
		}
		if self.solution.trim().is_empty() {
			return Err(RejectCode::EmptySolution);
		}

		Ok(())
	}

	/// Text handed to the embedding provider when the issue is created.
	pub fn embedding_text(&self) -> String {
		format!("{}\n{}\n{}", self.title, self.content, self.solution)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectCode {
	EmptyTitle,
	EmptyContent,
	EmptySolution,
}
impl RejectCode {
	pub fn field(self) -> &'static str {
		match self {
			Self::EmptyTitle => "title",
			Self::EmptyContent => "content",
			Self::EmptySolution => "solution",
		}
	}
}
impl fmt::Display for RejectCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} must be non-empty.", self.field())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterKind {
	View,
	Useful,
}
impl CounterKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::View => "view",
			Self::Useful => "useful",
		}
	}
}
impl FromStr for CounterKind {
	type Err = UnknownCounterKind;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw {
			"view" => Ok(Self::View),
			"useful" => Ok(Self::Useful),
			other => Err(UnknownCounterKind(other.to_string())),
		}
	}
}
impl fmt::Display for CounterKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown counter kind {0:?}; expected view or useful.")]
pub struct UnknownCounterKind(pub String);

/// True when every filter key is present in `metadata` with an equal JSON value.
pub fn matches_filters(metadata: &Metadata, filters: &Metadata) -> bool {
	filters.iter().all(|(key, expected)| metadata.get(key) == Some(expected))
}
