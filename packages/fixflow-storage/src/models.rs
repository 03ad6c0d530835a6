use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use fixflow_domain::{IssueRecord, Metadata};

#[derive(Debug, sqlx::FromRow)]
pub struct IssueRow {
	pub issue_id: Uuid,
	pub title: String,
	pub content: String,
	pub solution: String,
	pub tags: Vec<String>,
	pub metadata: Value,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
	pub view_count: i64,
	pub useful_count: i64,
}
impl IssueRow {
	pub fn into_record(self) -> IssueRecord {
		let metadata = match self.metadata {
			Value::Object(map) => map,
			_ => Metadata::new(),
		};

		IssueRecord {
			id: self.issue_id,
			title: self.title,
			content: self.content,
			solution: self.solution,
			tags: self.tags,
			metadata,
			created_at: self.created_at,
			updated_at: self.updated_at,
			view_count: self.view_count.max(0) as u64,
			useful_count: self.useful_count.max(0) as u64,
		}
	}
}

#[derive(Debug, sqlx::FromRow)]
pub struct ScoredIssueRow {
	#[sqlx(flatten)]
	pub issue: IssueRow,
	pub score: f64,
}
