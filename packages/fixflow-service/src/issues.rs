use serde::{Deserialize, Serialize};

use crate::{Error, FixflowService, Result};
use fixflow_domain::{IssueRecord, Metadata, NewIssue};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateIssueRequest {
	pub title: String,
	pub content: String,
	pub solution: String,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default)]
	pub metadata: Metadata,
}
impl From<CreateIssueRequest> for NewIssue {
	fn from(req: CreateIssueRequest) -> Self {
		Self {
			title: req.title,
			content: req.content,
			solution: req.solution,
			tags: req.tags,
			metadata: req.metadata,
		}
	}
}

impl FixflowService {
	/// Embeds title, content and solution together, then stores the issue.
	///
	/// A title that already exists returns the stored record unchanged.
	pub async fn create_issue(&self, req: CreateIssueRequest) -> Result<IssueRecord> {
		let candidate = NewIssue::from(req);

		candidate
			.validate()
			.map_err(|code| Error::InvalidRequest { message: code.to_string() })?;

		let embedding = self.embed(&candidate.embedding_text()).await?;
		let record =
			self.bounded("save_issue", self.store.save_issue(&candidate, &embedding)).await?;

		tracing::info!(issue_id = %record.id, "Issue stored.");

		Ok(record)
	}

	pub async fn get_issue(&self, issue_id: &str) -> Result<IssueRecord> {
		let issue_id = crate::parse_issue_id(issue_id)?;

		self.bounded("get_issue", self.store.get_issue(issue_id)).await
	}
}
