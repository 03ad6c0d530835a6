use serde::{Deserialize, Serialize};

use crate::{Error, FixflowService, Result};
use fixflow_domain::{IssueRecord, Metadata};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	/// Falls back to `search.default_limit`.
	pub limit: Option<u32>,
	/// Exact-match constraints on issue metadata. Every entry must match.
	pub filters: Option<Metadata>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchItem {
	#[serde(flatten)]
	pub issue: IssueRecord,
	pub score: f64,
}

impl FixflowService {
	pub async fn search_issues(&self, req: SearchRequest) -> Result<Vec<SearchItem>> {
		if req.query.trim().is_empty() {
			return Err(Error::InvalidRequest { message: "query must be non-empty.".to_string() });
		}

		let limit = crate::resolve_limit(
			req.limit,
			self.cfg.search.default_limit,
			self.cfg.search.max_limit,
		)?;
		let filters = req.filters.unwrap_or_default();
		let query = self.embed(&req.query).await?;
		let hits = self.bounded("search", self.store.search(&query, limit, &filters)).await?;

		tracing::debug!(limit, filters = filters.len(), hits = hits.len(), "Search finished.");

		Ok(hits.into_iter().map(|hit| SearchItem { issue: hit.issue, score: hit.score }).collect())
	}
}
