use time::OffsetDateTime;

use crate::{FixflowService, Result};
use fixflow_domain::IssueRecord;

impl FixflowService {
	/// Ranks issues by engagement decayed with age, evaluated at the current time.
	pub async fn list_trending(&self, limit: Option<u32>) -> Result<Vec<IssueRecord>> {
		let limit = crate::resolve_limit(
			limit,
			self.cfg.trending.default_limit,
			self.cfg.trending.max_limit,
		)?;

		self.bounded("trending", self.store.trending(limit, OffsetDateTime::now_utc())).await
	}
}
