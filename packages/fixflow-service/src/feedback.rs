use serde::{Deserialize, Serialize};

use crate::{Error, FixflowService, Result};
use fixflow_domain::CounterKind;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeedbackResponse {
	pub ok: bool,
}

impl FixflowService {
	/// Adds one to the counter named by `kind` (`view` or `useful`).
	pub async fn record_feedback(&self, issue_id: &str, kind: &str) -> Result<FeedbackResponse> {
		let kind: CounterKind =
			kind.parse().map_err(|err: fixflow_domain::UnknownCounterKind| Error::InvalidRequest {
				message: err.to_string(),
			})?;
		let issue_id = crate::parse_issue_id(issue_id)?;

		self.bounded("increment_counter", self.store.increment_counter(issue_id, kind)).await?;

		tracing::debug!(issue_id = %issue_id, kind = kind.as_str(), "Feedback recorded.");

		Ok(FeedbackResponse { ok: true })
	}
}
