//! Request-level operations over a [`VectorStore`] and an [`EmbeddingProvider`].
//!
//! Handlers hold one [`FixflowService`] behind an `Arc`. Every embed call and every store call is
//! bounded by a configured timeout, so a wedged provider or pool surfaces as [`Error::Timeout`].

pub mod feedback;
pub mod issues;
pub mod search;
pub mod trending;

mod error;

pub use error::{Error, Result};
pub use feedback::FeedbackResponse;
pub use fixflow_providers::{BoxFuture, EmbeddingProvider};
pub use fixflow_storage::VectorStore;
pub use issues::CreateIssueRequest;
pub use search::{SearchItem, SearchRequest};

use std::{future::Future, sync::Arc, time::Duration};

use uuid::Uuid;

use fixflow_config::Config;

pub struct FixflowService {
	pub cfg: Config,
	pub store: Arc<dyn VectorStore>,
	pub embedding: Arc<dyn EmbeddingProvider>,
}
impl FixflowService {
	pub fn new(
		cfg: Config,
		store: Arc<dyn VectorStore>,
		embedding: Arc<dyn EmbeddingProvider>,
	) -> Self {
		Self { cfg, store, embedding }
	}

	/// Builds the embedding provider, then opens the configured store.
	///
	/// Provider failures here are fatal for the caller; no placeholder is substituted.
	pub async fn connect(cfg: Config) -> Result<Self> {
		let embedding = fixflow_providers::connect(&cfg.providers.embedding).await.map_err(|err| {
			tracing::error!(error = %err, "Embedding provider failed to initialize.");

			Error::from(err)
		})?;
		let store = fixflow_storage::open(&cfg.storage).await?;

		if embedding.dimensions() != store.vector_dim() {
			let message = format!(
				"Embedding provider yields {} dimensions; the store holds {}.",
				embedding.dimensions(),
				store.vector_dim()
			);

			store.close().await;

			return Err(Error::InvalidRequest { message });
		}

		Ok(Self::new(cfg, store, embedding))
	}

	/// Closes the store. In-flight requests should be drained first.
	pub async fn shutdown(&self) {
		self.store.close().await;

		tracing::info!(backend = self.store.backend().as_str(), "Store closed.");
	}

	pub(crate) async fn embed(&self, text: &str) -> Result<Vec<f32>> {
		let timeout_ms = self.cfg.providers.embedding.timeout_ms;
		let outcome = tokio::time::timeout(
			Duration::from_millis(timeout_ms),
			self.embedding.embed(text),
		)
		.await;

		match outcome {
			Ok(Ok(vec)) => Ok(vec),
			Ok(Err(err)) => {
				tracing::warn!(
					provider_id = self.embedding.provider_id(),
					error = %err,
					"Embedding call failed."
				);

				Err(err.into())
			},
			Err(_) => {
				tracing::warn!(
					provider_id = self.embedding.provider_id(),
					timeout_ms,
					"Embedding call timed out."
				);

				Err(Error::Timeout { operation: "embed", timeout_ms })
			},
		}
	}

	pub(crate) async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
	where
		F: Future<Output = fixflow_storage::Result<T>>,
	{
		let timeout_ms = self.cfg.service.request_timeout_ms;

		match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
			Ok(result) => result.map_err(Error::from),
			Err(_) => {
				tracing::warn!(operation, timeout_ms, "Store operation timed out.");

				Err(Error::Timeout { operation, timeout_ms })
			},
		}
	}
}

/// Ids arrive as free text from the HTTP path. Anything that is not a UUID cannot exist.
pub(crate) fn parse_issue_id(raw: &str) -> Result<Uuid> {
	Uuid::parse_str(raw.trim())
		.map_err(|_| Error::NotFound { message: format!("issue {raw}") })
}

pub(crate) fn resolve_limit(
	requested: Option<u32>,
	default_limit: u32,
	max_limit: u32,
) -> Result<u32> {
	let limit = requested.unwrap_or(default_limit);

	if limit == 0 || limit > max_limit {
		return Err(Error::InvalidRequest {
			message: format!("limit must be between 1 and {max_limit}."),
		});
	}

	Ok(limit)
}
