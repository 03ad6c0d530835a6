pub mod db;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod queries;
pub mod schema;

mod error;

pub use error::Error;

use std::{future::Future, pin::Pin, sync::Arc};

use time::OffsetDateTime;
use uuid::Uuid;

use fixflow_config::StorageBackend;
use fixflow_domain::{CounterKind, IssueRecord, Metadata, NewIssue};

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredIssue {
	pub issue: IssueRecord,
	pub score: f64,
}

/// Persistence plus ranking for issues. Both backends honor the same ordering contract:
/// non-increasing score, ties broken by insertion order.
pub trait VectorStore
where
	Self: Send + Sync,
{
	fn backend(&self) -> StorageBackend;

	fn vector_dim(&self) -> u32;

	/// Inserts `candidate`, or returns the existing record untouched when the title is taken.
	fn save_issue<'a>(
		&'a self,
		candidate: &'a NewIssue,
		embedding: &'a [f32],
	) -> BoxFuture<'a, Result<IssueRecord>>;

	fn get_issue<'a>(&'a self, issue_id: Uuid) -> BoxFuture<'a, Result<IssueRecord>>;

	/// Ranks issues whose metadata matches every entry of `filters` by hybrid score.
	fn search<'a>(
		&'a self,
		query: &'a [f32],
		limit: u32,
		filters: &'a Metadata,
	) -> BoxFuture<'a, Result<Vec<ScoredIssue>>>;

	/// Ranks all issues by trending score evaluated at `now`.
	fn trending<'a>(
		&'a self,
		limit: u32,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Vec<IssueRecord>>>;

	fn increment_counter<'a>(
		&'a self,
		issue_id: Uuid,
		kind: CounterKind,
	) -> BoxFuture<'a, Result<()>>;

	/// Releases backend resources. The store must not be used afterwards.
	fn close<'a>(&'a self) -> BoxFuture<'a, ()>;
}

/// Opens the backend selected by `cfg.backend`, bootstrapping the schema for Postgres.
pub async fn open(cfg: &fixflow_config::Storage) -> Result<Arc<dyn VectorStore>> {
	let store: Arc<dyn VectorStore> = match cfg.backend {
		StorageBackend::Ephemeral => Arc::new(memory::EphemeralStore::new(cfg.vector_dim)),
		StorageBackend::Postgres => {
			let Some(postgres) = cfg.postgres.as_ref() else {
				return Err(Error::InvalidArgument(
					"storage.postgres is required for the postgres backend.".to_string(),
				));
			};

			Arc::new(postgres::PersistentStore::connect(postgres, cfg.vector_dim).await?)
		},
	};

	tracing::info!(
		backend = store.backend().as_str(),
		vector_dim = cfg.vector_dim,
		"Store opened."
	);

	Ok(store)
}

pub(crate) fn validate_candidate(
	candidate: &NewIssue,
	embedding: &[f32],
	vector_dim: u32,
) -> Result<()> {
	candidate.validate().map_err(|code| Error::InvalidArgument(code.to_string()))?;

	validate_vector("embedding", embedding, vector_dim)
}

pub(crate) fn validate_query(query: &[f32], limit: u32, vector_dim: u32) -> Result<()> {
	if limit == 0 {
		return Err(Error::InvalidArgument("limit must be greater than zero.".to_string()));
	}

	validate_vector("query embedding", query, vector_dim)
}

fn validate_vector(label: &str, vec: &[f32], vector_dim: u32) -> Result<()> {
	if vec.len() != vector_dim as usize {
		return Err(Error::InvalidArgument(format!(
			"{label} has {} dimensions; expected {vector_dim}.",
			vec.len()
		)));
	}
	if vec.iter().any(|value| !value.is_finite()) {
		return Err(Error::InvalidArgument(format!("{label} must contain only finite values.")));
	}

	// pgvector sums squares in f32; keep vectors whose norm it can represent so both backends
	// score them alike.
	let norm_sq: f32 = vec.iter().map(|value| value * value).sum();

	if !norm_sq.is_finite() {
		return Err(Error::InvalidArgument(format!("{label} magnitude is too large to compare.")));
	}
	if norm_sq == 0.0 && vec.iter().any(|value| *value != 0.0) {
		return Err(Error::InvalidArgument(format!("{label} magnitude is too small to compare.")));
	}

	Ok(())
}

pub(crate) fn issue_not_found(issue_id: Uuid) -> Error {
	Error::NotFound(format!("issue {issue_id}"))
}
