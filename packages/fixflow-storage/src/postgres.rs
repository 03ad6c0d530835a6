//! Durable backend on PostgreSQL + pgvector. Ranking arithmetic runs inside the query.

use time::OffsetDateTime;
use uuid::Uuid;

use crate::{BoxFuture, Error, Result, ScoredIssue, VectorStore, db::Db, queries};
use fixflow_config::StorageBackend;
use fixflow_domain::{CounterKind, IssueRecord, Metadata, NewIssue};

pub struct PersistentStore {
	db: Db,
	vector_dim: u32,
}
impl PersistentStore {
	/// Connects the pool, then creates the extension, table and indexes if missing.
	pub async fn connect(cfg: &fixflow_config::Postgres, vector_dim: u32) -> Result<Self> {
		let db = Db::connect(cfg).await?;

		db.ensure_schema(vector_dim).await?;

		tracing::info!(vector_dim, "Postgres schema ready.");

		Ok(Self { db, vector_dim })
	}

	pub fn from_db(db: Db, vector_dim: u32) -> Self {
		Self { db, vector_dim }
	}

	pub fn db(&self) -> &Db {
		&self.db
	}

	async fn save(&self, candidate: &NewIssue, embedding: &[f32]) -> Result<IssueRecord> {
		crate::validate_candidate(candidate, embedding, self.vector_dim)?;

		let vec_text = queries::vector_to_pg(embedding);
		let inserted = queries::insert_issue(
			&self.db,
			Uuid::new_v4(),
			candidate,
			vec_text.as_str(),
			OffsetDateTime::now_utc(),
		)
		.await?;

		if let Some(row) = inserted {
			return Ok(row.into_record());
		}

		// The unique title index rejected the insert; hand back the row that owns the title.
		let Some(existing) = queries::fetch_issue_by_title(&self.db, &candidate.title).await? else {
			return Err(Error::Conflict(format!(
				"title {:?} conflicted but no owning row was found.",
				candidate.title
			)));
		};
		let existing = existing.into_record();

		tracing::info!(issue_id = %existing.id, "Issue title already stored; keeping existing.");

		Ok(existing)
	}

	async fn get(&self, issue_id: Uuid) -> Result<IssueRecord> {
		queries::fetch_issue(&self.db, issue_id)
			.await?
			.map(|row| row.into_record())
			.ok_or_else(|| crate::issue_not_found(issue_id))
	}

	async fn search_ranked(
		&self,
		query: &[f32],
		limit: u32,
		filters: &Metadata,
	) -> Result<Vec<ScoredIssue>> {
		crate::validate_query(query, limit, self.vector_dim)?;

		let query_is_zero = query.iter().all(|value| *value == 0.0);
		let vec_text = queries::vector_to_pg(query);
		let rows =
			queries::search_issues(&self.db, vec_text.as_str(), query_is_zero, limit, filters)
				.await?;

		Ok(rows
			.into_iter()
			.map(|row| ScoredIssue { issue: row.issue.into_record(), score: row.score })
			.collect())
	}

	async fn trending_ranked(&self, limit: u32, now: OffsetDateTime) -> Result<Vec<IssueRecord>> {
		if limit == 0 {
			return Err(Error::InvalidArgument("limit must be greater than zero.".to_string()));
		}

		let rows = queries::trending_issues(&self.db, limit, now).await?;

		Ok(rows.into_iter().map(|row| row.into_record()).collect())
	}

	async fn increment(&self, issue_id: Uuid, kind: CounterKind) -> Result<()> {
		let touched =
			queries::increment_counter(&self.db, issue_id, kind, OffsetDateTime::now_utc()).await?;

		if touched == 0 {
			return Err(crate::issue_not_found(issue_id));
		}

		Ok(())
	}
}
impl VectorStore for PersistentStore {
	fn backend(&self) -> StorageBackend {
		StorageBackend::Postgres
	}

	fn vector_dim(&self) -> u32 {
		self.vector_dim
	}

	fn save_issue<'a>(
		&'a self,
		candidate: &'a NewIssue,
		embedding: &'a [f32],
	) -> BoxFuture<'a, Result<IssueRecord>> {
		Box::pin(self.save(candidate, embedding))
	}

	fn get_issue<'a>(&'a self, issue_id: Uuid) -> BoxFuture<'a, Result<IssueRecord>> {
		Box::pin(self.get(issue_id))
	}

	fn search<'a>(
		&'a self,
		query: &'a [f32],
		limit: u32,
		filters: &'a Metadata,
	) -> BoxFuture<'a, Result<Vec<ScoredIssue>>> {
		Box::pin(self.search_ranked(query, limit, filters))
	}

	fn trending<'a>(
		&'a self,
		limit: u32,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Vec<IssueRecord>>> {
		Box::pin(self.trending_ranked(limit, now))
	}

	fn increment_counter<'a>(
		&'a self,
		issue_id: Uuid,
		kind: CounterKind,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.increment(issue_id, kind))
	}

	fn close<'a>(&'a self) -> BoxFuture<'a, ()> {
		Box::pin(self.db.close())
	}
}
