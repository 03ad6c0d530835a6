//! In-process backend. Every query is a full scan; nothing survives a restart.

use std::{
	collections::HashMap,
	sync::{Mutex, RwLock},
};

use time::OffsetDateTime;
use uuid::Uuid;

use crate::{BoxFuture, Result, ScoredIssue, VectorStore};
use fixflow_config::StorageBackend;
use fixflow_domain::{
	CounterKind, IssueRecord, Metadata, NewIssue, matches_filters,
	scoring::{age_hours, cosine_similarity, hybrid_score, trending_score},
};

pub struct EphemeralStore {
	vector_dim: u32,
	inner: RwLock<Inner>,
}
impl EphemeralStore {
	pub fn new(vector_dim: u32) -> Self {
		Self { vector_dim, inner: RwLock::new(Inner::default()) }
	}

	pub fn len(&self) -> usize {
		self.inner.read().unwrap_or_else(|err| err.into_inner()).entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn save_sync(&self, candidate: &NewIssue, embedding: &[f32]) -> Result<IssueRecord> {
		crate::validate_candidate(candidate, embedding, self.vector_dim)?;

		// Check and insert under one write lock so concurrent saves of a title cannot both win.
		let mut inner = self.inner.write().unwrap_or_else(|err| err.into_inner());

		if let Some(&index) = inner.by_title.get(&candidate.title) {
			let existing = inner.entries[index].snapshot();

			tracing::info!(
				issue_id = %existing.id,
				"Issue title already stored; keeping existing."
			);

			return Ok(existing);
		}

		let record = IssueRecord::create(candidate, OffsetDateTime::now_utc());
		let index = inner.entries.len();

		inner.by_id.insert(record.id, index);
		inner.by_title.insert(record.title.clone(), index);
		inner
			.entries
			.push(Entry { record: Mutex::new(record.clone()), embedding: embedding.to_vec() });

		Ok(record)
	}

	fn get_sync(&self, issue_id: Uuid) -> Result<IssueRecord> {
		let inner = self.inner.read().unwrap_or_else(|err| err.into_inner());

		inner.entry(issue_id).map(Entry::snapshot).ok_or_else(|| crate::issue_not_found(issue_id))
	}

	fn search_sync(
		&self,
		query: &[f32],
		limit: u32,
		filters: &Metadata,
	) -> Result<Vec<ScoredIssue>> {
		crate::validate_query(query, limit, self.vector_dim)?;

		let inner = self.inner.read().unwrap_or_else(|err| err.into_inner());
		let mut scored: Vec<ScoredIssue> = inner
			.entries
			.iter()
			.filter_map(|entry| {
				let issue = entry.snapshot();

				if !matches_filters(&issue.metadata, filters) {
					return None;
				}

				let similarity = cosine_similarity(query, &entry.embedding);
				let score = hybrid_score(similarity, issue.view_count, issue.useful_count);

				Some(ScoredIssue { issue, score })
			})
			.collect();

		// Stable sort: equal scores keep insertion order.
		scored.sort_by(|a, b| b.score.total_cmp(&a.score));
		scored.truncate(limit as usize);

		Ok(scored)
	}

	fn trending_sync(&self, limit: u32, now: OffsetDateTime) -> Result<Vec<IssueRecord>> {
		if limit == 0 {
			return Err(crate::Error::InvalidArgument(
				"limit must be greater than zero.".to_string(),
			));
		}

		let inner = self.inner.read().unwrap_or_else(|err| err.into_inner());
		let mut scored: Vec<(f64, IssueRecord)> = inner
			.entries
			.iter()
			.map(|entry| {
				let issue = entry.snapshot();
				let score = trending_score(
					issue.view_count,
					issue.useful_count,
					age_hours(issue.created_at, now),
				);

				(score, issue)
			})
			.collect();

		scored.sort_by(|a, b| b.0.total_cmp(&a.0));
		scored.truncate(limit as usize);

		Ok(scored.into_iter().map(|(_, issue)| issue).collect())
	}

	fn increment_sync(&self, issue_id: Uuid, kind: CounterKind) -> Result<()> {
		let inner = self.inner.read().unwrap_or_else(|err| err.into_inner());
		let entry = inner.entry(issue_id).ok_or_else(|| crate::issue_not_found(issue_id))?;
		let mut record = entry.record.lock().unwrap_or_else(|err| err.into_inner());

		record.bump(kind, OffsetDateTime::now_utc());

		Ok(())
	}
}
impl VectorStore for EphemeralStore {
	fn backend(&self) -> StorageBackend {
		StorageBackend::Ephemeral
	}

	fn vector_dim(&self) -> u32 {
		self.vector_dim
	}

	fn save_issue<'a>(
		&'a self,
		candidate: &'a NewIssue,
		embedding: &'a [f32],
	) -> BoxFuture<'a, Result<IssueRecord>> {
		Box::pin(async move { self.save_sync(candidate, embedding) })
	}

	fn get_issue<'a>(&'a self, issue_id: Uuid) -> BoxFuture<'a, Result<IssueRecord>> {
		Box::pin(async move { self.get_sync(issue_id) })
	}

	fn search<'a>(
		&'a self,
		query: &'a [f32],
		limit: u32,
		filters: &'a Metadata,
	) -> BoxFuture<'a, Result<Vec<ScoredIssue>>> {
		Box::pin(async move { self.search_sync(query, limit, filters) })
	}

	fn trending<'a>(
		&'a self,
		limit: u32,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Vec<IssueRecord>>> {
		Box::pin(async move { self.trending_sync(limit, now) })
	}

	fn increment_counter<'a>(
		&'a self,
		issue_id: Uuid,
		kind: CounterKind,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { self.increment_sync(issue_id, kind) })
	}

	fn close<'a>(&'a self) -> BoxFuture<'a, ()> {
		Box::pin(async {})
	}
}

#[derive(Default)]
struct Inner {
	entries: Vec<Entry>,
	by_id: HashMap<Uuid, usize>,
	by_title: HashMap<String, usize>,
}
impl Inner {
	fn entry(&self, issue_id: Uuid) -> Option<&Entry> {
		self.by_id.get(&issue_id).map(|&index| &self.entries[index])
	}
}

struct Entry {
	/// Counters and `updated_at` change under this per-record lock; everything else is fixed.
	record: Mutex<IssueRecord>,
	embedding: Vec<f32>,
}
impl Entry {
	fn snapshot(&self) -> IssueRecord {
		self.record.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}
