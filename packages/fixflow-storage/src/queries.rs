use serde_json::Value;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Result,
	db::Db,
	models::{IssueRow, ScoredIssueRow},
};
use fixflow_domain::{
	CounterKind, Metadata, NewIssue,
	scoring::{
		POPULARITY_WEIGHT, SEARCH_USEFUL_WEIGHT, TRENDING_AGE_OFFSET_HOURS, TRENDING_GRAVITY,
		TRENDING_USEFUL_WEIGHT,
	},
};

const ISSUE_COLUMNS: &str = "\
issue_id, title, content, solution, tags, metadata, created_at, updated_at, \
view_count, useful_count";

/// Inserts the issue unless the title is taken. `None` means another row already owns the title.
pub async fn insert_issue(
	db: &Db,
	issue_id: Uuid,
	candidate: &NewIssue,
	embedding: &str,
	now: OffsetDateTime,
) -> Result<Option<IssueRow>> {
	let sql = format!(
		"\
INSERT INTO issues (
	issue_id,
	title,
	content,
	solution,
	tags,
	metadata,
	created_at,
	updated_at,
	embedding
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $7, $8::text::vector)
ON CONFLICT (title) DO NOTHING
RETURNING {ISSUE_COLUMNS}"
	);
	let row = sqlx::query_as::<_, IssueRow>(&sql)
		.bind(issue_id)
		.bind(candidate.title.as_str())
		.bind(candidate.content.as_str())
		.bind(candidate.solution.as_str())
		.bind(candidate.tags.as_slice())
		.bind(Value::Object(candidate.metadata.clone()))
		.bind(now)
		.bind(embedding)
		.fetch_optional(&db.pool)
		.await?;

	Ok(row)
}

pub async fn fetch_issue(db: &Db, issue_id: Uuid) -> Result<Option<IssueRow>> {
	let sql = format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE issue_id = $1");
	let row = sqlx::query_as::<_, IssueRow>(&sql).bind(issue_id).fetch_optional(&db.pool).await?;

	Ok(row)
}

pub async fn fetch_issue_by_title(db: &Db, title: &str) -> Result<Option<IssueRow>> {
	let sql = format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE title = $1");
	let row = sqlx::query_as::<_, IssueRow>(&sql).bind(title).fetch_optional(&db.pool).await?;

	Ok(row)
}

/// Hybrid-score ranking computed inside Postgres. Filters push down as exact `jsonb` equality per
/// metadata key.
pub async fn search_issues(
	db: &Db,
	query: &str,
	query_is_zero: bool,
	limit: u32,
	filters: &Metadata,
) -> Result<Vec<ScoredIssueRow>> {
	let mut builder = QueryBuilder::<Postgres>::new("SELECT ");

	builder.push(ISSUE_COLUMNS);
	builder.push(", ");
	push_similarity(&mut builder, query, query_is_zero);
	builder.push(" * ");
	builder.push(popularity_boost_sql());
	builder.push(" AS score FROM issues WHERE TRUE");

	for (key, value) in filters {
		builder.push(" AND metadata -> ");
		builder.push_bind(key.as_str());
		builder.push("::text = ");
		builder.push_bind(value.clone());
		builder.push("::jsonb");
	}

	builder.push(" ORDER BY score DESC, seq ASC LIMIT ");
	builder.push_bind(i64::from(limit));

	let rows = builder.build_query_as::<ScoredIssueRow>().fetch_all(&db.pool).await?;

	Ok(rows)
}

/// Gravity-decay ranking evaluated against `now`.
pub async fn trending_issues(db: &Db, limit: u32, now: OffsetDateTime) -> Result<Vec<IssueRow>> {
	let mut builder = QueryBuilder::<Postgres>::new("SELECT ");

	builder.push(ISSUE_COLUMNS);
	builder.push(format_args!(
		" FROM issues ORDER BY (view_count + {TRENDING_USEFUL_WEIGHT} * useful_count + 1)::float8 \
		 / power(GREATEST(EXTRACT(EPOCH FROM ("
	));
	builder.push_bind(now);
	builder.push(format_args!(
		"::timestamptz - created_at))::float8 / 3600.0, 0) + {TRENDING_AGE_OFFSET_HOURS}, \
		 {TRENDING_GRAVITY}::float8) DESC, seq ASC LIMIT "
	));
	builder.push_bind(i64::from(limit));

	let rows = builder.build_query_as::<IssueRow>().fetch_all(&db.pool).await?;

	Ok(rows)
}

/// Atomic `+1` on one counter. Returns the number of rows touched (0 or 1).
pub async fn increment_counter(
	db: &Db,
	issue_id: Uuid,
	kind: CounterKind,
	now: OffsetDateTime,
) -> Result<u64> {
	let sql = match kind {
		CounterKind::View =>
			"UPDATE issues SET view_count = view_count + 1, updated_at = $2 WHERE issue_id = $1",
		CounterKind::Useful => "UPDATE issues SET useful_count = useful_count + 1, updated_at = $2 \
			 WHERE issue_id = $1",
	};
	let result = sqlx::query(sql).bind(issue_id).bind(now).execute(&db.pool).await?;

	Ok(result.rows_affected())
}

pub fn vector_to_pg(vec: &[f32]) -> String {
	let mut out = String::with_capacity(vec.len() * 8);

	out.push('[');

	for (i, value) in vec.iter().enumerate() {
		if i > 0 {
			out.push(',');
		}

		out.push_str(&value.to_string());
	}

	out.push(']');

	out
}

/// Cosine similarity against the bound query. Zero norms and a NaN distance both score 0, so a
/// degenerate row can never sort ahead of real matches.
fn push_similarity<'a>(
	builder: &mut QueryBuilder<'a, Postgres>,
	query: &'a str,
	query_is_zero: bool,
) {
	builder.push("(CASE WHEN ");
	builder.push_bind(query_is_zero);
	builder.push(
		" OR vector_norm(embedding) = 0 THEN 0::float8 \
		 ELSE COALESCE(NULLIF(1 - (embedding <=> ",
	);
	builder.push_bind(query);
	builder.push("::text::vector), 'NaN'::float8), 0::float8) END)");
}

fn popularity_boost_sql() -> String {
	format!(
		"(1 + {POPULARITY_WEIGHT} * \
		 ln((view_count + {SEARCH_USEFUL_WEIGHT} * useful_count + 1)::float8))"
	)
}
