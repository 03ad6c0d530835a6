use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{Error, Result, schema};

/// Serializes concurrent schema bootstraps across processes.
const SCHEMA_LOCK_ID: i64 = 3_490_217;

pub struct Db {
	pub pool: PgPool,
}
impl Db {
	pub async fn connect(cfg: &fixflow_config::Postgres) -> Result<Self> {
		let pool =
			PgPoolOptions::new().max_connections(cfg.pool_max_conns).connect(&cfg.dsn).await?;

		Ok(Self { pool })
	}

	pub async fn ensure_schema(&self, vector_dim: u32) -> Result<()> {
		let sql = schema::render_schema(vector_dim);
		// Advisory locks are held per connection. Use a single transaction so the lock is scoped to
		// one connection and automatically released when the transaction ends.
		let mut tx = self.pool.begin().await?;

		sqlx::query("SELECT pg_advisory_xact_lock($1)")
			.bind(SCHEMA_LOCK_ID)
			.execute(&mut *tx)
			.await?;

		for statement in sql.split(';') {
			let trimmed = statement.trim();

			if trimmed.is_empty() {
				continue;
			}

			sqlx::query(trimmed).execute(&mut *tx).await?;
		}

		tx.commit().await?;

		self.verify_vector_dim(vector_dim).await
	}

	/// `CREATE TABLE IF NOT EXISTS` keeps an older column width, so compare it explicitly.
	pub async fn verify_vector_dim(&self, vector_dim: u32) -> Result<()> {
		let column_type: String = sqlx::query_scalar(
			"\
SELECT format_type(atttypid, atttypmod)
FROM pg_attribute
WHERE attrelid = 'issues'::regclass
	AND attname = 'embedding'",
		)
		.fetch_one(&self.pool)
		.await?;
		let expected = format!("vector({vector_dim})");

		if column_type != expected {
			return Err(Error::Conflict(format!(
				"issues.embedding is {column_type}; configured dimension needs {expected}."
			)));
		}

		Ok(())
	}

	pub async fn close(&self) {
		self.pool.close().await;
	}
}
