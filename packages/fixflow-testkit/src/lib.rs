//! Throwaway Postgres databases with pgvector enabled, for storage and service integration tests.
//!
//! Tests opt in through `FIXFLOW_PG_DSN`, which must point at a database the test user may
//! `CREATE DATABASE` from (usually `postgres`).

mod error;

pub use error::{Error, Result};

use std::{env, str::FromStr, thread};

use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use uuid::Uuid;

pub const DSN_ENV: &str = "FIXFLOW_PG_DSN";

/// Resolves to a fresh [`TestDatabase`], or returns from the enclosing test with a note on stderr
/// when `FIXFLOW_PG_DSN` is unset or the server lacks pgvector.
#[macro_export]
macro_rules! test_db_or_skip {
	() => {
		match $crate::TestDatabase::from_env().await {
			Ok(Some(db)) => db,
			Ok(None) => {
				eprintln!("Skipping; set {} to run this test.", $crate::DSN_ENV);

				return;
			},
			Err(err @ $crate::Error::PgvectorUnavailable(_)) => {
				eprintln!("Skipping; {err}");

				return;
			},
			Err(err) => panic!("Failed to create test database: {err}"),
		}
	};
}

/// A uniquely named database that is dropped again by [`TestDatabase::drop_database`] or, failing
/// that, when the value goes out of scope.
pub struct TestDatabase {
	name: String,
	target: PgConnectOptions,
	admin: PgConnectOptions,
	dropped: bool,
}
impl TestDatabase {
	/// Reads `FIXFLOW_PG_DSN`. `Ok(None)` means the variable is unset.
	pub async fn from_env() -> Result<Option<Self>> {
		match env::var(DSN_ENV) {
			Ok(dsn) => Self::create(&dsn).await.map(Some),
			Err(_) => Ok(None),
		}
	}

	/// Creates the database and enables the `vector` extension in it.
	pub async fn create(admin_dsn: &str) -> Result<Self> {
		let admin = PgConnectOptions::from_str(admin_dsn).map_err(Error::InvalidDsn)?;
		let name = format!("fixflow_test_{}", Uuid::new_v4().simple());
		let mut conn = PgConnection::connect_with(&admin).await?;

		conn.execute(format!(r#"CREATE DATABASE "{name}""#).as_str()).await?;
		conn.close().await?;

		let db = Self { target: admin.clone().database(&name), name, admin, dropped: false };
		let mut conn = PgConnection::connect_with(&db.target).await?;

		// `db` drops the fresh database on the early return below.
		conn.execute("CREATE EXTENSION IF NOT EXISTS vector")
			.await
			.map_err(Error::PgvectorUnavailable)?;
		conn.close().await?;

		Ok(db)
	}

	pub fn dsn(&self) -> String {
		self.target.to_url_lossy().to_string()
	}

	/// Storage settings pointing at this database.
	pub fn postgres_config(&self, pool_max_conns: u32) -> fixflow_config::Postgres {
		fixflow_config::Postgres { dsn: self.dsn(), pool_max_conns }
	}

	pub async fn drop_database(mut self) -> Result<()> {
		self.dropped = true;

		drop_database(&self.admin, &self.name).await
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.dropped {
			return;
		}

		let admin = self.admin.clone();
		let name = std::mem::take(&mut self.name);
		// The test runtime may already be gone, so run the drop on a private one.
		let handle = thread::spawn(move || {
			let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;

			runtime.block_on(drop_database(&admin, &name)).map_err(std::io::Error::other)
		});

		match handle.join() {
			Ok(Ok(())) => {},
			Ok(Err(err)) => eprintln!("Leaked test database: {err}."),
			Err(_) => eprintln!("Leaked test database: cleanup thread panicked."),
		}
	}
}

async fn drop_database(admin: &PgConnectOptions, name: &str) -> Result<()> {
	let mut conn = PgConnection::connect_with(admin).await?;

	// Pools in the test may still hold connections.
	sqlx::query(
		"\
SELECT pg_terminate_backend(pid)
FROM pg_stat_activity
WHERE datname = $1 AND pid <> pg_backend_pid()",
	)
	.bind(name)
	.execute(&mut conn)
	.await?;
	conn.execute(format!(r#"DROP DATABASE IF EXISTS "{name}""#).as_str()).await?;
	conn.close().await?;

	Ok(())
}
