pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("FIXFLOW_PG_DSN is not a valid Postgres DSN: {0}")]
	InvalidDsn(sqlx::Error),
	#[error("pgvector is not installed on the test server: {0}")]
	PgvectorUnavailable(sqlx::Error),
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
}
