use fixflow_testkit::{Error, TestDatabase};

#[tokio::test]
async fn malformed_dsn_is_reported_before_connecting() {
	let result = TestDatabase::create("definitely not a dsn").await;

	assert!(matches!(result, Err(Error::InvalidDsn(_))));
}

#[tokio::test]
#[ignore = "Requires external Postgres with pgvector. Set FIXFLOW_PG_DSN to run."]
async fn created_database_has_pgvector_and_is_dropped() {
	let test_db = fixflow_testkit::test_db_or_skip!();
	let cfg = test_db.postgres_config(1);

	assert!(cfg.dsn.contains("fixflow_test_"));

	let pool = sqlx::PgPool::connect(&cfg.dsn).await.expect("connect failed");
	let version: String =
		sqlx::query_scalar("SELECT extversion FROM pg_extension WHERE extname = 'vector'")
			.fetch_one(&pool)
			.await
			.expect("pgvector missing");

	assert!(!version.is_empty());

	pool.close().await;
	test_db.drop_database().await.expect("drop failed");

	assert!(sqlx::PgPool::connect(&cfg.dsn).await.is_err());
}
