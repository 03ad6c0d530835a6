use std::{
	collections::hash_map::DefaultHasher,
	hash::{Hash, Hasher},
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use serde_json::{Map, Value, json};
use time::OffsetDateTime;
use uuid::Uuid;

use fixflow_config::{
	Config, EmbeddingProviderConfig, Providers, Search, Service, Storage, StorageBackend, Trending,
};
use fixflow_domain::{CounterKind, IssueRecord, Metadata, NewIssue};
use fixflow_service::{
	BoxFuture, CreateIssueRequest, EmbeddingProvider, Error, FixflowService, SearchRequest,
	VectorStore,
};
use fixflow_storage::{ScoredIssue, memory::EphemeralStore};

const DIM: u32 = 256;

/// Bag-of-words vector: each lowercase token bumps one hashed bucket.
struct KeywordEmbedding {
	calls: Arc<AtomicUsize>,
}
impl KeywordEmbedding {
	fn new() -> Self {
		Self { calls: Arc::new(AtomicUsize::new(0)) }
	}

	fn count(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl EmbeddingProvider for KeywordEmbedding {
	fn provider_id(&self) -> &'static str {
		"keyword"
	}

	fn dimensions(&self) -> u32 {
		DIM
	}

	fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, fixflow_providers::Result<Vec<f32>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let mut vec = vec![0.0; DIM as usize];

		for token in text.split(|c: char| !c.is_alphanumeric()).filter(|token| !token.is_empty()) {
			let mut hasher = DefaultHasher::new();

			token.to_lowercase().hash(&mut hasher);

			vec[(hasher.finish() % u64::from(DIM)) as usize] += 1.0;
		}

		Box::pin(async move { Ok(vec) })
	}
}

struct FailingEmbedding;
impl EmbeddingProvider for FailingEmbedding {
	fn provider_id(&self) -> &'static str {
		"failing"
	}

	fn dimensions(&self) -> u32 {
		DIM
	}

	fn embed<'a>(&'a self, _text: &'a str) -> BoxFuture<'a, fixflow_providers::Result<Vec<f32>>> {
		Box::pin(async move {
			Err(fixflow_providers::Error::InvalidResponse {
				message: "upstream returned 502".to_string(),
			})
		})
	}
}

struct SlowEmbedding;
impl EmbeddingProvider for SlowEmbedding {
	fn provider_id(&self) -> &'static str {
		"slow"
	}

	fn dimensions(&self) -> u32 {
		DIM
	}

	fn embed<'a>(&'a self, _text: &'a str) -> BoxFuture<'a, fixflow_providers::Result<Vec<f32>>> {
		Box::pin(async move {
			tokio::time::sleep(Duration::from_secs(30)).await;

			Ok(vec![1.0; DIM as usize])
		})
	}
}

/// Delegates to an in-memory store but stalls every search.
struct StallingSearchStore {
	inner: EphemeralStore,
}
impl VectorStore for StallingSearchStore {
	fn backend(&self) -> StorageBackend {
		self.inner.backend()
	}

	fn vector_dim(&self) -> u32 {
		self.inner.vector_dim()
	}

	fn save_issue<'a>(
		&'a self,
		candidate: &'a NewIssue,
		embedding: &'a [f32],
	) -> BoxFuture<'a, fixflow_storage::Result<IssueRecord>> {
		self.inner.save_issue(candidate, embedding)
	}

	fn get_issue<'a>(
		&'a self,
		issue_id: Uuid,
	) -> BoxFuture<'a, fixflow_storage::Result<IssueRecord>> {
		self.inner.get_issue(issue_id)
	}

	fn search<'a>(
		&'a self,
		query: &'a [f32],
		limit: u32,
		filters: &'a Metadata,
	) -> BoxFuture<'a, fixflow_storage::Result<Vec<ScoredIssue>>> {
		Box::pin(async move {
			tokio::time::sleep(Duration::from_secs(30)).await;

			self.inner.search(query, limit, filters).await
		})
	}

	fn trending<'a>(
		&'a self,
		limit: u32,
		now: OffsetDateTime,
	) -> BoxFuture<'a, fixflow_storage::Result<Vec<IssueRecord>>> {
		self.inner.trending(limit, now)
	}

	fn increment_counter<'a>(
		&'a self,
		issue_id: Uuid,
		kind: CounterKind,
	) -> BoxFuture<'a, fixflow_storage::Result<()>> {
		self.inner.increment_counter(issue_id, kind)
	}

	fn close<'a>(&'a self) -> BoxFuture<'a, ()> {
		self.inner.close()
	}
}

fn test_config(provider_id: &str) -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
			request_timeout_ms: 200,
			cors_allowed_origins: Vec::new(),
		},
		storage: Storage { backend: StorageBackend::Ephemeral, vector_dim: DIM, postgres: None },
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				provider_id: provider_id.to_string(),
				api_base: String::new(),
				api_key: String::new(),
				path: "/embeddings".to_string(),
				model: "test".to_string(),
				dimensions: DIM,
				timeout_ms: 200,
				default_headers: Map::new(),
				cache_dir: None,
			},
		},
		search: Search::default(),
		trending: Trending::default(),
	}
}

fn service_with(embedding: Arc<dyn EmbeddingProvider>) -> FixflowService {
	FixflowService::new(test_config("placeholder"), Arc::new(EphemeralStore::new(DIM)), embedding)
}

fn timeout_issue() -> CreateIssueRequest {
	CreateIssueRequest {
		title: "Timeout Error".to_string(),
		content: "Request timed out after 30s".to_string(),
		solution: "Increase timeout to 60s".to_string(),
		tags: vec!["network".to_string(), "timeout".to_string()],
		metadata: json!({ "env": "prod" }).as_object().cloned().unwrap_or_default(),
	}
}

fn disk_issue() -> CreateIssueRequest {
	CreateIssueRequest {
		title: "Disk full".to_string(),
		content: "No space left on device".to_string(),
		solution: "Prune docker images".to_string(),
		tags: vec!["storage".to_string()],
		metadata: json!({ "env": "staging" }).as_object().cloned().unwrap_or_default(),
	}
}

fn search(query: &str, limit: Option<u32>, filters: Option<Value>) -> SearchRequest {
	SearchRequest {
		query: query.to_string(),
		limit,
		filters: filters.and_then(|value| value.as_object().cloned()),
	}
}

#[tokio::test]
async fn create_get_search_flow() {
	let service = service_with(Arc::new(KeywordEmbedding::new()));
	let created = service.create_issue(timeout_issue()).await.expect("create failed");

	service.create_issue(disk_issue()).await.expect("create failed");

	let fetched = service.get_issue(&created.id.to_string()).await.expect("get failed");

	assert_eq!(fetched, created);
	assert_eq!(fetched.tags, ["network", "timeout"]);

	let hits =
		service.search_issues(search("request time out", Some(5), None)).await.expect("search");

	assert_eq!(hits.len(), 2);
	assert_eq!(hits[0].issue.id, created.id);
	assert!(hits[0].score <= 1.0);
	assert!(hits[0].score > hits[1].score);
}

#[tokio::test]
async fn duplicate_title_returns_first_record() {
	let provider = Arc::new(KeywordEmbedding::new());
	let service = service_with(provider.clone());
	let first = service.create_issue(timeout_issue()).await.expect("create failed");
	let second = service
		.create_issue(CreateIssueRequest { content: "different".to_string(), ..timeout_issue() })
		.await
		.expect("create failed");

	assert_eq!(second, first);
	assert_eq!(provider.count(), 2);
}

#[tokio::test]
async fn empty_fields_are_rejected_before_embedding() {
	let provider = Arc::new(KeywordEmbedding::new());
	let service = service_with(provider.clone());
	let err = service
		.create_issue(CreateIssueRequest { title: "  ".to_string(), ..timeout_issue() })
		.await
		.expect_err("Expected rejection.");

	assert!(matches!(err, Error::InvalidRequest { ref message } if message.contains("title")));

	let err =
		service.search_issues(search(" ", None, None)).await.expect_err("Expected rejection.");

	assert!(matches!(err, Error::InvalidRequest { .. }));
	assert_eq!(provider.count(), 0);
}

#[tokio::test]
async fn search_limit_is_validated() {
	let provider = Arc::new(KeywordEmbedding::new());
	let service = service_with(provider.clone());

	for limit in [0, 21] {
		let err = service
			.search_issues(search("timeout", Some(limit), None))
			.await
			.expect_err("Expected rejection.");

		assert!(matches!(err, Error::InvalidRequest { .. }));
	}

	assert_eq!(provider.count(), 0);

	for i in 0..7 {
		service
			.create_issue(CreateIssueRequest { title: format!("Timeout {i}"), ..timeout_issue() })
			.await
			.expect("create failed");
	}

	let hits = service.search_issues(search("timeout", None, None)).await.expect("search");

	assert_eq!(hits.len(), 5);
}

#[tokio::test]
async fn filters_are_exact() {
	let service = service_with(Arc::new(KeywordEmbedding::new()));
	let prod = service.create_issue(timeout_issue()).await.expect("create failed");

	// More similar to the query, but tagged for staging.
	service
		.create_issue(CreateIssueRequest {
			title: "request time out".to_string(),
			content: "request time out".to_string(),
			solution: "request time out".to_string(),
			tags: Vec::new(),
			metadata: json!({ "env": "staging" }).as_object().cloned().unwrap_or_default(),
		})
		.await
		.expect("create failed");

	let hits = service
		.search_issues(search("request time out", Some(5), Some(json!({ "env": "prod" }))))
		.await
		.expect("search");

	assert_eq!(hits.len(), 1);
	assert_eq!(hits[0].issue.id, prod.id);
}

#[tokio::test]
async fn feedback_increments_and_rejects_unknown_kinds() {
	let service = service_with(Arc::new(KeywordEmbedding::new()));
	let created = service.create_issue(timeout_issue()).await.expect("create failed");
	let id = created.id.to_string();

	assert!(service.record_feedback(&id, "view").await.expect("feedback").ok);
	assert!(service.record_feedback(&id, "view").await.expect("feedback").ok);

	let err = service.record_feedback(&id, "like").await.expect_err("Expected rejection.");

	assert!(matches!(err, Error::InvalidRequest { .. }));

	let fetched = service.get_issue(&id).await.expect("get failed");

	assert_eq!(fetched.view_count, 2);
	assert_eq!(fetched.useful_count, 0);
	assert!(matches!(
		service.record_feedback(&Uuid::new_v4().to_string(), "useful").await,
		Err(Error::NotFound { .. })
	));
	assert!(matches!(
		service.record_feedback("nope", "useful").await,
		Err(Error::NotFound { .. })
	));
	assert!(matches!(service.get_issue("nope").await, Err(Error::NotFound { .. })));
}

#[tokio::test]
async fn trending_uses_defaults_and_bounds() {
	let service = service_with(Arc::new(KeywordEmbedding::new()));
	let idle = service.create_issue(disk_issue()).await.expect("create failed");
	let busy = service.create_issue(timeout_issue()).await.expect("create failed");

	for _ in 0..5 {
		service.record_feedback(&busy.id.to_string(), "view").await.expect("feedback");
	}

	let trending = service.list_trending(None).await.expect("trending");
	let ids: Vec<Uuid> = trending.iter().map(|issue| issue.id).collect();

	assert_eq!(ids, [busy.id, idle.id]);
	assert!(matches!(service.list_trending(Some(51)).await, Err(Error::InvalidRequest { .. })));
	assert!(matches!(service.list_trending(Some(0)).await, Err(Error::InvalidRequest { .. })));
}

#[tokio::test]
async fn provider_failure_is_embedding_unavailable() {
	let store = Arc::new(EphemeralStore::new(DIM));
	let service =
		FixflowService::new(test_config("placeholder"), store.clone(), Arc::new(FailingEmbedding));
	let err = service.create_issue(timeout_issue()).await.expect_err("Expected failure.");

	assert!(matches!(err, Error::EmbeddingUnavailable { .. }));
	assert!(store.is_empty());
}

#[tokio::test]
async fn slow_provider_times_out() {
	let service = service_with(Arc::new(SlowEmbedding));
	let err = service
		.search_issues(search("timeout", None, None))
		.await
		.expect_err("Expected timeout.");

	assert!(matches!(err, Error::Timeout { operation: "embed", timeout_ms: 200 }));
}

#[tokio::test]
async fn slow_store_times_out() {
	let store = Arc::new(StallingSearchStore { inner: EphemeralStore::new(DIM) });
	let service =
		FixflowService::new(test_config("placeholder"), store, Arc::new(KeywordEmbedding::new()));

	service.create_issue(timeout_issue()).await.expect("create failed");

	let err = service
		.search_issues(search("timeout", None, None))
		.await
		.expect_err("Expected timeout.");

	assert!(matches!(err, Error::Timeout { operation: "search", .. }));
}

#[tokio::test]
async fn connect_builds_configured_backend() {
	let service =
		FixflowService::connect(test_config("placeholder")).await.expect("connect failed");

	assert_eq!(service.store.backend(), StorageBackend::Ephemeral);
	assert_eq!(service.embedding.provider_id(), "placeholder");

	let created = service.create_issue(timeout_issue()).await.expect("create failed");

	assert_eq!(service.get_issue(&created.id.to_string()).await.expect("get").id, created.id);

	service.shutdown().await;
}

#[tokio::test]
async fn connect_fails_on_unknown_provider() {
	let result = FixflowService::connect(test_config("bogus")).await;

	assert!(matches!(result, Err(Error::EmbeddingUnavailable { .. })));
}

#[tokio::test]
async fn connect_rejects_provider_store_dimension_mismatch() {
	let mut cfg = test_config("placeholder");

	cfg.providers.embedding.dimensions = DIM / 2;

	let result = FixflowService::connect(cfg).await;

	assert!(matches!(
		result,
		Err(Error::InvalidRequest { ref message }) if message.contains("dimensions")
	));
}
