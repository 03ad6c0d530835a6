use std::sync::Arc;

use axum::{
	Router,
	body::{self, Body},
	http::{Method, Request, StatusCode, header},
};
use serde_json::{Map, Value, json};
use tower::util::ServiceExt;

use fixflow_api::{routes, state::AppState};
use fixflow_config::{
	Config, EmbeddingProviderConfig, Providers, Search, Service, Storage, StorageBackend, Trending,
};
use fixflow_providers::placeholder::PlaceholderEmbedding;
use fixflow_service::FixflowService;
use fixflow_storage::memory::EphemeralStore;

const DIM: u32 = 32;

fn test_config() -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
			request_timeout_ms: 1_000,
			cors_allowed_origins: Vec::new(),
		},
		storage: Storage { backend: StorageBackend::Ephemeral, vector_dim: DIM, postgres: None },
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				provider_id: "placeholder".to_string(),
				api_base: String::new(),
				api_key: String::new(),
				path: "/embeddings".to_string(),
				model: "placeholder".to_string(),
				dimensions: DIM,
				timeout_ms: 1_000,
				default_headers: Map::new(),
				cache_dir: None,
			},
		},
		search: Search::default(),
		trending: Trending::default(),
	}
}

fn test_app() -> Router {
	app_with_config(test_config())
}

fn app_with_config(cfg: Config) -> Router {
	let service = FixflowService::new(
		cfg,
		Arc::new(EphemeralStore::new(DIM)),
		Arc::new(PlaceholderEmbedding::new(DIM)),
	);

	routes::router(AppState::from_service(service))
}

async fn send(
	app: &Router,
	method: Method,
	uri: &str,
	body: Option<Value>,
) -> (StatusCode, Value) {
	let builder = Request::builder().method(method).uri(uri);
	let request = match body {
		Some(body) => builder
			.header("content-type", "application/json")
			.body(Body::from(body.to_string()))
			.expect("Failed to build request."),
		None => builder.body(Body::empty()).expect("Failed to build request."),
	};
	let response = app.clone().oneshot(request).await.expect("Failed to call router.");
	let status = response.status();
	let bytes =
		body::to_bytes(response.into_body(), usize::MAX).await.expect("Failed to read body.");
	let json = if bytes.is_empty() {
		Value::Null
	} else {
		serde_json::from_slice(&bytes).expect("Response body is not JSON.")
	};

	(status, json)
}

fn timeout_payload() -> Value {
	json!({
		"title": "Timeout Error",
		"content": "Request timed out after 30s",
		"solution": "Increase timeout to 60s",
		"tags": ["network", "timeout"],
		"metadata": { "env": "prod" }
	})
}

#[tokio::test]
async fn health_reports_ok() {
	let app = test_app();
	let (status, body) = send(&app, Method::GET, "/health", None).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn root_reports_ok() {
	let app = test_app();
	let (status, body) = send(&app, Method::GET, "/", None).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["status"], "ok");
	assert_eq!(body["message"], "FixFlow API is running");
}

async fn preflight(app: &Router, origin: &str) -> axum::response::Response {
	let request = Request::builder()
		.method(Method::OPTIONS)
		.uri("/api/v1/search")
		.header(header::ORIGIN, origin)
		.header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
		.header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
		.body(Body::empty())
		.expect("Failed to build request.");

	app.clone().oneshot(request).await.expect("Failed to call router.")
}

#[tokio::test]
async fn cors_allows_any_origin_by_default() {
	let app = test_app();
	let response = preflight(&app, "http://localhost:5173").await;

	assert!(response.status().is_success());
	assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

	let methods = response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS]
		.to_str()
		.expect("allow-methods must be ASCII");

	assert!(methods.contains("POST"));

	let request = Request::builder()
		.method(Method::GET)
		.uri("/health")
		.header(header::ORIGIN, "http://localhost:5173")
		.body(Body::empty())
		.expect("Failed to build request.");
	let response = app.oneshot(request).await.expect("Failed to call router.");

	assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn cors_echoes_only_configured_origins() {
	let mut cfg = test_config();

	cfg.service.cors_allowed_origins = vec!["http://localhost:3000".to_string()];

	let app = app_with_config(cfg);
	let allowed = preflight(&app, "http://localhost:3000").await;

	assert_eq!(allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:3000");

	let denied = preflight(&app, "http://evil.example").await;

	assert!(denied.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn create_get_search_flow() {
	let app = test_app();
	let (status, created) =
		send(&app, Method::POST, "/api/v1/issues", Some(timeout_payload())).await;

	assert_eq!(status, StatusCode::CREATED);
	assert_eq!(created["title"], "Timeout Error");
	assert_eq!(created["view_count"], 0);

	let issue_id = created["id"].as_str().expect("id must be a string").to_string();
	let (status, fetched) =
		send(&app, Method::GET, &format!("/api/v1/issues/{issue_id}"), None).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(fetched["id"], issue_id.as_str());
	assert_eq!(fetched["metadata"], json!({ "env": "prod" }));

	let (status, results) = send(
		&app,
		Method::POST,
		"/api/v1/search",
		Some(json!({ "query": "request time out", "limit": 5 })),
	)
	.await;

	assert_eq!(status, StatusCode::OK);

	let results = results.as_array().expect("search returns a list");

	assert!(!results.is_empty());
	assert_eq!(results[0]["id"], issue_id.as_str());
	assert!(results[0]["score"].as_f64().expect("score must be a number") <= 1.0);
}

#[tokio::test]
async fn duplicate_title_returns_existing_issue() {
	let app = test_app();
	let (_, first) = send(&app, Method::POST, "/api/v1/issues", Some(timeout_payload())).await;
	let mut payload = timeout_payload();

	payload["content"] = json!("Something else entirely");

	let (status, second) = send(&app, Method::POST, "/api/v1/issues", Some(payload)).await;

	assert_eq!(status, StatusCode::CREATED);
	assert_eq!(second["id"], first["id"]);
	assert_eq!(second["content"], "Request timed out after 30s");
}

#[tokio::test]
async fn errors_map_to_status_codes() {
	let app = test_app();
	let (status, body) = send(&app, Method::GET, "/api/v1/issues/not-a-uuid", None).await;

	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(body["error_code"], "NOT_FOUND");

	let (status, body) = send(
		&app,
		Method::GET,
		"/api/v1/issues/67e55044-10b1-426f-9247-bb680e5fe0c8",
		None,
	)
	.await;

	assert_eq!(status, StatusCode::NOT_FOUND);
	assert!(body["message"].is_string());

	let mut payload = timeout_payload();

	payload["solution"] = json!("");

	let (status, body) = send(&app, Method::POST, "/api/v1/issues", Some(payload)).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["error_code"], "INVALID_REQUEST");

	let (status, _) = send(
		&app,
		Method::POST,
		"/api/v1/search",
		Some(json!({ "query": "timeout", "limit": 21 })),
	)
	.await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn feedback_and_trending() {
	let app = test_app();
	let (_, quiet) = send(
		&app,
		Method::POST,
		"/api/v1/issues",
		Some(json!({ "title": "Disk full", "content": "No space", "solution": "Prune images" })),
	)
	.await;
	let (_, busy) = send(&app, Method::POST, "/api/v1/issues", Some(timeout_payload())).await;
	let busy_id = busy["id"].as_str().expect("id must be a string").to_string();
	let feedback_uri = format!("/api/v1/issues/{busy_id}/feedback?type=view");

	for _ in 0..2 {
		let (status, body) = send(&app, Method::POST, &feedback_uri, None).await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(body, json!({ "ok": true }));
	}

	let (status, body) = send(
		&app,
		Method::POST,
		&format!("/api/v1/issues/{busy_id}/feedback?type=like"),
		None,
	)
	.await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["error_code"], "INVALID_REQUEST");

	let (_, fetched) = send(&app, Method::GET, &format!("/api/v1/issues/{busy_id}"), None).await;

	assert_eq!(fetched["view_count"], 2);

	let (status, trending) = send(&app, Method::GET, "/api/v1/issues/trending", None).await;

	assert_eq!(status, StatusCode::OK);

	let ids: Vec<&Value> = trending
		.as_array()
		.expect("trending returns a list")
		.iter()
		.map(|item| &item["id"])
		.collect();

	assert_eq!(ids, [&busy["id"], &quiet["id"]]);

	let (status, limited) = send(&app, Method::GET, "/api/v1/issues/trending?limit=1", None).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(limited.as_array().map(Vec::len), Some(1));

	let (status, _) = send(&app, Method::GET, "/api/v1/issues/trending?limit=51", None).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
}
