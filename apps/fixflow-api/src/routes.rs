use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::{HeaderValue, Method, StatusCode, header::CONTENT_TYPE},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::state::AppState;
use fixflow_domain::IssueRecord;
use fixflow_service::{CreateIssueRequest, Error, FeedbackResponse, SearchItem, SearchRequest};

pub fn router(state: AppState) -> Router {
	let cors = cors_layer(&state.service.cfg.service.cors_allowed_origins);

	Router::new()
		.route("/", get(health))
		.route("/health", get(health))
		.route("/api/v1/issues", post(create_issue))
		.route("/api/v1/issues/trending", get(trending))
		.route("/api/v1/issues/{issue_id}", get(get_issue))
		.route("/api/v1/issues/{issue_id}/feedback", post(feedback))
		.route("/api/v1/search", post(search))
		.layer(cors)
		.with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
	let allow_origin = if allowed_origins.is_empty() {
		AllowOrigin::any()
	} else {
		AllowOrigin::list(allowed_origins.iter().filter_map(|origin| {
			HeaderValue::from_str(origin)
				.inspect_err(|err| tracing::warn!(%origin, error = %err, "Ignoring CORS origin."))
				.ok()
		}))
	};

	CorsLayer::new()
		.allow_origin(allow_origin)
		.allow_methods([Method::GET, Method::POST, Method::OPTIONS])
		.allow_headers([CONTENT_TYPE])
}

async fn health() -> Json<Value> {
	Json(json!({ "status": "ok", "message": "FixFlow API is running" }))
}

async fn create_issue(
	State(state): State<AppState>,
	Json(payload): Json<CreateIssueRequest>,
) -> Result<(StatusCode, Json<IssueRecord>), ApiError> {
	let record = state.service.create_issue(payload).await?;

	Ok((StatusCode::CREATED, Json(record)))
}

async fn get_issue(
	State(state): State<AppState>,
	Path(issue_id): Path<String>,
) -> Result<Json<IssueRecord>, ApiError> {
	let record = state.service.get_issue(&issue_id).await?;

	Ok(Json(record))
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<Vec<SearchItem>>, ApiError> {
	let items = state.service.search_issues(payload).await?;

	Ok(Json(items))
}

#[derive(Debug, Deserialize)]
struct FeedbackQuery {
	#[serde(rename = "type")]
	kind: Option<String>,
}

async fn feedback(
	State(state): State<AppState>,
	Path(issue_id): Path<String>,
	Query(query): Query<FeedbackQuery>,
) -> Result<Json<FeedbackResponse>, ApiError> {
	let kind = query.kind.unwrap_or_default();
	let response = state.service.record_feedback(&issue_id, &kind).await?;

	Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct TrendingQuery {
	limit: Option<u32>,
}

async fn trending(
	State(state): State<AppState>,
	Query(query): Query<TrendingQuery>,
) -> Result<Json<Vec<IssueRecord>>, ApiError> {
	let issues = state.service.list_trending(query.limit).await?;

	Ok(Json(issues))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } =>
				Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message),
			Error::NotFound { message } =>
				Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", format!("Not found: {message}.")),
			Error::EmbeddingUnavailable { message } => {
				tracing::error!(error = %message, "Embedding provider unavailable.");

				Self::new(StatusCode::SERVICE_UNAVAILABLE, "EMBEDDING_UNAVAILABLE", message)
			},
			Error::Storage { message } => {
				tracing::error!(error = %message, "Storage request failed.");

				Self::new(StatusCode::SERVICE_UNAVAILABLE, "STORAGE_UNAVAILABLE", message)
			},
			err @ Error::Timeout { .. } =>
				Self::new(StatusCode::GATEWAY_TIMEOUT, "TIMEOUT", err.to_string()),
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
