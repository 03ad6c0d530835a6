pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Embedding unavailable: {message}")]
	EmbeddingUnavailable { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Timed out after {timeout_ms} ms: {operation}")]
	Timeout { operation: &'static str, timeout_ms: u64 },
}

impl From<fixflow_storage::Error> for Error {
	fn from(err: fixflow_storage::Error) -> Self {
		match err {
			fixflow_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			fixflow_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			fixflow_storage::Error::NotFound(message) => Self::NotFound { message },
			fixflow_storage::Error::Conflict(message) => Self::Storage { message },
		}
	}
}

impl From<fixflow_providers::Error> for Error {
	fn from(err: fixflow_providers::Error) -> Self {
		Self::EmbeddingUnavailable { message: err.to_string() }
	}
}
