use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub trending: Trending,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
	/// Upper bound on a single store operation (save, get, search, trending, feedback).
	#[serde(default = "default_request_timeout_ms")]
	pub request_timeout_ms: u64,
	/// Browser origins allowed to call the API. Empty allows any origin.
	#[serde(default)]
	pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
	Ephemeral,
	Postgres,
}
impl StorageBackend {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Ephemeral => "ephemeral",
			Self::Postgres => "postgres",
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub backend: StorageBackend,
	pub vector_dim: u32,
	/// Required when `backend = "postgres"`.
	pub postgres: Option<Postgres>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	/// One of `placeholder`, `local` or `remote`.
	pub provider_id: String,
	#[serde(default)]
	pub api_base: String,
	#[serde(default)]
	pub api_key: String,
	#[serde(default = "default_embedding_path")]
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
	/// Local model cache directory. Falls back to the provider default when unset.
	pub cache_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	pub default_limit: u32,
	pub max_limit: u32,
}
impl Default for Search {
	fn default() -> Self {
		Self { default_limit: 5, max_limit: 20 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Trending {
	pub default_limit: u32,
	pub max_limit: u32,
}
impl Default for Trending {
	fn default() -> Self {
		Self { default_limit: 10, max_limit: 50 }
	}
}

fn default_request_timeout_ms() -> u64 {
	10_000
}

fn default_embedding_path() -> String {
	"/embeddings".to_string()
}
