pub mod embedding;
#[cfg(feature = "local-model")]
pub mod local;
pub mod placeholder;

mod error;

pub use error::{Error, Result};

use std::{future::Future, pin::Pin, sync::Arc};

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName};
use serde_json::{Map, Value};

use fixflow_config::EmbeddingProviderConfig;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Turns free text into a vector of exactly [`EmbeddingProvider::dimensions`] floats.
///
/// Implementations are shared across requests, so `embed` must be safe to call concurrently.
pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn provider_id(&self) -> &'static str;

	fn dimensions(&self) -> u32;

	fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>>;
}

/// Builds the provider named by `cfg.provider_id`.
///
/// The local model is loaded here, on the blocking pool, so the returned provider is ready before
/// it is shared with request handlers.
pub async fn connect(cfg: &EmbeddingProviderConfig) -> Result<Arc<dyn EmbeddingProvider>> {
	let provider: Arc<dyn EmbeddingProvider> = match cfg.provider_id.as_str() {
		"placeholder" => Arc::new(placeholder::PlaceholderEmbedding::new(cfg.dimensions)),
		"remote" => Arc::new(embedding::RemoteEmbedding::new(cfg.clone())?),
		"local" => load_local(cfg).await?,
		other => {
			return Err(Error::InvalidConfig {
				message: format!("Unknown embedding provider {other:?}."),
			});
		},
	};

	tracing::info!(
		provider_id = provider.provider_id(),
		dimensions = provider.dimensions(),
		"Embedding provider ready."
	);

	Ok(provider)
}

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

pub(crate) fn check_dimensions(expected: u32, vec: &[f32]) -> Result<()> {
	if vec.len() != expected as usize {
		return Err(Error::InvalidResponse {
			message: format!(
				"Embedding has {} dimensions; expected {expected}.",
				vec.len()
			),
		});
	}

	Ok(())
}

#[cfg(feature = "local-model")]
async fn load_local(cfg: &EmbeddingProviderConfig) -> Result<Arc<dyn EmbeddingProvider>> {
	let cfg = cfg.clone();
	let model = tokio::task::spawn_blocking(move || local::LocalEmbedding::load(&cfg))
		.await
		.map_err(|err| Error::Model { message: err.to_string() })??;

	Ok(Arc::new(model))
}

#[cfg(not(feature = "local-model"))]
async fn load_local(_cfg: &EmbeddingProviderConfig) -> Result<Arc<dyn EmbeddingProvider>> {
	Err(Error::InvalidConfig {
		message: "The local embedding provider requires the local-model feature.".to_string(),
	})
}
