//! OpenAI-compatible remote embedding endpoint.

use std::time::Duration;

use reqwest::{Client, header::HeaderMap};
use serde_json::Value;

use crate::{BoxFuture, EmbeddingProvider, Error, Result};
use fixflow_config::EmbeddingProviderConfig;

pub struct RemoteEmbedding {
	cfg: EmbeddingProviderConfig,
	client: Client,
	headers: HeaderMap,
}
impl RemoteEmbedding {
	pub fn new(cfg: EmbeddingProviderConfig) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
		let headers = crate::auth_headers(&cfg.api_key, &cfg.default_headers)?;

		Ok(Self { cfg, client, headers })
	}

	async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
		let url = format!("{}{}", self.cfg.api_base.trim_end_matches('/'), self.cfg.path);
		let body = serde_json::json!({
			"model": self.cfg.model,
			"input": [text],
			"dimensions": self.cfg.dimensions,
		});
		let res = self.client.post(url).headers(self.headers.clone()).json(&body).send().await?;
		let json: Value = res.error_for_status()?.json().await?;
		let Some(vec) = parse_embedding_response(json)?.into_iter().next() else {
			return Err(Error::InvalidResponse {
				message: "Embedding response contained no vectors.".to_string(),
			});
		};

		crate::check_dimensions(self.cfg.dimensions, &vec)?;

		Ok(vec)
	}
}
impl EmbeddingProvider for RemoteEmbedding {
	fn provider_id(&self) -> &'static str {
		"remote"
	}

	fn dimensions(&self) -> u32 {
		self.cfg.dimensions
	}

	fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(self.embed_one(text))
	}
}

fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	let data = json.get("data").and_then(|v| v.as_array()).ok_or_else(|| Error::InvalidResponse {
		message: "Embedding response is missing data array.".to_string(),
	})?;
	let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());

	for (fallback_index, item) in data.iter().enumerate() {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.map(|v| v as usize)
			.unwrap_or(fallback_index);
		let embedding =
			item.get("embedding").and_then(|v| v.as_array()).ok_or_else(|| {
				Error::InvalidResponse {
					message: "Embedding item missing embedding array.".to_string(),
				}
			})?;
		let mut vec = Vec::with_capacity(embedding.len());

		for value in embedding {
			let number = value.as_f64().ok_or_else(|| Error::InvalidResponse {
				message: "Embedding value must be numeric.".to_string(),
			})?;

			vec.push(number as f32);
		}

		indexed.push((index, vec));
	}

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_embeddings_in_index_order() {
		let json = serde_json::json!({
			"data": [
				{ "index": 1, "embedding": [2.0, 3.0] },
				{ "index": 0, "embedding": [0.5, 1.5] }
			]
		});
		let parsed = parse_embedding_response(json).expect("parse failed");

		assert_eq!(parsed.len(), 2);
		assert_eq!(parsed[0], vec![0.5, 1.5]);
		assert_eq!(parsed[1], vec![2.0, 3.0]);
	}

	#[test]
	fn rejects_non_numeric_values() {
		let json = serde_json::json!({ "data": [{ "embedding": [0.1, "x"] }] });

		assert!(matches!(parse_embedding_response(json), Err(Error::InvalidResponse { .. })));
	}

	#[test]
	fn rejects_missing_data() {
		let json = serde_json::json!({ "object": "list" });

		assert!(matches!(parse_embedding_response(json), Err(Error::InvalidResponse { .. })));
	}
}
