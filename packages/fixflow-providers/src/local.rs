//! In-process sentence embedding through fastembed (ONNX runtime).

use std::{
	path::PathBuf,
	sync::{Arc, Mutex},
};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::{BoxFuture, EmbeddingProvider, Error, Result};
use fixflow_config::EmbeddingProviderConfig;

pub struct LocalEmbedding {
	model: Arc<Mutex<TextEmbedding>>,
	dimensions: u32,
}
impl LocalEmbedding {
	/// Loads the model weights, downloading them on first use. Blocks; call from a blocking
	/// thread.
	pub fn load(cfg: &EmbeddingProviderConfig) -> Result<Self> {
		let (model_kind, native_dim) = resolve_model(&cfg.model)?;

		if native_dim != cfg.dimensions {
			return Err(Error::InvalidConfig {
				message: format!(
					"Model {} produces {native_dim} dimensions but {} are configured.",
					cfg.model, cfg.dimensions
				),
			});
		}

		let mut options = InitOptions::new(model_kind);

		if let Some(dir) = cfg.cache_dir.as_deref() {
			options = options.with_cache_dir(PathBuf::from(dir));
		}

		tracing::info!(model = %cfg.model, "Loading local embedding model.");

		let model = TextEmbedding::try_new(options)
			.map_err(|err| Error::Model { message: err.to_string() })?;

		Ok(Self { model: Arc::new(Mutex::new(model)), dimensions: cfg.dimensions })
	}

	async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
		let model = Arc::clone(&self.model);
		let input = vec![text.to_string()];
		let embeddings = tokio::task::spawn_blocking(move || {
			let mut model = model.lock().unwrap_or_else(|err| err.into_inner());

			model.embed(input, None).map_err(|err| Error::Model { message: err.to_string() })
		})
		.await
		.map_err(|err| Error::Model { message: err.to_string() })??;
		let Some(vec) = embeddings.into_iter().next() else {
			return Err(Error::InvalidResponse {
				message: "Local model returned no vectors.".to_string(),
			});
		};

		crate::check_dimensions(self.dimensions, &vec)?;

		Ok(vec)
	}
}
impl EmbeddingProvider for LocalEmbedding {
	fn provider_id(&self) -> &'static str {
		"local"
	}

	fn dimensions(&self) -> u32 {
		self.dimensions
	}

	fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(self.embed_one(text))
	}
}

fn resolve_model(name: &str) -> Result<(EmbeddingModel, u32)> {
	match name {
		"all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" =>
			Ok((EmbeddingModel::AllMiniLML6V2, 384)),
		"bge-small-en-v1.5" | "BAAI/bge-small-en-v1.5" => Ok((EmbeddingModel::BGESmallENV15, 384)),
		"bge-base-en-v1.5" | "BAAI/bge-base-en-v1.5" => Ok((EmbeddingModel::BGEBaseENV15, 768)),
		other => Err(Error::InvalidConfig {
			message: format!("Unsupported local embedding model {other:?}."),
		}),
	}
}
