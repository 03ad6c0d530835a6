use crate::{BoxFuture, EmbeddingProvider, Result};

/// Deterministic content hash spread over `dimensions` floats in `[-1, 1)`.
///
/// Carries no semantic meaning. Equal texts map to equal vectors, which keeps dedup and ordering
/// tests reproducible.
pub struct PlaceholderEmbedding {
	dimensions: u32,
}
impl PlaceholderEmbedding {
	pub fn new(dimensions: u32) -> Self {
		Self { dimensions }
	}

	pub fn vector_for(&self, text: &str) -> Vec<f32> {
		let mut reader = blake3::Hasher::new().update(text.as_bytes()).finalize_xof();
		let mut buf = [0_u8; 4];
		let mut vec = Vec::with_capacity(self.dimensions as usize);

		for _ in 0..self.dimensions {
			reader.fill(&mut buf);

			let raw = u32::from_le_bytes(buf);

			vec.push((f64::from(raw) / 2_147_483_648.0 - 1.0) as f32);
		}

		// Keep the norm non-zero so cosine similarity stays meaningful.
		if vec.iter().all(|value| *value == 0.0)
			&& let Some(first) = vec.first_mut()
		{
			*first = 1.0;
		}

		vec
	}
}
impl EmbeddingProvider for PlaceholderEmbedding {
	fn provider_id(&self) -> &'static str {
		"placeholder"
	}

	fn dimensions(&self) -> u32 {
		self.dimensions
	}

	fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>> {
		let vec = self.vector_for(text);

		Box::pin(async move { Ok(vec) })
	}
}
