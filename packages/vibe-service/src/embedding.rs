use vibe_providers::embedding::InputType;

use crate::VibeService;

impl VibeService {
	/// Query-mode embedding of `text`, cached per model.
	///
	/// Provider failures are logged and yield an empty vector, which the search treats as no
	/// match rather than an error.
	pub(crate) async fn embed_query(&self, text: &str) -> Vec<f32> {
		let cfg = &self.cfg.providers.embedding;
		let key = format!("{}::{text}", cfg.model);

		if let Some(vector) = self.embeddings.get(&key) {
			tracing::debug!(model = %cfg.model, "Query embedding cache hit.");

			return vector;
		}

		let texts = [text.to_string()];
		let vector = match self.providers.embedding.embed(cfg, &texts, InputType::Query).await {
			Ok(vectors) => vectors.into_iter().next().unwrap_or_default(),
			Err(err) => {
				tracing::warn!(error = %err, "Query embedding failed.");

				return Vec::new();
			},
		};

		if vector.is_empty() {
			tracing::warn!(model = %cfg.model, "Embedding provider returned no vector.");

			return vector;
		}

		self.embeddings.insert(key, vector.clone());

		vector
	}
}
