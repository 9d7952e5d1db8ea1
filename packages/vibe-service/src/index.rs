use vibe_domain::{catalog::Title, genre::normalized_genres};
use vibe_providers::embedding::InputType;

use crate::{Error, Result, VibeService};

const EMBED_BATCH_SIZE: usize = 64;

impl VibeService {
	/// Embeds titles in document mode and upserts each with its vector, keyed by show id.
	///
	/// Titles without a canonical genre list get one derived from their raw labels. A failed
	/// batch stops the run; titles from earlier batches stay written.
	pub async fn index_titles(&self, titles: Vec<Title>) -> Result<usize> {
		let cfg = &self.cfg.providers.embedding;
		let mut written = 0;

		for batch in titles.chunks(EMBED_BATCH_SIZE) {
			let documents: Vec<String> = batch.iter().map(Title::rerank_document).collect();
			let vectors =
				self.providers.embedding.embed(cfg, &documents, InputType::Document).await?;

			if vectors.len() != batch.len() {
				return Err(Error::Provider {
					message: format!(
						"Embedding provider returned {} vectors for {} titles.",
						vectors.len(),
						batch.len()
					),
				});
			}

			for (title, vector) in batch.iter().zip(vectors) {
				let mut title = title.clone();

				if title.genres_list.is_none() {
					title.genres_list = Some(
						normalized_genres(&title.genres).into_iter().map(str::to_string).collect(),
					);
				}

				self.stores.corpus.upsert_title(title, vector).await?;

				written += 1;
			}
		}

		tracing::info!(count = written, "Indexed titles.");

		Ok(written)
	}
}
