use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, VibeService};
use vibe_domain::genre::CANONICAL_GENRES;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FiltersResponse {
	pub types: Vec<String>,
	pub ratings: Vec<String>,
	pub years: Vec<i32>,
	pub genres: Vec<String>,
}

#[derive(Deserialize)]
struct CachedFilters {
	types: Vec<String>,
	ratings: Vec<String>,
	years: Vec<i32>,
	// Required for completeness only; the canonical list is served instead.
	#[serde(rename = "genres")]
	_genres: Vec<Value>,
}

impl VibeService {
	/// Facet values for the filter controls. A complete stored facet document wins over scanning
	/// the corpus.
	pub async fn filters(&self) -> Result<FiltersResponse> {
		let genres: Vec<String> = CANONICAL_GENRES.iter().map(|genre| genre.to_string()).collect();

		if let Some(cached) = self.stores.corpus.cached_filters().await?
			&& let Some(cached) = parse_cached(cached)
		{
			return Ok(FiltersResponse {
				types: cached.types,
				ratings: cached.ratings,
				years: cached.years,
				genres,
			});
		}

		let facets = self.stores.corpus.facets().await?;

		Ok(FiltersResponse {
			types: facets.types,
			ratings: facets.ratings,
			years: facets.years,
			genres,
		})
	}
}

fn parse_cached(value: Value) -> Option<CachedFilters> {
	match serde_json::from_value(value) {
		Ok(cached) => Some(cached),
		Err(err) => {
			tracing::info!(error = %err, "Stored filter facets are incomplete. Deriving from titles.");

			None
		},
	}
}
