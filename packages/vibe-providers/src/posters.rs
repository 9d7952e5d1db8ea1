use std::time::Duration;

use color_eyre::Result;
use reqwest::Client;
use serde_json::Value;

#[derive(Debug, Clone, Copy)]
pub struct PosterQuery<'a> {
	pub title: &'a str,
	pub kind: Option<&'a str>,
	pub year: Option<i32>,
}

/// The first search entry that carries any image path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PosterMatch {
	pub tmdb_id: Option<i64>,
	pub backdrop_path: Option<String>,
	pub poster_path: Option<String>,
}
impl PosterMatch {
	pub fn poster_url(&self, cfg: &vibe_config::PosterProviderConfig) -> Option<String> {
		self.poster_path.as_ref().map(|path| format!("{}{path}", cfg.poster_base))
	}

	/// Backdrops read better as thumbnails, so they win over posters.
	pub fn thumb_url(&self, cfg: &vibe_config::PosterProviderConfig) -> Option<String> {
		self.backdrop_path
			.as_ref()
			.map(|path| format!("{}{path}", cfg.backdrop_base))
			.or_else(|| self.poster_url(cfg))
	}
}

pub fn is_series(kind: Option<&str>) -> bool {
	let lower = kind.unwrap_or_default().to_lowercase();

	lower.contains("tv") || lower.contains("show")
}

pub async fn search(
	cfg: &vibe_config::PosterProviderConfig,
	api_key: &str,
	query: PosterQuery<'_>,
) -> Result<Option<PosterMatch>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let series = is_series(query.kind);
	let endpoint = if series { "search/tv" } else { "search/movie" };
	let url = format!("{}/{endpoint}", cfg.api_base.trim_end_matches('/'));
	let mut params = vec![
		("api_key", api_key.to_string()),
		("query", query.title.to_string()),
		("include_adult", "false".to_string()),
		("language", "en-US".to_string()),
	];

	if let Some(year) = query.year.filter(|year| *year != 0) {
		params.push((if series { "first_air_date_year" } else { "year" }, year.to_string()));
	}

	let res = client.get(url).query(&params).send().await?;
	let json = crate::read_json(res).await?;

	Ok(parse_search_response(&json))
}

fn parse_search_response(json: &Value) -> Option<PosterMatch> {
	let results = json.get("results").and_then(|v| v.as_array())?;

	results.iter().find_map(|entry| {
		let path = |field: &str| entry.get(field).and_then(|v| v.as_str()).map(str::to_string);
		let backdrop_path = path("backdrop_path");
		let poster_path = path("poster_path");

		if backdrop_path.is_none() && poster_path.is_none() {
			return None;
		}

		Some(PosterMatch {
			tmdb_id: entry.get("id").and_then(|v| v.as_i64()),
			backdrop_path,
			poster_path,
		})
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn cfg() -> vibe_config::PosterProviderConfig {
		vibe_config::PosterProviderConfig {
			api_base: "https://api.themoviedb.org/3".to_string(),
			api_key: None,
			backdrop_base: "https://image.tmdb.org/t/p/w780".to_string(),
			poster_base: "https://image.tmdb.org/t/p/w500".to_string(),
			timeout_ms: 5_000,
		}
	}

	#[test]
	fn skips_entries_without_images() {
		let json = serde_json::json!({
			"results": [
				{ "id": 1, "backdrop_path": null, "poster_path": null },
				{ "id": 2, "poster_path": "/p.jpg" },
				{ "id": 3, "backdrop_path": "/b.jpg" }
			]
		});
		let found = parse_search_response(&json).expect("entry with image");

		assert_eq!(found.tmdb_id, Some(2));
		assert_eq!(
			found.thumb_url(&cfg()).as_deref(),
			Some("https://image.tmdb.org/t/p/w500/p.jpg")
		);
	}

	#[test]
	fn backdrop_wins_over_poster() {
		let found = PosterMatch {
			tmdb_id: Some(9),
			backdrop_path: Some("/b.jpg".to_string()),
			poster_path: Some("/p.jpg".to_string()),
		};

		assert_eq!(
			found.thumb_url(&cfg()).as_deref(),
			Some("https://image.tmdb.org/t/p/w780/b.jpg")
		);
		assert_eq!(
			found.poster_url(&cfg()).as_deref(),
			Some("https://image.tmdb.org/t/p/w500/p.jpg")
		);
	}

	#[test]
	fn empty_results_find_nothing() {
		assert_eq!(parse_search_response(&serde_json::json!({ "results": [] })), None);
		assert_eq!(parse_search_response(&serde_json::json!({})), None);
	}

	#[test]
	fn series_detection_is_case_insensitive() {
		assert!(is_series(Some("TV Show")));
		assert!(is_series(Some("show")));
		assert!(!is_series(Some("Movie")));
		assert!(!is_series(None));
	}
}
