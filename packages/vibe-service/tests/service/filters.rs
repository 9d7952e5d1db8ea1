use serde_json::json;

use super::{HarnessBuilder, MemoryStore, harness};
use vibe_domain::genre::CANONICAL_GENRES;

#[tokio::test]
async fn derives_facets_from_titles() {
	let harness = harness();
	let filters = harness.service.filters().await.expect("Filters failed.");

	assert_eq!(filters.types, vec!["Movie", "TV Show"]);
	assert_eq!(filters.ratings, vec!["NR", "PG-13", "R", "TV-MA"]);
	assert_eq!(filters.years.first(), Some(&2020));
	assert_eq!(filters.years.last(), Some(&2000));
	assert_eq!(filters.genres.len(), CANONICAL_GENRES.len());
}

#[tokio::test]
async fn stored_facets_win_when_complete() {
	let store = MemoryStore {
		cached_filters: Some(json!({
			"types": ["Movie"],
			"ratings": ["G"],
			"years": [1999],
			"genres": ["Dramas"]
		})),
		..MemoryStore::with_catalog()
	};
	let harness = HarnessBuilder { store, ..HarnessBuilder::new() }.build();
	let filters = harness.service.filters().await.expect("Filters failed.");

	assert_eq!(filters.types, vec!["Movie"]);
	assert_eq!(filters.years, vec![1999]);
	assert_eq!(filters.genres[0], CANONICAL_GENRES[0]);
}

#[tokio::test]
async fn incomplete_stored_facets_fall_back() {
	let store = MemoryStore {
		cached_filters: Some(json!({ "types": ["Movie"] })),
		..MemoryStore::with_catalog()
	};
	let harness = HarnessBuilder { store, ..HarnessBuilder::new() }.build();
	let filters = harness.service.filters().await.expect("Filters failed.");

	assert_eq!(filters.types, vec!["Movie", "TV Show"]);
}
