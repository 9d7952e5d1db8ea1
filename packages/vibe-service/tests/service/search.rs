use std::sync::atomic::Ordering;

use serde_json::json;

use super::{
	Harness, HarnessBuilder, MemoryStore, RerankMode, ScriptedRerank, SpyEmbedding, SpyRewrite,
	harness, rewrite_config, title,
};
use vibe_domain::catalog::SortOrder;
use vibe_service::{SearchRequest, SearchResponse};

fn ids(response: &SearchResponse) -> Vec<&str> {
	response.results.iter().map(|item| item.title.show_id.as_str()).collect()
}

fn query(text: &str) -> SearchRequest {
	SearchRequest { query: text.to_string(), ..SearchRequest::default() }
}

#[tokio::test]
async fn blank_query_lists_catalog_newest_first() {
	let harness = harness();
	let first = harness
		.service
		.search(SearchRequest { page_size: Some(4), ..query("   ") })
		.await
		.expect("Search failed.");
	let second = harness
		.service
		.search(SearchRequest { page: Some(2), page_size: Some(4), ..query("") })
		.await
		.expect("Search failed.");

	assert_eq!(first.total, 9);
	assert_eq!(ids(&first), vec!["s6", "s5", "s2", "s9"]);
	assert_eq!(ids(&second), vec!["s7", "s1", "s4", "s3"]);
	assert!(first.results.iter().all(|item| item.score.is_none()));
	assert_eq!(harness.embedding.calls.load(Ordering::SeqCst), 0);
	assert_eq!(harness.store.nearest_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cutoff_drops_distant_titles() {
	let harness = harness();
	let response = harness.service.search(query("mindfuck")).await.expect("Search failed.");

	assert_eq!(response.query, "mindfuck");
	assert_eq!(response.total, 8);
	assert_eq!(ids(&response), vec!["s1", "s2", "s3", "s4", "s5", "s8", "s9", "s6"]);
	assert!(!ids(&response).contains(&"s7"));
}

#[tokio::test]
async fn explicit_thresholds_override_rewrite_ratio() {
	let harness = harness();
	let by_ratio = harness
		.service
		.search(SearchRequest { min_score_ratio: Some(0.95), ..query("mindfuck") })
		.await
		.expect("Search failed.");
	let by_score = harness
		.service
		.search(SearchRequest {
			min_score: Some(0.845),
			min_score_ratio: Some(0.95),
			..query("mindfuck")
		})
		.await
		.expect("Search failed.");

	assert_eq!(by_ratio.total, 3);
	assert!(by_ratio.results.iter().all(|item| item.score.is_some_and(|score| score >= 0.855)));
	assert_eq!(by_score.total, 4);
}

#[tokio::test]
async fn filters_combine_before_ranking() {
	let harness = harness();
	let response = harness
		.service
		.search(SearchRequest {
			kind: Some("Movie".to_string()),
			rating: Some("PG-13".to_string()),
			genre: Some("Sci-Fi".to_string()),
			..query("mindfuck")
		})
		.await
		.expect("Search failed.");

	assert_eq!(ids(&response), vec!["s1", "s4", "s9", "s6"]);

	for item in &response.results {
		assert_eq!(item.title.kind, "Movie");
		assert_eq!(item.title.rating, "PG-13");
		assert!(item.title.genres.contains("Sci-Fi"));
	}
}

#[tokio::test]
async fn pages_partition_the_ranked_list() {
	let harness = harness();
	let full = harness
		.service
		.search(SearchRequest { page_size: Some(80), ..query("mindfuck") })
		.await
		.expect("Search failed.");
	let mut stitched = Vec::new();

	for page in 1..=3 {
		let response = harness
			.service
			.search(SearchRequest { page: Some(page), page_size: Some(3), ..query("mindfuck") })
			.await
			.expect("Search failed.");

		assert_eq!(response.total, full.total);

		stitched.extend(response.results);
	}

	assert_eq!(stitched, full.results);
}

#[tokio::test]
async fn repeated_search_is_stable_and_embeds_once() {
	let harness = harness();
	let first = harness.service.search(query("mindfuck")).await.expect("Search failed.");
	let second = harness.service.search(query("mindfuck")).await.expect("Search failed.");

	assert_eq!(first.results, second.results);
	assert_eq!(harness.embedding.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn keyword_overlap_reorders_without_rescoring() {
	let harness = harness();
	let response = harness.service.search(query("memento thriller")).await.expect("Search failed.");
	let top = &response.results[0];

	assert_eq!(top.title.show_id, "s3");
	assert_eq!(top.score, Some(0.86));
	assert_eq!(ids(&response)[1], "s1");
}

#[tokio::test]
async fn rerank_failure_keeps_retrieval_order() {
	let harness = HarnessBuilder {
		rerank: ScriptedRerank::new(RerankMode::Fail),
		..HarnessBuilder::new()
	}
	.build();
	let response = harness.service.search(query("mindfuck")).await.expect("Search failed.");

	assert_eq!(harness.rerank.calls.load(Ordering::SeqCst), 1);
	assert_eq!(ids(&response), vec!["s1", "s2", "s3", "s4", "s5", "s8", "s9", "s6"]);
}

#[tokio::test]
async fn rerank_order_and_scores_win() {
	let harness = HarnessBuilder {
		rerank: ScriptedRerank::new(RerankMode::Reverse),
		..HarnessBuilder::new()
	}
	.build();
	let response = harness.service.search(query("mindfuck")).await.expect("Search failed.");

	assert_eq!(ids(&response), vec!["s6", "s9", "s8", "s5", "s4", "s3", "s2", "s1"]);
	assert_eq!(response.results[0].score, Some(1.0));
}

#[tokio::test]
async fn rerank_can_be_skipped_per_request() {
	let harness = HarnessBuilder {
		rerank: ScriptedRerank::new(RerankMode::Reverse),
		..HarnessBuilder::new()
	}
	.build();
	let response = harness
		.service
		.search(SearchRequest { rerank: Some(false), ..query("mindfuck") })
		.await
		.expect("Search failed.");

	assert_eq!(harness.rerank.calls.load(Ordering::SeqCst), 0);
	assert_eq!(ids(&response)[0], "s1");
}

#[tokio::test]
async fn reranked_top_k_limits_promoted_titles() {
	let harness = HarnessBuilder {
		rerank: ScriptedRerank::new(RerankMode::Reverse),
		..HarnessBuilder::new()
	}
	.build();
	let response = harness
		.service
		.search(SearchRequest { rerank_top_k: Some(2), ..query("mindfuck") })
		.await
		.expect("Search failed.");

	assert_eq!(ids(&response), vec!["s6", "s9", "s1", "s2", "s3", "s4", "s5", "s8"]);
}

#[tokio::test]
async fn explicit_sort_applies_after_ranking() {
	let harness = harness();
	let response = harness
		.service
		.search(SearchRequest { sort: Some(SortOrder::YearAsc), ..query("mindfuck") })
		.await
		.expect("Search failed.");

	assert_eq!(ids(&response), vec!["s3", "s4", "s1", "s9", "s2", "s5", "s6", "s8"]);
}

#[tokio::test]
async fn embedding_failure_yields_no_results() {
	let harness =
		HarnessBuilder { embedding: SpyEmbedding::new(true), ..HarnessBuilder::new() }.build();
	let response = harness.service.search(query("mindfuck")).await.expect("Search failed.");

	assert_eq!(response.total, 0);
	assert!(response.results.is_empty());
	assert_eq!(harness.store.nearest_calls.load(Ordering::SeqCst), 0);

	harness.service.search(query("mindfuck")).await.expect("Search failed.");

	assert_eq!(harness.embedding.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn punctuation_only_query_returns_nothing() {
	let harness = harness();
	let response = harness.service.search(query("?!")).await.expect("Search failed.");

	assert_eq!(response.total, 0);
	assert_eq!(harness.embedding.calls.load(Ordering::SeqCst), 0);
}

/// Two movies around one series, with a model rewrite that prefers series.
fn series_leaning_harness() -> Harness {
	let store = MemoryStore {
		titles: vec![
			(title("m1", "Movie", "Alpha", Some(2001), "R", "Dramas"), 0.900),
			(title("t1", "TV Show", "Beta", Some(2002), "TV-MA", "TV Dramas"), 0.897),
			(title("m2", "Movie", "Gamma", Some(2003), "R", "Dramas"), 0.893),
		],
		..MemoryStore::default()
	};
	let mut builder = HarnessBuilder {
		store,
		rewrite: SpyRewrite::replying(json!({
			"embedQuery": "quiet contemplative mood",
			"rerankQuery": "Find quiet, contemplative series.",
			"minScoreRatio": 0.9,
			"preferredType": "TV Show"
		})),
		..HarnessBuilder::new()
	};

	builder.cfg.providers.rewrite = Some(rewrite_config());

	builder.build()
}

#[tokio::test]
async fn preferred_type_nudges_near_ties() {
	let harness = series_leaning_harness();
	let response = harness.service.search(query("slow sad stories")).await.expect("Search failed.");
	let series = &response.results[0];

	assert_eq!(ids(&response), vec!["t1", "m1", "m2"]);
	assert!(series.score.is_some_and(|score| (score - 0.903).abs() < 1e-4));
	assert_eq!(response.results[1].score, Some(0.900));
}

#[tokio::test]
async fn explicit_type_filter_skips_preference_bonus() {
	let harness = series_leaning_harness();
	let response = harness
		.service
		.search(SearchRequest { kind: Some("TV Show".to_string()), ..query("slow sad stories") })
		.await
		.expect("Search failed.");

	assert_eq!(ids(&response), vec!["t1"]);
	assert_eq!(response.results[0].score, Some(0.897));
}
