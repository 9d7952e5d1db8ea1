use std::sync::atomic::Ordering;

use serde_json::json;

use super::{HarnessBuilder, SpyRewrite, rewrite_config};
use vibe_domain::{catalog::PreferredType, rewrite::heuristic_rewrite};
use vibe_service::SearchRequest;

fn with_model(rewrite: SpyRewrite) -> super::Harness {
	let mut builder = HarnessBuilder { rewrite, ..HarnessBuilder::new() };

	builder.cfg.providers.rewrite = Some(rewrite_config());

	builder.build()
}

#[tokio::test]
async fn model_rewrite_is_cached_per_normalized_query() {
	let harness = with_model(SpyRewrite::replying(json!({
		"embedQuery": "twisty heist caper",
		"rerankQuery": "Find heist films with twists.",
		"minScoreRatio": 0.8,
		"preferredType": "Movie"
	})));
	let first = harness.service.rewrite("heists").await;
	let second = harness.service.rewrite("  heists!! ").await;

	assert_eq!(first.embed_query, "twisty heist caper");
	assert_eq!(first.preferred_type, PreferredType::Movie);
	assert_eq!(first.min_score_ratio, 0.8);
	assert_eq!(first, second);
	assert_eq!(harness.rewrite.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn throttled_model_opens_breaker() {
	let harness = with_model(SpyRewrite::failing(429));
	let first = harness.service.rewrite("haunted lighthouse").await;
	let second = harness.service.rewrite("zombie road trip").await;

	assert_eq!(first, heuristic_rewrite("haunted lighthouse"));
	assert_eq!(second, heuristic_rewrite("zombie road trip"));
	assert_eq!(harness.rewrite.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn other_model_failures_do_not_open_breaker() {
	let harness = with_model(SpyRewrite::failing(500));

	harness.service.rewrite("haunted lighthouse").await;
	harness.service.rewrite("zombie road trip").await;

	assert_eq!(harness.rewrite.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn missing_key_skips_model() {
	let mut builder = HarnessBuilder {
		rewrite: SpyRewrite::replying(json!({ "embedQuery": "unused" })),
		..HarnessBuilder::new()
	};
	let mut cfg = rewrite_config();

	cfg.api_key = None;
	builder.cfg.providers.rewrite = Some(cfg);

	let harness = builder.build();
	let rewrite = harness.service.rewrite("mindfuck").await;

	assert_eq!(rewrite, heuristic_rewrite("mindfuck"));
	assert_eq!(harness.rewrite.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn model_ratio_drives_search_cutoff() {
	let harness = with_model(SpyRewrite::replying(json!({
		"embedQuery": "quiet contemplative story",
		"rerankQuery": "Find quiet, contemplative stories.",
		"minScoreRatio": 0.9,
		"preferredType": "Any"
	})));
	let response = harness
		.service
		.search(SearchRequest { query: "slow sad film".to_string(), ..SearchRequest::default() })
		.await
		.expect("Search failed.");

	assert_eq!(response.total, 7);
	assert!(!response.results.iter().any(|item| item.title.show_id == "s6"));
}
