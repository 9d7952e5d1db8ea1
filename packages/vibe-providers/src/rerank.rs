use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

/// One provider result: a position in the submitted documents and its relevance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RerankHit {
	pub index: usize,
	pub relevance_score: f32,
}

/// Returns hits in the order the provider ranked them, at most `top_k` of them.
pub async fn rerank(
	cfg: &vibe_config::ProviderConfig,
	query: &str,
	docs: &[String],
	top_k: usize,
) -> Result<Vec<RerankHit>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"query": query,
		"documents": docs,
		"top_k": top_k,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json = crate::read_json(res).await?;
	let mut hits = parse_rerank_response(json, docs.len())?;

	hits.truncate(top_k);

	Ok(hits)
}

fn parse_rerank_response(json: Value, doc_count: usize) -> Result<Vec<RerankHit>> {
	let results = json
		.get("data")
		.or_else(|| json.get("results"))
		.and_then(|v| v.as_array())
		.ok_or_else(|| eyre::eyre!("Rerank response is missing results array."))?;
	let mut hits = Vec::with_capacity(results.len());

	for item in results {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.ok_or_else(|| eyre::eyre!("Rerank result missing index."))? as usize;
		let score = item
			.get("relevance_score")
			.or_else(|| item.get("score"))
			.and_then(|v| v.as_f64())
			.ok_or_else(|| eyre::eyre!("Rerank result missing score."))? as f32;

		// Out-of-range or repeated indices cannot be mapped back onto the scope.
		if index >= doc_count || hits.iter().any(|hit: &RerankHit| hit.index == index) {
			continue;
		}

		hits.push(RerankHit { index, relevance_score: score });
	}

	Ok(hits)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keeps_provider_order() {
		let json = serde_json::json!({
			"data": [
				{ "index": 2, "relevance_score": 0.9 },
				{ "index": 0, "relevance_score": 0.4 }
			]
		});
		let hits = parse_rerank_response(json, 3).expect("parse failed");

		assert_eq!(
			hits,
			vec![
				RerankHit { index: 2, relevance_score: 0.9 },
				RerankHit { index: 0, relevance_score: 0.4 },
			]
		);
	}

	#[test]
	fn drops_unknown_indices() {
		let json = serde_json::json!({
			"results": [
				{ "index": 7, "score": 0.9 },
				{ "index": 1, "score": 0.5 },
				{ "index": 1, "score": 0.3 }
			]
		});
		let hits = parse_rerank_response(json, 2).expect("parse failed");

		assert_eq!(hits, vec![RerankHit { index: 1, relevance_score: 0.5 }]);
	}

	#[test]
	fn missing_results_is_an_error() {
		assert!(parse_rerank_response(serde_json::json!({ "object": "list" }), 2).is_err());
	}
}
