use std::{
	sync::{Mutex, PoisonError},
	time::Duration,
};

use serde_json::Value;
use tokio::time::Instant;

use crate::{RewriteProvider, VibeService, cache::TtlCache};
use vibe_config::{LlmProviderConfig, SearchRewrite};
use vibe_domain::{
	catalog::PreferredType,
	query::normalize_query,
	rewrite::{RewriteResult, clamp_ratio, heuristic_rewrite},
};

const CACHE_MAX_ENTRIES: usize = 1_000;
const MODEL_DEFAULT_RATIO: f32 = 0.7;
const SYSTEM_PROMPT: &str = "You rewrite user queries for a semantic movie and TV search. \
Return a JSON object with keys: embedQuery, rerankQuery, minScoreRatio, preferredType. \
preferredType must be \"Movie\", \"TV Show\", or \"Any\". \
minScoreRatio should be between 0.55 and 0.9.";

/// Rule-table rewrite with optional model enrichment, cached per normalized query.
///
/// A throttled model call opens a breaker; while it is open every query takes the rule table.
pub struct QueryRewriter {
	cache: TtlCache<String, RewriteResult>,
	breaker_window: Duration,
	blocked_until: Mutex<Option<Instant>>,
}
impl QueryRewriter {
	pub fn new(cfg: &SearchRewrite) -> Self {
		Self {
			cache: TtlCache::new(Duration::from_secs(cfg.cache_ttl_seconds), CACHE_MAX_ENTRIES),
			breaker_window: Duration::from_secs(cfg.circuit_breaker_seconds),
			blocked_until: Mutex::new(None),
		}
	}

	pub async fn rewrite(
		&self,
		cfg: Option<&LlmProviderConfig>,
		provider: &dyn RewriteProvider,
		raw: &str,
	) -> RewriteResult {
		let query = normalize_query(raw);

		if query.is_empty() {
			return heuristic_rewrite(&query);
		}
		if let Some(cached) = self.cache.get(&query) {
			return cached;
		}

		let remote = cfg.and_then(|cfg| cfg.api_key.as_deref().map(|key| (cfg, key)));
		let value = match remote {
			Some((cfg, api_key)) if !self.is_blocked() =>
				self.enrich(cfg, api_key, provider, &query).await,
			_ => heuristic_rewrite(&query),
		};

		self.cache.insert(query, value.clone());

		value
	}

	pub fn is_blocked(&self) -> bool {
		let blocked_until = self.blocked_until.lock().unwrap_or_else(PoisonError::into_inner);

		blocked_until.is_some_and(|until| Instant::now() < until)
	}

	async fn enrich(
		&self,
		cfg: &LlmProviderConfig,
		api_key: &str,
		provider: &dyn RewriteProvider,
		query: &str,
	) -> RewriteResult {
		let messages = [
			serde_json::json!({ "role": "system", "content": SYSTEM_PROMPT }),
			serde_json::json!({ "role": "user", "content": format!("Rewrite: {query}") }),
		];

		match provider.complete_json(cfg, api_key, &messages).await {
			Ok(parsed) => parse_rewrite(&parsed, query),
			Err(err) => {
				if vibe_providers::status_of(&err) == Some(429) {
					*self.blocked_until.lock().unwrap_or_else(PoisonError::into_inner) =
						Some(Instant::now() + self.breaker_window);

					tracing::warn!(
						window_seconds = self.breaker_window.as_secs(),
						"Rewrite provider throttled. Using rule-based rewrites."
					);
				} else {
					tracing::warn!(error = %err, "Rewrite provider failed. Using rule-based rewrite.");
				}

				heuristic_rewrite(query)
			},
		}
	}
}

impl VibeService {
	pub async fn rewrite(&self, raw: &str) -> RewriteResult {
		self.rewriter
			.rewrite(self.cfg.providers.rewrite.as_ref(), self.providers.rewrite.as_ref(), raw)
			.await
	}
}

/// Reads model output leniently. Missing fields fall back to the query itself.
pub fn parse_rewrite(parsed: &Value, query: &str) -> RewriteResult {
	let text = |key: &str| match parsed.get(key) {
		None | Some(Value::Null) => query.to_string(),
		Some(Value::String(text)) => text.clone(),
		Some(other) => other.to_string(),
	};
	let ratio = match parsed.get("minScoreRatio") {
		None | Some(Value::Null) => MODEL_DEFAULT_RATIO,
		Some(Value::Number(number)) => number.as_f64().map_or(f32::NAN, |ratio| ratio as f32),
		Some(Value::String(raw)) => raw.trim().parse().unwrap_or(f32::NAN),
		Some(_) => f32::NAN,
	};

	RewriteResult {
		embed_query: text("embedQuery"),
		rerank_query: text("rerankQuery"),
		min_score_ratio: clamp_ratio(ratio),
		preferred_type: parsed
			.get("preferredType")
			.and_then(Value::as_str)
			.map(PreferredType::parse)
			.unwrap_or_default(),
	}
}
