use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub ranking: Ranking,
	#[serde(default)]
	pub posters: Posters,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub rerank: ProviderConfig,
	/// Optional. Without it every query goes through the heuristic rewrite only.
	pub rewrite: Option<LlmProviderConfig>,
	pub posters: PosterProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	/// Blank keys are normalized to `None`, which disables the remote rewrite.
	pub api_key: Option<String>,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct PosterProviderConfig {
	pub api_base: String,
	/// Blank keys are normalized to `None`; the poster gateway then reports `disabled`.
	pub api_key: Option<String>,
	#[serde(default = "default_backdrop_base")]
	pub backdrop_base: String,
	#[serde(default = "default_poster_base")]
	pub poster_base: String,
	pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	pub default_page_size: u32,
	pub max_page_size: u32,
	pub max_page: u32,
	pub default_rerank_top_k: u32,
	pub rerank_enabled: bool,
	pub rewrite: SearchRewrite,
	pub embedding_cache: SearchEmbeddingCache,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			default_page_size: 20,
			max_page_size: 80,
			max_page: 10_000,
			default_rerank_top_k: 10,
			rerank_enabled: true,
			rewrite: SearchRewrite::default(),
			embedding_cache: SearchEmbeddingCache::default(),
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SearchRewrite {
	pub cache_ttl_seconds: u64,
	pub circuit_breaker_seconds: u64,
}
impl Default for SearchRewrite {
	fn default() -> Self {
		Self { cache_ttl_seconds: 600, circuit_breaker_seconds: 180 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SearchEmbeddingCache {
	pub ttl_seconds: u64,
	pub max_entries: usize,
}
impl Default for SearchEmbeddingCache {
	fn default() -> Self {
		Self { ttl_seconds: 3_600, max_entries: 200 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Ranking {
	pub default_min_score_ratio: f32,
	pub type_preference_bonus: f32,
	pub lexical_weight: f32,
	pub lexical_min_hits: u32,
	pub lexical_scope: u32,
	pub max_keywords: u32,
	pub rerank_scope: u32,
	pub rerank_default_top_k: u32,
	pub max_candidates: u32,
	pub candidate_floor: u32,
	pub candidate_per_page: u32,
	pub candidate_slack: u32,
}
impl Default for Ranking {
	fn default() -> Self {
		Self {
			default_min_score_ratio: 0.75,
			type_preference_bonus: 0.006,
			lexical_weight: 0.02,
			lexical_min_hits: 2,
			lexical_scope: 500,
			max_keywords: 12,
			rerank_scope: 100,
			rerank_default_top_k: 20,
			max_candidates: 2_000,
			candidate_floor: 200,
			candidate_per_page: 20,
			candidate_slack: 200,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Posters {
	pub concurrency: u32,
	pub min_delay_ms: u64,
	pub missing_retry_hours: i64,
	pub disabled_cooldown_minutes: i64,
	pub soft_cooldown_max_minutes: i64,
	pub error_backoff_base_seconds: i64,
	pub error_backoff_max_hours: i64,
	pub provider_cooldown_seconds: i64,
}
impl Default for Posters {
	fn default() -> Self {
		Self {
			concurrency: 6,
			min_delay_ms: 75,
			missing_retry_hours: 24,
			disabled_cooldown_minutes: 60,
			soft_cooldown_max_minutes: 120,
			error_backoff_base_seconds: 30,
			error_backoff_max_hours: 6,
			provider_cooldown_seconds: 120,
		}
	}
}

fn default_backdrop_base() -> String {
	"https://image.tmdb.org/t/p/w780".to_string()
}

fn default_poster_base() -> String {
	"https://image.tmdb.org/t/p/w500".to_string()
}
