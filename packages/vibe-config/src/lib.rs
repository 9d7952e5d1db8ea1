mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, LlmProviderConfig, PosterProviderConfig, Posters, Postgres,
	ProviderConfig, Providers, Qdrant, Ranking, Search, SearchEmbeddingCache, SearchRewrite,
	Service, Storage,
};

use std::{env, fs, path::Path};

pub const ENV_POSTER_CONCURRENCY: &str = "VIBE_POSTER_CONCURRENCY";
pub const ENV_POSTER_MIN_DELAY_MS: &str = "VIBE_POSTER_MIN_DELAY_MS";
pub const ENV_REWRITE_API_KEY: &str = "VIBE_REWRITE_API_KEY";
pub const ENV_POSTER_API_KEY: &str = "VIBE_POSTER_API_KEY";

pub const POSTER_CONCURRENCY_RANGE: (u32, u32) = (1, 12);
pub const POSTER_MAX_MIN_DELAY_MS: u64 = 2_000;
/// Longest span any poster cooldown, retry window, or backoff setting may express.
pub const POSTER_MAX_SPAN_SECONDS: i64 = 366 * 24 * 3_600;
pub const MAX_PAGE_SIZE: u32 = 80;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	apply_env_overrides(&mut cfg, |name| env::var(name).ok());

	validate(&cfg)?;

	Ok(cfg)
}

/// Applies the environment knobs on top of the file values.
///
/// Numeric overrides are clamped into the ranges `validate` accepts; unparsable values are
/// ignored. Credentials only fill in keys the file left blank.
pub fn apply_env_overrides<F>(cfg: &mut Config, lookup: F)
where
	F: Fn(&str) -> Option<String>,
{
	if let Some(raw) = lookup(ENV_POSTER_CONCURRENCY)
		&& let Ok(value) = raw.trim().parse::<f64>()
		&& value.is_finite()
	{
		let (min, max) = POSTER_CONCURRENCY_RANGE;

		cfg.posters.concurrency = (value.round() as i64).clamp(min as i64, max as i64) as u32;
	}
	if let Some(raw) = lookup(ENV_POSTER_MIN_DELAY_MS)
		&& let Ok(value) = raw.trim().parse::<f64>()
		&& value.is_finite()
	{
		cfg.posters.min_delay_ms =
			(value.round() as i64).clamp(0, POSTER_MAX_MIN_DELAY_MS as i64) as u64;
	}
	if cfg.providers.posters.api_key.is_none() {
		cfg.providers.posters.api_key = non_blank(lookup(ENV_POSTER_API_KEY));
	}
	if let Some(rewrite) = cfg.providers.rewrite.as_mut()
		&& rewrite.api_key.is_none()
	{
		rewrite.api_key = non_blank(lookup(ENV_REWRITE_API_KEY));
	}
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}

	for (label, key) in
		[("embedding", &cfg.providers.embedding.api_key), ("rerank", &cfg.providers.rerank.api_key)]
	{
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	if cfg.search.max_page_size == 0 || cfg.search.max_page_size > MAX_PAGE_SIZE {
		return Err(Error::Validation {
			message: format!("search.max_page_size must be in the range 1-{MAX_PAGE_SIZE}."),
		});
	}
	if cfg.search.default_page_size == 0 || cfg.search.default_page_size > cfg.search.max_page_size
	{
		return Err(Error::Validation {
			message: "search.default_page_size must be in the range 1-search.max_page_size."
				.to_string(),
		});
	}
	if cfg.search.max_page == 0 {
		return Err(Error::Validation {
			message: "search.max_page must be greater than zero.".to_string(),
		});
	}
	if cfg.search.embedding_cache.max_entries == 0 {
		return Err(Error::Validation {
			message: "search.embedding_cache.max_entries must be greater than zero.".to_string(),
		});
	}

	let ranking = &cfg.ranking;

	if !ranking.default_min_score_ratio.is_finite()
		|| !(0.0..=1.0).contains(&ranking.default_min_score_ratio)
	{
		return Err(Error::Validation {
			message: "ranking.default_min_score_ratio must be in the range 0.0-1.0.".to_string(),
		});
	}

	for (label, weight) in [
		("ranking.type_preference_bonus", ranking.type_preference_bonus),
		("ranking.lexical_weight", ranking.lexical_weight),
	] {
		if !weight.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if weight < 0.0 {
			return Err(Error::Validation { message: format!("{label} must be zero or greater.") });
		}
	}

	if ranking.rerank_scope == 0 {
		return Err(Error::Validation {
			message: "ranking.rerank_scope must be greater than zero.".to_string(),
		});
	}
	if ranking.max_candidates == 0 || ranking.candidate_floor > ranking.max_candidates {
		return Err(Error::Validation {
			message: "ranking.max_candidates must be greater than zero and at least ranking.candidate_floor."
				.to_string(),
		});
	}

	let (min_concurrency, max_concurrency) = POSTER_CONCURRENCY_RANGE;

	if !(min_concurrency..=max_concurrency).contains(&cfg.posters.concurrency) {
		return Err(Error::Validation {
			message: format!(
				"posters.concurrency must be in the range {min_concurrency}-{max_concurrency}."
			),
		});
	}
	if cfg.posters.min_delay_ms > POSTER_MAX_MIN_DELAY_MS {
		return Err(Error::Validation {
			message: format!("posters.min_delay_ms must be {POSTER_MAX_MIN_DELAY_MS} or less."),
		});
	}

	for (label, value, unit_seconds) in [
		("posters.missing_retry_hours", cfg.posters.missing_retry_hours, 3_600),
		("posters.disabled_cooldown_minutes", cfg.posters.disabled_cooldown_minutes, 60),
		("posters.soft_cooldown_max_minutes", cfg.posters.soft_cooldown_max_minutes, 60),
		("posters.error_backoff_base_seconds", cfg.posters.error_backoff_base_seconds, 1),
		("posters.error_backoff_max_hours", cfg.posters.error_backoff_max_hours, 3_600),
		("posters.provider_cooldown_seconds", cfg.posters.provider_cooldown_seconds, 1),
	] {
		if value <= 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
		if value > POSTER_MAX_SPAN_SECONDS / unit_seconds {
			return Err(Error::Validation {
				message: format!(
					"{label} must span at most {} days.",
					POSTER_MAX_SPAN_SECONDS / 86_400
				),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if let Some(rewrite) = cfg.providers.rewrite.as_mut()
		&& rewrite.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false)
	{
		rewrite.api_key = None;
	}
	if cfg.providers.posters.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false)
	{
		cfg.providers.posters.api_key = None;
	}
}

fn non_blank(value: Option<String>) -> Option<String> {
	value.map(|raw| raw.trim().to_string()).filter(|raw| !raw.is_empty())
}
