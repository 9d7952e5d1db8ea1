use std::{
	collections::HashMap,
	env,
	sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use time::{Duration, OffsetDateTime};

use crate::{Error, PosterProvider, PosterStore, Result, VibeService, limiter::TaskLimiter};
use vibe_config::{Config, Posters};
use vibe_providers::posters::PosterQuery;
use vibe_storage::models::PosterRecord;

pub const MAX_BATCH_ITEMS: usize = 80;

type SharedFetch = Shared<BoxFuture<'static, PosterResponse>>;

/// Supplies the image provider credential at fetch time. `None` disables the provider.
pub type CredentialSource = Arc<dyn Fn() -> Option<String> + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PosterRequest {
	pub show_id: Option<String>,
	pub title: String,
	pub kind: Option<String>,
	pub year: Option<i32>,
	/// Ignores cooldowns and cached misses.
	pub refresh: bool,
}
impl PosterRequest {
	/// The show id when known, otherwise `type::title::year` with the title lowercased.
	pub fn cache_key(&self) -> String {
		if let Some(show_id) = self.show_id.as_deref().filter(|id| !id.is_empty()) {
			return show_id.to_string();
		}

		format!(
			"{}::{}::{}",
			self.kind.as_deref().unwrap_or("Any"),
			self.title.trim().to_lowercase(),
			self.year.map(|year| year.to_string()).unwrap_or_default()
		)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PosterStatus {
	Ready,
	Missing,
	Error,
	Cooldown,
}
impl PosterStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Ready => "ready",
			Self::Missing => "missing",
			Self::Error => "error",
			Self::Cooldown => "cooldown",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PosterSource {
	Cache,
	Provider,
	Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PosterResponse {
	pub poster_url: Option<String>,
	pub status: PosterStatus,
	pub source: PosterSource,
	#[serde(serialize_with = "crate::time_serde::serialize")]
	pub cooldown_until: Option<OffsetDateTime>,
}
impl PosterResponse {
	fn ready(url: String, source: PosterSource) -> Self {
		Self { poster_url: Some(url), status: PosterStatus::Ready, source, cooldown_until: None }
	}

	fn missing(source: PosterSource) -> Self {
		Self { poster_url: None, status: PosterStatus::Missing, source, cooldown_until: None }
	}

	fn cooldown(until: OffsetDateTime) -> Self {
		Self {
			poster_url: None,
			status: PosterStatus::Cooldown,
			source: PosterSource::Cache,
			cooldown_until: Some(until),
		}
	}

	fn error() -> Self {
		Self {
			poster_url: None,
			status: PosterStatus::Error,
			source: PosterSource::Provider,
			cooldown_until: None,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PosterBatchItem {
	pub show_id: Option<String>,
	#[serde(flatten)]
	pub poster: PosterResponse,
}

/// Cache-first poster lookup in front of a rate-limited image provider.
///
/// Concurrent lookups of one key share a single upstream fetch. Fetches run through a
/// [`TaskLimiter`], and cache writes are detached so a slow store never delays the response.
#[derive(Clone)]
pub struct PosterGateway {
	inner: Arc<GatewayInner>,
}
impl PosterGateway {
	/// Reads the credential from the configuration, then from `VIBE_POSTER_API_KEY`.
	pub fn new(
		cfg: Arc<Config>,
		store: Arc<dyn PosterStore>,
		provider: Arc<dyn PosterProvider>,
	) -> Self {
		let configured = cfg.providers.posters.api_key.clone();
		let credentials: CredentialSource = Arc::new(move || {
			configured
				.clone()
				.or_else(|| env::var(vibe_config::ENV_POSTER_API_KEY).ok())
				.filter(|key| !key.trim().is_empty())
		});

		Self::with_credentials(cfg, store, provider, credentials)
	}

	pub fn with_credentials(
		cfg: Arc<Config>,
		store: Arc<dyn PosterStore>,
		provider: Arc<dyn PosterProvider>,
		credentials: CredentialSource,
	) -> Self {
		let limiter = TaskLimiter::new(
			cfg.posters.concurrency as usize,
			std::time::Duration::from_millis(cfg.posters.min_delay_ms),
		);

		Self {
			inner: Arc::new(GatewayInner {
				cfg,
				store,
				provider,
				credentials,
				limiter,
				state: Mutex::new(ProviderState::default()),
				in_flight: Mutex::new(HashMap::new()),
			}),
		}
	}

	pub async fn resolve(&self, req: PosterRequest) -> PosterResponse {
		let inner = &self.inner;
		let has_credential = inner.credential().is_some();

		{
			let mut state = inner.state();

			if state.disabled && has_credential {
				state.disabled = false;

				tracing::info!("Poster provider credential found. Re-enabling lookups.");
			}
			if state.disabled {
				return PosterResponse::missing(PosterSource::Disabled);
			}
		}

		let key = req.cache_key();
		let cached = match inner.store.fetch(&key).await {
			Ok(cached) => cached,
			Err(err) => {
				tracing::warn!(error = %err, key = %key, "Poster cache read failed.");

				None
			},
		};

		if let Some(record) = cached.as_ref()
			&& let Some(response) =
				cached_response(record, &req, &inner.cfg.posters, has_credential)
		{
			return response;
		}

		self.coalesced(key, req, cached).await
	}

	/// Resolves every item concurrently, answering in input order.
	pub async fn resolve_many(&self, items: Vec<PosterRequest>) -> Result<Vec<PosterBatchItem>> {
		if items.is_empty() || items.len() > MAX_BATCH_ITEMS {
			return Err(Error::InvalidRequest {
				message: format!("items must contain between 1 and {MAX_BATCH_ITEMS} entries."),
			});
		}

		let lookups = items.into_iter().map(|req| async move {
			let show_id = req.show_id.clone();
			let poster = self.resolve(req).await;

			PosterBatchItem { show_id, poster }
		});

		Ok(futures::future::join_all(lookups).await)
	}

	/// Joins the in-flight fetch for `key`, or spawns one.
	///
	/// The fetch runs as its own task, so a caller that goes away neither cancels it nor lets a
	/// later caller start a second one. The task clears its entry once it has an answer.
	async fn coalesced(
		&self,
		key: String,
		req: PosterRequest,
		cached: Option<PosterRecord>,
	) -> PosterResponse {
		let fetch = {
			let mut in_flight = self.inner.in_flight();

			match in_flight.get(&key) {
				Some(fetch) => fetch.clone(),
				None => {
					let fetch = self.spawn_fetch(key.clone(), req, cached);

					in_flight.insert(key, fetch.clone());

					fetch
				},
			}
		};

		fetch.await
	}

	fn spawn_fetch(
		&self,
		key: String,
		req: PosterRequest,
		cached: Option<PosterRecord>,
	) -> SharedFetch {
		let inner = Arc::clone(&self.inner);
		let handle = tokio::spawn(async move {
			let response = Arc::clone(&inner).queued_fetch(key.clone(), req, cached).await;

			inner.in_flight().remove(&key);

			response
		});

		async move {
			handle.await.unwrap_or_else(|err| {
				tracing::error!(error = %err, "Poster fetch task failed.");

				PosterResponse::error()
			})
		}
		.boxed()
		.shared()
	}
}

impl VibeService {
	pub async fn resolve_poster(&self, req: PosterRequest) -> PosterResponse {
		self.posters.resolve(req).await
	}

	pub async fn resolve_posters(&self, items: Vec<PosterRequest>) -> Result<Vec<PosterBatchItem>> {
		self.posters.resolve_many(items).await
	}
}

#[derive(Debug, Default)]
struct ProviderState {
	disabled: bool,
	cooldown_until: Option<OffsetDateTime>,
}

struct GatewayInner {
	cfg: Arc<Config>,
	store: Arc<dyn PosterStore>,
	provider: Arc<dyn PosterProvider>,
	credentials: CredentialSource,
	limiter: TaskLimiter,
	state: Mutex<ProviderState>,
	in_flight: Mutex<HashMap<String, SharedFetch>>,
}
impl GatewayInner {
	fn credential(&self) -> Option<String> {
		(self.credentials)().filter(|key| !key.trim().is_empty())
	}

	fn state(&self) -> MutexGuard<'_, ProviderState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn in_flight(&self) -> MutexGuard<'_, HashMap<String, SharedFetch>> {
		self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
	}

	async fn queued_fetch(
		self: Arc<Self>,
		key: String,
		req: PosterRequest,
		cached: Option<PosterRecord>,
	) -> PosterResponse {
		let inner = Arc::clone(&self);
		let task = async move { inner.fetch(&key, &req, cached.as_ref()).await };

		match self.limiter.enqueue(task).await {
			Ok(response) => response,
			Err(err) => {
				tracing::error!(error = %err, "Poster fetch did not run.");

				PosterResponse::error()
			},
		}
	}

	async fn fetch(
		&self,
		key: &str,
		req: &PosterRequest,
		cached: Option<&PosterRecord>,
	) -> PosterResponse {
		let policy = &self.cfg.posters;
		let now = OffsetDateTime::now_utc();
		let mut record = merged_record(key, req, cached, now);
		let Some(api_key) = self.credential() else {
			self.state().disabled = true;

			record.status = PosterStatus::Missing.as_str().to_string();
			record.cooldown_until = Some(now + Duration::minutes(policy.disabled_cooldown_minutes));
			record.disabled_at = Some(now);

			self.write(record);

			return PosterResponse::missing(PosterSource::Disabled);
		};

		let provider_cooldown = self.state().cooldown_until;

		if let Some(until) = provider_cooldown.filter(|until| *until > now) {
			return PosterResponse::cooldown(until);
		}

		let query = PosterQuery { title: &req.title, kind: req.kind.as_deref(), year: req.year };
		let provider_cfg = &self.cfg.providers.posters;

		record.disabled_at = None;

		match self.provider.search(provider_cfg, &api_key, query).await {
			Ok(Some(found)) if found.thumb_url(provider_cfg).is_some() => {
				let thumb_url = found.thumb_url(provider_cfg);

				record.status = PosterStatus::Ready.as_str().to_string();
				record.tmdb_id = found.tmdb_id.or(record.tmdb_id);
				record.poster_url = found.poster_url(provider_cfg);
				record.thumb_url = thumb_url.clone();
				record.poster_path = found.poster_path;
				record.backdrop_path = found.backdrop_path;

				self.write(record);

				thumb_url.map_or_else(
					|| PosterResponse::missing(PosterSource::Provider),
					|url| PosterResponse::ready(url, PosterSource::Provider),
				)
			},
			Ok(_) => {
				record.status = PosterStatus::Missing.as_str().to_string();
				record.cooldown_until = Some(now + Duration::hours(policy.missing_retry_hours));

				self.write(record);

				PosterResponse::missing(PosterSource::Provider)
			},
			Err(err) => {
				if vibe_providers::is_throttled(&err) {
					let until = now + Duration::seconds(policy.provider_cooldown_seconds);
					let status = vibe_providers::status_of(&err);

					self.state().cooldown_until = Some(until);

					tracing::warn!(status, cooldown_until = %until, "Poster provider throttled.");
				} else {
					tracing::warn!(error = %err, key, "Poster lookup failed.");
				}

				let error_count = cached.and_then(|cached| cached.error_count).unwrap_or(0) + 1;

				record.status = PosterStatus::Error.as_str().to_string();
				record.error_count = Some(error_count);
				record.last_error_at = Some(now);
				record.cooldown_until = Some(now + error_backoff(policy, error_count));

				self.write(record);

				PosterResponse::error()
			},
		}
	}

	fn write(&self, record: PosterRecord) {
		let store = Arc::clone(&self.store);

		tokio::spawn(async move {
			if let Err(err) = store.upsert(record).await {
				tracing::error!(error = %err, "Failed to write poster cache record.");
			}
		});
	}
}

/// Answers from the cache record when policy allows, or `None` to go upstream.
fn cached_response(
	record: &PosterRecord,
	req: &PosterRequest,
	policy: &Posters,
	has_credential: bool,
) -> Option<PosterResponse> {
	let now = OffsetDateTime::now_utc();
	let missing = record.status == PosterStatus::Missing.as_str();

	if record.status == PosterStatus::Ready.as_str()
		&& let Some(url) = record.thumb_url.clone().or_else(|| record.poster_url.clone())
	{
		return Some(PosterResponse::ready(url, PosterSource::Cache));
	}

	let mut soft_bypass = false;

	if let Some(until) = record.cooldown_until
		&& until > now
		&& !req.refresh
	{
		if has_credential && is_soft_cooldown(record, policy) {
			soft_bypass = true;
		} else {
			return Some(PosterResponse::cooldown(until));
		}
	}

	if missing && !req.refresh && !soft_bypass {
		let stale = now - record.updated_at > Duration::hours(policy.missing_retry_hours);

		if !stale {
			return Some(PosterResponse::missing(PosterSource::Cache));
		}
	}

	None
}

/// Whether a `missing` record's cooldown was set while the provider had no credential.
///
/// Records carry an explicit `disabled_at` marker. Older rows without it are recognised by a
/// short cooldown and the absence of any recorded error.
pub fn is_soft_cooldown(record: &PosterRecord, policy: &Posters) -> bool {
	if record.status != PosterStatus::Missing.as_str() {
		return false;
	}
	if record.disabled_at.is_some() {
		return true;
	}

	let Some(until) = record.cooldown_until else {
		return false;
	};
	let span = until - record.updated_at;

	span > Duration::ZERO
		&& span <= Duration::minutes(policy.soft_cooldown_max_minutes)
		&& record.error_count.is_none()
		&& record.last_error_at.is_none()
}

/// `base * 2^(n-1)`, capped.
pub fn error_backoff(policy: &Posters, error_count: i32) -> Duration {
	let exponent = (error_count.max(1) - 1).min(32) as u32;
	let seconds = policy.error_backoff_base_seconds.saturating_mul(1_i64 << exponent);

	Duration::seconds(seconds.min(policy.error_backoff_max_hours.saturating_mul(3_600)))
}

// Unset fields keep their cached values.
fn merged_record(
	key: &str,
	req: &PosterRequest,
	cached: Option<&PosterRecord>,
	now: OffsetDateTime,
) -> PosterRecord {
	let mut record = cached.cloned().unwrap_or_else(|| PosterRecord {
		key: key.to_string(),
		show_id: None,
		title: String::new(),
		r#type: String::new(),
		year: None,
		status: PosterStatus::Missing.as_str().to_string(),
		tmdb_id: None,
		poster_path: None,
		backdrop_path: None,
		poster_url: None,
		thumb_url: None,
		cooldown_until: None,
		error_count: None,
		last_error_at: None,
		disabled_at: None,
		updated_at: now,
	});

	record.key = key.to_string();
	record.show_id = req.show_id.clone().or(record.show_id);
	record.title = req.title.clone();
	record.r#type = req.kind.clone().unwrap_or_default();
	record.year = req.year;
	record.updated_at = now;

	record
}

#[cfg(test)]
mod tests {
	use super::*;

	fn record(status: &str, cooldown_minutes: i64) -> PosterRecord {
		let now = OffsetDateTime::now_utc();

		PosterRecord {
			key: "s1".to_string(),
			show_id: Some("s1".to_string()),
			title: "Dark".to_string(),
			r#type: "TV Show".to_string(),
			year: Some(2017),
			status: status.to_string(),
			tmdb_id: None,
			poster_path: None,
			backdrop_path: None,
			poster_url: None,
			thumb_url: None,
			cooldown_until: Some(now + Duration::minutes(cooldown_minutes)),
			error_count: None,
			last_error_at: None,
			disabled_at: None,
			updated_at: now,
		}
	}

	#[test]
	fn cache_key_prefers_show_id() {
		let mut req = PosterRequest {
			show_id: Some("s42".to_string()),
			title: "  The Crown ".to_string(),
			kind: None,
			year: Some(2016),
			refresh: false,
		};

		assert_eq!(req.cache_key(), "s42");

		req.show_id = None;

		assert_eq!(req.cache_key(), "Any::the crown::2016");

		req.kind = Some("TV Show".to_string());
		req.year = None;

		assert_eq!(req.cache_key(), "TV Show::the crown::");
	}

	#[test]
	fn backoff_doubles_then_caps() {
		let policy = Posters::default();

		assert_eq!(error_backoff(&policy, 1), Duration::seconds(30));
		assert_eq!(error_backoff(&policy, 2), Duration::seconds(60));
		assert_eq!(error_backoff(&policy, 4), Duration::seconds(240));
		assert_eq!(error_backoff(&policy, 12), Duration::hours(6));
		assert_eq!(error_backoff(&policy, i32::MAX), Duration::hours(6));
	}

	#[test]
	fn soft_cooldown_needs_short_errorless_miss() {
		let policy = Posters::default();
		let mut soft = record("missing", 60);

		assert!(is_soft_cooldown(&soft, &policy));

		soft.error_count = Some(1);

		assert!(!is_soft_cooldown(&soft, &policy));
		assert!(!is_soft_cooldown(&record("missing", 24 * 60), &policy));
		assert!(!is_soft_cooldown(&record("error", 60), &policy));

		let mut marked = record("missing", 24 * 60);

		marked.disabled_at = Some(marked.updated_at);

		assert!(is_soft_cooldown(&marked, &policy));
	}

	#[test]
	fn cooldown_blocks_without_refresh() {
		let policy = Posters::default();
		let mut errored = record("error", 10);

		errored.error_count = Some(2);

		let req = PosterRequest { title: "Dark".to_string(), ..PosterRequest::default() };
		let response = cached_response(&errored, &req, &policy, true).expect("cached answer");

		assert_eq!(response.status, PosterStatus::Cooldown);
		assert_eq!(response.cooldown_until, errored.cooldown_until);

		let refresh = PosterRequest { refresh: true, ..req };

		assert!(cached_response(&errored, &refresh, &policy, true).is_none());
	}

	#[test]
	fn fresh_miss_is_served_from_cache() {
		let policy = Posters::default();
		let mut miss = record("missing", 24 * 60);

		miss.error_count = Some(1);
		miss.cooldown_until = None;

		let req = PosterRequest { title: "Dark".to_string(), ..PosterRequest::default() };
		let response = cached_response(&miss, &req, &policy, true).expect("cached answer");

		assert_eq!(response, PosterResponse::missing(PosterSource::Cache));

		miss.updated_at -= Duration::hours(25);

		assert!(cached_response(&miss, &req, &policy, true).is_none());
	}

	#[test]
	fn response_serializes_iso_cooldown() {
		let until = OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("timestamp");
		let value = serde_json::to_value(PosterResponse::cooldown(until)).expect("serialize");

		assert_eq!(value["status"], "cooldown");
		assert_eq!(value["source"], "cache");
		assert_eq!(value["cooldownUntil"], "2023-11-14T22:13:20Z");
		assert!(value["posterUrl"].is_null());

		let value =
			serde_json::to_value(PosterResponse::missing(PosterSource::Disabled)).expect("json");

		assert!(value["cooldownUntil"].is_null());
	}
}
