use time::{Duration, OffsetDateTime};

use super::{HarnessBuilder, PosterOutcome, SlowPosters, harness, wait_for_poster};
use vibe_service::{Error, PosterRequest, PosterSource, PosterStatus};
use vibe_storage::models::PosterRecord;

const BACKDROP_URL: &str = "https://img.test/w780/backdrop.jpg";

fn inception() -> PosterRequest {
	PosterRequest {
		show_id: Some("s1".to_string()),
		title: "Inception".to_string(),
		kind: Some("Movie".to_string()),
		year: Some(2010),
		refresh: false,
	}
}

fn record(key: &str, status: &str, updated_at: OffsetDateTime) -> PosterRecord {
	PosterRecord {
		key: key.to_string(),
		show_id: Some(key.to_string()),
		title: "Inception".to_string(),
		r#type: "Movie".to_string(),
		year: Some(2010),
		status: status.to_string(),
		tmdb_id: None,
		poster_path: None,
		backdrop_path: None,
		poster_url: None,
		thumb_url: None,
		cooldown_until: None,
		error_count: None,
		last_error_at: None,
		disabled_at: None,
		updated_at,
	}
}

#[tokio::test]
async fn provider_hit_is_cached() {
	let harness = harness();
	let first = harness.service.resolve_poster(inception()).await;

	assert_eq!(first.status, PosterStatus::Ready);
	assert_eq!(first.source, PosterSource::Provider);
	assert_eq!(first.poster_url.as_deref(), Some(BACKDROP_URL));

	let stored = wait_for_poster(&harness.store, "s1").await;

	assert_eq!(stored.status, "ready");
	assert_eq!(stored.tmdb_id, Some(42));
	assert_eq!(stored.poster_url.as_deref(), Some("https://img.test/w500/poster.jpg"));

	let second = harness.service.resolve_poster(inception()).await;

	assert_eq!(second.source, PosterSource::Cache);
	assert_eq!(second.poster_url.as_deref(), Some(BACKDROP_URL));
	assert_eq!(harness.posters.count(), 1);
}

#[tokio::test]
async fn concurrent_lookups_share_one_fetch() {
	let harness = harness();
	let lookups = (0..5).map(|_| harness.service.resolve_poster(inception()));
	let responses = futures::future::join_all(lookups).await;

	assert_eq!(harness.posters.count(), 1);
	assert!(responses.iter().all(|response| response.status == PosterStatus::Ready));
}

#[tokio::test]
async fn abandoned_lookup_keeps_its_fetch_shared() {
	let harness = harness();
	let abandoned = tokio::time::timeout(
		std::time::Duration::from_millis(10),
		harness.service.resolve_poster(inception()),
	)
	.await;

	assert!(abandoned.is_err());

	let response = harness.service.resolve_poster(inception()).await;

	assert_eq!(response.status, PosterStatus::Ready);
	assert_eq!(response.source, PosterSource::Provider);
	assert_eq!(harness.posters.count(), 1);
}

#[tokio::test]
async fn hard_cooldown_blocks_until_refresh() {
	let harness = harness();
	let now = OffsetDateTime::now_utc();
	let mut cached = record("s1", "error", now);

	cached.cooldown_until = Some(now + Duration::hours(1));
	cached.error_count = Some(1);
	cached.last_error_at = Some(now);

	harness.store.put_poster(cached);

	let blocked = harness.service.resolve_poster(inception()).await;

	assert_eq!(blocked.status, PosterStatus::Cooldown);
	assert_eq!(blocked.cooldown_until, Some(now + Duration::hours(1)));
	assert_eq!(harness.posters.count(), 0);

	let refreshed =
		harness.service.resolve_poster(PosterRequest { refresh: true, ..inception() }).await;

	assert_eq!(refreshed.status, PosterStatus::Ready);
	assert_eq!(harness.posters.count(), 1);
}

#[tokio::test]
async fn disabled_marker_cooldown_is_bypassed_with_credential() {
	let harness = harness();
	let now = OffsetDateTime::now_utc();
	let mut cached = record("s1", "missing", now);

	cached.cooldown_until = Some(now + Duration::hours(12));
	cached.disabled_at = Some(now);

	harness.store.put_poster(cached);

	let response = harness.service.resolve_poster(inception()).await;

	assert_eq!(response.status, PosterStatus::Ready);
	assert_eq!(harness.posters.count(), 1);
}

#[tokio::test]
async fn short_unmarked_miss_cooldown_is_bypassed() {
	let harness = harness();
	let now = OffsetDateTime::now_utc();
	let mut legacy = record("s1", "missing", now);

	legacy.cooldown_until = Some(now + Duration::minutes(60));

	harness.store.put_poster(legacy);

	assert_eq!(harness.service.resolve_poster(inception()).await.status, PosterStatus::Ready);
	assert_eq!(harness.posters.count(), 1);
}

#[tokio::test]
async fn long_miss_cooldown_is_respected() {
	let harness = harness();
	let now = OffsetDateTime::now_utc();
	let mut cached = record("s1", "missing", now);

	cached.cooldown_until = Some(now + Duration::hours(24));

	harness.store.put_poster(cached);

	assert_eq!(harness.service.resolve_poster(inception()).await.status, PosterStatus::Cooldown);
	assert_eq!(harness.posters.count(), 0);
}

#[tokio::test]
async fn cached_miss_is_served_until_stale() {
	let harness = harness();
	let now = OffsetDateTime::now_utc();

	harness.store.put_poster(record("s1", "missing", now));

	let fresh = harness.service.resolve_poster(inception()).await;

	assert_eq!((fresh.status, fresh.source), (PosterStatus::Missing, PosterSource::Cache));
	assert_eq!(harness.posters.count(), 0);

	harness.store.put_poster(record("s1", "missing", now - Duration::hours(25)));

	let stale = harness.service.resolve_poster(inception()).await;

	assert_eq!(stale.status, PosterStatus::Ready);
	assert_eq!(harness.posters.count(), 1);
}

#[tokio::test]
async fn provider_miss_sets_retry_window() {
	let harness = HarnessBuilder {
		posters: SlowPosters::new(PosterOutcome::NotFound),
		..HarnessBuilder::new()
	}
	.build();
	let response = harness.service.resolve_poster(inception()).await;

	assert_eq!((response.status, response.source), (PosterStatus::Missing, PosterSource::Provider));

	let stored = wait_for_poster(&harness.store, "s1").await;
	let window = stored.cooldown_until.expect("Missing cooldown.") - stored.updated_at;

	assert_eq!(stored.status, "missing");
	assert!(window > Duration::hours(23) && window <= Duration::hours(24));
	assert!(stored.disabled_at.is_none());
}

#[tokio::test]
async fn missing_credential_disables_until_one_appears() {
	let (harness, credential) = HarnessBuilder::new().build_with_credential();
	let first = harness.service.resolve_poster(inception()).await;

	assert_eq!((first.status, first.source), (PosterStatus::Missing, PosterSource::Disabled));

	let stored = wait_for_poster(&harness.store, "s1").await;

	assert!(stored.disabled_at.is_some());
	assert!(stored.cooldown_until.is_some());

	let still_disabled = harness.service.resolve_poster(inception()).await;

	assert_eq!(still_disabled.source, PosterSource::Disabled);
	assert_eq!(harness.posters.count(), 0);

	*credential.lock().expect("credential lock") = Some("fresh-key".to_string());

	let enabled = harness.service.resolve_poster(inception()).await;

	assert_eq!(enabled.status, PosterStatus::Ready);
	assert_eq!(harness.posters.count(), 1);
}

#[tokio::test]
async fn throttling_pauses_every_key() {
	let harness = HarnessBuilder {
		posters: SlowPosters::new(PosterOutcome::Status(429)),
		..HarnessBuilder::new()
	}
	.build();
	let first = harness.service.resolve_poster(inception()).await;

	assert_eq!(first.status, PosterStatus::Error);

	let other = harness
		.service
		.resolve_poster(PosterRequest {
			show_id: Some("s3".to_string()),
			title: "Memento".to_string(),
			..inception()
		})
		.await;

	assert_eq!(other.status, PosterStatus::Cooldown);
	assert!(other.cooldown_until.is_some_and(|until| until > OffsetDateTime::now_utc()));
	assert_eq!(harness.posters.count(), 1);

	let stored = wait_for_poster(&harness.store, "s1").await;

	assert_eq!(stored.status, "error");
	assert_eq!(stored.error_count, Some(1));
	assert!(stored.last_error_at.is_some());
}

#[tokio::test]
async fn repeated_errors_back_off() {
	let harness = HarnessBuilder {
		posters: SlowPosters::new(PosterOutcome::Status(404)),
		..HarnessBuilder::new()
	}
	.build();

	harness.service.resolve_poster(inception()).await;

	let first = wait_for_poster(&harness.store, "s1").await;

	assert_eq!(first.error_count, Some(1));

	harness.service.resolve_poster(PosterRequest { refresh: true, ..inception() }).await;

	let mut second = first.clone();

	for _ in 0..100 {
		second = harness.store.poster("s1").expect("Record vanished.");

		if second.error_count == Some(2) {
			break;
		}

		tokio::time::sleep(std::time::Duration::from_millis(10)).await;
	}

	let first_window = first.cooldown_until.expect("Missing cooldown.") - first.updated_at;
	let second_window = second.cooldown_until.expect("Missing cooldown.") - second.updated_at;

	assert_eq!(second.error_count, Some(2));
	assert_eq!(first_window, Duration::seconds(30));
	assert_eq!(second_window, Duration::seconds(60));
	assert_eq!(harness.posters.count(), 2);
}

#[tokio::test]
async fn batch_answers_in_order() {
	let harness = harness();
	let items = vec![
		inception(),
		PosterRequest {
			show_id: Some("s3".to_string()),
			title: "Memento".to_string(),
			..inception()
		},
		PosterRequest { show_id: None, title: "Dark".to_string(), ..PosterRequest::default() },
	];
	let results = harness.service.resolve_posters(items).await.expect("Batch failed.");
	let show_ids: Vec<Option<&str>> = results.iter().map(|item| item.show_id.as_deref()).collect();

	assert_eq!(show_ids, vec![Some("s1"), Some("s3"), None]);
	assert!(results.iter().all(|item| item.poster.status == PosterStatus::Ready));
	assert_eq!(harness.posters.count(), 3);
}

#[tokio::test]
async fn batch_size_is_bounded() {
	let harness = harness();
	let empty = harness.service.resolve_posters(Vec::new()).await;
	let oversized = harness.service.resolve_posters(vec![inception(); 81]).await;

	assert!(matches!(empty, Err(Error::InvalidRequest { .. })));
	assert!(matches!(oversized, Err(Error::InvalidRequest { .. })));
	assert_eq!(harness.posters.count(), 0);
}
