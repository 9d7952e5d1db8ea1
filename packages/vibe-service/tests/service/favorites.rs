use super::harness;
use vibe_service::{Error, FavoriteOwner, SearchRequest};

fn user(id: &str) -> FavoriteOwner {
	FavoriteOwner::User(id.to_string())
}

#[tokio::test]
async fn toggle_adds_then_removes() {
	let harness = harness();
	let owner = user("u1");
	let added = harness.service.toggle_favorite(&owner, " s3 ").await.expect("Toggle failed.");

	assert_eq!(added.show_id, "s3");
	assert!(added.is_favorite);

	let removed = harness.service.toggle_favorite(&owner, "s3").await.expect("Toggle failed.");

	assert!(!removed.is_favorite);
	assert_eq!(
		harness.service.list_favorites(&owner, None, None).await.expect("List failed.").total,
		0
	);
}

#[tokio::test]
async fn toggle_rejects_unknown_and_blank_titles() {
	let harness = harness();
	let owner = user("u1");

	assert!(matches!(
		harness.service.toggle_favorite(&owner, "s404").await,
		Err(Error::NotFound { .. })
	));
	assert!(matches!(
		harness.service.toggle_favorite(&owner, "  ").await,
		Err(Error::InvalidRequest { .. })
	));
}

#[tokio::test]
async fn favorites_are_scoped_to_owner_and_newest_first() {
	let harness = harness();
	let owner = user("u1");
	let session = FavoriteOwner::Session("u1".to_string());

	for show_id in ["s1", "s2", "s3"] {
		harness.service.toggle_favorite(&owner, show_id).await.expect("Toggle failed.");
	}

	harness.service.toggle_favorite(&session, "s9").await.expect("Toggle failed.");

	let page =
		harness.service.list_favorites(&owner, Some(1), Some(2)).await.expect("List failed.");
	let ids: Vec<&str> = page.results.iter().map(|item| item.title.show_id.as_str()).collect();

	assert_eq!(page.total, 3);
	assert_eq!(ids, vec!["s3", "s2"]);
	assert!(page.results.iter().all(|item| item.is_favorite == Some(true)));

	let other = harness.service.list_favorites(&session, None, None).await.expect("List failed.");

	assert_eq!(other.total, 1);
}

#[tokio::test]
async fn search_marks_favorites_for_owner() {
	let harness = harness();
	let owner = user("u1");

	harness.service.toggle_favorite(&owner, "s2").await.expect("Toggle failed.");

	let response = harness
		.service
		.search(SearchRequest {
			query: "mindfuck".to_string(),
			owner: Some(owner),
			..SearchRequest::default()
		})
		.await
		.expect("Search failed.");

	for item in &response.results {
		assert_eq!(item.is_favorite, Some(item.title.show_id == "s2"));
	}

	let anonymous = harness
		.service
		.search(SearchRequest { query: "mindfuck".to_string(), ..SearchRequest::default() })
		.await
		.expect("Search failed.");

	assert!(anonymous.results.iter().all(|item| item.is_favorite.is_none()));
}
