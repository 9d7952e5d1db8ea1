use super::{HarnessBuilder, SpyEmbedding, harness, title};
use vibe_providers::embedding::InputType;
use vibe_service::{Error, SearchRequest};

#[tokio::test]
async fn titles_are_embedded_as_documents_in_batches() {
	let harness = harness();
	let mut titles: Vec<_> = (0..70)
		.map(|n| title(&format!("n{n}"), "Movie", "Heat", Some(1995), "R", "Dramas"))
		.collect();

	titles[0].genres = "Crime Movies, Action & Adventure, International Movies".to_string();
	titles[1].genres_list = Some(vec!["Western".to_string()]);

	let written = harness.service.index_titles(titles).await.expect("Indexing failed.");
	let requests = harness.embedding.requests.lock().expect("requests lock").clone();
	let indexed = harness.store.indexed.lock().expect("indexed lock");

	assert_eq!(written, 70);
	assert_eq!(requests, vec![(InputType::Document, 64), (InputType::Document, 6)]);
	assert_eq!(indexed.len(), 70);
	assert_eq!(indexed[0].0.genres_list, Some(vec!["Crime".to_string(), "Action".to_string()]));
	assert_eq!(indexed[1].0.genres_list, Some(vec!["Western".to_string()]));
	assert_eq!(indexed[2].0.genres_list, Some(vec!["Drama".to_string()]));
	assert_eq!(indexed[0].1, vec![1.0, 0.0, 0.0]);
}

#[tokio::test]
async fn embedding_failure_writes_nothing() {
	let harness =
		HarnessBuilder { embedding: SpyEmbedding::new(true), ..HarnessBuilder::new() }.build();
	let titles = vec![title("n1", "Movie", "Heat", Some(1995), "R", "Dramas")];
	let result = harness.service.index_titles(titles).await;

	assert!(matches!(result, Err(Error::Provider { .. })));
	assert!(harness.store.indexed.lock().expect("indexed lock").is_empty());
}

#[tokio::test]
async fn search_embeds_in_query_mode() {
	let harness = harness();

	harness
		.service
		.search(SearchRequest { query: "mindfuck".to_string(), ..SearchRequest::default() })
		.await
		.expect("Search failed.");

	let requests = harness.embedding.requests.lock().expect("requests lock").clone();

	assert_eq!(requests, vec![(InputType::Query, 1)]);
}
