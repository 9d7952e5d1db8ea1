pub mod cache;
pub mod favorites;
pub mod filters;
pub mod limiter;
pub mod posters;
pub mod postgres;
pub mod rewrite;
pub mod search;
pub mod time_serde;

mod embedding;
mod error;
mod index;

pub use error::Error;
pub use favorites::{FavoriteOwner, FavoritesPage, ToggleResponse};
pub use filters::FiltersResponse;
pub use posters::{
	PosterBatchItem, PosterGateway, PosterRequest, PosterResponse, PosterSource, PosterStatus,
};
pub use search::{SearchItem, SearchRequest, SearchResponse};

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use serde_json::Value;
use time::OffsetDateTime;

use crate::{cache::TtlCache, rewrite::QueryRewriter};
use vibe_config::{
	Config, EmbeddingProviderConfig, LlmProviderConfig, PosterProviderConfig, ProviderConfig,
};
use vibe_domain::catalog::{SortOrder, Title, TitleFilter};
use vibe_providers::{
	embedding::{self as embedding_api, InputType},
	posters::{self as poster_api, PosterMatch, PosterQuery},
	rerank::{self as rerank_api, RerankHit},
	rewrite as rewrite_api,
};
use vibe_storage::{db::Db, models::PosterRecord, qdrant::QdrantStore, queries::TitleFacets};

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
		input_type: InputType,
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

pub trait RerankProvider
where
	Self: Send + Sync,
{
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
		top_k: usize,
	) -> BoxFuture<'a, color_eyre::Result<Vec<RerankHit>>>;
}

pub trait RewriteProvider
where
	Self: Send + Sync,
{
	fn complete_json<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		api_key: &'a str,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<Value>>;
}

pub trait PosterProvider
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		cfg: &'a PosterProviderConfig,
		api_key: &'a str,
		query: PosterQuery<'a>,
	) -> BoxFuture<'a, color_eyre::Result<Option<PosterMatch>>>;
}

/// Read access to the title corpus and its vector index.
pub trait CorpusStore
where
	Self: Send + Sync,
{
	fn fetch_page<'a>(
		&'a self,
		filter: &'a TitleFilter,
		sort: SortOrder,
		offset: u64,
		limit: u64,
	) -> BoxFuture<'a, Result<Vec<Title>>>;

	fn count<'a>(&'a self, filter: &'a TitleFilter) -> BoxFuture<'a, Result<u64>>;

	/// Nearest titles to `vector`, best first.
	fn nearest(&self, vector: Vec<f32>, limit: u64) -> BoxFuture<'_, Result<Vec<(Title, f32)>>>;

	fn title_exists<'a>(&'a self, show_id: &'a str) -> BoxFuture<'a, Result<bool>>;

	/// The precomputed facet document, if one was stored at seed time.
	fn cached_filters(&self) -> BoxFuture<'_, Result<Option<Value>>>;

	fn facets(&self) -> BoxFuture<'_, Result<TitleFacets>>;

	/// Writes `title` and its vector, replacing any earlier entry for the show id.
	fn upsert_title(&self, title: Title, vector: Vec<f32>) -> BoxFuture<'_, Result<()>>;
}

pub trait PosterStore
where
	Self: Send + Sync,
{
	fn fetch<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<PosterRecord>>>;

	fn upsert(&self, record: PosterRecord) -> BoxFuture<'_, Result<()>>;
}

pub trait FavoriteStore
where
	Self: Send + Sync,
{
	/// Returns whether a favorite was removed.
	fn remove<'a>(
		&'a self,
		owner: &'a FavoriteOwner,
		show_id: &'a str,
	) -> BoxFuture<'a, Result<bool>>;

	fn add<'a>(
		&'a self,
		owner: &'a FavoriteOwner,
		show_id: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>>;

	fn count<'a>(&'a self, owner: &'a FavoriteOwner) -> BoxFuture<'a, Result<u64>>;

	/// Favorited titles, newest favorite first.
	fn list<'a>(
		&'a self,
		owner: &'a FavoriteOwner,
		offset: u64,
		limit: u64,
	) -> BoxFuture<'a, Result<Vec<Title>>>;

	fn favorited_among<'a>(
		&'a self,
		owner: &'a FavoriteOwner,
		show_ids: &'a [String],
	) -> BoxFuture<'a, Result<Vec<String>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub rerank: Arc<dyn RerankProvider>,
	pub rewrite: Arc<dyn RewriteProvider>,
	pub posters: Arc<dyn PosterProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		rerank: Arc<dyn RerankProvider>,
		rewrite: Arc<dyn RewriteProvider>,
		posters: Arc<dyn PosterProvider>,
	) -> Self {
		Self { embedding, rerank, rewrite, posters }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self {
			embedding: provider.clone(),
			rerank: provider.clone(),
			rewrite: provider.clone(),
			posters: provider,
		}
	}
}

#[derive(Clone)]
pub struct Stores {
	pub corpus: Arc<dyn CorpusStore>,
	pub posters: Arc<dyn PosterStore>,
	pub favorites: Arc<dyn FavoriteStore>,
}
impl Stores {
	pub fn new(
		corpus: Arc<dyn CorpusStore>,
		posters: Arc<dyn PosterStore>,
		favorites: Arc<dyn FavoriteStore>,
	) -> Self {
		Self { corpus, posters, favorites }
	}

	pub fn postgres(db: Db, qdrant: QdrantStore) -> Self {
		let store = Arc::new(postgres::PostgresStores::new(db, qdrant));

		Self { corpus: store.clone(), posters: store.clone(), favorites: store }
	}
}

/// Search, poster, and favorites operations over one catalog.
///
/// Caches, circuit breakers, and the poster queue live on the instance, so separate instances
/// share nothing. Construct inside a Tokio runtime: the poster queue spawns its dispatcher.
pub struct VibeService {
	pub cfg: Arc<Config>,
	pub stores: Stores,
	pub providers: Providers,
	rewriter: QueryRewriter,
	embeddings: TtlCache<String, Vec<f32>>,
	posters: PosterGateway,
}
impl VibeService {
	pub fn new(cfg: Config, db: Db, qdrant: QdrantStore) -> Self {
		Self::with_parts(cfg, Stores::postgres(db, qdrant), Providers::default())
	}

	pub fn with_parts(cfg: Config, stores: Stores, providers: Providers) -> Self {
		let cfg = Arc::new(cfg);
		let posters = PosterGateway::new(
			Arc::clone(&cfg),
			Arc::clone(&stores.posters),
			Arc::clone(&providers.posters),
		);

		Self::assemble(cfg, stores, providers, posters)
	}

	/// Like [`VibeService::with_parts`], with the poster credential read from `credentials` on
	/// every fetch instead of from the configuration.
	pub fn with_poster_credentials(
		cfg: Config,
		stores: Stores,
		providers: Providers,
		credentials: posters::CredentialSource,
	) -> Self {
		let cfg = Arc::new(cfg);
		let posters = PosterGateway::with_credentials(
			Arc::clone(&cfg),
			Arc::clone(&stores.posters),
			Arc::clone(&providers.posters),
			credentials,
		);

		Self::assemble(cfg, stores, providers, posters)
	}

	fn assemble(
		cfg: Arc<Config>,
		stores: Stores,
		providers: Providers,
		posters: PosterGateway,
	) -> Self {
		let rewriter = QueryRewriter::new(&cfg.search.rewrite);
		let embeddings = TtlCache::new(
			Duration::from_secs(cfg.search.embedding_cache.ttl_seconds),
			cfg.search.embedding_cache.max_entries,
		);

		Self { cfg, stores, providers, rewriter, embeddings, posters }
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
		input_type: InputType,
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding_api::embed(cfg, texts, input_type))
	}
}
impl RerankProvider for DefaultProviders {
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
		top_k: usize,
	) -> BoxFuture<'a, color_eyre::Result<Vec<RerankHit>>> {
		Box::pin(rerank_api::rerank(cfg, query, docs, top_k))
	}
}
impl RewriteProvider for DefaultProviders {
	fn complete_json<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		api_key: &'a str,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<Value>> {
		Box::pin(rewrite_api::complete_json(cfg, api_key, messages))
	}
}
impl PosterProvider for DefaultProviders {
	fn search<'a>(
		&'a self,
		cfg: &'a PosterProviderConfig,
		api_key: &'a str,
		query: PosterQuery<'a>,
	) -> BoxFuture<'a, color_eyre::Result<Option<PosterMatch>>> {
		Box::pin(poster_api::search(cfg, api_key, query))
	}
}
