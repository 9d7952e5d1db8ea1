use std::collections::HashMap;

use serde_json::Value;
use time::OffsetDateTime;

use crate::{BoxFuture, CorpusStore, FavoriteOwner, FavoriteStore, PosterStore, Result};
use vibe_domain::catalog::{SortOrder, Title, TitleFilter};
use vibe_storage::{
	db::Db,
	models::PosterRecord,
	qdrant::QdrantStore,
	queries::{self, TitleFacets},
};

const FILTERS_META_KEY: &str = "filters";

/// Titles, poster cache, and favorites in Postgres; title vectors in Qdrant.
pub struct PostgresStores {
	db: Db,
	qdrant: QdrantStore,
}
impl PostgresStores {
	pub fn new(db: Db, qdrant: QdrantStore) -> Self {
		Self { db, qdrant }
	}

	async fn nearest_titles(&self, vector: Vec<f32>, limit: u64) -> Result<Vec<(Title, f32)>> {
		let hits = self.qdrant.nearest(vector, limit).await?;

		if hits.is_empty() {
			return Ok(Vec::new());
		}

		let ids: Vec<String> = hits.iter().map(|(show_id, _)| show_id.clone()).collect();
		let mut titles: HashMap<String, Title> = queries::titles_by_ids(&self.db, &ids)
			.await?
			.into_iter()
			.map(|title| (title.show_id.clone(), title))
			.collect();

		// Vectors without a catalog row are skipped.
		Ok(hits
			.into_iter()
			.filter_map(|(show_id, score)| titles.remove(&show_id).map(|title| (title, score)))
			.collect())
	}
}
impl CorpusStore for PostgresStores {
	fn fetch_page<'a>(
		&'a self,
		filter: &'a TitleFilter,
		sort: SortOrder,
		offset: u64,
		limit: u64,
	) -> BoxFuture<'a, Result<Vec<Title>>> {
		Box::pin(async move {
			Ok(queries::fetch_titles(&self.db, filter, sort, offset, limit).await?)
		})
	}

	fn count<'a>(&'a self, filter: &'a TitleFilter) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move { Ok(queries::count_titles(&self.db, filter).await?) })
	}

	fn nearest(&self, vector: Vec<f32>, limit: u64) -> BoxFuture<'_, Result<Vec<(Title, f32)>>> {
		Box::pin(self.nearest_titles(vector, limit))
	}

	fn title_exists<'a>(&'a self, show_id: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move { Ok(queries::title_exists(&self.db, show_id).await?) })
	}

	fn cached_filters(&self) -> BoxFuture<'_, Result<Option<Value>>> {
		Box::pin(async move { Ok(queries::fetch_meta(&self.db, FILTERS_META_KEY).await?) })
	}

	fn facets(&self) -> BoxFuture<'_, Result<TitleFacets>> {
		Box::pin(async move { Ok(queries::title_facets(&self.db).await?) })
	}

	fn upsert_title(&self, title: Title, vector: Vec<f32>) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move {
			self.qdrant.upsert_title_vector(&title.show_id, vector).await?;
			queries::upsert_title(&self.db, &title).await?;

			Ok(())
		})
	}
}
impl PosterStore for PostgresStores {
	fn fetch<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<PosterRecord>>> {
		Box::pin(async move { Ok(queries::fetch_poster(&self.db, key).await?) })
	}

	fn upsert(&self, record: PosterRecord) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move { Ok(queries::upsert_poster(&self.db, &record).await?) })
	}
}
impl FavoriteStore for PostgresStores {
	fn remove<'a>(
		&'a self,
		owner: &'a FavoriteOwner,
		show_id: &'a str,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			Ok(queries::delete_favorite(&self.db, owner.kind(), owner.id(), show_id).await?)
		})
	}

	fn add<'a>(
		&'a self,
		owner: &'a FavoriteOwner,
		show_id: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			Ok(queries::insert_favorite(&self.db, owner.kind(), owner.id(), show_id, now).await?)
		})
	}

	fn count<'a>(&'a self, owner: &'a FavoriteOwner) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			Ok(queries::count_favorites(&self.db, owner.kind(), owner.id()).await?)
		})
	}

	fn list<'a>(
		&'a self,
		owner: &'a FavoriteOwner,
		offset: u64,
		limit: u64,
	) -> BoxFuture<'a, Result<Vec<Title>>> {
		Box::pin(async move {
			let rows =
				queries::list_favorites(&self.db, owner.kind(), owner.id(), offset, limit).await?;

			Ok(rows.into_iter().map(|row| Title::from(row.title)).collect())
		})
	}

	fn favorited_among<'a>(
		&'a self,
		owner: &'a FavoriteOwner,
		show_ids: &'a [String],
	) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(async move {
			Ok(queries::favorite_ids_among(&self.db, owner.kind(), owner.id(), show_ids).await?)
		})
	}
}
