use serde_json::Value;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use vibe_domain::{
	catalog::{SortOrder, Title, TitleFilter},
	genre,
};

use crate::{
	Result,
	db::Db,
	models::{FavoriteTitleRow, PosterRecord, TitleRow},
};

const TITLE_COLUMNS: &str = "\
show_id, type, title, director, cast_members, country, date_added, release_year, rating, \
duration, genres, genres_list, description";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleFacets {
	pub types: Vec<String>,
	pub ratings: Vec<String>,
	pub years: Vec<i32>,
}

pub async fn fetch_titles(
	db: &Db,
	filter: &TitleFilter,
	sort: SortOrder,
	offset: u64,
	limit: u64,
) -> Result<Vec<Title>> {
	let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {TITLE_COLUMNS} FROM titles"));

	push_title_filter(&mut builder, filter);

	builder.push(match sort {
		SortOrder::TitleAsc => " ORDER BY title ASC, show_id ASC",
		SortOrder::YearAsc => " ORDER BY release_year ASC NULLS LAST, show_id ASC",
		SortOrder::YearDesc | SortOrder::Relevance =>
			" ORDER BY release_year DESC NULLS LAST, show_id DESC",
	});
	builder.push(" OFFSET ");
	builder.push_bind(offset as i64);
	builder.push(" LIMIT ");
	builder.push_bind(limit as i64);

	let rows: Vec<TitleRow> = builder.build_query_as().fetch_all(&db.pool).await?;

	Ok(rows.into_iter().map(Title::from).collect())
}

pub async fn count_titles(db: &Db, filter: &TitleFilter) -> Result<u64> {
	let mut builder = QueryBuilder::<Postgres>::new("SELECT count(*) FROM titles");

	push_title_filter(&mut builder, filter);

	let count: i64 = builder.build_query_scalar().fetch_one(&db.pool).await?;

	Ok(count.max(0) as u64)
}

/// Titles for the given ids, in no particular order. Unknown ids are skipped.
pub async fn titles_by_ids(db: &Db, show_ids: &[String]) -> Result<Vec<Title>> {
	if show_ids.is_empty() {
		return Ok(Vec::new());
	}

	let rows: Vec<TitleRow> =
		sqlx::query_as(&format!("SELECT {TITLE_COLUMNS} FROM titles WHERE show_id = ANY($1)"))
			.bind(show_ids)
			.fetch_all(&db.pool)
			.await?;

	Ok(rows.into_iter().map(Title::from).collect())
}

pub async fn title_exists(db: &Db, show_id: &str) -> Result<bool> {
	let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM titles WHERE show_id = $1)")
		.bind(show_id)
		.fetch_one(&db.pool)
		.await?;

	Ok(exists)
}

pub async fn upsert_title(db: &Db, title: &Title) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO titles (
	show_id,
	type,
	title,
	director,
	cast_members,
	country,
	date_added,
	release_year,
	rating,
	duration,
	genres,
	genres_list,
	description
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
ON CONFLICT (show_id) DO UPDATE
SET
	type = EXCLUDED.type,
	title = EXCLUDED.title,
	director = EXCLUDED.director,
	cast_members = EXCLUDED.cast_members,
	country = EXCLUDED.country,
	date_added = EXCLUDED.date_added,
	release_year = EXCLUDED.release_year,
	rating = EXCLUDED.rating,
	duration = EXCLUDED.duration,
	genres = EXCLUDED.genres,
	genres_list = EXCLUDED.genres_list,
	description = EXCLUDED.description",
	)
	.bind(&title.show_id)
	.bind(&title.kind)
	.bind(&title.title)
	.bind(&title.director)
	.bind(&title.cast)
	.bind(&title.country)
	.bind(&title.date_added)
	.bind(title.release_year)
	.bind(&title.rating)
	.bind(&title.duration)
	.bind(&title.genres)
	.bind(title.genres_list.as_deref())
	.bind(&title.description)
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Distinct facet values derived from the corpus: types and ratings ascending, years descending.
pub async fn title_facets(db: &Db) -> Result<TitleFacets> {
	let types: Vec<String> = sqlx::query_scalar(
		"SELECT DISTINCT type FROM titles WHERE type <> '' ORDER BY type ASC",
	)
	.fetch_all(&db.pool)
	.await?;
	let ratings: Vec<String> = sqlx::query_scalar(
		"SELECT DISTINCT rating FROM titles WHERE rating <> '' ORDER BY rating ASC",
	)
	.fetch_all(&db.pool)
	.await?;
	let years: Vec<i32> = sqlx::query_scalar(
		"\
SELECT DISTINCT release_year
FROM titles
WHERE release_year IS NOT NULL AND release_year <> 0
ORDER BY release_year DESC",
	)
	.fetch_all(&db.pool)
	.await?;

	Ok(TitleFacets { types, ratings, years })
}

pub async fn fetch_meta(db: &Db, key: &str) -> Result<Option<Value>> {
	let value: Option<Value> = sqlx::query_scalar("SELECT value FROM catalog_meta WHERE key = $1")
		.bind(key)
		.fetch_optional(&db.pool)
		.await?;

	Ok(value)
}

pub async fn store_meta(db: &Db, key: &str, value: &Value, now: OffsetDateTime) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO catalog_meta (key, value, updated_at)
VALUES ($1, $2, $3)
ON CONFLICT (key) DO UPDATE
SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at",
	)
	.bind(key)
	.bind(value)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn fetch_poster(db: &Db, key: &str) -> Result<Option<PosterRecord>> {
	let record = sqlx::query_as::<_, PosterRecord>(
		"\
SELECT
	key,
	show_id,
	title,
	type,
	year,
	status,
	tmdb_id,
	poster_path,
	backdrop_path,
	poster_url,
	thumb_url,
	cooldown_until,
	error_count,
	last_error_at,
	disabled_at,
	updated_at
FROM poster_cache
WHERE key = $1",
	)
	.bind(key)
	.fetch_optional(&db.pool)
	.await?;

	Ok(record)
}

/// Writes the whole record, replacing any previous row for the key.
pub async fn upsert_poster(db: &Db, record: &PosterRecord) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO poster_cache (
	key,
	show_id,
	title,
	type,
	year,
	status,
	tmdb_id,
	poster_path,
	backdrop_path,
	poster_url,
	thumb_url,
	cooldown_until,
	error_count,
	last_error_at,
	disabled_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
ON CONFLICT (key) DO UPDATE
SET
	show_id = EXCLUDED.show_id,
	title = EXCLUDED.title,
	type = EXCLUDED.type,
	year = EXCLUDED.year,
	status = EXCLUDED.status,
	tmdb_id = EXCLUDED.tmdb_id,
	poster_path = EXCLUDED.poster_path,
	backdrop_path = EXCLUDED.backdrop_path,
	poster_url = EXCLUDED.poster_url,
	thumb_url = EXCLUDED.thumb_url,
	cooldown_until = EXCLUDED.cooldown_until,
	error_count = EXCLUDED.error_count,
	last_error_at = EXCLUDED.last_error_at,
	disabled_at = EXCLUDED.disabled_at,
	updated_at = EXCLUDED.updated_at",
	)
	.bind(&record.key)
	.bind(record.show_id.as_deref())
	.bind(&record.title)
	.bind(&record.r#type)
	.bind(record.year)
	.bind(&record.status)
	.bind(record.tmdb_id)
	.bind(record.poster_path.as_deref())
	.bind(record.backdrop_path.as_deref())
	.bind(record.poster_url.as_deref())
	.bind(record.thumb_url.as_deref())
	.bind(record.cooldown_until)
	.bind(record.error_count)
	.bind(record.last_error_at)
	.bind(record.disabled_at)
	.bind(record.updated_at)
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Returns whether a row was removed.
pub async fn delete_favorite(
	db: &Db,
	owner_kind: &str,
	owner_id: &str,
	show_id: &str,
) -> Result<bool> {
	let result = sqlx::query(
		"DELETE FROM favorites WHERE owner_kind = $1 AND owner_id = $2 AND show_id = $3",
	)
	.bind(owner_kind)
	.bind(owner_id)
	.bind(show_id)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn insert_favorite(
	db: &Db,
	owner_kind: &str,
	owner_id: &str,
	show_id: &str,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO favorites (owner_kind, owner_id, show_id, created_at)
VALUES ($1, $2, $3, $4)
ON CONFLICT (owner_kind, owner_id, show_id) DO NOTHING",
	)
	.bind(owner_kind)
	.bind(owner_id)
	.bind(show_id)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn count_favorites(db: &Db, owner_kind: &str, owner_id: &str) -> Result<u64> {
	let count: i64 =
		sqlx::query_scalar("SELECT count(*) FROM favorites WHERE owner_kind = $1 AND owner_id = $2")
			.bind(owner_kind)
			.bind(owner_id)
			.fetch_one(&db.pool)
			.await?;

	Ok(count.max(0) as u64)
}

/// Favorited titles, newest favorite first.
pub async fn list_favorites(
	db: &Db,
	owner_kind: &str,
	owner_id: &str,
	offset: u64,
	limit: u64,
) -> Result<Vec<FavoriteTitleRow>> {
	let sql = format!(
		"\
SELECT {columns}, f.created_at AS favorited_at
FROM favorites f
JOIN titles t ON t.show_id = f.show_id
WHERE f.owner_kind = $1 AND f.owner_id = $2
ORDER BY f.created_at DESC, f.show_id ASC
OFFSET $3
LIMIT $4",
		columns = TITLE_COLUMNS
			.split(',')
			.map(|column| format!("t.{}", column.trim()))
			.collect::<Vec<_>>()
			.join(", "),
	);
	let rows = sqlx::query_as::<_, FavoriteTitleRow>(&sql)
		.bind(owner_kind)
		.bind(owner_id)
		.bind(offset as i64)
		.bind(limit as i64)
		.fetch_all(&db.pool)
		.await?;

	Ok(rows)
}

/// The subset of `show_ids` the owner has favorited.
pub async fn favorite_ids_among(
	db: &Db,
	owner_kind: &str,
	owner_id: &str,
	show_ids: &[String],
) -> Result<Vec<String>> {
	if show_ids.is_empty() {
		return Ok(Vec::new());
	}

	let ids: Vec<String> = sqlx::query_scalar(
		"\
SELECT show_id
FROM favorites
WHERE owner_kind = $1 AND owner_id = $2 AND show_id = ANY($3)",
	)
	.bind(owner_kind)
	.bind(owner_id)
	.bind(show_ids)
	.fetch_all(&db.pool)
	.await?;

	Ok(ids)
}

// Genre matches either the canonical list or a regex over the raw labels, so rows ingested without
// `genres_list` still filter correctly.
fn push_title_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &TitleFilter) {
	builder.push(" WHERE TRUE");

	if let Some(kind) = filter.kind.clone() {
		builder.push(" AND type = ");
		builder.push_bind(kind);
	}
	if let Some(rating) = filter.rating.clone() {
		builder.push(" AND rating = ");
		builder.push_bind(rating);
	}
	if let Some(year) = filter.year {
		builder.push(" AND release_year = ");
		builder.push_bind(year);
	}
	if let Some(genre) = filter.genre.clone() {
		builder.push(" AND (");
		builder.push_bind(genre.clone());
		builder.push(" = ANY(genres_list) OR genres ~* ");
		builder.push_bind(genre::genre_pattern(&genre));
		builder.push(")");
	}
}
