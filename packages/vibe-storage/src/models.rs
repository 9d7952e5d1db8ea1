use time::OffsetDateTime;

use vibe_domain::catalog::Title;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TitleRow {
	pub show_id: String,
	pub r#type: String,
	pub title: String,
	pub director: String,
	pub cast_members: String,
	pub country: String,
	pub date_added: String,
	pub release_year: Option<i32>,
	pub rating: String,
	pub duration: String,
	pub genres: String,
	pub genres_list: Option<Vec<String>>,
	pub description: String,
}
impl From<TitleRow> for Title {
	fn from(row: TitleRow) -> Self {
		Self {
			show_id: row.show_id,
			kind: row.r#type,
			title: row.title,
			director: row.director,
			cast: row.cast_members,
			country: row.country,
			date_added: row.date_added,
			release_year: row.release_year,
			rating: row.rating,
			duration: row.duration,
			genres: row.genres,
			genres_list: row.genres_list,
			description: row.description,
		}
	}
}

#[derive(Debug, sqlx::FromRow)]
pub struct FavoriteTitleRow {
	#[sqlx(flatten)]
	pub title: TitleRow,
	pub favorited_at: OffsetDateTime,
}

/// One row of the poster cache. `status` is one of `ready`, `missing`, or `error`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PosterRecord {
	pub key: String,
	pub show_id: Option<String>,
	pub title: String,
	pub r#type: String,
	pub year: Option<i32>,
	pub status: String,
	pub tmdb_id: Option<i64>,
	pub poster_path: Option<String>,
	pub backdrop_path: Option<String>,
	pub poster_url: Option<String>,
	pub thumb_url: Option<String>,
	pub cooldown_until: Option<OffsetDateTime>,
	pub error_count: Option<i32>,
	pub last_error_at: Option<OffsetDateTime>,
	pub disabled_at: Option<OffsetDateTime>,
	pub updated_at: OffsetDateTime,
}
