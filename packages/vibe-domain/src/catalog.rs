use serde::{Deserialize, Serialize};

pub const TYPE_MOVIE: &str = "Movie";
pub const TYPE_TV_SHOW: &str = "TV Show";

/// A catalog entry as stored in the corpus. Immutable once seeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Title {
	pub show_id: String,
	#[serde(rename = "type")]
	pub kind: String,
	pub title: String,
	pub director: String,
	pub cast: String,
	pub country: String,
	pub date_added: String,
	pub release_year: Option<i32>,
	pub rating: String,
	pub duration: String,
	/// Comma-joined raw genre labels.
	pub genres: String,
	/// Canonical genres derived at ingest. Legacy rows may not carry it.
	pub genres_list: Option<Vec<String>>,
	pub description: String,
}
impl Title {
	/// The text handed to the cross-encoder for this title.
	pub fn rerank_document(&self) -> String {
		let mut parts = vec![format!("Title: {}", self.title)];

		if !self.genres.is_empty() {
			parts.push(format!("Genres: {}", self.genres));
		}
		if let Some(year) = self.release_year.filter(|year| *year != 0) {
			parts.push(format!("Year: {year}"));
		}
		if !self.kind.is_empty() {
			parts.push(format!("Type: {}", self.kind));
		}
		if !self.description.is_empty() {
			parts.push(format!("Description: {}", self.description));
		}

		parts.join("\n")
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PreferredType {
	Movie,
	#[serde(rename = "TV Show")]
	TvShow,
	#[default]
	Any,
}
impl PreferredType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Movie => TYPE_MOVIE,
			Self::TvShow => TYPE_TV_SHOW,
			Self::Any => "Any",
		}
	}

	/// Lenient parse used for model output; anything unrecognized means no preference.
	pub fn parse(raw: &str) -> Self {
		match raw.trim() {
			TYPE_MOVIE => Self::Movie,
			TYPE_TV_SHOW => Self::TvShow,
			_ => Self::Any,
		}
	}

	pub fn matches(self, kind: &str) -> bool {
		match self {
			Self::Any => false,
			other => other.as_str() == kind,
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
	#[default]
	Relevance,
	YearDesc,
	YearAsc,
	TitleAsc,
}
impl SortOrder {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim() {
			"relevance" => Some(Self::Relevance),
			"year_desc" => Some(Self::YearDesc),
			"year_asc" => Some(Self::YearAsc),
			"title_asc" => Some(Self::TitleAsc),
			_ => None,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Relevance => "relevance",
			Self::YearDesc => "year_desc",
			Self::YearAsc => "year_asc",
			Self::TitleAsc => "title_asc",
		}
	}
}

/// AND-combined catalog filters. `None` means the dimension is unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleFilter {
	pub kind: Option<String>,
	pub rating: Option<String>,
	pub year: Option<i32>,
	pub genre: Option<String>,
}
impl TitleFilter {
	/// Builds a filter from request values, treating blanks and `all` as unset.
	pub fn from_request(
		kind: Option<&str>,
		rating: Option<&str>,
		year: Option<i32>,
		genre: Option<&str>,
	) -> Self {
		Self {
			kind: active_value(kind),
			rating: active_value(rating),
			year: year.filter(|year| *year != 0),
			genre: active_value(genre),
		}
	}

	/// Post-retrieval check. Genre compares against the canonical genres of the raw label string.
	pub fn matches(&self, title: &Title) -> bool {
		if let Some(kind) = self.kind.as_deref()
			&& title.kind != kind
		{
			return false;
		}
		if let Some(rating) = self.rating.as_deref()
			&& title.rating != rating
		{
			return false;
		}
		if let Some(year) = self.year
			&& title.release_year != Some(year)
		{
			return false;
		}
		if let Some(genre) = self.genre.as_deref()
			&& !crate::genre::normalized_genres(&title.genres).contains(&genre)
		{
			return false;
		}

		true
	}
}

fn active_value(raw: Option<&str>) -> Option<String> {
	let trimmed = raw?.trim();

	if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
		return None;
	}

	Some(trimmed.to_string())
}
