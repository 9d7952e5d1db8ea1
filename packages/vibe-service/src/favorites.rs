use serde::Serialize;
use time::OffsetDateTime;

use crate::{Error, Result, SearchItem, VibeService, search::Paging};

/// The principal a favorite belongs to: a signed-in user or an anonymous session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FavoriteOwner {
	User(String),
	Session(String),
}
impl FavoriteOwner {
	/// Prefers a non-blank user id, then a non-blank session token.
	pub fn resolve(user_id: Option<&str>, session_token: Option<&str>) -> Result<Self> {
		if let Some(user_id) = user_id.filter(|id| !id.trim().is_empty()) {
			return Ok(Self::User(user_id.to_string()));
		}
		if let Some(token) = session_token.filter(|token| !token.trim().is_empty()) {
			return Ok(Self::Session(token.to_string()));
		}

		Err(Error::MissingOwner)
	}

	pub fn kind(&self) -> &'static str {
		match self {
			Self::User(_) => "user",
			Self::Session(_) => "session",
		}
	}

	pub fn id(&self) -> &str {
		match self {
			Self::User(id) | Self::Session(id) => id,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleResponse {
	pub show_id: String,
	pub is_favorite: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoritesPage {
	pub total: u64,
	pub page: u32,
	pub page_size: u32,
	pub results: Vec<SearchItem>,
}

impl VibeService {
	/// Removes the favorite if present, otherwise adds it. Adding requires the title to exist.
	pub async fn toggle_favorite(
		&self,
		owner: &FavoriteOwner,
		show_id: &str,
	) -> Result<ToggleResponse> {
		let show_id = show_id.trim();

		if show_id.is_empty() {
			return Err(Error::InvalidRequest { message: "showId must not be empty.".to_string() });
		}
		if self.stores.favorites.remove(owner, show_id).await? {
			return Ok(ToggleResponse { show_id: show_id.to_string(), is_favorite: false });
		}
		if !self.stores.corpus.title_exists(show_id).await? {
			return Err(Error::NotFound { message: format!("Title {show_id} does not exist.") });
		}

		self.stores.favorites.add(owner, show_id, OffsetDateTime::now_utc()).await?;

		Ok(ToggleResponse { show_id: show_id.to_string(), is_favorite: true })
	}

	/// One page of the owner's favorites, newest first.
	pub async fn list_favorites(
		&self,
		owner: &FavoriteOwner,
		page: Option<u32>,
		page_size: Option<u32>,
	) -> Result<FavoritesPage> {
		let paging = Paging::new(&self.cfg.search, page, page_size);
		let titles = self.stores.favorites.list(owner, paging.offset, paging.limit()).await?;
		let total = self.stores.favorites.count(owner).await?;

		Ok(FavoritesPage {
			total,
			page: paging.page,
			page_size: paging.page_size,
			results: titles
				.into_iter()
				.map(|title| SearchItem { title, score: None, is_favorite: Some(true) })
				.collect(),
		})
	}

	/// Marks each item with whether the owner favorited it. Lookup failures leave items as they
	/// were, since the annotation is cosmetic.
	pub(crate) async fn annotate_favorites(
		&self,
		owner: &FavoriteOwner,
		items: &mut [SearchItem],
	) {
		if items.is_empty() {
			return;
		}

		let ids: Vec<String> = items.iter().map(|item| item.title.show_id.clone()).collect();

		match self.stores.favorites.favorited_among(owner, &ids).await {
			Ok(favorited) =>
				for item in items.iter_mut() {
					item.is_favorite = Some(favorited.contains(&item.title.show_id));
				},
			Err(err) => {
				tracing::warn!(error = %err, "Failed to load favorites for search results.");
			},
		}
	}
}
