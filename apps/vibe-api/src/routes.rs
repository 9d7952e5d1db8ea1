use axum::{
	Json, Router,
	extract::{State, rejection::JsonRejection},
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::state::AppState;
use vibe_config::MAX_PAGE_SIZE;
use vibe_domain::catalog::SortOrder;
use vibe_service::{
	Error, FavoriteOwner, FavoritesPage, FiltersResponse, PosterBatchItem, PosterRequest,
	PosterResponse, SearchRequest, SearchResponse, ToggleResponse, posters::MAX_BATCH_ITEMS,
};

pub const HEADER_USER_ID: &str = "x-user-id";
pub const HEADER_SESSION_TOKEN: &str = "x-session-token";

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/search", post(search))
		.route("/v1/filters", get(filters))
		.route("/v1/poster", post(poster))
		.route("/v1/posters", post(posters))
		.route("/v1/favorites", post(list_favorites))
		.route("/v1/favorites/toggle", post(toggle_favorite))
		.with_state(state)
}

/// A JSON scalar the clients send either typed or as a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Lenient {
	Bool(bool),
	Number(f64),
	Text(String),
}
impl Lenient {
	pub fn as_number(&self) -> Option<f64> {
		match self {
			Self::Number(value) => Some(*value).filter(|value| value.is_finite()),
			Self::Text(raw) => {
				let raw = raw.trim();

				if raw.is_empty() {
					return None;
				}

				raw.parse::<f64>().ok().filter(|value| value.is_finite())
			},
			Self::Bool(_) => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(value) => Some(*value),
			Self::Text(raw) => match raw.to_lowercase().as_str() {
				"1" | "true" => Some(true),
				"0" | "false" => Some(false),
				_ => None,
			},
			Self::Number(_) => None,
		}
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchBody {
	pub q: String,
	pub page: Option<f64>,
	pub page_size: Option<f64>,
	#[serde(rename = "type")]
	pub kind: Option<String>,
	pub rating: Option<String>,
	pub year: Option<Lenient>,
	pub genre: Option<String>,
	pub sort: Option<String>,
	pub rerank: Option<Lenient>,
	pub rerank_top_k: Option<Lenient>,
	pub min_score: Option<f32>,
	pub min_score_ratio: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosterBody {
	pub show_id: Option<String>,
	pub title: String,
	#[serde(rename = "type")]
	pub kind: Option<String>,
	pub year: Option<Lenient>,
	pub refresh: Option<Lenient>,
}
impl PosterBody {
	fn into_request(self) -> PosterRequest {
		PosterRequest {
			show_id: self.show_id,
			title: self.title,
			kind: self.kind,
			year: self.year.as_ref().and_then(lenient_year),
			refresh: self.refresh.as_ref().and_then(Lenient::as_bool).unwrap_or(false),
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct PostersBody {
	pub items: Vec<PosterBody>,
}

#[derive(Debug, Serialize)]
pub struct PostersResponse {
	pub results: Vec<PosterBatchItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FavoritesBody {
	pub page: Option<f64>,
	pub page_size: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleBody {
	pub show_id: String,
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	headers: HeaderMap,
	payload: Result<Json<SearchBody>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
	let body = parse_body(payload)?;
	let (page, page_size) = paging(body.page, body.page_size)?;
	let rerank_top_k = body
		.rerank_top_k
		.as_ref()
		.and_then(Lenient::as_number)
		.map(|top_k| top_k.max(0.0) as u32)
		.unwrap_or(state.service.cfg.search.default_rerank_top_k);
	let request = SearchRequest {
		query: body.q,
		page: Some(page),
		page_size: Some(page_size),
		kind: body.kind,
		rating: body.rating,
		year: body.year.as_ref().and_then(lenient_year),
		genre: body.genre,
		sort: body.sort.as_deref().and_then(SortOrder::parse),
		rerank: Some(body.rerank.as_ref().and_then(Lenient::as_bool).unwrap_or(true)),
		rerank_top_k: Some(rerank_top_k),
		min_score: body.min_score,
		min_score_ratio: body.min_score_ratio,
		owner: owner_from(&headers).ok(),
	};
	let response = state.service.search(request).await?;

	Ok(Json(response))
}

async fn filters(State(state): State<AppState>) -> Result<Json<FiltersResponse>, ApiError> {
	let response = state.service.filters().await?;

	Ok(Json(response))
}

async fn poster(
	State(state): State<AppState>,
	payload: Result<Json<PosterBody>, JsonRejection>,
) -> Result<Json<PosterResponse>, ApiError> {
	let body = parse_body(payload)?;
	let response = state.service.resolve_poster(body.into_request()).await;

	Ok(Json(response))
}

async fn posters(
	State(state): State<AppState>,
	payload: Result<Json<PostersBody>, JsonRejection>,
) -> Result<Json<PostersResponse>, ApiError> {
	let body = parse_body(payload)?;

	if body.items.is_empty() || body.items.len() > MAX_BATCH_ITEMS {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"INVALID_REQUEST",
			format!("items must contain between 1 and {MAX_BATCH_ITEMS} entries."),
			Some(vec!["$.items".to_string()]),
		));
	}

	let items = body.items.into_iter().map(PosterBody::into_request).collect();
	let results = state.service.resolve_posters(items).await?;

	Ok(Json(PostersResponse { results }))
}

async fn list_favorites(
	State(state): State<AppState>,
	headers: HeaderMap,
	payload: Result<Json<FavoritesBody>, JsonRejection>,
) -> Result<Json<FavoritesPage>, ApiError> {
	let body = parse_body(payload)?;
	let owner = owner_from(&headers)?;
	let (page, page_size) = paging(body.page, body.page_size)?;
	let response = state.service.list_favorites(&owner, Some(page), Some(page_size)).await?;

	Ok(Json(response))
}

async fn toggle_favorite(
	State(state): State<AppState>,
	headers: HeaderMap,
	payload: Result<Json<ToggleBody>, JsonRejection>,
) -> Result<Json<ToggleResponse>, ApiError> {
	let body = parse_body(payload)?;

	if body.show_id.is_empty() {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"INVALID_REQUEST",
			"showId must not be empty.",
			Some(vec!["$.showId".to_string()]),
		));
	}

	let owner = owner_from(&headers)?;
	let response = state.service.toggle_favorite(&owner, &body.show_id).await?;

	Ok(Json(response))
}

fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError>
where
	T: DeserializeOwned,
{
	match payload {
		Ok(Json(body)) => Ok(body),
		Err(rejection) => Err(json_error(
			StatusCode::BAD_REQUEST,
			"INVALID_REQUEST",
			rejection.body_text(),
			None,
		)),
	}
}

// `page >= 1` and `1 <= pageSize <= 80`; fractional values truncate.
fn paging(page: Option<f64>, page_size: Option<f64>) -> Result<(u32, u32), ApiError> {
	let page = page.unwrap_or(1.0);
	let page_size = page_size.unwrap_or(20.0);

	if !page.is_finite() || page < 1.0 {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"INVALID_REQUEST",
			"page must be at least 1.",
			Some(vec!["$.page".to_string()]),
		));
	}
	if !page_size.is_finite() || !(1.0..=MAX_PAGE_SIZE as f64).contains(&page_size) {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"INVALID_REQUEST",
			format!("pageSize must be between 1 and {MAX_PAGE_SIZE}."),
			Some(vec!["$.pageSize".to_string()]),
		));
	}

	Ok((page.min(u32::MAX as f64) as u32, page_size as u32))
}

fn lenient_year(value: &Lenient) -> Option<i32> {
	value.as_number().map(|year| year as i32)
}

fn owner_from(headers: &HeaderMap) -> vibe_service::Result<FavoriteOwner> {
	let header = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());

	FavoriteOwner::resolve(header(HEADER_USER_ID), header(HEADER_SESSION_TOKEN))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message, None),
			Error::MissingOwner => json_error(
				StatusCode::BAD_REQUEST,
				"MISSING_OWNER",
				err.to_string(),
				Some(vec![HEADER_USER_ID.to_string(), HEADER_SESSION_TOKEN.to_string()]),
			),
			Error::NotFound { message } =>
				json_error(StatusCode::NOT_FOUND, "NOT_FOUND", message, None),
			other => {
				tracing::error!(error = %other, "Request failed.");

				json_error(
					StatusCode::INTERNAL_SERVER_ERROR,
					"INTERNAL_ERROR",
					"Internal error.",
					None,
				)
			},
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}
