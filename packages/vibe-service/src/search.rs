pub mod ranking;

use serde::Serialize;

use crate::{FavoriteOwner, Result, VibeService};
use ranking::ScoredCandidate;
use vibe_config::Search;
use vibe_domain::{
	catalog::{SortOrder, Title, TitleFilter},
	keywords::extract_keywords,
	rewrite::RewriteResult,
};

/// Search input after boundary validation. `None` means "use the default".
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
	pub query: String,
	pub page: Option<u32>,
	pub page_size: Option<u32>,
	pub kind: Option<String>,
	pub rating: Option<String>,
	pub year: Option<i32>,
	pub genre: Option<String>,
	pub sort: Option<SortOrder>,
	/// `Some(false)` skips the cross-encoder pass.
	pub rerank: Option<bool>,
	pub rerank_top_k: Option<u32>,
	pub min_score: Option<f32>,
	pub min_score_ratio: Option<f32>,
	/// When set, results carry `is_favorite`.
	pub owner: Option<FavoriteOwner>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
	pub query: String,
	pub total: u64,
	pub page: u32,
	pub page_size: u32,
	pub results: Vec<SearchItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchItem {
	#[serde(flatten)]
	pub title: Title,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub score: Option<f32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub is_favorite: Option<bool>,
}

/// One-indexed page clamped to the configured bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
	pub page: u32,
	pub page_size: u32,
	pub offset: u64,
}
impl Paging {
	pub fn new(cfg: &Search, page: Option<u32>, page_size: Option<u32>) -> Self {
		let page = page.unwrap_or(1).clamp(1, cfg.max_page.max(1));
		let page_size =
			page_size.unwrap_or(cfg.default_page_size).clamp(1, cfg.max_page_size.max(1));

		Self { page, page_size, offset: (page as u64 - 1) * page_size as u64 }
	}

	pub fn limit(&self) -> u64 {
		self.page_size as u64
	}
}

impl VibeService {
	/// Ranked, filtered, paginated titles for a free-text query.
	///
	/// A blank query lists the catalog directly in the requested order. Otherwise the query is
	/// rewritten, embedded, and matched against the vector index; provider failures along the way
	/// degrade the ranking but never fail the search.
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let query = req.query.trim().to_string();
		let paging = Paging::new(&self.cfg.search, req.page, req.page_size);
		let filter = TitleFilter::from_request(
			req.kind.as_deref(),
			req.rating.as_deref(),
			req.year,
			req.genre.as_deref(),
		);
		let sort = req.sort.unwrap_or(if query.is_empty() {
			SortOrder::YearDesc
		} else {
			SortOrder::Relevance
		});
		let (total, mut results): (u64, Vec<SearchItem>) = if query.is_empty() {
			let titles = self
				.stores
				.corpus
				.fetch_page(&filter, sort, paging.offset, paging.limit())
				.await?;
			let total = self.stores.corpus.count(&filter).await?;
			let items = titles
				.into_iter()
				.map(|title| SearchItem { title, score: None, is_favorite: None })
				.collect();

			(total, items)
		} else {
			let ranked = self.rank(&query, &req, &filter, paging, sort).await?;
			let total = ranked.len() as u64;
			let page = ranking::page_slice(ranked, paging.offset, paging.limit());
			let items = page
				.into_iter()
				.map(|candidate| SearchItem {
					title: candidate.title,
					score: Some(candidate.score),
					is_favorite: None,
				})
				.collect();

			(total, items)
		};

		if let Some(owner) = req.owner.as_ref() {
			self.annotate_favorites(owner, &mut results).await;
		}

		Ok(SearchResponse {
			query,
			total,
			page: paging.page,
			page_size: paging.page_size,
			results,
		})
	}

	// Full ranked list after the cutoff; the caller slices the page.
	async fn rank(
		&self,
		query: &str,
		req: &SearchRequest,
		filter: &TitleFilter,
		paging: Paging,
		sort: SortOrder,
	) -> Result<Vec<ScoredCandidate>> {
		let ranking_cfg = &self.cfg.ranking;
		let rewrite = self.rewrite(query).await;

		if rewrite.embed_query.is_empty() {
			return Ok(Vec::new());
		}

		let vector = self.embed_query(&rewrite.embed_query).await;

		if vector.is_empty() {
			return Ok(Vec::new());
		}

		let limit = ranking::candidate_limit(ranking_cfg, paging.offset, paging.limit());
		let mut candidates: Vec<ScoredCandidate> = self
			.stores
			.corpus
			.nearest(vector, limit)
			.await?
			.into_iter()
			.filter(|(title, _)| filter.matches(title))
			.map(|(title, score)| ScoredCandidate { title, score })
			.collect();

		if candidates.is_empty() {
			return Ok(Vec::new());
		}

		let max_score = ranking::max_score(&candidates);
		let cutoff = ranking::cutoff(
			max_score,
			req.min_score,
			req.min_score_ratio.unwrap_or(rewrite.min_score_ratio),
			ranking_cfg.default_min_score_ratio,
		);

		candidates.retain(|candidate| candidate.score >= cutoff);

		if filter.kind.is_none() {
			ranking::apply_type_bonus(
				&mut candidates,
				rewrite.preferred_type,
				ranking_cfg.type_preference_bonus,
			);
		}

		ranking::sort_by_score(&mut candidates);

		let keywords = extract_keywords(
			&format!("{} {query}", rewrite.embed_query),
			ranking_cfg.max_keywords as usize,
		);

		ranking::lexical_rerank(&mut candidates, &keywords, ranking_cfg);

		if req.rerank != Some(false) && self.cfg.search.rerank_enabled {
			candidates = self.cross_encode(candidates, &rewrite, req.rerank_top_k).await;
		}

		ranking::final_sort(&mut candidates, sort);

		Ok(candidates)
	}

	async fn cross_encode(
		&self,
		candidates: Vec<ScoredCandidate>,
		rewrite: &RewriteResult,
		requested_top_k: Option<u32>,
	) -> Vec<ScoredCandidate> {
		let Some((scope, top_k)) =
			ranking::rerank_window(candidates.len(), requested_top_k, &self.cfg.ranking)
		else {
			return candidates;
		};
		let docs: Vec<String> =
			candidates[..scope].iter().map(|candidate| candidate.title.rerank_document()).collect();

		match self
			.providers
			.rerank
			.rerank(&self.cfg.providers.rerank, &rewrite.rerank_query, &docs, top_k)
			.await
		{
			Ok(hits) => ranking::apply_rerank(candidates, scope, &hits),
			Err(err) => {
				tracing::warn!(error = %err, "Rerank failed. Keeping retrieval order.");

				candidates
			},
		}
	}
}
