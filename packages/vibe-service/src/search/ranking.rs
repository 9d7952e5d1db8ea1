use std::cmp::Ordering;

use vibe_config::Ranking;
use vibe_domain::{
	catalog::{PreferredType, SortOrder, Title},
	keywords::LexicalOverlap,
};
use vibe_providers::rerank::RerankHit;

/// A retrieved title and its running relevance score for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
	pub title: Title,
	pub score: f32,
}

/// How many ranked neighbours to request so the page can be filled after filtering.
pub fn candidate_limit(cfg: &Ranking, offset: u64, page_size: u64) -> u64 {
	let budget = (page_size * cfg.candidate_per_page as u64)
		.max(cfg.candidate_floor as u64)
		.min(cfg.max_candidates as u64);

	budget.min(offset + page_size + cfg.candidate_slack as u64)
}

/// Absolute score floor. An explicit `min_score` wins over any ratio.
pub fn cutoff(max_score: f32, min_score: Option<f32>, ratio: f32, fallback_ratio: f32) -> f32 {
	if let Some(min_score) = min_score.filter(|score| score.is_finite()) {
		return min_score;
	}

	let ratio = if ratio.is_finite() { ratio } else { fallback_ratio };

	max_score * ratio.clamp(0.0, 1.0)
}

pub fn max_score(candidates: &[ScoredCandidate]) -> f32 {
	candidates.iter().map(|candidate| candidate.score).fold(f32::NEG_INFINITY, f32::max)
}

pub fn apply_type_bonus(candidates: &mut [ScoredCandidate], preferred: PreferredType, bonus: f32) {
	if preferred == PreferredType::Any {
		return;
	}

	for candidate in candidates.iter_mut() {
		if preferred.matches(&candidate.title.kind) {
			candidate.score += bonus;
		}
	}
}

pub fn sort_by_score(candidates: &mut [ScoredCandidate]) {
	candidates.sort_by(|a, b| cmp_score_desc(a.score, b.score));
}

/// Re-sorts the head by score plus weighted keyword overlap. Stored scores are left alone, so the
/// boost only decides order and never lifts a title over the cutoff.
pub fn lexical_rerank(candidates: &mut [ScoredCandidate], keywords: &[String], cfg: &Ranking) {
	let scope = candidates.len().min(cfg.lexical_scope as usize);

	if keywords.is_empty() || scope == 0 {
		return;
	}

	let head = &mut candidates[..scope];
	let mut keyed: Vec<(f32, ScoredCandidate)> = head
		.iter()
		.map(|candidate| {
			let points = LexicalOverlap::measure(&candidate.title, keywords)
				.score(cfg.lexical_min_hits);

			(candidate.score + points as f32 * cfg.lexical_weight, candidate.clone())
		})
		.collect();

	keyed.sort_by(|a, b| cmp_score_desc(a.0, b.0));

	for (slot, (_, candidate)) in head.iter_mut().zip(keyed) {
		*slot = candidate;
	}
}

/// Rerank parameters for a candidate list, or `None` when there is nothing to rerank.
pub fn rerank_window(
	len: usize,
	requested_top_k: Option<u32>,
	cfg: &Ranking,
) -> Option<(usize, usize)> {
	let scope = len.min(cfg.rerank_scope as usize);

	if scope == 0 {
		return None;
	}

	let top_k = requested_top_k
		.map(|top_k| top_k as usize)
		.unwrap_or_else(|| scope.min(cfg.rerank_default_top_k as usize))
		.clamp(1, scope);

	Some((scope, top_k))
}

/// Moves reranked scope members to the front in provider order, taking the provider's relevance
/// as their score. Unreferenced scope members follow in their prior order, then the tail.
pub fn apply_rerank(
	candidates: Vec<ScoredCandidate>,
	scope: usize,
	hits: &[RerankHit],
) -> Vec<ScoredCandidate> {
	let scope = scope.min(candidates.len());
	let mut picked = vec![false; scope];
	let mut front = Vec::with_capacity(hits.len());

	for hit in hits {
		if hit.index >= scope || picked[hit.index] {
			continue;
		}

		picked[hit.index] = true;

		let mut candidate = candidates[hit.index].clone();

		if hit.relevance_score.is_finite() {
			candidate.score = hit.relevance_score;
		}

		front.push(candidate);
	}

	let mut out = front;

	for (index, candidate) in candidates.into_iter().enumerate() {
		if index < scope && picked[index] {
			continue;
		}

		out.push(candidate);
	}

	out
}

/// Stable final ordering. Relevance keeps the ranked order; the others break ties by score.
pub fn final_sort(candidates: &mut [ScoredCandidate], sort: SortOrder) {
	match sort {
		SortOrder::Relevance => {},
		SortOrder::TitleAsc => candidates.sort_by(|a, b| {
			cmp_title(&a.title.title, &b.title.title).then(cmp_score_desc(a.score, b.score))
		}),
		SortOrder::YearAsc => candidates.sort_by(|a, b| {
			let a_year = a.title.release_year.unwrap_or(9_999);
			let b_year = b.title.release_year.unwrap_or(9_999);

			a_year.cmp(&b_year).then(cmp_score_desc(a.score, b.score))
		}),
		SortOrder::YearDesc => candidates.sort_by(|a, b| {
			let a_year = a.title.release_year.unwrap_or(-1);
			let b_year = b.title.release_year.unwrap_or(-1);

			b_year.cmp(&a_year).then(cmp_score_desc(a.score, b.score))
		}),
	}
}

pub fn page_slice<T>(items: Vec<T>, offset: u64, page_size: u64) -> Vec<T> {
	items.into_iter().skip(offset as usize).take(page_size as usize).collect()
}

fn cmp_score_desc(a: f32, b: f32) -> Ordering {
	b.total_cmp(&a)
}

fn cmp_title(a: &str, b: &str) -> Ordering {
	a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}
