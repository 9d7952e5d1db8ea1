use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::catalog::PreferredType;

pub const MIN_SCORE_RATIO_RANGE: (f32, f32) = (0.55, 0.9);
pub const MAX_EMBED_WORDS: usize = 25;

/// How a normalized query is expanded for retrieval and reranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteResult {
	pub embed_query: String,
	pub rerank_query: String,
	pub min_score_ratio: f32,
	pub preferred_type: PreferredType,
}

struct Rule {
	matcher: Regex,
	terms: &'static [&'static str],
	preferred_type: Option<PreferredType>,
	ratio: f32,
}

static RULE_SOURCES: [(&str, &[&str], Option<PreferredType>, f32); 17] = [
	(
		r"\bmind\s*fuck\b",
		&["mind-bending", "plot twist", "reality-bending", "psychological thriller", "time loop"],
		None,
		0.6,
	),
	(
		r"\bmind[-\s]?bending\b|\breality[-\s]?bending\b|\bplot\s*twist\b",
		&["plot twist", "psychological thriller", "mystery", "unreliable reality"],
		None,
		0.62,
	),
	(r"\bpsychological\b", &["mind games", "thriller", "suspense"], None, 0.72),
	(r"\bthriller\b|\bsuspense\b", &["thriller", "suspense", "mystery"], None, 0.7),
	(r"\brevenge\b|\bvengeance\b|\bpayback\b", &["revenge", "vengeance", "payback"], None, 0.72),
	(
		r"\btime\s*travel\b|\btime\s*loop\b",
		&["time travel", "time loop", "alternate timeline"],
		None,
		0.72,
	),
	(r"\bzombie\b|\bundead\b", &["zombie", "undead", "apocalypse"], None, 0.72),
	(r"\bromcom\b|\bromantic\s+comedy\b", &["romantic comedy", "romance", "comedy"], None, 0.72),
	(r"\bslow\s*burn\b", &["slow burn", "romance", "character-driven"], None, 0.72),
	(
		r"\bheist\b|\brobbery\b|\bcon\s*artist\b",
		&["heist", "robbery", "con artists", "caper"],
		None,
		0.72,
	),
	(
		r"\bserial\s+killer\b|\bmurder\b",
		&["serial killer", "murder investigation", "crime thriller"],
		None,
		0.72,
	),
	(r"\bcourt(room)?\b|\btrial\b|\blegal\b", &["courtroom", "trial", "legal drama"], None, 0.74),
	(r"\bstand[- ]?up\b|\bcomedy\s+special\b", &["stand-up comedy", "comedy special"], None, 0.75),
	(r"\bcooking\b|\bchef\b|\bfood\b", &["cooking", "chef", "culinary"], None, 0.75),
	(r"\bhorror\b|\bscary\b", &["horror", "scary", "supernatural"], None, 0.75),
	(
		r"\bsci[- ]?fi\b|\bscience\s+fiction\b",
		&["sci-fi", "science fiction", "futuristic"],
		None,
		0.75,
	),
	(
		r"\bk[-\s]?drama\b|\bkorean\s+drama\b",
		&["kdrama", "korean drama", "romance"],
		Some(PreferredType::TvShow),
		0.7,
	),
];

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
	RULE_SOURCES
		.iter()
		.filter_map(|&(pattern, terms, preferred_type, ratio)| {
			Regex::new(pattern).ok().map(|matcher| Rule { matcher, terms, preferred_type, ratio })
		})
		.collect()
});
static MOVIE_HINT: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"\b(movie|film|films|cinema)\b").ok());
static TV_HINT: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"\b(tv|show|shows|series|episodes)\b").ok());

/// Clamps a ratio into the accepted band. Non-finite input collapses to the lower bound.
pub fn clamp_ratio(ratio: f32) -> f32 {
	let (min, max) = MIN_SCORE_RATIO_RANGE;

	if !ratio.is_finite() {
		return min;
	}

	ratio.clamp(min, max)
}

pub fn rerank_instruction(embed_query: &str) -> String {
	format!(
		"Find titles that match: {embed_query}. Prefer plot/theme matches over literal keyword overlap."
	)
}

pub fn infer_preferred_type(query: &str) -> PreferredType {
	let lower = query.to_lowercase();
	let hit = |re: Option<&Regex>| re.is_some_and(|re| re.is_match(&lower));

	if hit(MOVIE_HINT.as_ref()) {
		PreferredType::Movie
	} else if hit(TV_HINT.as_ref()) {
		PreferredType::TvShow
	} else {
		PreferredType::Any
	}
}

/// Deterministic expansion from the rule table. Expects already normalized text.
///
/// Matching rules union their terms and the tightest ratio wins. A rule's type hint only applies
/// when the query itself does not name a type.
pub fn heuristic_rewrite(query: &str) -> RewriteResult {
	let lower = query.to_lowercase();
	let inferred = infer_preferred_type(query);
	let mut preferred_type = inferred;
	let mut words: Vec<&str> = query.split_whitespace().collect();
	let base_words = words.len();
	let mut ratio: Option<f32> = None;

	for rule in RULES.iter() {
		if !rule.matcher.is_match(&lower) {
			continue;
		}

		words.extend(rule.terms.iter().flat_map(|term| term.split_whitespace()));

		if let Some(hint) = rule.preferred_type
			&& inferred == PreferredType::Any
		{
			preferred_type = hint;
		}

		ratio = Some(ratio.map_or(rule.ratio, |current| current.min(rule.ratio)));
	}

	let default_ratio = match base_words {
		0..=2 => 0.65,
		3..=5 => 0.7,
		_ => 0.75,
	};
	let embed_query = words.into_iter().take(MAX_EMBED_WORDS).collect::<Vec<_>>().join(" ");

	RewriteResult {
		rerank_query: rerank_instruction(&embed_query),
		embed_query,
		min_score_ratio: clamp_ratio(ratio.unwrap_or(default_ratio)),
		preferred_type,
	}
}
