use crate::catalog::Title;

const STOPWORDS: [&str; 39] = [
	"a",
	"an",
	"and",
	"are",
	"as",
	"at",
	"be",
	"best",
	"for",
	"from",
	"good",
	"how",
	"i",
	"in",
	"is",
	"it",
	"like",
	"me",
	"movie",
	"movies",
	"my",
	"netflix",
	"of",
	"on",
	"or",
	"recommend",
	"recommendations",
	"recs",
	"series",
	"show",
	"shows",
	"similar",
	"some",
	"the",
	"this",
	"to",
	"tv",
	"watch",
	"with",
];

const TITLE_POINTS: u32 = 3;
const GENRE_POINTS: u32 = 2;
const DESCRIPTION_POINTS: u32 = 1;

pub fn is_stopword(word: &str) -> bool {
	STOPWORDS.contains(&word)
}

/// Deduplicated lowercase keywords of at least three characters, stopwords removed.
pub fn extract_keywords(text: &str, max_keywords: usize) -> Vec<String> {
	let mut cleaned = String::with_capacity(text.len());

	for ch in text.to_lowercase().chars() {
		if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '\'' || ch == '-' {
			cleaned.push(ch);
		} else {
			cleaned.push(' ');
		}
	}

	let mut out: Vec<String> = Vec::new();

	for token in cleaned.split_whitespace() {
		if out.len() >= max_keywords {
			break;
		}
		if token.len() < 3 || is_stopword(token) || out.iter().any(|seen| seen == token) {
			continue;
		}

		out.push(token.to_string());
	}

	out
}

/// Field-weighted keyword overlap for one title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LexicalOverlap {
	pub hits: u32,
	pub points: u32,
}
impl LexicalOverlap {
	/// Each keyword counts once, in its strongest field: title, then genres, then description.
	pub fn measure(title: &Title, keywords: &[String]) -> Self {
		let mut out = Self::default();

		if keywords.is_empty() {
			return out;
		}

		let name = title.title.to_lowercase();
		let genres = title.genres.to_lowercase();
		let description = title.description.to_lowercase();

		for keyword in keywords {
			let points = if name.contains(keyword.as_str()) {
				TITLE_POINTS
			} else if genres.contains(keyword.as_str()) {
				GENRE_POINTS
			} else if description.contains(keyword.as_str()) {
				DESCRIPTION_POINTS
			} else {
				continue;
			};

			out.hits += 1;
			out.points += points;
		}

		out
	}

	/// Points count only once at least `min_hits` distinct keywords matched.
	pub fn score(self, min_hits: u32) -> u32 {
		if self.hits < min_hits { 0 } else { self.points }
	}
}
