use regex::{Regex, RegexBuilder};

pub const CANONICAL_GENRES: [&str; 23] = [
	"Action",
	"Adventure",
	"Anime",
	"Animation",
	"Biography",
	"Comedy",
	"Crime",
	"Documentary",
	"Drama",
	"Family",
	"Fantasy",
	"History",
	"Horror",
	"Kids",
	"Musical",
	"Mystery",
	"Reality",
	"Romance",
	"Sci-Fi",
	"Sports",
	"Thriller",
	"War",
	"Western",
];

// Order matters: the first matching fragment wins.
const CANONICAL_RULES: [(&[&str], &str); 27] = [
	(&["anime"], "Anime"),
	(&["documentar", "docuseries"], "Documentary"),
	(&["biograph"], "Biography"),
	(&["histor"], "History"),
	(&["war"], "War"),
	(&["western"], "Western"),
	(&["sports"], "Sports"),
	(&["reality"], "Reality"),
	(&["stand-up"], "Comedy"),
	(&["comed"], "Comedy"),
	(&["crime"], "Crime"),
	(&["thriller"], "Thriller"),
	(&["myster"], "Mystery"),
	(&["horror"], "Horror"),
	(&["sci-fi"], "Sci-Fi"),
	(&["fantasy"], "Fantasy"),
	(&["action"], "Action"),
	(&["adventure"], "Adventure"),
	(&["romantic"], "Romance"),
	(&["drama"], "Drama"),
	(&["music", "musical"], "Musical"),
	(&["kids tv"], "Kids"),
	(&["children", "family", "kids"], "Family"),
	(&["animation"], "Animation"),
	(&["faith", "spiritual"], "Documentary"),
	(&["independent", "classic", "cult"], "Drama"),
	(&["lgbtq"], "Drama"),
];

pub fn split_genres(genres: &str) -> impl Iterator<Item = &str> {
	genres.split(',').map(str::trim).filter(|label| !label.is_empty())
}

/// Maps one raw catalog label to its canonical genre, if it has one.
pub fn canonicalize_genre(raw: &str) -> Option<&'static str> {
	let label = raw.trim().to_lowercase();

	if label.is_empty() || label.contains("international") {
		return None;
	}

	CANONICAL_RULES
		.iter()
		.find(|(fragments, _)| fragments.iter().any(|fragment| label.contains(fragment)))
		.map(|(_, canonical)| *canonical)
}

/// Canonical genres of a comma-joined label string, deduplicated in first-seen order.
pub fn normalized_genres(genres: &str) -> Vec<&'static str> {
	let mut out = Vec::new();

	for label in split_genres(genres) {
		if let Some(canonical) = canonicalize_genre(label)
			&& !out.contains(&canonical)
		{
			out.push(canonical);
		}
	}

	out
}

/// Case-insensitive pattern matching raw label strings that belong to `genre`.
///
/// Canonical names use the same fragments as [`canonicalize_genre`]; anything else must appear as
/// a whole comma-delimited label. The syntax is shared by the `regex` crate and Postgres `~*`.
pub fn genre_pattern(genre: &str) -> String {
	let pattern = match genre {
		"Action" => "action",
		"Adventure" => "adventure",
		"Anime" => "anime",
		"Animation" => "animation",
		"Biography" => "biograph",
		"Comedy" => "stand-up|comed",
		"Crime" => "crime",
		"Documentary" => "documentar|docuseries|faith|spiritual",
		"Drama" => "drama",
		"Family" => "children|family|kids",
		"Fantasy" => "fantasy",
		"History" => "histor",
		"Horror" => "horror",
		"Kids" => "kids tv",
		"Musical" => "music|musical",
		"Mystery" => "myster",
		"Reality" => "reality",
		"Romance" => "romantic",
		"Sci-Fi" => "sci-fi",
		"Sports" => "sports",
		"Thriller" => "thriller",
		"War" => "war",
		"Western" => "western",
		other => return format!(r"(^|,\s*){}(,|$)", escape_label(other.trim())),
	};

	pattern.to_string()
}

pub fn genre_regex(genre: &str) -> Option<Regex> {
	RegexBuilder::new(&genre_pattern(genre)).case_insensitive(true).build().ok()
}

/// Matches a title against a genre the way the direct catalog query does: the precomputed
/// canonical list when present, otherwise the raw label pattern.
pub fn title_has_genre(genres_list: Option<&[String]>, genres: &str, genre: &str) -> bool {
	if genres_list.is_some_and(|list| list.iter().any(|entry| entry == genre)) {
		return true;
	}

	genre_regex(genre).is_some_and(|re| re.is_match(genres))
}

// Escapes with backslashes only before punctuation so the result stays valid for both engines.
fn escape_label(label: &str) -> String {
	let mut out = String::with_capacity(label.len());

	for ch in label.chars() {
		if ".*+?^${}()|[]\\".contains(ch) {
			out.push('\\');
		}

		out.push(ch);
	}

	out
}
