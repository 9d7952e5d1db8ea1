/// Cleans raw query text for embedding.
///
/// Curly quotes fold to ASCII, everything outside ASCII alphanumerics, whitespace, hyphen, and
/// apostrophe becomes a space, and whitespace collapses. A lone word is lightly destemmed so that
/// "twisted" and "twist" embed alike; phrases are left untouched.
pub fn normalize_query(raw: &str) -> String {
	let mut cleaned = String::with_capacity(raw.len());

	for ch in raw.trim().chars() {
		let ch = match ch {
			'\u{201C}' | '\u{201D}' => '"',
			'\u{2018}' | '\u{2019}' => '\'',
			other => other,
		};

		if ch.is_ascii_alphanumeric() || ch == '\'' || ch == '-' {
			cleaned.push(ch);
		} else {
			cleaned.push(' ');
		}
	}

	let words: Vec<&str> = cleaned.split_whitespace().collect();

	match words.as_slice() {
		[word] => destem(word).to_string(),
		_ => words.join(" "),
	}
}

fn destem(word: &str) -> &str {
	if word.contains('-') || word.contains('\'') {
		return word;
	}

	let lower = word.to_ascii_lowercase();
	let len = lower.len();

	if len >= 7 && lower.ends_with("ing") {
		return &word[..len - 3];
	}
	if len >= 6 && lower.ends_with("ed") {
		return &word[..len - 2];
	}
	if lower == "series" {
		return word;
	}
	if len >= 6 && lower.ends_with('s') {
		return &word[..len - 1];
	}

	word
}
