pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_titles.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_titles.sql")),
				"tables/002_poster_cache.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_poster_cache.sql")),
				"tables/003_favorites.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_favorites.sql")),
				"tables/004_catalog_meta.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_catalog_meta.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}
