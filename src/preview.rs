//! Gallery excerpts and markdown rendering.
use pulldown_cmark::{html, Options, Parser};

/// The text shown on a gallery card: the note's non-empty lines, joined and
/// cut to `max_chars` characters.
pub fn excerpt(content: &str, max_chars: usize) -> String {
    let joined = content
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    match joined.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &joined[..cut]),
        None => joined,
    }
}

/// Renders markdown to an HTML fragment.
pub fn render_markdown(content: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let parser = Parser::new_ext(content, options);

    let mut out = String::with_capacity(content.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_skips_blank_lines() {
        assert_eq!(excerpt("\n\nfirst\n\n  \nsecond\n", 100), "first\nsecond");
    }

    #[test]
    fn excerpt_truncates_on_char_boundary() {
        assert_eq!(excerpt("héllo wörld", 5), "héllo...");
        assert_eq!(excerpt("short", 5), "short");
        assert_eq!(excerpt("", 5), "");
    }

    #[test]
    fn markdown_renders_headings_and_tables() {
        let html = render_markdown("# Title\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
    }
}
