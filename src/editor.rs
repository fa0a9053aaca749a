//! Cursor and gutter arithmetic for the note editor.

/// Line (1-based) and column (0-based, in chars) of a char offset into `text`.
/// Offsets past the end clamp to the end of the text.
pub fn cursor_position(text: &str, offset: usize) -> (usize, usize) {
    let before: String = text.chars().take(offset).collect();
    let line = before.matches('\n').count() + 1;
    let column = before
        .rsplit('\n')
        .next()
        .map(|last| last.chars().count())
        .unwrap_or(0);
    (line, column)
}

/// Gutter labels for `line_count` lines. With `relative`, every line shows its
/// distance from `cursor_line` and the cursor line itself its absolute number.
pub fn line_numbers(line_count: usize, cursor_line: usize, relative: bool) -> Vec<String> {
    (1..=line_count)
        .map(|line| {
            if relative && line != cursor_line {
                line.abs_diff(cursor_line).to_string()
            } else {
                line.to_string()
            }
        })
        .collect()
}
