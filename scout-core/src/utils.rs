// scout-core/src/utils.rs
//! Small string helpers used for log previews.

/// Truncates to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_string(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    if max_chars < 3 {
        return input.chars().take(max_chars).collect();
    }
    format!("{}...", input.chars().take(max_chars - 3).collect::<String>())
}

/// First `lines` lines of `text`, each cut to 120 characters.
pub fn preview(text: &str, lines: usize) -> String {
    text.lines()
        .take(lines)
        .map(|line| truncate_string(line, 120))
        .collect::<Vec<_>>()
        .join("\n")
}
