use regex::Regex;
use std::sync::LazyLock;

/// Markdown bullets (`-`, `*`, `•`) and numbered items (`1.`, `2)`).
/// Other list conventions (em-dashes, lettered lists) are not recognized.
static BULLET_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+(.+?)\s*$").expect("bullet pattern is valid")
});

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?'];

/// Extracts list items from free-form assistant notes, in order.
pub fn extract_bullets(notes: &str) -> Vec<String> {
    notes
        .lines()
        .filter_map(|line| BULLET_LINE.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|m| clean_item(m.as_str()))
        .filter(|item| !item.is_empty())
        .collect()
}

fn clean_item(raw: &str) -> String {
    let without_emphasis = raw.replace("**", "").replace("__", "");
    without_emphasis
        .trim()
        .trim_matches(|c| c == '*' || c == '_' || c == '`')
        .trim()
        .trim_end_matches(TRAILING_PUNCTUATION)
        .trim()
        .to_string()
}
