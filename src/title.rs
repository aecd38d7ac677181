//! File-name-safe titles for notes and book folders

use serde::{Deserialize, Serialize};

/// Marker appended when a title is shortened
pub const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// Zero behaves like unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Zero behaves like unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_words: Option<usize>,
}

/// Turn free text into a title usable as a file name.
///
/// Length truncation runs before word truncation and each appends its own
/// ellipsis, so a long title can end up shortened twice.
pub fn sanitize(raw: &str, options: &TitleOptions) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' => '_',
            c => c,
        })
        .collect();

    let mut title = collapse_runs(&replaced, |c| c == '_', '_');
    title = title.trim().to_string();
    title = title.trim_matches('_').to_string();
    title = collapse_runs(&title, char::is_whitespace, ' ');

    if let Some(max_length) = options.max_length.filter(|n| *n > 0) {
        if title.chars().count() > max_length {
            title = format!("{}{}", title.chars().take(max_length).collect::<String>(), ELLIPSIS);
        }
    }

    if let Some(max_words) = options.max_words.filter(|n| *n > 0) {
        let words: Vec<&str> = title.split(' ').collect();
        if words.len() > max_words {
            title = format!("{}{}", words[..max_words].join(" "), ELLIPSIS);
        }
    }

    format!(
        "{}{}{}",
        options.prefix.as_deref().unwrap_or(""),
        title,
        options.suffix.as_deref().unwrap_or("")
    )
}

/// Replace every run of characters matching `pred` with a single `with`
fn collapse_runs(input: &str, pred: impl Fn(char) -> bool, with: char) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_run = false;
    for c in input.chars() {
        if pred(c) {
            if !in_run {
                out.push(with);
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}
