//! Body text preparation for the destination tracker

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";

/// Replace literal `...` so the destination does not shorten it into an
/// ellipsis character
pub fn escape_ellipsis(text: &str) -> String {
    text.replace("...", ". . . ")
}

/// Remove every `<!-- ... -->` block, including multi-line ones
///
/// An unterminated comment opener is left untouched.
pub fn strip_html_comments(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let stripped = strip_once(&current);
        if stripped == current {
            return stripped;
        }
        current = stripped;
    }
}

fn strip_once(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(COMMENT_START) {
        let after_open = &rest[start + COMMENT_START.len()..];
        match after_open.find(COMMENT_END) {
            Some(end) => {
                out.push_str(&rest[..start]);
                rest = &after_open[end + COMMENT_END.len()..];
            }
            None => break,
        }
    }

    out.push_str(rest);
    out
}

/// Cut `text` to at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
