//! Markup normalization for the comment-delimited transport channel.

/// Entity form of a single hyphen. Two of them replace every `--`.
pub const HYPHEN_ENTITY: &str = "&#45;";
const DOUBLE_HYPHEN_ENTITY: &str = "&#45;&#45;";

/// Collapse every run of line breaks and tabs into one space.
///
/// A space rather than nothing, so words split across lines stay apart.
pub fn collapse_line_breaks_and_tabs(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut in_run = false;
    for ch in markup.chars() {
        if matches!(ch, '\r' | '\n' | '\t') {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(ch);
            in_run = false;
        }
    }
    out
}

/// Prepare markup for embedding inside `<!-- … -->`.
///
/// Line breaks and tabs are collapsed first, then every `--` is replaced
/// left to right with its entity form so the comment cannot terminate early.
pub fn normalize_for_comment(markup: &str) -> String {
    collapse_line_breaks_and_tabs(markup).replace("--", DOUBLE_HYPHEN_ENTITY)
}

/// Escape a value for use inside a double-quoted HTML attribute.
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_hyphens_become_entities() {
        assert_eq!(normalize_for_comment("a--b"), "a&#45;&#45;b");
        assert_eq!(normalize_for_comment("<!-- x -->"), "<!&#45;&#45; x &#45;&#45;>");
        // Replacement is non-overlapping, left to right.
        assert_eq!(normalize_for_comment("---"), "&#45;&#45;-");
    }

    #[test]
    fn line_breaks_and_tabs_collapse_to_single_spaces() {
        let normalized = normalize_for_comment("<ul>\r\n\t<li>one</li>\n\n<li>two</li>\n</ul>");
        assert_eq!(normalized, "<ul> <li>one</li> <li>two</li> </ul>");
        assert!(!normalized.contains(['\r', '\n', '\t']));
    }

    #[test]
    fn attribute_values_are_escaped() {
        assert_eq!(
            escape_attribute(r#"/a.css?x=1&y="2""#),
            "/a.css?x=1&amp;y=&quot;2&quot;"
        );
    }
}
