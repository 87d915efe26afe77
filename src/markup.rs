//! Inline subtitle markup.
//!
//! Narration text may contain `<Tag>...</Tag>` spans whose tag names refer
//! to partial styles. The markup is purely presentational: TTS always
//! receives the stripped text.

use std::collections::BTreeSet;

/// One stretch of text with an optional style tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    /// `None` means the layer's base style applies.
    pub style_name: Option<String>,
}

fn is_tag_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Scan for the next `<Tag>content</Tag>` occurrence at or after `from`.
///
/// Returns `(open_start, content_range, close_end, tag)`. The content is
/// matched non-greedily: the first matching close tag wins.
fn find_tagged(text: &str, from: usize) -> Option<(usize, std::ops::Range<usize>, usize, &str)> {
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        let Some(rel) = text[i..].find('<') else {
            return None;
        };
        let open_start = i + rel;
        let rest = &text[open_start + 1..];
        let mut chars = rest.char_indices();
        let tag_len = match chars.next() {
            Some((_, c)) if is_tag_start(c) => {
                let mut len = c.len_utf8();
                for (off, c) in chars {
                    if is_tag_char(c) {
                        len = off + c.len_utf8();
                    } else {
                        break;
                    }
                }
                len
            }
            _ => {
                i = open_start + 1;
                continue;
            }
        };
        let tag = &rest[..tag_len];
        let after_tag = open_start + 1 + tag_len;
        if !text[after_tag..].starts_with('>') {
            i = open_start + 1;
            continue;
        }
        let content_start = after_tag + 1;
        let close = format!("</{tag}>");
        if let Some(rel_close) = text[content_start..].find(&close) {
            let content_end = content_start + rel_close;
            return Some((
                open_start,
                content_start..content_end,
                content_end + close.len(),
                tag,
            ));
        }
        i = open_start + 1;
    }
    None
}

/// Split markup text into styled spans.
///
/// Plain stretches outside tags become spans with `style_name = None`.
/// An unterminated tag is treated as plain text.
pub fn parse_styled_text(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut cursor = 0;

    while let Some((open_start, content, close_end, tag)) = find_tagged(text, cursor) {
        if open_start > cursor {
            spans.push(Span {
                text: text[cursor..open_start].to_string(),
                style_name: None,
            });
        }
        if !content.is_empty() {
            spans.push(Span {
                text: text[content.clone()].to_string(),
                style_name: Some(tag.to_string()),
            });
        }
        cursor = close_end;
    }

    if cursor < text.len() {
        spans.push(Span {
            text: text[cursor..].to_string(),
            style_name: None,
        });
    }

    if spans.is_empty() {
        spans.push(Span {
            text: text.to_string(),
            style_name: None,
        });
    }

    spans
}

/// Remove markup, keeping span contents. This is the text fed to TTS.
pub fn strip_markup(text: &str) -> String {
    parse_styled_text(text)
        .into_iter()
        .map(|s| s.text)
        .collect()
}

pub fn has_markup(text: &str) -> bool {
    find_tagged(text, 0).is_some()
}

/// Every tag name referenced by the text, deduplicated.
pub fn referenced_tags(text: &str) -> BTreeSet<String> {
    parse_styled_text(text)
        .into_iter()
        .filter_map(|s| s.style_name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, style: Option<&str>) -> Span {
        Span {
            text: text.to_string(),
            style_name: style.map(str::to_string),
        }
    }

    #[test]
    fn plain_text_is_a_single_span() {
        assert_eq!(parse_styled_text("hello"), vec![span("hello", None)]);
    }

    #[test]
    fn adjacent_tags_split_into_spans() {
        assert_eq!(
            parse_styled_text("<A>hello</A><B>world</B>"),
            vec![span("hello", Some("A")), span("world", Some("B"))]
        );
    }

    #[test]
    fn mixed_plain_and_tagged() {
        assert_eq!(
            parse_styled_text("a<em>b</em>c"),
            vec![
                span("a", None),
                span("b", Some("em")),
                span("c", None),
            ]
        );
    }

    #[test]
    fn unterminated_tag_is_plain_text() {
        assert_eq!(parse_styled_text("<em>oops"), vec![span("<em>oops", None)]);
        assert!(!has_markup("<em>oops"));
    }

    #[test]
    fn mismatched_close_is_plain_text() {
        assert_eq!(
            parse_styled_text("<a>x</b>"),
            vec![span("<a>x</b>", None)]
        );
    }

    #[test]
    fn empty_tag_content_produces_no_span() {
        assert_eq!(parse_styled_text("x<em></em>y"), vec![span("x", None), span("y", None)]);
    }

    #[test]
    fn strip_concatenates_span_texts() {
        let text = "a<em>b</em>c<hl>d</hl>";
        assert_eq!(strip_markup(text), "abcd");

        let joined: String = parse_styled_text(text).into_iter().map(|s| s.text).collect();
        assert_eq!(joined, strip_markup(text));
    }

    #[test]
    fn strip_is_idempotent() {
        let text = "a<em>b</em>c";
        assert_eq!(strip_markup(&strip_markup(text)), strip_markup(text));
    }

    #[test]
    fn cjk_content_round_trips() {
        assert_eq!(
            parse_styled_text("<emphasis>重要:</emphasis> 説明文"),
            vec![span("重要:", Some("emphasis")), span(" 説明文", None)]
        );
    }

    #[test]
    fn referenced_tags_are_deduplicated() {
        let tags = referenced_tags("<a>x</a><b>y</b><a>z</a>");
        assert_eq!(
            tags.into_iter().collect::<Vec<_>>(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn tag_names_may_contain_digits_and_dashes() {
        assert_eq!(
            parse_styled_text("<h-1>x</h-1>"),
            vec![span("x", Some("h-1"))]
        );
        // but may not start with one
        assert_eq!(
            parse_styled_text("<1a>x</1a>"),
            vec![span("<1a>x</1a>", None)]
        );
    }
}
