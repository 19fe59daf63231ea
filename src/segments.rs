//! Bracket segment scanning.
//!
//! Splits a raw title into the text outside brackets and the ordered list of
//! bracketed segments: `"Song (feat. X) [Live]"` → `("Song", ["feat. X", "Live"])`.

/// Upper bound on extracted segments. Anything after the limit stays in the
/// base text, which keeps pathological inputs linear.
pub const MAX_SEGMENTS: usize = 32;

fn closing_for(open: char) -> Option<char> {
    match open {
        '(' => Some(')'),
        '[' => Some(']'),
        '{' => Some('}'),
        _ => None,
    }
}

/// Byte offset of the close bracket matching the open bracket at `open_at`.
/// Only brackets of the same kind count towards the depth.
fn find_matching_close(text: &str, open_at: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, c) in text[open_at..].char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(open_at + idx);
            }
        }
    }
    None
}

/// Collapse whitespace runs into single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Scan `title` left to right, returning `(base, segments)`.
///
/// An unmatched open bracket turns the rest of the string into plain text
/// and ends the scan. Segment contents are trimmed, bracket characters are
/// not included.
pub fn scan(title: &str) -> (String, Vec<String>) {
    let mut base = String::with_capacity(title.len());
    let mut segments = Vec::new();
    let mut pos = 0;

    while pos < title.len() {
        let rest = &title[pos..];
        let Some((rel, open)) = rest.char_indices().find(|(_, c)| closing_for(*c).is_some()) else {
            base.push_str(rest);
            break;
        };
        let open_at = pos + rel;
        base.push_str(&title[pos..open_at]);

        if segments.len() >= MAX_SEGMENTS {
            base.push_str(&title[open_at..]);
            break;
        }

        // closing_for is Some for every char the finder accepted
        let close = closing_for(open).unwrap_or(open);
        match find_matching_close(title, open_at, open, close) {
            Some(close_at) => {
                segments.push(title[open_at + open.len_utf8()..close_at].trim().to_string());
                // Keep words on either side of a segment apart
                base.push(' ');
                pos = close_at + close.len_utf8();
            }
            None => {
                base.push_str(&title[open_at..]);
                break;
            }
        }
    }

    (collapse_whitespace(&base), segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_no_brackets() {
        assert_eq!(scan("  My   Awesome Song "), ("My Awesome Song".to_string(), vec![]));
    }

    #[test]
    fn test_scan_mixed_bracket_kinds() {
        let (base, segments) = scan("Song (feat. A) [Live] {Remix}");
        assert_eq!(base, "Song");
        assert_eq!(segments, vec!["feat. A", "Live", "Remix"]);
    }

    #[test]
    fn test_scan_nested_same_kind() {
        let (base, segments) = scan("Song (Remix (Extended)) Tail");
        assert_eq!(base, "Song Tail");
        assert_eq!(segments, vec!["Remix (Extended)"]);
    }

    #[test]
    fn test_scan_other_kinds_do_not_nest() {
        // '[' inside '(' is plain content of the round segment
        let (base, segments) = scan("Song ([Live)] x");
        assert_eq!(segments, vec!["[Live"]);
        assert_eq!(base, "Song ] x");
    }

    #[test]
    fn test_scan_unmatched_bracket_degrades_to_text() {
        let (base, segments) = scan("Song (Live) (Unclosed [stuff");
        assert_eq!(base, "Song (Unclosed [stuff");
        assert_eq!(segments, vec!["Live"]);
    }

    #[test]
    fn test_scan_separates_adjacent_words() {
        let (base, segments) = scan("Song(Live)Title");
        assert_eq!(base, "Song Title");
        assert_eq!(segments, vec!["Live"]);
    }

    #[test]
    fn test_scan_round_trip_trailing_segments() {
        let input = "Song   Title (Live) [Remix]";
        let (base, segments) = scan(input);
        let rebuilt = format!("{} ({}) [{}]", base, segments[0], segments[1]);
        assert_eq!(rebuilt, collapse_whitespace(input));
    }

    #[test]
    fn test_scan_segment_limit() {
        let input = "x".to_string() + &"(a)".repeat(MAX_SEGMENTS + 3);
        let (base, segments) = scan(&input);
        assert_eq!(segments.len(), MAX_SEGMENTS);
        assert!(base.ends_with("(a)(a)(a)"));
    }

    #[test]
    fn test_scan_unicode_content() {
        let (base, segments) = scan("Canción (versión en vivo) – Ñ");
        assert_eq!(base, "Canción – Ñ");
        assert_eq!(segments, vec!["versión en vivo"]);
    }
}
