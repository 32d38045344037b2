//! Byte-level scanning helpers for the tree builder.

use crate::entities::decode_entities;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedTag {
    pub(crate) name: String,
    pub(crate) is_end: bool,
    pub(crate) self_closing: bool,
    pub(crate) attributes: Vec<(String, String)>,
}

/// Parses a start or end tag at `start`. Returns `None` when the bytes do not
/// form a complete tag, in which case the caller treats `<` as text.
pub(crate) fn parse_tag(input: &str, start: usize) -> Option<(ParsedTag, usize)> {
    let bytes = input.as_bytes();
    if bytes.get(start).copied() != Some(b'<') {
        return None;
    }

    let mut idx = start.saturating_add(1);
    let mut is_end = false;
    if bytes.get(idx).copied() == Some(b'/') {
        is_end = true;
        idx = idx.saturating_add(1);
    }

    if !bytes.get(idx).is_some_and(u8::is_ascii_alphabetic) {
        return None;
    }

    let name_start = idx;
    while idx < bytes.len() && is_tag_name_char(bytes[idx]) {
        idx = idx.saturating_add(1);
    }
    let name = input[name_start..idx].to_ascii_lowercase();
    let mut attributes: Vec<(String, String)> = Vec::new();

    loop {
        idx = skip_spaces(bytes, idx);
        match bytes.get(idx).copied() {
            None => return None,
            Some(b'>') => {
                return Some((
                    ParsedTag {
                        name,
                        is_end,
                        self_closing: false,
                        attributes,
                    },
                    idx.saturating_add(1),
                ));
            }
            Some(b'/') => {
                let after = skip_spaces(bytes, idx.saturating_add(1));
                if bytes.get(after).copied() == Some(b'>') {
                    return Some((
                        ParsedTag {
                            name,
                            is_end,
                            self_closing: true,
                            attributes,
                        },
                        after.saturating_add(1),
                    ));
                }
                idx = idx.saturating_add(1);
                continue;
            }
            Some(_) => {}
        }

        let attr_start = idx;
        while idx < bytes.len()
            && !bytes[idx].is_ascii_whitespace()
            && !matches!(bytes[idx], b'=' | b'>' | b'/')
        {
            idx = idx.saturating_add(1);
        }
        if idx == attr_start {
            // stray `=`
            idx = idx.saturating_add(1);
            continue;
        }
        let attr_name = input[attr_start..idx].to_ascii_lowercase();

        idx = skip_spaces(bytes, idx);
        let mut value = String::new();
        if bytes.get(idx).copied() == Some(b'=') {
            idx = skip_spaces(bytes, idx.saturating_add(1));
            match bytes.get(idx).copied() {
                Some(quote @ (b'"' | b'\'')) => {
                    let value_start = idx.saturating_add(1);
                    let value_end = find_byte(bytes, value_start, quote)?;
                    value = decode_entities(&input[value_start..value_end]);
                    idx = value_end.saturating_add(1);
                }
                Some(_) => {
                    let value_start = idx;
                    while idx < bytes.len()
                        && !bytes[idx].is_ascii_whitespace()
                        && bytes[idx] != b'>'
                    {
                        idx = idx.saturating_add(1);
                    }
                    value = decode_entities(&input[value_start..idx]);
                }
                None => return None,
            }
        }

        if !attributes.iter().any(|(existing, _)| *existing == attr_name) {
            attributes.push((attr_name, value));
        }
    }
}

/// Returns the raw text up to `</tag_name>` and the index after that end tag.
pub(crate) fn read_raw_text_until_end_tag<'a>(
    input: &'a str,
    start: usize,
    tag_name: &str,
) -> (&'a str, usize) {
    let bytes = input.as_bytes();
    let tag_bytes = tag_name.as_bytes();
    let mut idx = start;

    while idx < bytes.len() {
        if bytes[idx] == b'<'
            && bytes.get(idx.saturating_add(1)).copied() == Some(b'/')
            && starts_with_ignore_ascii_case(bytes, idx.saturating_add(2), tag_bytes)
            && tag_name_boundary(bytes, idx.saturating_add(2 + tag_bytes.len()))
        {
            if let Some((_, end_idx)) = parse_tag(input, idx) {
                return (&input[start..idx], end_idx);
            }
        }

        idx = idx.saturating_add(1);
    }

    (&input[start..], bytes.len())
}

/// Returns the comment body and the index after `-->`.
pub(crate) fn read_comment(input: &str, start: usize) -> (&str, usize) {
    let bytes = input.as_bytes();
    let body_start = start.saturating_add(4).min(bytes.len());
    match find_subslice(bytes, body_start, b"-->") {
        Some(end) => (&input[body_start..end], end.saturating_add(3)),
        None => (&input[body_start..], bytes.len()),
    }
}

pub(crate) fn skip_processing_instruction(bytes: &[u8], start: usize) -> usize {
    if let Some(end) = find_subslice(bytes, start.saturating_add(2), b"?>") {
        return end.saturating_add(2);
    }

    skip_to_gt(bytes, start.saturating_add(2))
}

pub(crate) fn skip_to_gt(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() {
        if bytes[idx] == b'>' {
            return idx.saturating_add(1);
        }
        idx = idx.saturating_add(1);
    }

    bytes.len()
}

pub(crate) fn starts_with(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    let end = idx.saturating_add(pattern.len());
    end <= bytes.len() && bytes[idx..end] == *pattern
}

pub(crate) fn find_byte(bytes: &[u8], from: usize, byte: u8) -> Option<usize> {
    bytes
        .get(from..)?
        .iter()
        .position(|candidate| *candidate == byte)
        .map(|offset| from + offset)
}

fn tag_name_boundary(bytes: &[u8], idx: usize) -> bool {
    match bytes.get(idx).copied() {
        None => true,
        Some(byte) => byte.is_ascii_whitespace() || byte == b'>' || byte == b'/',
    }
}

fn skip_spaces(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() && bytes[idx].is_ascii_whitespace() {
        idx = idx.saturating_add(1);
    }
    idx
}

fn is_tag_name_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b':')
}

fn starts_with_ignore_ascii_case(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    let end = idx.saturating_add(pattern.len());
    if end > bytes.len() {
        return false;
    }

    bytes[idx..end]
        .iter()
        .zip(pattern.iter())
        .all(|(left, right)| left.eq_ignore_ascii_case(right))
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }

    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

#[cfg(test)]
mod tests {
    use super::parse_tag;
    use super::read_comment;
    use super::read_raw_text_until_end_tag;

    #[test]
    fn parses_quoted_unquoted_and_bare_attributes() {
        let input = r#"<INPUT type=checkbox Checked data-label='a &amp; b' value="x">"#;
        let (tag, next) = parse_tag(input, 0).expect("tag");
        assert_eq!(next, input.len());
        assert_eq!(tag.name, "input");
        assert_eq!(
            tag.attributes,
            vec![
                ("type".to_owned(), "checkbox".to_owned()),
                ("checked".to_owned(), String::new()),
                ("data-label".to_owned(), "a & b".to_owned()),
                ("value".to_owned(), "x".to_owned()),
            ]
        );
    }

    #[test]
    fn keeps_first_duplicate_attribute() {
        let (tag, _) = parse_tag("<p id=a id=b>", 0).expect("tag");
        assert_eq!(tag.attributes, vec![("id".to_owned(), "a".to_owned())]);
    }

    #[test]
    fn detects_self_closing_and_end_tags() {
        let (tag, _) = parse_tag("<div />", 0).expect("tag");
        assert!(tag.self_closing);
        let (tag, _) = parse_tag("</DIV >", 0).expect("tag");
        assert!(tag.is_end);
        assert_eq!(tag.name, "div");
    }

    #[test]
    fn rejects_incomplete_or_non_tag_input() {
        assert!(parse_tag("< p>", 0).is_none());
        assert!(parse_tag("<p class=\"open", 0).is_none());
        assert!(parse_tag("<div", 0).is_none());
    }

    #[test]
    fn reads_raw_text_case_insensitively() {
        let input = "var a = '<b>';</SCRIPT >tail";
        let (raw, next) = read_raw_text_until_end_tag(input, 0, "script");
        assert_eq!(raw, "var a = '<b>';");
        assert_eq!(&input[next..], "tail");
    }

    #[test]
    fn reads_comment_bodies_including_unterminated() {
        let (body, next) = read_comment("<!-- hi -->x", 0);
        assert_eq!(body, " hi ");
        assert_eq!(next, 11);
        let (body, next) = read_comment("<!--open", 0);
        assert_eq!(body, "open");
        assert_eq!(next, 8);
    }
}
