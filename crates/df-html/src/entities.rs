//! Character reference decoding.

/// Decodes the named and numeric references the parser understands.
/// Unknown references are kept verbatim.
pub(crate) fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_owned();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match decode_reference(tail) {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(tail: &str) -> Option<(char, usize)> {
    let end = tail.find(';')?;
    if end > 12 {
        return None;
    }

    let body = &tail[1..end];
    let ch = if let Some(numeric) = body.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse::<u32>().ok()?,
        };
        char::from_u32(code)
            .filter(|ch| *ch != '\0')
            .unwrap_or('\u{FFFD}')
    } else {
        match body {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            "nbsp" => '\u{A0}',
            _ => return None,
        }
    };

    Some((ch, end.saturating_add(1)))
}

#[cfg(test)]
mod tests {
    use super::decode_entities;
    use rstest::rstest;

    #[rstest]
    #[case("plain", "plain")]
    #[case("a &amp; b", "a & b")]
    #[case("&lt;p&gt;", "<p>")]
    #[case("&#65;&#x42;&#X43;", "ABC")]
    #[case("&quot;&apos;", "\"'")]
    #[case("caf&eacute;", "caf&eacute;")]
    #[case("AT&T rocks", "AT&T rocks")]
    #[case("&#0;", "\u{FFFD}")]
    fn decodes_references(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(decode_entities(input), expected);
    }
}
