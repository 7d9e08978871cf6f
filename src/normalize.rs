//! Display-name normalization.
//!
//! Upstream transports may double-encode free-text names: percent-encoding
//! from URL-shaped payloads and markup character escapes from the message
//! codec. Names are normalized before every comparison and before storage so
//! the guard never fights its own encoding.

/// Normalize a display name for comparison and storage.
///
/// Decodes percent-encoding, then markup character escapes, then trims
/// surrounding whitespace. Interior whitespace is preserved.
pub fn normalize_name(raw: &str) -> String {
    let decoded = percent_decode(raw);
    let unescaped = unescape_markup(&decoded);
    unescaped.trim().to_string()
}

/// Decode `%XX` percent-escapes, interpreting the result as UTF-8.
///
/// Invalid escapes pass through untouched; invalid UTF-8 byte runs are
/// replaced with U+FFFD so a mangled name still compares stably.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).copied().and_then(hex_val),
                bytes.get(i + 2).copied().and_then(hex_val),
            )
        {
            out.push(hi << 4 | lo);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Decode the markup escapes used by the message codec.
///
/// Handles the named forms (`&amp;` `&lt;` `&gt;` `&quot;`) and decimal
/// character references (`&#91;` and friends). `&amp;` is decoded last so a
/// double-escaped name collapses one layer per pass, matching how the
/// transport stacks them.
pub fn unescape_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let Some(end) = rest.find(';') else {
            out.push_str(rest);
            return out;
        };
        // Another '&' before the ';' means this one is literal.
        if rest[1..end].contains('&') {
            out.push('&');
            rest = &rest[1..];
            continue;
        }
        let entity = &rest[..=end];
        match entity {
            "&lt;" => out.push('<'),
            "&gt;" => out.push('>'),
            "&quot;" => out.push('"'),
            "&amp;" => out.push('&'),
            _ => {
                if let Some(ch) = decimal_ref(entity) {
                    out.push(ch);
                } else {
                    out.push_str(entity);
                }
            }
        }
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    out
}

/// Parse `&#NNN;` into its character, if well-formed.
fn decimal_ref(entity: &str) -> Option<char> {
    let digits = entity.strip_prefix("&#")?.strip_suffix(';')?;
    if digits.is_empty() || digits.len() > 7 {
        return None;
    }
    let code: u32 = digits.parse().ok()?;
    char::from_u32(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_decoding_utf8() {
        assert_eq!(percent_decode("%E5%B0%8F%E6%98%8E"), "小明");
        assert_eq!(percent_decode("plain name"), "plain name");
        // Truncated and non-hex escapes pass through
        assert_eq!(percent_decode("50%"), "50%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }

    #[test]
    fn markup_unescape() {
        assert_eq!(unescape_markup("&#91;boss&#93;"), "[boss]");
        assert_eq!(unescape_markup("a&lt;b&gt;c"), "a<b>c");
        assert_eq!(unescape_markup("Tom &amp; Jerry"), "Tom & Jerry");
        // Unknown entities survive
        assert_eq!(unescape_markup("&nope;"), "&nope;");
        // Bare ampersand with no terminator survives
        assert_eq!(unescape_markup("AT&T"), "AT&T");
        // A literal '&' right before an entity does not swallow it
        assert_eq!(unescape_markup("&&amp;"), "&&");
    }

    #[test]
    fn normalization_composes_and_trims() {
        assert_eq!(normalize_name("  %E5%B0%8F%E6%98%8E  "), "小明");
        assert_eq!(normalize_name("&#91;mod&#93; 小明"), "[mod] 小明");
        // Interior whitespace preserved
        assert_eq!(normalize_name("night  owl"), "night  owl");
    }

    #[test]
    fn double_encoded_amp_collapses_one_layer() {
        assert_eq!(unescape_markup("&amp;lt;"), "&lt;");
    }
}
