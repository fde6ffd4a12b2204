use std::fmt::Write;

use crate::parser::{ParseError, ParseResult};

pub(crate) fn is_string_prefix(s: &str) -> bool {
    // See https://prometheus.io/docs/prometheus/latest/querying/basics/#string-literals
    matches!(s.as_bytes().first(), Some(b'"' | b'\'' | b'`'))
}

pub(crate) fn is_positive_number_prefix(s: &str) -> bool {
    let bytes = s.as_bytes();
    match bytes.first() {
        None => false,
        Some(ch) if ch.is_ascii_digit() => true,
        // Check for .234 numbers
        Some(b'.') => bytes.get(1).map_or(false, |ch| ch.is_ascii_digit()),
        _ => false,
    }
}

pub(crate) fn is_inf_or_nan(s: &str) -> bool {
    s.eq_ignore_ascii_case("inf") || s.eq_ignore_ascii_case("nan")
}

pub(crate) fn is_ident_prefix(s: &str) -> bool {
    match s.chars().next() {
        None => false,
        // Assume this is an escape char for the next char.
        Some('\\') => true,
        Some(ch) => is_first_ident_char(ch),
    }
}

#[inline]
pub(crate) fn is_first_ident_char(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == ':'
}

#[inline]
pub(crate) fn is_ident_char(ch: char) -> bool {
    is_first_ident_char(ch) || ch.is_ascii_digit() || ch == '.'
}

#[inline]
pub(crate) fn is_space_char(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\x0b' | b'\x0c' | b'\r')
}

/// Reports whether `ch` is rendered as is in identifiers and quoted strings.
pub(crate) fn is_printable(ch: char) -> bool {
    if ch == ' ' {
        return true;
    }
    if ch.is_control() || ch.is_whitespace() {
        return false;
    }
    !matches!(ch,
        '\u{00AD}'
        | '\u{034F}'
        | '\u{061C}'
        | '\u{115F}'..='\u{1160}'
        | '\u{17B4}'..='\u{17B5}'
        | '\u{180B}'..='\u{180F}'
        | '\u{200B}'..='\u{200F}'
        | '\u{202A}'..='\u{202E}'
        | '\u{2060}'..='\u{206F}'
        | '\u{E000}'..='\u{F8FF}'
        | '\u{FEFF}'
        | '\u{FFF0}'..='\u{FFFB}'
        | '\u{F0000}'..='\u{10FFFF}'
    )
}

fn hex_value(ch: u8) -> Option<u32> {
    (ch as char).to_digit(16)
}

fn is_hex_digits(s: &[u8]) -> bool {
    s.iter().all(|ch| ch.is_ascii_hexdigit())
}

/// Returns the length of the escape sequence at the start of `s` (which starts with a backslash),
/// or None if the sequence cannot be a part of an identifier.
fn scan_ident_escape(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    match bytes.get(1) {
        None => None,
        Some(b'x' | b'X') => {
            if bytes.len() >= 4 && is_hex_digits(&bytes[2..4]) {
                Some(4)
            } else {
                None
            }
        }
        Some(b'u' | b'U') => {
            if bytes.len() >= 6 && is_hex_digits(&bytes[2..6]) {
                Some(6)
            } else {
                None
            }
        }
        Some(_) => {
            let ch = s[1..].chars().next()?;
            if is_printable(ch) {
                Some(1 + ch.len_utf8())
            } else {
                None
            }
        }
    }
}

/// Scans the identifier at the start of `s`, keeping escape sequences as is.
pub(crate) fn scan_ident(s: &str) -> &str {
    let mut i = 0;
    while i < s.len() {
        let tail = &s[i..];
        let Some(ch) = tail.chars().next() else {
            break;
        };
        if (i == 0 && is_first_ident_char(ch)) || (i > 0 && is_ident_char(ch)) {
            i += ch.len_utf8();
            continue;
        }
        if ch != '\\' {
            break;
        }
        match scan_ident_escape(tail) {
            Some(n) => i += n,
            None => break,
        }
    }
    &s[..i]
}

/// Removes escape sequences from the identifier. Invalid escapes are kept literally.
pub fn unescape_ident(s: &str) -> String {
    let Some(n) = s.find('\\') else {
        return s.to_string();
    };
    let mut dst = String::with_capacity(s.len());
    dst.push_str(&s[..n]);
    let mut s = &s[n..];
    while let Some(tail) = s.strip_prefix('\\') {
        let bytes = tail.as_bytes();
        match bytes.first() {
            None => {
                dst.push('\\');
                s = tail;
            }
            Some(b'x' | b'X') => {
                match (bytes.get(1).and_then(|c| hex_value(*c)), bytes.get(2).and_then(|c| hex_value(*c))) {
                    (Some(h1), Some(h2)) => {
                        if let Some(ch) = char::from_u32(h1 << 4 | h2) {
                            dst.push(ch);
                        }
                        s = &tail[3..];
                    }
                    _ => {
                        dst.push('\\');
                        s = tail;
                    }
                }
            }
            Some(b'u' | b'U') => {
                let code = if bytes.len() >= 5 && is_hex_digits(&bytes[1..5]) {
                    u32::from_str_radix(&tail[1..5], 16).ok().and_then(char::from_u32)
                } else {
                    None
                };
                match code {
                    Some(ch) => {
                        dst.push(ch);
                        s = &tail[5..];
                    }
                    None => {
                        dst.push('\\');
                        s = tail;
                    }
                }
            }
            Some(_) => {
                let ch_len = tail.chars().next().map_or(1, |c| c.len_utf8());
                dst.push_str(&tail[..ch_len]);
                s = &tail[ch_len..];
            }
        }
        let next = s.find('\\').unwrap_or(s.len());
        dst.push_str(&s[..next]);
        s = &s[next..];
    }
    dst
}

/// Appends `s` to `dst`, escaping chars which cannot appear unescaped in an identifier.
pub fn append_escaped_ident(dst: &mut String, s: &str) {
    for (i, ch) in s.chars().enumerate() {
        if (i == 0 && is_first_ident_char(ch)) || (i > 0 && is_ident_char(ch)) {
            dst.push(ch);
            continue;
        }
        if is_printable(ch) {
            dst.push('\\');
            dst.push(ch);
        } else if (ch as u32) < 0x80 {
            let _ = write!(dst, "\\x{:02x}", ch as u32);
        } else {
            let _ = write!(dst, "\\u{:04x}", ch as u32);
        }
    }
}

pub fn escape_ident(s: &str) -> String {
    let mut dst = String::with_capacity(s.len());
    append_escaped_ident(&mut dst, s);
    dst
}

/// Scans the quoted string at the start of `s`. The closing quote must not be escaped.
pub(crate) fn scan_string(s: &str) -> ParseResult<&str> {
    if s.len() < 2 {
        return Err(ParseError::SyntaxError(format!(
            "cannot find end of string in {s}"
        )));
    }
    let bytes = s.as_bytes();
    let quote = bytes[0];
    let mut i = 1;
    loop {
        let Some(n) = bytes[i..].iter().position(|ch| *ch == quote) else {
            return Err(ParseError::SyntaxError(format!(
                "cannot find closing quote {} for the string {s}",
                quote as char
            )));
        };
        i += n;
        let mut bs = 0;
        while bs < i && bytes[i - bs - 1] == b'\\' {
            bs += 1;
        }
        if bs % 2 == 0 {
            return Ok(&s[..i + 1]);
        }
        i += 1;
    }
}

/// Returns the unquoted value of a string token.
pub fn extract_string_value(token: &str) -> ParseResult<String> {
    if !is_string_prefix(token) {
        return Err(ParseError::SyntaxError(format!(
            "expected string; got {token}"
        )));
    }
    if token.len() < 2 {
        return Err(ParseError::SyntaxError(format!(
            "string literal contains unexpected trailing char; got {token}"
        )));
    }
    let quote = token.as_bytes()[0];
    if token.as_bytes()[token.len() - 1] != quote {
        return Err(ParseError::SyntaxError(format!(
            "string literal contains unexpected trailing char; got {token}"
        )));
    }
    if quote == b'`' {
        return Ok(token[1..token.len() - 1].replace("\\`", "`"));
    }
    enquote::unquote(token)
        .map_err(|e| ParseError::SyntaxError(format!("cannot parse string literal {token}: {e:?}")))
}

/// Quotes `s` with double quotes, escaping the chars which cannot be rendered as is.
pub fn quote(s: &str) -> String {
    let mut dst = String::with_capacity(s.len() + 2);
    dst.push('"');
    for ch in s.chars() {
        match ch {
            '"' => dst.push_str("\\\""),
            '\\' => dst.push_str("\\\\"),
            '\u{07}' => dst.push_str("\\a"),
            '\u{08}' => dst.push_str("\\b"),
            '\u{0c}' => dst.push_str("\\f"),
            '\n' => dst.push_str("\\n"),
            '\r' => dst.push_str("\\r"),
            '\t' => dst.push_str("\\t"),
            '\u{0b}' => dst.push_str("\\v"),
            ch if is_printable(ch) => dst.push(ch),
            ch if (ch as u32) < 0x80 => {
                let _ = write!(dst, "\\x{:02x}", ch as u32);
            }
            ch if (ch as u32) < 0x10000 => {
                let _ = write!(dst, "\\u{:04x}", ch as u32);
            }
            ch => {
                let _ = write!(dst, "\\U{:08x}", ch as u32);
            }
        }
    }
    dst.push('"');
    dst
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_unescape_ident() {
        fn f(s: &str, expected: &str) {
            let result = unescape_ident(s);
            assert_eq!(result, expected, "unescape_ident({s})");
        }

        f("", "");
        f("a", "a");
        f("\\", "\\");
        f(r"\\", "\\");
        f(r"\foo\-bar", "foo-bar");
        f(r#"a\\\\b\"c\d"#, r#"a\\b"cd"#);
        f("foo.bar:baz_123", "foo.bar:baz_123");
        f(r"foo\ bar", "foo bar");
        f(r"\x21", "!");
        f(r"\X21", "!");
        f(r"\x7Dfoo\x2Fbar\-\xqw\x", "}foo/bar-\\xqw\\x");
        f(r"\п\р\и\в\е\т123", "привет123");
        f("123", "123");
        f(r"\123", "123");
        f(r"привет\-\foo", "привет-foo");
        f(concat!("\\", "u0965"), "\u{0965}");
        f(r"\U0965", "\u{0965}");
        f(concat!("\\", "u202c"), "\u{202c}");
        f(r"\U202ca", "\u{202c}a");
    }

    #[test]
    fn test_escape_ident() {
        fn f(s: &str, expected: &str) {
            let result = escape_ident(s);
            assert_eq!(result, expected, "escape_ident({s:?})");
        }

        f("a", "a");
        f("a.b:c_23", "a.b:c_23");
        f(r"a b-cd+dd\", r"a\ b\-cd\+dd\\");
        f("a\x1E\x20\x7e", r"a\x1e\ \~");
        f("\x2e\x2e", r"\..");
        f("123", r"\123");
        f("+43.6", r"\+43.6");
        f("привет123(a-b)", r"привет123\(a\-b\)");
        f("\u{0965}", "\\\u{0965}");
        f("\u{202c}", concat!("\\", "u202c"));
    }

    #[test]
    fn test_scan_ident() {
        fn f(s: &str, expected: &str) {
            let result = scan_ident(s);
            assert_eq!(result, expected, "scan_ident({s:?})");
        }

        f("a", "a");
        f("foo.bar:baz_123", "foo.bar:baz_123");
        f("a+b", "a");
        f("foo()", "foo");
        f(r"a\-b+c", r"a\-b");
        f(r"a\ b\\\ c\", r"a\ b\\\ c");
        f(r"\п\р\и\в\е\т123", r"\п\р\и\в\е\т123");
        f("привет123!foo", "привет123");
        f(r"\1fooЫ+bar", r"\1fooЫ");
        f(concat!("\\", "u7834*аа"), concat!("\\", "u7834"));
        f(r"\U7834*аа", r"\U7834");
        f(r"\x7834*аа", r"\x7834");
        f(r"\X7834*аа", r"\X7834");
        f(r"a\x+b", "a");
        f(r"a\x1+b", "a");
        f(r"a\x12+b", r"a\x12");
        f(r"a\u+b", "a");
        f(r"a\u1+b", "a");
        f(r"a\u12+b", "a");
        f(r"a\u123+b", "a");
        f(concat!("a\\", "u1234+b"), concat!("a\\", "u1234"));
        f("a\\\u{202c}", "a");
    }

    #[test]
    fn test_extract_string_value() {
        fn f(s: &str, expected: &str) {
            let result = extract_string_value(s).expect("extract_string_value");
            assert_eq!(result, expected, "extract_string_value({s})");
        }

        f(r#""""#, "");
        f("''", "");
        f("``", "");
        f(r#""foo\"bar""#, "foo\"bar");
        f(r#"'foo\'bar"BAZ'"#, "foo'bar\"BAZ");
        f("`foo\\`b'ar`", "foo`b'ar");
        f("`a\\nb`", "a\\nb");
        f(r#""\n\t""#, "\n\t");
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote(""), r#""""#);
        assert_eq!(quote("foo\"b'ar"), r#""foo\"b'ar""#);
        assert_eq!(quote("\n\t\r 12:{}[]()44"), r#""\n\t\r 12:{}[]()44""#);
        assert_eq!(quote("a\\b"), r#""a\\b""#);
        assert_eq!(quote("\x01"), r#""\x01""#);
        assert_eq!(quote("水电费"), r#""水电费""#);
    }
}
