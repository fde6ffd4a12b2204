use crate::parser::{ParseError, ParseResult};

/// Returns the length of the `0x`, `0o`, `0b` or octal `0` prefix at the start of `s`
/// and whether the number is hexadecimal.
pub(crate) fn scan_special_integer_prefix(s: &str) -> (usize, bool) {
    let bytes = s.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'0' {
        return (0, false);
    }
    match bytes[1].to_ascii_lowercase() {
        // octal number: 0123
        ch if ch.is_ascii_digit() => (1, false),
        b'x' => (2, true),
        b'o' | b'b' => (2, false),
        _ => (0, false),
    }
}

pub(crate) fn is_special_integer_prefix(s: &str) -> bool {
    scan_special_integer_prefix(s).0 > 0
}

/// Returns the length of the `k`, `Ki`, `KB`, `KiB` (and M, G, T) multiplier at the start of `s`.
pub(crate) fn scan_num_multiplier(s: &str) -> usize {
    let bytes = s.as_bytes();
    let prefix: Vec<u8> = bytes
        .iter()
        .take(3)
        .map(|ch| ch.to_ascii_lowercase())
        .collect();
    match prefix.as_slice() {
        [b'k' | b'm' | b'g' | b't', b'i', b'b', ..] => 3,
        [b'k' | b'm' | b'g' | b't', b'i' | b'b', ..] => 2,
        [b'k' | b'm' | b'g' | b't', ..] => 1,
        _ => 0,
    }
}

#[inline]
fn is_decimal_char_or_underscore(ch: u8) -> bool {
    ch.is_ascii_digit() || ch == b'_'
}

/// Scans the positive number at the start of `s`, including an optional multiplier suffix.
pub(crate) fn scan_positive_number(s: &str) -> ParseResult<&str> {
    let bytes = s.as_bytes();
    let (skip_chars, is_hex) = scan_special_integer_prefix(s);
    let mut i = skip_chars;
    if is_hex {
        while i < bytes.len() && bytes[i].is_ascii_hexdigit() {
            i += 1;
        }
        if i == skip_chars {
            return Err(ParseError::InvalidNumber(s.to_string()));
        }
        return Ok(&s[..i]);
    }

    while i < bytes.len() && is_decimal_char_or_underscore(bytes[i]) {
        i += 1;
    }
    if i == bytes.len() {
        if i == skip_chars {
            return Err(ParseError::InvalidNumber(s.to_string()));
        }
        return Ok(s);
    }
    if i == skip_chars && bytes[i] != b'.' {
        return Err(ParseError::InvalidNumber(s.to_string()));
    }
    let n = scan_num_multiplier(&s[i..]);
    if n > 0 {
        return Ok(&s[..i + n]);
    }
    if !matches!(bytes[i], b'.' | b'e' | b'E') {
        return Ok(&s[..i]);
    }

    if bytes[i] == b'.' {
        // the fractional part may be empty: `234.`
        i += 1;
        while i < bytes.len() && is_decimal_char_or_underscore(bytes[i]) {
            i += 1;
        }
        if i == bytes.len() {
            return Ok(s);
        }
        let n = scan_num_multiplier(&s[i..]);
        if n > 0 {
            return Ok(&s[..i + n]);
        }
        if bytes[i] != b'e' && bytes[i] != b'E' {
            return Ok(&s[..i]);
        }
    }

    // exponent
    i += 1;
    if i == bytes.len() {
        return Err(ParseError::InvalidNumber(format!("missing exponent part in {s}")));
    }
    if bytes[i] == b'-' || bytes[i] == b'+' {
        i += 1;
    }
    let j = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == j {
        return Err(ParseError::InvalidNumber(format!("missing exponent part in {s}")));
    }
    Ok(&s[..i])
}

const KIB: f64 = 1024.0;
const MIB: f64 = KIB * 1024.0;
const GIB: f64 = MIB * 1024.0;
const TIB: f64 = GIB * 1024.0;

/// Returns the multiplier for the unit suffix of `s` and the length of the suffix.
fn get_number_suffix(s: &str) -> Option<(f64, usize)> {
    const SUFFIXES: [(&str, f64); 16] = [
        ("kib", KIB),
        ("ki", KIB),
        ("kb", 1e3),
        ("k", 1e3),
        ("mib", MIB),
        ("mi", MIB),
        ("mb", 1e6),
        ("m", 1e6),
        ("gib", GIB),
        ("gi", GIB),
        ("gb", 1e9),
        ("g", 1e9),
        ("tib", TIB),
        ("ti", TIB),
        ("tb", 1e12),
        ("t", 1e12),
    ];
    SUFFIXES
        .iter()
        .find(|(suffix, _)| s.ends_with(suffix))
        .map(|(suffix, mult)| (*mult, suffix.len()))
}

/// Parses a positive number such as `12.5`, `0x1f`, `0o17`, `1_000`, `Inf` or `4.5GiB`.
pub fn parse_positive_number(s: &str) -> ParseResult<f64> {
    if is_special_integer_prefix(s) {
        let digits = s.replace('_', "");
        let (radix, digits) = match digits.as_bytes()[1].to_ascii_lowercase() {
            b'x' => (16, &digits[2..]),
            b'o' => (8, &digits[2..]),
            b'b' => (2, &digits[2..]),
            _ => (8, &digits[1..]),
        };
        return i64::from_str_radix(digits, radix)
            .map(|n| n as f64)
            .map_err(|_| ParseError::InvalidNumber(s.to_string()));
    }
    let lower = s.to_ascii_lowercase().replace('_', "");
    let (num, mult) = match get_number_suffix(&lower) {
        Some((mult, len)) => (&lower[..lower.len() - len], mult),
        None => (lower.as_str(), 1.0),
    };
    num.parse::<f64>()
        .map(|v| v * mult)
        .map_err(|_| ParseError::InvalidNumber(s.to_string()))
}

/// Parses a number which may be prefixed with a sign.
pub fn parse_number(s: &str) -> ParseResult<f64> {
    match s.as_bytes().first() {
        Some(b'-') => parse_positive_number(&s[1..]).map(|v| -v),
        Some(b'+') => parse_positive_number(&s[1..]),
        _ => parse_positive_number(s),
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("", 0)]
    #[test_case("foo", 0)]
    #[test_case("k", 1)]
    #[test_case("KB", 2)]
    #[test_case("Ki", 2)]
    #[test_case("kiB", 3)]
    #[test_case("M", 1)]
    #[test_case("Mb", 2)]
    #[test_case("mi", 2)]
    #[test_case("MiB", 3)]
    #[test_case("g", 1)]
    #[test_case("GB", 2)]
    #[test_case("GI", 2)]
    #[test_case("GIB", 3)]
    #[test_case("t", 1)]
    #[test_case("tB", 2)]
    #[test_case("tI", 2)]
    #[test_case("tIb", 3)]
    #[test_case("Gb   ", 2)]
    #[test_case("tIb + 5", 3)]
    fn test_scan_num_multiplier(s: &str, expected: usize) {
        assert_eq!(scan_num_multiplier(s), expected, "scan_num_multiplier({s})");
    }

    #[test]
    fn test_scan_positive_number_success() {
        fn f(s: &str, expected: &str) {
            let ns = scan_positive_number(s).expect("scan_positive_number");
            assert_eq!(ns, expected, "unexpected number scanned from {s}");
        }

        f("123", "123");
        f("123+5", "123");
        f("1.23 ", "1.23");
        f("12e5", "12e5");
        f("1.3E-3/5", "1.3E-3");
        f("234.", "234.");
        f("234. + foo", "234.");
        f("0xfe", "0xfe");
        f("0b0110", "0b0110");
        f("0O765", "0O765");
        f("0765", "0765");
        f("2k*34", "2k");
        f("2.3Kb / 43", "2.3Kb");
        f("3ki", "3ki");
        f("4.5Kib", "4.5Kib");
        f("2m", "2m");
        f("2.3Mb", "2.3Mb");
        f("3Mi", "3Mi");
        f("4.5mib", "4.5mib");
        f("2G", "2G");
        f("2.3gB", "2.3gB");
        f("3gI", "3gI");
        f("4.5GiB / foo", "4.5GiB");
        f("2T", "2T");
        f("2.3tb", "2.3tb");
        f("3tI", "3tI");
        f("4.5TIB   ", "4.5TIB");
        f("1_234", "1_234");
    }

    #[test_case("")]
    #[test_case("foobar")]
    #[test_case("123e")]
    #[test_case("1233Ebc")]
    #[test_case("12.34E+abc")]
    #[test_case("12.34e-")]
    fn test_scan_positive_number_failure(s: &str) {
        assert!(scan_positive_number(s).is_err(), "expecting error for {s}");
    }

    #[test]
    fn test_parse_positive_number_success() {
        fn f(s: &str, expected: f64) {
            let v = parse_positive_number(s).expect("parse_positive_number");
            if expected.is_nan() {
                assert!(v.is_nan(), "expecting NaN for {s}; got {v}");
            } else {
                assert_eq!(v, expected, "unexpected value for {s}");
            }
        }

        f("123", 123.0);
        f("1.23", 1.23);
        f("12e5", 12e5);
        f("1.3E-3", 1.3e-3);
        f("234.", 234.0);
        f("Inf", f64::INFINITY);
        f("NaN", f64::NAN);
        f("0xfe", 254.0);
        f("0b0110", 6.0);
        f("0O765", 501.0);
        f("0765", 501.0);
        f("1_234", 1234.0);
        f("2k", 2.0 * 1000.0);
        f("2.3Kb", 2.3 * 1000.0);
        f("3ki", 3.0 * 1024.0);
        f("4.5Kib", 4.5 * 1024.0);
        f("2m", 2.0 * 1000.0 * 1000.0);
        f("2.3Mb", 2.3 * 1000.0 * 1000.0);
        f("3Mi", 3.0 * 1024.0 * 1024.0);
        f("4.5mib", 4.5 * 1024.0 * 1024.0);
        f("2G", 2.0 * 1000.0 * 1000.0 * 1000.0);
        f("2.3gB", 2.3 * 1000.0 * 1000.0 * 1000.0);
        f("3gI", 3.0 * 1024.0 * 1024.0 * 1024.0);
        f("4.5GiB", 4.5 * 1024.0 * 1024.0 * 1024.0);
        f("2T", 2.0 * 1000.0 * 1000.0 * 1000.0 * 1000.0);
        f("2.3tb", 2.3 * 1000.0 * 1000.0 * 1000.0 * 1000.0);
        f("3tI", 3.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0);
        f("4.5TIB", 4.5 * 1024.0 * 1024.0 * 1024.0 * 1024.0);
    }

    #[test_case("")]
    #[test_case("0xqwert")]
    #[test_case("foobar")]
    #[test_case("234.foobar")]
    #[test_case("123e")]
    #[test_case("1233Ebc")]
    #[test_case("12.34E+abc")]
    #[test_case("12.34e-")]
    #[test_case("12.weKB")]
    fn test_parse_positive_number_failure(s: &str) {
        assert!(parse_positive_number(s).is_err(), "expecting error for {s}");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("2k").unwrap(), 2000.0);
        assert_eq!(parse_number("3Ki").unwrap(), 3072.0);
        assert_eq!(parse_number("4.5GiB").unwrap(), 4.5 * 1024.0 * 1024.0 * 1024.0);
        assert_eq!(parse_number("-0x3b").unwrap(), -59.0);
        assert_eq!(parse_number("+12").unwrap(), 12.0);
    }

    #[test_case("", false)]
    #[test_case("1", false)]
    #[test_case("0", false)]
    #[test_case("03", true)]
    #[test_case("0o1", true)]
    #[test_case("0O12", true)]
    #[test_case("0b1110", true)]
    #[test_case("0B0", true)]
    #[test_case("0x1ffa", true)]
    #[test_case("0X4", true)]
    fn test_is_special_integer_prefix(s: &str, expected: bool) {
        assert_eq!(is_special_integer_prefix(s), expected, "is_special_integer_prefix({s})");
    }
}
