use crate::parser::{ParseError, ParseResult};

/// Returns positive duration in milliseconds for the given s and the given step.
///
/// Duration in s may be combined, i.e. 2h5m or 2h-5m.
///
/// Error is returned if the duration in s is negative.
pub fn positive_duration_value(s: &str, step: i64) -> ParseResult<i64> {
    let d = duration_value(s, step)?;
    if d < 0 {
        return Err(ParseError::InvalidDuration(format!(
            "duration cannot be negative; got {s}"
        )));
    }
    Ok(d)
}

/// Returns the duration in milliseconds for the given s and the given step.
///
/// Duration in s may be combined, i.e. 2h5m, -2h5m or 2h-5m.
///
/// The returned duration value can be negative.
pub fn duration_value(s: &str, step: i64) -> ParseResult<i64> {
    if s.is_empty() {
        return Err(ParseError::InvalidDuration(
            "duration cannot be empty".to_string(),
        ));
    }
    // try parsing floating-point duration in seconds
    if let Ok(d) = s.parse::<f64>() {
        return Ok((d * 1000.0) as i64);
    }

    let mut is_minus = false;
    let mut d = 0.0;
    let mut cursor = s;
    while !cursor.is_empty() {
        let n = scan_single_duration(cursor, true);
        if n <= 0 {
            return Err(ParseError::InvalidDuration(format!(
                "cannot parse duration {s}"
            )));
        }
        let n = n as usize;
        let mut part = parse_single_duration(&cursor[..n], step)?;
        if is_minus && part > 0.0 {
            part = -part;
        }
        d += part;
        if part < 0.0 {
            is_minus = true;
        }
        cursor = &cursor[n..];
    }
    if d.abs() > i64::MAX as f64 {
        return Err(ParseError::InvalidDuration(format!(
            "too big duration {d}ms"
        )));
    }
    Ok(d as i64)
}

fn parse_single_duration(s: &str, step: i64) -> ParseResult<f64> {
    let lower = s.to_ascii_lowercase();
    let mut num_part = &lower[..lower.len() - 1];
    if let Some(stripped) = num_part.strip_suffix('m') {
        // duration in ms
        num_part = stripped;
    }
    let f = num_part
        .parse::<f64>()
        .map_err(|_| ParseError::InvalidDuration(format!("cannot parse duration {s}")))?;
    let mp = match &lower[num_part.len()..] {
        "ms" => 1e-3,
        "s" => 1.0,
        "m" => 60.0,
        "h" => 60.0 * 60.0,
        "d" => 24.0 * 60.0 * 60.0,
        "w" => 7.0 * 24.0 * 60.0 * 60.0,
        "y" => 365.0 * 24.0 * 60.0 * 60.0,
        "i" => step as f64 / 1e3,
        _ => {
            return Err(ParseError::InvalidDuration(format!(
                "invalid duration suffix in {s}"
            )))
        }
    };
    Ok(mp * f * 1e3)
}

/// Returns true if s contains nothing but a non-negative duration.
pub(crate) fn is_positive_duration(s: &str) -> bool {
    let n = scan_duration(s);
    n > 0 && n as usize == s.len()
}

/// Scans duration, which must start with positive num.
///
/// I.e. 123h, 3h5m or 3.4d-35.66s
pub(crate) fn scan_duration(s: &str) -> i32 {
    // the first part must be non-negative
    let n = scan_single_duration(s, false);
    if n <= 0 {
        return -1;
    }
    let mut i = n as usize;
    loop {
        // other parts may be negative
        let n = scan_single_duration(&s[i..], true);
        if n <= 0 {
            return i as i32;
        }
        i += n as usize;
    }
}

fn scan_single_duration(s: &str, can_be_negative: bool) -> i32 {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return -1;
    }
    let mut i = 0;
    if bytes[0] == b'-' && can_be_negative {
        i += 1;
    }
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == 0 || i == bytes.len() {
        return -1;
    }
    if bytes[i] == b'.' {
        // the fractional part may be empty: `3.h`
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == bytes.len() {
            return -1;
        }
    }
    match bytes[i] {
        b'm' | b'M' => {
            if i + 1 < bytes.len() {
                match bytes[i + 1] {
                    b's' | b'S' => return (i + 2) as i32,
                    // `Mi` and `MB` are number multipliers
                    b'i' | b'I' | b'b' | b'B' => return -1,
                    _ => {}
                }
            }
            // big `M` means 1e6 multiplier
            if bytes[i] == b'M' {
                return -1;
            }
            (i + 1) as i32
        }
        b's' | b'S' | b'h' | b'H' | b'd' | b'D' | b'w' | b'W' | b'y' | b'Y' | b'i' | b'I' => {
            (i + 1) as i32
        }
        _ => -1,
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("", false)]
    #[test_case("foo", false)]
    #[test_case("m", false)]
    #[test_case("1.", false)]
    #[test_case("1.23", false)]
    #[test_case("1.23M", false)]
    #[test_case("1Mi", false)]
    #[test_case("-1s", false)]
    #[test_case("1.2mb", false)]
    #[test_case("1s", true)]
    #[test_case("1.234h", true)]
    #[test_case("1.3ms", true)]
    #[test_case("1.3MS", true; "uppercase ms")]
    #[test_case("3m", true)]
    #[test_case("25d", true)]
    #[test_case("1h-34m12s", true)]
    #[test_case("5i", true)]
    fn test_is_positive_duration(s: &str, expected: bool) {
        assert_eq!(is_positive_duration(s), expected, "is_positive_duration({s})");
    }

    #[test]
    fn test_positive_duration_success() {
        fn f(s: &str, step: i64, expected: i64) {
            let d = positive_duration_value(s, step).expect("positive_duration_value");
            assert_eq!(d, expected, "unexpected duration for {s}");
        }

        // Integer durations
        f("123ms", 42, 123);
        f("123s", 42, 123 * 1000);
        f("123m", 42, 123 * 60 * 1000);
        f("1h", 42, 60 * 60 * 1000);
        f("2d", 42, 2 * 24 * 60 * 60 * 1000);
        f("3w", 42, 3 * 7 * 24 * 60 * 60 * 1000);
        f("4y", 42, 4 * 365 * 24 * 60 * 60 * 1000);
        f("1i", 42 * 1000, 42 * 1000);
        f("3i", 42, 3 * 42);

        // Float durations
        f("123.45ms", 42, 123);
        f("0.234s", 42, 234);
        f("1.5s", 42, 1500);
        f("1.5m", 42, 90_000);
        f("1.2h", 42, 4_320_000);
        f("1.1d", 42, 95_040_000);
        f("1.1w", 42, 665_280_000);
        f("1.3y", 42, 40_996_800_000);
        f("0.1i", 12340, 1234);

        // Floating-point durations without suffix
        f("123", 45, 123000);
        f("1.23", 45, 1230);
        f("0.56", 12, 560);
        f(".523e2", 21, 52300);

        // Duration suffixes in mixed case
        f("1Ms", 45, 1);
        f("1mS", 45, 1);
        f("1H", 45, 60 * 60 * 1000);
        f("1D", 45, 24 * 60 * 60 * 1000);
        f("1Y", 45, 365 * 24 * 60 * 60 * 1000);
    }

    #[test_case("")]
    #[test_case("foo")]
    #[test_case("m")]
    #[test_case("1.23mm")]
    #[test_case("123q")]
    #[test_case("-123s")]
    #[test_case("1.23.4434s")]
    #[test_case("1mi")]
    #[test_case("1mb")]
    #[test_case("10000000000y"; "too big")]
    #[test_case("1M"; "uppercase M is a multiplier")]
    fn test_positive_duration_error(s: &str) {
        assert!(positive_duration_value(s, 42).is_err(), "expecting error for {s}");
    }

    #[test]
    fn test_duration_success() {
        fn f(s: &str, step: i64, expected: i64) {
            let d = duration_value(s, step).expect("duration_value");
            assert_eq!(d, expected, "unexpected duration for {s}");
        }

        // Integer durations
        f("123ms", 42, 123);
        f("-123ms", 42, -123);
        f("123s", 42, 123 * 1000);
        f("-123s", 42, -123 * 1000);
        f("3i", 42, 3 * 42);
        f("-3i", 42, -3 * 42);
        f("1m34s24ms", 42, 94024);
        f("1m-34s24ms", 42, 25976);
        f("-1m34s24ms", 42, -94024);
        f("-1m-34s24ms", 42, -94024);

        // Float durations
        f("34.54ms", 42, 34);
        f("-34.34ms", 42, -34);
        f("0.234s", 42, 234);
        f("-0.234s", 42, -234);
        f("-1.3y", 42, -40_996_800_000);
        f("1.5m3.4s2.4ms", 42, 93402);
        f("-1.5m3.4s2.4ms", 42, -93402);

        // Floating-point durations without suffix
        f("123", 45, 123000);
        f("-0.56", 12, -560);
        f("-.523e2", 21, -52300);

        // Duration suffix in mixed case
        f("-1Ms", 10, -1);
        f("-2.5mS", 10, -2);
        f("-1H", 10, -60 * 60 * 1000);
        f("-3.H", 10, -3 * 60 * 60 * 1000);
        f("1D", 10, 24 * 60 * 60 * 1000);
    }

    #[test_case("")]
    #[test_case("foo")]
    #[test_case("m")]
    #[test_case("1.23mm")]
    #[test_case("123q")]
    #[test_case("-123q")]
    #[test_case("-5.3mb")]
    #[test_case("-5.3mi")]
    #[test_case("-5.3M")]
    fn test_duration_error(s: &str) {
        assert!(duration_value(s, 42).is_err(), "expecting error for {s}");
    }

    #[test_case("", -1)]
    #[test_case("1", -1)]
    #[test_case("1.", -1)]
    #[test_case("1.s", 3)]
    #[test_case("-1s", -1)]
    #[test_case("5m+3", 2)]
    #[test_case("5ms", 3)]
    #[test_case("1h2m3s4ms", 9)]
    #[test_case("5w4h-3.4m13.4ms]", 15)]
    #[test_case("3.4d-35.66s", 11)]
    fn test_scan_duration(s: &str, expected: i32) {
        assert_eq!(scan_duration(s), expected, "scan_duration({s})");
    }
}
