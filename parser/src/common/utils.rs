use std::fmt;
use std::fmt::{Display, Formatter, Write};

use crate::lexer::append_escaped_ident;

/// Formats `value` the way `%g` does with the shortest precision: plain notation for
/// exponents in `[-4, 6)` and `d.ddde±XX` otherwise. Infinities carry an explicit sign.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        };
    }
    if value == 0.0 {
        return if value.is_sign_negative() {
            "-0".to_string()
        } else {
            "0".to_string()
        };
    }
    // `{:e}` yields the shortest round-trip digits, e.g. `1.23e9` or `-5e-7`
    let sci = format!("{value:e}");
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    if (-4..6).contains(&exp) {
        return format!("{value}");
    }
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exp.abs())
}

pub(crate) fn write_comma_separated<T: Display>(
    values: impl Iterator<Item = T>,
    f: &mut Formatter,
    use_parens: bool,
) -> Result<(), fmt::Error> {
    if use_parens {
        write!(f, "(")?;
    }
    for (i, arg) in values.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", arg)?;
    }
    if use_parens {
        write!(f, ")")?;
    }
    Ok(())
}

/// Writes a parenthesized label list, i.e. `(job,instance)`.
pub(crate) fn write_label_list<S: AsRef<str>>(labels: &[S], f: &mut Formatter) -> fmt::Result {
    let mut buf = String::with_capacity(2 + labels.len() * 8);
    buf.push('(');
    for (i, label) in labels.iter().enumerate() {
        if i > 0 {
            buf.push(',');
        }
        append_escaped_ident(&mut buf, label.as_ref());
    }
    buf.push(')');
    f.write_str(&buf)
}

pub fn join_vector<T: Display>(v: &[T], sep: &str) -> String {
    let mut s = String::new();
    for (i, item) in v.iter().enumerate() {
        if i > 0 {
            s.push_str(sep);
        }
        let _ = write!(s, "{item}");
    }
    s
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(0.0, "0")]
    #[test_case(1.0, "1")]
    #[test_case(-1.0, "-1")]
    #[test_case(3.5, "3.5")]
    #[test_case(256.5, "256.5")]
    #[test_case(770.0, "770")]
    #[test_case(-59.0, "-59")]
    #[test_case(-0.2, "-0.2")]
    #[test_case(-0.002, "-0.002")]
    #[test_case(0.0001, "0.0001")]
    #[test_case(0.00001, "1e-05")]
    #[test_case(123456.0, "123456")]
    #[test_case(1e6, "1e+06")]
    #[test_case(-1.23e9, "-1.23e+09")]
    #[test_case(1.2e45, "1.2e+45")]
    #[test_case(-1.2e-45, "-1.2e-45")]
    #[test_case(f64::INFINITY, "+Inf")]
    #[test_case(f64::NEG_INFINITY, "-Inf")]
    #[test_case(f64::NAN, "NaN")]
    fn test_format_number(value: f64, expected: &str) {
        assert_eq!(format_number(value), expected);
    }

    #[test]
    fn test_join_vector() {
        assert_eq!(join_vector(&["a", "b", "c"], ","), "a,b,c");
        assert_eq!(join_vector::<&str>(&[], ","), "");
    }
}
