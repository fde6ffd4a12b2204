use std::cmp::Ordering;
use std::fmt;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use metricsql_common::regex_util::compile_regexp_anchored;

use crate::lexer::{escape_ident, quote};
use crate::parser::{ParseError, ParseResult};

pub const NAME_LABEL: &str = "__name__";
pub type LabelName = String;

pub type LabelValue = String;

#[derive(
    Default, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Copy, Hash, Serialize, Deserialize,
)]
pub enum LabelFilterOp {
    #[default]
    Equal,
    NotEqual,
    RegexEqual,
    RegexNotEqual,
}

impl LabelFilterOp {
    pub fn new(is_regexp: bool, is_negative: bool) -> Self {
        match (is_regexp, is_negative) {
            (false, false) => LabelFilterOp::Equal,
            (false, true) => LabelFilterOp::NotEqual,
            (true, false) => LabelFilterOp::RegexEqual,
            (true, true) => LabelFilterOp::RegexNotEqual,
        }
    }

    pub fn is_negative(&self) -> bool {
        matches!(self, LabelFilterOp::NotEqual | LabelFilterOp::RegexNotEqual)
    }

    pub fn is_regex(&self) -> bool {
        matches!(
            self,
            LabelFilterOp::RegexEqual | LabelFilterOp::RegexNotEqual
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LabelFilterOp::Equal => "=",
            LabelFilterOp::NotEqual => "!=",
            LabelFilterOp::RegexEqual => "=~",
            LabelFilterOp::RegexNotEqual => "!~",
        }
    }
}

impl TryFrom<&str> for LabelFilterOp {
    type Error = ParseError;

    fn try_from(op: &str) -> Result<Self, Self::Error> {
        match op {
            "=" => Ok(LabelFilterOp::Equal),
            "!=" => Ok(LabelFilterOp::NotEqual),
            "=~" => Ok(LabelFilterOp::RegexEqual),
            "!~" => Ok(LabelFilterOp::RegexNotEqual),
            _ => Err(ParseError::General(format!(
                "Unexpected match op literal: {op}"
            ))),
        }
    }
}

impl fmt::Display for LabelFilterOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// LabelFilter represents MetricsQL label filter like `foo="bar"`.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelFilter {
    pub op: LabelFilterOp,

    /// label contains label name for the filter.
    pub label: String,

    /// value contains unquoted value for the filter.
    pub value: String,
}

impl LabelFilter {
    /// Creates a filter, verifying that regexp values compile.
    pub fn new<N, V>(match_op: LabelFilterOp, label: N, value: V) -> ParseResult<Self>
    where
        N: Into<LabelName>,
        V: Into<LabelValue>,
    {
        let filter = Self {
            label: label.into(),
            op: match_op,
            value: value.into(),
        };
        filter.validate()?;
        Ok(filter)
    }

    pub fn equal<S: Into<String>>(key: S, value: S) -> Self {
        LabelFilter {
            op: LabelFilterOp::Equal,
            label: key.into(),
            value: value.into(),
        }
    }

    pub fn not_equal<S: Into<String>>(key: S, value: S) -> Self {
        LabelFilter {
            op: LabelFilterOp::NotEqual,
            label: key.into(),
            value: value.into(),
        }
    }

    pub fn regex_equal<S: Into<String>>(key: S, value: S) -> ParseResult<LabelFilter> {
        LabelFilter::new(LabelFilterOp::RegexEqual, key, value)
    }

    pub fn regex_notequal<S: Into<String>>(key: S, value: S) -> ParseResult<LabelFilter> {
        LabelFilter::new(LabelFilterOp::RegexNotEqual, key, value)
    }

    /// is_regexp represents whether the filter is regexp, i.e. `=~` or `!~`.
    pub fn is_regexp(&self) -> bool {
        self.op.is_regex()
    }

    /// is_negative represents whether the filter is negative, i.e. '!=' or '!~'.
    pub fn is_negative(&self) -> bool {
        self.op.is_negative()
    }

    pub fn is_metric_name_filter(&self) -> bool {
        self.label == NAME_LABEL && self.op == LabelFilterOp::Equal
    }

    /// Regexp filters must compile once anchored, i.e. `^(?:value)$`.
    pub fn validate(&self) -> ParseResult<()> {
        if !self.is_regexp() {
            return Ok(());
        }
        let converted = try_escape_for_repeat_re(&self.value);
        compile_regexp_anchored(&converted)
            .map(|_| ())
            .map_err(|e| ParseError::InvalidRegex(format!("{}: {e}", self.value)))
    }
}

impl PartialOrd for LabelFilter {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LabelFilter {
    fn cmp(&self, other: &Self) -> Ordering {
        self.label
            .cmp(&other.label)
            .then_with(|| self.value.cmp(&other.value))
            .then_with(|| self.op.cmp(&other.op))
    }
}

impl fmt::Display for LabelFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            escape_ident(&self.label),
            self.op,
            quote(&self.value)
        )
    }
}

/// Removes repeated `(label, op, value)` filters, keeping the first occurrence.
pub fn remove_duplicate_label_filters(filters: &mut Vec<LabelFilter>) {
    if filters.len() < 2 {
        return;
    }
    let mut seen: AHashSet<(String, LabelFilterOp, String)> =
        AHashSet::with_capacity(filters.len());
    filters.retain(|lf| seen.insert((lf.label.clone(), lf.op, lf.value.clone())));
}

/// Sorts filters by label and value, keeping `__name__` filters in front.
pub fn sort_label_filters(filters: &mut [LabelFilter]) {
    filters.sort_by(|a, b| {
        let a_name = a.label == NAME_LABEL;
        let b_name = b.label == NAME_LABEL;
        b_name.cmp(&a_name).then_with(|| a.cmp(b))
    });
}

/// Go and Rust handle the repeat pattern differently
/// in Go the following is valid: `aaa{bbb}ccc`
/// in Rust {bbb} is seen as an invalid repeat and must be escaped \{bbb}
/// This escapes the opening "{" if it's not followed by valid repeat pattern (e.g. 4,6).
pub fn try_escape_for_repeat_re(re: &str) -> String {
    fn is_repeat(chars: &mut std::str::Chars<'_>) -> (bool, String) {
        let mut buf = String::new();
        let mut comma_seen = false;
        for c in chars.by_ref() {
            buf.push(c);
            match c {
                // `,,` and `{,` are invalid
                ',' if comma_seen || buf == "," => return (false, buf),
                ',' => comma_seen = true,
                // `{}` is invalid
                '}' => return (buf != "}", buf),
                _ if c.is_ascii_digit() => continue,
                _ => return (false, buf),
            }
        }
        (false, buf)
    }

    let mut result = String::with_capacity(re.len() + 1);
    let mut chars = re.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                result.push(c);
                if let Some(cc) = chars.next() {
                    result.push(cc);
                }
            }
            '{' => {
                let (is, s) = is_repeat(&mut chars);
                if !is {
                    result.push('\\');
                }
                result.push(c);
                result.push_str(&s);
            }
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_filter_op_flags() {
        assert_eq!(LabelFilterOp::new(false, false), LabelFilterOp::Equal);
        assert_eq!(LabelFilterOp::new(false, true), LabelFilterOp::NotEqual);
        assert_eq!(LabelFilterOp::new(true, false), LabelFilterOp::RegexEqual);
        assert_eq!(LabelFilterOp::new(true, true), LabelFilterOp::RegexNotEqual);
        assert!(LabelFilterOp::RegexNotEqual.is_negative());
        assert!(LabelFilterOp::RegexNotEqual.is_regex());
        assert!(!LabelFilterOp::NotEqual.is_regex());
    }

    #[test]
    fn test_eq_matcher_equality() {
        assert_eq!(
            LabelFilter::equal("code", "200"),
            LabelFilter::equal("code", "200")
        );

        assert_ne!(
            LabelFilter::equal("code", "200"),
            LabelFilter::equal("code", "201")
        );

        assert_ne!(
            LabelFilter::equal("code", "200"),
            LabelFilter::not_equal("code", "200")
        );
    }

    #[test]
    fn test_re_matcher_equality() {
        assert_eq!(
            LabelFilter::regex_equal("code", "2??"),
            LabelFilter::regex_equal("code", "2??")
        );

        assert_ne!(
            LabelFilter::regex_equal("code", "2??"),
            LabelFilter::regex_equal("code", "2*?")
        );

        assert_ne!(
            LabelFilter::regex_equal("code", "2??").unwrap(),
            LabelFilter::equal("code", "2??")
        );
    }

    #[test]
    fn test_invalid_regex() {
        assert!(LabelFilter::regex_equal("foo", "x[").is_err());
        assert!(LabelFilter::regex_notequal("foo", "x(").is_err());
        assert!(LabelFilter::regex_equal("foo", "x)").is_err());
        // equality filters are never compiled
        assert!(LabelFilter::new(LabelFilterOp::Equal, "foo", "x[").is_ok());
        // Go-style literal braces
        assert!(LabelFilter::regex_equal("foo", "a{bbb}c").is_ok());
    }

    #[test]
    fn test_display() {
        assert_eq!(LabelFilter::equal("foo", "bar").to_string(), r#"foo="bar""#);
        assert_eq!(
            LabelFilter::regex_notequal("a-b", "x.+").unwrap().to_string(),
            r#"a\-b!~"x.+""#
        );
        assert_eq!(
            LabelFilter::not_equal("foo", "a\"b").to_string(),
            r#"foo!="a\"b""#
        );
    }

    #[test]
    fn test_remove_duplicates_keeps_first() {
        let mut filters = vec![
            LabelFilter::equal("b", "1"),
            LabelFilter::equal("a", "1"),
            LabelFilter::equal("b", "1"),
            LabelFilter::not_equal("b", "1"),
            LabelFilter::equal("a", "2"),
        ];
        remove_duplicate_label_filters(&mut filters);
        assert_eq!(
            filters,
            vec![
                LabelFilter::equal("b", "1"),
                LabelFilter::equal("a", "1"),
                LabelFilter::not_equal("b", "1"),
                LabelFilter::equal("a", "2"),
            ]
        );
    }

    #[test]
    fn test_sort_filters_name_first() {
        let mut filters = vec![
            LabelFilter::equal("b", "1"),
            LabelFilter::equal("B", "1"),
            LabelFilter::equal(NAME_LABEL, "foo"),
            LabelFilter::regex_equal("a", "x").unwrap(),
            LabelFilter::equal("a", "x"),
        ];
        sort_label_filters(&mut filters);
        let rendered: Vec<String> = filters.iter().map(|x| x.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                r#"__name__="foo""#,
                r#"B="1""#,
                r#"a="x""#,
                r#"a=~"x""#,
                r#"b="1""#
            ]
        );
    }

    #[test]
    fn test_convert_re() {
        assert_eq!(try_escape_for_repeat_re("abc{}"), r"abc\{}");
        assert_eq!(try_escape_for_repeat_re("abc{def}"), r"abc\{def}");
        assert_eq!(try_escape_for_repeat_re("abc{def"), r"abc\{def");
        assert_eq!(try_escape_for_repeat_re("abc{1}"), "abc{1}");
        assert_eq!(try_escape_for_repeat_re("abc{1,}"), "abc{1,}");
        assert_eq!(try_escape_for_repeat_re("abc{1,2}"), "abc{1,2}");
        assert_eq!(try_escape_for_repeat_re("abc{,2}"), r"abc\{,2}");
        assert_eq!(try_escape_for_repeat_re("abc{{1,2}}"), r"abc\{{1,2}}");
        assert_eq!(try_escape_for_repeat_re(r"abc\{abc"), r"abc\{abc");
        assert_eq!(try_escape_for_repeat_re("abc{1a}"), r"abc\{1a}");
        assert_eq!(try_escape_for_repeat_re("abc{1,a}"), r"abc\{1,a}");
        assert_eq!(try_escape_for_repeat_re("abc{1,2a}"), r"abc\{1,2a}");
        assert_eq!(try_escape_for_repeat_re("abc{1,2,3}"), r"abc\{1,2,3}");
        assert_eq!(try_escape_for_repeat_re("abc{1,,2}"), r"abc\{1,,2}");
    }
}
