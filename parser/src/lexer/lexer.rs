use crate::lexer::duration::scan_duration;
use crate::lexer::number::scan_positive_number;
use crate::lexer::utils::{
    is_ident_prefix, is_positive_number_prefix, is_space_char, is_string_prefix, scan_ident,
    scan_string,
};
use crate::parser::{ParseError, ParseResult};

/// Binary operator symbols ordered so that the longest match wins.
const BINARY_OP_SYMBOLS: [&str; 12] = ["==", "!=", ">=", "<=", "+", "-", "*", "/", "%", "^", ">", "<"];

/// Lexer turns MetricsQL text into a stream of tokens.
///
/// The current token is kept in `token`. An empty token means the end of input.
/// `prev` moves the cursor one token back, so the parser can look ahead and backtrack.
#[derive(Debug, Clone, Default)]
pub struct Lexer<'a> {
    pub token: &'a str,
    prev_tokens: Vec<&'a str>,
    next_tokens: Vec<&'a str>,
    s_tail: &'a str,
    err: Option<ParseError>,
}

impl<'a> Lexer<'a> {
    pub fn new(s: &'a str) -> Self {
        Self {
            token: "",
            prev_tokens: Vec::new(),
            next_tokens: Vec::new(),
            s_tail: s,
            err: None,
        }
    }

    /// Advances to the next token. Once an error is returned, all subsequent calls return it too.
    pub fn next(&mut self) -> ParseResult<()> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        self.prev_tokens.push(self.token);
        if let Some(token) = self.next_tokens.pop() {
            self.token = token;
            return Ok(());
        }
        match self.scan() {
            Ok(token) => {
                self.token = token;
                Ok(())
            }
            Err(err) => {
                self.err = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Moves back to the previous token. Does nothing at the start of input.
    pub fn prev(&mut self) {
        let Some(token) = self.prev_tokens.pop() else {
            return;
        };
        self.next_tokens.push(self.token);
        self.token = token;
    }

    pub fn is_eof(&self) -> bool {
        is_eof(self.token)
    }

    /// Returns the part of the input which has not been scanned yet.
    pub fn tail(&self) -> &'a str {
        self.s_tail
    }

    fn scan(&mut self) -> ParseResult<&'a str> {
        loop {
            let s = self.s_tail.trim_start_matches(|ch: char| ch.is_ascii() && is_space_char(ch as u8));
            self.s_tail = s;
            let Some(first) = s.as_bytes().first() else {
                return Ok("");
            };
            if *first == b'#' {
                // skip the comment till the end of line
                match s.find('\n') {
                    Some(n) => {
                        self.s_tail = &s[n + 1..];
                        continue;
                    }
                    None => {
                        self.s_tail = "";
                        return Ok("");
                    }
                }
            }
            let token = scan_token(s)?;
            self.s_tail = &s[token.len()..];
            return Ok(token);
        }
    }
}

fn scan_token(s: &str) -> ParseResult<&str> {
    if matches!(
        s.as_bytes()[0],
        b'{' | b'}' | b'[' | b']' | b'(' | b')' | b',' | b'@'
    ) {
        return Ok(&s[..1]);
    }
    if is_ident_prefix(s) {
        let token = scan_ident(s);
        if token.is_empty() {
            return Err(ParseError::SyntaxError(format!(
                "cannot parse identifier at {s}"
            )));
        }
        return Ok(token);
    }
    if is_string_prefix(s) {
        return scan_string(s);
    }
    let n = scan_binary_op_prefix(s);
    if n > 0 {
        return Ok(&s[..n]);
    }
    let n = scan_label_filter_op_prefix(s);
    if n > 0 {
        return Ok(&s[..n]);
    }
    let n = scan_duration(s);
    if n > 0 {
        return Ok(&s[..n as usize]);
    }
    if is_positive_number_prefix(s) {
        return scan_positive_number(s)
            .map_err(|e| ParseError::SyntaxError(format!("cannot parse number: {e}")));
    }
    Err(ParseError::SyntaxError(format!("cannot recognize {s}")))
}

fn scan_binary_op_prefix(s: &str) -> usize {
    BINARY_OP_SYMBOLS
        .iter()
        .find(|op| s.starts_with(*op))
        .map_or(0, |op| op.len())
}

fn scan_label_filter_op_prefix(s: &str) -> usize {
    if s.starts_with("=~") || s.starts_with("!~") {
        return 2;
    }
    if s.starts_with('=') {
        return 1;
    }
    0
}

pub(crate) fn is_eof(s: &str) -> bool {
    s.is_empty()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn tokens(s: &str) -> ParseResult<Vec<&str>> {
        let mut lex = Lexer::new(s);
        let mut tokens = Vec::new();
        loop {
            lex.next()?;
            if lex.is_eof() {
                return Ok(tokens);
            }
            tokens.push(lex.token);
        }
    }

    #[test]
    fn test_lexer_next_prev() {
        let mut lex = Lexer::new("foo bar baz");
        assert_eq!(lex.token, "");
        lex.next().unwrap();
        assert_eq!(lex.token, "foo");

        // rewind before the first item
        lex.prev();
        assert_eq!(lex.token, "");
        lex.next().unwrap();
        assert_eq!(lex.token, "foo");
        lex.next().unwrap();
        assert_eq!(lex.token, "bar");

        // rewind to the first item
        lex.prev();
        assert_eq!(lex.token, "foo");
        lex.next().unwrap();
        assert_eq!(lex.token, "bar");
        lex.next().unwrap();
        assert_eq!(lex.token, "baz");

        // go beyond the token stream
        lex.next().unwrap();
        assert_eq!(lex.token, "");
        assert!(lex.is_eof());
        lex.prev();
        assert_eq!(lex.token, "baz");

        // go multiple times beyond the token stream
        lex.next().unwrap();
        assert!(lex.is_eof());
        lex.next().unwrap();
        assert!(lex.is_eof());
        lex.prev();
        assert!(lex.is_eof());
    }

    #[test]
    fn test_prev_at_start() {
        let mut lex = Lexer::new("foo");
        lex.prev();
        assert_eq!(lex.token, "");
        lex.next().unwrap();
        assert_eq!(lex.token, "foo");
    }

    #[test]
    fn test_lexer_success() {
        fn f(s: &str, expected: &[&str]) {
            let tokens = tokens(s).expect("unexpected lexer error");
            assert_eq!(tokens, expected, "unexpected tokens for {s}");
        }

        // an empty string
        f("", &[]);
        // string with whitespace
        f("  \n\t\r ", &[]);
        // just metric name
        f("metric", &["metric"]);
        // metric name with special chars
        f(":foo.bar_", &[":foo.bar_"]);
        // metric name with window
        f("metric[5m]  ", &["metric", "[", "5m", "]"]);
        // metric name with tag filters
        f(
            r#"  metric:12.34{a="foo", b != "bar", c=~ "x.+y", d !~ "zzz"}"#,
            &[
                "metric:12.34", "{", "a", "=", r#""foo""#, ",", "b", "!=", r#""bar""#, ",", "c",
                "=~", r#""x.+y""#, ",", "d", "!~", r#""zzz""#, "}",
            ],
        );
        // metric name with offset
        f("   metric offset 10d   ", &["metric", "offset", "10d"]);
        // func call
        f(
            r#"sum  (  metric{x="y"  }  [5m] offset 10h)"#,
            &[
                "sum", "(", "metric", "{", "x", "=", r#""y""#, "}", "[", "5m", "]", "offset", "10h",
                ")",
            ],
        );
        // binary op
        f(
            "a+b or c % d and e unless f",
            &["a", "+", "b", "or", "c", "%", "d", "and", "e", "unless", "f"],
        );
        // numbers
        f(
            "3+1.2-.23+4.5e5-78e-6+1.24e+45-NaN+Inf",
            &[
                "3", "+", "1.2", "-", ".23", "+", "4.5e5", "-", "78e-6", "+", "1.24e+45", "-", "NaN",
                "+", "Inf",
            ],
        );
        f(
            "12.34 * 0X34 + 0b11 + 0O77",
            &["12.34", "*", "0X34", "+", "0b11", "+", "0O77"],
        );
        // strings
        f(
            r#"""''``"\\"  '\\'  "\"" '\''"\\\"\\""#,
            &[
                r#""""#,
                "''",
                "``",
                r#""\\""#,
                r"'\\'",
                r#""\"""#,
                r"'\''",
                r#""\\\"\\""#,
            ],
        );
        // durations
        f("m offset 123h", &["m", "offset", "123h"]);
        f(
            "m offset -1.23w-5h34.5m - 123",
            &["m", "offset", "-", "1.23w-5h34.5m", "-", "123"],
        );
        f("   `foo\\\\\\`бар`  ", &["`foo\\\\\\`бар`"]);
        // comments
        f(
            "# comment # sdf
		foobar # comment
		baz
		# yet another comment",
            &["foobar", "baz"],
        );
        // subquery step
        f("m[5m:3s]", &["m", "[", "5m", ":3s", "]"]);
        f("m[:]", &["m", "[", ":", "]"]);
    }

    #[test]
    fn test_lexer_error() {
        fn f(s: &str) {
            let mut lex = Lexer::new(s);
            loop {
                if lex.next().is_err() {
                    break;
                }
                assert!(!lex.is_eof(), "expecting error during scanning {s}");
            }
            // the error sticks
            assert!(lex.next().is_err(), "expecting non-nil error for {s}");
        }

        // invalid identifier
        f(".foo");

        // incomplete string
        f(r#""foobar"#);
        f("'");
        f("`");

        // invalid numbers
        f(".");
        f("12e");
        f("1.2e");
        f("1.2E+");
        f("1.2E-");

        // unknown char
        f("foo $");
        f("!");
    }
}
