use std::fmt;
use std::fmt::Display;

use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug, PartialEq, Eq, Clone, Error)]
pub enum ParseError {
    #[error("Duplicate argument `{0}`")]
    DuplicateArgument(String),
    #[error("Unexpected end of text")]
    UnexpectedEOF,
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),
    #[error("Expected number: found `{0}`")]
    InvalidNumber(String),
    #[error(transparent)]
    InvalidArgCount(ArgCountError),
    #[error("Error expanding WITH expression: {0}")]
    WithExprExpansionError(String),
    #[error("Syntax Error: {0}")]
    SyntaxError(String),
    #[error("{0}")]
    General(String),
    #[error("Invalid regex: {0}")]
    InvalidRegex(String),
    #[error("Unknown function {0}")]
    InvalidFunction(String),
    #[error("{0}")]
    Unsupported(String),
}

/// Creates a syntax error complaining about an unexpected token.
/// `tail` is the part of the query which has not been parsed yet.
pub(crate) fn unexpected(context: &str, actual: &str, expected: &str, tail: &str) -> ParseError {
    let mut msg = String::with_capacity(64 + context.len() + expected.len() + tail.len());
    msg.push_str(context);
    msg.push_str(": unexpected ");
    if actual.is_empty() {
        msg.push_str("end of input");
    } else {
        msg.push_str(&format!("token {actual:?}"));
    }
    if !expected.is_empty() {
        msg.push_str("; want ");
        msg.push_str(expected);
    }
    if !tail.is_empty() {
        msg.push_str(&format!("; unparsed data: {tail:?}"));
    }
    ParseError::SyntaxError(msg)
}

/// Occurs when a WITH template is called with the wrong number of arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ArgCountError {
    signature: String,
    expected: usize,
    actual: usize,
}

impl ArgCountError {
    /// Create a new instance of the error
    ///
    /// # Arguments
    /// * `signature` - Template call signature
    /// * `expected` - Number of formal parameters
    /// * `actual` - Number of passed arguments
    pub fn new(signature: &str, expected: usize, actual: usize) -> Self {
        Self {
            signature: signature.to_string(),
            expected,
            actual,
        }
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn actual(&self) -> usize {
        self.actual
    }
}

impl Display for ArgCountError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: expected {} args; got {} args",
            self.signature, self.expected, self.actual
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_message() {
        let err = unexpected("metric", "$", r#""{""#, "$ + 1");
        assert_eq!(
            err.to_string(),
            r#"Syntax Error: metric: unexpected token "$"; want "{"; unparsed data: "$ + 1""#
        );
        let err = unexpected("aggregate", "", "", "");
        assert_eq!(
            err.to_string(),
            "Syntax Error: aggregate: unexpected end of input"
        );
    }

    #[test]
    fn test_arg_count_message() {
        let err = ParseError::InvalidArgCount(ArgCountError::new("f(a, b)", 2, 3));
        assert_eq!(err.to_string(), "f(a, b): expected 2 args; got 3 args");
    }
}
