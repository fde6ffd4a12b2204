use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::StringExpr;
use crate::label::{LabelFilter, LabelFilterOp, LabelName, NAME_LABEL};
use crate::lexer::escape_ident;
use crate::parser::{ParseError, ParseResult};

/// LabelFilterExpr represents `foo <op> ident + "bar"` expression, where <op> is `=`, `!=`, `=~` or `!~`.
/// For internal use only, in the context of WITH expressions
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelFilterExpr {
    pub op: LabelFilterOp,

    /// Label contains label name for the filter. For a splice it holds the template name.
    pub label: String,

    /// Value contains unquoted value for the filter.
    pub value: StringExpr,

    is_variable: bool,
}

impl LabelFilterExpr {
    /// Creates a filter expression. Literal regexp values are validated right away.
    pub fn new<N>(label: N, match_op: LabelFilterOp, value: StringExpr) -> ParseResult<Self>
    where
        N: Into<LabelName>,
    {
        let res = Self {
            label: label.into(),
            op: match_op,
            value,
            is_variable: false,
        };
        if res.op.is_regex() {
            if let Some(value) = res.value.get_literal() {
                LabelFilter::new(res.op, res.label.as_str(), value)?;
            }
        }
        Ok(res)
    }

    pub fn named(name: &str) -> Self {
        Self {
            label: NAME_LABEL.to_string(),
            op: LabelFilterOp::Equal,
            value: StringExpr::new(name),
            is_variable: false,
        }
    }

    /// A bare identifier inside braces, i.e. `x` in `{x, a="b"}`. It is replaced
    /// by the filters of the template named `name` during WITH expansion.
    pub(crate) fn variable(name: &str) -> Self {
        Self {
            label: name.to_string(),
            op: LabelFilterOp::Equal,
            value: StringExpr::default(),
            is_variable: true,
        }
    }

    pub fn is_negative(&self) -> bool {
        self.op.is_negative()
    }

    pub fn is_regexp(&self) -> bool {
        self.op.is_regex()
    }

    pub fn is_metric_name_filter(&self) -> bool {
        !self.is_variable && self.label == NAME_LABEL && self.op == LabelFilterOp::Equal
    }

    pub fn is_variable(&self) -> bool {
        self.is_variable
    }

    /// Returns true if the filter can be converted into a [`LabelFilter`] without expansion.
    pub fn is_resolved(&self) -> bool {
        !self.is_variable && self.value.is_literal_only()
    }

    pub fn to_label_filter(&self) -> ParseResult<LabelFilter> {
        if self.is_variable {
            return Err(ParseError::WithExprExpansionError(format!(
                "cannot convert label filter splice {} to a label filter",
                escape_ident(&self.label)
            )));
        }
        match self.value.get_literal() {
            Some(value) => LabelFilter::new(self.op, self.label.as_str(), value),
            None => Err(ParseError::WithExprExpansionError(format!(
                "unresolved label filter value in {self}"
            ))),
        }
    }
}

impl From<LabelFilter> for LabelFilterExpr {
    fn from(lf: LabelFilter) -> Self {
        Self {
            op: lf.op,
            label: lf.label,
            value: StringExpr::new(lf.value),
            is_variable: false,
        }
    }
}

impl fmt::Display for LabelFilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_variable {
            return write!(f, "{}", escape_ident(&self.label));
        }
        write!(f, "{}{}{}", escape_ident(&self.label), self.op, &self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let mut value = StringExpr::new("a");
        value.push_ident("x");
        let lfe = LabelFilterExpr::new("foo", LabelFilterOp::RegexEqual, value).unwrap();
        assert_eq!(lfe.to_string(), r#"foo=~"a" + x"#);
        assert!(!lfe.is_resolved());
        assert!(lfe.to_label_filter().is_err());

        let splice = LabelFilterExpr::variable("x");
        assert!(splice.is_variable());
        assert!(!splice.is_metric_name_filter());
        assert_eq!(splice.to_string(), "x");
    }

    #[test]
    fn test_invalid_regex_literal() {
        let res = LabelFilterExpr::new("foo", LabelFilterOp::RegexEqual, StringExpr::new("a("));
        assert!(matches!(res, Err(ParseError::InvalidRegex(_))));
    }

    #[test]
    fn test_to_label_filter() {
        let lfe =
            LabelFilterExpr::new("foo", LabelFilterOp::NotEqual, StringExpr::new("bar")).unwrap();
        assert_eq!(
            lfe.to_label_filter().unwrap(),
            LabelFilter::not_equal("foo", "bar")
        );
    }
}
