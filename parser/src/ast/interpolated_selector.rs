use std::fmt;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ast::MetricExpr;
use crate::label::LabelFilterExpr;
use crate::lexer::escape_ident;
use crate::parser::ParseResult;

/// InterpolatedSelector represents a Vector Selector in the context of a `WITH` expression.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpolatedSelector {
    /// a list of label filter expressions from WITH clause.
    /// This is transformed into label_filters during compilation.
    pub(crate) matchers: Vec<Vec<LabelFilterExpr>>,
}

impl InterpolatedSelector {
    pub fn new<S: Into<String>>(name: S) -> InterpolatedSelector {
        let name: String = name.into();
        InterpolatedSelector {
            matchers: vec![vec![LabelFilterExpr::named(&name)]],
        }
    }

    pub fn with_or_filters(filters: Vec<Vec<LabelFilterExpr>>) -> Self {
        InterpolatedSelector { matchers: filters }
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    pub fn is_resolved(&self) -> bool {
        self.matchers
            .iter()
            .all(|x| x.iter().all(|label| label.is_resolved()))
    }

    /// Returns the metric name if every group starts with the same literal `__name__` filter.
    pub fn metric_name(&self) -> Option<String> {
        fn get_name(group: &[LabelFilterExpr]) -> Option<String> {
            match group.first() {
                Some(lf) if lf.is_metric_name_filter() => {
                    lf.value.get_literal().filter(|s| !s.is_empty())
                }
                _ => None,
            }
        }

        let (first, rest) = self.matchers.split_first()?;
        let name = get_name(first)?;
        for group in rest {
            if get_name(group).as_deref() != Some(name.as_str()) {
                return None;
            }
        }
        Some(name)
    }

    /// Converts the selector into a [`MetricExpr`]. Fails if any filter still refers to a template.
    pub fn to_metric_expr(&self) -> ParseResult<MetricExpr> {
        let mut or_matchers = Vec::with_capacity(self.matchers.len());
        for m in &self.matchers {
            let and_matchers = m
                .iter()
                .map(|l| l.to_label_filter())
                .collect::<ParseResult<Vec<_>>>()?;
            or_matchers.push(and_matchers);
        }
        Ok(MetricExpr::with_or_filters(or_matchers))
    }
}

impl From<MetricExpr> for InterpolatedSelector {
    fn from(me: MetricExpr) -> Self {
        let matchers = me
            .filters
            .into_iter()
            .map(|g| g.into_iter().map(LabelFilterExpr::from).collect())
            .collect();
        InterpolatedSelector { matchers }
    }
}

impl Display for InterpolatedSelector {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let name = self.metric_name();
        let offset = usize::from(name.is_some());
        if let Some(name) = &name {
            write!(f, "{}", escape_ident(name))?;
        }
        let groups: Vec<&[LabelFilterExpr]> = self
            .matchers
            .iter()
            .map(|g| &g[offset..])
            .filter(|g| !g.is_empty())
            .collect();
        if groups.is_empty() {
            if name.is_none() {
                write!(f, "{{}}")?;
            }
            return Ok(());
        }
        write!(f, "{{")?;
        for (i, group) in groups.iter().enumerate() {
            if i > 0 {
                write!(f, " or ")?;
            }
            for (j, filter) in group.iter().enumerate() {
                if j > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}", filter)?;
            }
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::StringExpr;
    use crate::label::{LabelFilterOp, NAME_LABEL};

    #[test]
    fn test_display_with_splice() {
        let mut value = StringExpr::new("a");
        value.push_ident("y");
        let selector = InterpolatedSelector::with_or_filters(vec![vec![
            LabelFilterExpr::named("m"),
            LabelFilterExpr::variable("x"),
            LabelFilterExpr::new("foo", LabelFilterOp::Equal, value).unwrap(),
        ]]);
        assert_eq!(selector.metric_name().as_deref(), Some("m"));
        assert!(!selector.is_resolved());
        assert_eq!(selector.to_string(), r#"m{x,foo="a" + y}"#);
        assert!(selector.to_metric_expr().is_err());
    }

    #[test]
    fn test_to_metric_expr() {
        let selector = InterpolatedSelector::new("foo");
        assert!(selector.is_resolved());
        assert_eq!(selector.to_metric_expr().unwrap(), MetricExpr::new("foo"));
        assert_eq!(NAME_LABEL, selector.matchers[0][0].label);
    }
}
