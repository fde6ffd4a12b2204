use crate::ast::{Expr, InterpolatedSelector};
use crate::label::{LabelFilterExpr, LabelFilterOp};
use crate::lexer::is_ident_prefix;
use crate::parser::expr::parse_string_expr;
use crate::parser::{ParseResult, Parser};

/// parse_metric_expr parses a metric.
///
///    <label_set>
///    <metric_identifier> [<label_set>]
///
/// The metric name becomes the leading `__name__` filter of every `or` group.
/// Selectors referring to WITH templates are returned as [`Expr::WithSelector`].
pub(super) fn parse_metric_expr(p: &mut Parser) -> ParseResult<Expr> {
    let mut name: Option<String> = None;
    if is_ident_prefix(p.token()) {
        name = Some(p.expect_identifier("metric")?);
        if !p.at("{") {
            let selector = InterpolatedSelector::new(name.unwrap_or_default());
            return create_metric_expr(selector);
        }
    }

    let mut groups = parse_label_filters(p)?;
    if let Some(name) = name {
        if groups.is_empty() {
            groups.push(vec![]);
        }
        for group in groups.iter_mut() {
            group.insert(0, LabelFilterExpr::named(&name));
        }
    }

    create_metric_expr(InterpolatedSelector::with_or_filters(groups))
}

fn create_metric_expr(selector: InterpolatedSelector) -> ParseResult<Expr> {
    if selector.is_resolved() {
        let me = selector.to_metric_expr()?;
        return Ok(Expr::MetricExpression(me));
    }
    Ok(Expr::WithSelector(selector))
}

fn is_or(token: &str) -> bool {
    token.eq_ignore_ascii_case("or")
}

/// parse_label_filters parses a set of label matchers.
///
/// '{' [ <label_name> <match_op> <match_string>, ... ] [or ...] '}'
///
fn parse_label_filters(p: &mut Parser) -> ParseResult<Vec<Vec<LabelFilterExpr>>> {
    p.expect("{", "label filters")?;

    let mut groups: Vec<Vec<LabelFilterExpr>> = Vec::with_capacity(1);
    if p.at("}") {
        p.bump()?;
        return Ok(groups);
    }

    let mut group = Vec::with_capacity(4);
    loop {
        group.push(parse_label_filter(p)?);

        let token = p.token();
        if token == "," {
            p.bump()?;
            if p.at("}") {
                p.bump()?;
                groups.push(group);
                return Ok(groups);
            }
            continue;
        }
        if token == "}" {
            p.bump()?;
            groups.push(group);
            return Ok(groups);
        }
        if is_or(token) {
            p.bump()?;
            if p.at("}") {
                return Err(p.syntax_error("missing label filters after `or`"));
            }
            groups.push(std::mem::take(&mut group));
            continue;
        }
        return Err(p.token_error("label filters", r#"",", "}" or "or""#));
    }
}

/// parse_label_filter parses a single label matcher.
///
///   <label_name> <match_op> <match_string> | identifier
///
fn parse_label_filter(p: &mut Parser) -> ParseResult<LabelFilterExpr> {
    let label = p.expect_identifier("label filter")?;

    let token = p.token();
    let op = match token {
        "=" => LabelFilterOp::Equal,
        "!=" => LabelFilterOp::NotEqual,
        "=~" => LabelFilterOp::RegexEqual,
        "!~" => LabelFilterOp::RegexNotEqual,
        "," | "}" => return Ok(LabelFilterExpr::variable(&label)),
        t if is_or(t) => return Ok(LabelFilterExpr::variable(&label)),
        _ => {
            return Err(p.token_error("label filter", r#""=", "!=", "=~" or "!~""#));
        }
    };

    p.bump()?;
    let value = parse_string_expr(p)?;
    LabelFilterExpr::new(label, op, value)
}
