use crate::ast::{AggregateModifier, AggregationExpr, Expr};
use crate::lexer::is_ident_prefix;
use crate::parser::{ParseResult, Parser};

/// parse_aggr_func_expr parses an aggregation Expr.
///
///    <aggr_op> (<Vector_expr>) [by|without <labels>] [limit <number>]
///    <aggr_op> [by|without <labels>] (<Vector_expr>) [limit<number>]
///
pub(super) fn parse_aggr_func_expr(p: &mut Parser) -> ParseResult<Expr> {
    let name = p.expect_identifier("aggregate function")?;
    let mut ae = AggregationExpr::new(name.to_ascii_lowercase(), vec![]);

    if is_ident_prefix(p.token()) {
        if !is_aggregate_modifier(p.token()) {
            return Err(p.token_error("aggregate function", r#""by" or "without""#));
        }
        ae.modifier = Some(parse_aggregate_modifier(p)?);
    }

    if !p.at("(") {
        return Err(p.token_error("aggregate function", r#""(""#));
    }
    ae.args = p.parse_arg_list()?;

    // Verify whether func suffix exists.
    if is_aggregate_modifier(p.token()) {
        if ae.modifier.is_some() {
            return Err(p.syntax_error("duplicate aggregate modifier"));
        }
        ae.modifier = Some(parse_aggregate_modifier(p)?);
    }

    if p.at_keyword("limit") {
        ae.limit = parse_limit(p)?;
    }

    Ok(Expr::Aggregation(ae))
}

fn is_aggregate_modifier(token: &str) -> bool {
    token.eq_ignore_ascii_case("by") || token.eq_ignore_ascii_case("without")
}

fn parse_aggregate_modifier(p: &mut Parser) -> ParseResult<AggregateModifier> {
    let is_by = p.at_keyword("by");
    p.bump()?;
    let args = p.parse_ident_list(false)?;
    let res = if is_by {
        AggregateModifier::By(args)
    } else {
        AggregateModifier::Without(args)
    };
    Ok(res)
}

fn parse_limit(p: &mut Parser) -> ParseResult<usize> {
    p.bump()?;
    let limit = p.token().parse::<usize>().map_err(|_| {
        p.syntax_error(&format!(
            "LIMIT should be a positive integer; got {:?}",
            p.token()
        ))
    })?;
    p.bump()?;
    Ok(limit)
}
