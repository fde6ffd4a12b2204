use ahash::AHashSet;

use crate::ast::{Expr, WithArgExpr, WithExpr};
use crate::parser::expr::parse_expression;
use crate::parser::{ParseError, ParseResult, Parser};

/// Parses `with (name = expr, f(a, b) = expr, ...) body`.
pub(super) fn parse_with_expr(p: &mut Parser) -> ParseResult<Expr> {
    if !p.at_keyword("with") {
        return Err(p.token_error("with expression", r#""with""#));
    }
    p.bump()?;

    let was = p.parse_comma_separated("with expression", parse_with_arg_expr)?;

    let mut seen = AHashSet::with_capacity(was.len());
    for wa in &was {
        if !seen.insert(wa.name.as_str()) {
            return Err(ParseError::DuplicateArgument(wa.name.clone()));
        }
    }

    let body = parse_expression(p)?;
    Ok(Expr::With(WithExpr::new(body, was)))
}

fn parse_with_arg_expr(p: &mut Parser) -> ParseResult<WithArgExpr> {
    let name = p.expect_identifier("with argument")?;

    let mut args = vec![];
    if p.at("(") {
        args = p.parse_ident_list(false)?;
        let mut seen = AHashSet::with_capacity(args.len());
        for arg in &args {
            if !seen.insert(arg.as_str()) {
                let msg = format!("duplicate arg {arg:?} in WITH template {name:?}");
                return Err(ParseError::DuplicateArgument(msg));
            }
        }
    }

    p.expect("=", "with argument")?;
    let expr = parse_expression(p)?;

    Ok(WithArgExpr::new(name, expr, args))
}
