use crate::ast::{DurationExpr, Expr, RollupExpr};
use crate::lexer::{
    is_ident_prefix, is_positive_duration, is_positive_number_prefix, parse_positive_number,
    unescape_ident,
};
use crate::parser::expr::{is_keep_metric_names, parse_single_expr_without_rollup_suffix};
use crate::parser::{ParseError, ParseResult, Parser};

fn is_offset(token: &str) -> bool {
    token.eq_ignore_ascii_case("offset")
}

pub(super) fn is_rollup_start(token: &str) -> bool {
    token == "[" || token == "@" || is_offset(token)
}

/// Parses the rollup suffix of `expr`.
///
///    <expr>[<window>:<step>] @ <at_expr> offset <duration>
///
/// `@` and `offset` may come in any order.
pub(super) fn parse_rollup_expr(p: &mut Parser, expr: Expr) -> ParseResult<Expr> {
    let mut re = RollupExpr::new(expr);

    if p.at("[") {
        let (window, step, inherit_step) = parse_window_and_step(p)?;
        re.window = window;
        re.step = step;
        re.inherit_step = inherit_step;
    }

    if p.at("@") {
        re.at = Some(Box::new(parse_at_expr(p)?));
    }

    if is_offset(p.token()) {
        re.offset = Some(parse_offset(p)?);
    }

    if p.at("@") {
        if re.at.is_some() {
            return Err(p.syntax_error("duplicate `@` modifier"));
        }
        re.at = Some(Box::new(parse_at_expr(p)?));
    }

    if is_keep_metric_names(p.token()) {
        match re.expr.as_mut() {
            Expr::Function(fe) => fe.keep_metric_names = true,
            Expr::BinaryOperator(be) => be.keep_metric_names = true,
            _ => return Ok(Expr::Rollup(re)),
        }
        p.bump()?;
    }

    Ok(Expr::Rollup(re))
}

fn parse_at_expr(p: &mut Parser) -> ParseResult<Expr> {
    p.expect("@", "@ modifier")?;
    parse_single_expr_without_rollup_suffix(p).map_err(|err| {
        ParseError::SyntaxError(format!("cannot parse `@` expression: {err}"))
    })
}

/// Parses `[window]`, `[window:step]`, `[window:]`, `[:step]` and `[:]`.
fn parse_window_and_step(
    p: &mut Parser,
) -> ParseResult<(Option<DurationExpr>, Option<DurationExpr>, bool)> {
    p.expect("[", "window")?;

    let mut window = None;
    if !p.token().starts_with(':') {
        window = Some(parse_positive_duration(p)?);
    }

    let mut step = None;
    let mut inherit_step = false;
    let token = p.token();
    if let Some(rest) = token.strip_prefix(':') {
        p.set_token(rest);
        if rest.is_empty() {
            p.bump()?;
            if p.at("]") {
                inherit_step = true;
            }
        }
        if !p.at("]") {
            step = Some(parse_positive_duration(p)?);
        }
    }

    if !p.at("]") {
        return Err(p.token_error("window", r#""]""#));
    }
    p.bump()?;

    Ok((window, step, inherit_step))
}

/// Parses `offset [-]<duration>`.
fn parse_offset(p: &mut Parser) -> ParseResult<DurationExpr> {
    p.bump()?;
    let is_negative = p.at("-");
    if is_negative {
        p.bump()?;
    }
    let duration = parse_positive_duration(p)?;
    if !is_negative {
        return Ok(duration);
    }
    if let Some(name) = duration.template_name() {
        let msg = format!("cannot negate offset template {name}");
        return Err(ParseError::SyntaxError(msg));
    }
    Ok(DurationExpr::new(format!("-{}", duration.as_str())))
}

/// Parses a duration, a number of seconds, or a WITH template name.
///
/// An identifier such as `w1:w2` is split at the colon, leaving `:w2` as the current token.
fn parse_positive_duration(p: &mut Parser) -> ParseResult<DurationExpr> {
    let token = p.token();

    if is_ident_prefix(token) {
        if let Some(n) = token.find(':') {
            let (name, rest) = token.split_at(n);
            p.set_token(rest);
            return Ok(DurationExpr::template(unescape_ident(name)));
        }
        p.bump()?;
        return Ok(DurationExpr::template(unescape_ident(token)));
    }

    if is_positive_duration(token) {
        p.bump()?;
        return Ok(DurationExpr::new(token));
    }

    if !is_positive_number_prefix(token) {
        return Err(p.token_error("duration", "duration"));
    }
    // a bare number means seconds; number suffixes such as `5M` are not allowed here
    if !token.ends_with(|c: char| c.is_ascii_digit() || c == '.') {
        let msg = format!("invalid duration {token:?}");
        return Err(ParseError::InvalidDuration(msg));
    }
    parse_positive_number(token)
        .map_err(|err| ParseError::InvalidDuration(format!("cannot parse duration {token:?}: {err}")))?;
    p.bump()?;
    Ok(DurationExpr::new(token))
}
