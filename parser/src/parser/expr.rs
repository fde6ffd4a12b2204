use crate::ast::{
    BinaryExpr, DurationExpr, Expr, GroupModifier, GroupModifierOp, JoinModifier, JoinModifierOp,
    NumberLiteral, ParensExpr, StringExpr, StringLiteral,
};
use crate::common::{is_binary_op, Operator};
use crate::functions::is_aggr_func;
use crate::lexer::{
    extract_string_value, is_ident_prefix, is_inf_or_nan, is_positive_duration,
    is_positive_number_prefix, is_string_prefix, unescape_ident,
};
use crate::parser::aggregation::parse_aggr_func_expr;
use crate::parser::function::parse_func_expr;
use crate::parser::rollup::{is_rollup_start, parse_rollup_expr};
use crate::parser::selector::parse_metric_expr;
use crate::parser::with_expr::parse_with_expr;
use crate::parser::{ParseError, ParseResult, Parser};

const KEEP_METRIC_NAMES: &str = "keep_metric_names";

pub(super) fn is_keep_metric_names(token: &str) -> bool {
    token.eq_ignore_ascii_case(KEEP_METRIC_NAMES)
}

/// Parses a chain of operands joined by binary operators.
///
///    <single_expr> [<op> [bool] [on|ignoring (...) [group_left|group_right [(...)] [prefix <str>]]] <single_expr> [keep_metric_names]] ...
///
pub(super) fn parse_expression(p: &mut Parser) -> ParseResult<Expr> {
    let mut ops = 0;
    let res = parse_binary_chain(p, &mut ops);
    p.leave_binary_ops(ops);
    res
}

fn parse_binary_chain(p: &mut Parser, ops: &mut usize) -> ParseResult<Expr> {
    let mut left = parse_single_expr(p)?;
    loop {
        if !is_binary_op(p.token()) {
            return Ok(left);
        }
        let op = Operator::try_from(p.token())?;
        *ops += 1;
        p.enter_binary_op()?;
        p.bump()?;

        let mut be = BinaryExpr::new(op, Expr::default(), Expr::default());

        if p.at_keyword("bool") {
            if !op.is_comparison() {
                let msg = format!("bool modifier cannot be applied to {op}");
                return Err(p.syntax_error(&msg));
            }
            be.bool_modifier = true;
            p.bump()?;
        }

        if let Ok(group_op) = GroupModifierOp::try_from(p.token()) {
            p.bump()?;
            let labels = p.parse_ident_list(false)?;
            be.group_modifier = Some(GroupModifier::new(group_op, labels));

            if let Ok(join_op) = JoinModifierOp::try_from(p.token()) {
                if op.is_set_operator() {
                    let msg = format!("modifier {join_op} cannot be applied to {op}");
                    return Err(p.syntax_error(&msg));
                }
                p.bump()?;
                // the label list may be omitted, i.e. `a * on(x) group_left b`
                let labels = if p.at("(") {
                    p.parse_ident_list(true)?
                } else {
                    vec![]
                };
                be.join_modifier = Some(JoinModifier::new(join_op, labels));

                if p.at_keyword("prefix") {
                    p.bump()?;
                    be.join_modifier_prefix = Some(parse_string_expr(p)?);
                }
            }
        }

        be.left = Box::new(left);
        be.right = Box::new(parse_single_expr(p)?);

        if is_keep_metric_names(p.token()) {
            p.bump()?;
            be.keep_metric_names = true;
        }

        left = balance_binary_op(be);
    }
}

/// Re-arranges `(a op1 b) op2 c` into `a op1 (b op2 c)` when `op2` binds tighter than `op1`,
/// or when both are the same right-associative operator.
fn balance_binary_op(mut be: BinaryExpr) -> Expr {
    let rotate = match be.left.as_ref() {
        Expr::BinaryOperator(left) if !left.keep_metric_names => {
            let lp = left.op.precedence();
            let rp = be.op.precedence();
            rp > lp || (rp == lp && be.op.is_right_associative())
        }
        _ => false,
    };
    if !rotate {
        return Expr::BinaryOperator(be);
    }
    match std::mem::take(be.left.as_mut()) {
        Expr::BinaryOperator(mut bel) => {
            be.left = bel.right;
            bel.right = Box::new(balance_binary_op(be));
            Expr::BinaryOperator(bel)
        }
        left => {
            be.left = Box::new(left);
            Expr::BinaryOperator(be)
        }
    }
}

/// Parses an operand of a binary expression, including the optional rollup suffix.
pub(super) fn parse_single_expr(p: &mut Parser) -> ParseResult<Expr> {
    p.enter()?;
    let res = parse_single_expr_inner(p);
    p.leave();
    res
}

fn parse_single_expr_inner(p: &mut Parser) -> ParseResult<Expr> {
    if p.at_keyword("with") && p.peek()? == "(" {
        return parse_with_expr(p);
    }
    let expr = parse_single_expr_without_rollup_suffix(p)?;
    if !is_rollup_start(p.token()) {
        return Ok(expr);
    }
    parse_rollup_expr(p, expr)
}

pub(super) fn parse_single_expr_without_rollup_suffix(p: &mut Parser) -> ParseResult<Expr> {
    let token = p.token();
    if p.is_eof() {
        return Err(ParseError::UnexpectedEOF);
    }
    if is_positive_duration(token) {
        p.bump()?;
        return Ok(Expr::Duration(DurationExpr::new(token)));
    }
    if is_positive_number_prefix(token) || is_inf_or_nan(token) {
        let n = NumberLiteral::from_token(token)?;
        p.bump()?;
        return Ok(Expr::NumberLiteral(n));
    }
    if is_string_prefix(token) {
        let se = parse_string_expr(p)?;
        return Ok(match se.get_literal() {
            Some(s) => Expr::StringLiteral(StringLiteral(s)),
            None => Expr::StringExpr(se),
        });
    }
    if is_ident_prefix(token) {
        return parse_ident_expr(p);
    }
    match token {
        "(" => parse_parens_expr(p),
        "{" => parse_metric_expr(p),
        "-" => {
            // `-expr` is `0 - expr`. The node is left unwrapped, so `-1 ^ 2` is balanced
            // into `0 - (1 ^ 2)`.
            p.bump()?;
            let expr = parse_single_expr(p)?;
            Ok(Expr::BinaryOperator(BinaryExpr::new(
                Operator::Sub,
                Expr::from(0.0),
                expr,
            )))
        }
        "+" => {
            p.bump()?;
            parse_single_expr(p)
        }
        _ => Err(p.token_error("single expression", "")),
    }
}

/// Parses expressions starting with an identifier. The next token decides whether it is
/// a metric, a function call or an aggregation.
fn parse_ident_expr(p: &mut Parser) -> ParseResult<Expr> {
    let name = p.token();
    let next = p.peek()?;

    if next.is_empty() || next.eq_ignore_ascii_case("offset") {
        return parse_metric_expr(p);
    }
    if is_ident_prefix(next) {
        if is_aggr_func(&unescape_ident(name)) {
            return parse_aggr_func_expr(p);
        }
        return parse_metric_expr(p);
    }
    if is_binary_op(next) {
        return parse_metric_expr(p);
    }
    match next {
        "(" => {
            if is_aggr_func(&unescape_ident(name)) {
                parse_aggr_func_expr(p)
            } else {
                parse_func_expr(p)
            }
        }
        "{" | "[" | ")" | "," | "@" => parse_metric_expr(p),
        _ => {
            p.bump()?;
            Err(p.token_error(
                "identifier expression",
                r#""(", "{", "[", ")", "," or "@""#,
            ))
        }
    }
}

/// Parses `(expr, ...)` with an optional `keep_metric_names` suffix, which applies to a
/// single binary expression. Otherwise the suffix is left to the enclosing binary expression.
fn parse_parens_expr(p: &mut Parser) -> ParseResult<Expr> {
    let mut expressions = p.parse_arg_list()?;
    if is_keep_metric_names(p.token()) {
        if let [Expr::BinaryOperator(be)] = expressions.as_mut_slice() {
            be.keep_metric_names = true;
            p.bump()?;
        }
    }
    Ok(Expr::Parens(ParensExpr::new(expressions)))
}

/// Parses a `+` concatenation of string literals and identifiers, i.e. `"a" + x + "b"`.
///
/// Parsing stops before `+ ident(` and `+ ident{`, so `"a" + f()` is a binary expression.
pub(super) fn parse_string_expr(p: &mut Parser) -> ParseResult<StringExpr> {
    let mut se = StringExpr::default();
    loop {
        let token = p.token();
        if is_string_prefix(token) {
            se.push_str(&extract_string_value(token)?);
        } else if is_ident_prefix(token) {
            se.push_ident(&unescape_ident(token));
        } else {
            return Err(p.token_error("string expression", "string"));
        }

        p.bump()?;
        if !p.at("+") {
            return Ok(se);
        }

        p.bump()?;
        if is_string_prefix(p.token()) {
            continue;
        }
        if !is_ident_prefix(p.token()) {
            // not a part of the string expression; push the `+` back.
            p.back();
            return Ok(se);
        }
        let next = p.peek()?;
        if next == "(" || next == "{" {
            p.back();
            return Ok(se);
        }
    }
}
