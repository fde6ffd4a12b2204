use crate::ast::{Expr, FunctionExpr};
use crate::parser::expr::is_keep_metric_names;
use crate::parser::{ParseResult, Parser};

/// parse_func_expr parses a function call.
///
///    <name>(<args>) [keep_metric_names]
///
/// The name keeps its case, since it may refer to a WITH template.
pub(super) fn parse_func_expr(p: &mut Parser) -> ParseResult<Expr> {
    let name = p.expect_identifier("function")?;
    let args = p.parse_arg_list()?;

    let mut fe = FunctionExpr::new(name, args);
    if is_keep_metric_names(p.token()) {
        p.bump()?;
        fe.keep_metric_names = true;
    }

    Ok(Expr::Function(fe))
}
