use tracing::debug;

use crate::ast::Expr;
use crate::lexer::{is_ident_prefix, unescape_ident, Lexer};

pub use expand::expand_with_exprs;
pub use parse_error::*;

mod aggregation;
mod expand;
mod expr;
mod function;
mod rollup;
mod selector;
mod simplify;
mod with_expr;

#[cfg(test)]
mod expand_with_test;

mod parse_error;

/// Maximum nesting of parens, function calls and aggregations accepted by the parser.
///
/// A binary operator deepens the tree by a single node and costs a quarter of a nesting
/// level, so a query may chain up to `4 * MAX_PARSE_DEPTH` operators.
pub const MAX_PARSE_DEPTH: usize = 64;

const NESTING_COST: usize = 4;
const BINARY_OP_COST: usize = 1;
const MAX_DEPTH_COST: usize = MAX_PARSE_DEPTH * NESTING_COST;

/// Parses a MetricsQL query into an expression tree.
///
/// WITH templates are expanded, single-element parens are removed and constant
/// sub-expressions are folded. Every function in the result is a known builtin.
pub fn parse(input: &str) -> ParseResult<Expr> {
    parse_internal(input).map_err(|err| {
        debug!(query = input, error = %err, "failed to parse query");
        err
    })
}

fn parse_internal(input: &str) -> ParseResult<Expr> {
    let expr = parse_raw(input)?;
    let expr = expand::expand_templates(&expr)?;
    // templates may expand into trees deeper than the query text
    if exceeds_depth(&expr, MAX_DEPTH_COST) {
        return Err(depth_error());
    }
    let expr = simplify::remove_parens(expr);
    let expr = simplify::simplify_constants(expr);
    simplify::check_supported_functions(&expr)?;
    Ok(expr)
}

/// Parses `input` without any post-processing, i.e. WITH templates are kept as is.
pub(crate) fn parse_raw(input: &str) -> ParseResult<Expr> {
    let mut p = Parser::new(input)?;
    let expr = expr::parse_expression(&mut p)?;
    if !p.is_eof() {
        return Err(ParseError::SyntaxError(format!(
            "unparsed data left: {:?}",
            p.context()
        )));
    }
    Ok(expr)
}

fn depth_error() -> ParseError {
    ParseError::General(format!(
        "query nesting exceeds the maximum depth of {MAX_PARSE_DEPTH}"
    ))
}

/// Reports whether the nesting of `expr`, weighted the way the parser counts it, exceeds `budget`.
/// Recursion stops as soon as the budget runs out.
fn exceeds_depth(expr: &Expr, budget: usize) -> bool {
    let (cost, children): (usize, Vec<&Expr>) = match expr {
        Expr::BinaryOperator(be) => (BINARY_OP_COST, vec![be.left.as_ref(), be.right.as_ref()]),
        Expr::Function(fe) => (NESTING_COST, fe.args.iter().collect()),
        Expr::Aggregation(ae) => (NESTING_COST, ae.args.iter().collect()),
        Expr::Parens(pe) => (NESTING_COST, pe.expressions.iter().collect()),
        Expr::Rollup(re) => {
            let mut children = vec![re.expr.as_ref()];
            children.extend(re.at.as_deref());
            (NESTING_COST, children)
        }
        Expr::With(we) => (NESTING_COST, vec![we.expr.as_ref()]),
        Expr::NumberLiteral(_)
        | Expr::Duration(_)
        | Expr::StringLiteral(_)
        | Expr::StringExpr(_)
        | Expr::MetricExpression(_)
        | Expr::WithSelector(_) => return false,
    };
    if cost > budget {
        return true;
    }
    children
        .into_iter()
        .any(|child| exceeds_depth(child, budget - cost))
}

/// Recursive descent parser over the token stream produced by [`Lexer`].
pub(crate) struct Parser<'a> {
    lex: Lexer<'a>,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(input: &'a str) -> ParseResult<Self> {
        let mut lex = Lexer::new(input);
        lex.next()?;
        Ok(Parser { lex, depth: 0 })
    }

    #[inline]
    pub(crate) fn token(&self) -> &'a str {
        self.lex.token
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.lex.is_eof()
    }

    /// Advances to the next token.
    pub(crate) fn bump(&mut self) -> ParseResult<()> {
        self.lex.next()
    }

    /// Moves one token back.
    pub(crate) fn back(&mut self) {
        self.lex.prev()
    }

    /// Replaces the current token with a part of it, i.e. `:5m` with `5m`.
    pub(crate) fn set_token(&mut self, token: &'a str) {
        self.lex.token = token;
    }

    /// Returns the token following the current one without consuming anything.
    pub(crate) fn peek(&mut self) -> ParseResult<&'a str> {
        self.bump()?;
        let token = self.token();
        self.back();
        Ok(token)
    }

    #[inline]
    pub(crate) fn at(&self, token: &str) -> bool {
        self.lex.token == token
    }

    /// Reports whether the current token is the given keyword. Keywords are case-insensitive.
    pub(crate) fn at_keyword(&self, keyword: &str) -> bool {
        self.lex.token.eq_ignore_ascii_case(keyword)
    }

    pub(crate) fn expect(&mut self, token: &str, context: &str) -> ParseResult<()> {
        if !self.at(token) {
            return Err(self.token_error(context, &format!("{token:?}")));
        }
        self.bump()
    }

    /// Consumes an identifier and returns it unescaped.
    pub(crate) fn expect_identifier(&mut self, context: &str) -> ParseResult<String> {
        let token = self.token();
        if !is_ident_prefix(token) {
            return Err(self.token_error(context, "identifier"));
        }
        self.bump()?;
        Ok(unescape_ident(token))
    }

    /// Builds an error complaining about the current token.
    pub(crate) fn token_error(&self, context: &str, expected: &str) -> ParseError {
        if self.is_eof() {
            return unexpected(context, "", expected, "");
        }
        unexpected(context, self.token(), expected, self.lex.tail())
    }

    pub(crate) fn syntax_error(&self, msg: &str) -> ParseError {
        ParseError::SyntaxError(format!("{msg}; unparsed data: {:?}", self.context()))
    }

    /// The current token followed by the rest of the input.
    pub(crate) fn context(&self) -> String {
        let mut res = String::with_capacity(self.token().len() + self.lex.tail().len());
        res.push_str(self.token());
        res.push_str(self.lex.tail());
        res
    }

    /// Enters a nested sub-expression. Must be paired with [`Parser::leave`].
    pub(crate) fn enter(&mut self) -> ParseResult<()> {
        self.descend(NESTING_COST)
    }

    pub(crate) fn leave(&mut self) {
        self.ascend(NESTING_COST)
    }

    /// Accounts for one more binary operator in the current operand chain.
    pub(crate) fn enter_binary_op(&mut self) -> ParseResult<()> {
        self.descend(BINARY_OP_COST)
    }

    pub(crate) fn leave_binary_ops(&mut self, count: usize) {
        self.ascend(count * BINARY_OP_COST)
    }

    fn descend(&mut self, cost: usize) -> ParseResult<()> {
        self.depth += cost;
        if self.depth > MAX_DEPTH_COST {
            return Err(depth_error());
        }
        Ok(())
    }

    fn ascend(&mut self, cost: usize) {
        self.depth = self.depth.saturating_sub(cost);
    }

    /// Parses `(item, ...)`. A trailing comma is allowed; a lone comma is not.
    pub(crate) fn parse_comma_separated<T, F>(&mut self, context: &str, mut f: F) -> ParseResult<Vec<T>>
    where
        F: FnMut(&mut Self) -> ParseResult<T>,
    {
        self.expect("(", context)?;
        let mut items = Vec::new();
        loop {
            if self.at(")") {
                break;
            }
            items.push(f(self)?);
            if self.at(",") {
                self.bump()?;
                continue;
            }
            if self.at(")") {
                break;
            }
            return Err(self.token_error(context, r#""," or ")""#));
        }
        self.bump()?;
        Ok(items)
    }

    /// Parses function call arguments, i.e. `(a, b + 1, "c")`.
    pub(crate) fn parse_arg_list(&mut self) -> ParseResult<Vec<Expr>> {
        self.parse_comma_separated("args", expr::parse_expression)
    }

    /// Parses a list of labels, i.e. `(job, instance)`. When `allow_star` is set,
    /// `(*)` is accepted as well.
    pub(crate) fn parse_ident_list(&mut self, allow_star: bool) -> ParseResult<Vec<String>> {
        let labels = self.parse_comma_separated("ident list", |p| {
            if allow_star && p.at("*") {
                p.bump()?;
                return Ok("*".to_string());
            }
            p.expect_identifier("ident list")
        })?;
        if labels.len() > 1 && labels.iter().any(|l| l == "*") {
            return Err(ParseError::SyntaxError(format!(
                "`*` cannot be mixed with other labels; got ({})",
                labels.join(", ")
            )));
        }
        Ok(labels)
    }
}
