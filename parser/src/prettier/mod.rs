use std::fmt;
use std::fmt::{Display, Formatter};

use crate::ast::{
    AggregationExpr, BinaryExpr, Expr, FunctionExpr, MetricExpr, ParensExpr, RollupExpr,
};
use crate::common::join_vector;
use crate::label::LabelFilter;
use crate::lexer::escape_ident;
use crate::parser::{parse, ParseResult};

#[cfg(test)]
mod prettier_test;

/// Default line length used by [`prettier`] callers which have no preference.
pub const MAX_CHARACTERS_PER_LINE: usize = 130;

/// Parses `query` and renders it on multiple lines, so that lines fit within `max_line_length`
/// characters where possible. Queries whose canonical form already fits are returned as a
/// single line.
pub fn prettier(query: &str, max_line_length: usize) -> ParseResult<String> {
    let expr = parse(query)?;
    Ok(expr.pretty(0, max_line_length))
}

pub fn indent(level: usize) -> String {
    "  ".repeat(level)
}

/// Renders expressions over multiple lines, indenting nested nodes by two spaces per level.
pub trait Prettier: Display {
    fn pretty(&self, level: usize, max: usize) -> String {
        if self.needs_split(level, max) {
            self.format(level, max)
        } else {
            format!("{}{}", indent(level), self)
        }
    }

    fn format(&self, level: usize, _max: usize) -> String {
        format!("{}{}", indent(level), self)
    }

    fn needs_split(&self, level: usize, max: usize) -> bool {
        !fits(level, &self.to_string(), max)
    }
}

fn fits(level: usize, s: &str, max: usize) -> bool {
    level * 2 + s.len() <= max && !s.contains('\n')
}

/// One argument per line, separated by commas.
pub fn prettify_args(args: &[Expr], level: usize, max: usize) -> String {
    args.iter()
        .map(|arg| arg.pretty(level, max))
        .collect::<Vec<_>>()
        .join(",\n")
}

/// `name(` and `)` on their own lines around the arguments. `name` is already escaped.
fn prettify_call(name: &str, args: &[Expr], level: usize, max: usize) -> String {
    let spaces = indent(level);
    if args.is_empty() {
        return format!("{spaces}{name}()");
    }
    format!(
        "{spaces}{name}(\n{}\n{spaces})",
        prettify_args(args, level + 1, max)
    )
}

/// Renders a binary or rollup operand, wrapping it in parens when the canonical form does.
fn prettify_operand(expr: &Expr, needs_parens: bool, level: usize, max: usize) -> String {
    if !needs_parens {
        return expr.pretty(level, max);
    }
    let spaces = indent(level);
    let s = expr.to_string();
    if fits(level, &s, max.saturating_sub(2)) {
        return format!("{spaces}({s})");
    }
    format!("{spaces}(\n{}\n{spaces})", expr.pretty(level + 1, max))
}

/// Adapts the `fmt_*` helpers of AST nodes to `Display`.
struct DisplayFn<F>(F);

fn display_fn<F: Fn(&mut Formatter<'_>) -> fmt::Result>(f: F) -> DisplayFn<F> {
    DisplayFn(f)
}

impl<F: Fn(&mut Formatter<'_>) -> fmt::Result> Display for DisplayFn<F> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        (self.0)(f)
    }
}

fn prettify_label_filters(filters: &[LabelFilter], level: usize, max: usize) -> String {
    let spaces = indent(level);
    let line = join_vector(filters, ",");
    if fits(level, &line, max) {
        return format!("{spaces}{line}");
    }
    let sep = format!(",\n{spaces}");
    format!("{spaces}{}", join_vector(filters, &sep))
}

impl Prettier for MetricExpr {
    fn format(&self, level: usize, max: usize) -> String {
        let spaces = indent(level);
        let (name, groups) = self.name_and_groups();
        let mut res = spaces.clone();
        if let Some(name) = name {
            res.push_str(&escape_ident(name));
        }
        if groups.is_empty() {
            if name.is_none() {
                res.push_str("{}");
            }
            return res;
        }
        let or_sep = format!("\n{}or\n", indent(level + 2));
        let body = groups
            .iter()
            .map(|g| prettify_label_filters(g, level + 1, max))
            .collect::<Vec<_>>()
            .join(&or_sep);
        res.push_str("{\n");
        res.push_str(&body);
        res.push('\n');
        res.push_str(&spaces);
        res.push('}');
        res
    }
}

impl Prettier for FunctionExpr {
    fn format(&self, level: usize, max: usize) -> String {
        let mut res = prettify_call(&escape_ident(&self.name), &self.args, level, max);
        if self.keep_metric_names {
            res.push_str(" keep_metric_names");
        }
        res
    }
}

impl Prettier for AggregationExpr {
    fn format(&self, level: usize, max: usize) -> String {
        let mut res = prettify_call(&escape_ident(&self.name), &self.args, level, max);
        if let Some(modifier) = &self.modifier {
            res.push_str(&format!(" {modifier}"));
        }
        if self.limit > 0 {
            res.push_str(&format!(" limit {}", self.limit));
        }
        res
    }
}

impl Prettier for RollupExpr {
    fn format(&self, level: usize, max: usize) -> String {
        let inner = prettify_operand(&self.expr, self.inner_needs_parens(), level, max);
        let suffix = display_fn(|f| self.fmt_suffix(f));
        format!("{inner}{suffix}")
    }
}

impl Prettier for BinaryExpr {
    fn format(&self, level: usize, max: usize) -> String {
        let inner = if self.keep_metric_names {
            level + 1
        } else {
            level
        };
        let modifiers = display_fn(|f| self.fmt_modifiers(f));
        let body = format!(
            "{}\n{}{}\n{}",
            prettify_operand(&self.left, self.left_needs_parens(), inner, max),
            indent(inner + 1),
            modifiers,
            prettify_operand(&self.right, self.right_needs_parens(), inner, max),
        );
        if self.keep_metric_names {
            let spaces = indent(level);
            return format!("{spaces}(\n{body}\n{spaces}) keep_metric_names");
        }
        body
    }
}

impl Prettier for ParensExpr {
    fn format(&self, level: usize, max: usize) -> String {
        prettify_call("", &self.expressions, level, max)
    }
}

impl Prettier for Expr {
    fn pretty(&self, level: usize, max: usize) -> String {
        match self {
            Expr::MetricExpression(me) => me.pretty(level, max),
            Expr::Function(fe) => fe.pretty(level, max),
            Expr::Aggregation(ae) => ae.pretty(level, max),
            Expr::Rollup(re) => re.pretty(level, max),
            Expr::BinaryOperator(be) => be.pretty(level, max),
            Expr::Parens(pe) => pe.pretty(level, max),
            // literals and WITH nodes are never split
            Expr::NumberLiteral(_)
            | Expr::Duration(_)
            | Expr::StringLiteral(_)
            | Expr::StringExpr(_)
            | Expr::With(_)
            | Expr::WithSelector(_) => format!("{}{}", indent(level), self),
        }
    }
}
