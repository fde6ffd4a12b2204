use crate::ast::Expr;
use crate::binaryop::{eval_binary_op, string_compare};
use crate::common::Operator;
use crate::functions::is_supported_function;
use crate::parser::{ParseError, ParseResult};

fn map_args(args: Vec<Expr>, f: fn(Expr) -> Expr) -> Vec<Expr> {
    args.into_iter().map(f).collect()
}

/// Removes parens around single expressions, i.e. `((a + b))` becomes `a + b`.
pub(super) fn remove_parens(expr: Expr) -> Expr {
    match expr {
        Expr::Parens(mut pe) => {
            pe.expressions = map_args(pe.expressions, remove_parens);
            if pe.expressions.len() == 1 {
                return pe.expressions.remove(0);
            }
            Expr::Parens(pe)
        }
        Expr::BinaryOperator(mut be) => {
            be.left = Box::new(remove_parens(*be.left));
            be.right = Box::new(remove_parens(*be.right));
            Expr::BinaryOperator(be)
        }
        Expr::Rollup(mut re) => {
            re.expr = Box::new(remove_parens(*re.expr));
            re.at = re.at.map(|at| Box::new(remove_parens(*at)));
            Expr::Rollup(re)
        }
        Expr::Function(mut fe) => {
            fe.args = map_args(fe.args, remove_parens);
            Expr::Function(fe)
        }
        Expr::Aggregation(mut ae) => {
            ae.args = map_args(ae.args, remove_parens);
            Expr::Aggregation(ae)
        }
        _ => expr,
    }
}

/// Folds operations on number and string literals, i.e. `1 + 2 * 3` becomes `7`.
pub(super) fn simplify_constants(expr: Expr) -> Expr {
    match expr {
        Expr::BinaryOperator(mut be) => {
            let left = simplify_constants(*be.left);
            let right = simplify_constants(*be.right);
            match (&left, &right) {
                (Expr::NumberLiteral(l), Expr::NumberLiteral(r)) => {
                    let n = eval_binary_op(l.value, r.value, be.op, be.bool_modifier);
                    return Expr::from(n);
                }
                (Expr::StringLiteral(l), Expr::StringLiteral(r)) => {
                    if be.op == Operator::Add {
                        return Expr::from(format!("{}{}", l.0, r.0));
                    }
                    if let Some(n) = string_compare(&l.0, &r.0, be.op, be.bool_modifier) {
                        return Expr::from(n);
                    }
                }
                _ => {}
            }
            be.left = Box::new(left);
            be.right = Box::new(right);
            Expr::BinaryOperator(be)
        }
        Expr::Rollup(mut re) => {
            re.expr = Box::new(simplify_constants(*re.expr));
            re.at = re.at.map(|at| Box::new(simplify_constants(*at)));
            Expr::Rollup(re)
        }
        Expr::Function(mut fe) => {
            fe.args = map_args(fe.args, simplify_constants);
            Expr::Function(fe)
        }
        Expr::Aggregation(mut ae) => {
            ae.args = map_args(ae.args, simplify_constants);
            Expr::Aggregation(ae)
        }
        Expr::Parens(mut pe) => {
            pe.expressions = map_args(pe.expressions, simplify_constants);
            Expr::Parens(pe)
        }
        _ => expr,
    }
}

/// Fails on calls to functions which are neither builtins nor expanded templates.
pub(super) fn check_supported_functions(expr: &Expr) -> ParseResult<()> {
    match expr {
        Expr::Function(fe) => {
            if !is_supported_function(&fe.name) {
                return Err(ParseError::InvalidFunction(format!("{}()", fe.name)));
            }
            fe.args.iter().try_for_each(check_supported_functions)
        }
        Expr::Aggregation(ae) => {
            if !is_supported_function(&ae.name) {
                return Err(ParseError::InvalidFunction(format!("{}()", ae.name)));
            }
            ae.args.iter().try_for_each(check_supported_functions)
        }
        Expr::BinaryOperator(be) => {
            check_supported_functions(&be.left)?;
            check_supported_functions(&be.right)
        }
        Expr::Rollup(re) => {
            check_supported_functions(&re.expr)?;
            match &re.at {
                Some(at) => check_supported_functions(at),
                None => Ok(()),
            }
        }
        Expr::Parens(pe) => pe.expressions.iter().try_for_each(check_supported_functions),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser::parse_raw;

    fn simplify(q: &str) -> String {
        let expr = parse_raw(q).expect("valid query");
        simplify_constants(remove_parens(expr)).to_string()
    }

    #[test]
    fn test_simplify() {
        let f = |q: &str, expected: &str| assert_eq!(simplify(q), expected);

        f("1 + 2 * 3", "7");
        f("((1))", "1");
        f("(1, (2))", "(1, 2)");
        f("-1 ^ 0.5", "-1");
        f("(-1) ^ 0.5", "NaN");
        f("1 > 2", "NaN");
        f("1 >bool 2", "0");
        f("2 > 1", "2");
        f(r#""foo" + "bar""#, r#""foobar""#);
        f(r#""a" < "b""#, "1");
        f(r#""a" >bool "b""#, "0");
        f(r#""a" * "b""#, r#""a" * "b""#);
        f("5m + 3s", "5m + 3s");
        f("rate(m[5m] @ (1 + 2))", "rate(m[5m] @ 3)");
        f("sum(1 + 2) by (x)", "sum(3) by(x)");
        f("m + (1 + 2)", "m + 3");
    }

    #[test]
    fn test_check_supported_functions() {
        let f = |q: &str, ok: bool| {
            let expr = parse_raw(q).expect("valid query");
            assert_eq!(check_supported_functions(&expr).is_ok(), ok, "{q}");
        };

        f("rate(m[5m])", true);
        f("RATE(m[5m])", true);
        f("sum(foo(x))", false);
        f("m @ bar()", false);
        f("(a, unknown_func())", false);
    }
}
