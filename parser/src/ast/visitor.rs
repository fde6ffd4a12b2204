use crate::ast::Expr;

/// Calls `f` for every node of the tree in post-order: children first, then the node itself.
///
/// Modifiers and the `@` timestamp of a rollup are not visited.
pub fn visit_all<F>(expr: &Expr, f: &mut F)
where
    F: FnMut(&Expr),
{
    match expr {
        Expr::BinaryOperator(be) => {
            visit_all(&be.left, f);
            visit_all(&be.right, f);
        }
        Expr::Function(fe) => {
            for arg in &fe.args {
                visit_all(arg, f);
            }
        }
        Expr::Aggregation(ae) => {
            for arg in &ae.args {
                visit_all(arg, f);
            }
        }
        Expr::Rollup(re) => visit_all(&re.expr, f),
        Expr::Parens(pe) => {
            for arg in &pe.expressions {
                visit_all(arg, f);
            }
        }
        Expr::With(we) => {
            for was in &we.was {
                visit_all(&was.expr, f);
            }
            visit_all(&we.expr, f);
        }
        Expr::NumberLiteral(_)
        | Expr::Duration(_)
        | Expr::StringLiteral(_)
        | Expr::StringExpr(_)
        | Expr::MetricExpression(_)
        | Expr::WithSelector(_) => {}
    }
    f(expr)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser::parse;

    fn visited(q: &str) -> String {
        let expr = parse(q).expect("valid query");
        let mut s = String::new();
        visit_all(&expr, &mut |e: &Expr| {
            s.push_str(&e.to_string());
            s.push(',');
        });
        s
    }

    #[test]
    fn test_visit_all() {
        assert_eq!(visited("1+a"), "1,a,1 + a,");
        assert_eq!(visited("foo"), "foo,");
        assert_eq!(
            visited("sum(rate(m[5m])) by(x) / 2"),
            "m,m[5m],rate(m[5m]),sum(rate(m[5m])) by(x),2,sum(rate(m[5m])) by(x) / 2,"
        );
        assert_eq!(visited("(a, b)"), "a,b,(a, b),");
        assert_eq!(visited("m offset 5m @ end()"), "m,m offset 5m @ end(),");
    }
}
