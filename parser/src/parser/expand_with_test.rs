#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::parser::expand_with_exprs;

    #[test]
    fn test_expand_with_exprs_success() {
        let f = |q: &str, expected: &str| {
            // expansion is stateless, so repeated calls must agree
            for _ in 0..3 {
                let expanded = expand_with_exprs(q)
                    .unwrap_or_else(|e| panic!("unexpected error when expanding {q}: {e}"));
                assert_eq!(expanded, expected, "unexpected expanded expression for {q}");
            }
        };

        f("1", "1");
        f("foobar", "foobar");
        f("with (x = 1) x+x", "2");
        f("with (x = m) x+x", "m + m");
        f("with (f(x) = x*x) 3+f(2)+2", "9");
        f(
            r#"with (cf = {job="a"}, r(m) = rate(m{cf}[5m])) r(foo) / r(bar)"#,
            r#"rate(foo{job="a"}[5m]) / rate(bar{job="a"}[5m])"#,
        );
    }

    #[test]
    fn test_expand_with_exprs_error() {
        let f = |q: &str| {
            for _ in 0..3 {
                if let Ok(expanded) = expand_with_exprs(q) {
                    panic!("expecting error when expanding {q:?}; got {expanded}");
                }
            }
        };

        f("");
        f("  with (");
        f("with (f(x) = x) f(1, 2)");
        f("with (x = foo) bar{x}");
    }
}
