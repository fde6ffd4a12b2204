#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::parser::parse;
    use crate::prettier::{prettier, MAX_CHARACTERS_PER_LINE};

    const MAX_LINE_LENGTH: usize = 80;

    fn check(q: &str, expected: &str, max: usize) {
        let result =
            prettier(q, max).unwrap_or_else(|e| panic!("unexpected error when prettifying {q}: {e}"));
        assert_eq!(result, expected, "unexpected result for {q}");

        // prettifying an already prettified query is a no-op
        let again = prettier(&result, max)
            .unwrap_or_else(|e| panic!("cannot prettify the prettified {q}: {e}"));
        assert_eq!(again, result);

        // the multi-line form parses into the same expression
        let orig = parse(q).unwrap();
        let parsed = parse(&result)
            .unwrap_or_else(|e| panic!("cannot parse prettified result {result}: {e}"));
        assert_eq!(parsed.to_string(), orig.to_string());
    }

    #[test]
    fn test_prettier_error() {
        let f = |q: &str| {
            if let Ok(result) = prettier(q, MAX_LINE_LENGTH) {
                panic!("expecting error for {q:?}; got {result}");
            }
        };

        f("");
        f("foo{");
        f("invalid query");
        f("unknown_func(foo)");
    }

    #[test]
    fn test_short_queries_stay_on_one_line() {
        let same = |q: &str| check(q, q, MAX_LINE_LENGTH);

        same("foo");
        same(r#"foo{bar="baz"}"#);
        same(r#"foo{bar="baz",x="y" or q="w",r="t"}"#);
        same(r#"foo{bar="baz"} + rate(x{y="x"}[5m] offset 1h)"#);
        same(r#""aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa""#);
    }

    #[test]
    fn test_short_query_is_canonicalized() {
        let f = |q: &str, expected: &str| {
            let result = prettier(q, MAX_CHARACTERS_PER_LINE).unwrap();
            assert_eq!(result, expected);
        };

        f("sum by (x) (foo)", "sum(foo) by(x)");
        f("1 + 2", "3");
        f(r#"with (x = {a="b"}) x"#, r#"{a="b"}"#);
    }

    #[test]
    fn test_long_metric_names() {
        let same = |q: &str| check(q, q, MAX_LINE_LENGTH);
        same("foobar_baz:namespace_pod_name_container_name:container_cpu_usage_seconds_total:sum_rate");

        check(
            "foobar_baz:namespace_pod_name_container_name:container_cpu_usage_seconds_total:sum_rate{}",
            "foobar_baz:namespace_pod_name_container_name:container_cpu_usage_seconds_total:sum_rate",
            MAX_LINE_LENGTH,
        );
    }

    #[test]
    fn test_label_filters() {
        let f = |q: &str, expected: &str| check(q, expected, MAX_LINE_LENGTH);

        f(
            r#"process_cpu_seconds_total{foo="bar",xjljljlkjopiwererrewre="asdfdsfdsfsdfdsfjkljlk"}"#,
            r#"process_cpu_seconds_total{
  foo="bar",xjljljlkjopiwererrewre="asdfdsfdsfsdfdsfjkljlk"
}"#,
        );
        f(
            r#"process_cpu_seconds_total{foo="bar",xjljljlkjopiwererrewre="asdfdsfdsfsdfdsfjkljlk",very_long_label_aaaaaaaaaaaaaaa="fdsfdsffdsfs"}"#,
            r#"process_cpu_seconds_total{
  foo="bar",
  xjljljlkjopiwererrewre="asdfdsfdsfsdfdsfjkljlk",
  very_long_label_aaaaaaaaaaaaaaa="fdsfdsffdsfs"
}"#,
        );
        f(
            r#"{foo="bar",xjljljlkjopiwererrewre="asdfdsfdsfsdfdsfjkljlk",very_long_label_aaaaaaaaaaaaaaa="fdsfdsffdsfs"}"#,
            r#"{
  foo="bar",
  xjljljlkjopiwererrewre="asdfdsfdsfsdfdsfjkljlk",
  very_long_label_aaaaaaaaaaaaaaa="fdsfdsffdsfs"
}"#,
        );
        f(
            r#"process_cpu_seconds_total{instance="foobar-baz",job="job1234567" or instance="lkjlkjlkjlkjlkjlkjlkjlkjlkjlk",job="lkjljlkjalkadsfdsffdsfdsfd",
		some_very_long_label="very_very_very_long_value_12397787_dfdfdfsds_dsffdfsf"}"#,
            r#"process_cpu_seconds_total{
  instance="foobar-baz",job="job1234567"
    or
  instance="lkjlkjlkjlkjlkjlkjlkjlkjlkjlk",
  job="lkjljlkjalkadsfdsffdsfdsfd",
  some_very_long_label="very_very_very_long_value_12397787_dfdfdfsds_dsffdfsf"
}"#,
        );
    }

    #[test]
    fn test_binary_operators() {
        let f = |q: &str, expected: &str| check(q, expected, MAX_LINE_LENGTH);

        f(
            r#"(sum(rate(process_cpu_seconds_total{instance="foo",job="bar"}[5m] offset 1h @ start())) by (x) / on(x) group_right(y) prefix "x" sum(rate(node_cpu_seconds_total{mode!="idle"}[5m]) keep_metric_names)) keep_metric_names"#,
            r#"(
  sum(
    rate(
      process_cpu_seconds_total{instance="foo",job="bar"}[5m] offset 1h @ start()
    )
  ) by(x)
    / on(x) group_right(y) prefix "x"
  sum(rate(node_cpu_seconds_total{mode!="idle"}[5m]) keep_metric_names)
) keep_metric_names"#,
        );
        f(
            r#"process_cpu_seconds_total{aaaaaaaaaaaaaaaaaa="bbbbbb"} offset 5m + (rate(xxxxxxxxxxxxxxxx{yyyyyyyy="aaaaaaa"}) keep_metric_names)"#,
            r#"(process_cpu_seconds_total{aaaaaaaaaaaaaaaaaa="bbbbbb"} offset 5m)
  +
(rate(xxxxxxxxxxxxxxxx{yyyyyyyy="aaaaaaa"}) keep_metric_names)"#,
        );
        f(
            r#"process_cpu_seconds_total{aaaaaaaaaaaaaaaaaa="bbbbbb",cccccccccccccccccccccc!~"ddddddddddddddddddddddd"} offset 5m + (rate(xxxxxxxxxxxxxxxx{yyyyyyyy="aaaaaaa"}) keep_metric_names)"#,
            r#"(
  process_cpu_seconds_total{
    aaaaaaaaaaaaaaaaaa="bbbbbb",
    cccccccccccccccccccccc!~"ddddddddddddddddddddddd"
  } offset 5m
)
  +
(rate(xxxxxxxxxxxxxxxx{yyyyyyyy="aaaaaaa"}) keep_metric_names)"#,
        );
    }

    #[test]
    fn test_nested_binary_operators() {
        check(
            "(foo + bar) * baz",
            "(
  foo
    +
  bar
)
  *
baz",
            10,
        );
        check(
            r#"foo{aaaa="bbbb"} > bool on(x) bar{cccc="dddd"}"#,
            r#"foo{aaaa="bbbb"}
  >bool on(x)
bar{cccc="dddd"}"#,
            30,
        );
    }

    #[test]
    fn test_rollups() {
        let f = |q: &str, expected: &str| check(q, expected, MAX_LINE_LENGTH);

        f(
            r#"process_cpu_seconds_total{foo="bar",aaaaaaaaaaaaaaaaaaaaaaaa="bbbbbbbbbbbbbbbbbbbb",c="dddddddddddd"}[5m:3s] offset 5h3m @ 12345"#,
            r#"process_cpu_seconds_total{
  foo="bar",aaaaaaaaaaaaaaaaaaaaaaaa="bbbbbbbbbbbbbbbbbbbb",c="dddddddddddd"
}[5m:3s] offset 5h3m @ 12345"#,
        );
        f(
            r#"process_cpu_seconds_total{foo="bar",aaaaaaaaaaaaaaaaaaaaaaaa="bbbbbbbbbbbbbbbbbbbb",ccccccccccccccc="dddddddddddd"}[5m:3s] offset 5h3m @ 12345"#,
            r#"process_cpu_seconds_total{
  foo="bar",
  aaaaaaaaaaaaaaaaaaaaaaaa="bbbbbbbbbbbbbbbbbbbb",
  ccccccccccccccc="dddddddddddd"
}[5m:3s] offset 5h3m @ 12345"#,
        );
    }

    #[test]
    fn test_function_args() {
        let f = |q: &str, expected: &str| check(q, expected, MAX_LINE_LENGTH);

        f(
            r#"sum without(x,y) (process_cpu_seconds_total{foo="bar",aaaaaaaaaaaaaaaaaaaaaaaa="bbbbbbbbbbbbbbbbbbbb",c="dddddddddddd"}[5m:3s] offset 5h3m @ 12345)"#,
            r#"sum(
  process_cpu_seconds_total{
    foo="bar",aaaaaaaaaaaaaaaaaaaaaaaa="bbbbbbbbbbbbbbbbbbbb",c="dddddddddddd"
  }[5m:3s] offset 5h3m @ 12345
) without(x,y)"#,
        );
        f(
            r#"clamp_min(process_cpu_seconds_total{aaaaaaaaaaaaaaaaaaaaaaaaa="bbbb",cccccc="dddd",ppppppppppppppppppppppppp=~"xxxxxxx"}, 123, "456")"#,
            r#"clamp_min(
  process_cpu_seconds_total{
    aaaaaaaaaaaaaaaaaaaaaaaaa="bbbb",
    cccccc="dddd",
    ppppppppppppppppppppppppp=~"xxxxxxx"
  },
  123,
  "456"
)"#,
        );
    }

    #[test]
    fn test_lines_fit_when_possible() {
        let q = r#"sum(rate(http_requests_total{job="api-server",instance="10.0.0.1:8080",handler="/api/v1/query"}[5m])) by (job) / sum(rate(http_requests_total{job="api-server"}[5m])) by (job)"#;
        for max in [40, 60, 80, 100] {
            let result = prettier(q, max).unwrap();
            for line in result.lines() {
                assert!(line.len() <= max, "line {line:?} is longer than {max}");
            }
        }
    }
}
