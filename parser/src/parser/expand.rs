use std::sync::OnceLock;

use itertools::Itertools;
use tracing::{debug, trace};

use crate::ast::{
    AggregateModifier, AggregationExpr, BinaryExpr, DurationExpr, Expr, FunctionExpr,
    GroupModifier, InterpolatedSelector, JoinModifier, MetricExpr, ParensExpr, RollupExpr,
    StringExpr, StringLiteral, WithArgExpr,
};
use crate::label::{remove_duplicate_label_filters, LabelFilter};
use crate::parser::{parse, parse_raw, ArgCountError, ParseError, ParseResult};

/// Maximum nesting of WITH template expansions.
pub const MAX_EXPANSION_DEPTH: usize = 64;

/// Templates available in every query: `ru` is the resource utilization in percent,
/// `ttf` is the time left until the resource is exhausted.
const BUILTIN_TEMPLATES: [(&str, &[&str], &str); 2] = [
    (
        "ru",
        &["freev", "maxv"],
        "clamp_min(maxv - clamp_min(freev, 0), 0) / clamp_min(maxv, 0) * 100",
    ),
    (
        "ttf",
        &["freev"],
        "smooth_exponential(clamp_max(clamp_max(-freev, 0) / clamp_max(deriv_fast(freev), 0), 365*24*3600), clamp_max(step()/300, 1))",
    ),
];

fn builtin_templates() -> &'static [WithArgExpr] {
    static BUILTINS: OnceLock<Vec<WithArgExpr>> = OnceLock::new();
    BUILTINS.get_or_init(|| {
        BUILTIN_TEMPLATES
            .iter()
            .filter_map(|(name, args, body)| match parse_raw(body) {
                Ok(expr) => {
                    let args = args.iter().map(|a| a.to_string()).collect();
                    Some(WithArgExpr::new(*name, expr, args))
                }
                Err(err) => {
                    debug!(template = name, error = %err, "cannot parse builtin WITH template");
                    None
                }
            })
            .collect()
    })
}

/// Expands WITH templates in `q` and returns the resulting query.
///
/// ```
/// use metricsql_parser::parser::expand_with_exprs;
///
/// let expanded = expand_with_exprs("with (f(x) = x * 2) f(foo)").unwrap();
/// assert_eq!(expanded, "foo * 2");
/// ```
pub fn expand_with_exprs(q: &str) -> ParseResult<String> {
    let expr = parse(q)?;
    Ok(expr.to_string())
}

/// Replaces every WITH expression and template reference in `expr` with its expansion.
pub(super) fn expand_templates(expr: &Expr) -> ParseResult<Expr> {
    let root = Scope {
        parent: None,
        bindings: Bindings::Templates(builtin_templates()),
    };
    Expander::default().expand(expr, &root)
}

#[derive(Clone, Copy)]
enum Bindings<'a> {
    /// The templates of a `with (...)` block.
    Templates(&'a [WithArgExpr]),
    /// Expanded arguments of a template call, bound to its parameter names.
    Args(&'a [(String, Expr)]),
}

/// A level of name bindings. Scopes are chained from the innermost to the root.
#[derive(Clone, Copy)]
struct Scope<'a> {
    parent: Option<&'a Scope<'a>>,
    bindings: Bindings<'a>,
}

enum Resolved<'a> {
    /// A template along with the scope its body is expanded in.
    Template(&'a WithArgExpr, Scope<'a>),
    /// An already expanded template argument.
    Value(&'a Expr),
}

impl<'a> Scope<'a> {
    fn lookup(&self, name: &str) -> Option<Resolved<'a>> {
        match self.bindings {
            Bindings::Templates(was) => {
                if let Some(i) = was.iter().position(|wa| wa.name == name) {
                    // the body sees only the templates declared before it
                    let def = Scope {
                        parent: self.parent,
                        bindings: Bindings::Templates(&was[..i]),
                    };
                    return Some(Resolved::Template(&was[i], def));
                }
            }
            Bindings::Args(args) => {
                if let Some((_, value)) = args.iter().find(|(n, _)| n == name) {
                    return Some(Resolved::Value(value));
                }
            }
        }
        self.parent?.lookup(name)
    }
}

#[derive(Default)]
struct Expander {
    depth: usize,
}

impl Expander {
    fn expand(&mut self, expr: &Expr, scope: &Scope) -> ParseResult<Expr> {
        match expr {
            Expr::NumberLiteral(_) | Expr::Duration(_) | Expr::StringLiteral(_) => Ok(expr.clone()),
            Expr::StringExpr(se) => {
                let value = self.resolve_string(se, scope)?;
                Ok(Expr::StringLiteral(StringLiteral(value)))
            }
            Expr::Function(fe) => self.expand_function(fe, scope),
            Expr::Aggregation(ae) => self.expand_aggregation(ae, scope),
            Expr::BinaryOperator(be) => self.expand_binary(be, scope),
            Expr::Rollup(re) => self.expand_rollup(re, scope),
            Expr::Parens(pe) => {
                let mut args = self.expand_args(&pe.expressions, scope)?;
                if args.len() == 1 {
                    return Ok(args.remove(0));
                }
                Ok(Expr::Parens(ParensExpr::new(args)))
            }
            Expr::MetricExpression(me) => self.expand_metric_name(me.clone(), scope),
            Expr::WithSelector(ws) => self.expand_selector(ws, scope),
            Expr::With(we) => {
                let child = Scope {
                    parent: Some(scope),
                    bindings: Bindings::Templates(&we.was),
                };
                self.expand(&we.expr, &child)
            }
        }
    }

    fn expand_args(&mut self, args: &[Expr], scope: &Scope) -> ParseResult<Vec<Expr>> {
        args.iter().map(|arg| self.expand(arg, scope)).collect()
    }

    /// Expands a reference to `name`. `args` is `None` for a bare reference and holds the
    /// expanded arguments for a call.
    fn call(&mut self, name: &str, resolved: Resolved, args: Option<Vec<Expr>>) -> ParseResult<Expr> {
        match resolved {
            Resolved::Template(wa, def) => self.expand_template(wa, &def, args),
            Resolved::Value(value) => match args {
                Some(args) if !args.is_empty() => Err(ParseError::InvalidArgCount(
                    ArgCountError::new(name, 0, args.len()),
                )),
                _ => Ok(value.clone()),
            },
        }
    }

    fn expand_template(
        &mut self,
        wa: &WithArgExpr,
        def: &Scope,
        args: Option<Vec<Expr>>,
    ) -> ParseResult<Expr> {
        let args = match args {
            // `f` for `f(a)` is a plain metric name
            None if !wa.args.is_empty() => {
                return Ok(Expr::MetricExpression(MetricExpr::new(wa.name.as_str())))
            }
            None => vec![],
            Some(args) => args,
        };
        if args.len() != wa.args.len() {
            let signature = format!("{}({})", wa.name, wa.args.join(", "));
            return Err(ParseError::InvalidArgCount(ArgCountError::new(
                &signature,
                wa.args.len(),
                args.len(),
            )));
        }

        if self.depth >= MAX_EXPANSION_DEPTH {
            return Err(ParseError::WithExprExpansionError(format!(
                "too deep nesting of WITH templates at {:?}; the maximum depth is {MAX_EXPANSION_DEPTH}",
                wa.name
            )));
        }
        trace!(template = %wa.name, args = args.len(), "expanding WITH template");

        self.depth += 1;
        let res = if wa.args.is_empty() {
            self.expand(&wa.expr, def)
        } else {
            let bound: Vec<(String, Expr)> = wa.args.iter().cloned().zip(args).collect();
            let scope = Scope {
                parent: Some(def),
                bindings: Bindings::Args(&bound),
            };
            self.expand(&wa.expr, &scope)
        };
        self.depth -= 1;
        res
    }

    fn expand_function(&mut self, fe: &FunctionExpr, scope: &Scope) -> ParseResult<Expr> {
        let args = self.expand_args(&fe.args, scope)?;
        let Some(resolved) = scope.lookup(&fe.name) else {
            let mut res = FunctionExpr::new(fe.name.as_str(), args);
            res.keep_metric_names = fe.keep_metric_names;
            return Ok(Expr::Function(res));
        };
        let mut res = self.call(&fe.name, resolved, Some(args))?;
        if fe.keep_metric_names {
            match &mut res {
                Expr::Function(f) => f.keep_metric_names = true,
                Expr::BinaryOperator(be) => be.keep_metric_names = true,
                _ => {}
            }
        }
        Ok(res)
    }

    fn expand_aggregation(&mut self, ae: &AggregationExpr, scope: &Scope) -> ParseResult<Expr> {
        let args = self.expand_args(&ae.args, scope)?;
        if let Some(resolved) = scope.lookup(&ae.name) {
            return self.call(&ae.name, resolved, Some(args));
        }

        let mut res = AggregationExpr::new(ae.name.as_str(), args);
        res.limit = ae.limit;
        res.modifier = match &ae.modifier {
            Some(AggregateModifier::By(labels)) => {
                Some(AggregateModifier::By(self.expand_labels(labels, scope)?))
            }
            Some(AggregateModifier::Without(labels)) => {
                Some(AggregateModifier::Without(self.expand_labels(labels, scope)?))
            }
            None => None,
        };
        Ok(Expr::Aggregation(res))
    }

    fn expand_binary(&mut self, be: &BinaryExpr, scope: &Scope) -> ParseResult<Expr> {
        let left = self.expand(&be.left, scope)?;
        let right = self.expand(&be.right, scope)?;

        let mut res = BinaryExpr::new(be.op, left, right);
        res.bool_modifier = be.bool_modifier;
        res.keep_metric_names = be.keep_metric_names;
        if let Some(gm) = &be.group_modifier {
            let labels = self.expand_labels(&gm.labels, scope)?;
            res.group_modifier = Some(GroupModifier::new(gm.op, labels));
        }
        if let Some(jm) = &be.join_modifier {
            let labels = self.expand_labels(&jm.labels, scope)?;
            res.join_modifier = Some(JoinModifier::new(jm.op, labels));
        }
        if let Some(prefix) = &be.join_modifier_prefix {
            let prefix = self.resolve_string(prefix, scope)?;
            res.join_modifier_prefix = Some(StringExpr::new(prefix));
        }
        Ok(Expr::BinaryOperator(res))
    }

    fn expand_rollup(&mut self, re: &RollupExpr, scope: &Scope) -> ParseResult<Expr> {
        let mut res = RollupExpr::new(self.expand(&re.expr, scope)?);
        res.window = self.resolve_duration(re.window.as_ref(), scope)?;
        res.step = self.resolve_duration(re.step.as_ref(), scope)?;
        res.offset = self.resolve_duration(re.offset.as_ref(), scope)?;
        res.inherit_step = re.inherit_step;
        if let Some(at) = &re.at {
            res.at = Some(Box::new(self.expand(at, scope)?));
        }
        Ok(Expr::Rollup(res))
    }

    fn resolve_duration(
        &mut self,
        de: Option<&DurationExpr>,
        scope: &Scope,
    ) -> ParseResult<Option<DurationExpr>> {
        let Some(de) = de else {
            return Ok(None);
        };
        let Some(name) = de.template_name() else {
            return Ok(Some(de.clone()));
        };
        let Some(resolved) = scope.lookup(name) else {
            return Err(ParseError::WithExprExpansionError(format!(
                "cannot find WITH template for {name:?}"
            )));
        };
        match self.call(name, resolved, None)? {
            Expr::Duration(d) => Ok(Some(d)),
            Expr::NumberLiteral(n) => Ok(Some(DurationExpr::new(n.to_string()))),
            other => Err(ParseError::WithExprExpansionError(format!(
                "expecting a duration for {name:?}; got {other}"
            ))),
        }
    }

    /// Expands grouping labels. A label referring to a template is replaced by the metric
    /// name(s) the template resolves to, i.e. `x` in `by (x)` for `x = (job, instance)`.
    fn expand_labels(&mut self, labels: &[String], scope: &Scope) -> ParseResult<Vec<String>> {
        let mut res = Vec::with_capacity(labels.len());
        for label in labels {
            let resolved = match scope.lookup(label) {
                None => {
                    res.push(label.clone());
                    continue;
                }
                Some(Resolved::Template(wa, _)) if !wa.args.is_empty() => {
                    res.push(label.clone());
                    continue;
                }
                Some(resolved) => resolved,
            };
            match self.call(label, resolved, None)? {
                Expr::MetricExpression(me) if me.is_only_metric_name() => {
                    res.extend(me.metric_name().map(str::to_string));
                }
                Expr::Parens(pe) => {
                    for e in &pe.expressions {
                        match e {
                            Expr::MetricExpression(me) if me.is_only_metric_name() => {
                                res.extend(me.metric_name().map(str::to_string));
                            }
                            _ => return Err(invalid_label(label, e)),
                        }
                    }
                }
                other => return Err(invalid_label(label, &other)),
            }
        }
        Ok(res.into_iter().unique().collect())
    }

    /// Concatenates a string expression, replacing template names with their string values.
    fn resolve_string(&mut self, se: &StringExpr, scope: &Scope) -> ParseResult<String> {
        se.resolve(|ident| {
            let Some(resolved) = scope.lookup(ident) else {
                return Ok(None);
            };
            match self.call(ident, resolved, None)? {
                Expr::StringLiteral(s) => Ok(Some(s.0)),
                other => Err(ParseError::WithExprExpansionError(format!(
                    "{ident:?} must be a string in {se}; got {other}"
                ))),
            }
        })
    }

    fn expand_selector(&mut self, ws: &InterpolatedSelector, scope: &Scope) -> ParseResult<Expr> {
        let has_splices = ws.matchers.iter().flatten().any(|lfe| lfe.is_variable());

        let mut groups = Vec::with_capacity(ws.matchers.len());
        for group in &ws.matchers {
            let mut filters = Vec::with_capacity(group.len());
            for lfe in group {
                if lfe.is_variable() {
                    filters.extend(self.splice_label_filters(&lfe.label, scope)?);
                    continue;
                }
                let value = self.resolve_string(&lfe.value, scope)?;
                filters.push(LabelFilter::new(lfe.op, lfe.label.as_str(), value)?);
            }
            if has_splices {
                remove_duplicate_label_filters(&mut filters);
            }
            groups.push(filters);
        }

        self.expand_metric_name(MetricExpr::with_or_filters(groups), scope)
    }

    /// Returns the filters for the `x` splice in `{x, ...}`.
    fn splice_label_filters(&mut self, name: &str, scope: &Scope) -> ParseResult<Vec<LabelFilter>> {
        let Some(resolved) = scope.lookup(name) else {
            return Err(ParseError::WithExprExpansionError(format!(
                "cannot find WITH template for {name:?} inside label filters"
            )));
        };
        match self.call(name, resolved, None)? {
            Expr::MetricExpression(me) if me.metric_name().is_none() => {
                if me.filters.len() > 1 {
                    return Err(ParseError::WithExprExpansionError(format!(
                        "{name:?} must not contain `or` filters; got {me}"
                    )));
                }
                Ok(me.filters.into_iter().next().unwrap_or_default())
            }
            other => Err(ParseError::WithExprExpansionError(format!(
                "{name:?} must be filters in curly braces without a metric name; got {other}"
            ))),
        }
    }

    /// Replaces the metric name with the template of the same name, merging the rest of
    /// the filters into the template's selector.
    fn expand_metric_name(&mut self, me: MetricExpr, scope: &Scope) -> ParseResult<Expr> {
        let Some(name) = me.metric_name().map(str::to_string) else {
            return Ok(Expr::MetricExpression(me));
        };
        let resolved = match scope.lookup(&name) {
            None => return Ok(Expr::MetricExpression(me)),
            Some(Resolved::Template(wa, _)) if !wa.args.is_empty() => {
                return Ok(Expr::MetricExpression(me))
            }
            Some(resolved) => resolved,
        };
        let value = self.call(&name, resolved, None)?;

        let rest: Vec<Vec<LabelFilter>> = me
            .filters
            .into_iter()
            .map(|group| {
                group
                    .into_iter()
                    .filter(|lf| !(lf.is_metric_name_filter() && lf.value == name))
                    .collect()
            })
            .collect();
        if rest.iter().all(|g| g.is_empty()) {
            return Ok(value);
        }

        match value {
            Expr::MetricExpression(vme) => Ok(Expr::MetricExpression(merge_filters(&name, vme, &rest)?)),
            Expr::Rollup(mut re) => match std::mem::take(re.expr.as_mut()) {
                Expr::MetricExpression(vme) => {
                    re.expr = Box::new(Expr::MetricExpression(merge_filters(&name, vme, &rest)?));
                    Ok(Expr::Rollup(re))
                }
                inner => {
                    re.expr = Box::new(inner);
                    Err(cannot_add_filters(&name, &Expr::Rollup(re)))
                }
            },
            other => Err(cannot_add_filters(&name, &other)),
        }
    }
}

/// Builds the cross product of the template's `or` groups and the reference's groups.
fn merge_filters(name: &str, me: MetricExpr, rest: &[Vec<LabelFilter>]) -> ParseResult<MetricExpr> {
    if me.filters.len() > 1 && rest.len() > 1 {
        return Err(ParseError::WithExprExpansionError(format!(
            "cannot merge `or` filters of {me} with `or` filters at {name:?}"
        )));
    }
    let mut template_groups = me.filters;
    if template_groups.is_empty() {
        template_groups.push(vec![]);
    }

    let mut filters = Vec::with_capacity(template_groups.len() * rest.len());
    for tg in &template_groups {
        for rg in rest {
            let mut group = Vec::with_capacity(tg.len() + rg.len());
            group.extend(tg.iter().cloned());
            group.extend(rg.iter().cloned());
            remove_duplicate_label_filters(&mut group);
            filters.push(group);
        }
    }
    Ok(MetricExpr::with_or_filters(filters))
}

fn cannot_add_filters(name: &str, expr: &Expr) -> ParseError {
    ParseError::WithExprExpansionError(format!(
        "cannot add label filters to {name:?}, since it expands to {expr}"
    ))
}

fn invalid_label(label: &str, expr: &Expr) -> ParseError {
    ParseError::WithExprExpansionError(format!(
        "{label:?} must expand to a label name or a list of label names; got {expr}"
    ))
}
