use std::fmt;
use std::fmt::{Display, Formatter};
use std::ops::Neg;

use serde::{Deserialize, Serialize};

use crate::ast::{InterpolatedSelector, StringExpr};
use crate::common::{format_number, write_comma_separated, write_label_list, Operator};
use crate::label::{LabelFilter, NAME_LABEL};
use crate::lexer::{duration_value, escape_ident, parse_number, quote};
use crate::parser::{ParseError, ParseResult};

pub type BExpr = Box<Expr>;

// See https://prometheus.io/docs/prometheus/latest/querying/operators/#vector-matching
#[derive(Debug, Clone, PartialEq, Eq, Copy, Hash, Serialize, Deserialize)]
pub enum GroupModifierOp {
    On,
    Ignoring,
}

impl Display for GroupModifierOp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        use GroupModifierOp::*;
        match self {
            On => write!(f, "on")?,
            Ignoring => write!(f, "ignoring")?,
        }
        Ok(())
    }
}

impl TryFrom<&str> for GroupModifierOp {
    type Error = ParseError;

    fn try_from(op: &str) -> Result<Self, Self::Error> {
        use GroupModifierOp::*;

        match op {
            op if op.eq_ignore_ascii_case("on") => Ok(On),
            op if op.eq_ignore_ascii_case("ignoring") => Ok(Ignoring),
            _ => Err(ParseError::General(format!(
                "Unknown group_modifier op: {op}",
            ))),
        }
    }
}

/// GroupModifier represents `on(...)` or `ignoring(...)` part of a binary operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupModifier {
    pub op: GroupModifierOp,
    pub labels: Vec<String>,
}

impl GroupModifier {
    pub fn new(op: GroupModifierOp, labels: Vec<String>) -> Self {
        GroupModifier { op, labels }
    }

    pub fn on<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Self {
        Self::new(GroupModifierOp::On, labels.into_iter().map(Into::into).collect())
    }

    pub fn ignoring<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Self {
        Self::new(
            GroupModifierOp::Ignoring,
            labels.into_iter().map(Into::into).collect(),
        )
    }
}

impl Display for GroupModifier {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.op)?;
        write_label_list(&self.labels, f)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Copy, Hash, Serialize, Deserialize)]
pub enum JoinModifierOp {
    GroupLeft,
    GroupRight,
}

impl Display for JoinModifierOp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        use JoinModifierOp::*;
        match self {
            GroupLeft => write!(f, "group_left")?,
            GroupRight => write!(f, "group_right")?,
        }
        Ok(())
    }
}

impl TryFrom<&str> for JoinModifierOp {
    type Error = ParseError;

    fn try_from(op: &str) -> Result<Self, Self::Error> {
        use JoinModifierOp::*;

        match op {
            op if op.eq_ignore_ascii_case("group_left") => Ok(GroupLeft),
            op if op.eq_ignore_ascii_case("group_right") => Ok(GroupRight),
            _ => {
                let msg = format!("Unknown join_modifier op: {}", op);
                Err(ParseError::General(msg))
            }
        }
    }
}

/// JoinModifier represents `group_left(...)` or `group_right(...)` part of a binary operation.
/// A lone `*` label means "all labels".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinModifier {
    pub op: JoinModifierOp,
    pub labels: Vec<String>,
}

impl JoinModifier {
    pub fn new(op: JoinModifierOp, labels: Vec<String>) -> Self {
        JoinModifier { op, labels }
    }

    pub fn is_group_left(&self) -> bool {
        self.op == JoinModifierOp::GroupLeft
    }

    pub fn is_group_right(&self) -> bool {
        self.op == JoinModifierOp::GroupRight
    }
}

impl Display for JoinModifier {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.op)?;
        if let [star] = self.labels.as_slice() {
            if star == "*" {
                return write!(f, "(*)");
            }
        }
        write_label_list(&self.labels, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateModifier {
    By(Vec<String>),
    Without(Vec<String>),
}

impl AggregateModifier {
    pub fn get_args(&self) -> &Vec<String> {
        match self {
            AggregateModifier::By(val) => val,
            AggregateModifier::Without(val) => val,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.get_args().is_empty()
    }
}

impl Display for AggregateModifier {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            AggregateModifier::By(vec) => {
                write!(f, "by")?;
                write_label_list(vec, f)?;
            }
            AggregateModifier::Without(vec) => {
                write!(f, "without")?;
                write_label_list(vec, f)?;
            }
        }
        Ok(())
    }
}

/// NumberLiteral represents number expression.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct NumberLiteral {
    /// value is the parsed number, i.e. `1.23`, `-234`, etc.
    pub value: f64,

    /// text is the literal as written in the query, i.e. `0x12` or `12Ki`.
    /// Numbers produced by constant folding have no text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl NumberLiteral {
    pub fn new(v: f64) -> Self {
        NumberLiteral {
            value: v,
            text: None,
        }
    }

    pub(crate) fn from_token(token: &str) -> ParseResult<Self> {
        let value = parse_number(token)?;
        Ok(NumberLiteral {
            value,
            text: Some(token.to_string()),
        })
    }
}

impl PartialEq for NumberLiteral {
    fn eq(&self, other: &Self) -> bool {
        // Special handling for nan == nan.
        self.value == other.value || self.value.is_nan() && other.value.is_nan()
    }
}

impl Display for NumberLiteral {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match &self.text {
            Some(text) => write!(f, "{text}"),
            None => write!(f, "{}", format_number(self.value)),
        }
    }
}

impl Neg for NumberLiteral {
    type Output = NumberLiteral;

    fn neg(self) -> Self::Output {
        NumberLiteral::new(-self.value)
    }
}

impl From<f64> for NumberLiteral {
    fn from(value: f64) -> Self {
        NumberLiteral::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StringLiteral(pub String);

impl StringLiteral {
    pub fn new<S: Into<String>>(s: S) -> Self {
        StringLiteral(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for StringLiteral {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", quote(&self.0))
    }
}

/// DurationExpr contains a duration as written in the query, i.e. `5m`, `1h30m`, `-5m`,
/// `3600` or `5i`. Inside WITH templates it may also hold the name of a template which
/// is replaced by a duration during expansion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DurationExpr {
    text: String,
    #[serde(default)]
    needs_parsing: bool,
}

impl DurationExpr {
    pub fn new<S: Into<String>>(text: S) -> Self {
        DurationExpr {
            text: text.into(),
            needs_parsing: false,
        }
    }

    pub(crate) fn template<S: Into<String>>(ident: S) -> Self {
        DurationExpr {
            text: ident.into(),
            needs_parsing: true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns the template name if the duration must be resolved by WITH expansion.
    pub fn template_name(&self) -> Option<&str> {
        self.needs_parsing.then_some(self.text.as_str())
    }

    /// Returns true if the duration is expressed in step multiples, i.e. `5i`.
    pub fn requires_step(&self) -> bool {
        !self.needs_parsing && self.text.ends_with(|c| c == 'i' || c == 'I')
    }

    /// Returns the duration in milliseconds. `step` is used for `i` units.
    pub fn value(&self, step: i64) -> ParseResult<i64> {
        if self.needs_parsing {
            return Err(ParseError::InvalidDuration(format!(
                "unresolved duration template {}",
                self.text
            )));
        }
        match duration_value(&self.text, step) {
            Ok(d) => Ok(d),
            Err(err) => match parse_number(&self.text) {
                Ok(secs) => Ok((secs * 1000.0) as i64),
                Err(_) => Err(err),
            },
        }
    }

    /// Same as `value`, but fails on negative durations.
    pub fn non_negative_value(&self, step: i64) -> ParseResult<i64> {
        let value = self.value(step)?;
        if value < 0 {
            return Err(ParseError::InvalidDuration(format!(
                "duration cannot be negative; got {}",
                self.text
            )));
        }
        Ok(value)
    }
}

impl Display for DurationExpr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.needs_parsing {
            return write!(f, "{}", escape_ident(&self.text));
        }
        write!(f, "{}", self.text)
    }
}

/// MetricExpr represents MetricsQL metric with optional filters, i.e. `foo{...}`.
///
/// Every inner list is an AND-group of filters; the groups are joined with `or`.
/// The metric name is a `__name__="..."` filter at the start of each group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricExpr {
    pub filters: Vec<Vec<LabelFilter>>,
}

impl MetricExpr {
    pub fn new<S: Into<String>>(name: S) -> MetricExpr {
        MetricExpr {
            filters: vec![vec![LabelFilter::equal(NAME_LABEL.to_string(), name.into())]],
        }
    }

    pub fn with_filters(filters: Vec<LabelFilter>) -> Self {
        MetricExpr {
            filters: vec![filters],
        }
    }

    pub fn with_or_filters(filters: Vec<Vec<LabelFilter>>) -> Self {
        MetricExpr { filters }
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() || self.filters.iter().all(|g| g.is_empty())
    }

    /// Returns the metric name if every group starts with the same `__name__` equality filter.
    pub fn metric_name(&self) -> Option<&str> {
        let (first, rest) = self.filters.split_first()?;
        let name = group_metric_name(first)?;
        if rest.iter().all(|g| group_metric_name(g) == Some(name)) {
            return Some(name);
        }
        None
    }

    /// Returns true for a bare `foo` selector.
    pub fn is_only_metric_name(&self) -> bool {
        self.metric_name().is_some() && self.filters.iter().all(|g| g.len() == 1)
    }

    pub fn has_or_filters(&self) -> bool {
        self.filters.len() > 1
    }
}

fn group_metric_name(group: &[LabelFilter]) -> Option<&str> {
    match group.first() {
        Some(lf) if lf.is_metric_name_filter() && !lf.value.is_empty() => Some(&lf.value),
        _ => None,
    }
}

impl MetricExpr {
    /// Splits the selector into its rendered metric name and the non-empty filter groups
    /// left inside the braces.
    pub(crate) fn name_and_groups(&self) -> (Option<&str>, Vec<&[LabelFilter]>) {
        let name = self.metric_name();
        let offset = usize::from(name.is_some());
        let groups = self
            .filters
            .iter()
            .map(|g| &g[offset..])
            .filter(|g| !g.is_empty())
            .collect();
        (name, groups)
    }
}

impl Display for MetricExpr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let (name, groups) = self.name_and_groups();
        if let Some(name) = name {
            write!(f, "{}", escape_ident(name))?;
        }
        if groups.is_empty() {
            if name.is_none() {
                write!(f, "{{}}")?;
            }
            return Ok(());
        }
        write!(f, "{{")?;
        for (i, group) in groups.iter().enumerate() {
            if i > 0 {
                write!(f, " or ")?;
            }
            for (j, lf) in group.iter().enumerate() {
                if j > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{lf}")?;
            }
        }
        write!(f, "}}")
    }
}

/// FunctionExpr represents MetricsQL function such as `rate(...)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionExpr {
    /// name is the function name, kept in the case it was written.
    pub name: String,

    /// args contains function args.
    pub args: Vec<Expr>,

    /// If keep_metric_names is set to true, then the function should keep metric names.
    #[serde(default)]
    pub keep_metric_names: bool,
}

impl FunctionExpr {
    pub fn new<S: Into<String>>(name: S, args: Vec<Expr>) -> Self {
        FunctionExpr {
            name: name.into(),
            args,
            keep_metric_names: false,
        }
    }
}

impl Display for FunctionExpr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", escape_ident(&self.name))?;
        write_comma_separated(self.args.iter(), f, true)?;
        if self.keep_metric_names {
            write!(f, " keep_metric_names")?;
        }
        Ok(())
    }
}

/// AggregationExpr represents aggregate function such as `sum(...) by (...)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationExpr {
    /// name is the aggregation function name in lower case.
    pub name: String,

    /// args is the aggregate function args.
    pub args: Vec<Expr>,

    /// modifier is optional modifier such as `by (...)` or `without (...)`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifier: Option<AggregateModifier>,

    /// Optional limit for the number of output time series.
    /// This is MetricsQL extension.
    ///
    /// Example: `sum(...) by (...) limit 10` would return maximum 10 time series.
    #[serde(default)]
    pub limit: usize,
}

impl AggregationExpr {
    pub fn new<S: Into<String>>(name: S, args: Vec<Expr>) -> Self {
        AggregationExpr {
            name: name.into(),
            args,
            modifier: None,
            limit: 0,
        }
    }

    pub fn with_modifier(mut self, modifier: AggregateModifier) -> Self {
        self.modifier = Some(modifier);
        self
    }
}

impl Display for AggregationExpr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", escape_ident(&self.name))?;
        write_comma_separated(self.args.iter(), f, true)?;
        if let Some(modifier) = &self.modifier {
            write!(f, " {}", modifier)?;
        }
        if self.limit > 0 {
            write!(f, " limit {}", self.limit)?;
        }
        Ok(())
    }
}

/// RollupExpr represents an MetricsQL expression which contains at least `offset` or `[...]` part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollupExpr {
    /// The expression for the rollup. Usually it is MetricExpr, but may be arbitrary expr
    /// if subquery is used. https://prometheus.io/blog/2019/01/28/subquery-support/
    pub expr: BExpr,

    /// window contains optional window value from square brackets. Equivalent to `range` in
    /// prometheus terminology
    ///
    /// For example, `http_requests_total[5m]` will have window value `5m`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<DurationExpr>,

    /// step contains optional step value from square brackets. Equivalent to `resolution`
    /// in the prometheus docs
    ///
    /// For example, `foobar[1h:3m]` will have step value `3m`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<DurationExpr>,

    /// offset contains optional value from `offset` part.
    ///
    /// For example, `foobar{baz="aa"} offset 5m` will have offset value `5m`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<DurationExpr>,

    /// if set to true, then `foo[1h:]` would print the same instead of `foo[1h]`.
    #[serde(default)]
    pub inherit_step: bool,

    /// at contains an optional expression after `@` modifier.
    ///
    /// For example, `foo @ end()` or `bar[5m] @ 12345`
    /// See https://prometheus.io/docs/prometheus/latest/querying/basics/#modifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at: Option<BExpr>,
}

impl RollupExpr {
    pub fn new(expr: Expr) -> Self {
        RollupExpr {
            expr: Box::new(expr),
            window: None,
            offset: None,
            step: None,
            inherit_step: false,
            at: None,
        }
    }

    pub fn for_subquery(&self) -> bool {
        self.step.is_some() || self.inherit_step
    }

    pub fn wraps_metric_expr(&self) -> bool {
        matches!(*self.expr, Expr::MetricExpression(_))
    }

    pub(crate) fn has_offset_or_at(&self) -> bool {
        self.offset.is_some() || self.at.is_some()
    }

    /// Writes `[window:step] offset X @ Y`.
    pub(crate) fn fmt_suffix(&self, f: &mut Formatter) -> fmt::Result {
        if self.window.is_some() || self.inherit_step || self.step.is_some() {
            write!(f, "[")?;
            if let Some(win) = &self.window {
                write!(f, "{}", win)?;
            }
            if let Some(step) = &self.step {
                write!(f, ":{}", step)?;
            } else if self.inherit_step {
                write!(f, ":")?;
            }
            write!(f, "]")?;
        }
        if let Some(offset) = &self.offset {
            write!(f, " offset {}", offset)?;
        }
        if let Some(at) = &self.at {
            if at.is_binary_op() {
                write!(f, " @ ({})", at)?;
            } else {
                write!(f, " @ {}", at)?;
            }
        }
        Ok(())
    }

    pub(crate) fn inner_needs_parens(&self) -> bool {
        match self.expr.as_ref() {
            Expr::Rollup(_) => true,
            Expr::BinaryOperator(_) => true,
            Expr::Aggregation(ae) => ae.modifier.is_some(),
            _ => false,
        }
    }
}

impl Display for RollupExpr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.inner_needs_parens() {
            write!(f, "({})", self.expr)?;
        } else {
            write!(f, "{}", self.expr)?;
        }
        self.fmt_suffix(f)
    }
}

/// BinaryExpr represents a binary operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpr {
    /// left contains left arg for the `left op right` expression.
    pub left: BExpr,

    /// right contains right arg for the `left op right` expression.
    pub right: BExpr,

    /// op is the operation itself, i.e. `+`, `-`, `*`, etc.
    pub op: Operator,

    /// bool_modifier indicates whether `bool` modifier is present.
    /// For example, `foo >bool bar`.
    #[serde(default)]
    pub bool_modifier: bool,

    /// group_modifier contains modifier such as "on" or "ignoring".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_modifier: Option<GroupModifier>,

    /// join_modifier contains modifier such as "group_left" or "group_right".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_modifier: Option<JoinModifier>,

    /// join_modifier_prefix is an optional prefix to add to labels specified inside group_left()
    /// or group_right() lists.
    ///
    /// The syntax is `group_left(foo,bar) prefix "abc"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_modifier_prefix: Option<StringExpr>,

    /// If keep_metric_names is set to true, then the operation should keep metric names.
    #[serde(default)]
    pub keep_metric_names: bool,
}

impl BinaryExpr {
    pub fn new(op: Operator, left: Expr, right: Expr) -> Self {
        BinaryExpr {
            left: Box::new(left),
            right: Box::new(right),
            op,
            bool_modifier: false,
            group_modifier: None,
            join_modifier: None,
            join_modifier_prefix: None,
            keep_metric_names: false,
        }
    }

    pub fn is_matching_on(&self) -> bool {
        matches!(&self.group_modifier, Some(gm) if gm.op == GroupModifierOp::On)
    }

    fn fmt_no_keep_metric_names(&self, f: &mut Formatter) -> fmt::Result {
        if self.left_needs_parens() {
            write!(f, "({})", self.left)?;
        } else {
            write!(f, "{}", self.left)?;
        }
        write!(f, " ")?;
        self.fmt_modifiers(f)?;
        if self.right_needs_parens() {
            write!(f, " ({})", self.right)
        } else {
            write!(f, " {}", self.right)
        }
    }

    /// Writes the operator followed by its `bool`, matching and join modifiers.
    pub(crate) fn fmt_modifiers(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.op)?;
        if self.bool_modifier {
            write!(f, "bool")?;
        }
        if let Some(modifier) = &self.group_modifier {
            write!(f, " {}", modifier)?;
        }
        if let Some(modifier) = &self.join_modifier {
            write!(f, " {}", modifier)?;
        }
        if let Some(prefix) = &self.join_modifier_prefix {
            write!(f, " prefix {}", prefix)?;
        }
        Ok(())
    }

    pub(crate) fn left_needs_parens(&self) -> bool {
        match self.left.as_ref() {
            Expr::BinaryOperator(_) => true,
            Expr::Rollup(re) => re.has_offset_or_at(),
            // `-1 ^ 2` is parsed as `0 - (1 ^ 2)`
            Expr::NumberLiteral(n) => {
                self.op == Operator::Pow && n.value.is_sign_negative() && n.text.is_none()
            }
            _ => false,
        }
    }

    pub(crate) fn right_needs_parens(&self) -> bool {
        match self.right.as_ref() {
            Expr::BinaryOperator(_) => true,
            Expr::Rollup(re) => re.has_offset_or_at(),
            Expr::Function(fe) => fe.keep_metric_names || is_reserved_binary_op_ident(&fe.name),
            Expr::MetricExpression(me) => me
                .metric_name()
                .map_or(false, is_reserved_binary_op_ident),
            _ => false,
        }
    }
}

impl Display for BinaryExpr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.keep_metric_names {
            write!(f, "(")?;
            self.fmt_no_keep_metric_names(f)?;
            write!(f, ") keep_metric_names")?;
        } else {
            self.fmt_no_keep_metric_names(f)?;
        }
        Ok(())
    }
}

/// Identifiers which may follow a binary operator as modifiers.
/// A metric with such a name on the right side of an operator must be wrapped in parens.
pub(crate) fn is_reserved_binary_op_ident(s: &str) -> bool {
    const RESERVED: [&str; 6] = ["on", "ignoring", "group_left", "group_right", "bool", "prefix"];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(s))
}

/// Expression(s) explicitly grouped in parens
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParensExpr {
    pub expressions: Vec<Expr>,
}

impl ParensExpr {
    pub fn new(expressions: Vec<Expr>) -> Self {
        ParensExpr { expressions }
    }

    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    /// Return the innermost expression wrapped by a `ParensExpr` if the `ParensExpr` contains
    /// exactly one expression. For example : (((x + y))) would return a ref to `x + y`
    pub fn innermost_expr(&self) -> Option<&Expr> {
        match self.expressions.as_slice() {
            [Expr::Parens(pe)] => pe.innermost_expr(),
            [expr] => Some(expr),
            _ => None,
        }
    }
}

impl Display for ParensExpr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write_comma_separated(self.expressions.iter(), f, true)
    }
}

/// WithExpr represents `with (...)` extension from MetricsQL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithExpr {
    pub was: Vec<WithArgExpr>,
    pub expr: BExpr,
}

impl WithExpr {
    pub fn new(expr: Expr, was: Vec<WithArgExpr>) -> Self {
        WithExpr {
            expr: Box::new(expr),
            was,
        }
    }
}

impl Display for WithExpr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "with (")?;
        for (i, was) in self.was.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", was)?;
        }
        write!(f, ") {}", self.expr)
    }
}

/// WithArgExpr represents a single entry from WITH expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithArgExpr {
    pub name: String,
    pub args: Vec<String>,
    pub expr: Expr,
}

impl WithArgExpr {
    pub fn new<S: Into<String>>(name: S, expr: Expr, args: Vec<String>) -> Self {
        WithArgExpr {
            name: name.into(),
            args,
            expr,
        }
    }
}

impl Display for WithArgExpr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", escape_ident(&self.name))?;
        if !self.args.is_empty() {
            let args = self.args.iter().map(|a| escape_ident(a));
            write_comma_separated(args, f, true)?;
        }
        write!(f, " = {}", self.expr)
    }
}

/// A parsed MetricsQL expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A number literal, i.e. `1.23`, `0x12` or `NaN`.
    NumberLiteral(NumberLiteral),

    /// A duration literal, i.e. `5m` or `1h30m`.
    Duration(DurationExpr),

    /// A string literal, i.e. `"foo"`.
    StringLiteral(StringLiteral),

    /// A function call
    Function(FunctionExpr),

    /// Aggregation represents aggregate functions such as `sum(...) by (...)`
    Aggregation(AggregationExpr),

    /// A binary operator expression
    BinaryOperator(BinaryExpr),

    /// RollupExpr represents an MetricsQL expression which contains at least `offset` or `[...]` part.
    Rollup(RollupExpr),

    /// MetricExpr represents a MetricsQL metric with optional filters, i.e. `foo{...}`.
    MetricExpression(MetricExpr),

    /// A grouped expression wrapped in parentheses
    Parens(ParensExpr),

    /// String concatenation parsed in the context of a `with` statement, i.e. `"a" + x`.
    StringExpr(StringExpr),

    /// A MetricsQL specific WITH statement node. Transformed at parse time to one
    /// of the other variants
    With(WithExpr),

    /// An interpolated MetricsQL metric with optional filters, i.e. `foo{...}` parsed in the
    /// context of a `WITH` statement. Transformed at parse time to a MetricExpr
    WithSelector(InterpolatedSelector),
}

impl Expr {
    pub fn is_number(&self) -> bool {
        matches!(self, Expr::NumberLiteral(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Expr::StringLiteral(_))
    }

    pub fn is_duration(&self) -> bool {
        matches!(self, Expr::Duration(_))
    }

    pub fn is_metric_expression(&self) -> bool {
        matches!(self, Expr::MetricExpression(_))
    }

    pub fn is_binary_op(&self) -> bool {
        matches!(self, Expr::BinaryOperator(_))
    }

    /// returns a scalar expression
    pub fn number(value: f64) -> Expr {
        Expr::NumberLiteral(NumberLiteral::new(value))
    }

    /// returns a string literal expression
    pub fn string_literal(value: &str) -> Expr {
        Expr::StringLiteral(StringLiteral::new(value))
    }

    pub fn keep_metric_names(&self) -> bool {
        match self {
            Expr::BinaryOperator(be) => be.keep_metric_names,
            Expr::Function(fe) => fe.keep_metric_names,
            Expr::Parens(pe) => pe.innermost_expr().map_or(false, |e| e.keep_metric_names()),
            _ => false,
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            Expr::NumberLiteral(_) => "Scalar",
            Expr::Duration(_) => "Duration",
            Expr::StringLiteral(_) | Expr::StringExpr(_) => "String",
            Expr::Function(_) => "Function",
            Expr::Aggregation(_) => "Aggregation",
            Expr::BinaryOperator(_) => "BinaryOperator",
            Expr::Rollup(_) => "Rollup",
            Expr::Parens(_) => "Parens",
            Expr::MetricExpression(_) => "VectorSelector",
            Expr::With(_) => "With",
            Expr::WithSelector(_) => "WithSelector",
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Expr::Aggregation(a) => write!(f, "{}", a)?,
            Expr::BinaryOperator(be) => write!(f, "{}", be)?,
            Expr::Duration(d) => write!(f, "{}", d)?,
            Expr::Function(func) => write!(f, "{}", func)?,
            Expr::NumberLiteral(n) => write!(f, "{}", n)?,
            Expr::MetricExpression(me) => write!(f, "{}", me)?,
            Expr::Parens(p) => write!(f, "{}", p)?,
            Expr::Rollup(re) => write!(f, "{}", re)?,
            Expr::StringLiteral(s) => write!(f, "{}", s)?,
            Expr::StringExpr(s) => write!(f, "{}", s)?,
            Expr::With(w) => write!(f, "{}", w)?,
            Expr::WithSelector(ws) => write!(f, "{}", ws)?,
        }
        Ok(())
    }
}

impl Default for Expr {
    fn default() -> Self {
        Expr::number(1.0)
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Self {
        Expr::number(v)
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Expr::StringLiteral(StringLiteral(s))
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr::string_literal(s)
    }
}

impl From<MetricExpr> for Expr {
    fn from(vs: MetricExpr) -> Self {
        Expr::MetricExpression(vs)
    }
}

impl From<BinaryExpr> for Expr {
    fn from(be: BinaryExpr) -> Self {
        Expr::BinaryOperator(be)
    }
}

impl From<FunctionExpr> for Expr {
    fn from(fe: FunctionExpr) -> Self {
        Expr::Function(fe)
    }
}

impl From<AggregationExpr> for Expr {
    fn from(ae: AggregationExpr) -> Self {
        Expr::Aggregation(ae)
    }
}

impl From<RollupExpr> for Expr {
    fn from(re: RollupExpr) -> Self {
        Expr::Rollup(re)
    }
}
