use ahash::AHashSet;
use tracing::trace;

use crate::ast::{
    AggregateModifier, AggregationExpr, BinaryExpr, Expr, FunctionExpr, GroupModifierOp,
    JoinModifierOp, MetricExpr,
};
use crate::common::Operator;
use crate::functions::{BuiltinFunction, TransformFunction};
use crate::label::{remove_duplicate_label_filters, sort_label_filters, LabelFilter, NAME_LABEL};

/// `optimize` optimizes `expr` in order to improve its performance.
///
/// It adds missing filters to `foo{filters1} op bar{filters2}`
/// according to https://utcc.utoronto.ca/~cks/space/blog/sysadmin/PrometheusLabelNonOptimization
///
/// The input is left untouched and the optimized copy is returned.
pub fn optimize(expr: &Expr) -> Expr {
    let mut clone = expr.clone();
    optimize_in_place(&mut clone);
    clone
}

fn optimize_in_place(expr: &mut Expr) {
    match expr {
        Expr::Rollup(re) => {
            optimize_in_place(&mut re.expr);
            if let Some(at) = re.at.as_mut() {
                optimize_in_place(at);
            }
        }
        Expr::Function(fe) => fe.args.iter_mut().for_each(optimize_in_place),
        Expr::Aggregation(ae) => ae.args.iter_mut().for_each(optimize_in_place),
        Expr::Parens(pe) => pe.expressions.iter_mut().for_each(optimize_in_place),
        Expr::BinaryOperator(be) => {
            optimize_in_place(&mut be.left);
            optimize_in_place(&mut be.right);
            let lfs = get_common_label_filters(expr);
            push_down_filters_in_place(expr, lfs);
        }
        _ => {}
    }
}

/// Pushes down the given `common_filters` into `expr` if possible.
///
/// `expr` must be a part of a binary operation - either left or right.
///
/// For example, if `expr` contains `foo + sum(bar)` and `common_filters` is `{x="y"}`,
/// then the returned expression is `foo{x="y"} + sum(bar)`.
/// The `{x="y"}` cannot be pushed down to `sum(bar)`, since this may change the results
/// of the binary operation.
pub fn push_down_filters(expr: &Expr, common_filters: &[LabelFilter]) -> Expr {
    let mut clone = expr.clone();
    push_down_filters_in_place(&mut clone, common_filters.to_vec());
    clone
}

fn push_down_filters_in_place(expr: &mut Expr, mut lfs: Vec<LabelFilter>) {
    if lfs.is_empty() {
        return;
    }

    match expr {
        Expr::MetricExpression(me) => add_label_filters(me, &lfs),
        Expr::Rollup(re) => push_down_filters_in_place(&mut re.expr, lfs),
        Expr::Function(fe) => {
            let Some((idx, targets)) = function_arg_for_optimization(fe) else {
                return;
            };
            lfs.retain(|lf| !targets.contains(lf.label.as_str()));
            if let Some(arg) = fe.args.get_mut(idx) {
                push_down_filters_in_place(arg, lfs);
            }
        }
        Expr::Aggregation(ae) => {
            trim_filters_by_aggr_modifier(&mut lfs, ae.modifier.as_ref());
            if lfs.is_empty() {
                return;
            }
            match aggr_args_for_optimization(ae) {
                AggrArgs::All => {
                    for arg in ae.args.iter_mut() {
                        push_down_filters_in_place(arg, lfs.clone());
                    }
                }
                AggrArgs::Single(idx) => {
                    if let Some(arg) = ae.args.get_mut(idx) {
                        push_down_filters_in_place(arg, lfs);
                    }
                }
                AggrArgs::None => {}
            }
        }
        Expr::BinaryOperator(be) => {
            trim_filters_by_group_modifier(&mut lfs, be);
            if !lfs.is_empty() {
                push_down_filters_in_place(&mut be.left, lfs.clone());
                push_down_filters_in_place(&mut be.right, lfs);
            }
        }
        _ => {}
    }
}

fn add_label_filters(me: &mut MetricExpr, lfs: &[LabelFilter]) {
    trace!(selector = %me, filters = lfs.len(), "pushing label filters into selector");
    if me.filters.is_empty() {
        me.filters.push(vec![]);
    }
    for group in me.filters.iter_mut() {
        group.extend_from_slice(lfs);
        remove_duplicate_label_filters(group);
        sort_label_filters(group);
    }
}

/// Returns the filters common to every series produced by `expr`.
///
/// `__name__` filters are never returned, since binary operations drop metric names.
pub fn get_common_label_filters(expr: &Expr) -> Vec<LabelFilter> {
    match expr {
        Expr::MetricExpression(me) => get_common_label_filters_without_metric_name(me),
        Expr::Rollup(re) => get_common_label_filters(&re.expr),
        Expr::Function(fe) => {
            let Some((idx, targets)) = function_arg_for_optimization(fe) else {
                return vec![];
            };
            let Some(arg) = fe.args.get(idx) else {
                return vec![];
            };
            let mut lfs = get_common_label_filters(arg);
            lfs.retain(|lf| !targets.contains(lf.label.as_str()));
            lfs
        }
        Expr::Aggregation(ae) => {
            let mut lfs = match aggr_args_for_optimization(ae) {
                AggrArgs::All => intersect_label_filters_for_all_args(&ae.args),
                AggrArgs::Single(idx) => ae
                    .args
                    .get(idx)
                    .map(get_common_label_filters)
                    .unwrap_or_default(),
                AggrArgs::None => vec![],
            };
            trim_filters_by_aggr_modifier(&mut lfs, ae.modifier.as_ref());
            lfs
        }
        Expr::BinaryOperator(be) => get_common_label_filters_for_binary_op(be),
        _ => vec![],
    }
}

fn get_common_label_filters_for_binary_op(be: &BinaryExpr) -> Vec<LabelFilter> {
    let mut lfs_left = get_common_label_filters(&be.left);
    let mut lfs_right = get_common_label_filters(&be.right);
    match be.op {
        Operator::Or => {
            // {fCommon, f1} or {fCommon, f2} -> {fCommon}
            // {fCommon, f1} or on() {fCommon, f2} -> {}
            // {fCommon, f1} or on(fCommon) {fCommon, f2} -> {fCommon}
            // {fCommon, f1} or on(f1) {fCommon, f2} -> {}
            intersect_label_filters(&mut lfs_left, &lfs_right);
            trim_filters_by_group_modifier(&mut lfs_left, be);
            lfs_left
        }
        Operator::Unless | Operator::Default | Operator::IfNot => {
            // {f1} unless {f2} -> {f1}
            // {f1} unless on() {f2} -> {}
            // {f1} unless on(f1) {f2} -> {f1}
            // {f1} unless on(f2) {f2} -> {}
            trim_filters_by_group_modifier(&mut lfs_left, be);
            lfs_left
        }
        _ => match be.join_modifier.as_ref().map(|jm| jm.op) {
            Some(JoinModifierOp::GroupLeft) => {
                // {f1} * group_left() {f2} -> {f1, f2}
                // {f1} * on() group_left() {f2} -> {f1}
                // {f1} * on(f1) group_left() {f2} -> {f1}
                // {f1} * on(f2) group_left() {f2} -> {f1, f2}
                trim_filters_by_group_modifier(&mut lfs_right, be);
                union_label_filters(&mut lfs_left, &lfs_right);
                lfs_left
            }
            Some(JoinModifierOp::GroupRight) => {
                // {f1} * group_right() {f2} -> {f1, f2}
                // {f1} * on() group_right() {f2} -> {f2}
                // {f1} * on(f1) group_right() {f2} -> {f1, f2}
                // {f1} * on(f2) group_right() {f2} -> {f2}
                trim_filters_by_group_modifier(&mut lfs_left, be);
                union_label_filters(&mut lfs_left, &lfs_right);
                lfs_left
            }
            None => {
                // {f1} * {f2} -> {f1, f2}
                // {f1} * on() {f2} -> {}
                // {f1} * on(f1) {f2} -> {f1}
                // {f1} * on(f3) {f2} -> {}
                union_label_filters(&mut lfs_left, &lfs_right);
                trim_filters_by_group_modifier(&mut lfs_left, be);
                lfs_left
            }
        },
    }
}

fn get_common_label_filters_without_metric_name(me: &MetricExpr) -> Vec<LabelFilter> {
    let Some((head, rest)) = me.filters.split_first() else {
        return vec![];
    };
    let mut lfs = get_label_filters_without_metric_name(head);
    for group in rest {
        if lfs.is_empty() {
            break;
        }
        let other = get_label_filters_without_metric_name(group);
        intersect_label_filters(&mut lfs, &other);
    }
    lfs
}

fn get_label_filters_without_metric_name(lfs: &[LabelFilter]) -> Vec<LabelFilter> {
    lfs.iter()
        .filter(|lf| lf.label != NAME_LABEL)
        .cloned()
        .collect()
}

fn intersect_label_filters_for_all_args(args: &[Expr]) -> Vec<LabelFilter> {
    let Some((first, rest)) = args.split_first() else {
        return vec![];
    };
    let mut lfs = get_common_label_filters(first);
    for arg in rest {
        if lfs.is_empty() {
            break;
        }
        let next = get_common_label_filters(arg);
        intersect_label_filters(&mut lfs, &next);
    }
    lfs
}

/// Which arguments of an aggregate function see the filters of the aggregate.
enum AggrArgs {
    None,
    Single(usize),
    All,
}

fn aggr_args_for_optimization(ae: &AggregationExpr) -> AggrArgs {
    let Ok(func) = BuiltinFunction::new(&ae.name) else {
        return AggrArgs::None;
    };
    match func.get_arg_idx_for_optimization(ae.args.len()) {
        // `sum(a, b)` aggregates the union of its args
        Some(0) if ae.args.len() > 1 => AggrArgs::All,
        Some(idx) => AggrArgs::Single(idx),
        None => AggrArgs::None,
    }
}

/// Returns the index of the argument the filters of `fe` come from, together with the
/// labels `fe` overwrites. Returns `None` for functions which filters cannot pass through.
fn function_arg_for_optimization(fe: &FunctionExpr) -> Option<(usize, AHashSet<&str>)> {
    let func = BuiltinFunction::new(&fe.name).ok()?;
    if let BuiltinFunction::Transform(tf) = func {
        if tf.manipulates_labels() {
            let targets = target_labels(tf, &fe.args)?;
            return Some((0, targets));
        }
    }
    let idx = func.get_arg_idx_for_optimization(fe.args.len())?;
    Some((idx, AHashSet::new()))
}

/// Returns the labels written by a label manipulation function. Every target label must be
/// a string literal.
fn target_labels(tf: TransformFunction, args: &[Expr]) -> Option<AHashSet<&str>> {
    use TransformFunction::*;

    if args.is_empty() {
        return None;
    }
    let positions: Vec<usize> = match tf {
        // alias only changes the metric name
        Alias => vec![],
        // label_set(q, "dst1", "value1", "dst2", "value2", ...)
        LabelSet => (1..args.len()).step_by(2).collect(),
        // label_replace(q, "dst", "replacement", "src", "regex"), label_join(q, "dst", "sep", "src", ...)
        LabelReplace | LabelJoin => vec![1],
        // label_copy(q, "src1", "dst1", "src2", "dst2", ...)
        LabelCopy => (2..args.len()).step_by(2).collect(),
        // label_del(q, "label1", "label2", ...)
        LabelDel => (1..args.len()).collect(),
        _ => return None,
    };

    let mut targets = AHashSet::with_capacity(positions.len());
    for pos in positions {
        match args.get(pos) {
            Some(Expr::StringLiteral(label)) => {
                targets.insert(label.0.as_str());
            }
            _ => return None,
        }
    }
    Some(targets)
}

fn trim_filters_by_aggr_modifier(lfs: &mut Vec<LabelFilter>, modifier: Option<&AggregateModifier>) {
    match modifier {
        None => lfs.clear(),
        Some(AggregateModifier::By(labels)) => filter_label_filters_on(lfs, labels),
        Some(AggregateModifier::Without(labels)) => filter_label_filters_ignoring(lfs, labels),
    }
}

/// Trims `lfs` by the group modifier of `be`, i.e. `on()` or `ignoring()`.
///
/// - `lfs` is returned as is if `be` has no group modifier
/// - only filters listed in `on()` are kept
/// - filters listed in `ignoring()` are dropped
fn trim_filters_by_group_modifier(lfs: &mut Vec<LabelFilter>, be: &BinaryExpr) {
    let Some(modifier) = &be.group_modifier else {
        return;
    };
    match modifier.op {
        GroupModifierOp::On => filter_label_filters_on(lfs, &modifier.labels),
        GroupModifierOp::Ignoring => filter_label_filters_ignoring(lfs, &modifier.labels),
    }
}

fn intersect_label_filters(first: &mut Vec<LabelFilter>, second: &[LabelFilter]) {
    if first.is_empty() {
        return;
    }
    if second.is_empty() {
        first.clear();
        return;
    }
    let set: AHashSet<&LabelFilter> = second.iter().collect();
    first.retain(|lf| set.contains(lf));
}

fn union_label_filters(a: &mut Vec<LabelFilter>, b: &[LabelFilter]) {
    if b.is_empty() {
        return;
    }
    let set: AHashSet<LabelFilter> = a.iter().cloned().collect();
    a.extend(b.iter().filter(|lf| !set.contains(*lf)).cloned());
}

fn filter_label_filters_on(lfs: &mut Vec<LabelFilter>, labels: &[String]) {
    if labels.is_empty() {
        lfs.clear();
        return;
    }
    let set: AHashSet<&str> = labels.iter().map(String::as_str).collect();
    lfs.retain(|lf| set.contains(lf.label.as_str()))
}

fn filter_label_filters_ignoring(lfs: &mut Vec<LabelFilter>, labels: &[String]) {
    if labels.is_empty() {
        return;
    }
    let set: AHashSet<&str> = labels.iter().map(String::as_str).collect();
    lfs.retain(|lf| !set.contains(lf.label.as_str()))
}
