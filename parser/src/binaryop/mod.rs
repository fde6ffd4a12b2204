//! Scalar evaluation of binary operators, used for constant folding.
//!
//! `NaN` plays the role of a missing value: set operators such as `and`, `or` and `unless`
//! treat a `NaN` operand as an empty vector.
use crate::common::Operator;

pub type BinopFunc = fn(left: f64, right: f64) -> f64;

/// eq returns true if left == right. `NaN == NaN` is true.
#[inline]
fn op_eq(left: f64, right: f64) -> bool {
    if left.is_nan() {
        return right.is_nan();
    }
    left == right
}

/// neq returns true if left != right.
#[inline]
fn op_neq(left: f64, right: f64) -> bool {
    !op_eq(left, right)
}

#[inline]
fn op_gt(left: f64, right: f64) -> bool {
    left > right
}

#[inline]
fn op_lt(left: f64, right: f64) -> bool {
    left < right
}

#[inline]
fn op_gte(left: f64, right: f64) -> bool {
    left >= right
}

#[inline]
fn op_lte(left: f64, right: f64) -> bool {
    left <= right
}

#[inline]
fn op_plus(left: f64, right: f64) -> f64 {
    left + right
}

#[inline]
fn op_minus(left: f64, right: f64) -> f64 {
    left - right
}

#[inline]
fn op_mul(left: f64, right: f64) -> f64 {
    left * right
}

#[inline]
fn op_div(left: f64, right: f64) -> f64 {
    left / right
}

#[inline]
fn op_mod(left: f64, right: f64) -> f64 {
    left % right
}

#[inline]
fn op_pow(left: f64, right: f64) -> f64 {
    left.powf(right)
}

#[inline]
fn op_atan2(left: f64, right: f64) -> f64 {
    left.atan2(right)
}

/// and returns left if both sides are present.
pub fn op_and(left: f64, right: f64) -> f64 {
    if left.is_nan() || right.is_nan() {
        return f64::NAN;
    }
    left
}

/// or returns the first non-NaN item. If both left and right are NaN, it returns NaN.
pub fn op_or(left: f64, right: f64) -> f64 {
    if !left.is_nan() {
        return left;
    }
    right
}

/// unless returns left if right is missing.
pub fn op_unless(left: f64, right: f64) -> f64 {
    if right.is_nan() {
        return left;
    }
    f64::NAN
}

/// default returns left or right if left is NaN.
pub fn op_default(left: f64, right: f64) -> f64 {
    if left.is_nan() {
        return right;
    }
    left
}

/// if returns left if right is not NaN. Otherwise, NaN is returned.
pub fn op_if(left: f64, right: f64) -> f64 {
    if right.is_nan() {
        return f64::NAN;
    }
    left
}

/// if_not returns left if right is NaN. Otherwise, NaN is returned.
pub fn op_if_not(left: f64, right: f64) -> f64 {
    if right.is_nan() {
        return left;
    }
    f64::NAN
}

/// convert true to x, false to NaN.
#[inline]
pub const fn to_comparison_value(b: bool, x: f64) -> f64 {
    if b {
        x
    } else {
        f64::NAN
    }
}

macro_rules! make_comparison_func {
    ($name: ident, $func: expr) => {
        pub fn $name(left: f64, right: f64) -> f64 {
            to_comparison_value($func(left, right), left)
        }
    };
}

macro_rules! make_comparison_func_bool {
    ($name: ident, $func: expr) => {
        pub fn $name(left: f64, right: f64) -> f64 {
            if $func(left, right) {
                1_f64
            } else {
                0_f64
            }
        }
    };
}

make_comparison_func!(compare_eq, op_eq);
make_comparison_func!(compare_neq, op_neq);
make_comparison_func!(compare_gt, op_gt);
make_comparison_func!(compare_lt, op_lt);
make_comparison_func!(compare_gte, op_gte);
make_comparison_func!(compare_lte, op_lte);

make_comparison_func_bool!(compare_eq_bool, op_eq);
make_comparison_func_bool!(compare_neq_bool, op_neq);
make_comparison_func_bool!(compare_gt_bool, op_gt);
make_comparison_func_bool!(compare_lt_bool, op_lt);
make_comparison_func_bool!(compare_gte_bool, op_gte);
make_comparison_func_bool!(compare_lte_bool, op_lte);

pub const fn get_scalar_binop_handler(op: Operator, is_bool: bool) -> BinopFunc {
    use Operator::*;
    match (op, is_bool) {
        (Add, _) => op_plus,
        (Atan2, _) => op_atan2,
        (Default, _) => op_default,
        (Div, _) => op_div,
        (Mod, _) => op_mod,
        (Mul, _) => op_mul,
        (Pow, _) => op_pow,
        (Sub, _) => op_minus,
        (If, _) => op_if,
        (IfNot, _) => op_if_not,
        (Unless, _) => op_unless,
        (And, _) => op_and,
        (Or, _) => op_or,
        (Eql, false) => compare_eq,
        (NotEq, false) => compare_neq,
        (Gt, false) => compare_gt,
        (Lt, false) => compare_lt,
        (Gte, false) => compare_gte,
        (Lte, false) => compare_lte,
        (Eql, true) => compare_eq_bool,
        (NotEq, true) => compare_neq_bool,
        (Gt, true) => compare_gt_bool,
        (Lt, true) => compare_lt_bool,
        (Gte, true) => compare_gte_bool,
        (Lte, true) => compare_lte_bool,
    }
}

/// Evaluates `left op right` for two scalars.
pub fn eval_binary_op(left: f64, right: f64, op: Operator, is_bool: bool) -> f64 {
    let handler = get_scalar_binop_handler(op, is_bool);
    handler(left, right)
}

/// Compares two strings. Returns `None` if `op` is not a comparison.
///
/// A true comparison yields 1; a false one yields NaN, or 0 with the `bool` modifier.
pub fn string_compare(a: &str, b: &str, op: Operator, is_bool: bool) -> Option<f64> {
    let res = match op {
        Operator::Eql => a == b,
        Operator::NotEq => a != b,
        Operator::Lt => a < b,
        Operator::Gt => a > b,
        Operator::Lte => a <= b,
        Operator::Gte => a >= b,
        _ => return None,
    };
    Some(if res {
        1_f64
    } else if is_bool {
        0_f64
    } else {
        f64::NAN
    })
}
