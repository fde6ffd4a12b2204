use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

use crate::functions::{BuiltinFunction, FunctionMeta};
use crate::parser::ParseError;

/// Transform functions, applied to instant vectors or scalars, i.e. `abs(...)`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
pub enum TransformFunction {
    /// absolute value of every sample
    Abs,
    /// returns 1 if the argument has no series
    Absent,
    Acos,
    Acosh,
    /// sets the metric name of all series
    Alias,
    Asin,
    Asinh,
    Atan,
    Atanh,
    BitmapAnd,
    BitmapOr,
    BitmapXor,
    BucketsLimit,
    Ceil,
    Clamp,
    ClampMax,
    ClampMin,
    Cos,
    Cosh,
    DayOfMonth,
    DayOfWeek,
    DayOfYear,
    DaysInMonth,
    Deg,
    DropCommonLabels,
    DropEmptySeries,
    End,
    Exp,
    Floor,
    HistogramAvg,
    HistogramQuantile,
    HistogramQuantiles,
    HistogramShare,
    HistogramStddev,
    HistogramStdvar,
    Hour,
    Interpolate,
    KeepLastValue,
    KeepNextValue,
    LabelCopy,
    LabelDel,
    LabelGraphiteGroup,
    LabelJoin,
    LabelKeep,
    LabelLowercase,
    LabelMap,
    LabelMatch,
    LabelMismatch,
    LabelMove,
    LabelReplace,
    /// sets the given label values
    LabelSet,
    LabelTransform,
    LabelUppercase,
    LabelValue,
    LabelsEqual,
    LimitOffset,
    Ln,
    Log10,
    Log2,
    Minute,
    Month,
    Now,
    Pi,
    PrometheusBuckets,
    Rad,
    Rand,
    RandExponential,
    RandNormal,
    RangeAvg,
    RangeFirst,
    RangeLast,
    RangeLinearRegression,
    RangeMad,
    RangeMax,
    RangeMedian,
    RangeMin,
    RangeNormalize,
    RangeQuantile,
    RangeStddev,
    RangeStdvar,
    RangeSum,
    RangeTrimOutliers,
    RangeTrimSpikes,
    RangeTrimZscore,
    RangeZscore,
    RemoveResets,
    Round,
    /// resource utilization: `(1 - free / max) * 100`
    Ru,
    RunningAvg,
    RunningMax,
    RunningMin,
    RunningSum,
    Scalar,
    Sgn,
    Sin,
    Sinh,
    SmoothExponential,
    Sort,
    SortByLabel,
    SortByLabelDesc,
    SortByLabelNumeric,
    SortByLabelNumericDesc,
    SortDesc,
    Sqrt,
    Start,
    Step,
    Tan,
    Tanh,
    Time,
    TimezoneOffset,
    /// returns the union of the given series, also used for `(a, b)` tuples
    Union,
    Vector,
    Year,
}

impl Display for TransformFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for TransformFunction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match FunctionMeta::lookup(s) {
            Some(meta) => match meta.function {
                BuiltinFunction::Transform(tf) => Ok(tf),
                _ => Err(ParseError::InvalidFunction(s.to_string())),
            },
            None => Err(ParseError::InvalidFunction(s.to_string())),
        }
    }
}

impl TransformFunction {
    pub const fn name(&self) -> &'static str {
        use TransformFunction::*;

        match self {
            Abs => "abs",
            Absent => "absent",
            Acos => "acos",
            Acosh => "acosh",
            Alias => "alias",
            Asin => "asin",
            Asinh => "asinh",
            Atan => "atan",
            Atanh => "atanh",
            BitmapAnd => "bitmap_and",
            BitmapOr => "bitmap_or",
            BitmapXor => "bitmap_xor",
            BucketsLimit => "buckets_limit",
            Ceil => "ceil",
            Clamp => "clamp",
            ClampMax => "clamp_max",
            ClampMin => "clamp_min",
            Cos => "cos",
            Cosh => "cosh",
            DayOfMonth => "day_of_month",
            DayOfWeek => "day_of_week",
            DayOfYear => "day_of_year",
            DaysInMonth => "days_in_month",
            Deg => "deg",
            DropCommonLabels => "drop_common_labels",
            DropEmptySeries => "drop_empty_series",
            End => "end",
            Exp => "exp",
            Floor => "floor",
            HistogramAvg => "histogram_avg",
            HistogramQuantile => "histogram_quantile",
            HistogramQuantiles => "histogram_quantiles",
            HistogramShare => "histogram_share",
            HistogramStddev => "histogram_stddev",
            HistogramStdvar => "histogram_stdvar",
            Hour => "hour",
            Interpolate => "interpolate",
            KeepLastValue => "keep_last_value",
            KeepNextValue => "keep_next_value",
            LabelCopy => "label_copy",
            LabelDel => "label_del",
            LabelGraphiteGroup => "label_graphite_group",
            LabelJoin => "label_join",
            LabelKeep => "label_keep",
            LabelLowercase => "label_lowercase",
            LabelMap => "label_map",
            LabelMatch => "label_match",
            LabelMismatch => "label_mismatch",
            LabelMove => "label_move",
            LabelReplace => "label_replace",
            LabelSet => "label_set",
            LabelTransform => "label_transform",
            LabelUppercase => "label_uppercase",
            LabelValue => "label_value",
            LabelsEqual => "labels_equal",
            LimitOffset => "limit_offset",
            Ln => "ln",
            Log10 => "log10",
            Log2 => "log2",
            Minute => "minute",
            Month => "month",
            Now => "now",
            Pi => "pi",
            PrometheusBuckets => "prometheus_buckets",
            Rad => "rad",
            Rand => "rand",
            RandExponential => "rand_exponential",
            RandNormal => "rand_normal",
            RangeAvg => "range_avg",
            RangeFirst => "range_first",
            RangeLast => "range_last",
            RangeLinearRegression => "range_linear_regression",
            RangeMad => "range_mad",
            RangeMax => "range_max",
            RangeMedian => "range_median",
            RangeMin => "range_min",
            RangeNormalize => "range_normalize",
            RangeQuantile => "range_quantile",
            RangeStddev => "range_stddev",
            RangeStdvar => "range_stdvar",
            RangeSum => "range_sum",
            RangeTrimOutliers => "range_trim_outliers",
            RangeTrimSpikes => "range_trim_spikes",
            RangeTrimZscore => "range_trim_zscore",
            RangeZscore => "range_zscore",
            RemoveResets => "remove_resets",
            Round => "round",
            Ru => "ru",
            RunningAvg => "running_avg",
            RunningMax => "running_max",
            RunningMin => "running_min",
            RunningSum => "running_sum",
            Scalar => "scalar",
            Sgn => "sgn",
            Sin => "sin",
            Sinh => "sinh",
            SmoothExponential => "smooth_exponential",
            Sort => "sort",
            SortByLabel => "sort_by_label",
            SortByLabelDesc => "sort_by_label_desc",
            SortByLabelNumeric => "sort_by_label_numeric",
            SortByLabelNumericDesc => "sort_by_label_numeric_desc",
            SortDesc => "sort_desc",
            Sqrt => "sqrt",
            Start => "start",
            Step => "step",
            Tan => "tan",
            Tanh => "tanh",
            Time => "time",
            TimezoneOffset => "timezone_offset",
            Union => "union",
            Vector => "vector",
            Year => "year",
        }
    }

    /// Functions which add, remove or rewrite labels of their input series.
    pub const fn manipulates_labels(&self) -> bool {
        use TransformFunction::*;
        matches!(
            self,
            Alias
                | DropCommonLabels
                | LabelCopy
                | LabelDel
                | LabelGraphiteGroup
                | LabelJoin
                | LabelKeep
                | LabelLowercase
                | LabelMap
                | LabelMatch
                | LabelMismatch
                | LabelMove
                | LabelReplace
                | LabelSet
                | LabelTransform
                | LabelUppercase
                | LabelValue
        )
    }
}

/// Returns the index of the argument which label filters can be pushed into.
/// `None` means the function is opaque for filter pushdown.
pub const fn get_transform_arg_idx_for_optimization(
    func: TransformFunction,
    arg_count: usize,
) -> Option<usize> {
    if func.manipulates_labels() {
        return None;
    }

    use TransformFunction::*;
    match func {
        Absent | Scalar | Union | Vector | RangeNormalize => None,
        End | Now | Pi | Ru | Start | Step | Time => None,
        LimitOffset => Some(2),
        BucketsLimit | HistogramQuantile | HistogramShare | RangeQuantile | RangeTrimOutliers
        | RangeTrimSpikes | RangeTrimZscore => Some(1),
        HistogramQuantiles => arg_count.checked_sub(1),
        _ => Some(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_idx_for_optimization() {
        let f = |name: &str, arg_count: usize, expected: Option<usize>| {
            let func = TransformFunction::from_str(name).expect("transform function");
            assert_eq!(
                get_transform_arg_idx_for_optimization(func, arg_count),
                expected,
                "{name}"
            );
        };
        f("abs", 1, Some(0));
        f("limit_offset", 3, Some(2));
        f("histogram_quantile", 2, Some(1));
        f("histogram_quantiles", 4, Some(3));
        f("label_set", 3, None);
        f("absent", 1, None);
        f("time", 0, None);
        f("range_normalize", 1, None);
    }

    #[test]
    fn test_manipulates_labels() {
        assert!(TransformFunction::LabelReplace.manipulates_labels());
        assert!(TransformFunction::Alias.manipulates_labels());
        assert!(!TransformFunction::Abs.manipulates_labels());
    }
}
