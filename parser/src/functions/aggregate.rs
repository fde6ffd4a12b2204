//! AggregateFunction module contains enum for available aggregation functions.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

use crate::functions::{BuiltinFunction, FunctionMeta};
use crate::parser::ParseError;

/// Aggregation functions, i.e. `sum(...) by (...)`
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Hash, EnumIter, Serialize, Deserialize)]
pub enum AggregateFunction {
    /// returns a single series per group out of the series returned by the argument
    Any,
    /// calculate the average over dimensions
    Avg,
    /// smallest k elements by sample value
    Bottomk,
    BottomkAvg,
    BottomkLast,
    BottomkMax,
    BottomkMedian,
    BottomkMin,
    /// count the number of elements in the vector
    Count,
    /// count the number of elements with the same value
    CountValues,
    Distinct,
    Geomean,
    Group,
    Histogram,
    Limitk,
    Mad,
    Max,
    Median,
    Min,
    Mode,
    OutliersIqr,
    OutliersMad,
    Outliersk,
    /// calculate φ-quantile (0 ≤ φ ≤ 1) over dimensions
    Quantile,
    Quantiles,
    Share,
    Stddev,
    Stdvar,
    /// calculate sum over dimensions
    Sum,
    Sum2,
    /// largest k elements by sample value
    Topk,
    TopkAvg,
    TopkLast,
    TopkMax,
    TopkMedian,
    TopkMin,
    Zscore,
}

impl AggregateFunction {
    pub const fn name(&self) -> &'static str {
        use AggregateFunction::*;

        match self {
            Any => "any",
            Avg => "avg",
            Bottomk => "bottomk",
            BottomkAvg => "bottomk_avg",
            BottomkLast => "bottomk_last",
            BottomkMax => "bottomk_max",
            BottomkMedian => "bottomk_median",
            BottomkMin => "bottomk_min",
            Count => "count",
            CountValues => "count_values",
            Distinct => "distinct",
            Geomean => "geomean",
            Group => "group",
            Histogram => "histogram",
            Limitk => "limitk",
            Mad => "mad",
            Max => "max",
            Median => "median",
            Min => "min",
            Mode => "mode",
            OutliersIqr => "outliers_iqr",
            OutliersMad => "outliers_mad",
            Outliersk => "outliersk",
            Quantile => "quantile",
            Quantiles => "quantiles",
            Share => "share",
            Stddev => "stddev",
            Stdvar => "stdvar",
            Sum => "sum",
            Sum2 => "sum2",
            Topk => "topk",
            TopkAvg => "topk_avg",
            TopkLast => "topk_last",
            TopkMax => "topk_max",
            TopkMedian => "topk_median",
            TopkMin => "topk_min",
            Zscore => "zscore",
        }
    }
}

impl Display for AggregateFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for AggregateFunction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(meta) = FunctionMeta::lookup(s) {
            if let BuiltinFunction::Aggregate(ag) = &meta.function {
                return Ok(*ag);
            }
        }
        Err(ParseError::InvalidFunction(s.to_string()))
    }
}

/// Returns the index of the argument which label filters can be pushed into.
pub const fn get_aggregate_arg_idx_for_optimization(
    func: AggregateFunction,
    arg_count: usize,
) -> Option<usize> {
    use AggregateFunction::*;
    match func {
        Bottomk | BottomkAvg | BottomkMax | BottomkMedian | BottomkLast | BottomkMin | Limitk
        | Outliersk | OutliersMad | Quantile | Topk | TopkAvg | TopkMax | TopkMedian | TopkLast
        | TopkMin => Some(1),
        CountValues => None,
        Quantiles => arg_count.checked_sub(1),
        _ => Some(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_idx_for_optimization() {
        let f = |name: &str, arg_count: usize, expected: Option<usize>| {
            let func = AggregateFunction::from_str(name).expect("aggregate function");
            assert_eq!(
                get_aggregate_arg_idx_for_optimization(func, arg_count),
                expected,
                "{name}"
            );
        };
        f("sum", 1, Some(0));
        f("TOPK", 2, Some(1));
        f("quantiles", 4, Some(3));
        f("quantiles", 0, None);
        f("count_values", 2, None);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(AggregateFunction::from_str("Sum").unwrap(), AggregateFunction::Sum);
        assert!(AggregateFunction::from_str("rate").is_err());
        assert_eq!(AggregateFunction::OutliersIqr.to_string(), "outliers_iqr");
    }
}
