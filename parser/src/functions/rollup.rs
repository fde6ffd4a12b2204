use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

use crate::functions::{BuiltinFunction, FunctionMeta};
use crate::parser::ParseError;

/// Built-in Rollup Functions
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Hash, Default, EnumIter, Serialize, Deserialize,
)]
pub enum RollupFunction {
    AbsentOverTime,
    AggrOverTime,
    AscentOverTime,
    AvgOverTime,
    Changes,
    ChangesPrometheus,
    CountEqOverTime,
    CountGtOverTime,
    CountLeOverTime,
    CountNeOverTime,
    CountOverTime,
    CountValuesOverTime,
    DecreasesOverTime,
    /// the last sample value within the lookbehind window
    #[default]
    DefaultRollup,
    Delta,
    DeltaPrometheus,
    Deriv,
    DerivFast,
    DescentOverTime,
    DistinctOverTime,
    DurationOverTime,
    FirstOverTime,
    GeomeanOverTime,
    HistogramOverTime,
    HoeffdingBoundLower,
    HoeffdingBoundUpper,
    HoltWinters,
    Idelta,
    Ideriv,
    /// increase of counters over the lookbehind window
    Increase,
    IncreasePrometheus,
    IncreasePure,
    IncreasesOverTime,
    Integrate,
    IqrOverTime,
    Irate,
    Lag,
    LastOverTime,
    Lifetime,
    MadOverTime,
    MaxOverTime,
    MedianOverTime,
    MinOverTime,
    ModeOverTime,
    OutlierIqrOverTime,
    PredictLinear,
    PresentOverTime,
    QuantileOverTime,
    QuantilesOverTime,
    RangeOverTime,
    /// per-second rate of increase of counters
    Rate,
    RateOverSum,
    Resets,
    /// returns min, max and avg values over the window as separate series
    Rollup,
    RollupCandlestick,
    RollupDelta,
    RollupDeriv,
    RollupIncrease,
    RollupRate,
    RollupScrapeInterval,
    ScrapeInterval,
    ShareEqOverTime,
    ShareGtOverTime,
    ShareLeOverTime,
    StaleSamplesOverTime,
    StddevOverTime,
    StdvarOverTime,
    Sum2OverTime,
    SumEqOverTime,
    SumGtOverTime,
    SumLeOverTime,
    SumOverTime,
    TfirstOverTime,
    Timestamp,
    TimestampWithName,
    TlastChangeOverTime,
    TlastOverTime,
    TmaxOverTime,
    TminOverTime,
    ZscoreOverTime,
}

impl RollupFunction {
    pub const fn name(&self) -> &'static str {
        use RollupFunction::*;

        match self {
            AbsentOverTime => "absent_over_time",
            AggrOverTime => "aggr_over_time",
            AscentOverTime => "ascent_over_time",
            AvgOverTime => "avg_over_time",
            Changes => "changes",
            ChangesPrometheus => "changes_prometheus",
            CountEqOverTime => "count_eq_over_time",
            CountGtOverTime => "count_gt_over_time",
            CountLeOverTime => "count_le_over_time",
            CountNeOverTime => "count_ne_over_time",
            CountOverTime => "count_over_time",
            CountValuesOverTime => "count_values_over_time",
            DecreasesOverTime => "decreases_over_time",
            DefaultRollup => "default_rollup",
            Delta => "delta",
            DeltaPrometheus => "delta_prometheus",
            Deriv => "deriv",
            DerivFast => "deriv_fast",
            DescentOverTime => "descent_over_time",
            DistinctOverTime => "distinct_over_time",
            DurationOverTime => "duration_over_time",
            FirstOverTime => "first_over_time",
            GeomeanOverTime => "geomean_over_time",
            HistogramOverTime => "histogram_over_time",
            HoeffdingBoundLower => "hoeffding_bound_lower",
            HoeffdingBoundUpper => "hoeffding_bound_upper",
            HoltWinters => "holt_winters",
            Idelta => "idelta",
            Ideriv => "ideriv",
            Increase => "increase",
            IncreasePrometheus => "increase_prometheus",
            IncreasePure => "increase_pure",
            IncreasesOverTime => "increases_over_time",
            Integrate => "integrate",
            IqrOverTime => "iqr_over_time",
            Irate => "irate",
            Lag => "lag",
            LastOverTime => "last_over_time",
            Lifetime => "lifetime",
            MadOverTime => "mad_over_time",
            MaxOverTime => "max_over_time",
            MedianOverTime => "median_over_time",
            MinOverTime => "min_over_time",
            ModeOverTime => "mode_over_time",
            OutlierIqrOverTime => "outlier_iqr_over_time",
            PredictLinear => "predict_linear",
            PresentOverTime => "present_over_time",
            QuantileOverTime => "quantile_over_time",
            QuantilesOverTime => "quantiles_over_time",
            RangeOverTime => "range_over_time",
            Rate => "rate",
            RateOverSum => "rate_over_sum",
            Resets => "resets",
            Rollup => "rollup",
            RollupCandlestick => "rollup_candlestick",
            RollupDelta => "rollup_delta",
            RollupDeriv => "rollup_deriv",
            RollupIncrease => "rollup_increase",
            RollupRate => "rollup_rate",
            RollupScrapeInterval => "rollup_scrape_interval",
            ScrapeInterval => "scrape_interval",
            ShareEqOverTime => "share_eq_over_time",
            ShareGtOverTime => "share_gt_over_time",
            ShareLeOverTime => "share_le_over_time",
            StaleSamplesOverTime => "stale_samples_over_time",
            StddevOverTime => "stddev_over_time",
            StdvarOverTime => "stdvar_over_time",
            Sum2OverTime => "sum2_over_time",
            SumEqOverTime => "sum_eq_over_time",
            SumGtOverTime => "sum_gt_over_time",
            SumLeOverTime => "sum_le_over_time",
            SumOverTime => "sum_over_time",
            TfirstOverTime => "tfirst_over_time",
            Timestamp => "timestamp",
            TimestampWithName => "timestamp_with_name",
            TlastChangeOverTime => "tlast_change_over_time",
            TlastOverTime => "tlast_over_time",
            TmaxOverTime => "tmax_over_time",
            TminOverTime => "tmin_over_time",
            ZscoreOverTime => "zscore_over_time",
        }
    }
}

impl Display for RollupFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for RollupFunction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match FunctionMeta::lookup(s) {
            Some(meta) => match meta.function {
                BuiltinFunction::Rollup(rf) => Ok(rf),
                _ => Err(ParseError::InvalidFunction(s.to_string())),
            },
            None => Err(ParseError::InvalidFunction(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!(RollupFunction::from_str("rate").unwrap(), RollupFunction::Rate);
        assert_eq!(
            RollupFunction::from_str("AVG_over_time").unwrap(),
            RollupFunction::AvgOverTime
        );
        assert!(RollupFunction::from_str("sum").is_err());
        assert_eq!(RollupFunction::Sum2OverTime.to_string(), "sum2_over_time");
    }
}
