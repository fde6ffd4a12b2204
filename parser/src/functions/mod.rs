pub use aggregate::*;
use metricsql_common::hash::FastHashMap;
pub use rollup::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::OnceLock;
use strum::IntoEnumIterator;
pub use transform::*;

use crate::parser::{ParseError, ParseResult};

mod aggregate;
mod rollup;
mod transform;

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuiltinFunction {
    Aggregate(AggregateFunction),
    Rollup(RollupFunction),
    Transform(TransformFunction),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuiltinFunctionType {
    Aggregate,
    Rollup,
    Transform,
}

impl BuiltinFunctionType {
    pub const fn to_str(&self) -> &'static str {
        match self {
            BuiltinFunctionType::Aggregate => "aggregate",
            BuiltinFunctionType::Rollup => "rollup",
            BuiltinFunctionType::Transform => "transform",
        }
    }
}

impl FromStr for BuiltinFunctionType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, ParseError> {
        match s {
            s if s.eq_ignore_ascii_case("aggregate") => Ok(BuiltinFunctionType::Aggregate),
            s if s.eq_ignore_ascii_case("rollup") => Ok(BuiltinFunctionType::Rollup),
            s if s.eq_ignore_ascii_case("transform") => Ok(BuiltinFunctionType::Transform),
            _ => Err(ParseError::InvalidFunction(s.to_string())),
        }
    }
}

impl Display for BuiltinFunctionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

#[derive(Debug, Clone)]
pub struct FunctionMeta {
    pub name: &'static str,
    pub function: BuiltinFunction,
}

impl FunctionMeta {
    pub fn lookup(name: &str) -> Option<&'static FunctionMeta> {
        let registry = get_registry();
        registry
            .get(name)
            .or_else(|| registry.get(name.to_ascii_lowercase().as_str()))
    }

    pub fn get_type(&self) -> BuiltinFunctionType {
        self.function.get_type()
    }

    pub fn is_aggregation(&self) -> bool {
        matches!(self.function, BuiltinFunction::Aggregate(_))
    }
}

type FunctionRegistry = FastHashMap<&'static str, FunctionMeta>;
static REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

pub fn get_registry() -> &'static FunctionRegistry {
    REGISTRY.get_or_init(init_registry)
}

fn init_registry() -> FunctionRegistry {
    let functions = AggregateFunction::iter()
        .map(BuiltinFunction::Aggregate)
        .chain(RollupFunction::iter().map(BuiltinFunction::Rollup))
        .chain(TransformFunction::iter().map(BuiltinFunction::Transform));

    let mut registry = FunctionRegistry::default();
    for function in functions {
        let name = function.name();
        registry.insert(name, FunctionMeta { name, function });
    }
    registry
}

/// Reports whether `name` is a known aggregate, rollup or transform function.
/// The lookup is case-insensitive.
pub fn is_supported_function(name: &str) -> bool {
    FunctionMeta::lookup(name).is_some()
}

pub fn is_aggr_func(name: &str) -> bool {
    BuiltinFunction::is_aggregate_func(name)
}

impl BuiltinFunction {
    pub fn new(name: &str) -> ParseResult<Self> {
        if let Some(meta) = FunctionMeta::lookup(name) {
            return Ok(meta.function);
        }
        Err(ParseError::InvalidFunction(name.to_string()))
    }

    pub fn name(&self) -> &'static str {
        use BuiltinFunction::*;
        match self {
            Aggregate(af) => af.name(),
            Rollup(rf) => rf.name(),
            Transform(tf) => tf.name(),
        }
    }

    pub fn get_type(&self) -> BuiltinFunctionType {
        use BuiltinFunction::*;
        match self {
            Aggregate(_) => BuiltinFunctionType::Aggregate,
            Rollup(_) => BuiltinFunctionType::Rollup,
            Transform(_) => BuiltinFunctionType::Transform,
        }
    }

    pub fn is_aggregate_func(name: &str) -> bool {
        FunctionMeta::lookup(name).is_some_and(|meta| meta.is_aggregation())
    }

    pub fn is_aggregation(&self) -> bool {
        matches!(self, BuiltinFunction::Aggregate(_))
    }

    /// Rollup functions change the shape of their input over time, so label filters are never
    /// propagated through them.
    pub fn get_arg_idx_for_optimization(&self, args_len: usize) -> Option<usize> {
        match self {
            BuiltinFunction::Aggregate(af) => get_aggregate_arg_idx_for_optimization(*af, args_len),
            BuiltinFunction::Rollup(_) => None,
            BuiltinFunction::Transform(tf) => get_transform_arg_idx_for_optimization(*tf, args_len),
        }
    }
}

impl Display for BuiltinFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for BuiltinFunction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for BuiltinFunction {
    type Error = ParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_supported() {
        assert!(is_supported_function("geomean"));
        assert!(is_supported_function("Predict_Linear"));
        assert!(is_supported_function("minute"));
        assert!(is_supported_function("SUM"));
        assert!(!is_supported_function("foo"));
        assert!(!is_supported_function(""));
    }

    #[test]
    fn test_function_kinds() {
        assert!(is_aggr_func("topk"));
        assert!(!is_aggr_func("rate"));
        let kind = |name: &str| BuiltinFunction::new(name).unwrap().get_type();
        assert_eq!(kind("rate"), BuiltinFunctionType::Rollup);
        assert_eq!(kind("Default_Rollup"), BuiltinFunctionType::Rollup);
        assert_eq!(kind("abs"), BuiltinFunctionType::Transform);
        assert_eq!(kind("SUM"), BuiltinFunctionType::Aggregate);

        let func = BuiltinFunction::new("label_replace").unwrap();
        assert_eq!(func.get_type(), BuiltinFunctionType::Transform);
        assert_eq!(func.to_string(), "label_replace");
        assert!(BuiltinFunction::new("unknown_func").is_err());
    }

    #[test]
    fn test_rollups_are_opaque() {
        let func = BuiltinFunction::new("rate").unwrap();
        assert_eq!(func.get_arg_idx_for_optimization(1), None);
    }

    #[test]
    fn test_registry_names_are_unique() {
        let count = AggregateFunction::iter().count()
            + RollupFunction::iter().count()
            + TransformFunction::iter().count();
        assert_eq!(get_registry().len(), count);
    }
}
