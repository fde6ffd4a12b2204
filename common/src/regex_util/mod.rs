mod regexp_cache;

pub use regexp_cache::*;
