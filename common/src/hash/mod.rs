use std::collections::HashMap;

use ahash::RandomState;

pub type FastHashMap<K, V> = HashMap<K, V, RandomState>;
