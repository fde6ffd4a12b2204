use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

use regex::Regex;
use tracing::debug;

use crate::hash::FastHashMap;

/// Environment variable overriding the total number of pattern chars kept in the global cache.
pub const REGEXP_CACHE_CHARS_MAX_ENV: &str = "METRICSQL_REGEXP_CACHE_CHARS_MAX";

const DEFAULT_MAX_REGEXP_CACHE_CHARS: usize = 1_000_000;

/// A compiled regexp or the error message produced while compiling it.
/// Failures are cached as well, so repeated invalid patterns are rejected cheaply.
#[derive(Clone, Debug)]
pub struct RegexpCacheValue {
    pub re_match: Result<Regex, String>,
}

impl RegexpCacheValue {
    pub fn regex(&self) -> Result<&Regex, String> {
        self.re_match.as_ref().map_err(|e| e.clone())
    }
}

#[derive(Default)]
struct CacheInner {
    m: FastHashMap<String, Arc<RegexpCacheValue>>,
    chars_current: usize,
}

/// Cache of compiled regexps keyed by pattern text, bounded by the total length of the keys.
pub struct RegexpCache {
    requests: AtomicU64,
    misses: AtomicU64,
    inner: RwLock<CacheInner>,
    chars_limit: usize,
}

impl RegexpCache {
    pub fn new(chars_limit: usize) -> Self {
        Self {
            requests: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            inner: RwLock::new(CacheInner::default()),
            chars_limit,
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<RegexpCacheValue>> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let item = match self.inner.read() {
            Ok(inner) => inner.m.get(key).cloned(),
            Err(poisoned) => poisoned.into_inner().m.get(key).cloned(),
        };
        if item.is_none() {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        item
    }

    pub fn put(&self, key: &str, value: Arc<RegexpCacheValue>) {
        let mut inner = match self.inner.write() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        if inner.chars_current > self.chars_limit {
            // drop entries accounting for ~10% of the limit
            let mut overflow = self.chars_limit / 10;
            let mut evicted = 0;
            let keys: Vec<String> = inner.m.keys().cloned().collect();
            for k in keys {
                inner.m.remove(&k);
                inner.chars_current = inner.chars_current.saturating_sub(k.len());
                evicted += 1;
                if k.len() >= overflow {
                    break;
                }
                overflow -= k.len();
            }
            debug!(
                evicted,
                chars_current = inner.chars_current,
                chars_limit = self.chars_limit,
                "regexp cache overflow"
            );
        }
        if inner.m.insert(key.to_string(), value).is_none() {
            inner.chars_current += key.len();
        }
    }

    /// returns the number of cached regexps.
    pub fn len(&self) -> usize {
        match self.inner.read() {
            Ok(inner) => inner.m.len(),
            Err(poisoned) => poisoned.into_inner().m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// returns the total number of chars in the cached patterns.
    pub fn chars_current(&self) -> usize {
        match self.inner.read() {
            Ok(inner) => inner.chars_current,
            Err(poisoned) => poisoned.into_inner().chars_current,
        }
    }

    pub fn chars_limit(&self) -> usize {
        self.chars_limit
    }

    pub fn clear(&self) {
        let mut inner = match self.inner.write() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.m.clear();
        inner.chars_current = 0;
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}

fn get_regexp_cache_max_chars() -> usize {
    static REGEXP_CACHE_MAX_CHARS: OnceLock<usize> = OnceLock::new();
    *REGEXP_CACHE_MAX_CHARS.get_or_init(|| {
        std::env::var(REGEXP_CACHE_CHARS_MAX_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_MAX_REGEXP_CACHE_CHARS)
    })
}

pub fn get_regexp_cache() -> &'static RegexpCache {
    static REGEX_CACHE: OnceLock<RegexpCache> = OnceLock::new();
    REGEX_CACHE.get_or_init(|| RegexpCache::new(get_regexp_cache_max_chars()))
}

pub fn get_regexp_from_cache(expr: &str) -> Arc<RegexpCacheValue> {
    let cache = get_regexp_cache();
    if let Some(rcv) = cache.get(expr) {
        // Fast path - the regexp found in the cache.
        return rcv;
    }
    let re_match = Regex::new(expr).map_err(|e| format!("cannot parse regexp {expr:?}: {e}"));
    let rcv = Arc::new(RegexpCacheValue { re_match });
    cache.put(expr, rcv.clone());
    rcv
}

/// Compiles `expr` through the global cache.
pub fn compile_regexp(expr: &str) -> Result<Regex, String> {
    let rcv = get_regexp_from_cache(expr);
    rcv.regex().cloned()
}

/// Compiles `expr` so that it must match the whole input, the way label regexp filters do.
pub fn compile_regexp_anchored(expr: &str) -> Result<Regex, String> {
    let anchored = format!("^(?:{expr})$");
    compile_regexp(&anchored)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use regex::Regex;

    use super::*;

    fn value(re: &str) -> Arc<RegexpCacheValue> {
        Arc::new(RegexpCacheValue {
            re_match: Regex::new(re).map_err(|e| e.to_string()),
        })
    }

    #[test]
    fn test_get_put() {
        let cache = RegexpCache::new(100);
        assert!(cache.get("foo").is_none());
        cache.put("foo", value("foo"));
        assert!(cache.get("foo").is_some());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.chars_current(), 3);
        assert_eq!(cache.requests(), 2);
        assert_eq!(cache.misses(), 1);

        cache.put("foo", value("foo"));
        assert_eq!(cache.chars_current(), 3);
    }

    #[test]
    fn test_overflow() {
        let cache = RegexpCache::new(10);
        for key in ["aaaa", "bbbb", "cccc"] {
            cache.put(key, value(key));
        }
        assert_eq!(cache.chars_current(), 12);
        cache.put("dd", value("dd"));
        assert!(cache.chars_current() <= 10);
        assert!(cache.get("dd").is_some());
        assert!(cache.len() < 4);
    }

    #[test]
    fn test_clear() {
        let cache = RegexpCache::new(100);
        cache.put("foo", value("foo"));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.chars_current(), 0);
    }

    #[test]
    fn test_compile_regexp_anchored() {
        let re = compile_regexp_anchored("foo|bar").unwrap();
        assert!(re.is_match("foo"));
        assert!(re.is_match("bar"));
        assert!(!re.is_match("foobar"));
        assert!(!re.is_match("xfoo"));

        assert!(compile_regexp_anchored("x[").is_err());
        assert!(compile_regexp_anchored("x(").is_err());
        assert!(compile_regexp_anchored("x)").is_err());
        // invalid patterns are cached too
        assert!(compile_regexp_anchored("x[").is_err());
    }
}
