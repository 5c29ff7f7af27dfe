//! Result of a read-through lookup.

use crate::error::CacheError;

/// Value handed back by `get_or_set`.
///
/// `cache_error` is set when the factory produced the value but writing it
/// failed. The value is still returned; the next call will miss again.
#[derive(Debug)]
pub struct GetOrSet<T> {
    pub value: T,
    pub cache_error: Option<CacheError>,
}

impl<T> GetOrSet<T> {
    pub(crate) fn stored(value: T) -> Self {
        Self {
            value,
            cache_error: None,
        }
    }

    pub(crate) fn unstored(value: T, err: CacheError) -> Self {
        Self {
            value,
            cache_error: Some(err),
        }
    }

    /// Whether the value is now held by the cache.
    pub fn is_cached(&self) -> bool {
        self.cache_error.is_none()
    }

    pub fn into_value(self) -> T {
        self.value
    }
}
