//! Value traits
//!
//! Bounds for what a store can hold, plus numeric access for counters.

use std::io;

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// Anything a store can hold.
pub trait CacheValue: Clone + Serialize + Send + Sync + 'static {}

impl<T> CacheValue for T where T: Clone + Serialize + Send + Sync + 'static {}

// == Numeric ==
/// Values that `increment`/`decrement` can operate on.
pub trait Numeric: Sized {
    fn from_count(count: i64) -> Self;

    /// Returns `None` when the value is not a number.
    fn as_count(&self) -> Option<i64>;
}

impl Numeric for i64 {
    fn from_count(count: i64) -> Self {
        count
    }

    fn as_count(&self) -> Option<i64> {
        Some(*self)
    }
}

impl Numeric for Value {
    fn from_count(count: i64) -> Self {
        Value::from(count)
    }

    fn as_count(&self) -> Option<i64> {
        self.as_i64()
    }
}

// == Size Estimation ==
struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Approximate footprint of an entry: key bytes plus JSON-serialized value
/// bytes. Counts without allocating the serialized form.
pub fn serialized_size<T: Serialize>(key: &str, value: &T) -> Result<usize> {
    let mut counter = ByteCounter(0);
    serde_json::to_writer(&mut counter, value)?;
    Ok(key.len() + counter.0)
}
