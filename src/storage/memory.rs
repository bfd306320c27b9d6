//! In-memory key-value store.
//!
//! Provides [`InMemoryStore`], a thread-safe in-memory implementation of
//! the store traits. Ideal for tests and for sessions that should not
//! persist anything.

use std::collections::HashMap;
use std::sync::Mutex;

#[cfg(feature = "async")]
use core::future::{self, Future};

use crate::error::{CouponFeedError, Result};

/// Thread-safe in-memory key-value store.
///
/// This type implements both [`super::Store`] (async) and
/// [`super::BlockingStore`] (blocking) traits.
///
/// # Example
///
/// ```rust
/// use coupon_feed::storage::InMemoryStore;
///
/// let store = InMemoryStore::new();
/// # let _ = store;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    /// Stored values behind a mutex for thread-safe interior mutability.
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the inner lock and applies a closure.
    fn with_lock<R, F: FnOnce(&mut HashMap<String, String>) -> R>(&self, op: F) -> Result<R> {
        let mut values = self.values.lock().map_err(|err| lock_error(&err))?;
        Ok(op(&mut values))
    }

    /// Reads a value.
    fn read(&self, key: &str) -> Result<Option<String>> {
        self.with_lock(|values| values.get(key).cloned())
    }

    /// Writes a value.
    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.with_lock(|values| {
            let _old = values.insert(key.to_owned(), value.to_owned());
        })
    }

    /// Deletes a value.
    fn delete(&self, key: &str) -> Result<()> {
        self.with_lock(|values| {
            let _old = values.remove(key);
        })
    }

    /// Deletes every value.
    fn delete_all(&self) -> Result<()> {
        self.with_lock(HashMap::clear)
    }
}

/// Wraps a mutex poison error.
fn lock_error<T>(err: &std::sync::PoisonError<T>) -> CouponFeedError {
    CouponFeedError::Storage(err.to_string().into())
}

// ── BlockingStore implementation ────────────────────────────────────────

#[cfg(feature = "blocking")]
impl super::BlockingStore for InMemoryStore {
    #[inline]
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.read(key)
    }

    #[inline]
    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.write(key, value)
    }

    #[inline]
    fn remove(&self, key: &str) -> Result<()> {
        self.delete(key)
    }

    #[inline]
    fn clear(&self) -> Result<()> {
        self.delete_all()
    }
}

// ── Store (async) implementation ────────────────────────────────────────

#[cfg(feature = "async")]
impl super::Store for InMemoryStore {
    #[inline]
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send {
        future::ready(self.read(key))
    }

    #[inline]
    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.write(key, value))
    }

    #[inline]
    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.delete(key))
    }

    #[inline]
    fn clear(&self) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.delete_all())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "blocking")]
    mod blocking {
        use super::*;
        use crate::storage::BlockingStore;

        #[test]
        fn set_get_remove() {
            let store = InMemoryStore::new();
            assert_eq!(store.get("k").unwrap(), None);

            store.set("k", "v1").unwrap();
            store.set("k", "v2").unwrap();
            assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));

            store.remove("k").unwrap();
            assert_eq!(store.get("k").unwrap(), None);
            store.remove("k").unwrap();
        }

        #[test]
        fn clear_drops_everything() {
            let store = InMemoryStore::new();
            store.set("a", "1").unwrap();
            store.set("b", "2").unwrap();
            store.clear().unwrap();
            assert_eq!(store.get("a").unwrap(), None);
            assert_eq!(store.get("b").unwrap(), None);
        }
    }

    #[cfg(feature = "async")]
    mod async_store {
        use super::*;
        use crate::storage::Store;

        #[tokio::test]
        async fn set_then_get() {
            let store = InMemoryStore::new();
            store.set("lastCategory", "KOREAN").await.unwrap();
            assert_eq!(
                store.get("lastCategory").await.unwrap().as_deref(),
                Some("KOREAN")
            );
            store.clear().await.unwrap();
            assert_eq!(store.get("lastCategory").await.unwrap(), None);
        }
    }
}
