//! JSON-file-based key-value store.
//!
//! Stores all keys in one JSON object under a configurable directory
//! (default: `$XDG_DATA_HOME/coupon-feed/`).

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

#[cfg(feature = "async")]
use core::future::{self, Future};

use crate::error::{CouponFeedError, Result};

/// Application name used for the XDG data directory.
const APP_NAME: &str = "coupon-feed";

/// File holding the stored key-value pairs.
const VALUES_FILE: &str = "preferences.json";

/// Sentinel file used for cross-process file locking.
const LOCK_FILE: &str = "preferences.lock";

/// On-disk representation of the store.
type Values = BTreeMap<String, String>;

/// File-backed key-value store.
///
/// # Concurrency
///
/// Thread safety within a single process is provided by an in-process
/// [`Mutex`]. Cross-process safety is achieved via an advisory file lock
/// on `preferences.lock`: reads take a shared lock, writes an exclusive
/// one.
///
/// # File layout
///
/// ```text
/// <dir>/
///   preferences.lock      (cross-process lock sentinel)
///   preferences.json
/// ```
#[derive(Debug)]
pub struct FileStore {
    /// Root directory containing the store files.
    dir: PathBuf,
    /// Mutex serializing concurrent in-process access.
    lock: Mutex<()>,
    /// Sentinel file for cross-process advisory locking.
    lock_file: fs::File,
}

impl FileStore {
    /// Creates a new file store rooted at the given directory.
    ///
    /// Creates the directory (and parents) if it does not exist, and opens
    /// (or creates) the lock sentinel.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the lock
    /// file cannot be opened.
    #[inline]
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).map_err(storage_io_error)?;
        let lock_file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(LOCK_FILE))
            .map_err(storage_io_error)?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
            lock_file,
        })
    }

    /// Returns the default XDG-compliant data directory for this
    /// application.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform data directory cannot be determined.
    #[inline]
    pub fn default_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|data_path| data_path.join(APP_NAME))
            .ok_or_else(|| {
                CouponFeedError::Storage("could not determine platform data directory".into())
            })
    }

    // ── Private helpers ─────────────────────────────────────────────

    /// Returns the full path for a given file name.
    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Acquires an in-process mutex guard and a shared (read) file lock,
    /// executes `op`, then releases the file lock.
    fn with_shared_lock<R, F: FnOnce() -> Result<R>>(&self, op: F) -> Result<R> {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock_shared().map_err(storage_io_error)?;
        let result = op();
        // Surface the unlock error only when the operation succeeded.
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        result
    }

    /// Acquires an in-process mutex guard and an exclusive (write) file
    /// lock, executes `op`, then releases the file lock.
    fn with_exclusive_lock<R, F: FnOnce() -> Result<R>>(&self, op: F) -> Result<R> {
        let _guard: MutexGuard<'_, ()> = self.lock.lock().map_err(|err| lock_poison_error(&err))?;
        self.lock_file.lock().map_err(storage_io_error)?;
        let result = op();
        if let Err(err) = self.lock_file.unlock()
            && result.is_ok()
        {
            return Err(storage_io_error(err));
        }
        result
    }

    /// Reads the values file. Returns an empty map if it does not exist.
    fn read_values(&self) -> Result<Values> {
        match fs::read_to_string(self.path(VALUES_FILE)) {
            Ok(contents) => serde_json::from_str(&contents).map_err(CouponFeedError::from),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Values::new()),
            Err(err) => Err(storage_io_error(err)),
        }
    }

    /// Atomically writes the values file (write-to-tmp then rename).
    fn write_values(&self, values: &Values) -> Result<()> {
        let path = self.path(VALUES_FILE);
        let tmp_path = self.path(&format!("{VALUES_FILE}.tmp"));
        let json = serde_json::to_string_pretty(values).map_err(CouponFeedError::from)?;
        fs::write(&tmp_path, json).map_err(storage_io_error)?;
        fs::rename(&tmp_path, &path).map_err(storage_io_error)?;
        Ok(())
    }

    /// Reads one value (with lock).
    fn read_value(&self, key: &str) -> Result<Option<String>> {
        self.with_shared_lock(|| Ok(self.read_values()?.remove(key)))
    }

    /// Applies `edit` to the stored map and writes it back (with lock).
    fn update_values<F: FnOnce(&mut Values)>(&self, edit: F) -> Result<()> {
        self.with_exclusive_lock(|| {
            let mut values = self.read_values()?;
            edit(&mut values);
            self.write_values(&values)
        })
    }

    /// Deletes the values file. The lock sentinel is preserved.
    fn clear_all(&self) -> Result<()> {
        self.with_exclusive_lock(|| match fs::remove_file(self.path(VALUES_FILE)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(storage_io_error(err)),
        })
    }
}

// ── Free-standing helpers ───────────────────────────────────────────────

/// Wraps an I/O error into a [`CouponFeedError::Storage`].
fn storage_io_error(err: std::io::Error) -> CouponFeedError {
    CouponFeedError::Storage(Box::new(err))
}

/// Wraps a mutex poison error into a [`CouponFeedError::Storage`].
fn lock_poison_error<T>(err: &std::sync::PoisonError<T>) -> CouponFeedError {
    CouponFeedError::Storage(err.to_string().into())
}

// ── BlockingStore implementation ────────────────────────────────────────

#[cfg(feature = "blocking")]
impl super::BlockingStore for FileStore {
    #[inline]
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.read_value(key)
    }

    #[inline]
    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update_values(|values| {
            let _old = values.insert(key.to_owned(), value.to_owned());
        })
    }

    #[inline]
    fn remove(&self, key: &str) -> Result<()> {
        self.update_values(|values| {
            let _old = values.remove(key);
        })
    }

    #[inline]
    fn clear(&self) -> Result<()> {
        self.clear_all()
    }
}

// ── Store (async) implementation ────────────────────────────────────────

#[cfg(feature = "async")]
impl super::Store for FileStore {
    #[inline]
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send {
        future::ready(self.read_value(key))
    }

    #[inline]
    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.update_values(|values| {
            let _old = values.insert(key.to_owned(), value.to_owned());
        }))
    }

    #[inline]
    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.update_values(|values| {
            let _old = values.remove(key);
        }))
    }

    #[inline]
    fn clear(&self) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.clear_all())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper to create a [`FileStore`] in a temporary directory.
    fn temp_store() -> (FileStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();
        (store, dir)
    }

    #[test]
    fn new_creates_directory_and_lock_file() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let _store = FileStore::new(nested.clone()).unwrap();
        assert!(nested.join(LOCK_FILE).exists());
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let (store, _dir) = temp_store();
        assert_eq!(store.read_value("anything").unwrap(), None);
    }

    #[test]
    fn corrupt_file_is_serialization_error() {
        let (store, dir) = temp_store();
        fs::write(dir.path().join(VALUES_FILE), "{not json").unwrap();
        let err = store.read_value("k").unwrap_err();
        assert!(matches!(err, CouponFeedError::Serialization(_)));
    }

    #[test]
    fn clear_keeps_lock_sentinel() {
        let (store, dir) = temp_store();
        store
            .update_values(|values| {
                let _old = values.insert("k".to_owned(), "v".to_owned());
            })
            .unwrap();
        store.clear_all().unwrap();
        assert!(!dir.path().join(VALUES_FILE).exists());
        assert!(dir.path().join(LOCK_FILE).exists());
        store.clear_all().unwrap();
    }

    #[cfg(feature = "blocking")]
    mod blocking {
        use super::*;
        use crate::storage::BlockingStore;

        #[test]
        fn values_survive_reopen() {
            let dir = tempfile::tempdir().unwrap();
            {
                let store = FileStore::new(dir.path().to_path_buf()).unwrap();
                store.set("lastCategory", "ASIAN").unwrap();
                store.set("other", "x").unwrap();
                store.remove("other").unwrap();
            }
            let reopened = FileStore::new(dir.path().to_path_buf()).unwrap();
            assert_eq!(
                reopened.get("lastCategory").unwrap().as_deref(),
                Some("ASIAN")
            );
            assert_eq!(reopened.get("other").unwrap(), None);
            assert!(!dir.path().join(format!("{VALUES_FILE}.tmp")).exists());
        }
    }

    #[cfg(feature = "async")]
    mod async_store {
        use super::*;
        use crate::storage::Store;

        #[tokio::test]
        async fn set_then_get() {
            let (store, _dir) = temp_store();
            store.set("lastCategory", "ETC").await.unwrap();
            assert_eq!(
                store.get("lastCategory").await.unwrap().as_deref(),
                Some("ETC")
            );
        }
    }
}
