//! Catalog-backed coupon source.
//!
//! Provides [`CatalogSource`], a thread-safe source that serves pages out
//! of an in-memory list of categorized coupons, optionally loaded from and
//! saved to a JSON file. It implements both [`super::CouponSource`] and
//! [`super::BlockingCouponSource`].

use std::fs;
use std::path::Path;
use std::sync::Mutex;

#[cfg(feature = "async")]
use core::future::{self, Future};

use serde::{Deserialize, Serialize};

use crate::error::{CouponFeedError, Result};
use crate::models::{Category, Coupon, CouponId, CouponPage, PageRequest};

/// A coupon filed under the category it is listed in.
///
/// Serialized as the coupon's own fields plus a `category` code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Listing category.
    #[serde(default)]
    pub category: Category,
    /// The coupon itself.
    #[serde(flatten)]
    pub coupon: Coupon,
}

/// In-memory coupon catalog acting as a paginated source.
///
/// # Paging
///
/// A request matches entries in its category (every entry for
/// [`Category::All`]) whose id is greater than the cursor. Matches are
/// served in ascending id order, `page_size` at a time, and `has_more` is
/// set while matches remain beyond the page.
///
/// # Example
///
/// ```rust
/// use coupon_feed::source::CatalogSource;
///
/// let catalog = CatalogSource::new(Vec::new());
/// assert!(catalog.entries().unwrap().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct CatalogSource {
    /// Catalog entries behind a mutex for interior mutability.
    entries: Mutex<Vec<CatalogEntry>>,
}

impl CatalogSource {
    /// Creates a source over the given entries.
    #[inline]
    #[must_use]
    pub const fn new(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Loads a catalog from a JSON file holding an array of entries.
    ///
    /// # Errors
    ///
    /// Returns [`CouponFeedError::Storage`] if the file cannot be read and
    /// [`CouponFeedError::Serialization`] if it is not a valid catalog.
    #[inline]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(catalog_io_error)?;
        let entries: Vec<CatalogEntry> = serde_json::from_str(&contents)?;
        tracing::debug!(path = %path.display(), entries = entries.len(), "catalog loaded");
        Ok(Self::new(entries))
    }

    /// Atomically writes the catalog to a JSON file (write-to-tmp then
    /// rename).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any file operation fails.
    #[inline]
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = self.with_lock(|entries| serde_json::to_string_pretty(entries))??;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(catalog_io_error)?;
        fs::rename(&tmp_path, path).map_err(catalog_io_error)?;
        Ok(())
    }

    /// Returns a snapshot of all entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    #[inline]
    pub fn entries(&self) -> Result<Vec<CatalogEntry>> {
        self.with_lock(|entries| entries.clone())
    }

    /// Acquires the entries lock and applies a closure.
    fn with_lock<R, F: FnOnce(&mut Vec<CatalogEntry>) -> R>(&self, op: F) -> Result<R> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|err| CouponFeedError::Storage(err.to_string().into()))?;
        Ok(op(&mut entries))
    }

    /// Builds the page that answers `request`.
    fn page(&self, request: PageRequest) -> Result<CouponPage> {
        self.with_lock(|entries| {
            let mut matching: Vec<&CatalogEntry> = entries
                .iter()
                .filter(|entry| request.category.includes(entry.category))
                .filter(|entry| request.cursor.is_none_or(|cursor| entry.coupon.id > cursor))
                .collect();
            matching.sort_by_key(|entry| entry.coupon.id);
            let has_more = matching.len() > request.page_size;
            let items = matching
                .into_iter()
                .take(request.page_size)
                .map(|entry| entry.coupon.clone())
                .collect();
            CouponPage { items, has_more }
        })
    }

    /// Flags the coupon as used.
    fn mark_used(&self, id: CouponId) -> Result<()> {
        self.with_lock(|entries| {
            let entry = entries
                .iter_mut()
                .find(|entry| entry.coupon.id == id)
                .ok_or(CouponFeedError::UnknownCoupon(id))?;
            if entry.coupon.is_used {
                return Err(CouponFeedError::AlreadyUsed(id));
            }
            entry.coupon.is_used = true;
            Ok(())
        })?
    }
}

/// Wraps an I/O error into a [`CouponFeedError::Storage`].
fn catalog_io_error(err: std::io::Error) -> CouponFeedError {
    CouponFeedError::Storage(Box::new(err))
}

// ── BlockingCouponSource implementation ─────────────────────────────────

#[cfg(feature = "blocking")]
impl super::BlockingCouponSource for CatalogSource {
    #[inline]
    fn fetch_page(&self, request: PageRequest) -> Result<CouponPage> {
        self.page(request)
    }

    #[inline]
    fn redeem(&self, id: CouponId) -> Result<()> {
        self.mark_used(id)
    }
}

// ── CouponSource (async) implementation ─────────────────────────────────

#[cfg(feature = "async")]
impl super::CouponSource for CatalogSource {
    #[inline]
    fn fetch_page(&self, request: PageRequest) -> impl Future<Output = Result<CouponPage>> + Send {
        future::ready(self.page(request))
    }

    #[inline]
    fn redeem(&self, id: CouponId) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.mark_used(id))
    }
}
