//! Paginated, de-duplicated coupon feed.
//!
//! Combines a [`CouponSource`] / [`BlockingCouponSource`] with the
//! accumulate-and-interleave loop that backs an infinitely scrolling
//! coupon list. Callers trigger [`CouponFeed::load_next_page`] from
//! whatever visibility signal they have; redundant triggers are absorbed
//! by the in-flight guard.
//!
//! [`CouponSource`]: crate::source::CouponSource
//! [`BlockingCouponSource`]: crate::source::BlockingCouponSource
//! [`CouponFeed::load_next_page`]: crate::feed::CouponFeed::load_next_page

use std::collections::HashSet;

use crate::error::{CouponFeedError, Result};
use crate::interleave::{Cadence, interleave};
use crate::models::{Category, Coupon, CouponId, CouponPage, PageRequest};

/// Page size requested when the builder is not given one.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Outcome of a page load that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLoad {
    /// A page was merged into the feed.
    Loaded {
        /// Coupons appended after de-duplication.
        added: usize,
        /// Whether the source reported further pages.
        has_more: bool,
    },
    /// Another request is outstanding; this trigger was dropped.
    InFlight,
    /// The source has no more pages; nothing was requested.
    Exhausted,
    /// The filter changed while the request was outstanding; the page was
    /// discarded.
    Stale,
}

impl core::fmt::Display for PageLoad {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {
            Self::Loaded { added, has_more } => {
                write!(f, "loaded {added} new coupons (more: {has_more})")
            }
            Self::InFlight => f.write_str("request already in flight"),
            Self::Exhausted => f.write_str("no more pages"),
            Self::Stale => f.write_str("discarded stale page"),
        }
    }
}

/// Request issued for one generation of the feed.
#[derive(Debug, Clone, Copy)]
struct Ticket {
    /// Generation the request belongs to.
    generation: u64,
    /// Request sent to the source.
    request: PageRequest,
}

/// Mutable feed state shared by the async and blocking feeds.
#[derive(Debug)]
struct FeedState {
    /// Accumulated coupons in display order.
    coupons: Vec<Coupon>,
    /// Ids present in `coupons`.
    seen: HashSet<CouponId>,
    /// Id of the last coupon of the last raw page.
    cursor: Option<CouponId>,
    /// Whether the source reported more pages.
    has_more: bool,
    /// Active category filter.
    category: Category,
    /// Whether a request of the current generation is outstanding.
    in_flight: bool,
    /// Bumped on every filter reset; responses from older generations are
    /// discarded.
    generation: u64,
    /// Coupons with a redemption outstanding at the source. Kept across
    /// resets.
    redeeming: HashSet<CouponId>,
}

impl FeedState {
    /// Creates an empty state for `category`.
    fn new(category: Category) -> Self {
        Self {
            coupons: Vec::new(),
            seen: HashSet::new(),
            cursor: None,
            has_more: true,
            category,
            in_flight: false,
            generation: 0,
            redeeming: HashSet::new(),
        }
    }

    /// Drops all coupons and starts a new generation for `category`.
    ///
    /// Releases the in-flight guard: a request still outstanding belongs to
    /// the previous generation and will be discarded on arrival.
    fn reset(&mut self, category: Category) {
        self.coupons.clear();
        self.seen.clear();
        self.cursor = None;
        self.has_more = true;
        self.category = category;
        self.in_flight = false;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Claims the in-flight slot and builds the next request, or returns
    /// why no request should be sent.
    fn begin(&mut self, page_size: usize) -> core::result::Result<Ticket, PageLoad> {
        if self.in_flight {
            return Err(PageLoad::InFlight);
        }
        if !self.has_more {
            return Err(PageLoad::Exhausted);
        }
        self.in_flight = true;
        Ok(Ticket {
            generation: self.generation,
            request: PageRequest {
                cursor: self.cursor,
                category: self.category,
                page_size,
            },
        })
    }

    /// Merges a fetched page.
    ///
    /// Ids already present are dropped (the first-seen copy wins), the
    /// remaining batch is interleaved on its own and appended. The cursor
    /// moves to the last coupon of the raw page.
    fn finish(&mut self, ticket: &Ticket, page: CouponPage, cadence: Cadence) -> PageLoad {
        if ticket.generation != self.generation {
            return PageLoad::Stale;
        }
        self.in_flight = false;

        let CouponPage { items, has_more } = page;
        if let Some(last) = items.last() {
            self.cursor = Some(last.id);
        }
        let seen = &mut self.seen;
        let fresh: Vec<Coupon> = items
            .into_iter()
            .filter(|coupon| seen.insert(coupon.id))
            .collect();
        let added = fresh.len();
        self.coupons.extend(interleave(fresh, cadence));
        self.has_more = has_more;
        PageLoad::Loaded { added, has_more }
    }

    /// Releases the in-flight slot after a failed request.
    fn fail(&mut self, ticket: &Ticket) {
        if ticket.generation == self.generation {
            self.in_flight = false;
        }
    }

    /// Reserves an accumulated, unused coupon for redemption.
    fn reserve_redeem(&mut self, id: CouponId) -> Result<()> {
        let coupon = self
            .coupons
            .iter()
            .find(|coupon| coupon.id == id)
            .ok_or(CouponFeedError::UnknownCoupon(id))?;
        if coupon.is_used {
            return Err(CouponFeedError::AlreadyUsed(id));
        }
        if !self.redeeming.insert(id) {
            return Err(CouponFeedError::RedeemInFlight(id));
        }
        Ok(())
    }

    /// Releases a reservation, flagging the coupon used if the source
    /// accepted the redemption.
    fn finish_redeem(&mut self, id: CouponId, redeemed: bool) {
        let _reserved = self.redeeming.remove(&id);
        if !redeemed {
            return;
        }
        if let Some(coupon) = self.coupons.iter_mut().find(|coupon| coupon.id == id) {
            coupon.is_used = true;
        }
    }
}

/// Generates a coupon feed (async or blocking) with builder and methods.
macro_rules! define_feed {
    (
        feed_name: $feed:ident,
        builder_name: $builder:ident,
        source_trait: $source_trait:ident,
        feed_doc: $feed_doc:expr,
        builder_doc: $builder_doc:expr,
        $(async_kw: $async_kw:tt,)?
        $(await_kw: $await_ext:tt,)?
    ) => {
        #[doc = $builder_doc]
        #[derive(Debug)]
        pub struct $builder<S: $source_trait> {
            /// Coupon source.
            source: Option<S>,
            /// Coupons requested per page.
            page_size: usize,
            /// Interleave cadence for each new batch.
            cadence: Cadence,
            /// Initial category filter.
            category: Category,
        }

        impl<S: $source_trait> $builder<S> {
            /// Sets the coupon source.
            #[inline]
            #[must_use]
            pub fn source(mut self, source: S) -> Self {
                self.source = Some(source);
                self
            }

            /// Sets the number of coupons requested per page.
            #[inline]
            #[must_use]
            pub fn page_size(mut self, page_size: usize) -> Self {
                self.page_size = page_size;
                self
            }

            /// Sets the interleave cadence.
            #[inline]
            #[must_use]
            pub fn cadence(mut self, cadence: Cadence) -> Self {
                self.cadence = cadence;
                self
            }

            /// Sets the initial category filter.
            #[inline]
            #[must_use]
            pub fn category(mut self, category: Category) -> Self {
                self.category = category;
                self
            }

            /// Builds the feed. No page is requested until the first
            /// trigger.
            ///
            /// # Errors
            ///
            /// Returns [`CouponFeedError::InvalidConfig`] if no source was
            /// provided or the page size is zero.
            #[inline]
            pub fn build(self) -> Result<$feed<S>> {
                let source = self.source.ok_or_else(|| {
                    CouponFeedError::InvalidConfig("coupon source is required".to_owned())
                })?;
                if self.page_size == 0 {
                    return Err(CouponFeedError::InvalidConfig(
                        "page size must be at least 1".to_owned(),
                    ));
                }
                tracing::debug!(
                    page_size = self.page_size,
                    cadence = self.cadence.get(),
                    category = %self.category,
                    "building coupon feed"
                );
                Ok($feed {
                    source,
                    page_size: self.page_size,
                    cadence: self.cadence,
                    state: Mutex::new(FeedState::new(self.category)),
                })
            }
        }

        #[doc = $feed_doc]
        #[derive(Debug)]
        pub struct $feed<S: $source_trait> {
            /// Coupon source.
            source: S,
            /// Coupons requested per page.
            page_size: usize,
            /// Interleave cadence for each new batch.
            cadence: Cadence,
            /// Accumulated state; never locked across a source call.
            state: Mutex<FeedState>,
        }

        impl<S: $source_trait> $feed<S> {
            /// Creates a new builder for configuring the feed.
            #[inline]
            #[must_use]
            pub const fn builder() -> $builder<S> {
                $builder {
                    source: None,
                    page_size: DEFAULT_PAGE_SIZE,
                    cadence: Cadence::DEFAULT,
                    category: Category::All,
                }
            }

            /// Requests the next page and merges it into the feed.
            ///
            /// Does nothing and returns [`PageLoad::InFlight`] while another
            /// request is outstanding, or [`PageLoad::Exhausted`] once the
            /// source reported the last page.
            ///
            /// # Errors
            ///
            /// Returns [`CouponFeedError::FetchFailed`] if the source fails;
            /// the feed is left unchanged and nothing is retried.
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn load_next_page(&self) -> Result<PageLoad> {
                let ticket = match self.with_state(|state| state.begin(self.page_size))? {
                    Ok(ticket) => ticket,
                    Err(skipped) => {
                        tracing::trace!(outcome = %skipped, "page load skipped");
                        return Ok(skipped);
                    }
                };
                tracing::debug!(
                    cursor = ticket.request.cursor.map(CouponId::into_inner),
                    category = %ticket.request.category,
                    page_size = ticket.request.page_size,
                    "fetching coupon page"
                );

                match self.source.fetch_page(ticket.request) $( .$await_ext )? {
                    Ok(page) => {
                        let outcome =
                            self.with_state(|state| state.finish(&ticket, page, self.cadence))?;
                        if outcome == PageLoad::Stale {
                            tracing::warn!(
                                category = %ticket.request.category,
                                "filter changed while fetching; page discarded"
                            );
                        } else {
                            tracing::debug!(outcome = %outcome, "coupon page merged");
                        }
                        Ok(outcome)
                    }
                    Err(err) => {
                        self.with_state(|state| state.fail(&ticket))?;
                        tracing::warn!(error = %err, "coupon page fetch failed");
                        Err(CouponFeedError::fetch_failed(err))
                    }
                }
            }

            /// Clears the feed, switches to `category` and loads its first
            /// page.
            ///
            /// A request still outstanding for the previous filter runs to
            /// completion but its page is discarded. The in-flight guard is
            /// per filter generation: while that old request finishes, the
            /// first page of the new filter is requested alongside it, so
            /// the source may briefly see two outstanding requests.
            ///
            /// # Errors
            ///
            /// Returns [`CouponFeedError::FetchFailed`] if the first page
            /// cannot be fetched; the feed stays empty.
            #[tracing::instrument(skip_all, fields(category = %category))]
            pub $($async_kw)? fn reset_filter(&self, category: Category) -> Result<PageLoad> {
                self.with_state(|state| state.reset(category))?;
                tracing::debug!("feed reset");
                self.load_next_page() $( .$await_ext )?
            }

            /// Redeems an accumulated coupon through the source and marks
            /// it used.
            ///
            /// # Errors
            ///
            /// Returns [`CouponFeedError::UnknownCoupon`] if the coupon is
            /// not in the feed, [`CouponFeedError::AlreadyUsed`] if it was
            /// already redeemed, [`CouponFeedError::RedeemInFlight`] if
            /// another redemption of it is outstanding, or
            /// [`CouponFeedError::RedeemFailed`] if the source call fails.
            #[tracing::instrument(skip_all, fields(coupon = %id))]
            pub $($async_kw)? fn redeem(&self, id: CouponId) -> Result<()> {
                self.with_state(|state| state.reserve_redeem(id))??;
                let outcome = self.source.redeem(id) $( .$await_ext )?;
                self.with_state(|state| state.finish_redeem(id, outcome.is_ok()))?;
                if let Err(err) = outcome {
                    tracing::warn!(error = %err, "coupon redemption failed");
                    return Err(CouponFeedError::redeem_failed(err));
                }
                tracing::debug!("coupon redeemed");
                Ok(())
            }

            /// Returns a snapshot of the accumulated coupons in display
            /// order.
            ///
            /// # Errors
            ///
            /// Returns [`CouponFeedError::StatePoisoned`] if the state lock
            /// is poisoned.
            #[inline]
            pub fn coupons(&self) -> Result<Vec<Coupon>> {
                self.with_state(|state| state.coupons.clone())
            }

            /// Runs `op` over the accumulated coupons without cloning them.
            ///
            /// The state lock is held while `op` runs. Calling back into
            /// this feed from `op` locks it a second time, which deadlocks
            /// or panics; use [`Self::coupons`] for a snapshot instead.
            ///
            /// # Errors
            ///
            /// Returns [`CouponFeedError::StatePoisoned`] if the state lock
            /// is poisoned.
            #[inline]
            pub fn with_coupons<R, F: FnOnce(&[Coupon]) -> R>(&self, op: F) -> Result<R> {
                self.with_state(|state| op(&state.coupons))
            }

            /// Returns whether the source reported more pages.
            ///
            /// # Errors
            ///
            /// Returns [`CouponFeedError::StatePoisoned`] if the state lock
            /// is poisoned.
            #[inline]
            pub fn has_more(&self) -> Result<bool> {
                self.with_state(|state| state.has_more)
            }

            /// Returns whether a request is outstanding.
            ///
            /// # Errors
            ///
            /// Returns [`CouponFeedError::StatePoisoned`] if the state lock
            /// is poisoned.
            #[inline]
            pub fn is_loading(&self) -> Result<bool> {
                self.with_state(|state| state.in_flight)
            }

            /// Returns the active category filter.
            ///
            /// # Errors
            ///
            /// Returns [`CouponFeedError::StatePoisoned`] if the state lock
            /// is poisoned.
            #[inline]
            pub fn category(&self) -> Result<Category> {
                self.with_state(|state| state.category)
            }

            /// Returns the pagination cursor.
            ///
            /// # Errors
            ///
            /// Returns [`CouponFeedError::StatePoisoned`] if the state lock
            /// is poisoned.
            #[inline]
            pub fn cursor(&self) -> Result<Option<CouponId>> {
                self.with_state(|state| state.cursor)
            }

            /// Returns a reference to the coupon source.
            #[inline]
            #[must_use]
            pub const fn source(&self) -> &S {
                &self.source
            }

            /// Returns the number of coupons requested per page.
            #[inline]
            #[must_use]
            pub const fn page_size(&self) -> usize {
                self.page_size
            }

            /// Returns the interleave cadence.
            #[inline]
            #[must_use]
            pub const fn cadence(&self) -> Cadence {
                self.cadence
            }

            /// Locks the state and applies a closure.
            fn with_state<R, F: FnOnce(&mut FeedState) -> R>(&self, op: F) -> Result<R> {
                let mut state = self
                    .state
                    .lock()
                    .map_err(|err| CouponFeedError::StatePoisoned(err.to_string()))?;
                Ok(op(&mut state))
            }
        }
    };
}

// ── Async variant ───────────────────────────────────────────────────────

#[cfg(feature = "async")]
mod async_feed {
    //! Async coupon feed.

    use std::sync::Mutex;

    use crate::error::{CouponFeedError, Result};
    use crate::interleave::Cadence;
    use crate::models::{Category, Coupon, CouponId};
    use crate::source::CouponSource;

    use super::{DEFAULT_PAGE_SIZE, FeedState, PageLoad};

    define_feed! {
        feed_name: CouponFeed,
        builder_name: CouponFeedBuilder,
        source_trait: CouponSource,
        feed_doc: "Async paginated coupon feed.\n\nUse [`CouponFeed::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`CouponFeed`].",
        async_kw: async,
        await_kw: await,
    }
}

// ── Blocking variant ────────────────────────────────────────────────────

#[cfg(feature = "blocking")]
mod blocking_feed {
    //! Blocking coupon feed.

    use std::sync::Mutex;

    use crate::error::{CouponFeedError, Result};
    use crate::interleave::Cadence;
    use crate::models::{Category, Coupon, CouponId};
    use crate::source::BlockingCouponSource;

    use super::{DEFAULT_PAGE_SIZE, FeedState, PageLoad};

    define_feed! {
        feed_name: CouponFeedBlocking,
        builder_name: CouponFeedBlockingBuilder,
        source_trait: BlockingCouponSource,
        feed_doc: "Blocking paginated coupon feed.\n\nUse [`CouponFeedBlocking::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`CouponFeedBlocking`].",
    }
}

#[cfg(feature = "async")]
pub use async_feed::{CouponFeed, CouponFeedBuilder};
#[cfg(feature = "blocking")]
pub use blocking_feed::{CouponFeedBlocking, CouponFeedBlockingBuilder};
