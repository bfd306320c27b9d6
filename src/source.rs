//! Pluggable coupon sources feeding the pagination loop.
//!
//! This module defines the [`CouponSource`] (async) and
//! [`BlockingCouponSource`] (blocking) traits via a shared macro. A source
//! serves cursor-keyed pages of coupons and redeems coupons; transport,
//! authentication and wire encoding are left to the implementation.

mod catalog;

pub use catalog::{CatalogEntry, CatalogSource};

/// Generates a source trait (async or blocking) with all methods.
///
/// Uses `@methods` to define the method list once, and `@method` to render
/// each method in async (`impl Future + Send`) or blocking (`fn`) style.
macro_rules! define_source {
    // ── Entry points ────────────────────────────────────────────────
    (
        trait_name: $trait_name:ident,
        trait_doc: $trait_doc:expr,
        mode: async_mode,
    ) => {
        #[doc = $trait_doc]
        pub trait $trait_name: core::fmt::Debug + Send + Sync {
            define_source!(@methods async_mode);
        }
    };
    (
        trait_name: $trait_name:ident,
        trait_doc: $trait_doc:expr,
        mode: blocking,
    ) => {
        #[doc = $trait_doc]
        pub trait $trait_name: core::fmt::Debug + Send + Sync {
            define_source!(@methods blocking);
        }
    };

    // ── Single method list (shared between both variants) ───────────
    (@methods $mode:ident) => {
        define_source!(@method $mode, fetch_page,
            "Fetches the page of coupons that follows `request.cursor`.\n\nCoupons are returned in ascending id order; `has_more` tells whether\nanother page exists.\n\n# Errors\n\nReturns an error if the page cannot be retrieved. The feed reports any\nerror as [`crate::error::CouponFeedError::FetchFailed`].",
            request: PageRequest, -> Result<CouponPage>);
        define_source!(@method $mode, redeem,
            "Marks the coupon as used at the source.\n\n# Errors\n\nReturns [`crate::error::CouponFeedError::UnknownCoupon`] or\n[`crate::error::CouponFeedError::AlreadyUsed`] when the source knows the\ncoupon cannot be redeemed, or another error if the call fails.",
            id: CouponId, -> Result<()>);
    };

    // ── Blocking method renderer ────────────────────────────────────
    (@method blocking, $name:ident, $doc:expr,
     $($param:ident: $param_ty:ty,)* -> $ret:ty) => {
        #[doc = $doc]
        fn $name(&self $(, $param: $param_ty)*) -> $ret;
    };

    // ── Async method renderer (returns impl Future + Send) ──────────
    (@method async_mode, $name:ident, $doc:expr,
     $($param:ident: $param_ty:ty,)* -> $ret:ty) => {
        #[doc = $doc]
        fn $name(&self $(, $param: $param_ty)*)
            -> impl core::future::Future<Output = $ret> + Send;
    };
}

#[cfg(feature = "async")]
mod async_source {
    //! Async source trait definition.

    use crate::error::Result;
    use crate::models::{CouponId, CouponPage, PageRequest};

    define_source! {
        trait_name: CouponSource,
        trait_doc: "Async source of coupon pages.\n\nAll methods take `&self`; implementations that mutate should use interior\nmutability (e.g. `Mutex`).",
        mode: async_mode,
    }
}

#[cfg(feature = "blocking")]
mod blocking_source {
    //! Blocking source trait definition.

    use crate::error::Result;
    use crate::models::{CouponId, CouponPage, PageRequest};

    define_source! {
        trait_name: BlockingCouponSource,
        trait_doc: "Blocking source of coupon pages.\n\nAll methods take `&self`; implementations that mutate should use interior\nmutability (e.g. `Mutex`).",
        mode: blocking,
    }
}

#[cfg(feature = "async")]
pub use async_source::CouponSource;
#[cfg(feature = "blocking")]
pub use blocking_source::BlockingCouponSource;
