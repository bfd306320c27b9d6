//! Coupon feed core.
//!
//! Turns a paginated coupon source into an accumulated, de-duplicated list
//! in which promise coupons are grouped by merchant and interleaved with
//! regular coupons at a fixed cadence.
//!
//! - [`interleave`] holds the pure ordering function.
//! - [`source`] defines the page source traits and a catalog-backed source.
//! - [`feed`] runs the fetch-and-accumulate loop with its concurrency
//!   guards.
//! - [`storage`] provides key-value stores for client preferences.

pub mod error;
#[cfg(any(feature = "async", feature = "blocking"))]
pub mod feed;
pub mod interleave;
pub mod models;
pub mod source;
pub mod storage;
