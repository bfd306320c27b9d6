//! Data models for the coupon feed.
//!
//! Strongly-typed coupons, newtype IDs, the category filter and the
//! cursor-pagination request/response pair exchanged with a source.

mod category;
mod coupon;
mod ids;
mod page;

pub use category::Category;
pub use coupon::Coupon;
pub use ids::CouponId;
pub use page::{CouponPage, PageRequest};
