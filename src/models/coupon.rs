//! Coupon model.

use serde::{Deserialize, Serialize};

use super::CouponId;

/// A redeemable coupon as delivered by the coupon source.
///
/// Field names follow the remote API's JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    /// Unique identifier, increasing in fetch order.
    #[serde(rename = "betaCouponId")]
    pub id: CouponId,
    /// Merchant offering the coupon; groups promise coupons.
    #[serde(rename = "marketName")]
    pub merchant_name: String,
    /// Display title.
    #[serde(rename = "couponName")]
    pub title: String,
    /// Display description.
    #[serde(rename = "couponDetail")]
    pub detail: String,
    /// Opaque image reference.
    #[serde(rename = "image")]
    pub image_ref: String,
    /// Whether the coupon has been redeemed.
    pub is_used: bool,
    /// Whether the coupon belongs to a merchant-run promise campaign.
    #[serde(default)]
    pub is_promise: bool,
}
