//! Error types for the coupon feed library.

use crate::models::CouponId;

/// All errors that can occur when using the coupon feed.
#[derive(Debug, thiserror::Error)]
pub enum CouponFeedError {
    /// Loading a page of coupons from the source failed.
    #[error("failed to fetch coupon page: {0}")]
    FetchFailed(Box<dyn core::error::Error + Send + Sync>),

    /// The source refused or failed to redeem a coupon.
    #[error("failed to redeem coupon: {0}")]
    RedeemFailed(Box<dyn core::error::Error + Send + Sync>),

    /// The coupon is not known to the feed or source.
    #[error("unknown coupon {0}")]
    UnknownCoupon(CouponId),

    /// The coupon has already been redeemed.
    #[error("coupon {0} has already been used")]
    AlreadyUsed(CouponId),

    /// A redemption of the same coupon is already outstanding.
    #[error("coupon {0} is already being redeemed")]
    RedeemInFlight(CouponId),

    /// A builder was given an incomplete or invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A category code or label could not be parsed.
    #[error("unknown category: {0}")]
    InvalidCategory(String),

    /// Key-value store or catalog file access failed.
    #[error("storage error: {0}")]
    Storage(Box<dyn core::error::Error + Send + Sync>),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The feed state lock was poisoned by a panicking holder.
    #[error("feed state lock poisoned: {0}")]
    StatePoisoned(String),
}

impl CouponFeedError {
    /// Wraps a source error as [`CouponFeedError::FetchFailed`], leaving
    /// errors that already are fetch failures untouched.
    #[inline]
    #[must_use]
    pub fn fetch_failed(err: Self) -> Self {
        match err {
            Self::FetchFailed(_) => err,
            other => Self::FetchFailed(Box::new(other)),
        }
    }

    /// Wraps a source error as [`CouponFeedError::RedeemFailed`].
    ///
    /// Domain errors (`UnknownCoupon`, `AlreadyUsed`) and existing redeem
    /// failures pass through unchanged.
    #[inline]
    #[must_use]
    pub fn redeem_failed(err: Self) -> Self {
        match err {
            Self::RedeemFailed(_) | Self::UnknownCoupon(_) | Self::AlreadyUsed(_) => err,
            other => Self::RedeemFailed(Box::new(other)),
        }
    }
}

/// Convenience result type for the coupon feed library.
pub type Result<T> = core::result::Result<T, CouponFeedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_from_serde_json() {
        let serde_err = serde_json::from_str::<String>("not json").unwrap_err();
        let err = CouponFeedError::from(serde_err);
        assert!(matches!(err, CouponFeedError::Serialization(_)));
        assert!(err.to_string().contains("serialization error"));
    }

    #[test]
    fn error_storage_display() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = CouponFeedError::Storage(Box::new(inner));
        let msg = err.to_string();
        assert!(msg.contains("storage error"));
        assert!(msg.contains("file missing"));
    }

    #[test]
    fn fetch_failed_wraps_once() {
        let inner = CouponFeedError::Storage("disk gone".into());
        let wrapped = CouponFeedError::fetch_failed(inner);
        assert!(matches!(wrapped, CouponFeedError::FetchFailed(_)));
        let msg = wrapped.to_string();
        assert!(msg.starts_with("failed to fetch coupon page"));
        assert!(msg.contains("disk gone"));

        let again = CouponFeedError::fetch_failed(wrapped);
        assert_eq!(again.to_string().matches("failed to fetch").count(), 1);
    }

    #[test]
    fn redeem_failed_keeps_domain_errors() {
        let used = CouponFeedError::redeem_failed(CouponFeedError::AlreadyUsed(CouponId::new(7)));
        assert!(matches!(used, CouponFeedError::AlreadyUsed(id) if id == CouponId::new(7)));

        let io = CouponFeedError::redeem_failed(CouponFeedError::Storage("offline".into()));
        assert!(matches!(io, CouponFeedError::RedeemFailed(_)));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CouponFeedError>();
    }
}
