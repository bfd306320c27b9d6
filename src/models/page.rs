//! Page request and response models for cursor pagination.

use serde::{Deserialize, Serialize};

use super::{Category, Coupon, CouponId};

/// A request for the next page of coupons.
///
/// Serializes to the query-parameter shape the remote API accepts: the
/// cursor and category are omitted when absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    /// Id of the last coupon already seen, or `None` for the first page.
    #[serde(rename = "betaCouponId", skip_serializing_if = "Option::is_none")]
    pub cursor: Option<CouponId>,
    /// Category filter.
    #[serde(skip_serializing_if = "Category::is_all")]
    pub category: Category,
    /// Maximum number of coupons to return.
    #[serde(rename = "size")]
    pub page_size: usize,
}

/// One page of coupons returned by a source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponPage {
    /// Coupons in the order the source returned them.
    #[serde(rename = "betaCouponResDtos")]
    pub items: Vec<Coupon>,
    /// Whether further pages exist after this one.
    #[serde(rename = "hasNext")]
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_request_omits_cursor_and_category() {
        let request = PageRequest {
            cursor: None,
            category: Category::All,
            page_size: 10,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"size":10}"#);
    }

    #[test]
    fn follow_up_request_carries_cursor_and_category() {
        let request = PageRequest {
            cursor: Some(CouponId::new(25)),
            category: Category::Korean,
            page_size: 20,
        };
        let value = serde_json::to_value(request).unwrap();
        assert_eq!(value["betaCouponId"], 25);
        assert_eq!(value["category"], "KOREAN");
        assert_eq!(value["size"], 20);
    }

    #[test]
    fn deserialize_page() {
        let json = r#"{
            "betaCouponResDtos": [{
                "betaCouponId": 1,
                "marketName": "Sushi Ya",
                "couponName": "10% off",
                "couponDetail": "Lunch only",
                "image": "sushi.png",
                "isUsed": false,
                "isPromise": false
            }],
            "hasNext": true
        }"#;
        let page: CouponPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, CouponId::new(1));
        assert!(page.has_more);
    }
}
