//! Ordering of promise and regular coupons for display.
//!
//! Promise coupons are bucketed by merchant so each merchant's offer set
//! stays contiguous, and the buckets are alternated with standalone
//! coupons at a fixed [`Cadence`]. The ordering is a pure function of its
//! input.

use core::num::NonZeroUsize;
use std::collections::HashMap;

use crate::models::{Coupon, CouponId};

/// Number of regular coupons emitted after each merchant group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cadence(NonZeroUsize);

impl Cadence {
    /// Two regular coupons between merchant groups.
    pub const DEFAULT: Self = Self(NonZeroUsize::MIN.saturating_add(1));

    /// Creates a cadence, or `None` when `regulars_per_group` is zero.
    #[inline]
    #[must_use]
    pub const fn new(regulars_per_group: usize) -> Option<Self> {
        match NonZeroUsize::new(regulars_per_group) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// Returns the number of regular coupons per step.
    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for Cadence {
    #[inline]
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Reorders a batch of coupons for display.
///
/// 1. Promise coupons are bucketed by merchant name; each bucket is sorted
///    by id.
/// 2. Buckets are ordered by their smallest id.
/// 3. The output alternates one whole bucket with up to
///    [`Cadence::get`] regular coupons, in their input order. Whatever
///    remains once either side runs out is appended as-is.
///
/// The result is a permutation of `coupons`.
///
/// # Examples
///
/// ```
/// use coupon_feed::interleave::{Cadence, interleave};
/// use coupon_feed::models::{Coupon, CouponId};
///
/// let coupon = |id: i64, merchant: &str, is_promise: bool| Coupon {
///     id: CouponId::new(id),
///     merchant_name: merchant.to_owned(),
///     title: String::new(),
///     detail: String::new(),
///     image_ref: String::new(),
///     is_used: false,
///     is_promise,
/// };
///
/// let batch = vec![
///     coupon(10, "Cafe", false),
///     coupon(3, "Pub", true),
///     coupon(1, "Pub", true),
///     coupon(11, "Deli", false),
///     coupon(2, "Pub", true),
/// ];
/// let ids: Vec<i64> = interleave(batch, Cadence::DEFAULT)
///     .iter()
///     .map(|c| c.id.into_inner())
///     .collect();
/// assert_eq!(ids, [1, 2, 3, 10, 11]);
/// ```
#[must_use]
pub fn interleave(coupons: Vec<Coupon>, cadence: Cadence) -> Vec<Coupon> {
    let total = coupons.len();
    let (promise, regular): (Vec<Coupon>, Vec<Coupon>) =
        coupons.into_iter().partition(|coupon| coupon.is_promise);

    let mut out = Vec::with_capacity(total);
    let mut regular = regular.into_iter();
    for group in merchant_groups(promise) {
        out.extend(group);
        out.extend(regular.by_ref().take(cadence.get()));
    }
    out.extend(regular);
    out
}

/// Buckets promise coupons by merchant, sorted within and across buckets.
fn merchant_groups(promise: Vec<Coupon>) -> Vec<Vec<Coupon>> {
    let mut by_merchant: HashMap<String, Vec<Coupon>> = HashMap::new();
    for coupon in promise {
        by_merchant
            .entry(coupon.merchant_name.clone())
            .or_default()
            .push(coupon);
    }

    let mut groups: Vec<Vec<Coupon>> = by_merchant
        .into_values()
        .map(|mut group| {
            group.sort_by_key(|coupon| coupon.id);
            group
        })
        .collect();
    // Buckets are non-empty and sorted, so the first coupon holds the
    // minimum id. Merchant name breaks ties between duplicated ids.
    groups.sort_by(|a, b| group_key(a).cmp(&group_key(b)));
    groups
}

/// Sort key of a merchant group: its first id, then the merchant name.
fn group_key(group: &[Coupon]) -> Option<(CouponId, &str)> {
    group
        .first()
        .map(|coupon| (coupon.id, coupon.merchant_name.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn promise(id: i64, merchant: &str) -> Coupon {
        Coupon {
            id: CouponId::new(id),
            merchant_name: merchant.to_owned(),
            title: format!("Promise {id}"),
            detail: String::new(),
            image_ref: format!("{id}.png"),
            is_used: false,
            is_promise: true,
        }
    }

    fn regular(id: i64) -> Coupon {
        Coupon {
            id: CouponId::new(id),
            merchant_name: format!("Shop {id}"),
            title: format!("Regular {id}"),
            detail: String::new(),
            image_ref: format!("{id}.png"),
            is_used: false,
            is_promise: false,
        }
    }

    fn ids(coupons: &[Coupon]) -> Vec<i64> {
        coupons.iter().map(|c| c.id.into_inner()).collect()
    }

    fn mixed_batch() -> Vec<Coupon> {
        vec![
            regular(20),
            promise(7, "Bar B"),
            promise(3, "Bar A"),
            regular(21),
            promise(5, "Bar A"),
            regular(22),
            promise(4, "Bar B"),
            regular(23),
            regular(24),
            promise(9, "Bar C"),
            regular(25),
        ]
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(interleave(Vec::new(), Cadence::DEFAULT).is_empty());
    }

    #[test]
    fn all_regular_keeps_input_order() {
        let batch = vec![regular(5), regular(1), regular(3)];
        let out = interleave(batch.clone(), Cadence::DEFAULT);
        assert_eq!(out, batch);
    }

    #[test]
    fn all_promise_concatenates_groups_by_min_id() {
        let batch = vec![
            promise(8, "Late"),
            promise(2, "Early"),
            promise(6, "Late"),
            promise(4, "Early"),
        ];
        let out = interleave(batch, Cadence::DEFAULT);
        assert_eq!(ids(&out), vec![2, 4, 6, 8]);
    }

    #[test]
    fn single_group_then_one_regular() {
        let batch = vec![regular(10), promise(2, "M"), promise(1, "M"), promise(3, "M")];
        let out = interleave(batch, Cadence::DEFAULT);
        assert_eq!(ids(&out), vec![1, 2, 3, 10]);
    }

    #[test]
    fn single_group_then_two_regulars() {
        let batch = vec![
            promise(1, "M"),
            regular(10),
            promise(2, "M"),
            regular(11),
            promise(3, "M"),
        ];
        let out = interleave(batch, Cadence::DEFAULT);
        assert_eq!(ids(&out), vec![1, 2, 3, 10, 11]);
    }

    #[test]
    fn alternates_groups_and_regulars_at_cadence_two() {
        let out = interleave(mixed_batch(), Cadence::DEFAULT);
        // Bar A (3, 5), 20, 21, Bar B (4, 7), 22, 23, Bar C (9), 24, 25
        assert_eq!(ids(&out), vec![3, 5, 20, 21, 4, 7, 22, 23, 9, 24, 25]);
    }

    #[test]
    fn cadence_one_emits_single_regular_between_groups() {
        let out = interleave(mixed_batch(), Cadence::new(1).unwrap());
        assert_eq!(ids(&out), vec![3, 5, 20, 4, 7, 21, 9, 22, 23, 24, 25]);
    }

    #[test]
    fn leftover_groups_follow_each_other_when_regulars_run_out() {
        let batch = vec![
            promise(1, "A"),
            promise(2, "B"),
            promise(3, "C"),
            regular(10),
        ];
        let out = interleave(batch, Cadence::DEFAULT);
        assert_eq!(ids(&out), vec![1, 10, 2, 3]);
    }

    #[test]
    fn output_is_permutation_of_input() {
        let batch = mixed_batch();
        let mut expected = ids(&batch);
        let mut got = ids(&interleave(batch, Cadence::DEFAULT));
        expected.sort_unstable();
        got.sort_unstable();
        assert_eq!(got, expected);
    }

    #[test]
    fn merchant_groups_are_contiguous_for_any_cadence() {
        for n in 1..=4 {
            let out = interleave(mixed_batch(), Cadence::new(n).unwrap());
            for merchant in ["Bar A", "Bar B", "Bar C"] {
                let positions: Vec<usize> = out
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.is_promise && c.merchant_name == merchant)
                    .map(|(i, _)| i)
                    .collect();
                let span = positions.last().unwrap() - positions.first().unwrap() + 1;
                assert_eq!(span, positions.len(), "{merchant} split at cadence {n}");
            }
        }
    }

    #[test]
    fn ordering_is_deterministic() {
        let first = interleave(mixed_batch(), Cadence::DEFAULT);
        for _ in 0..16 {
            assert_eq!(interleave(mixed_batch(), Cadence::DEFAULT), first);
        }
    }

    #[test]
    fn promise_and_regular_from_same_merchant_are_not_grouped_together() {
        let mut shared = regular(10);
        shared.merchant_name = "M".to_owned();
        let batch = vec![shared, promise(1, "M"), promise(2, "M")];
        let out = interleave(batch, Cadence::DEFAULT);
        assert_eq!(ids(&out), vec![1, 2, 10]);
    }

    #[test]
    fn groups_sharing_a_first_id_order_by_merchant() {
        let batch = vec![promise(5, "Zeta"), promise(5, "Alpha"), promise(9, "Alpha")];
        let groups = merchant_groups(batch);
        let keys: Vec<Option<(CouponId, &str)>> =
            groups.iter().map(|group| group_key(group)).collect();
        assert_eq!(
            keys,
            vec![
                Some((CouponId::new(5), "Alpha")),
                Some((CouponId::new(5), "Zeta")),
            ]
        );
        assert_eq!(group_key(&[]), None);
    }

    #[test]
    fn zero_cadence_is_rejected() {
        assert!(Cadence::new(0).is_none());
        assert_eq!(Cadence::default().get(), 2);
    }
}
