//! Coupon category filter.

use serde::{Deserialize, Serialize};

use crate::error::CouponFeedError;

/// Category used to filter coupon pages.
///
/// [`Category::All`] applies no filter; every other variant maps to the
/// upper-case code the remote API expects.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// No filter.
    #[default]
    #[serde(rename = "")]
    All,
    /// Bars and pubs.
    Alcohol,
    /// Korean food.
    Korean,
    /// Asian food.
    Asian,
    /// Japanese food.
    Japanese,
    /// Western food.
    American,
    /// Everything else.
    Etc,
}

impl Category {
    /// Every category, in menu order.
    pub const ALL: [Self; 7] = [
        Self::All,
        Self::Alcohol,
        Self::Korean,
        Self::Asian,
        Self::Japanese,
        Self::American,
        Self::Etc,
    ];

    /// Returns the API code, or `None` for [`Category::All`].
    #[inline]
    #[must_use]
    pub const fn code(self) -> Option<&'static str> {
        match self {
            Self::All => None,
            Self::Alcohol => Some("ALCOHOL"),
            Self::Korean => Some("KOREAN"),
            Self::Asian => Some("ASIAN"),
            Self::Japanese => Some("JAPANESE"),
            Self::American => Some("AMERICAN"),
            Self::Etc => Some("ETC"),
        }
    }

    /// Returns the menu label shown to shoppers.
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "전체",
            Self::Alcohol => "주점",
            Self::Korean => "한식",
            Self::Asian => "아시안",
            Self::Japanese => "일식",
            Self::American => "양식",
            Self::Etc => "기타",
        }
    }

    /// Returns `true` for the unfiltered category.
    #[inline]
    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(*self, Self::All)
    }

    /// Returns `true` if a coupon filed under `other` belongs to this
    /// category.
    #[inline]
    #[must_use]
    pub const fn includes(self, other: Self) -> bool {
        self.is_all() || self as u8 == other as u8
    }
}

impl core::fmt::Display for Category {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code().unwrap_or("ALL"))
    }
}

impl core::str::FromStr for Category {
    type Err = CouponFeedError;

    /// Parses a category from its code (case-insensitive), its label, or
    /// `ALL` / the empty string.
    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("ALL") {
            return Ok(Self::All);
        }
        Self::ALL
            .into_iter()
            .find(|category| {
                category.label() == trimmed
                    || category
                        .code()
                        .is_some_and(|code| code.eq_ignore_ascii_case(trimmed))
            })
            .ok_or_else(|| CouponFeedError::InvalidCategory(trimmed.to_owned()))
    }
}
