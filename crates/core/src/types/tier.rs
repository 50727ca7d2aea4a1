//! Loyalty tier derived from order history.
//!
//! The tier is never read from the source payload; it is computed from the
//! number of qualifying orders in a trailing window and then written as a
//! forced metafield (companies) or tag (customers).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::metafield::{Metafield, MetafieldType};

/// Namespace of the forced tier metafield.
pub const TIER_NAMESPACE: &str = "custom";
/// Key of the forced tier metafield.
pub const TIER_KEY: &str = "tier";
/// Prefix of customer tier tags (`Tier_Gold`).
pub const TIER_TAG_PREFIX: &str = "Tier_";

/// Tier label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Below the silver threshold.
    Bronze,
    /// At least `silver_min` qualifying orders.
    Silver,
    /// At least `gold_min` qualifying orders.
    Gold,
}

impl Tier {
    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
        }
    }

    /// Customer tag, e.g. `Tier_Gold`.
    #[must_use]
    pub fn tag(self) -> String {
        format!("{TIER_TAG_PREFIX}{}", self.label())
    }

    /// Parse a label as written in a sheet (`gold`, `Tier_Gold`, `GOLD`).
    #[must_use]
    pub fn from_label(s: &str) -> Option<Self> {
        let s = s.trim();
        let s = s.strip_prefix(TIER_TAG_PREFIX).unwrap_or(s);
        match s.to_ascii_lowercase().as_str() {
            "bronze" => Some(Self::Bronze),
            "silver" => Some(Self::Silver),
            "gold" => Some(Self::Gold),
            _ => None,
        }
    }

    /// The forced company metafield carrying this tier.
    #[must_use]
    pub fn metafield(self) -> Metafield {
        Metafield {
            namespace: TIER_NAMESPACE.to_owned(),
            key: TIER_KEY.to_owned(),
            metafield_type: MetafieldType::SingleLineTextField,
            value: self.label().to_owned(),
        }
    }

    /// Replace any existing tier tag with this tier's tag.
    ///
    /// Order of the remaining tags is preserved and duplicates are dropped.
    #[must_use]
    pub fn apply_to_tags(self, tags: &[String]) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(tags.len() + 1);
        for tag in tags {
            let tag = tag.trim();
            if tag.is_empty() || tag.starts_with(TIER_TAG_PREFIX) {
                continue;
            }
            if !out.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                out.push(tag.to_owned());
            }
        }
        out.push(self.tag());
        out
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The facts about one order that tiering needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderFact {
    /// When the order was placed.
    pub created_at: DateTime<Utc>,
    /// Cancelled orders never qualify.
    pub cancelled: bool,
}

/// Thresholds and window for tier derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierPolicy {
    /// Minimum qualifying orders for [`Tier::Silver`].
    pub silver_min: u32,
    /// Minimum qualifying orders for [`Tier::Gold`].
    pub gold_min: u32,
    /// Length of the trailing window, in days.
    pub window_days: u32,
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            silver_min: 6,
            gold_min: 12,
            window_days: 365,
        }
    }
}

impl TierPolicy {
    /// Count orders that are not cancelled and fall inside `(now - window, now]`.
    #[must_use]
    pub fn qualifying_orders(&self, orders: &[OrderFact], now: DateTime<Utc>) -> u32 {
        let start = now - Duration::days(i64::from(self.window_days));
        let count = orders
            .iter()
            .filter(|o| !o.cancelled && o.created_at > start && o.created_at <= now)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Map a qualifying-order count to a tier.
    #[must_use]
    pub const fn tier_for_count(&self, count: u32) -> Tier {
        if count >= self.gold_min {
            Tier::Gold
        } else if count >= self.silver_min {
            Tier::Silver
        } else {
            Tier::Bronze
        }
    }

    /// Derive the tier for an order history.
    #[must_use]
    pub fn tier_for(&self, orders: &[OrderFact], now: DateTime<Utc>) -> Tier {
        self.tier_for_count(self.qualifying_orders(orders, now))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn order(days_ago: i64, cancelled: bool) -> OrderFact {
        OrderFact {
            created_at: now() - Duration::days(days_ago),
            cancelled,
        }
    }

    #[test]
    fn test_thresholds() {
        let policy = TierPolicy::default();
        assert_eq!(policy.tier_for_count(0), Tier::Bronze);
        assert_eq!(policy.tier_for_count(5), Tier::Bronze);
        assert_eq!(policy.tier_for_count(6), Tier::Silver);
        assert_eq!(policy.tier_for_count(11), Tier::Silver);
        assert_eq!(policy.tier_for_count(12), Tier::Gold);
    }

    #[test]
    fn test_window_and_cancellations() {
        let policy = TierPolicy::default();
        let mut orders: Vec<OrderFact> = (1..=6).map(|d| order(d * 10, false)).collect();
        orders.push(order(5, true));
        orders.push(order(400, false));

        assert_eq!(policy.qualifying_orders(&orders, now()), 6);
        assert_eq!(policy.tier_for(&orders, now()), Tier::Silver);
    }

    #[test]
    fn test_apply_to_tags_replaces_existing_tier() {
        let tags = vec![
            "wholesale".to_owned(),
            "Tier_Silver".to_owned(),
            "Wholesale".to_owned(),
            " ".to_owned(),
        ];
        assert_eq!(
            Tier::Gold.apply_to_tags(&tags),
            vec!["wholesale".to_owned(), "Tier_Gold".to_owned()]
        );
    }

    #[test]
    fn test_from_label() {
        assert_eq!(Tier::from_label("gold"), Some(Tier::Gold));
        assert_eq!(Tier::from_label("Tier_Silver"), Some(Tier::Silver));
        assert_eq!(Tier::from_label("platinum"), None);
    }

    #[test]
    fn test_metafield() {
        let m = Tier::Silver.metafield();
        assert_eq!(m.key_path(), "custom.tier");
        assert_eq!(m.value, "Silver");
    }
}
