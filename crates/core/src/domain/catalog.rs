//! Raw catalog rows as fetched by a `DiscoveryStore` implementation. These
//! are the enrichment stage's only input; nothing downstream reads the store
//! directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

/// Category tags arrive from the join either as a single name or a list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryTags {
    #[default]
    None,
    One(String),
    Many(Vec<String>),
}

impl CategoryTags {
    pub fn names(&self) -> &[String] {
        match self {
            Self::None => &[],
            Self::One(name) => std::slice::from_ref(name),
            Self::Many(names) => names,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RestaurantRow {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub rating: Option<f64>,
    pub review_count: Option<i64>,
    pub eta_minutes: Option<i64>,
    pub avg_price_estimate: Option<f64>,
    pub estimated_delivery_fee: Option<f64>,
    pub promo_text: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BranchRow {
    pub id: String,
    pub restaurant_id: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub delivery_radius_km: Option<f64>,
    pub rating: Option<f64>,
    pub review_count: Option<i64>,
    pub eta_minutes: Option<i64>,
    pub avg_price_estimate: Option<f64>,
    pub delivery_fee: Option<f64>,
    pub promo_text: Option<String>,
    pub categories: CategoryTags,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DealRow {
    pub id: String,
    pub branch_id: String,
    pub title: String,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<f64>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DealRow {
    /// A deal is active iff `now` is not before `starts_at` and not after
    /// `ends_at`. An unset bound does not constrain.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        if let Some(starts_at) = self.starts_at {
            if now < starts_at {
                return false;
            }
        }
        if let Some(ends_at) = self.ends_at {
            if now > ends_at {
                return false;
            }
        }
        true
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeeRuleRow {
    pub id: String,
    pub branch_id: String,
    pub delivery_fee: Option<f64>,
    pub service_fee: Option<f64>,
    pub platform_fee: Option<f64>,
}

impl FeeRuleRow {
    /// Aggregate fee the rule yields; unset components count as zero.
    pub fn aggregate_fee(&self) -> f64 {
        [self.delivery_fee, self.service_fee, self.platform_fee]
            .into_iter()
            .flatten()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .sum()
    }
}

/// One restaurant with its branch fan-out, the unit a store fetch returns.
#[derive(Clone, Debug, PartialEq)]
pub struct RestaurantWithBranches {
    pub restaurant: RestaurantRow,
    pub branches: Vec<BranchRow>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn deal(starts: Option<&str>, ends: Option<&str>) -> DealRow {
        let parse = |s: &str| s.parse::<DateTime<Utc>>().expect("timestamp");
        DealRow {
            id: "deal-1".to_owned(),
            branch_id: "branch-1".to_owned(),
            title: "Lunch special".to_owned(),
            discount_type: None,
            discount_value: None,
            starts_at: starts.map(parse),
            ends_at: ends.map(parse),
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn deal_window_bounds_are_inclusive() {
        let d = deal(Some("2025-06-01T10:00:00Z"), Some("2025-06-01T14:00:00Z"));
        let at = |s: &str| s.parse::<DateTime<Utc>>().unwrap();
        assert!(!d.is_active_at(at("2025-06-01T09:59:59Z")));
        assert!(d.is_active_at(at("2025-06-01T10:00:00Z")));
        assert!(d.is_active_at(at("2025-06-01T14:00:00Z")));
        assert!(!d.is_active_at(at("2025-06-01T14:00:01Z")));
    }

    #[test]
    fn unbounded_deal_is_always_active() {
        let d = deal(None, None);
        assert!(d.is_active_at(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn fee_rule_aggregate_skips_nulls_and_junk() {
        let rule = FeeRuleRow {
            id: "rule-1".to_owned(),
            branch_id: "branch-1".to_owned(),
            delivery_fee: Some(400.0),
            service_fee: None,
            platform_fee: Some(f64::NAN),
        };
        assert_eq!(rule.aggregate_fee(), 400.0);
    }

    #[test]
    fn category_tags_accept_single_or_list() {
        let one: CategoryTags = serde_json::from_str("\"Jollof\"").unwrap();
        let many: CategoryTags = serde_json::from_str("[\"Jollof\", \"Grill\"]").unwrap();
        assert_eq!(one.names(), ["Jollof".to_owned()]);
        assert_eq!(many.names().len(), 2);
    }
}
