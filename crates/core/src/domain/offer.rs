//! The enriched, per-restaurant view used as scoring input. Ephemeral:
//! reconstructed on every request from freshly fetched rows.

use serde::{Deserialize, Serialize};

/// Structured promo discount attached to an offer. The raw rows carry a
/// loose type/value pair; enrichment only builds this when both halves are
/// present and sane.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "promoDiscountType",
    content = "promoDiscountValue",
    rename_all = "lowercase"
)]
pub enum PromoDiscount {
    Percentage(f64),
    Fixed(f64),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub delivery_radius_km: Option<f64>,
    /// Effective delivery fee: the branch figure, or the cheapest matching
    /// fee-rule aggregate when rules exist for the branch.
    pub delivery_fee: Option<f64>,
    pub promo_text: Option<String>,
}

/// Denormalized per-restaurant view produced by the enrichment stage.
///
/// Invariant: every numeric field is either a finite number or `None`, and
/// price/fee/review-count/eta are never negative.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantOffer {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub base_price: Option<f64>,
    pub estimated_delivery_fee: Option<f64>,
    #[serde(flatten)]
    pub promo_discount: Option<PromoDiscount>,
    pub promo_text: Option<String>,
    pub rating: Option<f64>,
    pub review_count: Option<i64>,
    pub eta_minutes: Option<i64>,
    pub branches: Vec<Branch>,
    pub tags: Vec<String>,
}

impl RestaurantOffer {
    /// Coordinates of the first branch, the reference point for distance.
    pub fn primary_coordinates(&self) -> Option<crate::geo::Coordinates> {
        let first = self.branches.first()?;
        match (first.lat, first.lng) {
            (Some(lat), Some(lng)) => Some(crate::geo::Coordinates::new(lat, lng)),
            _ => None,
        }
    }

    /// Cheapest effective delivery fee across branches.
    pub fn min_branch_delivery_fee(&self) -> Option<f64> {
        self.branches
            .iter()
            .filter_map(|b| b.delivery_fee)
            .fold(None, |acc, fee| match acc {
                Some(best) if best <= fee => Some(best),
                _ => Some(fee),
            })
    }

    /// True when any promo copy exists anywhere on the offer.
    pub fn has_promo(&self) -> bool {
        self.promo_text.is_some() || self.branches.iter().any(|b| b.promo_text.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer_with_branches(branches: Vec<Branch>) -> RestaurantOffer {
        RestaurantOffer {
            id: "rest-1".to_owned(),
            name: "Mama Put Kitchen".to_owned(),
            slug: "mama-put-kitchen".to_owned(),
            description: None,
            is_active: true,
            base_price: None,
            estimated_delivery_fee: None,
            promo_discount: None,
            promo_text: None,
            rating: None,
            review_count: None,
            eta_minutes: None,
            branches,
            tags: Vec::new(),
        }
    }

    fn branch(id: &str, fee: Option<f64>) -> Branch {
        Branch {
            id: id.to_owned(),
            lat: None,
            lng: None,
            delivery_radius_km: None,
            delivery_fee: fee,
            promo_text: None,
        }
    }

    #[test]
    fn primary_coordinates_use_first_branch_only() {
        let mut first = branch("b1", None);
        first.lat = Some(6.5);
        // lng missing on the first branch: no coordinates, even though the
        // second branch is complete.
        let mut second = branch("b2", None);
        second.lat = Some(6.6);
        second.lng = Some(3.3);
        let offer = offer_with_branches(vec![first, second]);
        assert_eq!(offer.primary_coordinates(), None);
    }

    #[test]
    fn min_branch_delivery_fee_picks_cheapest() {
        let offer = offer_with_branches(vec![
            branch("b1", Some(700.0)),
            branch("b2", None),
            branch("b3", Some(450.0)),
        ]);
        assert_eq!(offer.min_branch_delivery_fee(), Some(450.0));
    }

    #[test]
    fn promo_discount_serializes_as_type_value_pair() {
        let mut offer = offer_with_branches(vec![]);
        offer.promo_discount = Some(PromoDiscount::Percentage(15.0));
        let json = serde_json::to_value(&offer).unwrap();
        assert_eq!(json["promoDiscountType"], "percentage");
        assert_eq!(json["promoDiscountValue"], 15.0);
    }
}
