//! Runtime response contracts, enforced at the serialization boundary just
//! before a payload leaves the service. A violation here is an internal
//! error: the response is withheld, never silently repaired.

use thiserror::Error;

use crate::domain::compare::CompareOption;
use crate::domain::recommendation::{RecommendationItem, RecommendationPayload};
use crate::ranking::rails::RAIL_ITEM_CAP;
use crate::RestaurantOffer;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ContractViolation {
    #[error("trace id must not be empty")]
    MissingTraceId,
    #[error("item `{item_id}` has no reasons")]
    EmptyReasons { item_id: String },
    #[error("item `{item_id}` breaks the price identity")]
    PriceIdentity { item_id: String },
    #[error("item `{item_id}` carries a negative discount")]
    NegativeDiscount { item_id: String },
    #[error("rail `{rail_id}` exceeds {RAIL_ITEM_CAP} items")]
    RailOverCapacity { rail_id: String },
    #[error("offer `{offer_id}` carries a non-finite or negative `{field}`")]
    OfferNumeric { offer_id: String, field: &'static str },
    #[error("compare response length {actual} does not match request length {expected}")]
    CompareLength { expected: usize, actual: usize },
    #[error("compare options are not sorted by final price")]
    CompareUnsorted,
}

fn check_item(item: &RecommendationItem) -> Result<(), ContractViolation> {
    if item.reasons.is_empty() {
        return Err(ContractViolation::EmptyReasons { item_id: item.id.clone() });
    }
    if item.discount_amount < 0 {
        return Err(ContractViolation::NegativeDiscount { item_id: item.id.clone() });
    }
    if item.final_price
        != item.base_price + item.estimated_delivery_fee - item.discount_amount
    {
        return Err(ContractViolation::PriceIdentity { item_id: item.id.clone() });
    }
    Ok(())
}

pub fn verify_recommendation_payload(
    trace_id: &str,
    payload: &RecommendationPayload,
) -> Result<(), ContractViolation> {
    if trace_id.trim().is_empty() {
        return Err(ContractViolation::MissingTraceId);
    }
    for item in &payload.items {
        check_item(item)?;
    }
    for rail in &payload.rails {
        if rail.items.len() > RAIL_ITEM_CAP {
            return Err(ContractViolation::RailOverCapacity { rail_id: rail.rail_id.clone() });
        }
        for item in &rail.items {
            check_item(item)?;
        }
    }
    Ok(())
}

pub fn verify_offers(offers: &[RestaurantOffer]) -> Result<(), ContractViolation> {
    for offer in offers {
        let checks: [(&'static str, Option<f64>); 3] = [
            ("basePrice", offer.base_price),
            ("estimatedDeliveryFee", offer.estimated_delivery_fee),
            ("rating", offer.rating),
        ];
        for (field, value) in checks {
            if value.is_some_and(|v| !v.is_finite() || v < 0.0) {
                return Err(ContractViolation::OfferNumeric { offer_id: offer.id.clone(), field });
            }
        }
        if offer.review_count.is_some_and(|v| v < 0) {
            return Err(ContractViolation::OfferNumeric {
                offer_id: offer.id.clone(),
                field: "reviewCount",
            });
        }
        if offer.eta_minutes.is_some_and(|v| v <= 0) {
            return Err(ContractViolation::OfferNumeric {
                offer_id: offer.id.clone(),
                field: "etaMinutes",
            });
        }
    }
    Ok(())
}

pub fn verify_compare_response(
    options: &[CompareOption],
    request_len: usize,
) -> Result<(), ContractViolation> {
    if options.len() != request_len {
        return Err(ContractViolation::CompareLength {
            expected: request_len,
            actual: options.len(),
        });
    }
    if options.windows(2).any(|pair| pair[0].final_price > pair[1].final_price) {
        return Err(ContractViolation::CompareUnsorted);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recommendation::{Rail, RecommendationKind};
    use crate::STRATEGY_VERSION;

    fn item(id: &str) -> RecommendationItem {
        RecommendationItem {
            kind: RecommendationKind::Restaurant,
            id: id.to_owned(),
            restaurant_id: id.to_owned(),
            title: format!("Spot {id}"),
            subtitle: None,
            base_price: 4000,
            discount_amount: 200,
            final_price: 4300,
            estimated_delivery_fee: 500,
            eta_minutes: 25,
            score: 0.5,
            reasons: vec!["A popular pick in your area".to_owned()],
            tags: Vec::new(),
        }
    }

    fn payload(items: Vec<RecommendationItem>, rails: Vec<Rail>) -> RecommendationPayload {
        RecommendationPayload {
            strategy_version: STRATEGY_VERSION.to_owned(),
            items,
            rails,
        }
    }

    #[test]
    fn valid_payload_passes() {
        let p = payload(vec![item("a")], Vec::new());
        assert!(verify_recommendation_payload("trace-1", &p).is_ok());
    }

    #[test]
    fn empty_trace_and_empty_reasons_are_violations() {
        let p = payload(vec![item("a")], Vec::new());
        assert_eq!(
            verify_recommendation_payload("  ", &p),
            Err(ContractViolation::MissingTraceId)
        );

        let mut unreasoned = item("b");
        unreasoned.reasons.clear();
        let p = payload(vec![unreasoned], Vec::new());
        assert_eq!(
            verify_recommendation_payload("trace-1", &p),
            Err(ContractViolation::EmptyReasons { item_id: "b".to_owned() })
        );
    }

    #[test]
    fn price_identity_is_enforced() {
        let mut broken = item("c");
        broken.final_price += 1;
        let p = payload(vec![broken], Vec::new());
        assert_eq!(
            verify_recommendation_payload("trace-1", &p),
            Err(ContractViolation::PriceIdentity { item_id: "c".to_owned() })
        );
    }

    #[test]
    fn oversized_rail_is_a_violation() {
        let rail = Rail {
            rail_id: "best_value".to_owned(),
            title: "Best value near you".to_owned(),
            subtitle: None,
            items: (0..9).map(|i| item(&format!("r{i}"))).collect(),
        };
        let p = payload(Vec::new(), vec![rail]);
        assert!(matches!(
            verify_recommendation_payload("trace-1", &p),
            Err(ContractViolation::RailOverCapacity { .. })
        ));
    }

    #[test]
    fn compare_contract_checks_length_and_order() {
        let option = |id: &str, final_price: i64| CompareOption {
            restaurant_id: id.to_owned(),
            label: id.to_owned(),
            base_price: final_price - 850,
            delivery_fee: 650,
            platform_fee: 200,
            discount: 0,
            final_price,
            eta_minutes: Some(20),
        };
        let sorted = vec![option("a", 4000), option("b", 5000)];
        assert!(verify_compare_response(&sorted, 2).is_ok());
        assert_eq!(
            verify_compare_response(&sorted, 3),
            Err(ContractViolation::CompareLength { expected: 3, actual: 2 })
        );
        let unsorted = vec![option("b", 5000), option("a", 4000)];
        assert_eq!(verify_compare_response(&unsorted, 2), Err(ContractViolation::CompareUnsorted));
    }
}
