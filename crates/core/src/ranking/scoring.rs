//! Per-offer scoring: deterministic fallback seeds, sub-scores, the weighted
//! composite, confidence, and reason generation.
//!
//! Sparse data is the normal case, so every figure has a stable fallback:
//! seeds are derived from the offer's position or a hash of its id, never
//! from randomness, which keeps orderings reproducible across requests and
//! test runs.

use crate::domain::offer::{PromoDiscount, RestaurantOffer};
use crate::domain::recommendation::{
    Intent, RecommendationItem, RecommendationKind, ScoredCandidate,
};
use crate::geo::{haversine_km, Coordinates};
use crate::numeric::round_i64;
use crate::ranking::weights::RankingWeights;

/// Seed discount for promo-bearing offers without structured discount data;
/// decays by 80 per list position, floored at zero.
const DISCOUNT_SEED: i64 = 600;

/// Distance sub-score when either endpoint is unknown.
const UNKNOWN_DISTANCE_COMPONENT: f64 = 0.35;

const MULTI_BRANCH_BONUS: f64 = 0.05;

/// Clamped linear normalization into [0, 1]. Degenerate ranges yield 0.
pub fn normalize(value: f64, lo: f64, hi: f64) -> f64 {
    if hi == lo {
        return 0.0;
    }
    ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
}

/// Wrapping multiply-add hash over the id bytes. Stable across runs and
/// platforms, which is the whole point: fallback ratings must not jitter.
fn id_hash(id: &str) -> u32 {
    id.bytes().fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)))
}

/// Deterministic pseudo-rating in [3.6, 5.1) for offers without real ratings.
pub(crate) fn pseudo_rating(id: &str) -> f64 {
    3.6 + f64::from(id_hash(id) % 150) / 100.0
}

/// Seed ticket size per intent, in minor currency units. Spread so that
/// seeded offers still order sensibly under each goal.
fn base_price_seed(intent: Option<Intent>) -> i64 {
    match intent {
        Some(Intent::Cheap) => 3000,
        Some(Intent::Promotions) => 3800,
        Some(Intent::Fast) => 4000,
        None => 4200,
        Some(Intent::Healthy) => 4600,
        Some(Intent::BestRated) => 5200,
        Some(Intent::FamilyCombo) => 6400,
    }
}

fn estimated_delivery_fee(distance_km: Option<f64>) -> i64 {
    match distance_km {
        Some(d) => round_i64(d * 180.0).max(300),
        None => 650,
    }
}

fn estimated_eta_minutes(distance_km: Option<f64>, intent: Option<Intent>) -> i64 {
    if intent == Some(Intent::Fast) {
        match distance_km {
            Some(d) => round_i64(15.0 + d * 2.0).max(15),
            None => 24,
        }
    } else {
        match distance_km {
            Some(d) => round_i64(20.0 + d * 3.0).max(20),
            None => 28,
        }
    }
}

pub(crate) fn intent_relevance(
    intent: Option<Intent>,
    final_price: i64,
    eta_minutes: i64,
    discount_amount: i64,
    rating: f64,
) -> f64 {
    match intent {
        Some(Intent::Cheap) => (1.0 - final_price as f64 / 14000.0).max(0.0),
        Some(Intent::Fast) => (1.0 - eta_minutes as f64 / 55.0).max(0.0),
        Some(Intent::Promotions) => normalize(discount_amount as f64, 0.0, 1800.0),
        Some(Intent::BestRated) => normalize(rating, 3.5, 5.0),
        Some(Intent::FamilyCombo) => (1.0 - final_price as f64 / 20000.0).max(0.0),
        Some(Intent::Healthy) => 0.7,
        None => 0.6,
    }
}

pub(crate) fn distance_component(distance_km: Option<f64>) -> f64 {
    match distance_km {
        Some(d) => (1.0 - d / 10.0).max(0.0),
        None => UNKNOWN_DISTANCE_COMPONENT,
    }
}

fn intent_reason(intent: Intent) -> &'static str {
    match intent {
        Intent::Cheap => "Fits a tight budget",
        Intent::Fast => "Among the fastest options near you",
        Intent::Healthy => "Lighter choices on the menu",
        Intent::FamilyCombo => "Generous portions for sharing",
        Intent::Promotions => "Running an active promotion",
        Intent::BestRated => "Top-rated by diners",
    }
}

/// Fixed-priority reason list. Never empty: a generic line covers the case
/// where nothing specific applies.
#[allow(clippy::too_many_arguments)]
fn build_reasons(
    intent: Option<Intent>,
    relevance: f64,
    distance_km: Option<f64>,
    final_price: i64,
    eta_minutes: i64,
    rating: f64,
    confidence: f64,
    low_confidence_threshold: f64,
) -> Vec<String> {
    let mut reasons = Vec::new();
    if let Some(intent) = intent {
        if relevance >= 0.5 {
            reasons.push(intent_reason(intent).to_owned());
        }
    }
    if let Some(d) = distance_km {
        if d <= 4.0 {
            reasons.push(format!("Only {d:.1} km away"));
        }
    }
    if final_price <= 5000 {
        reasons.push("Estimated total below 5,000".to_owned());
    }
    if eta_minutes <= 24 {
        reasons.push(format!("Delivery in about {eta_minutes} minutes"));
    }
    if rating >= 4.4 {
        reasons.push(format!("Rated {rating:.1} by customers"));
    }
    if confidence < low_confidence_threshold {
        reasons.push("Figures are estimates; limited data for this spot".to_owned());
    }
    if reasons.is_empty() {
        reasons.push("A popular pick in your area".to_owned());
    }
    reasons
}

pub struct ScoringContext<'a> {
    pub intent: Option<Intent>,
    pub location: Option<Coordinates>,
    pub weights: &'a RankingWeights,
    pub low_confidence_threshold: f64,
}

/// Score one offer at position `index` of the fetched cohort.
pub fn score_offer(
    offer: &RestaurantOffer,
    ctx: &ScoringContext<'_>,
    index: usize,
) -> ScoredCandidate {
    let distance_km = match (ctx.location, offer.primary_coordinates()) {
        (Some(user), Some(branch)) => Some(haversine_km(user, branch)),
        _ => None,
    };

    let base_price = match offer.base_price {
        Some(v) => round_i64(v),
        None => base_price_seed(ctx.intent) + index as i64 * 250,
    };
    let delivery_fee = match offer.estimated_delivery_fee {
        Some(v) => round_i64(v),
        None => estimated_delivery_fee(distance_km),
    };
    let discount_amount = match offer.promo_discount {
        Some(PromoDiscount::Percentage(pct)) => round_i64(base_price as f64 * pct / 100.0),
        Some(PromoDiscount::Fixed(v)) => round_i64(v),
        None if offer.has_promo() => (DISCOUNT_SEED - index as i64 * 80).max(0),
        None => 0,
    }
    .max(0);
    let final_price = base_price + delivery_fee - discount_amount;
    let eta_minutes = match offer.eta_minutes {
        Some(v) => v,
        None => estimated_eta_minutes(distance_km, ctx.intent),
    };
    let rating = offer.rating.unwrap_or_else(|| pseudo_rating(&offer.id));

    let relevance =
        intent_relevance(ctx.intent, final_price, eta_minutes, discount_amount, rating);
    let w = ctx.weights;
    let mut score = w.intent_relevance * relevance
        + w.distance * distance_component(distance_km)
        + w.value * (1.0 - final_price as f64 / 15000.0).max(0.0)
        + w.eta * (1.0 - eta_minutes as f64 / 60.0).max(0.0)
        + w.rating * normalize(rating, 3.5, 5.0)
        + w.promo_strength * normalize(discount_amount as f64, 0.0, 2000.0);
    if offer.branches.len() > 1 {
        score += MULTI_BRANCH_BONUS;
    }

    // How much of this recommendation is real data vs. estimate.
    let confidence: f64 = ((if distance_km.is_some() { 0.35_f64 } else { 0.15 })
        + (if final_price > 0 { 0.25 } else { 0.0 })
        + (if eta_minutes > 0 { 0.25 } else { 0.0 })
        + (if offer.tags.is_empty() { 0.05 } else { 0.15 }))
    .min(1.0);

    let reasons = build_reasons(
        ctx.intent,
        relevance,
        distance_km,
        final_price,
        eta_minutes,
        rating,
        confidence,
        ctx.low_confidence_threshold,
    );

    let item = RecommendationItem {
        kind: RecommendationKind::Restaurant,
        id: offer.id.clone(),
        restaurant_id: offer.id.clone(),
        title: offer.name.clone(),
        subtitle: offer.promo_text.clone().or_else(|| offer.description.clone()),
        base_price,
        discount_amount,
        final_price,
        estimated_delivery_fee: delivery_fee,
        eta_minutes,
        score,
        reasons,
        tags: offer.tags.clone(),
    };

    ScoredCandidate {
        item,
        confidence_score: confidence,
        open_status_score: if offer.is_active { 1.0 } else { 0.0 },
        // Linear decay by list position, floored at zero so deep positions
        // tie and fall through to the title tiebreak.
        freshness_score: (1.0 - index as f64 * 0.1).max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::DEFAULT_MIN_CONFIDENCE;

    fn bare_offer(id: &str, name: &str) -> RestaurantOffer {
        RestaurantOffer {
            id: id.to_owned(),
            name: name.to_owned(),
            slug: name.to_lowercase().replace(' ', "-"),
            description: None,
            is_active: true,
            base_price: None,
            estimated_delivery_fee: None,
            promo_discount: None,
            promo_text: None,
            rating: None,
            review_count: None,
            eta_minutes: None,
            branches: Vec::new(),
            tags: Vec::new(),
        }
    }

    fn ctx(weights: &RankingWeights, intent: Option<Intent>) -> ScoringContext<'_> {
        ScoringContext {
            intent,
            location: None,
            weights,
            low_confidence_threshold: DEFAULT_MIN_CONFIDENCE,
        }
    }

    #[test]
    fn normalize_is_clamped_and_monotonic() {
        assert_eq!(normalize(3.5, 3.5, 5.0), 0.0);
        assert_eq!(normalize(5.0, 3.5, 5.0), 1.0);
        assert_eq!(normalize(99.0, 3.5, 5.0), 1.0);
        assert_eq!(normalize(-1.0, 3.5, 5.0), 0.0);
        assert!(normalize(4.0, 3.5, 5.0) < normalize(4.5, 3.5, 5.0));
        // Degenerate range.
        assert_eq!(normalize(42.0, 7.0, 7.0), 0.0);
    }

    #[test]
    fn pseudo_rating_is_stable_and_in_range() {
        for id in ["rest-1", "rest-2", "suya-palace", ""] {
            let r = pseudo_rating(id);
            assert!((3.6..5.1).contains(&r), "{id} -> {r}");
            assert_eq!(r, pseudo_rating(id));
        }
    }

    #[test]
    fn cheap_intent_scenario_matches_expected_figures() {
        let weights = RankingWeights::default();
        let mut offer = bare_offer("rest-1", "Mama Put");
        offer.base_price = Some(5000.0);
        offer.estimated_delivery_fee = Some(500.0);
        let scored = score_offer(&offer, &ctx(&weights, Some(Intent::Cheap)), 0);
        assert_eq!(scored.item.base_price, 5000);
        assert_eq!(scored.item.estimated_delivery_fee, 500);
        assert_eq!(scored.item.discount_amount, 0);
        assert_eq!(scored.item.final_price, 5500);
        let relevance = intent_relevance(Some(Intent::Cheap), 5500, 28, 0, 4.0);
        assert!((relevance - (1.0 - 5500.0 / 14000.0)).abs() < 1e-9);
        assert!((relevance - 0.607).abs() < 0.001);
    }

    #[test]
    fn distance_component_known_vs_unknown() {
        assert!((distance_component(Some(2.0)) - 0.8).abs() < 1e-9);
        assert_eq!(distance_component(None), 0.35);
        assert_eq!(distance_component(Some(25.0)), 0.0);
    }

    #[test]
    fn seeded_prices_stay_ordered_by_position() {
        let weights = RankingWeights::default();
        let a = score_offer(&bare_offer("a", "A"), &ctx(&weights, None), 0);
        let b = score_offer(&bare_offer("b", "B"), &ctx(&weights, None), 1);
        assert_eq!(a.item.base_price, 4200);
        assert_eq!(b.item.base_price, 4450);
    }

    #[test]
    fn fee_estimate_floors_and_flat_fallback() {
        assert_eq!(estimated_delivery_fee(Some(1.0)), 300);
        assert_eq!(estimated_delivery_fee(Some(2.5)), 450);
        assert_eq!(estimated_delivery_fee(None), 650);
    }

    #[test]
    fn eta_estimate_depends_on_intent_and_distance() {
        assert_eq!(estimated_eta_minutes(Some(3.0), Some(Intent::Fast)), 21);
        assert_eq!(estimated_eta_minutes(None, Some(Intent::Fast)), 24);
        assert_eq!(estimated_eta_minutes(Some(3.0), None), 29);
        assert_eq!(estimated_eta_minutes(None, Some(Intent::Cheap)), 28);
        // Floors.
        assert_eq!(estimated_eta_minutes(Some(0.0), Some(Intent::Fast)), 15);
        assert_eq!(estimated_eta_minutes(Some(0.0), None), 20);
    }

    #[test]
    fn promo_without_structured_discount_gets_decaying_seed() {
        let weights = RankingWeights::default();
        let mut offer = bare_offer("promo", "Promo Place");
        offer.promo_text = Some("Weekend special".to_owned());
        let first = score_offer(&offer, &ctx(&weights, None), 0);
        let eighth = score_offer(&offer, &ctx(&weights, None), 8);
        assert_eq!(first.item.discount_amount, 600);
        assert_eq!(eighth.item.discount_amount, 0);
    }

    #[test]
    fn percentage_discount_rounds_against_base_price() {
        let weights = RankingWeights::default();
        let mut offer = bare_offer("pct", "Pct Place");
        offer.base_price = Some(3333.0);
        offer.promo_discount = Some(PromoDiscount::Percentage(15.0));
        let scored = score_offer(&offer, &ctx(&weights, None), 0);
        assert_eq!(scored.item.discount_amount, 500); // 499.95 rounds to 500
        assert_eq!(
            scored.item.final_price,
            scored.item.base_price + scored.item.estimated_delivery_fee
                - scored.item.discount_amount
        );
    }

    #[test]
    fn confidence_reflects_how_much_is_real_data() {
        let weights = RankingWeights::default();
        // All-estimate offer: 0.15 + 0.25 + 0.25 + 0.05.
        let sparse = score_offer(&bare_offer("s", "Sparse"), &ctx(&weights, None), 0);
        assert!((sparse.confidence_score - 0.70).abs() < 1e-9);

        let mut full = bare_offer("f", "Full");
        full.base_price = Some(4000.0);
        full.eta_minutes = Some(22);
        full.tags = vec!["Grill".to_owned()];
        full.branches = vec![crate::domain::offer::Branch {
            id: "b1".to_owned(),
            lat: Some(6.45),
            lng: Some(3.39),
            delivery_radius_km: None,
            delivery_fee: Some(400.0),
            promo_text: None,
        }];
        let located = ScoringContext {
            intent: None,
            location: Some(Coordinates::new(6.46, 3.40)),
            weights: &weights,
            low_confidence_threshold: DEFAULT_MIN_CONFIDENCE,
        };
        let scored = score_offer(&full, &located, 0);
        assert!((scored.confidence_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn reasons_are_never_empty_and_follow_priority_order() {
        let weights = RankingWeights::default();
        let mut offer = bare_offer("r", "Reasons");
        offer.base_price = Some(20000.0);
        offer.estimated_delivery_fee = Some(900.0);
        offer.eta_minutes = Some(55);
        offer.rating = Some(3.8);
        let scored = score_offer(&offer, &ctx(&weights, None), 0);
        // Nothing specific applies, so the generic line carries it.
        assert_eq!(scored.item.reasons, vec!["A popular pick in your area".to_owned()]);

        let mut close = bare_offer("c", "Close By");
        close.base_price = Some(3000.0);
        close.estimated_delivery_fee = Some(300.0);
        close.eta_minutes = Some(18);
        close.rating = Some(4.7);
        close.branches = vec![crate::domain::offer::Branch {
            id: "b1".to_owned(),
            lat: Some(6.45),
            lng: Some(3.39),
            delivery_radius_km: None,
            delivery_fee: None,
            promo_text: None,
        }];
        let located = ScoringContext {
            intent: Some(Intent::Cheap),
            location: Some(Coordinates::new(6.452, 3.392)),
            weights: &weights,
            low_confidence_threshold: DEFAULT_MIN_CONFIDENCE,
        };
        let scored = score_offer(&close, &located, 0);
        let reasons = &scored.item.reasons;
        assert!(reasons.len() >= 4);
        assert_eq!(reasons[0], "Fits a tight budget");
        assert!(reasons[1].starts_with("Only "));
        assert_eq!(reasons[2], "Estimated total below 5,000");
    }
}
