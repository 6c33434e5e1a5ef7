//! Candidate selection: constraint filtering, deterministic ordering, and
//! the guaranteed-non-empty fallback policy.

use std::cmp::Ordering;

use crate::config::RankingConfig;
use crate::domain::recommendation::{
    Constraints, RankingRequest, RecommendationItem, ScoredCandidate,
};
use crate::ranking::scoring::{score_offer, ScoringContext};
use crate::ranking::weights::RankingWeights;
use crate::RestaurantOffer;

#[derive(Clone, Debug)]
pub struct Ranker {
    weights: RankingWeights,
    min_confidence: f64,
    min_score: f64,
    default_limit: usize,
}

impl Ranker {
    pub fn new(
        weights: RankingWeights,
        min_confidence: f64,
        min_score: f64,
        default_limit: usize,
    ) -> Self {
        Self { weights, min_confidence, min_score, default_limit }
    }

    pub fn from_config(config: &RankingConfig) -> Self {
        Self::new(
            config.weights,
            config.min_confidence,
            config.min_score,
            config.default_limit,
        )
    }

    /// Rank enriched offers for one request. Guaranteed non-empty whenever
    /// the filtered input is non-empty: items failing the confidence/score
    /// minimums fall back to a cheapest-first ordering rather than an empty
    /// result.
    pub fn rank(
        &self,
        offers: &[RestaurantOffer],
        request: &RankingRequest,
    ) -> Vec<RecommendationItem> {
        let ctx = ScoringContext {
            intent: request.intent,
            location: request.location,
            weights: &self.weights,
            low_confidence_threshold: self.min_confidence,
        };

        let mut candidates: Vec<ScoredCandidate> = offers
            .iter()
            .enumerate()
            .map(|(index, offer)| score_offer(offer, &ctx, index))
            .collect();

        if let Some(constraints) = &request.constraints {
            candidates.retain(|candidate| passes_constraints(candidate, constraints));
        }
        sort_candidates(&mut candidates);

        let mut selected: Vec<ScoredCandidate> = candidates
            .iter()
            .filter(|c| c.confidence_score >= self.min_confidence && c.item.score >= self.min_score)
            .cloned()
            .collect();
        if selected.is_empty() {
            // Cheapest-to-deliver first signals that these are budget picks,
            // not "best" ones.
            selected = candidates;
            selected.sort_by(|a, b| {
                a.item
                    .estimated_delivery_fee
                    .cmp(&b.item.estimated_delivery_fee)
                    .then_with(|| a.item.final_price.cmp(&b.item.final_price))
            });
        }

        let limit = request.limit.unwrap_or(self.default_limit);
        selected.truncate(limit);
        selected.into_iter().map(|c| c.item).collect()
    }
}

fn passes_constraints(candidate: &ScoredCandidate, constraints: &Constraints) -> bool {
    let item = &candidate.item;
    if constraints.budget_max.is_some_and(|budget| item.final_price > budget) {
        return false;
    }
    if constraints.eta_max_minutes.is_some_and(|max| item.eta_minutes > max) {
        return false;
    }
    // Coarse dietary proxy: untagged offers cannot be vetted at all.
    if !constraints.dietary.is_empty() && item.tags.is_empty() {
        return false;
    }
    if !constraints.cuisines.is_empty() {
        let matched = constraints.cuisines.iter().any(|cuisine| {
            let needle = cuisine.to_lowercase();
            item.tags.iter().any(|tag| tag.to_lowercase().contains(&needle))
        });
        if !matched {
            return false;
        }
    }
    true
}

fn cmp_f64_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// score desc, then open status, confidence and freshness desc, with a
/// case-folded title comparison as the final deterministic tiebreak.
pub(crate) fn sort_candidates(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| {
        cmp_f64_desc(a.item.score, b.item.score)
            .then_with(|| cmp_f64_desc(a.open_status_score, b.open_status_score))
            .then_with(|| cmp_f64_desc(a.confidence_score, b.confidence_score))
            .then_with(|| cmp_f64_desc(a.freshness_score, b.freshness_score))
            .then_with(|| a.item.title.to_lowercase().cmp(&b.item.title.to_lowercase()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recommendation::{RecommendationKind, ScoredCandidate};
    use crate::ranking::{DEFAULT_LIMIT, DEFAULT_MIN_CONFIDENCE, DEFAULT_MIN_SCORE};

    fn ranker() -> Ranker {
        Ranker::new(
            RankingWeights::default(),
            DEFAULT_MIN_CONFIDENCE,
            DEFAULT_MIN_SCORE,
            DEFAULT_LIMIT,
        )
    }

    fn offer(id: &str, name: &str) -> RestaurantOffer {
        RestaurantOffer {
            id: id.to_owned(),
            name: name.to_owned(),
            slug: name.to_lowercase().replace(' ', "-"),
            description: None,
            is_active: true,
            base_price: Some(4000.0),
            estimated_delivery_fee: Some(500.0),
            promo_discount: None,
            promo_text: None,
            rating: Some(4.2),
            review_count: Some(100),
            eta_minutes: Some(25),
            branches: Vec::new(),
            tags: vec!["Jollof".to_owned()],
        }
    }

    fn item(title: &str) -> RecommendationItem {
        RecommendationItem {
            kind: RecommendationKind::Restaurant,
            id: title.to_owned(),
            restaurant_id: title.to_owned(),
            title: title.to_owned(),
            subtitle: None,
            base_price: 4000,
            discount_amount: 0,
            final_price: 4500,
            estimated_delivery_fee: 500,
            eta_minutes: 25,
            score: 0.6,
            reasons: vec!["A popular pick in your area".to_owned()],
            tags: Vec::new(),
        }
    }

    fn candidate(title: &str) -> ScoredCandidate {
        ScoredCandidate {
            item: item(title),
            confidence_score: 0.8,
            open_status_score: 1.0,
            freshness_score: 0.0,
        }
    }

    #[test]
    fn equal_scores_fall_through_to_title_order() {
        let mut candidates =
            vec![candidate("suya central"), candidate("Amala Hub"), candidate("Buka Bistro")];
        sort_candidates(&mut candidates);
        let titles: Vec<&str> =
            candidates.iter().map(|c| c.item.title.as_str()).collect();
        assert_eq!(titles, vec!["Amala Hub", "Buka Bistro", "suya central"]);
    }

    #[test]
    fn fallback_keeps_result_non_empty_and_sorts_by_fee() {
        // Minimums no real offer can clear force the fallback path.
        let strict = Ranker::new(RankingWeights::default(), 2.0, 2.0, DEFAULT_LIMIT);
        let mut cheap_fee = offer("a", "Cheap Fee");
        cheap_fee.estimated_delivery_fee = Some(200.0);
        let mut pricey_fee = offer("b", "Pricey Fee");
        pricey_fee.estimated_delivery_fee = Some(900.0);
        let mut tie_breaker = offer("c", "Tie Breaker");
        tie_breaker.estimated_delivery_fee = Some(200.0);
        tie_breaker.base_price = Some(3500.0);

        let items = strict.rank(
            &[pricey_fee, cheap_fee, tie_breaker],
            &RankingRequest::new(),
        );
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].title, "Tie Breaker"); // fee 200, final 4200
        assert_eq!(items[1].title, "Cheap Fee"); // fee 200, final 4500
        assert_eq!(items[2].title, "Pricey Fee");
    }

    #[test]
    fn low_confidence_items_are_kept_out_of_the_primary_set() {
        // Sparse offer: no location data and no tags caps confidence at 0.70.
        let mut sparse = offer("sparse", "Sparse Spot");
        sparse.tags.clear();
        let mut located = offer("located", "Located Spot");
        located.branches = vec![crate::domain::offer::Branch {
            id: "b1".to_owned(),
            lat: Some(6.45),
            lng: Some(3.39),
            delivery_radius_km: None,
            delivery_fee: None,
            promo_text: None,
        }];

        let picky = Ranker::new(RankingWeights::default(), 0.75, 0.0, DEFAULT_LIMIT);
        let request = RankingRequest::new()
            .with_location(crate::Coordinates::new(6.46, 3.40));
        let items = picky.rank(&[sparse.clone(), located], &request);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Located Spot");

        // With only the sparse offer the primary set is empty, yet the
        // fallback still surfaces it.
        let items = picky.rank(&[sparse], &request);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Sparse Spot");
    }

    #[test]
    fn budget_and_eta_constraints_reject_items() {
        let mut slow = offer("slow", "Slow Spot");
        slow.eta_minutes = Some(50);
        let mut dear = offer("dear", "Dear Spot");
        dear.base_price = Some(9000.0);
        let fine = offer("fine", "Fine Spot");

        let request = RankingRequest::new().with_constraints(Constraints {
            budget_max: Some(6000),
            eta_max_minutes: Some(30),
            ..Constraints::default()
        });
        let items = ranker().rank(&[slow, dear, fine], &request);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Fine Spot");
    }

    #[test]
    fn dietary_requires_tags_and_cuisine_matches_substring() {
        let mut untagged = offer("u", "Untagged");
        untagged.tags.clear();
        let tagged = offer("t", "Tagged");

        let dietary = RankingRequest::new().with_constraints(Constraints {
            dietary: vec!["vegetarian".to_owned()],
            ..Constraints::default()
        });
        let items = ranker().rank(&[untagged.clone(), tagged.clone()], &dietary);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Tagged");

        let cuisines = RankingRequest::new().with_constraints(Constraints {
            cuisines: vec!["JOLL".to_owned()],
            ..Constraints::default()
        });
        let items = ranker().rank(&[untagged, tagged], &cuisines);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Tagged");
    }

    #[test]
    fn output_truncates_to_default_limit() {
        let offers: Vec<RestaurantOffer> =
            (0..20).map(|i| offer(&format!("r{i}"), &format!("Spot {i:02}"))).collect();
        let items = ranker().rank(&offers, &RankingRequest::new());
        assert_eq!(items.len(), DEFAULT_LIMIT);
    }

    #[test]
    fn explicit_limit_overrides_default() {
        let offers: Vec<RestaurantOffer> =
            (0..10).map(|i| offer(&format!("r{i}"), &format!("Spot {i:02}"))).collect();
        let items = ranker().rank(&offers, &RankingRequest::new().with_limit(3));
        assert_eq!(items.len(), 3);
    }
}
