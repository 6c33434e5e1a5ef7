//! Data enrichment stage: merges restaurant/branch rows with active deals
//! and fee rules into one denormalized [`RestaurantOffer`] per restaurant.
//!
//! Pure transform over already-fetched rows. Upstream fetch failures are the
//! caller's hard failure; this stage never produces a partial result.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::catalog::{
    BranchRow, DealRow, DiscountType, FeeRuleRow, RestaurantWithBranches,
};
use crate::domain::offer::{Branch, PromoDiscount, RestaurantOffer};
use crate::numeric::{finite, finite_non_negative, mean_skip_null, round_i64, sum_skip_null};

/// Per branch, the deal with the latest `created_at` among active deals.
fn winning_deal<'a>(
    deals_by_branch: &HashMap<&'a str, Vec<&'a DealRow>>,
    branch_id: &str,
    now: DateTime<Utc>,
) -> Option<&'a DealRow> {
    deals_by_branch
        .get(branch_id)?
        .iter()
        .filter(|deal| deal.is_active_at(now))
        .max_by_key(|deal| deal.created_at)
        .copied()
}

/// Cheapest aggregate among a branch's fee rules, when any exist.
fn cheapest_fee_rule(
    rules_by_branch: &HashMap<&str, Vec<&FeeRuleRow>>,
    branch_id: &str,
) -> Option<f64> {
    rules_by_branch
        .get(branch_id)?
        .iter()
        .map(|rule| rule.aggregate_fee())
        .fold(None, |acc, fee| match acc {
            Some(best) if best <= fee => Some(best),
            _ => Some(fee),
        })
}

fn promo_discount_from_deal(deal: &DealRow) -> Option<PromoDiscount> {
    let value = finite_non_negative(deal.discount_value)?;
    match deal.discount_type? {
        DiscountType::Percentage => Some(PromoDiscount::Percentage(value)),
        DiscountType::Fixed => Some(PromoDiscount::Fixed(value)),
    }
}

pub fn enrich_offers(
    rows: &[RestaurantWithBranches],
    deals: &[DealRow],
    fee_rules: &[FeeRuleRow],
    now: DateTime<Utc>,
) -> Vec<RestaurantOffer> {
    let mut deals_by_branch: HashMap<&str, Vec<&DealRow>> = HashMap::new();
    for deal in deals {
        deals_by_branch.entry(deal.branch_id.as_str()).or_default().push(deal);
    }
    let mut rules_by_branch: HashMap<&str, Vec<&FeeRuleRow>> = HashMap::new();
    for rule in fee_rules {
        rules_by_branch.entry(rule.branch_id.as_str()).or_default().push(rule);
    }

    rows.iter()
        .map(|row| enrich_one(row, &deals_by_branch, &rules_by_branch, now))
        .collect()
}

fn enrich_one(
    row: &RestaurantWithBranches,
    deals_by_branch: &HashMap<&str, Vec<&DealRow>>,
    rules_by_branch: &HashMap<&str, Vec<&FeeRuleRow>>,
    now: DateTime<Utc>,
) -> RestaurantOffer {
    let restaurant = &row.restaurant;

    struct EnrichedBranch {
        branch: Branch,
        rating: Option<f64>,
        review_count: Option<i64>,
        eta_minutes: Option<i64>,
        avg_price: Option<f64>,
        winning_discount: Option<PromoDiscount>,
    }

    let enriched: Vec<EnrichedBranch> = row
        .branches
        .iter()
        .map(|b: &BranchRow| {
            let deal = winning_deal(deals_by_branch, &b.id, now);
            let delivery_fee = cheapest_fee_rule(rules_by_branch, &b.id)
                .or_else(|| finite_non_negative(b.delivery_fee));
            let promo_text = b
                .promo_text
                .clone()
                .or_else(|| deal.map(|d| d.title.clone()));
            EnrichedBranch {
                branch: Branch {
                    id: b.id.clone(),
                    lat: finite(b.lat),
                    lng: finite(b.lng),
                    delivery_radius_km: finite_non_negative(b.delivery_radius_km),
                    delivery_fee,
                    promo_text,
                },
                rating: finite_non_negative(b.rating),
                review_count: b.review_count.filter(|v| *v >= 0),
                eta_minutes: b.eta_minutes.filter(|v| *v > 0),
                avg_price: finite_non_negative(b.avg_price_estimate),
                winning_discount: deal.and_then(promo_discount_from_deal),
            }
        })
        .collect();

    let rating = finite_non_negative(restaurant.rating)
        .or_else(|| mean_skip_null(enriched.iter().map(|b| b.rating)));
    let review_count = restaurant
        .review_count
        .filter(|v| *v >= 0)
        .or_else(|| sum_skip_null(enriched.iter().map(|b| b.review_count)));
    let eta_minutes = restaurant
        .eta_minutes
        .filter(|v| *v > 0)
        .or_else(|| {
            mean_skip_null(enriched.iter().map(|b| b.eta_minutes.map(|v| v as f64)))
                .map(round_i64)
        });
    let base_price = finite_non_negative(restaurant.avg_price_estimate).or_else(|| {
        mean_skip_null(enriched.iter().map(|b| b.avg_price))
            .map(|v| round_i64(v) as f64)
    });
    let estimated_delivery_fee = finite_non_negative(restaurant.estimated_delivery_fee)
        .or_else(|| {
            mean_skip_null(enriched.iter().map(|b| b.branch.delivery_fee))
                .map(|v| round_i64(v) as f64)
        });

    // Promo falls back to the first branch carrying promo copy; that same
    // branch's winning deal supplies the structured discount.
    let promo_branch = enriched.iter().find(|b| b.branch.promo_text.is_some());
    let promo_text = restaurant
        .promo_text
        .clone()
        .or_else(|| promo_branch.and_then(|b| b.branch.promo_text.clone()));
    let promo_discount = promo_branch.and_then(|b| b.winning_discount);

    let mut tags: Vec<String> = Vec::new();
    for b in &row.branches {
        for name in b.categories.names() {
            if !tags.iter().any(|t| t == name) {
                tags.push(name.clone());
            }
        }
    }

    RestaurantOffer {
        id: restaurant.id.clone(),
        name: restaurant.name.clone(),
        slug: restaurant.slug.clone(),
        description: restaurant.description.clone(),
        is_active: restaurant.is_active,
        base_price,
        estimated_delivery_fee,
        promo_discount,
        promo_text,
        rating,
        review_count,
        eta_minutes,
        branches: enriched.into_iter().map(|b| b.branch).collect(),
        tags,
    }
}
