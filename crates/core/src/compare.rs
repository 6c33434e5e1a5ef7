//! Price comparison engine: recomputes a consistent cost breakdown for a
//! user-selected set of restaurants. Produced fresh per request, never
//! cached.

use crate::domain::compare::{CompareOption, CompareSelection};
use crate::domain::offer::{PromoDiscount, RestaurantOffer};
use crate::errors::ApplicationError;
use crate::numeric::round_i64;

pub const MIN_SELECTIONS: usize = 1;
pub const MAX_SELECTIONS: usize = 10;

/// Seed base price when no enriched average exists: a per-item markup on a
/// plausible single-dish ticket.
fn seeded_base_price(item_count: usize) -> i64 {
    4200 + 700 * item_count.max(1) as i64
}

const FALLBACK_DELIVERY_FEE: i64 = 650;

/// Flat platform cut applied to every option.
const PLATFORM_FEE_RATE: f64 = 0.04;

/// Promo-copy-only discount when no structured deal value exists.
const PROMO_TEXT_DISCOUNT_RATE: f64 = 0.06;

/// Compare 1–10 selections against the enriched offers for their
/// restaurants. Output carries one option per selection, sorted by final
/// price ascending. Any missing restaurant fails the whole request.
pub fn compare_options(
    offers: &[RestaurantOffer],
    selections: &[CompareSelection],
) -> Result<Vec<CompareOption>, ApplicationError> {
    if selections.len() < MIN_SELECTIONS || selections.len() > MAX_SELECTIONS {
        return Err(ApplicationError::InvalidInput(format!(
            "compare accepts {MIN_SELECTIONS} to {MAX_SELECTIONS} selections, got {}",
            selections.len()
        )));
    }
    for selection in selections {
        selection.validate()?;
    }

    let mut options = selections
        .iter()
        .enumerate()
        .map(|(index, selection)| {
            let offer = offers
                .iter()
                .find(|o| o.id == selection.restaurant_id)
                .ok_or_else(|| {
                    ApplicationError::InvalidInput(format!(
                        "unknown restaurant `{}`",
                        selection.restaurant_id
                    ))
                })?;
            Ok(option_for(offer, selection, index))
        })
        .collect::<Result<Vec<CompareOption>, ApplicationError>>()?;

    options.sort_by(|a, b| a.final_price.cmp(&b.final_price));
    Ok(options)
}

fn option_for(
    offer: &RestaurantOffer,
    selection: &CompareSelection,
    index: usize,
) -> CompareOption {
    let base_price = match offer.base_price {
        Some(v) => round_i64(v),
        None => seeded_base_price(selection.item_ids.len()),
    };
    let delivery_fee = offer
        .min_branch_delivery_fee()
        .or(offer.estimated_delivery_fee)
        .map(round_i64)
        .unwrap_or(FALLBACK_DELIVERY_FEE);
    let discount = match offer.promo_discount {
        Some(PromoDiscount::Percentage(pct)) => round_i64(base_price as f64 * pct / 100.0),
        Some(PromoDiscount::Fixed(v)) => round_i64(v),
        None if offer.has_promo() => round_i64(base_price as f64 * PROMO_TEXT_DISCOUNT_RATE),
        None => 0,
    }
    .max(0);
    let platform_fee = round_i64(base_price as f64 * PLATFORM_FEE_RATE);

    CompareOption {
        restaurant_id: offer.id.clone(),
        label: offer.name.clone(),
        base_price,
        delivery_fee,
        platform_fee,
        discount,
        final_price: base_price + delivery_fee + platform_fee - discount,
        // Position-based placeholder, not model-derived.
        eta_minutes: Some(20 + index as i64 * 4),
    }
}
