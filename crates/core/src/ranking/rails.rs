//! Rail composition: fixed presentation groups over the final ranked list.
//! No filtering happens here; the same item may surface in several rails.

use crate::domain::recommendation::{Rail, RecommendationItem};

pub const RAIL_ITEM_CAP: usize = 8;

fn capped(items: Vec<RecommendationItem>) -> Vec<RecommendationItem> {
    let mut items = items;
    items.truncate(RAIL_ITEM_CAP);
    items
}

pub fn compose_rails(items: &[RecommendationItem]) -> Vec<Rail> {
    let mut best_value = items.to_vec();
    best_value.sort_by_key(|item| item.final_price);

    let popular_now = items.to_vec();

    // TODO: product to confirm the sort key here — the rail ships sorted by
    // ETA while its title promises low delivery fees.
    let mut low_delivery_fee = items.to_vec();
    low_delivery_fee.sort_by_key(|item| item.eta_minutes);

    vec![
        Rail {
            rail_id: "best_value".to_owned(),
            title: "Best value near you".to_owned(),
            subtitle: None,
            items: capped(best_value),
        },
        Rail {
            rail_id: "popular_now".to_owned(),
            title: "Popular now".to_owned(),
            subtitle: Some("Trending with diners right now".to_owned()),
            items: capped(popular_now),
        },
        Rail {
            rail_id: "low_delivery_fee".to_owned(),
            title: "Low delivery fee".to_owned(),
            subtitle: None,
            items: capped(low_delivery_fee),
        },
    ]
}
