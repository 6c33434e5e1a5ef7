//! Deterministic demo catalog: enough restaurants, branches, deals and fee
//! rules to exercise discovery end to end without external data.

use chrono::{Duration, Utc};
use sqlx::Executor;

use crate::connection::DbPool;
use crate::store::StoreError;

struct RestaurantSeed {
    id: &'static str,
    name: &'static str,
    slug: &'static str,
    description: Option<&'static str>,
    rating: Option<f64>,
    review_count: Option<i64>,
    eta_minutes: Option<i64>,
    avg_price_estimate: Option<f64>,
    estimated_delivery_fee: Option<f64>,
    promo_text: Option<&'static str>,
}

struct BranchSeed {
    id: &'static str,
    restaurant_id: &'static str,
    lat: Option<f64>,
    lng: Option<f64>,
    rating: Option<f64>,
    review_count: Option<i64>,
    eta_minutes: Option<i64>,
    avg_price_estimate: Option<f64>,
    delivery_fee: Option<f64>,
    promo_text: Option<&'static str>,
    categories: Option<&'static str>,
}

const RESTAURANT_SEEDS: &[RestaurantSeed] = &[
    RestaurantSeed {
        id: "rest-amala-hub",
        name: "Amala Hub",
        slug: "amala-hub",
        description: Some("Amala, gbegiri and ewedu done properly"),
        rating: Some(4.6),
        review_count: Some(812),
        eta_minutes: Some(22),
        avg_price_estimate: Some(3800.0),
        estimated_delivery_fee: Some(500.0),
        promo_text: None,
    },
    RestaurantSeed {
        id: "rest-suya-central",
        name: "Suya Central",
        slug: "suya-central",
        description: Some("Charcoal suya and grills till late"),
        rating: None,
        review_count: None,
        eta_minutes: None,
        avg_price_estimate: Some(5200.0),
        estimated_delivery_fee: None,
        promo_text: None,
    },
    RestaurantSeed {
        id: "rest-green-bowl",
        name: "Green Bowl",
        slug: "green-bowl",
        description: Some("Salads, smoothies and lighter plates"),
        rating: Some(4.2),
        review_count: Some(143),
        eta_minutes: None,
        avg_price_estimate: None,
        estimated_delivery_fee: None,
        promo_text: None,
    },
    RestaurantSeed {
        id: "rest-buka-bistro",
        name: "Buka Bistro",
        slug: "buka-bistro",
        description: None,
        rating: None,
        review_count: None,
        eta_minutes: None,
        avg_price_estimate: None,
        estimated_delivery_fee: None,
        promo_text: Some("Launch week: free moin moin"),
    },
    RestaurantSeed {
        id: "rest-mama-put",
        name: "Mama Put Kitchen",
        slug: "mama-put-kitchen",
        description: Some("Home-style rice, stews and swallow"),
        rating: Some(4.8),
        review_count: Some(1940),
        eta_minutes: Some(18),
        avg_price_estimate: Some(2900.0),
        estimated_delivery_fee: Some(400.0),
        promo_text: None,
    },
];

const BRANCH_SEEDS: &[BranchSeed] = &[
    BranchSeed {
        id: "branch-amala-lekki",
        restaurant_id: "rest-amala-hub",
        lat: Some(6.4478),
        lng: Some(3.4723),
        rating: Some(4.5),
        review_count: Some(512),
        eta_minutes: Some(24),
        avg_price_estimate: Some(3900.0),
        delivery_fee: Some(550.0),
        promo_text: None,
        categories: Some(r#"["Amala", "Swallow"]"#),
    },
    BranchSeed {
        id: "branch-amala-yaba",
        restaurant_id: "rest-amala-hub",
        lat: Some(6.5095),
        lng: Some(3.3711),
        rating: Some(4.7),
        review_count: Some(300),
        eta_minutes: Some(20),
        avg_price_estimate: Some(3700.0),
        delivery_fee: Some(450.0),
        promo_text: None,
        categories: Some(r#"["Amala", "Soup"]"#),
    },
    BranchSeed {
        id: "branch-suya-ikeja",
        restaurant_id: "rest-suya-central",
        lat: Some(6.6018),
        lng: Some(3.3515),
        rating: Some(4.3),
        review_count: Some(220),
        eta_minutes: Some(30),
        avg_price_estimate: None,
        delivery_fee: Some(700.0),
        promo_text: Some("2-for-1 beef skewers"),
        categories: Some(r#""Grill""#),
    },
    BranchSeed {
        id: "branch-green-vi",
        restaurant_id: "rest-green-bowl",
        lat: Some(6.4281),
        lng: Some(3.4216),
        rating: None,
        review_count: Some(80),
        eta_minutes: Some(26),
        avg_price_estimate: Some(4500.0),
        delivery_fee: None,
        promo_text: None,
        categories: Some(r#"["Healthy", "Salads"]"#),
    },
    BranchSeed {
        id: "branch-buka-surulere",
        restaurant_id: "rest-buka-bistro",
        lat: None,
        lng: None,
        rating: None,
        review_count: None,
        eta_minutes: None,
        avg_price_estimate: None,
        delivery_fee: None,
        promo_text: None,
        categories: None,
    },
    BranchSeed {
        id: "branch-mamaput-ikoyi",
        restaurant_id: "rest-mama-put",
        lat: Some(6.4541),
        lng: Some(3.4316),
        rating: Some(4.8),
        review_count: Some(1940),
        eta_minutes: Some(18),
        avg_price_estimate: Some(2900.0),
        delivery_fee: Some(400.0),
        promo_text: None,
        categories: Some(r#"["Rice", "Stew", "Swallow"]"#),
    },
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedSummary {
    pub restaurants: usize,
    pub branches: usize,
    pub deals: usize,
    pub fee_rules: usize,
}

/// Insert the demo catalog. Assumes migrated, empty tables.
pub async fn seed_demo_catalog(pool: &DbPool) -> Result<SeedSummary, StoreError> {
    for seed in RESTAURANT_SEEDS {
        sqlx::query(
            "INSERT INTO restaurants (id, name, slug, description, is_active, rating, \
             review_count, eta_minutes, avg_price_estimate, estimated_delivery_fee, promo_text) \
             VALUES (?, ?, ?, ?, 1, ?, ?, ?, ?, ?, ?)",
        )
        .bind(seed.id)
        .bind(seed.name)
        .bind(seed.slug)
        .bind(seed.description)
        .bind(seed.rating)
        .bind(seed.review_count)
        .bind(seed.eta_minutes)
        .bind(seed.avg_price_estimate)
        .bind(seed.estimated_delivery_fee)
        .bind(seed.promo_text)
        .execute(pool)
        .await?;
    }

    for seed in BRANCH_SEEDS {
        sqlx::query(
            "INSERT INTO branches (id, restaurant_id, lat, lng, delivery_radius_km, rating, \
             review_count, eta_minutes, avg_price_estimate, delivery_fee, promo_text, categories) \
             VALUES (?, ?, ?, ?, NULL, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(seed.id)
        .bind(seed.restaurant_id)
        .bind(seed.lat)
        .bind(seed.lng)
        .bind(seed.rating)
        .bind(seed.review_count)
        .bind(seed.eta_minutes)
        .bind(seed.avg_price_estimate)
        .bind(seed.delivery_fee)
        .bind(seed.promo_text)
        .bind(seed.categories)
        .execute(pool)
        .await?;
    }

    // Deals: one live percentage deal, a newer overlapping fixed deal on the
    // same branch (recency decides the winner), and one already expired.
    let now = Utc::now();
    let deals = [
        (
            "deal-amala-lunch",
            "branch-amala-lekki",
            "Lunch rush: 15% off",
            Some("percentage"),
            Some(15.0),
            now - Duration::days(2),
            now + Duration::days(5),
            now - Duration::days(2),
        ),
        (
            "deal-amala-flat",
            "branch-amala-lekki",
            "300 off every order",
            Some("fixed"),
            Some(300.0),
            now - Duration::days(1),
            now + Duration::days(5),
            now - Duration::days(1),
        ),
        (
            "deal-suya-expired",
            "branch-suya-ikeja",
            "Detty December special",
            Some("percentage"),
            Some(25.0),
            now - Duration::days(60),
            now - Duration::days(30),
            now - Duration::days(60),
        ),
    ];
    for (id, branch_id, title, kind, value, starts, ends, created) in deals {
        sqlx::query(
            "INSERT INTO deals (id, branch_id, title, discount_type, discount_value, \
             starts_at, ends_at, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(branch_id)
        .bind(title)
        .bind(kind)
        .bind(value)
        .bind(starts)
        .bind(ends)
        .bind(created)
        .execute(pool)
        .await?;
    }

    let fee_rules = [
        ("rule-amala-lekki-promo", "branch-amala-lekki", Some(350.0), Some(50.0), None::<f64>),
        ("rule-amala-lekki-std", "branch-amala-lekki", Some(500.0), Some(100.0), Some(50.0)),
        ("rule-green-vi", "branch-green-vi", Some(600.0), None, None),
    ];
    for (id, branch_id, delivery, service, platform) in fee_rules {
        sqlx::query(
            "INSERT INTO fee_rules (id, branch_id, delivery_fee, service_fee, platform_fee) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(branch_id)
        .bind(delivery)
        .bind(service)
        .bind(platform)
        .execute(pool)
        .await?;
    }

    Ok(SeedSummary {
        restaurants: RESTAURANT_SEEDS.len(),
        branches: BRANCH_SEEDS.len(),
        deals: deals.len(),
        fee_rules: fee_rules.len(),
    })
}

/// Wipe all catalog tables, child tables first.
pub async fn reset_catalog(pool: &DbPool) -> Result<(), StoreError> {
    pool.execute("DELETE FROM fee_rules").await?;
    pool.execute("DELETE FROM deals").await?;
    pool.execute("DELETE FROM branches").await?;
    pool.execute("DELETE FROM restaurants").await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_pending;
    use crate::store::{DiscoveryStore, SqlDiscoveryStore};
    use crate::connect_with_settings;

    async fn seeded_pool() -> DbPool {
        // Single connection: pooled in-memory databases are per-connection.
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        seed_demo_catalog(&pool).await.expect("seed");
        pool
    }

    #[tokio::test]
    async fn seeds_round_trip_through_the_sql_store() {
        let pool = seeded_pool().await;
        let store = SqlDiscoveryStore::new(pool);

        let bundles = store.active_restaurants(30).await.expect("restaurants");
        assert_eq!(bundles.len(), RESTAURANT_SEEDS.len());
        let amala = bundles
            .iter()
            .find(|b| b.restaurant.id == "rest-amala-hub")
            .expect("amala hub seeded");
        assert_eq!(amala.branches.len(), 2);

        let branch_ids: Vec<String> = bundles
            .iter()
            .flat_map(|b| b.branches.iter().map(|branch| branch.id.clone()))
            .collect();
        let deals =
            store.deals_for_branches(&branch_ids, Utc::now()).await.expect("deals");
        // The expired suya deal is filtered by the window predicate.
        assert_eq!(deals.len(), 2);

        let rules =
            store.fee_rules_for_branches(&branch_ids).await.expect("fee rules");
        assert_eq!(rules.len(), 3);
    }

    #[tokio::test]
    async fn reset_then_fetch_is_empty() {
        let pool = seeded_pool().await;
        reset_catalog(&pool).await.expect("reset");
        let store = SqlDiscoveryStore::new(pool);
        assert!(store.active_restaurants(30).await.expect("fetch").is_empty());
    }
}
