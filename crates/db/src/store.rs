//! Discovery catalog access: the query interface the engine consumes, plus
//! the SQLite and in-memory implementations. Every fetch is batched per
//! request; a failure anywhere is a hard failure with no partial result.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row};
use thiserror::Error;

use plateful_core::domain::catalog::{
    BranchRow, CategoryTags, DealRow, DiscountType, FeeRuleRow, RestaurantRow,
    RestaurantWithBranches,
};
use plateful_core::errors::ApplicationError;

use crate::DbPool;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<StoreError> for ApplicationError {
    fn from(value: StoreError) -> Self {
        ApplicationError::DataAccess(value.to_string())
    }
}

#[async_trait]
pub trait DiscoveryStore: Send + Sync {
    /// Active restaurants with their branch fan-out, newest first.
    async fn active_restaurants(
        &self,
        limit: u32,
    ) -> Result<Vec<RestaurantWithBranches>, StoreError>;

    /// The named restaurants (active or not) with their branches, in the
    /// stored order. Unknown ids are simply absent from the result.
    async fn restaurants_by_ids(
        &self,
        ids: &[String],
    ) -> Result<Vec<RestaurantWithBranches>, StoreError>;

    /// Deals whose activity window may cover `now`, for the given branches.
    async fn deals_for_branches(
        &self,
        branch_ids: &[String],
        now: DateTime<Utc>,
    ) -> Result<Vec<DealRow>, StoreError>;

    async fn fee_rules_for_branches(
        &self,
        branch_ids: &[String],
    ) -> Result<Vec<FeeRuleRow>, StoreError>;
}

// ---------------------------------------------------------------------------
// SQLite implementation
// ---------------------------------------------------------------------------

pub struct SqlDiscoveryStore {
    pool: DbPool,
}

impl SqlDiscoveryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn branches_for_restaurants(
        &self,
        restaurant_ids: &[String],
    ) -> Result<Vec<BranchRow>, StoreError> {
        if restaurant_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder = QueryBuilder::new(
            "SELECT id, restaurant_id, lat, lng, delivery_radius_km, rating, review_count, \
             eta_minutes, avg_price_estimate, delivery_fee, promo_text, categories \
             FROM branches WHERE restaurant_id IN (",
        );
        let mut ids = builder.separated(", ");
        for id in restaurant_ids {
            ids.push_bind(id);
        }
        ids.push_unseparated(")");
        builder.push(" ORDER BY created_at, id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(branch_from_row).collect()
    }

    async fn bundle(
        &self,
        restaurants: Vec<RestaurantRow>,
    ) -> Result<Vec<RestaurantWithBranches>, StoreError> {
        let ids: Vec<String> = restaurants.iter().map(|r| r.id.clone()).collect();
        let mut by_restaurant: HashMap<String, Vec<BranchRow>> = HashMap::new();
        for branch in self.branches_for_restaurants(&ids).await? {
            by_restaurant.entry(branch.restaurant_id.clone()).or_default().push(branch);
        }
        Ok(restaurants
            .into_iter()
            .map(|restaurant| {
                let branches = by_restaurant.remove(&restaurant.id).unwrap_or_default();
                RestaurantWithBranches { restaurant, branches }
            })
            .collect())
    }
}

#[async_trait]
impl DiscoveryStore for SqlDiscoveryStore {
    async fn active_restaurants(
        &self,
        limit: u32,
    ) -> Result<Vec<RestaurantWithBranches>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, slug, description, is_active, rating, review_count, \
             eta_minutes, avg_price_estimate, estimated_delivery_fee, promo_text \
             FROM restaurants WHERE is_active = 1 ORDER BY created_at DESC, id LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        let restaurants =
            rows.iter().map(restaurant_from_row).collect::<Result<Vec<_>, _>>()?;
        self.bundle(restaurants).await
    }

    async fn restaurants_by_ids(
        &self,
        ids: &[String],
    ) -> Result<Vec<RestaurantWithBranches>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder = QueryBuilder::new(
            "SELECT id, name, slug, description, is_active, rating, review_count, \
             eta_minutes, avg_price_estimate, estimated_delivery_fee, promo_text \
             FROM restaurants WHERE id IN (",
        );
        let mut bound = builder.separated(", ");
        for id in ids {
            bound.push_bind(id);
        }
        bound.push_unseparated(")");
        builder.push(" ORDER BY created_at DESC, id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let restaurants =
            rows.iter().map(restaurant_from_row).collect::<Result<Vec<_>, _>>()?;
        self.bundle(restaurants).await
    }

    async fn deals_for_branches(
        &self,
        branch_ids: &[String],
        now: DateTime<Utc>,
    ) -> Result<Vec<DealRow>, StoreError> {
        if branch_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder = QueryBuilder::new(
            "SELECT id, branch_id, title, discount_type, discount_value, starts_at, \
             ends_at, created_at FROM deals WHERE branch_id IN (",
        );
        let mut bound = builder.separated(", ");
        for id in branch_ids {
            bound.push_bind(id);
        }
        bound.push_unseparated(")");
        builder
            .push(" AND (starts_at IS NULL OR starts_at <= ")
            .push_bind(now)
            .push(") AND (ends_at IS NULL OR ends_at >= ")
            .push_bind(now)
            .push(") ORDER BY created_at, id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(deal_from_row).collect()
    }

    async fn fee_rules_for_branches(
        &self,
        branch_ids: &[String],
    ) -> Result<Vec<FeeRuleRow>, StoreError> {
        if branch_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder = QueryBuilder::new(
            "SELECT id, branch_id, delivery_fee, service_fee, platform_fee \
             FROM fee_rules WHERE branch_id IN (",
        );
        let mut bound = builder.separated(", ");
        for id in branch_ids {
            bound.push_bind(id);
        }
        bound.push_unseparated(")");
        builder.push(" ORDER BY created_at, id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(fee_rule_from_row).collect()
    }
}

fn restaurant_from_row(row: &SqliteRow) -> Result<RestaurantRow, StoreError> {
    Ok(RestaurantRow {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        is_active: row.try_get::<i64, _>("is_active")? != 0,
        rating: row.try_get("rating")?,
        review_count: row.try_get("review_count")?,
        eta_minutes: row.try_get("eta_minutes")?,
        avg_price_estimate: row.try_get("avg_price_estimate")?,
        estimated_delivery_fee: row.try_get("estimated_delivery_fee")?,
        promo_text: row.try_get("promo_text")?,
    })
}

fn branch_from_row(row: &SqliteRow) -> Result<BranchRow, StoreError> {
    let categories = match row.try_get::<Option<String>, _>("categories")? {
        // JSON array or JSON string; a bare name is accepted as-is.
        Some(raw) => serde_json::from_str::<CategoryTags>(&raw)
            .unwrap_or(CategoryTags::One(raw)),
        None => CategoryTags::None,
    };
    Ok(BranchRow {
        id: row.try_get("id")?,
        restaurant_id: row.try_get("restaurant_id")?,
        lat: row.try_get("lat")?,
        lng: row.try_get("lng")?,
        delivery_radius_km: row.try_get("delivery_radius_km")?,
        rating: row.try_get("rating")?,
        review_count: row.try_get("review_count")?,
        eta_minutes: row.try_get("eta_minutes")?,
        avg_price_estimate: row.try_get("avg_price_estimate")?,
        delivery_fee: row.try_get("delivery_fee")?,
        promo_text: row.try_get("promo_text")?,
        categories,
    })
}

fn deal_from_row(row: &SqliteRow) -> Result<DealRow, StoreError> {
    let discount_type = match row.try_get::<Option<String>, _>("discount_type")? {
        None => None,
        Some(raw) => match raw.as_str() {
            "percentage" => Some(DiscountType::Percentage),
            "fixed" => Some(DiscountType::Fixed),
            other => {
                return Err(StoreError::Decode(format!(
                    "unknown discount type `{other}`"
                )))
            }
        },
    };
    Ok(DealRow {
        id: row.try_get("id")?,
        branch_id: row.try_get("branch_id")?,
        title: row.try_get("title")?,
        discount_type,
        discount_value: row.try_get("discount_value")?,
        starts_at: row.try_get("starts_at")?,
        ends_at: row.try_get("ends_at")?,
        created_at: row.try_get("created_at")?,
    })
}

fn fee_rule_from_row(row: &SqliteRow) -> Result<FeeRuleRow, StoreError> {
    Ok(FeeRuleRow {
        id: row.try_get("id")?,
        branch_id: row.try_get("branch_id")?,
        delivery_fee: row.try_get("delivery_fee")?,
        service_fee: row.try_get("service_fee")?,
        platform_fee: row.try_get("platform_fee")?,
    })
}

// ---------------------------------------------------------------------------
// In-memory implementation (tests, local experiments)
// ---------------------------------------------------------------------------

#[derive(Default)]
struct InMemoryState {
    restaurants: Vec<RestaurantWithBranches>,
    deals: Vec<DealRow>,
    fee_rules: Vec<FeeRuleRow>,
    fail: bool,
}

#[derive(Default)]
pub struct InMemoryDiscoveryStore {
    state: RwLock<InMemoryState>,
}

impl InMemoryDiscoveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_restaurants(restaurants: Vec<RestaurantWithBranches>) -> Self {
        let store = Self::new();
        store.state.write().expect("store lock poisoned").restaurants = restaurants;
        store
    }

    pub fn push_deal(&self, deal: DealRow) {
        self.state.write().expect("store lock poisoned").deals.push(deal);
    }

    pub fn push_fee_rule(&self, rule: FeeRuleRow) {
        self.state.write().expect("store lock poisoned").fee_rules.push(rule);
    }

    /// Make every subsequent fetch fail, for exercising the hard-failure
    /// contract.
    pub fn fail_fetches(&self) {
        self.state.write().expect("store lock poisoned").fail = true;
    }

    fn guard(&self) -> Result<std::sync::RwLockReadGuard<'_, InMemoryState>, StoreError> {
        let state = self.state.read().expect("store lock poisoned");
        if state.fail {
            return Err(StoreError::Decode("in-memory store set to fail".to_owned()));
        }
        Ok(state)
    }
}

#[async_trait]
impl DiscoveryStore for InMemoryDiscoveryStore {
    async fn active_restaurants(
        &self,
        limit: u32,
    ) -> Result<Vec<RestaurantWithBranches>, StoreError> {
        let state = self.guard()?;
        Ok(state
            .restaurants
            .iter()
            .filter(|bundle| bundle.restaurant.is_active)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn restaurants_by_ids(
        &self,
        ids: &[String],
    ) -> Result<Vec<RestaurantWithBranches>, StoreError> {
        let state = self.guard()?;
        Ok(state
            .restaurants
            .iter()
            .filter(|bundle| ids.contains(&bundle.restaurant.id))
            .cloned()
            .collect())
    }

    async fn deals_for_branches(
        &self,
        branch_ids: &[String],
        now: DateTime<Utc>,
    ) -> Result<Vec<DealRow>, StoreError> {
        let state = self.guard()?;
        Ok(state
            .deals
            .iter()
            .filter(|deal| branch_ids.contains(&deal.branch_id) && deal.is_active_at(now))
            .cloned()
            .collect())
    }

    async fn fee_rules_for_branches(
        &self,
        branch_ids: &[String],
    ) -> Result<Vec<FeeRuleRow>, StoreError> {
        let state = self.guard()?;
        Ok(state
            .fee_rules
            .iter()
            .filter(|rule| branch_ids.contains(&rule.branch_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(id: &str, active: bool) -> RestaurantWithBranches {
        RestaurantWithBranches {
            restaurant: RestaurantRow {
                id: id.to_owned(),
                name: format!("Restaurant {id}"),
                slug: format!("restaurant-{id}"),
                description: None,
                is_active: active,
                rating: None,
                review_count: None,
                eta_minutes: None,
                avg_price_estimate: None,
                estimated_delivery_fee: None,
                promo_text: None,
            },
            branches: Vec::new(),
        }
    }

    #[tokio::test]
    async fn in_memory_store_filters_inactive_and_respects_limit() {
        let store = InMemoryDiscoveryStore::with_restaurants(vec![
            bundle("a", true),
            bundle("b", false),
            bundle("c", true),
            bundle("d", true),
        ]);
        let bundles = store.active_restaurants(2).await.expect("fetch");
        let ids: Vec<&str> =
            bundles.iter().map(|b| b.restaurant.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn in_memory_store_surfaces_hard_failures() {
        let store = InMemoryDiscoveryStore::with_restaurants(vec![bundle("a", true)]);
        store.fail_fetches();
        assert!(store.active_restaurants(10).await.is_err());
        assert!(store.fee_rules_for_branches(&["b".to_owned()]).await.is_err());
    }
}
