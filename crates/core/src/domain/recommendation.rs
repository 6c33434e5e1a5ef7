//! Scored, user-facing recommendation types plus the ranking request shape.

use serde::{Deserialize, Serialize};

use crate::errors::ApplicationError;
use crate::geo::Coordinates;

/// Coarse user goal that reweights relevance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Cheap,
    Fast,
    Healthy,
    FamilyCombo,
    Promotions,
    BestRated,
}

impl std::str::FromStr for Intent {
    type Err = ApplicationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cheap" => Ok(Self::Cheap),
            "fast" => Ok(Self::Fast),
            "healthy" => Ok(Self::Healthy),
            "family_combo" => Ok(Self::FamilyCombo),
            "promotions" => Ok(Self::Promotions),
            "best_rated" => Ok(Self::BestRated),
            other => Err(ApplicationError::InvalidInput(format!(
                "unsupported intent `{other}`"
            ))),
        }
    }
}

/// User constraints applied after scoring.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    #[serde(default)]
    pub budget_max: Option<i64>,
    #[serde(default)]
    pub eta_max_minutes: Option<i64>,
    /// Coarse proxy: any dietary requirement only demands that the offer
    /// carries at least one category tag. Not allergen-aware.
    #[serde(default)]
    pub dietary: Vec<String>,
    /// Any-of, case-insensitive substring match against category tags.
    #[serde(default)]
    pub cuisines: Vec<String>,
}

impl Constraints {
    pub fn validate(&self) -> Result<(), ApplicationError> {
        if self.budget_max.is_some_and(|v| v < 0) {
            return Err(ApplicationError::InvalidInput(
                "budgetMax must be non-negative".to_owned(),
            ));
        }
        if self.eta_max_minutes.is_some_and(|v| v <= 0) {
            return Err(ApplicationError::InvalidInput(
                "etaMaxMinutes must be positive".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Parameters of one ranking request. Also the wire shape of the
/// recommendations endpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingRequest {
    #[serde(default)]
    pub intent: Option<Intent>,
    #[serde(default)]
    pub location: Option<Coordinates>,
    #[serde(default)]
    pub constraints: Option<Constraints>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl RankingRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_intent(mut self, intent: Intent) -> Self {
        self.intent = Some(intent);
        self
    }

    pub fn with_location(mut self, location: Coordinates) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = Some(constraints);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Interface-boundary shape check; rejected before any computation.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        if let Some(location) = &self.location {
            location.validate()?;
        }
        if let Some(constraints) = &self.constraints {
            constraints.validate()?;
        }
        if self.limit.is_some_and(|l| l == 0 || l > 100) {
            return Err(ApplicationError::InvalidInput(
                "limit must be between 1 and 100".to_owned(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    Restaurant,
    Combo,
    Dish,
    Deal,
}

/// The externally returned recommendation unit. Internal-only scoring fields
/// live on [`ScoredCandidate`], which never serializes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationItem {
    pub kind: RecommendationKind,
    pub id: String,
    pub restaurant_id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub base_price: i64,
    pub discount_amount: i64,
    pub final_price: i64,
    pub estimated_delivery_fee: i64,
    pub eta_minutes: i64,
    pub score: f64,
    /// Ordered, human-readable justifications. Never empty.
    pub reasons: Vec<String>,
    pub tags: Vec<String>,
}

/// A recommendation plus the fields used only for filtering and sorting.
/// Deliberately not serializable: stripping before the response boundary is
/// enforced by the type, not by convention.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredCandidate {
    pub item: RecommendationItem,
    pub confidence_score: f64,
    pub open_status_score: f64,
    pub freshness_score: f64,
}

/// Named, titled, capped presentation group. A grouping, not an ownership
/// relation: the same item may appear in several rails.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rail {
    pub rail_id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub items: Vec<RecommendationItem>,
}

/// The composed, cacheable response body (trace id excluded: it is stamped
/// per request on the way out).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationPayload {
    pub strategy_version: String,
    pub items: Vec<RecommendationItem>,
    pub rails: Vec<Rail>,
}
