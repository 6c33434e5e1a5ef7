pub mod cache;
pub mod compare;
pub mod config;
pub mod contract;
pub mod domain;
pub mod enrich;
pub mod errors;
pub mod geo;
pub mod numeric;
pub mod ranking;

pub use cache::{Fingerprint, RecommendationCache};
pub use compare::{compare_options, MAX_SELECTIONS, MIN_SELECTIONS};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, RankingConfig};
pub use contract::{verify_compare_response, verify_offers, verify_recommendation_payload};
pub use domain::compare::{CompareOption, CompareSelection};
pub use domain::offer::{Branch, PromoDiscount, RestaurantOffer};
pub use domain::recommendation::{
    Constraints, Intent, Rail, RankingRequest, RecommendationItem, RecommendationKind,
    RecommendationPayload,
};
pub use enrich::enrich_offers;
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use geo::{haversine_km, Coordinates};
pub use ranking::engine::Ranker;
pub use ranking::rails::{compose_rails, RAIL_ITEM_CAP};
pub use ranking::weights::RankingWeights;

/// Identifies the scoring revision that produced a response. Bump whenever a
/// formula, weight default, or fallback seed changes.
pub const STRATEGY_VERSION: &str = "discovery-rank/3.2";
