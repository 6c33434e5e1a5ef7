//! Weight vector for the six scoring factors.

use serde::{Deserialize, Serialize};

/// Weights combined into the composite score. The defaults sum to 1.0 by
/// convention; that sum is not enforced so operators can boost a single
/// factor without rebalancing the rest.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankingWeights {
    pub intent_relevance: f64,
    pub distance: f64,
    pub value: f64,
    pub eta: f64,
    pub rating: f64,
    pub promo_strength: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            intent_relevance: 0.25,
            distance: 0.20,
            value: 0.20,
            eta: 0.15,
            rating: 0.10,
            promo_strength: 0.10,
        }
    }
}

/// Raw override candidates, one per factor, typically parsed from the
/// environment. Non-finite values are rejected per factor.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WeightOverrides {
    pub intent_relevance: Option<f64>,
    pub distance: Option<f64>,
    pub value: Option<f64>,
    pub eta: Option<f64>,
    pub rating: Option<f64>,
    pub promo_strength: Option<f64>,
}

impl RankingWeights {
    /// Apply overrides factor by factor. An override is accepted only when
    /// it is a finite number; otherwise the default stands.
    pub fn resolve(overrides: &WeightOverrides) -> Self {
        let defaults = Self::default();
        let pick = |candidate: Option<f64>, default: f64| {
            candidate.filter(|v| v.is_finite()).unwrap_or(default)
        };
        Self {
            intent_relevance: pick(overrides.intent_relevance, defaults.intent_relevance),
            distance: pick(overrides.distance, defaults.distance),
            value: pick(overrides.value, defaults.value),
            eta: pick(overrides.eta, defaults.eta),
            rating: pick(overrides.rating, defaults.rating),
            promo_strength: pick(overrides.promo_strength, defaults.promo_strength),
        }
    }
}
