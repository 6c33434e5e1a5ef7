//! Price comparison request/response shapes. Options are produced fresh per
//! request and never cached.

use serde::{Deserialize, Serialize};

use crate::errors::ApplicationError;

/// One side of a comparison: a restaurant and the items the user picked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareSelection {
    pub restaurant_id: String,
    #[serde(default)]
    pub item_ids: Vec<String>,
}

impl CompareSelection {
    pub fn validate(&self) -> Result<(), ApplicationError> {
        if self.restaurant_id.trim().is_empty() {
            return Err(ApplicationError::InvalidInput(
                "restaurantId must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Comparable cost breakdown for one selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareOption {
    pub restaurant_id: String,
    pub label: String,
    pub base_price: i64,
    pub delivery_fee: i64,
    pub platform_fee: i64,
    pub discount: i64,
    pub final_price: i64,
    pub eta_minutes: Option<i64>,
}
