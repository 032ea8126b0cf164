pub mod fdc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::meals::aggregate::Nutrients;

pub use fdc::FdcClient;

/// A food candidate returned by an external nutrition database.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FoodSuggestion {
    pub food_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serving_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serving_unit: Option<String>,
    pub nutrition: Nutrients,
}

#[derive(Debug, Error)]
pub enum FoodSearchError {
    #[error("food search is not configured")]
    NotConfigured,
    #[error("{0}")]
    Upstream(String),
}

#[async_trait]
pub trait FoodSearch: Send + Sync {
    async fn search(&self, query: &str, page_size: u32) -> Result<Vec<FoodSuggestion>, FoodSearchError>;
}
