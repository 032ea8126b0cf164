//! USDA FoodData Central search client.
//!
//! Only the `/foods/search` endpoint is used. Nutrients are picked out of
//! `foodNutrients` by nutrient id, falling back to the legacy nutrient number.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{FoodSearch, FoodSearchError, FoodSuggestion};
use crate::config::FdcConfig;
use crate::meals::aggregate::Nutrients;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    foods: Vec<FdcFood>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FdcFood {
    fdc_id: u64,
    description: String,
    brand_owner: Option<String>,
    brand_name: Option<String>,
    serving_size: Option<f64>,
    serving_size_unit: Option<String>,
    #[serde(default)]
    food_nutrients: Vec<FdcNutrient>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FdcNutrient {
    nutrient_id: Option<u32>,
    nutrient_number: Option<String>,
    unit_name: Option<String>,
    value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Calories,
    Protein,
    Carbs,
    Fat,
    Fiber,
    Sugar,
}

fn slot_for(n: &FdcNutrient) -> Option<Slot> {
    let by_id = match n.nutrient_id {
        Some(1008) => Some(Slot::Calories),
        Some(1003) => Some(Slot::Protein),
        Some(1005) => Some(Slot::Carbs),
        Some(1004) => Some(Slot::Fat),
        Some(1079) => Some(Slot::Fiber),
        Some(2000) => Some(Slot::Sugar),
        _ => None,
    };
    let slot = by_id.or_else(|| match n.nutrient_number.as_deref() {
        Some("208") => Some(Slot::Calories),
        Some("203") => Some(Slot::Protein),
        Some("205") => Some(Slot::Carbs),
        Some("204") => Some(Slot::Fat),
        Some("291") => Some(Slot::Fiber),
        Some("269") => Some(Slot::Sugar),
        _ => None,
    })?;

    // Energy is also reported in kJ under other ids; only kcal counts.
    if slot == Slot::Calories {
        if let Some(unit) = n.unit_name.as_deref() {
            if !unit.eq_ignore_ascii_case("kcal") {
                return None;
            }
        }
    }
    Some(slot)
}

fn extract_nutrients(nutrients: &[FdcNutrient]) -> Nutrients {
    let mut out = Nutrients::default();
    for n in nutrients {
        let (Some(slot), Some(value)) = (slot_for(n), n.value) else {
            continue;
        };
        let target = match slot {
            Slot::Calories => &mut out.calories,
            Slot::Protein => &mut out.protein,
            Slot::Carbs => &mut out.carbs,
            Slot::Fat => &mut out.fat,
            Slot::Fiber => &mut out.fiber,
            Slot::Sugar => &mut out.sugar,
        };
        // First reported value wins.
        if *target == 0.0 {
            *target = value.max(0.0);
        }
    }
    out
}

impl From<FdcFood> for FoodSuggestion {
    fn from(f: FdcFood) -> Self {
        let nutrition = extract_nutrients(&f.food_nutrients);
        Self {
            food_id: f.fdc_id.to_string(),
            name: f.description,
            brand: f.brand_owner.or(f.brand_name),
            serving_size: f.serving_size,
            serving_unit: f.serving_size_unit,
            nutrition,
        }
    }
}

pub struct FdcClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl FdcClient {
    pub fn new(cfg: &FdcConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("mealtrack")
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
        })
    }
}

#[async_trait]
impl FoodSearch for FdcClient {
    async fn search(&self, query: &str, page_size: u32) -> Result<Vec<FoodSuggestion>, FoodSearchError> {
        let api_key = self.api_key.as_deref().ok_or(FoodSearchError::NotConfigured)?;
        let url = format!("{}/foods/search", self.base_url);
        let page_size = page_size.to_string();

        let response = self
            .http
            .get(&url)
            .query(&[("api_key", api_key), ("query", query), ("pageSize", page_size.as_str())])
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "fdc request failed");
                FoodSearchError::Upstream("request failed".into())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "fdc returned error status");
            return Err(FoodSearchError::Upstream(format!("status {}", status.as_u16())));
        }

        let body: SearchResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "fdc response decode failed");
            FoodSearchError::Upstream("invalid response".into())
        })?;
        debug!(hits = body.foods.len(), "fdc search done");

        Ok(body.foods.into_iter().map(FoodSuggestion::from).collect())
    }
}
