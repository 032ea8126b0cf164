use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::aggregate::{Nutrients, PeriodStats};
use super::repo_types::{Meal, MealType};
use crate::auth::repo_types::Goals;

/// Nested `nutrition` object of a meal payload.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct NutritionInput {
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    pub sugar: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PortionInput {
    Text(String),
    Amount(f64),
}

impl PortionInput {
    pub fn into_text(self) -> String {
        match self {
            PortionInput::Text(s) => s.trim().to_string(),
            PortionInput::Amount(a) => a.to_string(),
        }
    }
}

/// Body of `POST /meals` and `PUT /meals/:id`.
///
/// Nutrient values may come nested under `nutrition` or flat at the top
/// level; the nested value wins when both are present.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct MealPayload {
    pub name: Option<String>,
    pub calories: Option<f64>,
    #[serde(default)]
    pub nutrition: Option<NutritionInput>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    pub sugar: Option<f64>,
    #[serde(alias = "time", alias = "date", alias = "eatenAt")]
    pub eaten_at: Option<String>,
    pub portion: Option<PortionInput>,
    #[serde(alias = "foodId")]
    pub food_id: Option<String>,
    #[serde(alias = "mealType")]
    pub meal_type: Option<MealType>,
}

#[derive(Debug, Serialize)]
pub struct NutritionOut {
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub sugar: f64,
}

#[derive(Debug, Serialize)]
pub struct MealResponse {
    pub id: Uuid,
    pub name: String,
    pub calories: f64,
    pub nutrition: NutritionOut,
    pub portion: Option<String>,
    pub food_id: Option<String>,
    pub meal_type: MealType,
    #[serde(with = "time::serde::rfc3339")]
    pub eaten_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Meal> for MealResponse {
    fn from(m: Meal) -> Self {
        Self {
            id: m.id,
            name: m.name,
            calories: m.calories,
            nutrition: NutritionOut {
                protein: m.protein,
                carbs: m.carbs,
                fat: m.fat,
                fiber: m.fiber,
                sugar: m.sugar,
            },
            portion: m.portion,
            food_id: m.food_id,
            meal_type: m.meal_type,
            eaten_at: m.eaten_at,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub from: Option<String>,
    pub to: Option<String>,
}
fn default_limit() -> i64 {
    20
}

/// `tz_offset` is minutes east of UTC for every aggregation query.
#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    #[serde(alias = "tzOffset")]
    pub tz_offset: Option<i32>,
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WeeklyQuery {
    #[serde(alias = "tzOffset")]
    pub tz_offset: Option<i32>,
    pub end: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(alias = "tzOffset")]
    pub tz_offset: Option<i32>,
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default, alias = "q")]
    pub query: String,
    #[serde(alias = "pageSize")]
    pub page_size: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct Remaining {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl Remaining {
    pub fn of(goals: Goals, totals: Nutrients) -> Self {
        Self {
            calories: f64::from(goals.calories) - totals.calories,
            protein: f64::from(goals.protein) - totals.protein,
            carbs: f64::from(goals.carbs) - totals.carbs,
            fat: f64::from(goals.fat) - totals.fat,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DaySummaryResponse {
    pub date: String,
    pub tz_offset: i32,
    pub totals: Nutrients,
    pub meal_count: usize,
    pub calories_by_meal_type: BTreeMap<MealType, f64>,
    pub goals: Goals,
    pub remaining: Remaining,
    pub meals: Vec<MealResponse>,
}

#[derive(Debug, Serialize)]
pub struct DayTotalsResponse {
    pub date: String,
    pub totals: Nutrients,
    pub meal_count: usize,
}

#[derive(Debug, Serialize)]
pub struct WeeklyStatsResponse {
    pub start: String,
    pub end: String,
    pub tz_offset: i32,
    pub days: Vec<DayTotalsResponse>,
    pub stats: PeriodStats,
    pub goals: Goals,
}

#[derive(Debug, Serialize)]
pub struct HistoryDay {
    pub date: String,
    pub totals: Nutrients,
    pub meal_count: usize,
    pub meals: Vec<MealResponse>,
}
