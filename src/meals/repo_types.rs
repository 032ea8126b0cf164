use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::aggregate::Nutrients;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "meal_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    #[default]
    Snack,
}

#[derive(Debug, Clone, FromRow)]
pub struct Meal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub sugar: f64,
    pub portion: Option<String>,
    pub food_id: Option<String>,
    pub meal_type: MealType,
    pub eaten_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Meal {
    pub fn nutrients(&self) -> Nutrients {
        Nutrients {
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
            fiber: self.fiber,
            sugar: self.sugar,
        }
    }
}

/// A validated meal ready for insertion.
#[derive(Debug, Clone)]
pub struct NewMeal {
    pub name: String,
    pub nutrients: Nutrients,
    pub portion: Option<String>,
    pub food_id: Option<String>,
    pub meal_type: MealType,
    pub eaten_at: OffsetDateTime,
}

/// Partial meal update; `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct MealChanges {
    pub name: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    pub sugar: Option<f64>,
    pub portion: Option<String>,
    pub food_id: Option<String>,
    pub meal_type: Option<MealType>,
    pub eaten_at: Option<OffsetDateTime>,
}
