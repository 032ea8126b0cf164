use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "activity_level", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "goal_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    Lose,
    Maintain,
    Gain,
}

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String, // argon2 PHC string
    pub calorie_goal: i32,
    pub protein_goal: i32,
    pub carbs_goal: i32,
    pub fat_goal: i32,
    pub weight: Option<f64>, // kg
    pub height: Option<f64>, // cm
    pub activity_level: ActivityLevel,
    pub goal_type: GoalType,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Daily nutrition targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Goals {
    pub calories: i32,
    pub protein: i32,
    pub carbs: i32,
    pub fat: i32,
}

impl User {
    pub fn goals(&self) -> Goals {
        Goals {
            calories: self.calorie_goal,
            protein: self.protein_goal,
            carbs: self.carbs_goal,
            fat: self.fat_goal,
        }
    }
}

/// Partial profile update; `None` leaves a column untouched.
#[derive(Debug, Default, Clone)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub calorie_goal: Option<i32>,
    pub protein_goal: Option<i32>,
    pub carbs_goal: Option<i32>,
    pub fat_goal: Option<i32>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub activity_level: Option<ActivityLevel>,
    pub goal_type: Option<GoalType>,
}
