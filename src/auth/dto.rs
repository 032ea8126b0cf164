use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{ActivityLevel, GoalType, User};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: String,
}

/// Body of `PUT /auth/profile`; absent keys are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "calorieGoal")]
    pub calorie_goal: Option<i32>,
    #[serde(alias = "proteinGoal")]
    pub protein_goal: Option<i32>,
    #[serde(alias = "carbsGoal")]
    pub carbs_goal: Option<i32>,
    #[serde(alias = "fatGoal")]
    pub fat_goal: Option<i32>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    #[serde(alias = "activityLevel")]
    pub activity_level: Option<ActivityLevel>,
    #[serde(alias = "goalType")]
    pub goal_type: Option<GoalType>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(alias = "currentPassword")]
    pub current_password: String,
    #[serde(alias = "newPassword")]
    pub new_password: String,
}

/// Returned after register, login or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: UserProfile,
}

/// Everything about a user except the password hash.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub calorie_goal: i32,
    pub protein_goal: i32,
    pub carbs_goal: i32,
    pub fat_goal: i32,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub activity_level: ActivityLevel,
    pub goal_type: GoalType,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            calorie_goal: u.calorie_goal,
            protein_goal: u.protein_goal,
            carbs_goal: u.carbs_goal,
            fat_goal: u.fat_goal,
            weight: u.weight,
            height: u.height,
            activity_level: u.activity_level,
            goal_type: u.goal_type,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}
