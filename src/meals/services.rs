use sqlx::PgPool;
use time::{format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime, UtcOffset};
use tracing::warn;
use uuid::Uuid;

use super::aggregate::{self, DayBucket, DayTotals, Nutrients};
use super::dto::{
    DaySummaryResponse, DayTotalsResponse, HistoryDay, MealPayload, NutritionInput, Remaining,
    WeeklyStatsResponse,
};
use super::repo_types::{Meal, MealChanges, NewMeal};
use crate::auth::repo_types::Goals;
use crate::error::{AppError, AppResult, FieldErrors};

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_LIST_LIMIT: i64 = 100;
pub const DEFAULT_HISTORY_DAYS: i64 = 30;
pub const MAX_HISTORY_DAYS: i64 = 365;
pub const WEEK_DAYS: i64 = 7;

/// Gives a meal back only to its owner: missing -> 404, foreign -> 403.
pub fn ensure_owner(meal: Option<Meal>, user_id: Uuid) -> AppResult<Meal> {
    let meal = meal.ok_or(AppError::NotFound("Meal"))?;
    if meal.user_id != user_id {
        warn!(meal_id = %meal.id, owner = %meal.user_id, requester = %user_id, "foreign meal access");
        return Err(AppError::Forbidden);
    }
    Ok(meal)
}

pub async fn load_owned(db: &PgPool, id: Uuid, user_id: Uuid) -> AppResult<Meal> {
    ensure_owner(Meal::find_by_id(db, id).await?, user_id)
}

pub fn parse_offset(tz_offset: Option<i32>) -> AppResult<(i32, UtcOffset)> {
    let minutes = tz_offset.unwrap_or(0);
    let offset = aggregate::offset_from_minutes(minutes).ok_or_else(|| {
        AppError::field(
            "tz_offset",
            format!(
                "must be between -{max} and {max} minutes",
                max = aggregate::MAX_TZ_OFFSET_MINUTES
            ),
        )
    })?;
    Ok((minutes, offset))
}

pub fn parse_date(field: &str, raw: Option<&str>) -> AppResult<Option<Date>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map(Some)
        .map_err(|_| AppError::field(field, "must be a date formatted YYYY-MM-DD"))
}

pub fn parse_timestamp(field: &str, raw: Option<&str>) -> AppResult<Option<OffsetDateTime>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    OffsetDateTime::parse(raw, &Rfc3339)
        .map(Some)
        .map_err(|_| AppError::field(field, "must be an RFC 3339 timestamp"))
}

pub fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_LIST_LIMIT)
}

/// Picks each nutrient from the nested object first, then the flat field.
fn merged_nutrition(p: &MealPayload) -> NutritionInput {
    let nested = p.nutrition.clone().unwrap_or_default();
    NutritionInput {
        calories: nested.calories.or(p.calories),
        protein: nested.protein.or(p.protein),
        carbs: nested.carbs.or(p.carbs),
        fat: nested.fat.or(p.fat),
        fiber: nested.fiber.or(p.fiber),
        sugar: nested.sugar.or(p.sugar),
    }
}

fn check_nutrition(n: &NutritionInput, errs: &mut FieldErrors) {
    errs.non_negative("calories", n.calories);
    errs.non_negative("protein", n.protein);
    errs.non_negative("carbs", n.carbs);
    errs.non_negative("fat", n.fat);
    errs.non_negative("fiber", n.fiber);
    errs.non_negative("sugar", n.sugar);
}

fn check_name(name: &str, errs: &mut FieldErrors) {
    errs.check(!name.is_empty(), "name", "Meal name is required");
    errs.check(
        name.chars().count() <= MAX_NAME_LEN,
        "name",
        "Meal name is too long",
    );
}

fn clean_opt(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub fn new_meal(payload: MealPayload, now: OffsetDateTime) -> AppResult<NewMeal> {
    let mut errs = FieldErrors::new();
    let nutrition = merged_nutrition(&payload);
    check_nutrition(&nutrition, &mut errs);
    errs.check(nutrition.calories.is_some(), "calories", "Calories are required");

    let name = payload.name.as_deref().map(str::trim).unwrap_or_default().to_string();
    check_name(&name, &mut errs);

    let eaten_at = match parse_timestamp("eaten_at", payload.eaten_at.as_deref()) {
        Ok(t) => t,
        Err(AppError::Validation(fields)) => {
            for (f, m) in fields {
                errs.add(&f, m);
            }
            None
        }
        Err(e) => return Err(e),
    };
    errs.finish()?;

    Ok(NewMeal {
        name,
        nutrients: Nutrients {
            calories: nutrition.calories.unwrap_or(0.0),
            protein: nutrition.protein.unwrap_or(0.0),
            carbs: nutrition.carbs.unwrap_or(0.0),
            fat: nutrition.fat.unwrap_or(0.0),
            fiber: nutrition.fiber.unwrap_or(0.0),
            sugar: nutrition.sugar.unwrap_or(0.0),
        },
        portion: clean_opt(payload.portion.map(|p| p.into_text())),
        food_id: clean_opt(payload.food_id),
        meal_type: payload.meal_type.unwrap_or_default(),
        eaten_at: eaten_at.unwrap_or(now),
    })
}

pub fn meal_changes(payload: MealPayload) -> AppResult<MealChanges> {
    let mut errs = FieldErrors::new();
    let nutrition = merged_nutrition(&payload);
    check_nutrition(&nutrition, &mut errs);

    let name = payload.name.as_deref().map(|n| n.trim().to_string());
    if let Some(n) = &name {
        check_name(n, &mut errs);
    }
    let eaten_at = match parse_timestamp("eaten_at", payload.eaten_at.as_deref()) {
        Ok(t) => t,
        Err(AppError::Validation(fields)) => {
            for (f, m) in fields {
                errs.add(&f, m);
            }
            None
        }
        Err(e) => return Err(e),
    };
    errs.finish()?;

    Ok(MealChanges {
        name,
        calories: nutrition.calories,
        protein: nutrition.protein,
        carbs: nutrition.carbs,
        fat: nutrition.fat,
        fiber: nutrition.fiber,
        sugar: nutrition.sugar,
        portion: clean_opt(payload.portion.map(|p| p.into_text())),
        food_id: clean_opt(payload.food_id),
        meal_type: payload.meal_type,
        eaten_at,
    })
}

pub fn day_summary(
    date: Date,
    tz_minutes: i32,
    meals: Vec<Meal>,
    goals: Goals,
) -> DaySummaryResponse {
    let totals = aggregate::sum(&meals);
    DaySummaryResponse {
        date: date.to_string(),
        tz_offset: tz_minutes,
        totals: totals.rounded(),
        meal_count: meals.len(),
        calories_by_meal_type: aggregate::calories_by_type(&meals),
        goals,
        remaining: Remaining::of(goals, totals),
        meals: meals.into_iter().map(Into::into).collect(),
    }
}

pub fn weekly_stats(
    days: Vec<DayTotals>,
    tz_minutes: i32,
    goals: Goals,
) -> WeeklyStatsResponse {
    let stats = aggregate::period_stats(&days, f64::from(goals.calories));
    let start = days.first().map(|d| d.date.to_string()).unwrap_or_default();
    let end = days.last().map(|d| d.date.to_string()).unwrap_or_default();
    WeeklyStatsResponse {
        start,
        end,
        tz_offset: tz_minutes,
        days: days
            .into_iter()
            .map(|d| DayTotalsResponse {
                date: d.date.to_string(),
                totals: d.totals.rounded(),
                meal_count: d.meal_count,
            })
            .collect(),
        stats,
        goals,
    }
}

pub fn history(buckets: Vec<DayBucket>) -> Vec<HistoryDay> {
    buckets
        .into_iter()
        .map(|b| HistoryDay {
            date: b.date.to_string(),
            totals: b.totals.rounded(),
            meal_count: b.meals.len(),
            meals: b.meals.into_iter().map(Into::into).collect(),
        })
        .collect()
}
