use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{repo_types::User, AuthUser},
    error::{AppError, AppResult},
    extract::{JsonBody, PathParam, QueryParams},
    foods::{FoodSearchError, FoodSuggestion},
    state::AppState,
};

use super::aggregate;
use super::dto::{
    DaySummaryResponse, HistoryDay, HistoryQuery, ListQuery, MealPayload, MealResponse,
    SearchQuery, SummaryQuery, WeeklyQuery, WeeklyStatsResponse,
};
use super::repo_types::Meal;
use super::services::{
    self, clamp_limit, load_owned, parse_date, parse_offset, parse_timestamp, DEFAULT_HISTORY_DAYS,
    MAX_HISTORY_DAYS, WEEK_DAYS,
};

const MAX_SEARCH_PAGE: u32 = 50;

pub fn crud_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_meals).post(create_meal))
        .route("/meals/:id", get(get_meal).put(update_meal).delete(delete_meal))
}

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/meals/summary", get(day_summary))
        .route("/meals/weekly-stats", get(weekly_stats))
        .route("/meals/history", get(history))
        .route("/meals/search", get(search_foods))
}

async fn current_user(state: &AppState, user_id: Uuid) -> AppResult<User> {
    User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::unauthorized("User not found"))
}

// --- CRUD ---

#[instrument(skip(state))]
pub async fn list_meals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    QueryParams(q): QueryParams<ListQuery>,
) -> AppResult<Json<Vec<MealResponse>>> {
    let from = parse_timestamp("from", q.from.as_deref())?;
    let to = parse_timestamp("to", q.to.as_deref())?;
    if q.offset < 0 {
        return Err(AppError::field("offset", "must not be negative"));
    }

    let meals = Meal::list_by_user(&state.db, user_id, from, to, clamp_limit(q.limit), q.offset).await?;
    Ok(Json(meals.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(payload): JsonBody<MealPayload>,
) -> AppResult<impl IntoResponse> {
    let new_meal = services::new_meal(payload, OffsetDateTime::now_utc())?;
    let meal = Meal::insert(&state.db, user_id, &new_meal).await?;

    info!(%user_id, meal_id = %meal.id, calories = meal.calories, "meal created");
    let location = format!("/api/meals/{}", meal.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(MealResponse::from(meal)),
    ))
}

#[instrument(skip(state))]
pub async fn get_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> AppResult<Json<MealResponse>> {
    let meal = load_owned(&state.db, id, user_id).await?;
    Ok(Json(meal.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    PathParam(id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<MealPayload>,
) -> AppResult<Json<MealResponse>> {
    let changes = services::meal_changes(payload)?;
    load_owned(&state.db, id, user_id).await?;

    let meal = Meal::update(&state.db, id, &changes)
        .await?
        .ok_or(AppError::NotFound("Meal"))?;
    info!(%user_id, meal_id = %id, "meal updated");
    Ok(Json(meal.into()))
}

#[instrument(skip(state))]
pub async fn delete_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> AppResult<StatusCode> {
    load_owned(&state.db, id, user_id).await?;
    if !Meal::delete(&state.db, id).await? {
        return Err(AppError::NotFound("Meal"));
    }
    info!(%user_id, meal_id = %id, "meal deleted");
    Ok(StatusCode::NO_CONTENT)
}

// --- aggregation ---

#[instrument(skip(state))]
pub async fn day_summary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    QueryParams(q): QueryParams<SummaryQuery>,
) -> AppResult<Json<DaySummaryResponse>> {
    let (minutes, offset) = parse_offset(q.tz_offset)?;
    let date = parse_date("date", q.date.as_deref())?.unwrap_or_else(|| aggregate::today(offset));

    let (start, end) = aggregate::day_bounds(date, offset)
        .ok_or_else(|| AppError::field("date", "out of range"))?;
    let user = current_user(&state, user_id).await?;
    let meals = Meal::list_in_range(&state.db, user_id, start, end).await?;

    Ok(Json(services::day_summary(date, minutes, meals, user.goals())))
}

#[instrument(skip(state))]
pub async fn weekly_stats(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    QueryParams(q): QueryParams<WeeklyQuery>,
) -> AppResult<Json<WeeklyStatsResponse>> {
    let (minutes, offset) = parse_offset(q.tz_offset)?;
    let last = parse_date("end", q.end.as_deref())?.unwrap_or_else(|| aggregate::today(offset));
    let (first, (start, end)) = aggregate::window_start(last, WEEK_DAYS)
        .and_then(|first| Some((first, aggregate::range_bounds(first, last, offset)?)))
        .ok_or_else(|| AppError::field("end", "out of range"))?;

    let user = current_user(&state, user_id).await?;
    let meals = Meal::list_in_range(&state.db, user_id, start, end).await?;

    let days = aggregate::daily_totals(&meals, first, last, offset);
    Ok(Json(services::weekly_stats(days, minutes, user.goals())))
}

#[instrument(skip(state))]
pub async fn history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    QueryParams(q): QueryParams<HistoryQuery>,
) -> AppResult<Json<Vec<HistoryDay>>> {
    let (_, offset) = parse_offset(q.tz_offset)?;
    let days = q.days.unwrap_or(DEFAULT_HISTORY_DAYS);
    if !(1..=MAX_HISTORY_DAYS).contains(&days) {
        return Err(AppError::field(
            "days",
            format!("must be between 1 and {MAX_HISTORY_DAYS}"),
        ));
    }

    let last = aggregate::today(offset);
    let (start, end) = aggregate::window_start(last, days)
        .and_then(|first| aggregate::range_bounds(first, last, offset))
        .ok_or_else(|| AppError::field("days", "out of range"))?;
    let meals = Meal::list_in_range(&state.db, user_id, start, end).await?;

    let buckets = aggregate::group_by_local_day(meals, offset);
    Ok(Json(services::history(buckets)))
}

// --- food database ---

#[instrument(skip(state))]
pub async fn search_foods(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    QueryParams(q): QueryParams<SearchQuery>,
) -> AppResult<Json<Vec<FoodSuggestion>>> {
    let query = q.query.trim();
    if query.is_empty() {
        return Err(AppError::field("query", "Search query is required"));
    }
    let page_size = q.page_size.unwrap_or(10);
    if !(1..=MAX_SEARCH_PAGE).contains(&page_size) {
        return Err(AppError::field(
            "page_size",
            format!("must be between 1 and {MAX_SEARCH_PAGE}"),
        ));
    }

    match state.foods.search(query, page_size).await {
        Ok(foods) => Ok(Json(foods)),
        Err(FoodSearchError::NotConfigured) => Err(AppError::ServiceUnavailable(
            "Food search is not configured".into(),
        )),
        Err(FoodSearchError::Upstream(msg)) => {
            warn!(%user_id, error = %msg, "food search failed");
            Err(AppError::Upstream(msg))
        }
    }
}
