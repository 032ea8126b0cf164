use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Meal, MealChanges, NewMeal};

const MEAL_COLUMNS: &str = "id, user_id, name, calories, protein, carbs, fat, fiber, sugar, \
     portion, food_id, meal_type, eaten_at, created_at, updated_at";

impl Meal {
    pub async fn insert(db: &PgPool, user_id: Uuid, meal: &NewMeal) -> Result<Meal, sqlx::Error> {
        sqlx::query_as::<_, Meal>(&format!(
            r#"
            INSERT INTO meals (user_id, name, calories, protein, carbs, fat, fiber, sugar,
                               portion, food_id, meal_type, eaten_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {MEAL_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&meal.name)
        .bind(meal.nutrients.calories)
        .bind(meal.nutrients.protein)
        .bind(meal.nutrients.carbs)
        .bind(meal.nutrients.fat)
        .bind(meal.nutrients.fiber)
        .bind(meal.nutrients.sugar)
        .bind(meal.portion.as_deref())
        .bind(meal.food_id.as_deref())
        .bind(meal.meal_type)
        .bind(meal.eaten_at)
        .fetch_one(db)
        .await
    }

    /// Loads a meal regardless of owner; callers check ownership.
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<Meal>, sqlx::Error> {
        sqlx::query_as::<_, Meal>(&format!("SELECT {MEAL_COLUMNS} FROM meals WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Newest first, optionally bounded to `[from, to)`.
    pub async fn list_by_user(
        db: &PgPool,
        user_id: Uuid,
        from: Option<OffsetDateTime>,
        to: Option<OffsetDateTime>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Meal>, sqlx::Error> {
        sqlx::query_as::<_, Meal>(&format!(
            r#"
            SELECT {MEAL_COLUMNS}
            FROM meals
            WHERE user_id = $1
              AND ($2::timestamptz IS NULL OR eaten_at >= $2)
              AND ($3::timestamptz IS NULL OR eaten_at < $3)
            ORDER BY eaten_at DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(user_id)
        .bind(from)
        .bind(to)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    /// All of a user's meals in `[start, end)`, oldest first.
    pub async fn list_in_range(
        db: &PgPool,
        user_id: Uuid,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<Meal>, sqlx::Error> {
        sqlx::query_as::<_, Meal>(&format!(
            r#"
            SELECT {MEAL_COLUMNS}
            FROM meals
            WHERE user_id = $1 AND eaten_at >= $2 AND eaten_at < $3
            ORDER BY eaten_at ASC
            "#
        ))
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(db)
        .await
    }

    pub async fn update(db: &PgPool, id: Uuid, changes: &MealChanges) -> Result<Option<Meal>, sqlx::Error> {
        sqlx::query_as::<_, Meal>(&format!(
            r#"
            UPDATE meals SET
                name       = COALESCE($2, name),
                calories   = COALESCE($3, calories),
                protein    = COALESCE($4, protein),
                carbs      = COALESCE($5, carbs),
                fat        = COALESCE($6, fat),
                fiber      = COALESCE($7, fiber),
                sugar      = COALESCE($8, sugar),
                portion    = COALESCE($9, portion),
                food_id    = COALESCE($10, food_id),
                meal_type  = COALESCE($11, meal_type),
                eaten_at   = COALESCE($12, eaten_at),
                updated_at = now()
            WHERE id = $1
            RETURNING {MEAL_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.calories)
        .bind(changes.protein)
        .bind(changes.carbs)
        .bind(changes.fat)
        .bind(changes.fiber)
        .bind(changes.sugar)
        .bind(changes.portion.as_deref())
        .bind(changes.food_id.as_deref())
        .bind(changes.meal_type)
        .bind(changes.eaten_at)
        .fetch_optional(db)
        .await
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let res = sqlx::query("DELETE FROM meals WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() == 1)
    }
}
