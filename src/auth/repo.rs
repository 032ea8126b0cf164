use crate::auth::repo_types::{ProfileChanges, User};
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, name, email, password_hash, calorie_goal, protein_goal, carbs_goal, \
     fat_goal, weight, height, activity_level, goal_type, created_at, updated_at";

impl User {
    /// Find a user by (already normalised) email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Create a new user; goals and profile fields take their column defaults.
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await
    }

    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                name           = COALESCE($2, name),
                email          = COALESCE($3, email),
                calorie_goal   = COALESCE($4, calorie_goal),
                protein_goal   = COALESCE($5, protein_goal),
                carbs_goal     = COALESCE($6, carbs_goal),
                fat_goal       = COALESCE($7, fat_goal),
                weight         = COALESCE($8, weight),
                height         = COALESCE($9, height),
                activity_level = COALESCE($10, activity_level),
                goal_type      = COALESCE($11, goal_type),
                updated_at     = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.calorie_goal)
        .bind(changes.protein_goal)
        .bind(changes.carbs_goal)
        .bind(changes.fat_goal)
        .bind(changes.weight)
        .bind(changes.height)
        .bind(changes.activity_level)
        .bind(changes.goal_type)
        .fetch_optional(db)
        .await
    }

    pub async fn update_password(db: &PgPool, id: Uuid, password_hash: &str) -> Result<bool, sqlx::Error> {
        let res = sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(db)
            .await?;
        Ok(res.rows_affected() == 1)
    }
}
