use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use crate::auth::{
    dto::{RegisterRequest, UpdateProfileRequest},
    password::{check_length, verify_password},
    repo_types::{ProfileChanges, User},
};
use crate::error::{AppError, AppResult, FieldErrors};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Normalises the request in place and rejects it with per-field messages.
pub(crate) fn validate_register(req: &mut RegisterRequest) -> AppResult<()> {
    req.name = req.name.trim().to_string();
    req.email = normalize_email(&req.email);

    let mut errs = FieldErrors::new();
    errs.check(!req.name.is_empty(), "name", "Name is required");
    errs.check(is_valid_email(&req.email), "email", "Invalid email");
    check_length(&req.password, "password", &mut errs);
    errs.finish()
}

pub(crate) fn validate_new_password(password: &str, errs: &mut FieldErrors) {
    check_length(password, "new_password", errs);
}

pub(crate) fn profile_changes(req: UpdateProfileRequest) -> AppResult<ProfileChanges> {
    let mut errs = FieldErrors::new();

    let name = req.name.map(|n| n.trim().to_string());
    if let Some(n) = &name {
        errs.check(!n.is_empty(), "name", "Name cannot be empty");
    }
    let email = req.email.as_deref().map(normalize_email);
    if let Some(e) = &email {
        errs.check(is_valid_email(e), "email", "Invalid email");
    }
    for (field, goal) in [
        ("calorie_goal", req.calorie_goal),
        ("protein_goal", req.protein_goal),
        ("carbs_goal", req.carbs_goal),
        ("fat_goal", req.fat_goal),
    ] {
        if let Some(g) = goal {
            errs.check(g >= 0, field, "must not be negative");
        }
    }
    for (field, v) in [("weight", req.weight), ("height", req.height)] {
        if let Some(v) = v {
            errs.check(v.is_finite() && v > 0.0, field, "must be a positive number");
        }
    }
    errs.finish()?;

    Ok(ProfileChanges {
        name,
        email,
        calorie_goal: req.calorie_goal,
        protein_goal: req.protein_goal,
        carbs_goal: req.carbs_goal,
        fat_goal: req.fat_goal,
        weight: req.weight,
        height: req.height,
        activity_level: req.activity_level,
        goal_type: req.goal_type,
    })
}

/// Unknown email and wrong password are indistinguishable to the caller.
pub(crate) fn authenticate(user: Option<User>, email: &str, password: &str) -> AppResult<User> {
    let Some(user) = user else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };
    if !verify_password(password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;
    use crate::auth::repo_types::{ActivityLevel, GoalType};
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn user_with_password(password: &str) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: hash_password(password).unwrap(),
            calorie_goal: 2000,
            protein_goal: 150,
            carbs_goal: 250,
            fat_goal: 65,
            weight: None,
            height: None,
            activity_level: ActivityLevel::Moderate,
            goal_type: GoalType::Maintain,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("spaces in@x.com"));
        assert!(!is_valid_email("a@nodot"));
    }

    #[test]
    fn register_normalises_and_accepts() {
        let mut req = RegisterRequest {
            name: "  Ada  ".into(),
            email: "  Ada@Example.COM ".into(),
            password: "longenough".into(),
        };
        validate_register(&mut req).unwrap();
        assert_eq!(req.name, "Ada");
        assert_eq!(req.email, "ada@example.com");
    }

    #[test]
    fn register_reports_every_bad_field() {
        let mut req = RegisterRequest {
            name: " ".into(),
            email: "nope".into(),
            password: "short".into(),
        };
        match validate_register(&mut req).unwrap_err() {
            AppError::Validation(fields) => {
                assert_eq!(fields.len(), 3);
                assert_eq!(fields["password"], "Password too short");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn login_with_wrong_password_is_rejected() {
        let user = user_with_password("right-password");
        let err = authenticate(Some(user), "ada@example.com", "wrong-password").unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[test]
    fn login_with_unknown_email_is_rejected_the_same_way() {
        let err = authenticate(None, "ghost@example.com", "whatever").unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
        assert_eq!(err.to_string(), "Invalid credentials");
    }

    #[test]
    fn login_with_right_password_returns_user() {
        let user = user_with_password("right-password");
        let id = user.id;
        let got = authenticate(Some(user), "ada@example.com", "right-password").unwrap();
        assert_eq!(got.id, id);
    }

    #[test]
    fn profile_changes_validate_goals_and_body_metrics() {
        let req = UpdateProfileRequest {
            calorie_goal: Some(-5),
            weight: Some(0.0),
            ..Default::default()
        };
        match profile_changes(req).unwrap_err() {
            AppError::Validation(fields) => {
                assert!(fields.contains_key("calorie_goal"));
                assert!(fields.contains_key("weight"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let changes = profile_changes(UpdateProfileRequest {
            email: Some(" New@Mail.io ".into()),
            protein_goal: Some(120),
            goal_type: Some(GoalType::Lose),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(changes.email.as_deref(), Some("new@mail.io"));
        assert_eq!(changes.protein_goal, Some(120));
        assert_eq!(changes.goal_type, Some(GoalType::Lose));
        assert!(changes.name.is_none());
    }

    #[test]
    fn profile_request_accepts_camel_case_keys() {
        let req: UpdateProfileRequest =
            serde_json::from_str(r#"{"calorieGoal": 1800, "activityLevel": "very_active"}"#).unwrap();
        assert_eq!(req.calorie_goal, Some(1800));
        assert_eq!(req.activity_level, Some(ActivityLevel::VeryActive));
    }
}
