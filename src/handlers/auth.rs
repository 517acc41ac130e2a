use axum::{
    extract::State,
    http::HeaderMap,
    response::Json,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    database::Database,
    error::{ApiError, ApiResult},
    middleware::{get_current_user, require_admin},
    models::{
        AccountType, CreateCaretaker, LoginRequest, LoginResponse, RefreshRequest,
        RegisterRequest, User, UserResponse,
    },
    utils::{create_token, hash_password, verify_password},
};

const REFRESH_TOKEN_DAYS: i64 = 30;

/// Status mapping is part of the contract with the login form: the SPA shows
/// a field error on the email for 404, on the password for 400, and an
/// account banner for 403.
pub async fn login(
    State(db): State<Database>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(payload.email.trim().to_lowercase())
        .fetch_optional(&db)
        .await?
        .ok_or_else(|| ApiError::NotFound("No account found for this email".to_string()))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(ApiError::Validation("Incorrect password".to_string()));
    }
    if !user.is_active || user.is_locked {
        return Err(ApiError::Forbidden("This account is disabled".to_string()));
    }

    sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
        .bind(user.id)
        .execute(&db)
        .await?;

    issue_token_pair(&db, user).await.map(Json)
}

pub async fn register(
    State(db): State<Database>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<Json<LoginResponse>> {
    validate_credentials(&payload.email, &payload.password, &payload.full_name)?;

    let email = payload.email.trim().to_lowercase();
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::Conflict(
            "An account with this email already exists".to_string(),
        ));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, password_hash, full_name, phone, account_type, property_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(&password_hash)
    .bind(payload.full_name.trim())
    .bind(&payload.phone)
    .bind(AccountType::Admin)
    .bind(payload.property_id)
    .fetch_one(&db)
    .await?;

    issue_token_pair(&db, user).await.map(Json)
}

/// Admin-only: creates a caretaker account bound to a single property.
pub async fn create_caretaker(
    State(db): State<Database>,
    headers: HeaderMap,
    Json(payload): Json<CreateCaretaker>,
) -> ApiResult<Json<UserResponse>> {
    let current = get_current_user(&headers, &db).await?;
    require_admin(&current)?;

    validate_credentials(&payload.email, &payload.password, &payload.full_name)?;

    let email = payload.email.trim().to_lowercase();
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::Conflict(
            "An account with this email already exists".to_string(),
        ));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, password_hash, full_name, phone, account_type, property_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(&password_hash)
    .bind(payload.full_name.trim())
    .bind(&payload.phone)
    .bind(AccountType::Caretaker)
    .bind(payload.property_id)
    .fetch_one(&db)
    .await?;

    Ok(Json(user.into()))
}

/// Single-use rotation: the presented refresh token is deleted whether or not
/// a new pair is issued, so a replayed token always fails.
pub async fn refresh(
    State(db): State<Database>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let row: Option<(Uuid, chrono::DateTime<Utc>)> = sqlx::query_as(
        "DELETE FROM refresh_tokens WHERE token = $1 RETURNING user_id, expires_at",
    )
    .bind(&payload.refresh_token)
    .fetch_optional(&db)
    .await?;

    let (user_id, expires_at) =
        row.ok_or_else(|| ApiError::Unauthorized("Unknown refresh token".to_string()))?;

    if expires_at < Utc::now() {
        return Err(ApiError::Unauthorized("Refresh token expired".to_string()));
    }

    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE id = $1 AND is_active = true AND is_locked = false",
    )
    .bind(user_id)
    .fetch_optional(&db)
    .await?
    .ok_or_else(|| ApiError::Unauthorized("Account is not available".to_string()))?;

    issue_token_pair(&db, user).await.map(Json)
}

pub async fn validate_token(
    State(db): State<Database>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let current = get_current_user(&headers, &db).await?;
    Ok(Json(json!({
        "valid": true,
        "id": current.id,
        "propertyId": current.property_id,
        "accountType": current.account_type,
    })))
}

async fn issue_token_pair(db: &Database, user: User) -> ApiResult<LoginResponse> {
    let token = create_token(
        user.id,
        user.email.clone(),
        user.property_id,
        user.account_type,
    )?;

    let refresh_token = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::days(REFRESH_TOKEN_DAYS);
    sqlx::query("INSERT INTO refresh_tokens (token, user_id, expires_at) VALUES ($1, $2, $3)")
        .bind(&refresh_token)
        .bind(user.id)
        .bind(expires_at)
        .execute(db)
        .await?;

    Ok(LoginResponse {
        token,
        refresh_token,
        user: user.into(),
    })
}

fn validate_credentials(email: &str, password: &str, full_name: &str) -> Result<(), ApiError> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err(ApiError::Validation("A valid email is required".to_string()));
    }
    if password.len() < 8 {
        return Err(ApiError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    if full_name.trim().is_empty() {
        return Err(ApiError::Validation("Full name is required".to_string()));
    }
    Ok(())
}
