use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
};
use uuid::Uuid;

use crate::{
    database::Database,
    error::{ApiError, ApiResult},
    middleware::{get_current_user, require_admin},
    models::{UpdateProfile, UpdateUser, User, UserResponse},
};

pub async fn list_users(
    State(db): State<Database>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<UserResponse>>> {
    let current = get_current_user(&headers, &db).await?;
    require_admin(&current)?;

    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY full_name")
        .fetch_all(&db)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(users))
}

pub async fn get_user(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    let current = get_current_user(&headers, &db).await?;
    require_admin(&current)?;

    fetch_user(&db, user_id).await.map(|u| Json(u.into()))
}

pub async fn update_user(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUser>,
) -> ApiResult<Json<UserResponse>> {
    let current = get_current_user(&headers, &db).await?;
    require_admin(&current)?;

    if payload.full_name.trim().is_empty() {
        return Err(ApiError::Validation("Full name is required".to_string()));
    }
    fetch_user(&db, user_id).await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET full_name = $1, phone = $2, property_id = $3, is_active = $4, updated_at = NOW()
        WHERE id = $5
        RETURNING *
        "#,
    )
    .bind(payload.full_name.trim())
    .bind(&payload.phone)
    .bind(payload.property_id)
    .bind(payload.is_active)
    .bind(user_id)
    .fetch_one(&db)
    .await?;

    Ok(Json(user.into()))
}

pub async fn delete_user(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let current = get_current_user(&headers, &db).await?;
    require_admin(&current)?;

    if user_id == current.id {
        return Err(ApiError::Validation(
            "You cannot delete your own account".to_string(),
        ));
    }
    fetch_user(&db, user_id).await?;

    sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
        .bind(user_id)
        .execute(&db)
        .await?;
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&db)
        .await?;

    Ok(Json(serde_json::json!({ "deleted": user_id })))
}

pub async fn lock_user(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    set_lock(&db, headers, user_id, true).await
}

pub async fn unlock_user(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    set_lock(&db, headers, user_id, false).await
}

async fn set_lock(
    db: &Database,
    headers: HeaderMap,
    user_id: Uuid,
    locked: bool,
) -> ApiResult<Json<UserResponse>> {
    let current = get_current_user(&headers, db).await?;
    require_admin(&current)?;

    if locked && user_id == current.id {
        return Err(ApiError::Validation(
            "You cannot lock your own account".to_string(),
        ));
    }
    fetch_user(db, user_id).await?;

    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET is_locked = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
    )
    .bind(locked)
    .bind(user_id)
    .fetch_one(db)
    .await?;

    // A locked user should not be able to ride out an old session
    if locked {
        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(db)
            .await?;
    }

    Ok(Json(user.into()))
}

pub async fn get_profile(
    State(db): State<Database>,
    headers: HeaderMap,
) -> ApiResult<Json<UserResponse>> {
    let current = get_current_user(&headers, &db).await?;
    fetch_user(&db, current.id).await.map(|u| Json(u.into()))
}

pub async fn update_profile(
    State(db): State<Database>,
    headers: HeaderMap,
    Json(payload): Json<UpdateProfile>,
) -> ApiResult<Json<UserResponse>> {
    let current = get_current_user(&headers, &db).await?;

    if payload.full_name.trim().is_empty() {
        return Err(ApiError::Validation("Full name is required".to_string()));
    }

    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET full_name = $1, phone = $2, updated_at = NOW() WHERE id = $3 RETURNING *",
    )
    .bind(payload.full_name.trim())
    .bind(&payload.phone)
    .bind(current.id)
    .fetch_one(&db)
    .await?;

    Ok(Json(user.into()))
}

async fn fetch_user(db: &Database, user_id: Uuid) -> ApiResult<User> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}
