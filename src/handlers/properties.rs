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
    models::{CreateProperty, Property},
};

pub async fn list_properties(
    State(db): State<Database>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Property>>> {
    let current = get_current_user(&headers, &db).await?;

    let properties = match current.property_scope() {
        Some(property_id) => {
            sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = $1")
                .bind(property_id)
                .fetch_all(&db)
                .await?
        }
        None => {
            sqlx::query_as::<_, Property>("SELECT * FROM properties ORDER BY name")
                .fetch_all(&db)
                .await?
        }
    };

    Ok(Json(properties))
}

pub async fn get_property(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(property_id): Path<Uuid>,
) -> ApiResult<Json<Property>> {
    get_current_user(&headers, &db).await?;

    sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = $1")
        .bind(property_id)
        .fetch_optional(&db)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Property not found".to_string()))
}

pub async fn create_property(
    State(db): State<Database>,
    headers: HeaderMap,
    Json(payload): Json<CreateProperty>,
) -> ApiResult<Json<Property>> {
    let current = get_current_user(&headers, &db).await?;
    require_admin(&current)?;
    payload.validate().map_err(ApiError::Validation)?;

    let property = sqlx::query_as::<_, Property>(
        r#"
        INSERT INTO properties (id, name, address, city, total_rooms)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.name.trim())
    .bind(&payload.address)
    .bind(&payload.city)
    .bind(payload.total_rooms)
    .fetch_one(&db)
    .await?;

    Ok(Json(property))
}

pub async fn update_property(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(property_id): Path<Uuid>,
    Json(payload): Json<CreateProperty>,
) -> ApiResult<Json<Property>> {
    let current = get_current_user(&headers, &db).await?;
    require_admin(&current)?;
    payload.validate().map_err(ApiError::Validation)?;

    sqlx::query_as::<_, Property>(
        r#"
        UPDATE properties
        SET name = $1, address = $2, city = $3, total_rooms = $4, updated_at = NOW()
        WHERE id = $5
        RETURNING *
        "#,
    )
    .bind(payload.name.trim())
    .bind(&payload.address)
    .bind(&payload.city)
    .bind(payload.total_rooms)
    .bind(property_id)
    .fetch_optional(&db)
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound("Property not found".to_string()))
}
