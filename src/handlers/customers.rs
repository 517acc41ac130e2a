use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Json,
};
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::{
    database::Database,
    error::{ApiError, ApiResult},
    middleware::get_current_user,
    models::{CreateCustomerMaster, CustomerMaster},
    utils::{ListParams, Paginated},
};

const SORT_COLUMNS: &[&str] = &["company_name", "city", "created_at"];

pub async fn list_customers(
    State(db): State<Database>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Paginated<CustomerMaster>>> {
    get_current_user(&headers, &db).await?;

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM customer_masters WHERE 1=1");
    push_search(&mut count_qb, &params);
    let total: i64 = count_qb.build_query_scalar().fetch_one(&db).await?;

    let mut qb = QueryBuilder::new("SELECT * FROM customer_masters WHERE 1=1");
    push_search(&mut qb, &params);
    qb.push(format!(
        " ORDER BY {} {}",
        params.sort_column(SORT_COLUMNS),
        params.sort_dir().as_sql()
    ));
    qb.push(" LIMIT ");
    qb.push_bind(params.per_page());
    qb.push(" OFFSET ");
    qb.push_bind(params.offset());

    let customers = qb.build_query_as::<CustomerMaster>().fetch_all(&db).await?;

    Ok(Json(Paginated::new(customers, total, &params)))
}

fn push_search(qb: &mut QueryBuilder<'_, sqlx::Postgres>, params: &ListParams) {
    if let Some(term) = params.search_term() {
        qb.push(" AND (company_name ILIKE ");
        qb.push_bind(term.clone());
        qb.push(" OR contact_person ILIKE ");
        qb.push_bind(term.clone());
        qb.push(" OR gstin ILIKE ");
        qb.push_bind(term);
        qb.push(")");
    }
}

pub async fn get_customer(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(customer_id): Path<Uuid>,
) -> ApiResult<Json<CustomerMaster>> {
    get_current_user(&headers, &db).await?;
    fetch_customer(&db, customer_id).await.map(Json)
}

pub async fn create_customer(
    State(db): State<Database>,
    headers: HeaderMap,
    Json(payload): Json<CreateCustomerMaster>,
) -> ApiResult<Json<CustomerMaster>> {
    let current = get_current_user(&headers, &db).await?;
    payload.validate().map_err(ApiError::Validation)?;

    let customer = sqlx::query_as::<_, CustomerMaster>(
        r#"
        INSERT INTO customer_masters
            (id, company_name, gstin, contact_person, phone, email, address, city, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.company_name.trim())
    .bind(&payload.gstin)
    .bind(&payload.contact_person)
    .bind(&payload.phone)
    .bind(&payload.email)
    .bind(&payload.address)
    .bind(&payload.city)
    .bind(current.id)
    .fetch_one(&db)
    .await?;

    Ok(Json(customer))
}

pub async fn update_customer(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(customer_id): Path<Uuid>,
    Json(payload): Json<CreateCustomerMaster>,
) -> ApiResult<Json<CustomerMaster>> {
    get_current_user(&headers, &db).await?;
    payload.validate().map_err(ApiError::Validation)?;
    fetch_customer(&db, customer_id).await?;

    let customer = sqlx::query_as::<_, CustomerMaster>(
        r#"
        UPDATE customer_masters SET
            company_name = $1, gstin = $2, contact_person = $3, phone = $4,
            email = $5, address = $6, city = $7, updated_at = NOW()
        WHERE id = $8
        RETURNING *
        "#,
    )
    .bind(payload.company_name.trim())
    .bind(&payload.gstin)
    .bind(&payload.contact_person)
    .bind(&payload.phone)
    .bind(&payload.email)
    .bind(&payload.address)
    .bind(&payload.city)
    .bind(customer_id)
    .fetch_one(&db)
    .await?;

    Ok(Json(customer))
}

pub async fn delete_customer(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(customer_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    get_current_user(&headers, &db).await?;
    fetch_customer(&db, customer_id).await?;

    // Corporate bookings keep their history; only an unreferenced master can go
    let referenced: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM bookings WHERE customer_master_id = $1 LIMIT 1")
            .bind(customer_id)
            .fetch_optional(&db)
            .await?;
    if referenced.is_some() {
        return Err(ApiError::Conflict(
            "Customer master is referenced by bookings and cannot be deleted".to_string(),
        ));
    }

    sqlx::query("DELETE FROM customer_masters WHERE id = $1")
        .bind(customer_id)
        .execute(&db)
        .await?;

    Ok(Json(serde_json::json!({ "deleted": customer_id })))
}

async fn fetch_customer(db: &Database, customer_id: Uuid) -> ApiResult<CustomerMaster> {
    sqlx::query_as::<_, CustomerMaster>("SELECT * FROM customer_masters WHERE id = $1")
        .bind(customer_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Customer master not found".to_string()))
}
