use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::{
    database::Database,
    error::{ApiError, ApiResult},
    handlers::banks::record_transaction,
    middleware::{get_current_user, CurrentUser},
    models::{CreatePropertyRevenue, PropertyRevenue, TxnDirection},
    utils::{ListParams, Paginated},
};

const SORT_COLUMNS: &[&str] = &["revenue_date", "amount", "source", "created_at"];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueFilters {
    pub property_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

fn push_filters(
    qb: &mut QueryBuilder<'_, sqlx::Postgres>,
    filters: &RevenueFilters,
    params: &ListParams,
    current: &CurrentUser,
) {
    if let Some(scope) = current.property_scope() {
        qb.push(" AND property_id = ");
        qb.push_bind(scope);
    }
    if let Some(property_id) = filters.property_id {
        qb.push(" AND property_id = ");
        qb.push_bind(property_id);
    }
    if let Some(from) = filters.date_from {
        qb.push(" AND revenue_date >= ");
        qb.push_bind(from);
    }
    if let Some(to) = filters.date_to {
        qb.push(" AND revenue_date <= ");
        qb.push_bind(to);
    }
    if let Some(term) = params.search_term() {
        qb.push(" AND (source ILIKE ");
        qb.push_bind(term.clone());
        qb.push(" OR notes ILIKE ");
        qb.push_bind(term);
        qb.push(")");
    }
}

pub async fn list_revenues(
    State(db): State<Database>,
    headers: HeaderMap,
    Query(filters): Query<RevenueFilters>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Paginated<PropertyRevenue>>> {
    let current = get_current_user(&headers, &db).await?;

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM property_revenues WHERE 1=1");
    push_filters(&mut count_qb, &filters, &params, &current);
    let total: i64 = count_qb.build_query_scalar().fetch_one(&db).await?;

    let mut qb = QueryBuilder::new("SELECT * FROM property_revenues WHERE 1=1");
    push_filters(&mut qb, &filters, &params, &current);
    qb.push(format!(
        " ORDER BY {} {}",
        params.sort_column(SORT_COLUMNS),
        params.sort_dir().as_sql()
    ));
    qb.push(" LIMIT ");
    qb.push_bind(params.per_page());
    qb.push(" OFFSET ");
    qb.push_bind(params.offset());

    let revenues = qb.build_query_as::<PropertyRevenue>().fetch_all(&db).await?;

    Ok(Json(Paginated::new(revenues, total, &params)))
}

pub async fn create_revenue(
    State(db): State<Database>,
    headers: HeaderMap,
    Json(payload): Json<CreatePropertyRevenue>,
) -> ApiResult<Json<PropertyRevenue>> {
    let current = get_current_user(&headers, &db).await?;
    payload.validate().map_err(ApiError::Validation)?;
    current.check_property_access(payload.property_id)?;

    let revenue = sqlx::query_as::<_, PropertyRevenue>(
        r#"
        INSERT INTO property_revenues
            (id, property_id, revenue_date, source, amount, notes, bank_account_id, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.property_id)
    .bind(payload.revenue_date)
    .bind(payload.source.trim())
    .bind(payload.amount)
    .bind(&payload.notes)
    .bind(payload.bank_account_id)
    .bind(current.id)
    .fetch_one(&db)
    .await?;

    if let Some(account_id) = revenue.bank_account_id {
        record_transaction(
            &db,
            account_id,
            TxnDirection::Credit,
            revenue.amount,
            Some(format!("revenue:{}", revenue.id)),
            Some(revenue.source.clone()),
            revenue.revenue_date,
        )
        .await?;
    }

    Ok(Json(revenue))
}

pub async fn update_revenue(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(revenue_id): Path<Uuid>,
    Json(payload): Json<CreatePropertyRevenue>,
) -> ApiResult<Json<PropertyRevenue>> {
    let current = get_current_user(&headers, &db).await?;
    payload.validate().map_err(ApiError::Validation)?;
    current.check_property_access(payload.property_id)?;
    fetch_revenue(&db, revenue_id, &current).await?;

    let revenue = sqlx::query_as::<_, PropertyRevenue>(
        r#"
        UPDATE property_revenues SET
            property_id = $1, revenue_date = $2, source = $3, amount = $4,
            notes = $5, bank_account_id = $6, updated_at = NOW()
        WHERE id = $7
        RETURNING *
        "#,
    )
    .bind(payload.property_id)
    .bind(payload.revenue_date)
    .bind(payload.source.trim())
    .bind(payload.amount)
    .bind(&payload.notes)
    .bind(payload.bank_account_id)
    .bind(revenue_id)
    .fetch_one(&db)
    .await?;

    Ok(Json(revenue))
}

pub async fn delete_revenue(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(revenue_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let current = get_current_user(&headers, &db).await?;
    fetch_revenue(&db, revenue_id, &current).await?;

    sqlx::query("DELETE FROM property_revenues WHERE id = $1")
        .bind(revenue_id)
        .execute(&db)
        .await?;

    Ok(Json(serde_json::json!({ "deleted": revenue_id })))
}

async fn fetch_revenue(
    db: &Database,
    revenue_id: Uuid,
    current: &CurrentUser,
) -> ApiResult<PropertyRevenue> {
    let revenue =
        sqlx::query_as::<_, PropertyRevenue>("SELECT * FROM property_revenues WHERE id = $1")
            .bind(revenue_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Revenue entry not found".to_string()))?;

    if let Some(scope) = current.property_scope() {
        if revenue.property_id != scope {
            return Err(ApiError::NotFound("Revenue entry not found".to_string()));
        }
    }

    Ok(revenue)
}
