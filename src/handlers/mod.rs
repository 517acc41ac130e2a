pub mod auth;
pub mod banks;
pub mod bills;
pub mod bookings;
pub mod customers;
pub mod expenses;
pub mod properties;
pub mod revenues;
pub mod users;

use axum::{extract::State, http::HeaderMap, response::Json};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    database::Database,
    error::ApiResult,
    middleware::get_current_user,
    models::BookingStatus,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub proforma_bookings: i64,
    pub confirmed_bookings: i64,
    pub cancelled_bookings: i64,
    pub customer_count: i64,
    pub month_booking_revenue: Decimal,
    pub month_other_revenue: Decimal,
    pub month_expenses: Decimal,
}

/// Headline numbers for the landing dashboard. Aggregates fall back to zero
/// on a failed query so one broken tile does not blank the whole page.
pub async fn dashboard(
    State(db): State<Database>,
    headers: HeaderMap,
) -> ApiResult<Json<DashboardSummary>> {
    let current = get_current_user(&headers, &db).await?;
    let scope = current.property_scope();

    let summary = DashboardSummary {
        proforma_bookings: booking_count(&db, BookingStatus::Proforma, scope).await,
        confirmed_bookings: booking_count(&db, BookingStatus::Confirmed, scope).await,
        cancelled_bookings: booking_count(&db, BookingStatus::Cancelled, scope).await,
        // Customer masters are corporate clients shared across properties
        // (the table carries no property_id), so this count stays global even
        // for caretakers.
        customer_count: sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM customer_masters")
            .fetch_one(&db)
            .await
            .unwrap_or(0),
        month_booking_revenue: month_sum(
            &db,
            "SELECT COALESCE(SUM(total_amount), 0) FROM bookings \
             WHERE booking_status = 'CONFIRMED' AND updated_at >= date_trunc('month', NOW())",
            scope,
        )
        .await,
        month_other_revenue: month_sum(
            &db,
            "SELECT COALESCE(SUM(amount), 0) FROM property_revenues \
             WHERE revenue_date >= date_trunc('month', NOW())::date",
            scope,
        )
        .await,
        month_expenses: month_sum(
            &db,
            "SELECT COALESCE(SUM(amount), 0) FROM expenses \
             WHERE expense_date >= date_trunc('month', NOW())::date",
            scope,
        )
        .await,
    };

    Ok(Json(summary))
}

async fn booking_count(db: &Database, status: BookingStatus, scope: Option<Uuid>) -> i64 {
    let result = match scope {
        Some(property_id) => {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM bookings WHERE booking_status = $1 AND property_id = $2",
            )
            .bind(status)
            .bind(property_id)
            .fetch_one(db)
            .await
        }
        None => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bookings WHERE booking_status = $1")
                .bind(status)
                .fetch_one(db)
                .await
        }
    };
    result.unwrap_or(0)
}

async fn month_sum(db: &Database, base_sql: &str, scope: Option<Uuid>) -> Decimal {
    let result = match scope {
        Some(property_id) => {
            let sql = format!("{base_sql} AND property_id = $1");
            sqlx::query_scalar::<_, Decimal>(&sql)
                .bind(property_id)
                .fetch_one(db)
                .await
        }
        None => sqlx::query_scalar::<_, Decimal>(base_sql).fetch_one(db).await,
    };
    result.unwrap_or(Decimal::ZERO)
}
