use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    database::Database,
    error::{ApiError, ApiResult},
    middleware::get_current_user,
    models::{Bill, Booking},
};

/// Creates the bill for a booking, or returns the existing one unchanged.
/// There is no status precondition: a proforma booking can be invoiced, and
/// regenerating never produces a second bill.
pub async fn generate_bill(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<Json<Bill>> {
    let current = get_current_user(&headers, &db).await?;

    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
        .bind(booking_id)
        .fetch_optional(&db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Booking not found".to_string()))?;

    if let Some(existing) = fetch_bill(&db, booking_id).await? {
        return Ok(Json(existing));
    }

    let bill = sqlx::query_as::<_, Bill>(
        r#"
        INSERT INTO bills
            (id, bill_number, booking_id, billing_type, booking_amount,
             stay_gst_amount, food_gst_amount, total_gst_amount, total_amount,
             generated_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (booking_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(next_bill_number())
    .bind(booking.id)
    .bind(booking.billing_type)
    .bind(booking.booking_amount)
    .bind(booking.stay_gst_amount)
    .bind(booking.food_gst_amount)
    .bind(booking.total_gst_amount)
    .bind(booking.total_amount)
    .bind(current.id)
    .fetch_optional(&db)
    .await?;

    match bill {
        Some(bill) => Ok(Json(bill)),
        // Lost a race with a concurrent generate; the winner's bill is the
        // bill for this booking.
        None => {
            let existing = fetch_bill(&db, booking_id).await?.ok_or_else(|| {
                ApiError::Internal("bill insert conflicted but no bill exists".to_string())
            })?;
            Ok(Json(existing))
        }
    }
}

pub async fn get_bill_by_booking(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<Json<Bill>> {
    get_current_user(&headers, &db).await?;

    fetch_bill(&db, booking_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No bill generated for this booking".to_string()))
}

async fn fetch_bill(db: &Database, booking_id: Uuid) -> ApiResult<Option<Bill>> {
    let bill = sqlx::query_as::<_, Bill>("SELECT * FROM bills WHERE booking_id = $1")
        .bind(booking_id)
        .fetch_optional(db)
        .await?;
    Ok(bill)
}

fn next_bill_number() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "INV-{}-{}",
        Utc::now().format("%Y%m%d"),
        suffix[..6].to_uppercase()
    )
}
