use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::{
    database::Database,
    error::{ApiError, ApiResult},
    handlers::banks::record_transaction,
    middleware::{get_current_user, CurrentUser},
    models::{
        Booking, BookingStatus, BookingType, BulkDeleteBookings, BulkDeleteResult, CancelBooking,
        ConfirmBooking, CreateBooking, TxnDirection,
    },
    utils::{ListParams, Paginated},
};

const SORT_COLUMNS: &[&str] = &[
    "created_at",
    "check_in_date",
    "check_out_date",
    "booking_number",
    "guest_name",
    "total_amount",
    "booking_status",
];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingFilters {
    pub status: Option<BookingStatus>,
    pub booking_type: Option<BookingType>,
    pub property_id: Option<Uuid>,
}

fn push_filters(
    qb: &mut QueryBuilder<'_, sqlx::Postgres>,
    filters: &BookingFilters,
    params: &ListParams,
    current: &CurrentUser,
) {
    if let Some(scope) = current.property_scope() {
        qb.push(" AND property_id = ");
        qb.push_bind(scope);
    }
    if let Some(status) = filters.status {
        qb.push(" AND booking_status = ");
        qb.push_bind(status);
    }
    if let Some(booking_type) = filters.booking_type {
        qb.push(" AND booking_type = ");
        qb.push_bind(booking_type);
    }
    if let Some(property_id) = filters.property_id {
        qb.push(" AND property_id = ");
        qb.push_bind(property_id);
    }
    if let Some(term) = params.search_term() {
        qb.push(" AND (booking_number ILIKE ");
        qb.push_bind(term.clone());
        qb.push(" OR guest_name ILIKE ");
        qb.push_bind(term);
        qb.push(")");
    }
}

pub async fn list_bookings(
    State(db): State<Database>,
    headers: HeaderMap,
    Query(filters): Query<BookingFilters>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Paginated<Booking>>> {
    let current = get_current_user(&headers, &db).await?;

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM bookings WHERE 1=1");
    push_filters(&mut count_qb, &filters, &params, &current);
    let total: i64 = count_qb.build_query_scalar().fetch_one(&db).await?;

    let mut qb = QueryBuilder::new("SELECT * FROM bookings WHERE 1=1");
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

    let bookings = qb.build_query_as::<Booking>().fetch_all(&db).await?;

    Ok(Json(Paginated::new(bookings, total, &params)))
}

pub async fn get_booking(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<Json<Booking>> {
    let current = get_current_user(&headers, &db).await?;
    let booking = fetch_booking(&db, booking_id, &current).await?;
    Ok(Json(booking))
}

/// New bookings always start as PROFORMA; the derived money fields are
/// recomputed server-side from the raw inputs, whatever the form sent.
pub async fn create_booking(
    State(db): State<Database>,
    headers: HeaderMap,
    Json(payload): Json<CreateBooking>,
) -> ApiResult<Json<Booking>> {
    let current = get_current_user(&headers, &db).await?;
    payload.validate().map_err(ApiError::Validation)?;
    current.check_property_access(payload.property_id)?;
    check_references(&db, &payload).await?;

    let financials = payload.financials();
    let booking_number = next_booking_number();

    let booking = sqlx::query_as::<_, Booking>(
        r#"
        INSERT INTO bookings (
            id, booking_number, booking_type, property_id, customer_master_id,
            guest_name, guest_phone, guest_email, check_in_date, check_out_date,
            number_of_rooms, occupancy_type, custom_occupancy,
            booking_amount, advance_amount, remaining_amount,
            billing_type, accept_food_gst,
            stay_gst_amount, food_gst_amount, total_gst_amount, total_amount,
            booking_status, bank_account_id, payment_mode, created_by
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
            $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26
        )
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&booking_number)
    .bind(payload.booking_type)
    .bind(payload.property_id)
    .bind(payload.customer_master_id)
    .bind(payload.guest_name.trim())
    .bind(&payload.guest_phone)
    .bind(&payload.guest_email)
    .bind(payload.check_in_date)
    .bind(payload.check_out_date)
    .bind(payload.number_of_rooms)
    .bind(payload.occupancy_type)
    .bind(&payload.custom_occupancy)
    .bind(payload.booking_amount)
    .bind(payload.advance_amount)
    .bind(financials.remaining_amount)
    .bind(payload.billing_type)
    .bind(payload.accept_food_gst)
    .bind(financials.stay_gst_amount)
    .bind(financials.food_gst_amount)
    .bind(financials.total_gst_amount)
    .bind(financials.total_amount)
    .bind(BookingStatus::Proforma)
    .bind(payload.bank_account_id)
    .bind(payload.payment_mode)
    .bind(current.id)
    .fetch_one(&db)
    .await?;

    Ok(Json(booking))
}

pub async fn update_booking(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<CreateBooking>,
) -> ApiResult<Json<Booking>> {
    let current = get_current_user(&headers, &db).await?;
    let existing = fetch_booking(&db, booking_id, &current).await?;
    if existing.booking_status == BookingStatus::Cancelled {
        return Err(ApiError::Validation(
            "A cancelled booking cannot be edited".to_string(),
        ));
    }

    payload.validate().map_err(ApiError::Validation)?;
    current.check_property_access(payload.property_id)?;
    check_references(&db, &payload).await?;
    let financials = payload.financials();

    let booking = sqlx::query_as::<_, Booking>(
        r#"
        UPDATE bookings SET
            booking_type = $1, property_id = $2, customer_master_id = $3,
            guest_name = $4, guest_phone = $5, guest_email = $6,
            check_in_date = $7, check_out_date = $8, number_of_rooms = $9,
            occupancy_type = $10, custom_occupancy = $11,
            booking_amount = $12, advance_amount = $13, remaining_amount = $14,
            billing_type = $15, accept_food_gst = $16,
            stay_gst_amount = $17, food_gst_amount = $18,
            total_gst_amount = $19, total_amount = $20,
            bank_account_id = $21, payment_mode = $22, updated_at = NOW()
        WHERE id = $23
        RETURNING *
        "#,
    )
    .bind(payload.booking_type)
    .bind(payload.property_id)
    .bind(payload.customer_master_id)
    .bind(payload.guest_name.trim())
    .bind(&payload.guest_phone)
    .bind(&payload.guest_email)
    .bind(payload.check_in_date)
    .bind(payload.check_out_date)
    .bind(payload.number_of_rooms)
    .bind(payload.occupancy_type)
    .bind(&payload.custom_occupancy)
    .bind(payload.booking_amount)
    .bind(payload.advance_amount)
    .bind(financials.remaining_amount)
    .bind(payload.billing_type)
    .bind(payload.accept_food_gst)
    .bind(financials.stay_gst_amount)
    .bind(financials.food_gst_amount)
    .bind(financials.total_gst_amount)
    .bind(financials.total_amount)
    .bind(payload.bank_account_id)
    .bind(payload.payment_mode)
    .bind(booking_id)
    .fetch_one(&db)
    .await?;

    Ok(Json(booking))
}

pub async fn confirm_booking(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<ConfirmBooking>,
) -> ApiResult<Json<Booking>> {
    let current = get_current_user(&headers, &db).await?;
    let mut booking = fetch_booking(&db, booking_id, &current).await?;

    booking.confirm(payload.remaining_amount)?;

    let booking = sqlx::query_as::<_, Booking>(
        r#"
        UPDATE bookings
        SET booking_status = $1, advance_amount = $2, remaining_amount = $3, updated_at = NOW()
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(booking.booking_status)
    .bind(booking.advance_amount)
    .bind(booking.remaining_amount)
    .bind(booking.id)
    .fetch_one(&db)
    .await?;

    if let Some(account_id) = booking.bank_account_id {
        record_transaction(
            &db,
            account_id,
            TxnDirection::Credit,
            booking.booking_amount,
            Some(format!("booking:{}", booking.booking_number)),
            Some("Booking confirmed, amount received".to_string()),
            Utc::now().date_naive(),
        )
        .await?;
    }

    Ok(Json(booking))
}

pub async fn cancel_booking(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<CancelBooking>,
) -> ApiResult<Json<Booking>> {
    let current = get_current_user(&headers, &db).await?;
    let mut booking = fetch_booking(&db, booking_id, &current).await?;

    // The refund cap at the booking amount is advisory: over-refunds are
    // logged for the audit trail, not rejected.
    if payload.refund_amount > booking.booking_amount {
        log::warn!(
            "booking {}: refund {} exceeds booking amount {}",
            booking.booking_number,
            payload.refund_amount,
            booking.booking_amount
        );
    }

    booking.cancel(payload.refund_amount)?;

    let booking = sqlx::query_as::<_, Booking>(
        r#"
        UPDATE bookings
        SET booking_status = $1, refund_amount = $2, updated_at = NOW()
        WHERE id = $3
        RETURNING *
        "#,
    )
    .bind(booking.booking_status)
    .bind(booking.refund_amount)
    .bind(booking.id)
    .fetch_one(&db)
    .await?;

    if let (Some(account_id), Some(refund)) = (booking.bank_account_id, booking.refund_amount) {
        if refund > Decimal::ZERO {
            record_transaction(
                &db,
                account_id,
                TxnDirection::Debit,
                refund,
                Some(format!("booking:{}", booking.booking_number)),
                Some("Booking cancelled, refund paid".to_string()),
                Utc::now().date_naive(),
            )
            .await?;
        }
    }

    Ok(Json(booking))
}

pub async fn delete_booking(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let current = get_current_user(&headers, &db).await?;
    // 404 before delete so a caretaker cannot probe other properties
    fetch_booking(&db, booking_id, &current).await?;

    sqlx::query("DELETE FROM bookings WHERE id = $1")
        .bind(booking_id)
        .execute(&db)
        .await?;

    Ok(Json(serde_json::json!({ "deleted": booking_id })))
}

/// Deletes ids one by one in request order, outside any transaction. A
/// failure stops the loop: earlier deletions stand, later ids are reported
/// back as skipped. There is deliberately no rollback.
pub async fn bulk_delete_bookings(
    State(db): State<Database>,
    headers: HeaderMap,
    Json(payload): Json<BulkDeleteBookings>,
) -> ApiResult<Json<BulkDeleteResult>> {
    let current = get_current_user(&headers, &db).await?;

    let result = drive_bulk_delete(payload.ids, |id| {
        let db = db.clone();
        let current = current.clone();
        async move {
            fetch_booking(&db, id, &current).await.map_err(|_| ())?;
            sqlx::query("DELETE FROM bookings WHERE id = $1")
                .bind(id)
                .execute(&db)
                .await
                .map_err(|e| log::error!("bulk delete stopped at booking {id}: {e}"))?;
            Ok(())
        }
    })
    .await;

    Ok(Json(result))
}

/// Runs the deletions one by one in request order and stops at the first
/// failure: earlier ids stay deleted, the rest are reported back as skipped.
/// There is deliberately no rollback.
async fn drive_bulk_delete<F, Fut>(ids: Vec<Uuid>, mut delete_one: F) -> BulkDeleteResult
where
    F: FnMut(Uuid) -> Fut,
    Fut: std::future::Future<Output = Result<(), ()>>,
{
    let mut deleted = Vec::new();
    let mut failed = None;

    let mut ids = ids.into_iter();
    for id in ids.by_ref() {
        match delete_one(id).await {
            Ok(()) => deleted.push(id),
            Err(()) => {
                failed = Some(id);
                break;
            }
        }
    }

    BulkDeleteResult {
        deleted,
        failed,
        skipped: ids.collect(),
    }
}

async fn fetch_booking(
    db: &Database,
    booking_id: Uuid,
    current: &CurrentUser,
) -> ApiResult<Booking> {
    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
        .bind(booking_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Booking not found".to_string()))?;

    if let Some(scope) = current.property_scope() {
        if booking.property_id != scope {
            return Err(ApiError::NotFound("Booking not found".to_string()));
        }
    }

    Ok(booking)
}

async fn check_references(db: &Database, payload: &CreateBooking) -> ApiResult<()> {
    let property: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM properties WHERE id = $1")
        .bind(payload.property_id)
        .fetch_optional(db)
        .await?;
    if property.is_none() {
        return Err(ApiError::Validation("Unknown property".to_string()));
    }

    if let Some(customer_id) = payload.customer_master_id {
        let customer: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM customer_masters WHERE id = $1")
                .bind(customer_id)
                .fetch_optional(db)
                .await?;
        if customer.is_none() {
            return Err(ApiError::Validation("Unknown customer master".to_string()));
        }
    }

    if let Some(account_id) = payload.bank_account_id {
        let account: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM bank_accounts WHERE id = $1 AND is_active = true")
                .bind(account_id)
                .fetch_optional(db)
                .await?;
        if account.is_none() {
            return Err(ApiError::Validation("Unknown bank account".to_string()));
        }
    }

    Ok(())
}

fn next_booking_number() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "BK-{}-{}",
        Utc::now().format("%Y%m%d"),
        suffix[..6].to_uppercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bulk_delete_stops_at_first_failure_and_reports_the_rest() {
        let ids = vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let poison = ids[1];

        let result = drive_bulk_delete(ids.clone(), |id| async move {
            if id == poison {
                Err(())
            } else {
                Ok(())
            }
        })
        .await;

        assert_eq!(result.deleted, vec![ids[0]]);
        assert_eq!(result.failed, Some(ids[1]));
        assert_eq!(result.skipped, vec![ids[2]]);
    }

    #[tokio::test]
    async fn bulk_delete_with_no_failures_deletes_everything() {
        let ids = vec![Uuid::new_v4(), Uuid::new_v4()];

        let result = drive_bulk_delete(ids.clone(), |_| async { Ok(()) }).await;

        assert_eq!(result.deleted, ids);
        assert_eq!(result.failed, None);
        assert!(result.skipped.is_empty());
    }
}
