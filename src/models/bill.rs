use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::BillingType;

/// Invoice tied 1:1 to a booking. Amounts are a snapshot taken at generation
/// time, so later edits to the booking do not rewrite an issued bill.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: Uuid,
    pub bill_number: String,
    pub booking_id: Uuid,
    pub billing_type: BillingType,
    pub booking_amount: Decimal,
    pub stay_gst_amount: Decimal,
    pub food_gst_amount: Decimal,
    pub total_gst_amount: Decimal,
    pub total_amount: Decimal,
    pub generated_by: Option<Uuid>,
    pub generated_at: DateTime<Utc>,
}
