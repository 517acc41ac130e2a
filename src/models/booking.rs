use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingType {
    Personal,
    Corporate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "occupancy_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OccupancyType {
    Single,
    Double,
    Triple,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "billing_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingType {
    Gst,
    NonGst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Proforma,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_mode", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMode {
    Cash,
    Upi,
    Card,
    BankTransfer,
    Cheque,
}

impl std::str::FromStr for PaymentMode {
    type Err = String;

    // Multipart form fields arrive as text, matching the wire spelling
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CASH" => Ok(PaymentMode::Cash),
            "UPI" => Ok(PaymentMode::Upi),
            "CARD" => Ok(PaymentMode::Card),
            "BANK_TRANSFER" => Ok(PaymentMode::BankTransfer),
            "CHEQUE" => Ok(PaymentMode::Cheque),
            other => Err(format!("Unknown payment mode: {other}")),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub booking_number: String,
    pub booking_type: BookingType,
    pub property_id: Uuid,
    pub customer_master_id: Option<Uuid>,
    pub guest_name: String,
    pub guest_phone: Option<String>,
    pub guest_email: Option<String>,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub number_of_rooms: i32,
    pub occupancy_type: OccupancyType,
    pub custom_occupancy: Option<String>,
    pub booking_amount: Decimal,
    pub advance_amount: Decimal,
    pub remaining_amount: Decimal,
    pub billing_type: BillingType,
    pub accept_food_gst: bool,
    pub stay_gst_amount: Decimal,
    pub food_gst_amount: Decimal,
    pub total_gst_amount: Decimal,
    pub total_amount: Decimal,
    pub booking_status: BookingStatus,
    pub refund_amount: Option<Decimal>,
    pub bank_account_id: Option<Uuid>,
    pub payment_mode: PaymentMode,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Derived money fields. GST stays at 12% on the stay and 5% on food; the
/// rates are statutory, not configurable. Amounts carry whatever scale the
/// multiplication produces, there is no rounding step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Financials {
    pub stay_gst_amount: Decimal,
    pub food_gst_amount: Decimal,
    pub total_gst_amount: Decimal,
    pub total_amount: Decimal,
    pub remaining_amount: Decimal,
}

fn stay_gst_rate() -> Decimal {
    Decimal::new(12, 2) // 0.12
}

fn food_gst_rate() -> Decimal {
    Decimal::new(5, 2) // 0.05
}

impl Financials {
    pub fn compute(
        booking_amount: Decimal,
        billing_type: BillingType,
        accept_food_gst: bool,
        advance_amount: Decimal,
    ) -> Self {
        let (stay_gst, food_gst) = match billing_type {
            BillingType::Gst => {
                let stay = booking_amount * stay_gst_rate();
                let food = if accept_food_gst {
                    booking_amount * food_gst_rate()
                } else {
                    Decimal::ZERO
                };
                (stay, food)
            }
            BillingType::NonGst => (Decimal::ZERO, Decimal::ZERO),
        };

        let total = booking_amount + stay_gst + food_gst;

        Self {
            stay_gst_amount: stay_gst,
            food_gst_amount: food_gst,
            total_gst_amount: stay_gst + food_gst,
            total_amount: total,
            remaining_amount: total - advance_amount,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BookingActionError {
    #[error("Remaining amount cannot be negative")]
    NegativeRemaining,
    #[error("Remaining amount cannot exceed the booking amount")]
    RemainingTooLarge,
    #[error("Refund amount cannot be negative")]
    NegativeRefund,
    #[error("Only a proforma booking can be confirmed")]
    NotProforma,
    #[error("Booking is already cancelled")]
    AlreadyCancelled,
}

impl From<BookingActionError> for ApiError {
    fn from(err: BookingActionError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

impl Booking {
    /// Proforma → Confirmed. The caller supplies the remaining amount shown
    /// on the confirmation form; it is validated against the booking amount,
    /// then the stored state follows the confirmation invariant: the full
    /// booking amount counts as received, nothing remains.
    pub fn confirm(&mut self, remaining_amount: Decimal) -> Result<(), BookingActionError> {
        if self.booking_status != BookingStatus::Proforma {
            return Err(BookingActionError::NotProforma);
        }
        if remaining_amount < Decimal::ZERO {
            return Err(BookingActionError::NegativeRemaining);
        }
        if remaining_amount > self.booking_amount {
            return Err(BookingActionError::RemainingTooLarge);
        }

        self.booking_status = BookingStatus::Confirmed;
        self.advance_amount = self.booking_amount;
        self.remaining_amount = Decimal::ZERO;
        Ok(())
    }

    /// Proforma or Confirmed → Cancelled. Only a negative refund is rejected
    /// here; a refund above the booking amount is legal as far as this rule
    /// is concerned (the handler logs it, see handlers::bookings).
    pub fn cancel(&mut self, refund_amount: Decimal) -> Result<(), BookingActionError> {
        if self.booking_status == BookingStatus::Cancelled {
            return Err(BookingActionError::AlreadyCancelled);
        }
        if refund_amount < Decimal::ZERO {
            return Err(BookingActionError::NegativeRefund);
        }

        self.booking_status = BookingStatus::Cancelled;
        self.refund_amount = Some(refund_amount);
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBooking {
    pub booking_type: BookingType,
    pub property_id: Uuid,
    pub customer_master_id: Option<Uuid>,
    pub guest_name: String,
    pub guest_phone: Option<String>,
    pub guest_email: Option<String>,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub number_of_rooms: i32,
    pub occupancy_type: OccupancyType,
    pub custom_occupancy: Option<String>,
    pub booking_amount: Decimal,
    pub advance_amount: Decimal,
    pub billing_type: BillingType,
    pub accept_food_gst: bool,
    pub bank_account_id: Option<Uuid>,
    pub payment_mode: PaymentMode,
}

impl CreateBooking {
    /// Field validation for the two conditional shapes (corporate booking,
    /// custom occupancy) plus the basic amount/date sanity rules. Rejects
    /// stray fields as firmly as missing ones so each booking type has
    /// exactly one field set.
    pub fn validate(&self) -> Result<(), String> {
        if self.guest_name.trim().is_empty() {
            return Err("Guest name is required".to_string());
        }
        if self.number_of_rooms < 1 {
            return Err("At least one room is required".to_string());
        }
        if self.check_out_date <= self.check_in_date {
            return Err("Check-out date must be after check-in date".to_string());
        }
        if self.booking_amount < Decimal::ZERO {
            return Err("Booking amount cannot be negative".to_string());
        }
        if self.advance_amount < Decimal::ZERO {
            return Err("Advance amount cannot be negative".to_string());
        }

        match (self.booking_type, self.customer_master_id) {
            (BookingType::Corporate, None) => {
                return Err("A corporate booking requires a customer master".to_string());
            }
            (BookingType::Personal, Some(_)) => {
                return Err("A personal booking cannot reference a customer master".to_string());
            }
            _ => {}
        }

        match (self.occupancy_type, self.custom_occupancy.as_deref()) {
            (OccupancyType::Custom, None) | (OccupancyType::Custom, Some("")) => {
                return Err("Custom occupancy requires a description".to_string());
            }
            (OccupancyType::Custom, Some(_)) => {}
            (_, Some(_)) => {
                return Err("Custom occupancy is only valid for the CUSTOM type".to_string());
            }
            (_, None) => {}
        }

        let financials = Financials::compute(
            self.booking_amount,
            self.billing_type,
            self.accept_food_gst,
            self.advance_amount,
        );
        if self.advance_amount > financials.total_amount {
            return Err("Advance amount cannot exceed the total amount".to_string());
        }

        Ok(())
    }

    pub fn financials(&self) -> Financials {
        Financials::compute(
            self.booking_amount,
            self.billing_type,
            self.accept_food_gst,
            self.advance_amount,
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmBooking {
    pub remaining_amount: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelBooking {
    pub refund_amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteBookings {
    pub ids: Vec<Uuid>,
}

/// Outcome of a bulk delete. Deletion is sequential and not transactional:
/// ids before a failure stay deleted, ids after it are untouched.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResult {
    pub deleted: Vec<Uuid>,
    pub failed: Option<Uuid>,
    pub skipped: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking(amount: Decimal, status: BookingStatus) -> Booking {
        let now = Utc::now();
        Booking {
            id: Uuid::new_v4(),
            booking_number: "BK-20250101-0001".to_string(),
            booking_type: BookingType::Personal,
            property_id: Uuid::new_v4(),
            customer_master_id: None,
            guest_name: "Ravi Kumar".to_string(),
            guest_phone: None,
            guest_email: None,
            check_in_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            check_out_date: NaiveDate::from_ymd_opt(2025, 1, 12).unwrap(),
            number_of_rooms: 1,
            occupancy_type: OccupancyType::Double,
            custom_occupancy: None,
            booking_amount: amount,
            advance_amount: Decimal::ZERO,
            remaining_amount: amount,
            billing_type: BillingType::NonGst,
            accept_food_gst: false,
            stay_gst_amount: Decimal::ZERO,
            food_gst_amount: Decimal::ZERO,
            total_gst_amount: Decimal::ZERO,
            total_amount: amount,
            booking_status: status,
            refund_amount: None,
            bank_account_id: None,
            payment_mode: PaymentMode::Cash,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn gst_without_food() {
        let f = Financials::compute(
            Decimal::from(1000),
            BillingType::Gst,
            false,
            Decimal::ZERO,
        );
        assert_eq!(f.stay_gst_amount, Decimal::from(120));
        assert_eq!(f.food_gst_amount, Decimal::ZERO);
        assert_eq!(f.total_gst_amount, Decimal::from(120));
        assert_eq!(f.total_amount, Decimal::from(1120));
    }

    #[test]
    fn gst_with_food() {
        let f = Financials::compute(
            Decimal::from(1000),
            BillingType::Gst,
            true,
            Decimal::ZERO,
        );
        assert_eq!(f.stay_gst_amount, Decimal::from(120));
        assert_eq!(f.food_gst_amount, Decimal::from(50));
        assert_eq!(f.total_amount, Decimal::from(1170));
    }

    #[test]
    fn gst_with_food_is_amount_times_one_point_one_seven() {
        for amount in [0i64, 1, 999, 2500, 123_456] {
            let amount = Decimal::from(amount);
            let f = Financials::compute(amount, BillingType::Gst, true, Decimal::ZERO);
            assert_eq!(f.total_amount, amount * Decimal::new(117, 2));
        }
    }

    #[test]
    fn non_gst_has_no_tax() {
        let f = Financials::compute(
            Decimal::from(1000),
            BillingType::NonGst,
            true, // food flag is ignored outside GST billing
            Decimal::from(400),
        );
        assert_eq!(f.stay_gst_amount, Decimal::ZERO);
        assert_eq!(f.food_gst_amount, Decimal::ZERO);
        assert_eq!(f.total_amount, Decimal::from(1000));
        assert_eq!(f.remaining_amount, Decimal::from(600));
    }

    #[test]
    fn remaining_subtracts_advance_from_total() {
        let f = Financials::compute(
            Decimal::from(1000),
            BillingType::Gst,
            false,
            Decimal::from(500),
        );
        assert_eq!(f.remaining_amount, Decimal::from(620));
    }

    #[test]
    fn confirm_forces_full_advance_and_zero_remaining() {
        let mut b = booking(Decimal::from(1000), BookingStatus::Proforma);
        b.confirm(Decimal::from(300)).unwrap();
        assert_eq!(b.booking_status, BookingStatus::Confirmed);
        assert_eq!(b.advance_amount, Decimal::from(1000));
        assert_eq!(b.remaining_amount, Decimal::ZERO);
    }

    #[test]
    fn confirm_rejects_out_of_range_remaining() {
        let mut b = booking(Decimal::from(1000), BookingStatus::Proforma);
        assert_eq!(
            b.confirm(Decimal::from(-1)),
            Err(BookingActionError::NegativeRemaining)
        );
        assert_eq!(
            b.confirm(Decimal::from(1001)),
            Err(BookingActionError::RemainingTooLarge)
        );
        assert_eq!(b.booking_status, BookingStatus::Proforma);
    }

    #[test]
    fn confirm_requires_proforma() {
        let mut b = booking(Decimal::from(1000), BookingStatus::Confirmed);
        assert_eq!(
            b.confirm(Decimal::ZERO),
            Err(BookingActionError::NotProforma)
        );

        let mut b = booking(Decimal::from(1000), BookingStatus::Cancelled);
        assert_eq!(
            b.confirm(Decimal::ZERO),
            Err(BookingActionError::NotProforma)
        );
    }

    #[test]
    fn cancel_rejects_negative_refund_before_any_state_change() {
        let mut b = booking(Decimal::from(1000), BookingStatus::Proforma);
        assert_eq!(
            b.cancel(Decimal::from(-50)),
            Err(BookingActionError::NegativeRefund)
        );
        assert_eq!(b.booking_status, BookingStatus::Proforma);
        assert_eq!(b.refund_amount, None);
    }

    #[test]
    fn cancel_allows_refund_above_booking_amount() {
        // Deliberate: the refund cap is not enforced at this level, matching
        // the looser of the two validation paths in production use.
        let mut b = booking(Decimal::from(1000), BookingStatus::Confirmed);
        b.cancel(Decimal::from(1500)).unwrap();
        assert_eq!(b.booking_status, BookingStatus::Cancelled);
        assert_eq!(b.refund_amount, Some(Decimal::from(1500)));
    }

    #[test]
    fn cancel_is_terminal() {
        let mut b = booking(Decimal::from(1000), BookingStatus::Proforma);
        b.cancel(Decimal::ZERO).unwrap();
        assert_eq!(
            b.cancel(Decimal::ZERO),
            Err(BookingActionError::AlreadyCancelled)
        );
    }

    fn create_payload() -> CreateBooking {
        CreateBooking {
            booking_type: BookingType::Personal,
            property_id: Uuid::new_v4(),
            customer_master_id: None,
            guest_name: "Ravi Kumar".to_string(),
            guest_phone: Some("9876543210".to_string()),
            guest_email: None,
            check_in_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            check_out_date: NaiveDate::from_ymd_opt(2025, 1, 12).unwrap(),
            number_of_rooms: 2,
            occupancy_type: OccupancyType::Double,
            custom_occupancy: None,
            booking_amount: Decimal::from(5000),
            advance_amount: Decimal::from(1000),
            billing_type: BillingType::Gst,
            accept_food_gst: false,
            bank_account_id: None,
            payment_mode: PaymentMode::Upi,
        }
    }

    #[test]
    fn valid_payload_passes() {
        assert!(create_payload().validate().is_ok());
    }

    #[test]
    fn corporate_booking_requires_customer_master() {
        let mut p = create_payload();
        p.booking_type = BookingType::Corporate;
        assert!(p.validate().is_err());

        p.customer_master_id = Some(Uuid::new_v4());
        assert!(p.validate().is_ok());
    }

    #[test]
    fn personal_booking_rejects_customer_master() {
        let mut p = create_payload();
        p.customer_master_id = Some(Uuid::new_v4());
        assert!(p.validate().is_err());
    }

    #[test]
    fn custom_occupancy_field_is_iff_custom_type() {
        let mut p = create_payload();
        p.occupancy_type = OccupancyType::Custom;
        assert!(p.validate().is_err());

        p.custom_occupancy = Some("3 adults, 2 children".to_string());
        assert!(p.validate().is_ok());

        p.occupancy_type = OccupancyType::Triple;
        assert!(p.validate().is_err());
    }

    #[test]
    fn dates_must_be_ordered() {
        let mut p = create_payload();
        p.check_out_date = p.check_in_date;
        assert!(p.validate().is_err());
    }

    #[test]
    fn advance_cannot_exceed_total() {
        let mut p = create_payload();
        p.billing_type = BillingType::NonGst;
        p.advance_amount = Decimal::from(5001);
        assert!(p.validate().is_err());

        // With GST the total is higher, so the same advance is fine
        p.billing_type = BillingType::Gst;
        assert!(p.validate().is_ok());
    }
}
