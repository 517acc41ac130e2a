use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::PaymentMode;

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub property_id: Uuid,
    pub category: String,
    pub amount: Decimal,
    pub description: Option<String>,
    pub expense_date: NaiveDate,
    pub payment_mode: PaymentMode,
    pub bank_account_id: Option<Uuid>,
    pub receipt_url: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Assembled from the multipart form; the receipt file travels in the same
/// request as its own part.
#[derive(Debug, Default)]
pub struct ExpenseForm {
    pub property_id: Option<Uuid>,
    pub category: Option<String>,
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub expense_date: Option<NaiveDate>,
    pub payment_mode: Option<PaymentMode>,
    pub bank_account_id: Option<Uuid>,
}

impl ExpenseForm {
    /// Presence and sanity checks shared by the create and update paths, so
    /// an expense cannot be edited into a shape the form would never submit.
    pub fn require_complete(
        &self,
    ) -> Result<(Uuid, String, Decimal, NaiveDate, PaymentMode), String> {
        let property_id = self
            .property_id
            .ok_or_else(|| "Property is required".to_string())?;
        let category = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| "Category is required".to_string())?
            .to_string();
        let amount = self
            .amount
            .ok_or_else(|| "Amount is required".to_string())?;
        let expense_date = self
            .expense_date
            .ok_or_else(|| "Expense date is required".to_string())?;
        let payment_mode = self
            .payment_mode
            .ok_or_else(|| "Payment mode is required".to_string())?;

        if amount < Decimal::ZERO {
            return Err("Expense amount cannot be negative".to_string());
        }

        Ok((property_id, category, amount, expense_date, payment_mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_form() -> ExpenseForm {
        ExpenseForm {
            property_id: Some(Uuid::new_v4()),
            category: Some("Housekeeping".to_string()),
            amount: Some(Decimal::from(1200)),
            description: None,
            expense_date: NaiveDate::from_ymd_opt(2025, 3, 14),
            payment_mode: Some(PaymentMode::Cash),
            bank_account_id: None,
        }
    }

    #[test]
    fn complete_form_passes_and_trims_category() {
        let mut form = complete_form();
        form.category = Some("  Housekeeping ".to_string());
        let (_, category, amount, _, _) = form.require_complete().unwrap();
        assert_eq!(category, "Housekeeping");
        assert_eq!(amount, Decimal::from(1200));
    }

    #[test]
    fn negative_amount_is_rejected() {
        let mut form = complete_form();
        form.amount = Some(Decimal::from(-50));
        assert_eq!(
            form.require_complete(),
            Err("Expense amount cannot be negative".to_string())
        );
    }

    #[test]
    fn missing_or_blank_fields_are_rejected() {
        let mut form = complete_form();
        form.category = Some("   ".to_string());
        assert!(form.require_complete().is_err());

        let mut form = complete_form();
        form.payment_mode = None;
        assert!(form.require_complete().is_err());
    }
}
