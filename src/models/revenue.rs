use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Revenue entry recorded against a property, outside the booking flow
/// (hall hire, laundry, walk-in food sales and the like).
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRevenue {
    pub id: Uuid,
    pub property_id: Uuid,
    pub revenue_date: NaiveDate,
    pub source: String,
    pub amount: Decimal,
    pub notes: Option<String>,
    pub bank_account_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePropertyRevenue {
    pub property_id: Uuid,
    pub revenue_date: NaiveDate,
    pub source: String,
    pub amount: Decimal,
    pub notes: Option<String>,
    pub bank_account_id: Option<Uuid>,
}

impl CreatePropertyRevenue {
    pub fn validate(&self) -> Result<(), String> {
        if self.source.trim().is_empty() {
            return Err("Revenue source is required".to_string());
        }
        if self.amount < Decimal::ZERO {
            return Err("Revenue amount cannot be negative".to_string());
        }
        Ok(())
    }
}
