use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Corporate client master record; prefills the corporate booking form.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CustomerMaster {
    pub id: Uuid,
    pub company_name: String,
    pub gstin: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerMaster {
    pub company_name: String,
    pub gstin: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
}

impl CreateCustomerMaster {
    pub fn validate(&self) -> Result<(), String> {
        if self.company_name.trim().is_empty() {
            return Err("Company name is required".to_string());
        }
        Ok(())
    }
}
