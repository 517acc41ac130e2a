use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub total_rooms: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProperty {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub total_rooms: i32,
}

impl CreateProperty {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Property name is required".to_string());
        }
        if self.total_rooms < 1 {
            return Err("A property needs at least one room".to_string());
        }
        Ok(())
    }
}
