use axum::http::{header, HeaderMap};
use uuid::Uuid;

use crate::{
    database::Database,
    error::ApiError,
    models::{AccountType, User},
    utils::verify_token,
};

#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub account_type: AccountType,
    pub property_id: Option<Uuid>,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.account_type == AccountType::Admin
    }

    /// Property a caretaker is allowed to see; None means unrestricted.
    pub fn property_scope(&self) -> Option<Uuid> {
        match self.account_type {
            AccountType::Admin => None,
            AccountType::Caretaker => self.property_id,
        }
    }

    /// Write-side counterpart of `property_scope`: a caretaker may only
    /// create or edit records on its own property, otherwise it would write
    /// rows it can never read back.
    pub fn check_property_access(&self, property_id: Uuid) -> Result<(), ApiError> {
        match self.property_scope() {
            Some(scope) if scope != property_id => Err(ApiError::Forbidden(
                "You cannot manage records for another property".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Resolves the caller from the bearer token. The token only proves identity;
/// the account row is re-read so deactivation and locking take effect on the
/// next request rather than at token expiry.
pub async fn get_current_user(
    headers: &HeaderMap,
    db: &Database,
) -> Result<CurrentUser, ApiError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Malformed authorization header".to_string()))?;

    let claims = verify_token(token)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| ApiError::Unauthorized("Invalid token subject".to_string()))?;

    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE id = $1 AND is_active = true AND is_locked = false",
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| ApiError::Unauthorized("Account is not available".to_string()))?;

    Ok(CurrentUser {
        id: user.id,
        email: user.email,
        full_name: user.full_name,
        account_type: user.account_type,
        property_id: user.property_id,
    })
}

pub fn require_admin(user: &CurrentUser) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Administrator access required".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(account_type: AccountType, property_id: Option<Uuid>) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: "caretaker@example.com".to_string(),
            full_name: "Asha Verma".to_string(),
            account_type,
            property_id,
        }
    }

    #[test]
    fn admin_can_write_to_any_property() {
        let admin = user(AccountType::Admin, None);
        assert!(admin.check_property_access(Uuid::new_v4()).is_ok());
    }

    #[test]
    fn caretaker_can_only_write_to_own_property() {
        let own = Uuid::new_v4();
        let caretaker = user(AccountType::Caretaker, Some(own));

        assert!(caretaker.check_property_access(own).is_ok());
        assert!(caretaker.check_property_access(Uuid::new_v4()).is_err());
    }
}
