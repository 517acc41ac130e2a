use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::env;
use uuid::Uuid;

use crate::models::AccountType;

/// Claims embedded in the access token. The SPA decodes (without verifying)
/// `sub`, `property_id` and `account_type` to drive its UI, so these three
/// must always be present and stable.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub email: String,
    pub property_id: Option<Uuid>,
    pub account_type: AccountType,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(
        user_id: Uuid,
        email: String,
        property_id: Option<Uuid>,
        account_type: AccountType,
    ) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(24);

        Self {
            sub: user_id.to_string(),
            email,
            property_id,
            account_type,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }
}

pub fn create_token(
    user_id: Uuid,
    email: String,
    property_id: Option<Uuid>,
    account_type: AccountType,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims::new(user_id, email, property_id, account_type);
    let secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
}

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    bcrypt::verify(password, hash)
}

pub fn verify_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_preserves_identity() {
        env::set_var("JWT_SECRET", "test-secret");

        let user_id = Uuid::new_v4();
        let property_id = Uuid::new_v4();
        let token = create_token(
            user_id,
            "owner@example.com".to_string(),
            Some(property_id),
            AccountType::Admin,
        )
        .unwrap();

        let claims = verify_token(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "owner@example.com");
        assert_eq!(claims.property_id, Some(property_id));
        assert_eq!(claims.account_type, AccountType::Admin);
    }

    #[test]
    fn tampered_token_is_rejected() {
        env::set_var("JWT_SECRET", "test-secret");

        let token = create_token(
            Uuid::new_v4(),
            "owner@example.com".to_string(),
            None,
            AccountType::Caretaker,
        )
        .unwrap();

        let mut tampered = token;
        tampered.pop();
        assert!(verify_token(&tampered).is_err());
    }
}
