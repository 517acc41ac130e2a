use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    database::Database,
    error::{ApiError, ApiResult},
    middleware::{get_current_user, require_admin, CurrentUser},
    models::{BankAccount, BankTransaction, CreateBankAccount, TxnDirection},
};

pub async fn list_accounts(
    State(db): State<Database>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<BankAccount>>> {
    let current = get_current_user(&headers, &db).await?;

    let accounts = match current.property_scope() {
        Some(property_id) => {
            sqlx::query_as::<_, BankAccount>(
                "SELECT * FROM bank_accounts WHERE property_id = $1 ORDER BY account_name",
            )
            .bind(property_id)
            .fetch_all(&db)
            .await?
        }
        None => {
            sqlx::query_as::<_, BankAccount>("SELECT * FROM bank_accounts ORDER BY account_name")
                .fetch_all(&db)
                .await?
        }
    };

    Ok(Json(accounts))
}

pub async fn create_account(
    State(db): State<Database>,
    headers: HeaderMap,
    Json(payload): Json<CreateBankAccount>,
) -> ApiResult<Json<BankAccount>> {
    let current = get_current_user(&headers, &db).await?;
    require_admin(&current)?;
    payload.validate().map_err(ApiError::Validation)?;

    let account = sqlx::query_as::<_, BankAccount>(
        r#"
        INSERT INTO bank_accounts
            (id, property_id, account_name, bank_name, account_number,
             opening_balance, current_balance)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.property_id)
    .bind(payload.account_name.trim())
    .bind(payload.bank_name.trim())
    .bind(payload.account_number.trim())
    .bind(payload.opening_balance)
    .fetch_one(&db)
    .await?;

    Ok(Json(account))
}

pub async fn get_account(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(account_id): Path<Uuid>,
) -> ApiResult<Json<BankAccount>> {
    let current = get_current_user(&headers, &db).await?;
    let account = fetch_account(&db, account_id, &current).await?;
    Ok(Json(account))
}

/// Soft delete: the account is deactivated so its ledger history survives.
pub async fn deactivate_account(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(account_id): Path<Uuid>,
) -> ApiResult<Json<BankAccount>> {
    let current = get_current_user(&headers, &db).await?;
    require_admin(&current)?;
    fetch_account(&db, account_id, &current).await?;

    let account = sqlx::query_as::<_, BankAccount>(
        "UPDATE bank_accounts SET is_active = false, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(account_id)
    .fetch_one(&db)
    .await?;

    Ok(Json(account))
}

pub async fn list_transactions(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(account_id): Path<Uuid>,
) -> ApiResult<Json<Vec<BankTransaction>>> {
    let current = get_current_user(&headers, &db).await?;
    fetch_account(&db, account_id, &current).await?;

    let transactions = sqlx::query_as::<_, BankTransaction>(
        "SELECT * FROM bank_transactions WHERE bank_account_id = $1 ORDER BY txn_date DESC, created_at DESC",
    )
    .bind(account_id)
    .fetch_all(&db)
    .await?;

    Ok(Json(transactions))
}

/// Appends a ledger entry and moves the account balance by the signed amount.
/// Callers pass the business reference ("booking:BK-..", "expense:<id>") so a
/// statement line can be traced back to its source record.
pub async fn record_transaction(
    db: &Database,
    account_id: Uuid,
    direction: TxnDirection,
    amount: Decimal,
    reference: Option<String>,
    narration: Option<String>,
    txn_date: NaiveDate,
) -> ApiResult<()> {
    sqlx::query(
        r#"
        INSERT INTO bank_transactions
            (id, bank_account_id, direction, amount, reference, narration, txn_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(account_id)
    .bind(direction)
    .bind(amount)
    .bind(reference)
    .bind(narration)
    .bind(txn_date)
    .execute(db)
    .await?;

    sqlx::query(
        "UPDATE bank_accounts SET current_balance = current_balance + $1, updated_at = NOW() WHERE id = $2",
    )
    .bind(direction.signed_amount(amount))
    .bind(account_id)
    .execute(db)
    .await?;

    Ok(())
}

async fn fetch_account(
    db: &Database,
    account_id: Uuid,
    current: &CurrentUser,
) -> ApiResult<BankAccount> {
    let account = sqlx::query_as::<_, BankAccount>("SELECT * FROM bank_accounts WHERE id = $1")
        .bind(account_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Bank account not found".to_string()))?;

    if let Some(scope) = current.property_scope() {
        if account.property_id != scope {
            return Err(ApiError::NotFound("Bank account not found".to_string()));
        }
    }

    Ok(account)
}
