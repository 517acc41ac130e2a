use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Json,
};
use axum_extra::extract::Multipart;
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::QueryBuilder;
use std::path::PathBuf;
use tokio::fs;
use uuid::Uuid;

use crate::{
    database::Database,
    error::{ApiError, ApiResult},
    handlers::banks::record_transaction,
    middleware::{get_current_user, CurrentUser},
    models::{Expense, ExpenseForm, TxnDirection},
    utils::{ListParams, Paginated},
};

const SORT_COLUMNS: &[&str] = &["expense_date", "amount", "category", "created_at"];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseFilters {
    pub property_id: Option<Uuid>,
    pub category: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

fn push_filters(
    qb: &mut QueryBuilder<'_, sqlx::Postgres>,
    filters: &ExpenseFilters,
    params: &ListParams,
    current: &CurrentUser,
) {
    if let Some(scope) = current.property_scope() {
        qb.push(" AND property_id = ");
        qb.push_bind(scope);
    }
    if let Some(property_id) = filters.property_id {
        qb.push(" AND property_id = ");
        qb.push_bind(property_id);
    }
    if let Some(category) = &filters.category {
        qb.push(" AND category = ");
        qb.push_bind(category.clone());
    }
    if let Some(from) = filters.date_from {
        qb.push(" AND expense_date >= ");
        qb.push_bind(from);
    }
    if let Some(to) = filters.date_to {
        qb.push(" AND expense_date <= ");
        qb.push_bind(to);
    }
    if let Some(term) = params.search_term() {
        qb.push(" AND (category ILIKE ");
        qb.push_bind(term.clone());
        qb.push(" OR description ILIKE ");
        qb.push_bind(term);
        qb.push(")");
    }
}

pub async fn list_expenses(
    State(db): State<Database>,
    headers: HeaderMap,
    Query(filters): Query<ExpenseFilters>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Paginated<Expense>>> {
    let current = get_current_user(&headers, &db).await?;

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM expenses WHERE 1=1");
    push_filters(&mut count_qb, &filters, &params, &current);
    let total: i64 = count_qb.build_query_scalar().fetch_one(&db).await?;

    let mut qb = QueryBuilder::new("SELECT * FROM expenses WHERE 1=1");
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

    let expenses = qb.build_query_as::<Expense>().fetch_all(&db).await?;

    Ok(Json(Paginated::new(expenses, total, &params)))
}

pub async fn get_expense(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(expense_id): Path<Uuid>,
) -> ApiResult<Json<Expense>> {
    let current = get_current_user(&headers, &db).await?;
    fetch_expense(&db, expense_id, &current).await.map(Json)
}

/// Multipart because the receipt image rides along with the fields.
pub async fn create_expense(
    State(db): State<Database>,
    headers: HeaderMap,
    multipart: Multipart,
) -> ApiResult<Json<Expense>> {
    let current = get_current_user(&headers, &db).await?;
    let (form, receipt) = parse_expense_multipart(multipart).await?;

    let (property_id, category, amount, expense_date, payment_mode) =
        form.require_complete().map_err(ApiError::Validation)?;
    current.check_property_access(property_id)?;

    let receipt_url = save_receipt(receipt).await?;

    let expense = sqlx::query_as::<_, Expense>(
        r#"
        INSERT INTO expenses
            (id, property_id, category, amount, description, expense_date,
             payment_mode, bank_account_id, receipt_url, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(property_id)
    .bind(&category)
    .bind(amount)
    .bind(&form.description)
    .bind(expense_date)
    .bind(payment_mode)
    .bind(form.bank_account_id)
    .bind(&receipt_url)
    .bind(current.id)
    .fetch_one(&db)
    .await?;

    if let Some(account_id) = expense.bank_account_id {
        record_transaction(
            &db,
            account_id,
            TxnDirection::Debit,
            expense.amount,
            Some(format!("expense:{}", expense.id)),
            Some(category),
            expense.expense_date,
        )
        .await?;
    }

    Ok(Json(expense))
}

pub async fn update_expense(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(expense_id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<Json<Expense>> {
    let current = get_current_user(&headers, &db).await?;
    fetch_expense(&db, expense_id, &current).await?;

    let (form, receipt) = parse_expense_multipart(multipart).await?;
    let (property_id, category, amount, expense_date, payment_mode) =
        form.require_complete().map_err(ApiError::Validation)?;
    current.check_property_access(property_id)?;

    let receipt_url = save_receipt(receipt).await?;

    let expense = if receipt_url.is_some() {
        sqlx::query_as::<_, Expense>(
            r#"
            UPDATE expenses SET
                property_id = $1, category = $2, amount = $3, description = $4,
                expense_date = $5, payment_mode = $6, bank_account_id = $7,
                receipt_url = $8, updated_at = NOW()
            WHERE id = $9
            RETURNING *
            "#,
        )
        .bind(property_id)
        .bind(&category)
        .bind(amount)
        .bind(&form.description)
        .bind(expense_date)
        .bind(payment_mode)
        .bind(form.bank_account_id)
        .bind(&receipt_url)
        .bind(expense_id)
        .fetch_one(&db)
        .await?
    } else {
        sqlx::query_as::<_, Expense>(
            r#"
            UPDATE expenses SET
                property_id = $1, category = $2, amount = $3, description = $4,
                expense_date = $5, payment_mode = $6, bank_account_id = $7,
                updated_at = NOW()
            WHERE id = $8
            RETURNING *
            "#,
        )
        .bind(property_id)
        .bind(&category)
        .bind(amount)
        .bind(&form.description)
        .bind(expense_date)
        .bind(payment_mode)
        .bind(form.bank_account_id)
        .bind(expense_id)
        .fetch_one(&db)
        .await?
    };

    Ok(Json(expense))
}

pub async fn delete_expense(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(expense_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let current = get_current_user(&headers, &db).await?;
    fetch_expense(&db, expense_id, &current).await?;

    sqlx::query("DELETE FROM expenses WHERE id = $1")
        .bind(expense_id)
        .execute(&db)
        .await?;

    Ok(Json(serde_json::json!({ "deleted": expense_id })))
}

async fn fetch_expense(
    db: &Database,
    expense_id: Uuid,
    current: &CurrentUser,
) -> ApiResult<Expense> {
    let expense = sqlx::query_as::<_, Expense>("SELECT * FROM expenses WHERE id = $1")
        .bind(expense_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Expense not found".to_string()))?;

    if let Some(scope) = current.property_scope() {
        if expense.property_id != scope {
            return Err(ApiError::NotFound("Expense not found".to_string()));
        }
    }

    Ok(expense)
}

struct ReceiptUpload {
    filename: String,
    data: axum::body::Bytes,
}

async fn parse_expense_multipart(
    mut multipart: Multipart,
) -> ApiResult<(ExpenseForm, Option<ReceiptUpload>)> {
    let mut form = ExpenseForm::default();
    let mut receipt = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("Malformed multipart body".to_string()))?
    {
        let name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };

        if name == "receipt" {
            let filename = field.file_name().map(|s| s.to_string());
            let data = field
                .bytes()
                .await
                .map_err(|_| ApiError::Validation("Unreadable receipt upload".to_string()))?;
            if let Some(filename) = filename {
                if !data.is_empty() {
                    receipt = Some(ReceiptUpload { filename, data });
                }
            }
            continue;
        }

        let text = String::from_utf8(
            field
                .bytes()
                .await
                .map_err(|_| ApiError::Validation("Unreadable form field".to_string()))?
                .to_vec(),
        )
        .map_err(|_| ApiError::Validation("Form fields must be UTF-8".to_string()))?;

        if text.is_empty() {
            continue;
        }

        match name.as_str() {
            "propertyId" => form.property_id = Uuid::parse_str(&text).ok(),
            "category" => form.category = Some(text),
            "amount" => form.amount = text.parse().ok(),
            "description" => form.description = Some(text),
            "expenseDate" => {
                form.expense_date = NaiveDate::parse_from_str(&text, "%Y-%m-%d").ok()
            }
            "paymentMode" => form.payment_mode = text.parse().ok(),
            "bankAccountId" => form.bank_account_id = Uuid::parse_str(&text).ok(),
            _ => (),
        }
    }

    Ok((form, receipt))
}

async fn save_receipt(receipt: Option<ReceiptUpload>) -> ApiResult<Option<String>> {
    let Some(receipt) = receipt else {
        return Ok(None);
    };

    let extension = PathBuf::from(&receipt.filename)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    if !["png", "jpg", "jpeg", "pdf"].contains(&extension.as_str()) {
        return Err(ApiError::Validation(
            "Receipt must be a PNG, JPG or PDF file".to_string(),
        ));
    }

    let receipts_dir = PathBuf::from("static/receipts");
    if !receipts_dir.exists() {
        fs::create_dir_all(&receipts_dir).await?;
    }

    let file_name = format!("{}.{}", Uuid::new_v4(), extension);
    fs::write(receipts_dir.join(&file_name), &receipt.data).await?;

    Ok(Some(format!("/static/receipts/{}", file_name)))
}
