use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    pub id: Uuid,
    pub property_id: Uuid,
    pub account_name: String,
    pub bank_name: String,
    pub account_number: String,
    pub opening_balance: Decimal,
    pub current_balance: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "txn_direction", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TxnDirection {
    Credit,
    Debit,
}

impl TxnDirection {
    /// Signed value of a ledger entry: credits count up, debits count down.
    pub fn signed_amount(self, amount: Decimal) -> Decimal {
        match self {
            TxnDirection::Credit => amount,
            TxnDirection::Debit => -amount,
        }
    }

    /// Effect of a ledger entry on the account balance.
    pub fn apply(self, balance: Decimal, amount: Decimal) -> Decimal {
        balance + self.signed_amount(amount)
    }
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BankTransaction {
    pub id: Uuid,
    pub bank_account_id: Uuid,
    pub direction: TxnDirection,
    pub amount: Decimal,
    pub reference: Option<String>,
    pub narration: Option<String>,
    pub txn_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBankAccount {
    pub property_id: Uuid,
    pub account_name: String,
    pub bank_name: String,
    pub account_number: String,
    pub opening_balance: Decimal,
}

impl CreateBankAccount {
    pub fn validate(&self) -> Result<(), String> {
        if self.account_name.trim().is_empty() {
            return Err("Account name is required".to_string());
        }
        if self.bank_name.trim().is_empty() {
            return Err("Bank name is required".to_string());
        }
        if self.account_number.trim().is_empty() {
            return Err("Account number is required".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_amount_carries_the_direction() {
        let amount = Decimal::from(750);
        assert_eq!(TxnDirection::Credit.signed_amount(amount), amount);
        assert_eq!(TxnDirection::Debit.signed_amount(amount), -amount);
    }

    #[test]
    fn credit_increases_and_debit_decreases_balance() {
        let balance = Decimal::from(10_000);
        assert_eq!(
            TxnDirection::Credit.apply(balance, Decimal::from(2_500)),
            Decimal::from(12_500)
        );
        assert_eq!(
            TxnDirection::Debit.apply(balance, Decimal::from(2_500)),
            Decimal::from(7_500)
        );
    }

    #[test]
    fn debit_can_overdraw() {
        // The ledger records what happened at the bank; it does not stop an
        // account from going negative.
        let balance = Decimal::from(100);
        assert_eq!(
            TxnDirection::Debit.apply(balance, Decimal::from(250)),
            Decimal::from(-150)
        );
    }
}
