//! Rows as the remote tables store them.
//!
//! Wire rows are flat JSON objects with snake_case columns. Enumerations are
//! plain strings on the wire so an unknown value survives decoding and is
//! reported by the mapping layer instead of failing the whole response.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A row of one remote table.
pub trait WireRow: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Remote table name.
    const TABLE: &'static str;

    /// Column holding the owning user's id.
    const OWNER_COLUMN: &'static str = "owner_id";

    /// Primary key.
    fn id(&self) -> &str;

    /// Owning user.
    fn owner_id(&self) -> &str;
}

macro_rules! wire_row {
    ($ty:ty, $table:literal) => {
        impl WireRow for $ty {
            const TABLE: &'static str = $table;

            fn id(&self) -> &str {
                &self.id
            }

            fn owner_id(&self) -> &str {
                &self.owner_id
            }
        }
    };
}

/// `wallets` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletRow {
    /// Primary key.
    pub id: String,
    /// Owning user.
    pub owner_id: String,
    /// Display name.
    pub name: String,
    /// Balance in minor units.
    pub balance: i64,
    /// Currency code.
    pub currency: String,
    /// Card color.
    pub color_hex: String,
    /// Icon name.
    pub icon_name: Option<String>,
    /// Creation time, epoch millis.
    pub created_at: i64,
}

/// `categories` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRow {
    /// Primary key.
    pub id: String,
    /// Owning user.
    pub owner_id: String,
    /// Display name.
    pub name: String,
    /// `income` or `expense`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Color.
    pub color_hex: String,
    /// Icon name.
    pub icon_name: Option<String>,
}

/// `transactions` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRow {
    /// Primary key.
    pub id: String,
    /// Owning user.
    pub owner_id: String,
    /// Source wallet.
    pub wallet_id: String,
    /// Category.
    pub category_id: Option<String>,
    /// Transfer destination.
    pub target_wallet_id: Option<String>,
    /// `income`, `expense` or `transfer`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Amount in minor units.
    pub amount: i64,
    /// Note.
    pub note: Option<String>,
    /// Booking time, epoch millis.
    pub date: i64,
}

/// `loans` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRow {
    /// Primary key.
    pub id: String,
    /// Owning user.
    pub owner_id: String,
    /// Counterparty.
    pub person_name: String,
    /// `lent` or `borrowed`.
    pub direction: String,
    /// Principal in minor units.
    pub amount: i64,
    /// Currency code.
    pub currency: String,
    /// Due date, epoch millis.
    pub due_date: Option<i64>,
    /// Note.
    pub note: Option<String>,
}

/// `loan_entries` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanEntryRow {
    /// Primary key.
    pub id: String,
    /// Owning user.
    pub owner_id: String,
    /// Loan.
    pub loan_id: String,
    /// Amount in minor units.
    pub amount: i64,
    /// Payment time, epoch millis.
    pub paid_at: i64,
    /// Note.
    pub note: Option<String>,
}

/// `goals` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalRow {
    /// Primary key.
    pub id: String,
    /// Owning user.
    pub owner_id: String,
    /// Display name.
    pub name: String,
    /// Target in minor units.
    pub target_amount: i64,
    /// Saved in minor units.
    pub saved_amount: i64,
    /// Currency code.
    pub currency: String,
    /// Deadline, epoch millis.
    pub deadline: Option<i64>,
    /// Color.
    pub color_hex: String,
}

/// `planned_payments` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedPaymentRow {
    /// Primary key.
    pub id: String,
    /// Owning user.
    pub owner_id: String,
    /// Wallet.
    pub wallet_id: String,
    /// Category.
    pub category_id: Option<String>,
    /// Title.
    pub title: String,
    /// `income`, `expense` or `transfer`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Amount in minor units.
    pub amount: i64,
    /// `once`, `daily`, `weekly`, `monthly` or `yearly`.
    pub recurrence: String,
    /// Next occurrence, epoch millis.
    pub due_date: i64,
}

/// `portfolios` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRow {
    /// Primary key.
    pub id: String,
    /// Owning user.
    pub owner_id: String,
    /// Display name.
    pub name: String,
    /// Reporting currency.
    pub currency: String,
}

/// `portfolio_instruments` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioInstrumentRow {
    /// Primary key.
    pub id: String,
    /// Owning user.
    pub owner_id: String,
    /// Portfolio.
    pub portfolio_id: String,
    /// Ticker.
    pub symbol: String,
    /// Instrument name.
    pub name: String,
    /// Units held.
    pub quantity: f64,
    /// Average price in minor units.
    pub average_price: i64,
    /// Quote currency.
    pub currency: String,
}

/// `users` row. The row id is the user id; there is no owner column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRow {
    /// User id.
    pub id: String,
    /// Sign-in email.
    pub email: String,
    /// Profile name.
    pub full_name: String,
    /// Currency for totals.
    pub currency: String,
}

wire_row!(WalletRow, "wallets");
wire_row!(CategoryRow, "categories");
wire_row!(TransactionRow, "transactions");
wire_row!(LoanRow, "loans");
wire_row!(LoanEntryRow, "loan_entries");
wire_row!(GoalRow, "goals");
wire_row!(PlannedPaymentRow, "planned_payments");
wire_row!(PortfolioRow, "portfolios");
wire_row!(PortfolioInstrumentRow, "portfolio_instruments");

impl WireRow for UserRow {
    const TABLE: &'static str = "users";
    const OWNER_COLUMN: &'static str = "id";

    fn id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> &str {
        &self.id
    }
}
