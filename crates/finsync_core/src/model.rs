//! Domain records of the finance client.
//!
//! Amounts are integer minor units (cents) and timestamps are epoch
//! milliseconds, so payloads encode without floats except for instrument
//! quantities, which are fractional by nature.

use crate::entity::impl_entity;
use crate::id::{EntityId, OwnerId};
use serde::{Deserialize, Serialize};

/// Whether a category collects income or spending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryKind {
    /// Money coming in.
    Income,
    /// Money going out.
    Expense,
}

/// Direction of money movement for transactions and planned payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Adds to the wallet balance.
    Income,
    /// Subtracts from the wallet balance.
    Expense,
    /// Moves money between two wallets of the owner.
    Transfer,
}

/// Which side of a loan the owner is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanDirection {
    /// The owner lent money to the counterparty.
    Lent,
    /// The owner borrowed money from the counterparty.
    Borrowed,
}

/// Repeat interval of a planned payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recurrence {
    /// Happens a single time.
    Once,
    /// Every day.
    Daily,
    /// Every week.
    Weekly,
    /// Every month.
    Monthly,
    /// Every year.
    Yearly,
}

/// A money container (cash, bank account, card).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Record id.
    pub id: EntityId,
    /// Owning user.
    pub owner_id: OwnerId,
    /// Display name.
    pub name: String,
    /// Current balance in minor units.
    pub balance: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Hex color used by the wallet card.
    pub color: String,
    /// Optional icon name.
    pub icon: Option<String>,
    /// Creation time.
    pub created_at: i64,
    /// Sync flag, owned by the store.
    #[serde(skip)]
    pub is_synced: bool,
}

/// A spending or income category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Record id.
    pub id: EntityId,
    /// Owning user.
    pub owner_id: OwnerId,
    /// Display name.
    pub name: String,
    /// Income or expense.
    pub kind: CategoryKind,
    /// Hex color.
    pub color: String,
    /// Optional icon name.
    pub icon: Option<String>,
    /// Sync flag, owned by the store.
    #[serde(skip)]
    pub is_synced: bool,
}

/// A booked money movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Record id.
    pub id: EntityId,
    /// Owning user.
    pub owner_id: OwnerId,
    /// Wallet the money leaves or enters.
    pub wallet_id: EntityId,
    /// Category, absent for transfers.
    pub category_id: Option<EntityId>,
    /// Destination wallet of a transfer.
    pub target_wallet_id: Option<EntityId>,
    /// Movement direction.
    pub kind: TransactionKind,
    /// Amount in minor units.
    pub amount: i64,
    /// Free text note.
    pub note: String,
    /// Booking time.
    pub occurred_at: i64,
    /// Sync flag, owned by the store.
    #[serde(skip)]
    pub is_synced: bool,
}

/// Money lent to or borrowed from someone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    /// Record id.
    pub id: EntityId,
    /// Owning user.
    pub owner_id: OwnerId,
    /// The other party.
    pub counterparty: String,
    /// Lent or borrowed.
    pub direction: LoanDirection,
    /// Initial amount in minor units.
    pub principal: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Optional due date.
    pub due_at: Option<i64>,
    /// Free text note.
    pub note: String,
    /// Sync flag, owned by the store.
    #[serde(skip)]
    pub is_synced: bool,
}

/// A repayment booked against a loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanEntry {
    /// Record id.
    pub id: EntityId,
    /// Owning user.
    pub owner_id: OwnerId,
    /// Loan being repaid.
    pub loan_id: EntityId,
    /// Amount in minor units.
    pub amount: i64,
    /// Payment time.
    pub paid_at: i64,
    /// Free text note.
    pub note: String,
    /// Sync flag, owned by the store.
    #[serde(skip)]
    pub is_synced: bool,
}

/// A savings goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    /// Record id.
    pub id: EntityId,
    /// Owning user.
    pub owner_id: OwnerId,
    /// Display name.
    pub name: String,
    /// Amount to reach in minor units.
    pub target_amount: i64,
    /// Amount saved so far in minor units.
    pub saved_amount: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Optional deadline.
    pub deadline: Option<i64>,
    /// Hex color.
    pub color: String,
    /// Sync flag, owned by the store.
    #[serde(skip)]
    pub is_synced: bool,
}

/// A scheduled, possibly recurring, payment shown on the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedPayment {
    /// Record id.
    pub id: EntityId,
    /// Owning user.
    pub owner_id: OwnerId,
    /// Wallet to book against.
    pub wallet_id: EntityId,
    /// Optional category.
    pub category_id: Option<EntityId>,
    /// Display title.
    pub title: String,
    /// Movement direction.
    pub kind: TransactionKind,
    /// Amount in minor units.
    pub amount: i64,
    /// Repeat interval.
    pub recurrence: Recurrence,
    /// Next occurrence.
    pub next_due_at: i64,
    /// Sync flag, owned by the store.
    #[serde(skip)]
    pub is_synced: bool,
}

/// An investment portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    /// Record id.
    pub id: EntityId,
    /// Owning user.
    pub owner_id: OwnerId,
    /// Display name.
    pub name: String,
    /// Reporting currency.
    pub currency: String,
    /// Sync flag, owned by the store.
    #[serde(skip)]
    pub is_synced: bool,
}

/// A position held in a portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioInstrument {
    /// Record id.
    pub id: EntityId,
    /// Owning user.
    pub owner_id: OwnerId,
    /// Portfolio holding the position.
    pub portfolio_id: EntityId,
    /// Ticker symbol.
    pub symbol: String,
    /// Instrument name.
    pub name: String,
    /// Units held.
    pub quantity: f64,
    /// Average purchase price per unit in minor units.
    pub average_price: i64,
    /// Quote currency.
    pub currency: String,
    /// Sync flag, owned by the store.
    #[serde(skip)]
    pub is_synced: bool,
}

/// Profile of the signed-in user. `id` and `owner_id` are the same value.
///
/// Credentials are deliberately absent: they belong to the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalUser {
    /// Record id (the user id).
    pub id: EntityId,
    /// Owning user (the user itself).
    pub owner_id: OwnerId,
    /// Sign-in email.
    pub email: String,
    /// Name shown in the profile screen.
    pub display_name: String,
    /// Currency used for totals.
    pub base_currency: String,
    /// Sync flag, owned by the store.
    #[serde(skip)]
    pub is_synced: bool,
}

impl_entity!(Wallet, "wallets");
impl_entity!(Category, "categories");
impl_entity!(Transaction, "transactions");
impl_entity!(Loan, "loans");
impl_entity!(LoanEntry, "loan_entries");
impl_entity!(Goal, "goals");
impl_entity!(PlannedPayment, "planned_payments");
impl_entity!(Portfolio, "portfolios");
impl_entity!(PortfolioInstrument, "portfolio_instruments");
impl_entity!(LocalUser, "users", true);

/// Every table name known to the store, in a stable order.
pub const ALL_TABLES: [&str; 10] = [
    "users",
    "wallets",
    "categories",
    "transactions",
    "loans",
    "loan_entries",
    "goals",
    "planned_payments",
    "portfolios",
    "portfolio_instruments",
];
