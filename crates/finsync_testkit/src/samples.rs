//! Ready-made records for tests.
//!
//! Every builder assigns a fresh id and leaves the record unsynced.

use finsync_core::{
    Category, CategoryKind, EntityId, Goal, LocalUser, Loan, LoanDirection, LoanEntry, OwnerId,
    PlannedPayment, Portfolio, PortfolioInstrument, Recurrence, Transaction, TransactionKind,
    Wallet,
};

/// Fixed timestamp used by the builders (2024-01-01T00:00:00Z).
pub const SAMPLE_TIME: i64 = 1_704_067_200_000;

/// A user profile whose id is `owner`.
pub fn user(owner: &str) -> LocalUser {
    LocalUser {
        id: EntityId::from(owner),
        owner_id: OwnerId::new(owner),
        email: format!("{owner}@example.com"),
        display_name: owner.to_owned(),
        base_currency: "EUR".into(),
        is_synced: false,
    }
}

/// A wallet with a zero balance.
pub fn wallet(owner: &str, name: &str) -> Wallet {
    Wallet {
        id: EntityId::new(),
        owner_id: OwnerId::new(owner),
        name: name.to_owned(),
        balance: 0,
        currency: "EUR".into(),
        color: "#2e7d32".into(),
        icon: None,
        created_at: SAMPLE_TIME,
        is_synced: false,
    }
}

/// A category of the given kind.
pub fn category(owner: &str, name: &str, kind: CategoryKind) -> Category {
    Category {
        id: EntityId::new(),
        owner_id: OwnerId::new(owner),
        name: name.to_owned(),
        kind,
        color: "#1565c0".into(),
        icon: None,
        is_synced: false,
    }
}

/// An expense of `amount` from `wallet`.
pub fn expense(wallet: &Wallet, amount: i64) -> Transaction {
    Transaction {
        id: EntityId::new(),
        owner_id: wallet.owner_id.clone(),
        wallet_id: wallet.id.clone(),
        category_id: None,
        target_wallet_id: None,
        kind: TransactionKind::Expense,
        amount,
        note: String::new(),
        occurred_at: SAMPLE_TIME,
        is_synced: false,
    }
}

/// A loan given to `counterparty`.
pub fn loan(owner: &str, counterparty: &str, principal: i64) -> Loan {
    Loan {
        id: EntityId::new(),
        owner_id: OwnerId::new(owner),
        counterparty: counterparty.to_owned(),
        direction: LoanDirection::Lent,
        principal,
        currency: "EUR".into(),
        due_at: None,
        note: String::new(),
        is_synced: false,
    }
}

/// A repayment of `amount` on `loan`.
pub fn loan_entry(loan: &Loan, amount: i64) -> LoanEntry {
    LoanEntry {
        id: EntityId::new(),
        owner_id: loan.owner_id.clone(),
        loan_id: loan.id.clone(),
        amount,
        paid_at: SAMPLE_TIME,
        note: String::new(),
        is_synced: false,
    }
}

/// A savings goal with nothing saved yet.
pub fn goal(owner: &str, name: &str, target_amount: i64) -> Goal {
    Goal {
        id: EntityId::new(),
        owner_id: OwnerId::new(owner),
        name: name.to_owned(),
        target_amount,
        saved_amount: 0,
        currency: "EUR".into(),
        deadline: None,
        color: "#f9a825".into(),
        is_synced: false,
    }
}

/// A monthly expense paid from `wallet`.
pub fn planned_payment(wallet: &Wallet, title: &str, amount: i64) -> PlannedPayment {
    PlannedPayment {
        id: EntityId::new(),
        owner_id: wallet.owner_id.clone(),
        wallet_id: wallet.id.clone(),
        category_id: None,
        title: title.to_owned(),
        kind: TransactionKind::Expense,
        amount,
        recurrence: Recurrence::Monthly,
        next_due_at: SAMPLE_TIME,
        is_synced: false,
    }
}

/// An investment portfolio.
pub fn portfolio(owner: &str, name: &str) -> Portfolio {
    Portfolio {
        id: EntityId::new(),
        owner_id: OwnerId::new(owner),
        name: name.to_owned(),
        currency: "EUR".into(),
        is_synced: false,
    }
}

/// A position of `quantity` units in `portfolio`.
pub fn instrument(portfolio: &Portfolio, symbol: &str, quantity: f64) -> PortfolioInstrument {
    PortfolioInstrument {
        id: EntityId::new(),
        owner_id: portfolio.owner_id.clone(),
        portfolio_id: portfolio.id.clone(),
        symbol: symbol.to_owned(),
        name: symbol.to_owned(),
        quantity,
        average_price: 10_000,
        currency: portfolio.currency.clone(),
        is_synced: false,
    }
}
