//! Conversion between local entities and wire rows.
//!
//! `to_wire` is total. `from_wire` fails only when an enumeration column
//! holds a value the client does not know; absent optional text maps to an
//! empty note.

use crate::error::MappingError;
use crate::wire::{
    CategoryRow, GoalRow, LoanEntryRow, LoanRow, PlannedPaymentRow, PortfolioInstrumentRow,
    PortfolioRow, TransactionRow, UserRow, WalletRow, WireRow,
};
use finsync_core::{
    Category, CategoryKind, Entity, EntityId, Goal, Loan, LoanDirection, LoanEntry, LocalUser,
    OwnerId, PlannedPayment, Portfolio, PortfolioInstrument, Recurrence, Transaction,
    TransactionKind, Wallet,
};

/// A local entity with a remote table representation.
pub trait WireEntity: Entity {
    /// The row type of the remote table.
    type Wire: WireRow;

    /// Builds the wire row for this entity.
    fn to_wire(&self) -> Self::Wire;

    /// Builds a synced local entity from a wire row.
    ///
    /// # Errors
    ///
    /// Returns a [`MappingError`] if a column holds an unknown value.
    fn from_wire(row: Self::Wire) -> Result<Self, MappingError>;
}

/// String form of a local enumeration on the wire.
trait WireEnum: Sized + Copy + PartialEq + 'static {
    const VALUES: &'static [(Self, &'static str)];

    fn wire_str(self) -> &'static str {
        Self::VALUES
            .iter()
            .find(|(value, _)| *value == self)
            .map_or("", |(_, s)| *s)
    }

    fn parse(table: &'static str, field: &'static str, s: &str) -> Result<Self, MappingError> {
        Self::VALUES
            .iter()
            .find(|(_, wire)| *wire == s)
            .map(|(value, _)| *value)
            .ok_or_else(|| MappingError::new(table, field, s))
    }
}

impl WireEnum for CategoryKind {
    const VALUES: &'static [(Self, &'static str)] =
        &[(Self::Income, "income"), (Self::Expense, "expense")];
}

impl WireEnum for TransactionKind {
    const VALUES: &'static [(Self, &'static str)] = &[
        (Self::Income, "income"),
        (Self::Expense, "expense"),
        (Self::Transfer, "transfer"),
    ];
}

impl WireEnum for LoanDirection {
    const VALUES: &'static [(Self, &'static str)] =
        &[(Self::Lent, "lent"), (Self::Borrowed, "borrowed")];
}

impl WireEnum for Recurrence {
    const VALUES: &'static [(Self, &'static str)] = &[
        (Self::Once, "once"),
        (Self::Daily, "daily"),
        (Self::Weekly, "weekly"),
        (Self::Monthly, "monthly"),
        (Self::Yearly, "yearly"),
    ];
}

fn id_of(id: &EntityId) -> String {
    id.as_str().to_owned()
}

fn opt_id(id: &Option<EntityId>) -> Option<String> {
    id.as_ref().map(id_of)
}

fn note_to_wire(note: &str) -> Option<String> {
    (!note.is_empty()).then(|| note.to_owned())
}

impl WireEntity for Wallet {
    type Wire = WalletRow;

    fn to_wire(&self) -> WalletRow {
        WalletRow {
            id: id_of(&self.id),
            owner_id: self.owner_id.to_string(),
            name: self.name.clone(),
            balance: self.balance,
            currency: self.currency.clone(),
            color_hex: self.color.clone(),
            icon_name: self.icon.clone(),
            created_at: self.created_at,
        }
    }

    fn from_wire(row: WalletRow) -> Result<Self, MappingError> {
        Ok(Self {
            id: row.id.into(),
            owner_id: OwnerId::new(row.owner_id),
            name: row.name,
            balance: row.balance,
            currency: row.currency,
            color: row.color_hex,
            icon: row.icon_name,
            created_at: row.created_at,
            is_synced: true,
        })
    }
}

impl WireEntity for Category {
    type Wire = CategoryRow;

    fn to_wire(&self) -> CategoryRow {
        CategoryRow {
            id: id_of(&self.id),
            owner_id: self.owner_id.to_string(),
            name: self.name.clone(),
            kind: self.kind.wire_str().to_owned(),
            color_hex: self.color.clone(),
            icon_name: self.icon.clone(),
        }
    }

    fn from_wire(row: CategoryRow) -> Result<Self, MappingError> {
        Ok(Self {
            kind: CategoryKind::parse(CategoryRow::TABLE, "type", &row.kind)?,
            id: row.id.into(),
            owner_id: OwnerId::new(row.owner_id),
            name: row.name,
            color: row.color_hex,
            icon: row.icon_name,
            is_synced: true,
        })
    }
}

impl WireEntity for Transaction {
    type Wire = TransactionRow;

    fn to_wire(&self) -> TransactionRow {
        TransactionRow {
            id: id_of(&self.id),
            owner_id: self.owner_id.to_string(),
            wallet_id: id_of(&self.wallet_id),
            category_id: opt_id(&self.category_id),
            target_wallet_id: opt_id(&self.target_wallet_id),
            kind: self.kind.wire_str().to_owned(),
            amount: self.amount,
            note: note_to_wire(&self.note),
            date: self.occurred_at,
        }
    }

    fn from_wire(row: TransactionRow) -> Result<Self, MappingError> {
        Ok(Self {
            kind: TransactionKind::parse(TransactionRow::TABLE, "type", &row.kind)?,
            id: row.id.into(),
            owner_id: OwnerId::new(row.owner_id),
            wallet_id: row.wallet_id.into(),
            category_id: row.category_id.map(EntityId::from),
            target_wallet_id: row.target_wallet_id.map(EntityId::from),
            amount: row.amount,
            note: row.note.unwrap_or_default(),
            occurred_at: row.date,
            is_synced: true,
        })
    }
}

impl WireEntity for Loan {
    type Wire = LoanRow;

    fn to_wire(&self) -> LoanRow {
        LoanRow {
            id: id_of(&self.id),
            owner_id: self.owner_id.to_string(),
            person_name: self.counterparty.clone(),
            direction: self.direction.wire_str().to_owned(),
            amount: self.principal,
            currency: self.currency.clone(),
            due_date: self.due_at,
            note: note_to_wire(&self.note),
        }
    }

    fn from_wire(row: LoanRow) -> Result<Self, MappingError> {
        Ok(Self {
            direction: LoanDirection::parse(LoanRow::TABLE, "direction", &row.direction)?,
            id: row.id.into(),
            owner_id: OwnerId::new(row.owner_id),
            counterparty: row.person_name,
            principal: row.amount,
            currency: row.currency,
            due_at: row.due_date,
            note: row.note.unwrap_or_default(),
            is_synced: true,
        })
    }
}

impl WireEntity for LoanEntry {
    type Wire = LoanEntryRow;

    fn to_wire(&self) -> LoanEntryRow {
        LoanEntryRow {
            id: id_of(&self.id),
            owner_id: self.owner_id.to_string(),
            loan_id: id_of(&self.loan_id),
            amount: self.amount,
            paid_at: self.paid_at,
            note: note_to_wire(&self.note),
        }
    }

    fn from_wire(row: LoanEntryRow) -> Result<Self, MappingError> {
        Ok(Self {
            id: row.id.into(),
            owner_id: OwnerId::new(row.owner_id),
            loan_id: row.loan_id.into(),
            amount: row.amount,
            paid_at: row.paid_at,
            note: row.note.unwrap_or_default(),
            is_synced: true,
        })
    }
}

impl WireEntity for Goal {
    type Wire = GoalRow;

    fn to_wire(&self) -> GoalRow {
        GoalRow {
            id: id_of(&self.id),
            owner_id: self.owner_id.to_string(),
            name: self.name.clone(),
            target_amount: self.target_amount,
            saved_amount: self.saved_amount,
            currency: self.currency.clone(),
            deadline: self.deadline,
            color_hex: self.color.clone(),
        }
    }

    fn from_wire(row: GoalRow) -> Result<Self, MappingError> {
        Ok(Self {
            id: row.id.into(),
            owner_id: OwnerId::new(row.owner_id),
            name: row.name,
            target_amount: row.target_amount,
            saved_amount: row.saved_amount,
            currency: row.currency,
            deadline: row.deadline,
            color: row.color_hex,
            is_synced: true,
        })
    }
}

impl WireEntity for PlannedPayment {
    type Wire = PlannedPaymentRow;

    fn to_wire(&self) -> PlannedPaymentRow {
        PlannedPaymentRow {
            id: id_of(&self.id),
            owner_id: self.owner_id.to_string(),
            wallet_id: id_of(&self.wallet_id),
            category_id: opt_id(&self.category_id),
            title: self.title.clone(),
            kind: self.kind.wire_str().to_owned(),
            amount: self.amount,
            recurrence: self.recurrence.wire_str().to_owned(),
            due_date: self.next_due_at,
        }
    }

    fn from_wire(row: PlannedPaymentRow) -> Result<Self, MappingError> {
        let table = PlannedPaymentRow::TABLE;
        Ok(Self {
            kind: TransactionKind::parse(table, "type", &row.kind)?,
            recurrence: Recurrence::parse(table, "recurrence", &row.recurrence)?,
            id: row.id.into(),
            owner_id: OwnerId::new(row.owner_id),
            wallet_id: row.wallet_id.into(),
            category_id: row.category_id.map(EntityId::from),
            title: row.title,
            amount: row.amount,
            next_due_at: row.due_date,
            is_synced: true,
        })
    }
}

impl WireEntity for Portfolio {
    type Wire = PortfolioRow;

    fn to_wire(&self) -> PortfolioRow {
        PortfolioRow {
            id: id_of(&self.id),
            owner_id: self.owner_id.to_string(),
            name: self.name.clone(),
            currency: self.currency.clone(),
        }
    }

    fn from_wire(row: PortfolioRow) -> Result<Self, MappingError> {
        Ok(Self {
            id: row.id.into(),
            owner_id: OwnerId::new(row.owner_id),
            name: row.name,
            currency: row.currency,
            is_synced: true,
        })
    }
}

impl WireEntity for PortfolioInstrument {
    type Wire = PortfolioInstrumentRow;

    fn to_wire(&self) -> PortfolioInstrumentRow {
        PortfolioInstrumentRow {
            id: id_of(&self.id),
            owner_id: self.owner_id.to_string(),
            portfolio_id: id_of(&self.portfolio_id),
            symbol: self.symbol.clone(),
            name: self.name.clone(),
            quantity: self.quantity,
            average_price: self.average_price,
            currency: self.currency.clone(),
        }
    }

    fn from_wire(row: PortfolioInstrumentRow) -> Result<Self, MappingError> {
        Ok(Self {
            id: row.id.into(),
            owner_id: OwnerId::new(row.owner_id),
            portfolio_id: row.portfolio_id.into(),
            symbol: row.symbol,
            name: row.name,
            quantity: row.quantity,
            average_price: row.average_price,
            currency: row.currency,
            is_synced: true,
        })
    }
}

impl WireEntity for LocalUser {
    type Wire = UserRow;

    fn to_wire(&self) -> UserRow {
        UserRow {
            id: id_of(&self.id),
            email: self.email.clone(),
            full_name: self.display_name.clone(),
            currency: self.base_currency.clone(),
        }
    }

    fn from_wire(row: UserRow) -> Result<Self, MappingError> {
        Ok(Self {
            owner_id: OwnerId::new(row.id.clone()),
            id: row.id.into(),
            email: row.email,
            display_name: row.full_name,
            base_currency: row.currency,
            is_synced: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction() -> Transaction {
        Transaction {
            id: EntityId::from("t1"),
            owner_id: OwnerId::new("u1"),
            wallet_id: EntityId::from("w1"),
            category_id: Some(EntityId::from("c1")),
            target_wallet_id: None,
            kind: TransactionKind::Expense,
            amount: 1999,
            note: String::new(),
            occurred_at: 1_700_000_000_000,
            is_synced: false,
        }
    }

    #[test]
    fn transaction_columns() {
        let row = transaction().to_wire();
        assert_eq!(row.kind, "expense");
        assert_eq!(row.date, 1_700_000_000_000);
        assert_eq!(row.category_id.as_deref(), Some("c1"));
        assert_eq!(row.note, None);

        let back = Transaction::from_wire(row).unwrap();
        assert!(back.is_synced);
        assert_eq!(back.note, "");
        assert_eq!(back.amount, 1999);
    }

    #[test]
    fn unknown_enum_value_is_a_mapping_error() {
        let mut row = transaction().to_wire();
        row.kind = "refund".into();
        let err = Transaction::from_wire(row).unwrap_err();
        assert_eq!(err, MappingError::new("transactions", "type", "refund"));
    }

    #[test]
    fn planned_payment_checks_recurrence() {
        let row = PlannedPaymentRow {
            id: "p1".into(),
            owner_id: "u1".into(),
            wallet_id: "w1".into(),
            category_id: None,
            title: "Rent".into(),
            kind: "expense".into(),
            amount: 90_000,
            recurrence: "fortnightly".into(),
            due_date: 0,
        };
        let err = PlannedPayment::from_wire(row).unwrap_err();
        assert_eq!(err.field, "recurrence");
    }

    #[test]
    fn user_owner_is_its_id() {
        let user = LocalUser::from_wire(UserRow {
            id: "u1".into(),
            email: "me@example.com".into(),
            full_name: "Me".into(),
            currency: "USD".into(),
        })
        .unwrap();
        assert_eq!(user.owner_id, OwnerId::new("u1"));
        assert_eq!(user.to_wire().full_name, "Me");
    }

    #[test]
    fn every_enum_value_has_a_wire_string() {
        for (value, s) in Recurrence::VALUES {
            assert_eq!(value.wire_str(), *s);
        }
        for (value, s) in TransactionKind::VALUES {
            assert_eq!(value.wire_str(), *s);
        }
    }
}
