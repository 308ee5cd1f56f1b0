//! Property-based test generators using proptest.

use finsync_core::{
    Category, CategoryKind, EntityId, OwnerId, Transaction, TransactionKind, Wallet,
};
use proptest::prelude::*;

/// Strategy for owner ids.
pub fn owner_strategy() -> impl Strategy<Value = OwnerId> {
    prop::sample::select(vec!["u1", "u2", "u3"]).prop_map(OwnerId::new)
}

/// Strategy for assigned entity ids from a small pool, so collisions happen.
pub fn entity_id_strategy() -> impl Strategy<Value = EntityId> {
    (0u8..16).prop_map(|n| EntityId::from(format!("id-{n:02}")))
}

/// Strategy for display names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z0-9 ]{0,15}").expect("Invalid regex")
}

/// Strategy for signed minor-unit amounts.
pub fn amount_strategy() -> impl Strategy<Value = i64> {
    -1_000_000_000i64..1_000_000_000
}

/// Strategy for wallets of `owner`.
pub fn wallet_strategy(owner: OwnerId) -> impl Strategy<Value = Wallet> {
    (
        entity_id_strategy(),
        name_strategy(),
        amount_strategy(),
        prop::option::of("[a-z_]{1,12}"),
        any::<bool>(),
    )
        .prop_map(move |(id, name, balance, icon, is_synced)| Wallet {
            id,
            owner_id: owner.clone(),
            name,
            balance,
            currency: "EUR".into(),
            color: "#000000".into(),
            icon,
            created_at: 0,
            is_synced,
        })
}

/// Strategy for categories of `owner`.
pub fn category_strategy(owner: OwnerId) -> impl Strategy<Value = Category> {
    (
        entity_id_strategy(),
        name_strategy(),
        prop_oneof![Just(CategoryKind::Income), Just(CategoryKind::Expense)],
    )
        .prop_map(move |(id, name, kind)| Category {
            id,
            owner_id: owner.clone(),
            name,
            kind,
            color: "#000000".into(),
            icon: None,
            is_synced: false,
        })
}

/// Strategy for transactions of `owner`.
pub fn transaction_strategy(owner: OwnerId) -> impl Strategy<Value = Transaction> {
    (
        entity_id_strategy(),
        prop_oneof![
            Just(TransactionKind::Income),
            Just(TransactionKind::Expense),
            Just(TransactionKind::Transfer),
        ],
        amount_strategy(),
        prop::option::of(entity_id_strategy()),
        ".{0,24}",
        any::<i64>(),
    )
        .prop_map(move |(id, kind, amount, category_id, note, occurred_at)| {
            let target_wallet_id =
                (kind == TransactionKind::Transfer).then(|| EntityId::from("wallet-target"));
            Transaction {
                id,
                owner_id: owner.clone(),
                wallet_id: EntityId::from("wallet-source"),
                category_id,
                target_wallet_id,
                kind,
                amount,
                note,
                occurred_at,
                is_synced: false,
            }
        })
}

/// A user-level mutation of a wallet list.
#[derive(Debug, Clone)]
pub enum WalletMutation {
    /// Add a new wallet.
    Add {
        /// Wallet name.
        name: String,
        /// Opening balance.
        balance: i64,
    },
    /// Rename the n-th existing wallet (modulo the list length).
    Rename {
        /// Index into the current list.
        index: usize,
        /// New name.
        name: String,
    },
    /// Delete the n-th existing wallet (modulo the list length).
    Delete {
        /// Index into the current list.
        index: usize,
    },
    /// Run a sync.
    Sync,
}

/// Strategy for one wallet mutation.
pub fn wallet_mutation_strategy() -> impl Strategy<Value = WalletMutation> {
    prop_oneof![
        4 => (name_strategy(), amount_strategy())
            .prop_map(|(name, balance)| WalletMutation::Add { name, balance }),
        3 => (any::<usize>(), name_strategy())
            .prop_map(|(index, name)| WalletMutation::Rename { index, name }),
        2 => any::<usize>().prop_map(|index| WalletMutation::Delete { index }),
        2 => Just(WalletMutation::Sync),
    ]
}

/// Strategy for a sequence of wallet mutations.
pub fn wallet_mutation_sequence(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<WalletMutation>> {
    prop::collection::vec(wallet_mutation_strategy(), min_ops..max_ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::test_runner::TestRunner;

    #[test]
    fn transfers_have_a_target_wallet() {
        let mut runner = TestRunner::default();
        runner
            .run(&transaction_strategy(OwnerId::new("u1")), |tx| {
                prop_assert_eq!(
                    tx.target_wallet_id.is_some(),
                    tx.kind == TransactionKind::Transfer
                );
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn generated_ids_are_assigned() {
        let mut runner = TestRunner::default();
        runner
            .run(&entity_id_strategy(), |id| {
                prop_assert!(!id.is_unassigned());
                Ok(())
            })
            .unwrap();
    }
}
