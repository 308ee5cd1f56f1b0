//! Wiring of every FinSync entity type.

use crate::config::SyncConfig;
use crate::connectivity::ConnectivitySignal;
use crate::coordinator::SyncCoordinator;
use crate::hub::{SessionProvider, SyncHub, TargetRun};
use crate::repository::Repository;
use finsync_core::{
    Category, Goal, LocalStore, LocalUser, Loan, LoanEntry, OwnerId, PlannedPayment, Portfolio,
    PortfolioInstrument, Transaction, Wallet,
};
use finsync_remote::{RemoteGateway, WireEntity};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// One store, one gateway and one connectivity signal shared by a
/// repository per entity type.
///
/// Build it once at startup and share it by `Arc`.
pub struct FinanceSync<R: RemoteGateway> {
    store: LocalStore,
    connectivity: ConnectivitySignal,
    hub: Arc<SyncHub>,
    users: Repository<LocalUser, R>,
    wallets: Repository<Wallet, R>,
    categories: Repository<Category, R>,
    transactions: Repository<Transaction, R>,
    loans: Repository<Loan, R>,
    loan_entries: Repository<LoanEntry, R>,
    goals: Repository<Goal, R>,
    planned_payments: Repository<PlannedPayment, R>,
    portfolios: Repository<Portfolio, R>,
    portfolio_instruments: Repository<PortfolioInstrument, R>,
}

struct Wiring<'a, R: RemoteGateway> {
    store: &'a LocalStore,
    remote: &'a Arc<R>,
    connectivity: &'a ConnectivitySignal,
    config: &'a SyncConfig,
    hub: SyncHub,
}

impl<R: RemoteGateway> Wiring<'_, R> {
    fn repository<E: WireEntity>(&mut self) -> Repository<E, R> {
        let coordinator = Arc::new(SyncCoordinator::<E, R>::new(
            self.store.table(),
            Arc::clone(self.remote),
            self.connectivity.clone(),
            self.config,
        ));
        self.hub.register(coordinator.clone());
        Repository::new(coordinator, self.config.auto_sync)
    }
}

impl<R: RemoteGateway> FinanceSync<R> {
    /// Wires every entity type against `store` and `remote`.
    pub fn new(
        store: LocalStore,
        remote: R,
        connectivity: ConnectivitySignal,
        config: &SyncConfig,
    ) -> Self {
        let remote = Arc::new(remote);
        let mut wiring = Wiring {
            store: &store,
            remote: &remote,
            connectivity: &connectivity,
            config,
            hub: SyncHub::new(connectivity.clone()),
        };

        let users = wiring.repository();
        let wallets = wiring.repository();
        let categories = wiring.repository();
        let transactions = wiring.repository();
        let loans = wiring.repository();
        let loan_entries = wiring.repository();
        let goals = wiring.repository();
        let planned_payments = wiring.repository();
        let portfolios = wiring.repository();
        let portfolio_instruments = wiring.repository();
        let hub = Arc::new(wiring.hub);

        Self {
            store,
            connectivity,
            hub,
            users,
            wallets,
            categories,
            transactions,
            loans,
            loan_entries,
            goals,
            planned_payments,
            portfolios,
            portfolio_instruments,
        }
    }

    /// Returns the local store.
    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Returns the connectivity signal.
    pub fn connectivity(&self) -> &ConnectivitySignal {
        &self.connectivity
    }

    /// Returns the hub running every table.
    pub fn hub(&self) -> &Arc<SyncHub> {
        &self.hub
    }

    /// User profiles.
    pub fn users(&self) -> &Repository<LocalUser, R> {
        &self.users
    }

    /// Wallets.
    pub fn wallets(&self) -> &Repository<Wallet, R> {
        &self.wallets
    }

    /// Categories.
    pub fn categories(&self) -> &Repository<Category, R> {
        &self.categories
    }

    /// Transactions.
    pub fn transactions(&self) -> &Repository<Transaction, R> {
        &self.transactions
    }

    /// Loans.
    pub fn loans(&self) -> &Repository<Loan, R> {
        &self.loans
    }

    /// Loan repayments.
    pub fn loan_entries(&self) -> &Repository<LoanEntry, R> {
        &self.loan_entries
    }

    /// Savings goals.
    pub fn goals(&self) -> &Repository<Goal, R> {
        &self.goals
    }

    /// Planned payments.
    pub fn planned_payments(&self) -> &Repository<PlannedPayment, R> {
        &self.planned_payments
    }

    /// Portfolios.
    pub fn portfolios(&self) -> &Repository<Portfolio, R> {
        &self.portfolios
    }

    /// Portfolio instruments.
    pub fn portfolio_instruments(&self) -> &Repository<PortfolioInstrument, R> {
        &self.portfolio_instruments
    }

    /// Runs every table for `owner` and waits for all of them.
    pub async fn sync_all(&self, owner: &OwnerId) -> Vec<TargetRun> {
        self.hub.trigger_all(owner).await
    }

    /// Starts syncing every table for the signed-in user whenever
    /// connectivity comes back.
    ///
    /// Must be called within a tokio runtime.
    pub fn start(&self, session: Arc<dyn SessionProvider>) -> JoinHandle<()> {
        self.hub.spawn_reconnect_listener(session)
    }
}

impl<R: RemoteGateway> std::fmt::Debug for FinanceSync<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinanceSync")
            .field("hub", &self.hub)
            .field("connectivity", &self.connectivity.current())
            .finish_non_exhaustive()
    }
}
