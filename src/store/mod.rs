//! Store module
//!
//! Persistence seam for the ledger. A [`LedgerUnit`] is one atomic unit of
//! work holding an exclusive lock on a single account; writes made through
//! it become visible together on [`LedgerUnit::commit`] and are discarded
//! if the unit is dropped.

mod error;
mod filter;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{
    Account, NewAccount, NewTransactionSource, Transaction, TransactionSource,
};
use crate::identity::{DetailFields, DetailKind, Identity, NewIdentity, NewProfile, Profile, ProfileDetail};

pub use error::StoreError;
pub use filter::TransactionFilter;
pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;

/// Unit of work over one locked account
#[async_trait]
pub trait LedgerUnit: Send {
    /// The locked account as seen by this unit, including staged balance writes
    fn account(&self) -> &Account;

    /// Load a transaction of the locked account
    async fn transaction(&mut self, id: Uuid) -> Result<Option<Transaction>, StoreError>;

    /// Insert a new transaction row for the locked account
    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError>;

    /// Overwrite the mutable fields (status, reference, source) of a transaction
    async fn update_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError>;

    /// Persist a new balance for the locked account
    async fn set_balance(&mut self, balance: Decimal) -> Result<(), StoreError>;

    /// Make every write of this unit durable and release the lock
    async fn commit(self) -> Result<(), StoreError>;
}

/// Accounts, transactions and transaction sources
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    type Unit: LedgerUnit;

    /// Lock `account_id` and open a unit of work on it
    async fn begin(&self, account_id: Uuid) -> Result<Self::Unit, StoreError>;

    /// Create an account with a zero balance
    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError>;

    async fn account(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    async fn accounts_for_owner(&self, owner_id: Uuid) -> Result<Vec<Account>, StoreError>;

    /// Update the caller-editable fields; the balance is never touched here
    async fn update_account_details(
        &self,
        id: Uuid,
        nickname: &str,
        is_open: bool,
    ) -> Result<Account, StoreError>;

    /// Hard delete; fails with `DeleteProtected` while transactions exist
    async fn delete_account(&self, id: Uuid) -> Result<(), StoreError>;

    async fn transaction(&self, id: Uuid) -> Result<Option<Transaction>, StoreError>;

    /// Transactions on accounts owned by `owner_id`, newest first
    async fn transactions_for_owner(
        &self,
        owner_id: Uuid,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, StoreError>;

    async fn insert_source(
        &self,
        source: NewTransactionSource,
    ) -> Result<TransactionSource, StoreError>;

    async fn source(&self, id: Uuid) -> Result<Option<TransactionSource>, StoreError>;

    async fn sources(&self) -> Result<Vec<TransactionSource>, StoreError>;

    async fn update_source(
        &self,
        id: Uuid,
        source: NewTransactionSource,
    ) -> Result<TransactionSource, StoreError>;

    /// Delete a source; transactions referencing it keep existing with no source
    async fn delete_source(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Identities, profiles and profile detail records
#[async_trait]
pub trait IdentityStore: Send + Sync + 'static {
    /// Insert identity and profile together; unique fields report `UniqueViolation`
    async fn register(
        &self,
        identity: NewIdentity,
        profile: NewProfile,
    ) -> Result<(Identity, Profile), StoreError>;

    async fn identity(&self, id: Uuid) -> Result<Option<Identity>, StoreError>;

    async fn identity_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError>;

    async fn profile(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError>;

    /// Update the linked record of this kind, or create and link a new one
    async fn put_detail(
        &self,
        user_id: Uuid,
        fields: DetailFields,
    ) -> Result<ProfileDetail, StoreError>;

    async fn detail(
        &self,
        user_id: Uuid,
        kind: DetailKind,
    ) -> Result<Option<ProfileDetail>, StoreError>;

    /// Delete the linked record; the profile reference becomes null.
    /// Returns false when nothing was linked.
    async fn delete_detail(&self, user_id: Uuid, kind: DetailKind) -> Result<bool, StoreError>;
}
