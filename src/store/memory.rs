//! In-memory store
//!
//! Same observable semantics as the Postgres store: one async mutex per
//! account stands in for the row lock, and a unit's writes are staged and
//! applied in a single step on commit. Used by tests and local demos.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::domain::{
    to_ledger_scale, Account, NewAccount, NewTransactionSource, Transaction, TransactionSource,
};
use crate::identity::{
    DetailFields, DetailKind, Identity, NewIdentity, NewProfile, Profile, ProfileDetail,
};

use super::{IdentityStore, LedgerStore, LedgerUnit, StoreError, TransactionFilter};

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    transactions: HashMap<Uuid, Transaction>,
    sources: HashMap<Uuid, TransactionSource>,
    identities: HashMap<Uuid, Identity>,
    profiles: HashMap<Uuid, Profile>,
    details: HashMap<Uuid, ProfileDetail>,
}

/// Switches that make the store fail on purpose
#[derive(Debug, Default)]
struct Faults {
    balance_writes: AtomicBool,
    commits: AtomicBool,
}

#[derive(Debug, Default)]
struct Inner {
    tables: RwLock<Tables>,
    account_locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
    faults: Faults,
}

impl Inner {
    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn account_lock(&self, account_id: Uuid) -> Result<Arc<tokio::sync::Mutex<()>>, StoreError> {
        let mut locks = self
            .account_locks
            .lock()
            .map_err(|_| StoreError::Unavailable("account lock table poisoned".to_string()))?;
        Ok(locks.entry(account_id).or_default().clone())
    }

    fn forget_lock(&self, account_id: Uuid) -> Result<(), StoreError> {
        self.account_locks
            .lock()
            .map_err(|_| StoreError::Unavailable("account lock table poisoned".to_string()))?
            .remove(&account_id);
        Ok(())
    }

    fn injected(flag: &AtomicBool, what: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("injected {} failure", what)));
        }
        Ok(())
    }
}

/// Process-local ledger and identity store
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    inner: Arc<Inner>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set_balance` fail with `Unavailable`
    pub fn fail_balance_writes(&self, fail: bool) {
        self.inner.faults.balance_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent unit commit fail with `Unavailable`
    pub fn fail_commits(&self, fail: bool) {
        self.inner.faults.commits.store(fail, Ordering::SeqCst);
    }

    /// Lock an existing account. Unknown ids never get a lock entry.
    async fn lock_account(&self, account_id: Uuid) -> Result<OwnedMutexGuard<()>, StoreError> {
        if !self.inner.read()?.accounts.contains_key(&account_id) {
            return Err(StoreError::NotFound {
                entity: "account",
                id: account_id,
            });
        }
        let lock = self.inner.account_lock(account_id)?;
        Ok(lock.lock_owned().await)
    }
}

/// Unit of work holding the account's mutex until commit or drop
pub struct MemoryLedgerUnit {
    _guard: OwnedMutexGuard<()>,
    inner: Arc<Inner>,
    account: Account,
    staged: HashMap<Uuid, Transaction>,
    balance: Option<Decimal>,
}

impl MemoryLedgerUnit {
    fn check_owned(&self, transaction: &Transaction) -> Result<(), StoreError> {
        if transaction.account_id != self.account.id {
            return Err(StoreError::InvalidData(format!(
                "transaction {} belongs to account {}, unit holds {}",
                transaction.id, transaction.account_id, self.account.id
            )));
        }
        Ok(())
    }

    fn check_source(&self, transaction: &Transaction) -> Result<(), StoreError> {
        if let Some(source_id) = transaction.source_id {
            if !self.inner.read()?.sources.contains_key(&source_id) {
                return Err(StoreError::MissingReference("transaction source".to_string()));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerUnit for MemoryLedgerUnit {
    fn account(&self) -> &Account {
        &self.account
    }

    async fn transaction(&mut self, id: Uuid) -> Result<Option<Transaction>, StoreError> {
        if let Some(staged) = self.staged.get(&id) {
            return Ok(Some(staged.clone()));
        }
        let tables = self.inner.read()?;
        Ok(tables
            .transactions
            .get(&id)
            .filter(|tx| tx.account_id == self.account.id)
            .cloned())
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError> {
        self.check_owned(transaction)?;
        self.check_source(transaction)?;

        let exists = self.staged.contains_key(&transaction.id)
            || self.inner.read()?.transactions.contains_key(&transaction.id);
        if exists {
            return Err(StoreError::UniqueViolation("id".to_string()));
        }

        let mut row = transaction.clone();
        row.amount = to_ledger_scale(row.amount);
        self.staged.insert(row.id, row);
        Ok(())
    }

    async fn update_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError> {
        let current = self
            .transaction(transaction.id)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "transaction",
                id: transaction.id,
            })?;
        self.check_source(transaction)?;

        // account, type, amount and creation time are immutable
        let updated = Transaction {
            status: transaction.status,
            reference: transaction.reference.clone(),
            source_id: transaction.source_id,
            ..current
        };
        self.staged.insert(updated.id, updated);
        Ok(())
    }

    async fn set_balance(&mut self, balance: Decimal) -> Result<(), StoreError> {
        Inner::injected(&self.inner.faults.balance_writes, "balance write")?;

        let balance = to_ledger_scale(balance);
        self.balance = Some(balance);
        self.account.balance = balance;
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        Inner::injected(&self.inner.faults.commits, "commit")?;

        let mut tables = self.inner.write()?;
        if !tables.accounts.contains_key(&self.account.id) {
            return Err(StoreError::NotFound {
                entity: "account",
                id: self.account.id,
            });
        }

        for (id, mut transaction) in self.staged {
            // a source deleted since staging is nulled, as ON DELETE SET NULL would
            if let Some(source_id) = transaction.source_id {
                if !tables.sources.contains_key(&source_id) {
                    transaction.source_id = None;
                }
            }
            tables.transactions.insert(id, transaction);
        }

        if let Some(balance) = self.balance {
            if let Some(account) = tables.accounts.get_mut(&self.account.id) {
                account.balance = balance;
                account.updated_at = Utc::now();
            }
        }

        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    type Unit = MemoryLedgerUnit;

    async fn begin(&self, account_id: Uuid) -> Result<Self::Unit, StoreError> {
        let guard = self.lock_account(account_id).await?;

        let account = self
            .inner
            .read()?
            .accounts
            .get(&account_id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "account",
                id: account_id,
            })?;

        Ok(MemoryLedgerUnit {
            _guard: guard,
            inner: self.inner.clone(),
            account,
            staged: HashMap::new(),
            balance: None,
        })
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut tables = self.inner.write()?;
        if !tables.identities.contains_key(&account.owner_id) {
            return Err(StoreError::MissingReference("user".to_string()));
        }

        let now = Utc::now();
        let record = Account {
            id: Uuid::new_v4(),
            owner_id: account.owner_id,
            nickname: account.nickname,
            account_type: account.account_type,
            currency: account.currency,
            balance: to_ledger_scale(Decimal::ZERO),
            is_open: true,
            created_at: now,
            updated_at: now,
        };
        tables.accounts.insert(record.id, record.clone());
        Ok(record)
    }

    async fn account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.inner.read()?.accounts.get(&id).cloned())
    }

    async fn accounts_for_owner(&self, owner_id: Uuid) -> Result<Vec<Account>, StoreError> {
        let tables = self.inner.read()?;
        let mut accounts: Vec<Account> = tables
            .accounts
            .values()
            .filter(|account| account.owner_id == owner_id)
            .cloned()
            .collect();
        accounts.sort_by_key(|account| (account.created_at, account.id));
        Ok(accounts)
    }

    async fn update_account_details(
        &self,
        id: Uuid,
        nickname: &str,
        is_open: bool,
    ) -> Result<Account, StoreError> {
        let _guard = self.lock_account(id).await?;

        let mut tables = self.inner.write()?;
        let account = tables.accounts.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "account",
            id,
        })?;
        account.nickname = nickname.to_string();
        account.is_open = is_open;
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    async fn delete_account(&self, id: Uuid) -> Result<(), StoreError> {
        let _guard = self.lock_account(id).await?;

        let mut tables = self.inner.write()?;
        if !tables.accounts.contains_key(&id) {
            return Err(StoreError::NotFound {
                entity: "account",
                id,
            });
        }
        if tables.transactions.values().any(|tx| tx.account_id == id) {
            return Err(StoreError::DeleteProtected {
                entity: "account",
                id,
            });
        }
        tables.accounts.remove(&id);
        drop(tables);

        self.inner.forget_lock(id)?;
        Ok(())
    }

    async fn transaction(&self, id: Uuid) -> Result<Option<Transaction>, StoreError> {
        Ok(self.inner.read()?.transactions.get(&id).cloned())
    }

    async fn transactions_for_owner(
        &self,
        owner_id: Uuid,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, StoreError> {
        let tables = self.inner.read()?;
        let owned: HashSet<Uuid> = tables
            .accounts
            .values()
            .filter(|account| account.owner_id == owner_id)
            .map(|account| account.id)
            .collect();

        let mut transactions: Vec<Transaction> = tables
            .transactions
            .values()
            .filter(|tx| owned.contains(&tx.account_id) && filter.matches(tx))
            .cloned()
            .collect();
        transactions.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        Ok(transactions
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit() as usize)
            .collect())
    }

    async fn insert_source(
        &self,
        source: NewTransactionSource,
    ) -> Result<TransactionSource, StoreError> {
        let record = TransactionSource {
            id: Uuid::new_v4(),
            name: source.name,
            source_type: source.source_type,
            description: source.description,
            created_at: Utc::now(),
        };
        self.inner.write()?.sources.insert(record.id, record.clone());
        Ok(record)
    }

    async fn source(&self, id: Uuid) -> Result<Option<TransactionSource>, StoreError> {
        Ok(self.inner.read()?.sources.get(&id).cloned())
    }

    async fn sources(&self) -> Result<Vec<TransactionSource>, StoreError> {
        let mut sources: Vec<TransactionSource> =
            self.inner.read()?.sources.values().cloned().collect();
        sources.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(sources)
    }

    async fn update_source(
        &self,
        id: Uuid,
        source: NewTransactionSource,
    ) -> Result<TransactionSource, StoreError> {
        let mut tables = self.inner.write()?;
        let record = tables.sources.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "transaction source",
            id,
        })?;
        record.name = source.name;
        record.source_type = source.source_type;
        record.description = source.description;
        Ok(record.clone())
    }

    async fn delete_source(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.inner.write()?;
        if tables.sources.remove(&id).is_none() {
            return Err(StoreError::NotFound {
                entity: "transaction source",
                id,
            });
        }
        for transaction in tables.transactions.values_mut() {
            if transaction.source_id == Some(id) {
                transaction.source_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for MemoryLedgerStore {
    async fn register(
        &self,
        identity: NewIdentity,
        profile: NewProfile,
    ) -> Result<(Identity, Profile), StoreError> {
        let mut tables = self.inner.write()?;

        if tables
            .identities
            .values()
            .any(|existing| existing.username == identity.username)
        {
            return Err(StoreError::UniqueViolation("username".to_string()));
        }
        for existing in tables.profiles.values() {
            if profile.phone_number.is_some() && existing.phone_number == profile.phone_number {
                return Err(StoreError::UniqueViolation("phone_number".to_string()));
            }
            if existing.id_number == profile.id_number {
                return Err(StoreError::UniqueViolation("id_number".to_string()));
            }
            if existing.tax_number == profile.tax_number {
                return Err(StoreError::UniqueViolation("tax_number".to_string()));
            }
        }

        let now = Utc::now();
        let identity = Identity {
            id: Uuid::new_v4(),
            username: identity.username,
            email: identity.email,
            password_hash: identity.password_hash,
            is_active: true,
            created_at: now,
        };
        let profile = Profile {
            user_id: identity.id,
            phone_number: profile.phone_number,
            id_number: profile.id_number,
            tax_number: profile.tax_number,
            date_of_birth: profile.date_of_birth,
            address_id: None,
            tax_residency_id: None,
            banking_details_id: None,
            updated_at: now,
        };

        tables.identities.insert(identity.id, identity.clone());
        tables.profiles.insert(profile.user_id, profile.clone());
        Ok((identity, profile))
    }

    async fn identity(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        Ok(self.inner.read()?.identities.get(&id).cloned())
    }

    async fn identity_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self
            .inner
            .read()?
            .identities
            .values()
            .find(|identity| identity.username == username)
            .cloned())
    }

    async fn profile(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(self.inner.read()?.profiles.get(&user_id).cloned())
    }

    async fn put_detail(
        &self,
        user_id: Uuid,
        fields: DetailFields,
    ) -> Result<ProfileDetail, StoreError> {
        let mut tables = self.inner.write()?;
        let kind = fields.kind();
        let now = Utc::now();

        let linked = tables
            .profiles
            .get(&user_id)
            .ok_or(StoreError::NotFound {
                entity: "profile",
                id: user_id,
            })?
            .detail_id(kind)
            .filter(|id| tables.details.contains_key(id));

        let detail = ProfileDetail {
            id: linked.unwrap_or_else(Uuid::new_v4),
            fields,
            updated_at: now,
        };
        tables.details.insert(detail.id, detail.clone());

        if let Some(profile) = tables.profiles.get_mut(&user_id) {
            profile.set_detail_id(kind, Some(detail.id));
            profile.updated_at = now;
        }
        Ok(detail)
    }

    async fn detail(
        &self,
        user_id: Uuid,
        kind: DetailKind,
    ) -> Result<Option<ProfileDetail>, StoreError> {
        let tables = self.inner.read()?;
        Ok(tables
            .profiles
            .get(&user_id)
            .and_then(|profile| profile.detail_id(kind))
            .and_then(|id| tables.details.get(&id))
            .cloned())
    }

    async fn delete_detail(&self, user_id: Uuid, kind: DetailKind) -> Result<bool, StoreError> {
        let mut tables = self.inner.write()?;
        let linked = tables
            .profiles
            .get(&user_id)
            .and_then(|profile| profile.detail_id(kind));

        let Some(id) = linked else {
            return Ok(false);
        };
        tables.details.remove(&id);
        if let Some(profile) = tables.profiles.get_mut(&user_id) {
            profile.set_detail_id(kind, None);
            profile.updated_at = Utc::now();
        }
        Ok(true)
    }
}
