//! Postgres store
//!
//! A unit of work is one database transaction that starts with
//! `SELECT ... FOR UPDATE` on the account row. Concurrent units on the same
//! account queue behind that row lock until the holder commits or rolls back.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction as PgTransaction};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::{
    to_ledger_scale, Account, NewAccount, NewTransactionSource, Transaction, TransactionSource,
};
use crate::identity::{
    AddressFields, BankingFields, DetailFields, DetailKind, Identity, NewIdentity, NewProfile,
    Profile, ProfileDetail, TaxResidencyFields,
};

use super::{IdentityStore, LedgerStore, LedgerUnit, StoreError, TransactionFilter};

// =========================================================================
// Row types
// =========================================================================

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    owner_id: Uuid,
    nickname: String,
    account_type: String,
    currency: String,
    balance: Decimal,
    is_open: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account {
            id: row.id,
            owner_id: row.owner_id,
            nickname: row.nickname,
            account_type: parse_column(&row.account_type)?,
            currency: parse_column(&row.currency)?,
            balance: row.balance,
            is_open: row.is_open,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    account_id: Uuid,
    transaction_type: String,
    amount: Decimal,
    status: String,
    reference: Option<String>,
    source_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: row.id,
            account_id: row.account_id,
            transaction_type: parse_column(&row.transaction_type)?,
            amount: row.amount,
            status: parse_column(&row.status)?,
            reference: row.reference,
            source_id: row.source_id,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SourceRow {
    id: Uuid,
    name: String,
    source_type: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<SourceRow> for TransactionSource {
    fn from(row: SourceRow) -> Self {
        TransactionSource {
            id: row.id,
            name: row.name,
            source_type: row.source_type,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct IdentityRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<IdentityRow> for Identity {
    fn from(row: IdentityRow) -> Self {
        Identity {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    user_id: Uuid,
    phone_number: Option<String>,
    id_number: String,
    tax_number: String,
    date_of_birth: Option<NaiveDate>,
    address_id: Option<Uuid>,
    tax_residency_id: Option<Uuid>,
    banking_details_id: Option<Uuid>,
    updated_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            user_id: row.user_id,
            phone_number: row.phone_number,
            id_number: row.id_number,
            tax_number: row.tax_number,
            date_of_birth: row.date_of_birth,
            address_id: row.address_id,
            tax_residency_id: row.tax_residency_id,
            banking_details_id: row.banking_details_id,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: Uuid,
    line1: String,
    line2: Option<String>,
    city: String,
    province: String,
    postal_code: String,
    country: String,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct TaxResidencyRow {
    id: Uuid,
    country: String,
    tax_identifier: String,
    is_primary: bool,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct BankingRow {
    id: Uuid,
    bank_name: String,
    account_holder: String,
    account_number: String,
    branch_code: String,
    account_type: String,
    updated_at: DateTime<Utc>,
}

fn parse_column<T>(value: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| StoreError::InvalidData(e.to_string()))
}

const ACCOUNT_COLUMNS: &str =
    "id, owner_id, nickname, account_type, currency, balance, is_open, created_at, updated_at";
const TRANSACTION_COLUMNS: &str =
    "id, account_id, transaction_type, amount, status, reference, source_id, created_at";

/// Table and profile reference column for each detail kind
fn detail_table(kind: DetailKind) -> (&'static str, &'static str) {
    match kind {
        DetailKind::Address => ("address_details", "address_id"),
        DetailKind::TaxResidency => ("tax_residency_details", "tax_residency_id"),
        DetailKind::Banking => ("banking_details", "banking_details_id"),
    }
}

// =========================================================================
// Unit of work
// =========================================================================

/// Open database transaction holding the account row lock
pub struct PgLedgerUnit {
    tx: PgTransaction<'static, Postgres>,
    account: Account,
}

#[async_trait]
impl LedgerUnit for PgLedgerUnit {
    fn account(&self) -> &Account {
        &self.account
    }

    async fn transaction(&mut self, id: Uuid) -> Result<Option<Transaction>, StoreError> {
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions WHERE id = $1 AND account_id = $2",
            TRANSACTION_COLUMNS
        ))
        .bind(id)
        .bind(self.account.id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Transaction::try_from).transpose()
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError> {
        if transaction.account_id != self.account.id {
            return Err(StoreError::InvalidData(format!(
                "transaction {} belongs to account {}, unit holds {}",
                transaction.id, transaction.account_id, self.account.id
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, account_id, transaction_type, amount,
                status, reference, source_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(transaction.id)
        .bind(transaction.account_id)
        .bind(transaction.transaction_type.as_str())
        .bind(to_ledger_scale(transaction.amount))
        .bind(transaction.status.as_str())
        .bind(&transaction.reference)
        .bind(transaction.source_id)
        .bind(transaction.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn update_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = $1, reference = $2, source_id = $3
            WHERE id = $4 AND account_id = $5
            "#,
        )
        .bind(transaction.status.as_str())
        .bind(&transaction.reference)
        .bind(transaction.source_id)
        .bind(transaction.id)
        .bind(self.account.id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "transaction",
                id: transaction.id,
            });
        }
        Ok(())
    }

    async fn set_balance(&mut self, balance: Decimal) -> Result<(), StoreError> {
        let row: AccountRow = sqlx::query_as(&format!(
            "UPDATE accounts SET balance = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
            ACCOUNT_COLUMNS
        ))
        .bind(to_ledger_scale(balance))
        .bind(self.account.id)
        .fetch_one(&mut *self.tx)
        .await?;

        self.account = Account::try_from(row)?;
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}

// =========================================================================
// Store
// =========================================================================

/// Ledger and identity store backed by a Postgres pool
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_detail(
        &self,
        kind: DetailKind,
        id: Uuid,
    ) -> Result<Option<ProfileDetail>, StoreError> {
        let detail = match kind {
            DetailKind::Address => sqlx::query_as::<_, AddressRow>(
                r#"
                SELECT id, line1, line2, city, province, postal_code, country, updated_at
                FROM address_details WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| ProfileDetail {
                id: row.id,
                fields: DetailFields::Address(AddressFields {
                    line1: row.line1,
                    line2: row.line2,
                    city: row.city,
                    province: row.province,
                    postal_code: row.postal_code,
                    country: row.country,
                }),
                updated_at: row.updated_at,
            }),
            DetailKind::TaxResidency => sqlx::query_as::<_, TaxResidencyRow>(
                r#"
                SELECT id, country, tax_identifier, is_primary, updated_at
                FROM tax_residency_details WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| ProfileDetail {
                id: row.id,
                fields: DetailFields::TaxResidency(TaxResidencyFields {
                    country: row.country,
                    tax_identifier: row.tax_identifier,
                    is_primary: row.is_primary,
                }),
                updated_at: row.updated_at,
            }),
            DetailKind::Banking => sqlx::query_as::<_, BankingRow>(
                r#"
                SELECT id, bank_name, account_holder, account_number, branch_code,
                       account_type, updated_at
                FROM banking_details WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| ProfileDetail {
                id: row.id,
                fields: DetailFields::Banking(BankingFields {
                    bank_name: row.bank_name,
                    account_holder: row.account_holder,
                    account_number: row.account_number,
                    branch_code: row.branch_code,
                    account_type: row.account_type,
                }),
                updated_at: row.updated_at,
            }),
        };
        Ok(detail)
    }
}

/// Insert or overwrite one detail row inside `tx`
async fn upsert_detail(
    tx: &mut PgTransaction<'_, Postgres>,
    id: Uuid,
    fields: &DetailFields,
) -> Result<DateTime<Utc>, StoreError> {
    let updated_at: DateTime<Utc> = match fields {
        DetailFields::Address(a) => sqlx::query_scalar(
            r#"
            INSERT INTO address_details (id, line1, line2, city, province, postal_code, country)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                line1 = $2, line2 = $3, city = $4, province = $5,
                postal_code = $6, country = $7, updated_at = NOW()
            RETURNING updated_at
            "#,
        )
        .bind(id)
        .bind(&a.line1)
        .bind(&a.line2)
        .bind(&a.city)
        .bind(&a.province)
        .bind(&a.postal_code)
        .bind(&a.country)
        .fetch_one(&mut **tx)
        .await?,
        DetailFields::TaxResidency(t) => sqlx::query_scalar(
            r#"
            INSERT INTO tax_residency_details (id, country, tax_identifier, is_primary)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                country = $2, tax_identifier = $3, is_primary = $4, updated_at = NOW()
            RETURNING updated_at
            "#,
        )
        .bind(id)
        .bind(&t.country)
        .bind(&t.tax_identifier)
        .bind(t.is_primary)
        .fetch_one(&mut **tx)
        .await?,
        DetailFields::Banking(b) => sqlx::query_scalar(
            r#"
            INSERT INTO banking_details (
                id, bank_name, account_holder, account_number, branch_code, account_type
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                bank_name = $2, account_holder = $3, account_number = $4,
                branch_code = $5, account_type = $6, updated_at = NOW()
            RETURNING updated_at
            "#,
        )
        .bind(id)
        .bind(&b.bank_name)
        .bind(&b.account_holder)
        .bind(&b.account_number)
        .bind(&b.branch_code)
        .bind(&b.account_type)
        .fetch_one(&mut **tx)
        .await?,
    };
    Ok(updated_at)
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Unit = PgLedgerUnit;

    async fn begin(&self, account_id: Uuid) -> Result<Self::Unit, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM accounts WHERE id = $1 FOR UPDATE",
            ACCOUNT_COLUMNS
        ))
        .bind(account_id)
        .fetch_optional(&mut *tx)
        .await?;

        let account = row
            .ok_or(StoreError::NotFound {
                entity: "account",
                id: account_id,
            })?
            .try_into()?;

        Ok(PgLedgerUnit { tx, account })
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let row: AccountRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO accounts (id, owner_id, nickname, account_type, currency, balance)
            VALUES ($1, $2, $3, $4, $5, 0)
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(account.owner_id)
        .bind(&account.nickname)
        .bind(account.account_type.as_str())
        .bind(account.currency.as_str())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM accounts WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Account::try_from).transpose()
    }

    async fn accounts_for_owner(&self, owner_id: Uuid) -> Result<Vec<Account>, StoreError> {
        let rows: Vec<AccountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM accounts WHERE owner_id = $1 ORDER BY created_at, id",
            ACCOUNT_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Account::try_from).collect()
    }

    async fn update_account_details(
        &self,
        id: Uuid,
        nickname: &str,
        is_open: bool,
    ) -> Result<Account, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            r#"
            UPDATE accounts SET nickname = $1, is_open = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(nickname)
        .bind(is_open)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StoreError::NotFound {
            entity: "account",
            id,
        })?
        .try_into()
    }

    async fn delete_account(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match StoreError::from(e) {
                StoreError::MissingReference(_) => StoreError::DeleteProtected {
                    entity: "account",
                    id,
                },
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "account",
                id,
            });
        }
        Ok(())
    }

    async fn transaction(&self, id: Uuid) -> Result<Option<Transaction>, StoreError> {
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions WHERE id = $1",
            TRANSACTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Transaction::try_from).transpose()
    }

    async fn transactions_for_owner(
        &self,
        owner_id: Uuid,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, StoreError> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT t.id, t.account_id, t.transaction_type, t.amount, t.status,
                   t.reference, t.source_id, t.created_at
            FROM transactions t
            JOIN accounts a ON a.id = t.account_id
            WHERE a.owner_id = "#,
        );
        query.push_bind(owner_id);

        if let Some(account_id) = filter.account_id {
            query.push(" AND t.account_id = ").push_bind(account_id);
        }
        if let Some(kind) = filter.transaction_type {
            query.push(" AND t.transaction_type = ").push_bind(kind.as_str());
        }
        if let Some(status) = filter.status {
            query.push(" AND t.status = ").push_bind(status.as_str());
        }
        if let Some(source_id) = filter.source_id {
            query.push(" AND t.source_id = ").push_bind(source_id);
        }
        if let Some(after) = filter.created_after {
            query.push(" AND t.created_at >= ").push_bind(after);
        }
        if let Some(before) = filter.created_before {
            query.push(" AND t.created_at < ").push_bind(before);
        }

        query
            .push(" ORDER BY t.created_at DESC, t.id DESC LIMIT ")
            .push_bind(filter.limit())
            .push(" OFFSET ")
            .push_bind(filter.offset());

        let rows: Vec<TransactionRow> = query.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn insert_source(
        &self,
        source: NewTransactionSource,
    ) -> Result<TransactionSource, StoreError> {
        let row: SourceRow = sqlx::query_as(
            r#"
            INSERT INTO transaction_sources (id, name, source_type, description)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, source_type, description, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&source.name)
        .bind(&source.source_type)
        .bind(&source.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn source(&self, id: Uuid) -> Result<Option<TransactionSource>, StoreError> {
        let row: Option<SourceRow> = sqlx::query_as(
            r#"
            SELECT id, name, source_type, description, created_at
            FROM transaction_sources WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn sources(&self) -> Result<Vec<TransactionSource>, StoreError> {
        let rows: Vec<SourceRow> = sqlx::query_as(
            r#"
            SELECT id, name, source_type, description, created_at
            FROM transaction_sources ORDER BY name, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_source(
        &self,
        id: Uuid,
        source: NewTransactionSource,
    ) -> Result<TransactionSource, StoreError> {
        let row: Option<SourceRow> = sqlx::query_as(
            r#"
            UPDATE transaction_sources SET name = $1, source_type = $2, description = $3
            WHERE id = $4
            RETURNING id, name, source_type, description, created_at
            "#,
        )
        .bind(&source.name)
        .bind(&source.source_type)
        .bind(&source.description)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into).ok_or(StoreError::NotFound {
            entity: "transaction source",
            id,
        })
    }

    async fn delete_source(&self, id: Uuid) -> Result<(), StoreError> {
        // transactions.source_id is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM transaction_sources WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "transaction source",
                id,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for PgLedgerStore {
    async fn register(
        &self,
        identity: NewIdentity,
        profile: NewProfile,
    ) -> Result<(Identity, Profile), StoreError> {
        let mut tx = self.pool.begin().await?;

        let identity_row: IdentityRow = sqlx::query_as(
            r#"
            INSERT INTO users (id, username, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password_hash, is_active, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&identity.username)
        .bind(&identity.email)
        .bind(&identity.password_hash)
        .fetch_one(&mut *tx)
        .await?;

        let profile_row: ProfileRow = sqlx::query_as(
            r#"
            INSERT INTO profiles (user_id, phone_number, id_number, tax_number, date_of_birth)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING user_id, phone_number, id_number, tax_number, date_of_birth,
                      address_id, tax_residency_id, banking_details_id, updated_at
            "#,
        )
        .bind(identity_row.id)
        .bind(&profile.phone_number)
        .bind(&profile.id_number)
        .bind(&profile.tax_number)
        .bind(profile.date_of_birth)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((identity_row.into(), profile_row.into()))
    }

    async fn identity(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        let row: Option<IdentityRow> = sqlx::query_as(
            r#"
            SELECT id, username, email, password_hash, is_active, created_at
            FROM users WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn identity_by_username(&self, username: &str) -> Result<Option<Identity>, StoreError> {
        let row: Option<IdentityRow> = sqlx::query_as(
            r#"
            SELECT id, username, email, password_hash, is_active, created_at
            FROM users WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn profile(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        let row: Option<ProfileRow> = sqlx::query_as(
            r#"
            SELECT user_id, phone_number, id_number, tax_number, date_of_birth,
                   address_id, tax_residency_id, banking_details_id, updated_at
            FROM profiles WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn put_detail(
        &self,
        user_id: Uuid,
        fields: DetailFields,
    ) -> Result<ProfileDetail, StoreError> {
        let kind = fields.kind();
        let (_, column) = detail_table(kind);
        let mut tx = self.pool.begin().await?;

        let linked: Option<Option<Uuid>> = sqlx::query_scalar(&format!(
            "SELECT {} FROM profiles WHERE user_id = $1 FOR UPDATE",
            column
        ))
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(linked) = linked else {
            return Err(StoreError::NotFound {
                entity: "profile",
                id: user_id,
            });
        };

        let id = linked.unwrap_or_else(Uuid::new_v4);
        let updated_at = upsert_detail(&mut tx, id, &fields).await?;

        sqlx::query(&format!(
            "UPDATE profiles SET {} = $1, updated_at = NOW() WHERE user_id = $2",
            column
        ))
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ProfileDetail {
            id,
            fields,
            updated_at,
        })
    }

    async fn detail(
        &self,
        user_id: Uuid,
        kind: DetailKind,
    ) -> Result<Option<ProfileDetail>, StoreError> {
        let linked = self
            .profile(user_id)
            .await?
            .and_then(|profile| profile.detail_id(kind));

        match linked {
            Some(id) => self.load_detail(kind, id).await,
            None => Ok(None),
        }
    }

    async fn delete_detail(&self, user_id: Uuid, kind: DetailKind) -> Result<bool, StoreError> {
        let (table, column) = detail_table(kind);

        // profiles.<column> is ON DELETE SET NULL
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE id = (SELECT {} FROM profiles WHERE user_id = $1)",
            table, column
        ))
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
