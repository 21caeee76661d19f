//! Transaction listing filter

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::{Transaction, TransactionStatus, TransactionType};

/// Optional predicates for listing a caller's transactions.
/// Owner scoping is applied by the store, not by this filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    #[serde(default)]
    pub account_id: Option<Uuid>,
    #[serde(default, rename = "type")]
    pub transaction_type: Option<TransactionType>,
    #[serde(default)]
    pub status: Option<TransactionStatus>,
    #[serde(default)]
    pub source_id: Option<Uuid>,
    #[serde(default)]
    pub created_after: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

impl TransactionFilter {
    pub const DEFAULT_LIMIT: i64 = 100;
    pub const MAX_LIMIT: i64 = 1000;

    /// Only transactions of one account
    pub fn for_account(account_id: Uuid) -> Self {
        Self {
            account_id: Some(account_id),
            ..Self::default()
        }
    }

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    /// Whether `transaction` passes every set predicate
    pub fn matches(&self, transaction: &Transaction) -> bool {
        self.account_id.map_or(true, |id| transaction.account_id == id)
            && self
                .transaction_type
                .map_or(true, |kind| transaction.transaction_type == kind)
            && self.status.map_or(true, |status| transaction.status == status)
            && self
                .source_id
                .map_or(true, |id| transaction.source_id == Some(id))
            && self
                .created_after
                .map_or(true, |after| transaction.created_at >= after)
            && self
                .created_before
                .map_or(true, |before| transaction.created_at < before)
    }
}
