//! Transaction Source Handler
//!
//! Sources are shared descriptive tags; they are not owned by a user.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{DomainError, NewTransactionSource, OperationContext, TransactionSource};
use crate::error::AppError;
use crate::identity::validation::{optional_text, required_text};
use crate::store::LedgerStore;

use super::SourceCommand;

const MAX_NAME_LEN: usize = 100;
const MAX_SOURCE_TYPE_LEN: usize = 50;
const MAX_DESCRIPTION_LEN: usize = 1000;

/// Handler for transaction source operations
pub struct SourceHandler<S> {
    store: Arc<S>,
}

impl<S: LedgerStore> SourceHandler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn validate(command: SourceCommand) -> Result<NewTransactionSource, AppError> {
        Ok(NewTransactionSource {
            name: required_text("name", &command.name, MAX_NAME_LEN)?,
            source_type: required_text("source_type", &command.source_type, MAX_SOURCE_TYPE_LEN)?,
            description: optional_text("description", command.description, MAX_DESCRIPTION_LEN)?,
        })
    }

    pub async fn create(
        &self,
        command: SourceCommand,
        context: &OperationContext,
    ) -> Result<TransactionSource, AppError> {
        let source = self.store.insert_source(Self::validate(command)?).await?;

        tracing::info!(
            source_id = %source.id,
            name = %source.name,
            api_key = ?context.api_key_name,
            "Transaction source created"
        );
        Ok(source)
    }

    pub async fn get(&self, source_id: Uuid) -> Result<TransactionSource, AppError> {
        self.store
            .source(source_id)
            .await?
            .ok_or_else(|| DomainError::SourceNotFound(source_id.to_string()).into())
    }

    pub async fn list(&self) -> Result<Vec<TransactionSource>, AppError> {
        Ok(self.store.sources().await?)
    }

    pub async fn update(
        &self,
        source_id: Uuid,
        command: SourceCommand,
    ) -> Result<TransactionSource, AppError> {
        Ok(self
            .store
            .update_source(source_id, Self::validate(command)?)
            .await?)
    }

    /// Delete a source; referencing transactions keep existing without one
    pub async fn delete(&self, source_id: Uuid, context: &OperationContext) -> Result<(), AppError> {
        self.store.delete_source(source_id).await?;

        tracing::info!(
            source_id = %source_id,
            api_key = ?context.api_key_name,
            "Transaction source deleted"
        );
        Ok(())
    }
}
