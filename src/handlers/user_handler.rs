//! User Handler
//!
//! Registration, login and profile detail management.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{DomainError, OperationContext};
use crate::error::AppError;
use crate::identity::validation::{
    optional_text, required_text, validate_email, validate_id_number, validate_password,
    validate_phone_number, validate_tax_number, validate_username,
};
use crate::identity::{
    hash_password, verify_password, AddressFields, BankingFields, DetailFields, DetailKind,
    NewIdentity, NewProfile, PasswordError, Profile, TaxResidencyFields,
};
use crate::store::IdentityStore;

use super::{LoginCommand, ProfileDetailResult, RegisterCommand, UserResult};

// =========================================================================
// UserHandler
// =========================================================================

/// Handler for identity and profile operations
pub struct UserHandler<S> {
    store: Arc<S>,
}

impl<S: IdentityStore> UserHandler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Register a user; unique fields already taken report `Duplicate`
    pub async fn register(&self, command: RegisterCommand) -> Result<UserResult, AppError> {
        let username = command.username.trim().to_string();
        validate_username(&username)?;
        validate_email(&command.email)?;
        validate_password(&command.password, &command.password_confirm)?;
        validate_id_number(&command.id_number)?;
        validate_tax_number(&command.tax_number)?;

        let phone_number = match command.phone_number.map(|p| p.trim().to_string()) {
            Some(phone) if phone.is_empty() => None,
            Some(phone) => {
                validate_phone_number(&phone)?;
                Some(phone)
            }
            None => None,
        };

        let password_hash = hash_password(&command.password).await?;

        let (user, profile) = self
            .store
            .register(
                NewIdentity {
                    username,
                    email: command.email.trim().to_string(),
                    password_hash,
                },
                NewProfile {
                    phone_number,
                    id_number: command.id_number,
                    tax_number: command.tax_number.trim().to_string(),
                    date_of_birth: command.date_of_birth,
                },
            )
            .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");

        Ok(UserResult { user, profile })
    }

    /// Check credentials. Unknown user and wrong password fail the same way.
    pub async fn login(&self, command: LoginCommand) -> Result<UserResult, AppError> {
        if command.username.trim().is_empty() || command.password.is_empty() {
            return Err(DomainError::validation("username and password are required").into());
        }

        let Some(user) = self.store.identity_by_username(command.username.trim()).await? else {
            tracing::debug!("Login failed: unknown username");
            return Err(AppError::InvalidCredentials);
        };

        let verified = match verify_password(&command.password, &user.password_hash).await {
            Ok(verified) => verified,
            Err(PasswordError::MalformedHash) => {
                return Err(AppError::Internal(format!(
                    "credential of user {} cannot be checked",
                    user.id
                )));
            }
            Err(e) => return Err(e.into()),
        };

        if !user.is_active || !verified {
            tracing::debug!(user_id = %user.id, "Login failed: bad password or inactive user");
            return Err(AppError::InvalidCredentials);
        }

        let profile = self.profile_of(user.id).await?;
        tracing::info!(user_id = %user.id, "User logged in");

        Ok(UserResult { user, profile })
    }

    pub async fn profile(&self, context: &OperationContext) -> Result<Profile, AppError> {
        self.profile_of(context.require_user()?).await
    }

    async fn profile_of(&self, user_id: Uuid) -> Result<Profile, AppError> {
        self.store
            .profile(user_id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound(user_id.to_string()).into())
    }

    // =========================================================================
    // Profile details
    // =========================================================================

    /// Create or replace the caller's detail record of `kind`
    pub async fn put_detail(
        &self,
        kind: DetailKind,
        body: serde_json::Value,
        context: &OperationContext,
    ) -> Result<ProfileDetailResult, AppError> {
        let user_id = context.require_user()?;
        let fields = parse_detail(kind, body)?;

        let detail = self.store.put_detail(user_id, fields).await?;
        tracing::info!(user_id = %user_id, kind = %kind, detail_id = %detail.id, "Profile detail saved");

        Ok(detail.into())
    }

    pub async fn get_detail(
        &self,
        kind: DetailKind,
        context: &OperationContext,
    ) -> Result<ProfileDetailResult, AppError> {
        let user_id = context.require_user()?;
        self.store
            .detail(user_id, kind)
            .await?
            .map(Into::into)
            .ok_or_else(|| DomainError::DetailNotFound(format!("{} for {}", kind, user_id)).into())
    }

    /// Delete the caller's detail record; the profile reference becomes null
    pub async fn delete_detail(
        &self,
        kind: DetailKind,
        context: &OperationContext,
    ) -> Result<(), AppError> {
        let user_id = context.require_user()?;
        if !self.store.delete_detail(user_id, kind).await? {
            return Err(DomainError::DetailNotFound(format!("{} for {}", kind, user_id)).into());
        }

        tracing::info!(user_id = %user_id, kind = %kind, "Profile detail deleted");
        Ok(())
    }
}

/// Decode and check the body of a detail PUT
fn parse_detail(kind: DetailKind, body: serde_json::Value) -> Result<DetailFields, AppError> {
    let invalid = |e: serde_json::Error| AppError::InvalidRequest(e.to_string());

    let fields = match kind {
        DetailKind::Address => {
            let a: AddressFields = serde_json::from_value(body).map_err(invalid)?;
            DetailFields::Address(AddressFields {
                line1: required_text("line1", &a.line1, 255)?,
                line2: optional_text("line2", a.line2, 255)?,
                city: required_text("city", &a.city, 100)?,
                province: required_text("province", &a.province, 100)?,
                postal_code: required_text("postal_code", &a.postal_code, 20)?,
                country: required_text("country", &a.country, 100)?,
            })
        }
        DetailKind::TaxResidency => {
            let t: TaxResidencyFields = serde_json::from_value(body).map_err(invalid)?;
            DetailFields::TaxResidency(TaxResidencyFields {
                country: required_text("country", &t.country, 100)?,
                tax_identifier: required_text("tax_identifier", &t.tax_identifier, 50)?,
                is_primary: t.is_primary,
            })
        }
        DetailKind::Banking => {
            let b: BankingFields = serde_json::from_value(body).map_err(invalid)?;
            let account_number = required_text("account_number", &b.account_number, 34)?;
            if !account_number.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(DomainError::validation("account_number must be alphanumeric").into());
            }
            DetailFields::Banking(BankingFields {
                bank_name: required_text("bank_name", &b.bank_name, 100)?,
                account_holder: required_text("account_holder", &b.account_holder, 150)?,
                account_number,
                branch_code: required_text("branch_code", &b.branch_code, 20)?,
                account_type: required_text("account_type", &b.account_type, 50)?,
            })
        }
    };
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_detail_trims_and_checks() {
        let fields = parse_detail(
            DetailKind::TaxResidency,
            json!({"country": " ZA ", "tax_identifier": "0123456789"}),
        )
        .unwrap();

        match fields {
            DetailFields::TaxResidency(t) => {
                assert_eq!(t.country, "ZA");
                assert!(!t.is_primary);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_detail_rejects_bad_input() {
        let err = parse_detail(DetailKind::Address, json!({"line1": "1 Main"})).unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));

        let err = parse_detail(
            DetailKind::Banking,
            json!({
                "bank_name": "First Bank",
                "account_holder": "A Smith",
                "account_number": "62-0012",
                "branch_code": "250655",
                "account_type": "cheque"
            }),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Domain(DomainError::Validation(_))));
    }
}
