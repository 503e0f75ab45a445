//! Error types surfaced by the session orchestrator and shelf reconcilers.

use thiserror::Error;
use vodkit_contracts::error::ProviderError;
use vodkit_contracts::storage::StorageError;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("User not logged in")]
    NotLoggedIn,

    #[error("Email update not supported")]
    EmailUpdateUnsupported,

    /// The active provider does not implement the operation.
    #[error("{operation} is not available in {service} service")]
    OperationUnavailable {
        operation: &'static str,
        service: &'static str,
    },

    /// The provider implements the operation but the tenant has it disabled.
    #[error("{0} feature is not enabled for the active integration")]
    FeatureDisabled(&'static str),

    #[error("User has no active subscription")]
    NoActiveSubscription,

    /// A provider rejection that the caller asked to surface as an error.
    #[error("{0}")]
    Rejected(String),

    #[error("Integration not configured")]
    IntegrationMissing,
}

impl AccountError {
    /// True when the session credentials were rejected by the provider.
    pub fn is_invalid_token(&self) -> bool {
        matches!(self, AccountError::Provider(err) if err.is_invalid_token())
    }

    /// Capability errors raised before any provider call.
    pub fn is_capability_missing(&self) -> bool {
        matches!(
            self,
            AccountError::OperationUnavailable { .. }
                | AccountError::FeatureDisabled(_)
                | AccountError::EmailUpdateUnsupported
                | AccountError::Provider(ProviderError::OperationUnavailable(_))
        )
    }
}

pub type AccountResult<T> = Result<T, AccountError>;

/// Fail fast when an optional provider operation is absent.
pub(crate) fn ensure_operation(
    supported: bool,
    operation: &'static str,
    service: &'static str,
) -> AccountResult<()> {
    if supported {
        Ok(())
    } else {
        Err(AccountError::OperationUnavailable { operation, service })
    }
}

/// Fail fast when a feature flag is off.
pub(crate) fn ensure_feature(
    enabled: bool,
    feature: &'static str,
) -> AccountResult<()> {
    if enabled {
        Ok(())
    } else {
        Err(AccountError::FeatureDisabled(feature))
    }
}
