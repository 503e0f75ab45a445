//! Capability contracts that every identity and commerce provider implements.
//!
//! The session orchestrator only ever talks to these traits; a concrete
//! provider is bound once at process start.

#![allow(missing_docs)]

pub mod account;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod features;
pub mod storage;
pub mod subscription;

/// Frequently used contract surfaces for orchestration crates.
pub mod prelude {
    pub use super::account::{
        AccountService, AuthOutcome, ChangePasswordWithOldPasswordArgs,
        ChangePasswordWithTokenArgs, LoginArgs, Notification,
        NotificationHandler, RegisterArgs,
    };
    pub use super::catalog::CatalogService;
    pub use super::checkout::{
        CheckoutService, CreateOrderArgs, SwitchSubscriptionArgs,
    };
    pub use super::error::{ProviderError, ProviderResult};
    pub use super::features::{
        AccountOperation, AccountServiceFeatures, CheckoutOperation,
        DEFAULT_FEATURES, SubscriptionOperation,
    };
    pub use super::storage::{PreferenceStore, StorageError, StorageResult};
    pub use super::subscription::{
        ChangeSubscriptionArgs, SubscriptionService, UpdateCardDetailsArgs,
        UpdateSubscriptionArgs,
    };
}
