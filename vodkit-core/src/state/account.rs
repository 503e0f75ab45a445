use vodkit_model::{
    AuthData, ConsentsValue, CustomFormField, Customer, Offer, PaymentDetail,
    Subscription, SubscriptionStatus, Transaction,
};

use super::LoadingFlag;

/// Session lifecycle as seen by presentation code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated,
    /// Re-fetching the customer of an authenticated session.
    Refreshing,
}

/// Subscription-dependent view derived from [`AccountState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionView {
    Unknown,
    Loading,
    None,
    Active,
    PendingSwitch,
    Cancelled,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountState {
    pub status: SessionStatus,
    pub loading: LoadingFlag,
    pub user: Option<Customer>,
    pub auth: Option<AuthData>,
    pub customer_consents: Option<Vec<ConsentsValue>>,
    pub publisher_consents: Option<Vec<CustomFormField>>,
    pub subscription: Option<Subscription>,
    pub transactions: Option<Vec<Transaction>>,
    pub active_payment: Option<PaymentDetail>,
    pub pending_offer: Option<Offer>,
    pub subscription_reloading: LoadingFlag,
    pub subscription_loaded: bool,
}

impl AccountState {
    /// State right after logout or a rejected session.
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn customer_id(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.id.as_str())
    }

    pub fn subscription_view(&self) -> SubscriptionView {
        if self.subscription_reloading.is_set() {
            return SubscriptionView::Loading;
        }
        if !self.subscription_loaded {
            return SubscriptionView::Unknown;
        }
        match &self.subscription {
            None => SubscriptionView::None,
            Some(sub) if sub.pending_switch_id.is_some() => {
                SubscriptionView::PendingSwitch
            }
            Some(sub) if sub.status == SubscriptionStatus::Cancelled => {
                SubscriptionView::Cancelled
            }
            Some(sub) if sub.is_current() => SubscriptionView::Active,
            Some(_) => SubscriptionView::None,
        }
    }
}
