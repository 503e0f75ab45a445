use serde::{Deserialize, Serialize};

/// Capabilities a provider enables for the current tenant.
///
/// Calling code branches on these flags, never on provider identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountServiceFeatures {
    pub can_update_email: bool,
    pub can_support_empty_full_name: bool,
    pub can_change_password_with_old_password: bool,
    pub can_renew_subscription: bool,
    pub can_export_account_data: bool,
    pub can_delete_account: bool,
    pub can_update_payment_method: bool,
    pub can_show_receipts: bool,
    #[serde(rename = "hasSocialURLs")]
    pub has_social_urls: bool,
    pub has_notifications: bool,
}

/// Features reported when no integration is configured.
pub const DEFAULT_FEATURES: AccountServiceFeatures = AccountServiceFeatures {
    can_update_email: false,
    can_support_empty_full_name: false,
    can_change_password_with_old_password: false,
    can_renew_subscription: false,
    can_export_account_data: false,
    can_delete_account: false,
    can_update_payment_method: false,
    can_show_receipts: false,
    has_social_urls: false,
    has_notifications: false,
};

/// Optional identity operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountOperation {
    ExportAccountData,
    DeleteAccount,
    GetSocialUrls,
    SubscribeToNotifications,
}

impl AccountOperation {
    pub fn name(self) -> &'static str {
        match self {
            AccountOperation::ExportAccountData => "exportAccountData",
            AccountOperation::DeleteAccount => "deleteAccount",
            AccountOperation::GetSocialUrls => "getSocialUrls",
            AccountOperation::SubscribeToNotifications => {
                "subscribeToNotifications"
            }
        }
    }
}

/// Optional checkout operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckoutOperation {
    GetOffer,
    GetSubscriptionSwitch,
}

impl CheckoutOperation {
    pub fn name(self) -> &'static str {
        match self {
            CheckoutOperation::GetOffer => "getOffer",
            CheckoutOperation::GetSubscriptionSwitch => "getSubscriptionSwitch",
        }
    }
}

/// Optional subscription operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionOperation {
    FetchReceipt,
    UpdateCardDetails,
    ChangeSubscription,
}

impl SubscriptionOperation {
    pub fn name(self) -> &'static str {
        match self {
            SubscriptionOperation::FetchReceipt => "fetchReceipt",
            SubscriptionOperation::UpdateCardDetails => "updateCardDetails",
            SubscriptionOperation::ChangeSubscription => "changeSubscription",
        }
    }
}
