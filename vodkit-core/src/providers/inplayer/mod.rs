//! InPlayer (JW Player) integration, driven through an injected SDK binding.

mod account;
mod checkout;
mod sdk;
mod subscription;

pub use account::InPlayerAccountService;
pub use checkout::InPlayerCheckoutService;
pub use sdk::{
    AccessFeeRecord, AccountRecord, AssetAccessRecord, CardDetails, CardRecord,
    FavoriteRecord, InPlayerSdk, PaymentHistoryRecord, PaymentMethodRecord,
    RegisterFieldRecord, SdkCredentials, SdkEnvironment, SdkError, SdkResult,
    SignInArgs, SignInRecord, SignUpArgs, SubscriptionRecord,
    UpdateAccountData, WatchHistoryRecord,
};
pub use subscription::InPlayerSubscriptionService;
