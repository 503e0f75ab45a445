//! Core data model definitions shared across vodkit crates.
#![allow(missing_docs)]

pub mod account;
pub mod commerce;
pub mod favorite;
pub mod integration;
pub mod lenient;
pub mod playlist;
pub mod service;
pub mod watch_history;

// Intentionally curated re-exports for downstream consumers.
pub use account::{
    AuthData, AuthResponse, ConsentState, ConsentsValue, CustomFormField,
    Customer, ExternalData, FormFieldVariant, RegistrationFields,
    UpdateCustomerArgs, UserPayload,
};
pub use commerce::{
    Entitlement, Offer, Order, PaymentDetail, PaymentMethod, Subscription,
    SubscriptionStatus, SubscriptionSwitch, Transaction,
};
pub use favorite::{Favorite, SerializedFavorite};
pub use integration::{AccessModel, IntegrationType};
pub use playlist::PlaylistItem;
pub use service::{CommonAccountResponse, ServiceResponse, SocialUrl};
pub use watch_history::{SerializedWatchHistoryItem, WatchHistoryItem};
