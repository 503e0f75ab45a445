//! # vodkit-core
//!
//! Account and entitlement synchronization for a streaming client.
//!
//! - [`session`]: login, logout, consents and the session lifecycle
//! - [`shelves`]: favorites and watch history, reconciled between the local
//!   preference store and the signed-in account
//! - [`providers`]: the Cleeng and InPlayer adapters behind the contracts in
//!   `vodkit-contracts`
//! - [`state`]: observable stores read by presentation code
//!
//! [`VodkitApp`] wires everything for one process.
#![allow(missing_docs)]

pub mod app;
pub mod config;
pub mod error;
pub mod fanout;
pub mod providers;
pub mod registry;
pub mod session;
pub mod shelves;
pub mod state;
pub mod storage;

pub use app::VodkitApp;
pub use config::{AppConfig, ConfigLoader};
pub use error::{AccountError, AccountResult};
pub use registry::{IntegrationError, IntegrationServices, Integrations};
pub use session::{
    AccountController, EntitlementsHook, ProfileController,
    UPDATE_SUBSCRIPTION_RELOAD_DELAY,
};
pub use shelves::{
    AccountWriteLock, FavoriteOutcome, FavoritesController, MAX_WATCHLIST_ITEMS_COUNT,
    SaveProgressOutcome, WatchHistoryController,
};
pub use state::{AppStores, Store};
