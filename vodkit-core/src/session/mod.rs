//! Session orchestration: login, logout, consents and entitlement refresh.

mod account;
mod entitlements;
mod epoch;
mod profile;

use std::sync::Arc;

use futures::future::BoxFuture;

pub use account::AccountController;
pub use entitlements::UPDATE_SUBSCRIPTION_RELOAD_DELAY;
pub use epoch::SessionEpoch;
pub use profile::ProfileController;

/// Caller-supplied callback invalidating access-control caches after the
/// entitlement picture may have changed.
pub type EntitlementsHook = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Longest accepted first or last name.
pub const MAX_NAME_LENGTH: usize = 50;
