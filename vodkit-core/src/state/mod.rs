//! Observable, process-wide read models.
//!
//! Every store wraps a `watch` channel so presentation code can subscribe to
//! changes while orchestration code replaces whole sub-trees.

mod account;
mod favorites;
mod profile;
mod watch_history;

use std::sync::Arc;

use tokio::sync::watch;

pub use account::{AccountState, SessionStatus, SubscriptionView};
pub use favorites::{FavoritesState, FavoritesWarning};
pub use profile::ProfileState;
pub use watch_history::WatchHistoryState;

/// Thread-safe state store backed by a watch channel.
#[derive(Debug)]
pub struct Store<T> {
    sender: Arc<watch::Sender<T>>,
    receiver: watch::Receiver<T>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
            receiver: self.receiver.clone(),
        }
    }
}

impl<T: Default> Default for Store<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Store<T> {
    pub fn new(initial: T) -> Self {
        let (sender, receiver) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Access state without cloning
    pub fn with_state<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.receiver.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.receiver.clone()
    }

    /// Replace the whole state.
    pub fn set(&self, state: T) {
        self.sender.send_replace(state);
    }

    /// Mutate the state in place and notify subscribers once.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        self.sender.send_modify(f);
    }
}

impl<T: Clone> Store<T> {
    pub fn current(&self) -> T {
        self.receiver.borrow().clone()
    }
}

/// Busy indicator that stays raised while any holder is active.
///
/// Operations nest (a login reloads subscriptions), so the flag counts its
/// holders instead of being a plain boolean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadingFlag {
    holders: u32,
}

impl LoadingFlag {
    pub fn is_set(&self) -> bool {
        self.holders > 0
    }

    fn raise(&mut self) {
        self.holders += 1;
    }

    /// Saturates: a state reset while a holder was active already lowered it.
    fn lower(&mut self) {
        self.holders = self.holders.saturating_sub(1);
    }

    #[cfg(test)]
    pub(crate) fn raised() -> Self {
        Self { holders: 1 }
    }
}

/// Holds a [`LoadingFlag`] for its lifetime and releases it on drop,
/// whatever the exit path.
pub struct LoadingGuard<'a, T> {
    store: &'a Store<T>,
    flag: fn(&mut T) -> &mut LoadingFlag,
}

impl<'a, T> LoadingGuard<'a, T> {
    pub fn engage(
        store: &'a Store<T>,
        flag: fn(&mut T) -> &mut LoadingFlag,
    ) -> Self {
        store.update(|state| flag(state).raise());
        Self { store, flag }
    }
}

impl<T> Drop for LoadingGuard<'_, T> {
    fn drop(&mut self) {
        let flag = self.flag;
        self.store.update(|state| flag(state).lower());
    }
}

impl<T> std::fmt::Debug for LoadingGuard<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadingGuard").finish_non_exhaustive()
    }
}

/// All observable stores of one application instance.
#[derive(Debug, Clone, Default)]
pub struct AppStores {
    pub account: Store<AccountState>,
    pub favorites: Store<FavoritesState>,
    pub watch_history: Store<WatchHistoryState>,
    pub profile: Store<ProfileState>,
}

impl AppStores {
    pub fn new() -> Self {
        Self::default()
    }
}
