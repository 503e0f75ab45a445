use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use vodkit_contracts::storage::PreferenceStore;

use crate::error::AccountResult;
use crate::state::{ProfileState, Store};

pub(crate) const PERSIST_KEY_PROFILE: &str = "profile";

/// Selected viewer profile, persisted across restarts.
#[derive(Clone)]
pub struct ProfileController {
    profile: Store<ProfileState>,
    storage: Arc<dyn PreferenceStore>,
}

impl std::fmt::Debug for ProfileController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileController").finish_non_exhaustive()
    }
}

impl ProfileController {
    pub fn new(
        profile: Store<ProfileState>,
        storage: Arc<dyn PreferenceStore>,
    ) -> Self {
        Self { profile, storage }
    }

    pub fn selected(&self) -> Option<String> {
        self.profile.with_state(|state| state.profile_id.clone())
    }

    pub async fn load_persisted_profile(&self) -> AccountResult<()> {
        let stored = self.storage.get_item(PERSIST_KEY_PROFILE).await?;
        let profile_id = stored.and_then(|value| match value {
            Value::String(id) => Some(id),
            Value::Object(map) => {
                map.get("id").and_then(Value::as_str).map(str::to_owned)
            }
            _ => None,
        });

        debug!(restored = profile_id.is_some(), "persisted profile loaded");
        self.profile.update(|state| state.profile_id = profile_id);
        Ok(())
    }

    pub async fn select_profile(&self, profile_id: &str) -> AccountResult<()> {
        self.storage
            .set_json(PERSIST_KEY_PROFILE, &Value::String(profile_id.to_string()))
            .await?;
        self.profile.set(ProfileState {
            profile_id: Some(profile_id.to_string()),
            selecting_avatar: None,
        });
        Ok(())
    }

    /// Clear the selection and forget it on disk.
    pub async fn unpersist_profile(&self) -> AccountResult<()> {
        self.profile.set(ProfileState::default());
        self.storage.remove_item(PERSIST_KEY_PROFILE).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryPreferenceStore;

    #[tokio::test]
    async fn selection_round_trips_through_storage() {
        let storage = Arc::new(MemoryPreferenceStore::new());
        let store = Store::default();
        let profiles = ProfileController::new(store.clone(), storage.clone());

        profiles.select_profile("kids").await.unwrap();

        let restarted = ProfileController::new(Store::default(), storage.clone());
        restarted.load_persisted_profile().await.unwrap();
        assert_eq!(restarted.selected().as_deref(), Some("kids"));

        restarted.unpersist_profile().await.unwrap();
        assert!(restarted.selected().is_none());
        assert!(storage.get_raw(PERSIST_KEY_PROFILE).await.unwrap().is_none());
    }
}
