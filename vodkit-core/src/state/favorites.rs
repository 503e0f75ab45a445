use std::fmt;

use vodkit_model::Favorite;

/// Soft failure shown to the user instead of raising an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoritesWarning {
    LimitReached { max: usize },
}

impl fmt::Display for FavoritesWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FavoritesWarning::LimitReached { max } => write!(
                f,
                "You can only save {max} items to your favorites. Remove one to add another."
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FavoritesState {
    pub favorites: Vec<Favorite>,
    pub playlist_id: Option<String>,
    pub warning: Option<FavoritesWarning>,
}

impl FavoritesState {
    pub fn has_item(&self, mediaid: &str) -> bool {
        self.favorites.iter().any(|fav| fav.mediaid == mediaid)
    }
}
