use vodkit_model::WatchHistoryItem;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchHistoryState {
    /// Most recently updated first
    pub items: Vec<WatchHistoryItem>,
    pub playlist_id: Option<String>,
    pub items_loaded: bool,
}

impl WatchHistoryState {
    pub fn progress(&self, mediaid: &str) -> Option<f64> {
        self.items
            .iter()
            .find(|item| item.mediaid == mediaid)
            .map(|item| item.progress)
    }
}
