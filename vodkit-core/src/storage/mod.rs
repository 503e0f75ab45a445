//! Local preference store implementations.

mod file;
mod memory;

pub use file::FilePreferenceStore;
pub use memory::MemoryPreferenceStore;

/// Namespace used until `initialize` sets the configured prefix.
pub const DEFAULT_PREFIX: &str = "vodkit";

pub(crate) fn storage_key(prefix: &str, key: &str) -> String {
    format!("{prefix}.{key}")
}
