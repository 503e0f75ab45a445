//! Tolerant list decoding for provider-held personal shelves.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Decode a JSON array, dropping entries that do not match `T`.
///
/// Anything other than an array yields an empty list.
pub fn parse_list<T: DeserializeOwned>(value: Value) -> Vec<T> {
    match value {
        Value::Array(entries) => entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn optional_list<'de, D, T>(
    deserializer: D,
) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.map(parse_list))
}
