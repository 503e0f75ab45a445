use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The backend vendor bound to the capability contracts for this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationType {
    /// Commerce-first vendor (REST API)
    Cleeng,
    /// Identity-first vendor (SDK)
    #[serde(alias = "jwp")]
    InPlayer,
}

impl fmt::Display for IntegrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrationType::Cleeng => f.write_str("cleeng"),
            IntegrationType::InPlayer => f.write_str("inplayer"),
        }
    }
}

impl FromStr for IntegrationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cleeng" => Ok(IntegrationType::Cleeng),
            "inplayer" | "jwp" => Ok(IntegrationType::InPlayer),
            other => Err(format!("unknown integration type: {other}")),
        }
    }
}

/// How content access is granted across the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessModel {
    /// Free, ad supported
    #[default]
    Avod,
    /// Free after registration
    Authvod,
    /// Subscription based
    Svod,
}

impl AccessModel {
    pub fn is_subscription_based(self) -> bool {
        matches!(self, AccessModel::Svod)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integration_type_parses_aliases() {
        assert_eq!("JWP".parse::<IntegrationType>(), Ok(IntegrationType::InPlayer));
        assert_eq!(" cleeng ".parse::<IntegrationType>(), Ok(IntegrationType::Cleeng));
        assert!("stripe".parse::<IntegrationType>().is_err());
    }

    #[test]
    fn only_svod_is_subscription_based() {
        assert!(AccessModel::Svod.is_subscription_based());
        assert!(!AccessModel::Authvod.is_subscription_based());
        assert!(!AccessModel::Avod.is_subscription_based());
    }
}
