//! OAuth providers a WAuth strategy can front.

use serde::{Deserialize, Serialize};

/// Prefix of every WAuth strategy id.
pub const STRATEGY_ID_PREFIX: &str = "wauth";

/// Known OAuth providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Github,
    Discord,
    X,
}

impl Provider {
    pub const ALL: [Provider; 4] = [Self::Google, Self::Github, Self::Discord, Self::X];

    pub fn id(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Github => "github",
            Self::Discord => "discord",
            Self::X => "x",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "google" => Some(Self::Google),
            "github" => Some(Self::Github),
            "discord" => Some(Self::Discord),
            "x" => Some(Self::X),
            _ => None,
        }
    }

    /// Capitalized provider id, as shown in the wallet picker.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Google => "Google",
            Self::Github => "Github",
            Self::Discord => "Discord",
            Self::X => "X",
        }
    }

    /// Arweave transaction id of the provider logo.
    pub fn logo(&self) -> &'static str {
        match self {
            Self::Google => "mc-lqDefUJZdDSOOqepLICrfEoQCACnS51tB3kKqvlk",
            Self::Github => "2bcLcWjuuRFDqFHlUvgvX2MzA2hOlZL1ED-T8OFBwCY",
            Self::Discord => "i4Lw4kXr5t57p8E1oOVGMO4vR35TlYsaJ9XYbMMVd8I",
            Self::X => "94R-dRRMdFerUnt8HuQzWT48ktgKsgjQ0uH6zlMFXVw",
        }
    }

    /// Strategy id persisted by the wallet kit, `wauth-<provider>`.
    pub fn strategy_id(&self) -> String {
        format!("{}-{}", STRATEGY_ID_PREFIX, self.id())
    }

    /// Parse a persisted strategy id. Anything not of the form
    /// `wauth-<known provider>` yields `None`.
    pub fn from_strategy_id(strategy_id: &str) -> Option<Self> {
        let rest = strategy_id.strip_prefix(STRATEGY_ID_PREFIX)?;
        let id = rest.strip_prefix('-')?;
        Self::from_id(id)
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_ids_round_trip_for_every_provider() {
        for provider in Provider::ALL {
            let id = provider.strategy_id();
            assert!(id.starts_with("wauth-"));
            assert_eq!(Provider::from_strategy_id(&id), Some(provider));
        }
    }

    #[test]
    fn foreign_or_unknown_strategy_ids_are_rejected() {
        assert_eq!(Provider::from_strategy_id("arconnect"), None);
        assert_eq!(Provider::from_strategy_id("wauth"), None);
        assert_eq!(Provider::from_strategy_id("wauth-"), None);
        assert_eq!(Provider::from_strategy_id("wauth-myspace"), None);
        assert_eq!(Provider::from_strategy_id("wauthx-google"), None);
    }

    #[test]
    fn display_names_are_capitalized_ids() {
        assert_eq!(Provider::Github.display_name(), "Github");
        assert_eq!(Provider::X.display_name(), "X");
    }
}
