//! One strategy per provider.

use std::sync::Arc;

use super::provider::Provider;
use super::session::WalletSession;
use super::storage::{active_provider, SharedClientStorage};
use super::strategy::WAuthStrategy;

/// Exhaustive provider → strategy mapping.
pub struct StrategySet {
    google: WAuthStrategy,
    github: WAuthStrategy,
    discord: WAuthStrategy,
    x: WAuthStrategy,
    storage: SharedClientStorage,
}

impl StrategySet {
    /// Build every strategy over a single shared session.
    pub fn new(session: Arc<dyn WalletSession>, storage: SharedClientStorage) -> Self {
        Self::with_sessions(|_| Arc::clone(&session), storage)
    }

    /// Build every strategy with its own session.
    pub fn with_sessions<F>(mut session_for: F, storage: SharedClientStorage) -> Self
    where
        F: FnMut(Provider) -> Arc<dyn WalletSession>,
    {
        let mut build =
            |provider| WAuthStrategy::new(provider, session_for(provider), Arc::clone(&storage));
        Self {
            google: build(Provider::Google),
            github: build(Provider::Github),
            discord: build(Provider::Discord),
            x: build(Provider::X),
            storage,
        }
    }

    pub fn get(&self, provider: Provider) -> &WAuthStrategy {
        match provider {
            Provider::Google => &self.google,
            Provider::Github => &self.github,
            Provider::Discord => &self.discord,
            Provider::X => &self.x,
        }
    }

    /// The strategy whose id is persisted as active, if it is one of ours.
    pub fn active(&self) -> Option<&WAuthStrategy> {
        active_provider(self.storage.as_ref()).map(|p| self.get(p))
    }

    pub fn iter(&self) -> impl Iterator<Item = &WAuthStrategy> {
        Provider::ALL.into_iter().map(move |p| self.get(p))
    }
}
