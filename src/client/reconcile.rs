//! Repair UI state that claims a connection the session no longer backs.
//!
//! The wallet kit can report `connected` with no address after the auth
//! session was cleared elsewhere. When that happens and no persisted session
//! exists to resume from, the strategy is disconnected.

use super::storage::{has_persisted_session, ClientStorage};
use super::strategy::WAuthStrategy;

/// True iff the UI says connected, there is no address, and there is no
/// persisted session.
pub fn should_disconnect(address: Option<&str>, connected: bool, has_session: bool) -> bool {
    let has_address = address.is_some_and(|a| !a.is_empty());
    connected && !has_address && !has_session
}

/// Call `disconnect` if the observed state is inconsistent. Returns whether it was called.
pub fn fix_connection<F>(
    address: Option<&str>,
    connected: bool,
    storage: &dyn ClientStorage,
    disconnect: F,
) -> bool
where
    F: FnOnce(),
{
    if should_disconnect(address, connected, has_persisted_session(storage)) {
        disconnect();
        true
    } else {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Observed {
    address: Option<String>,
    connected: bool,
    has_session: bool,
}

/// Stateful [`fix_connection`]: an inconsistent state triggers one
/// disconnect no matter how often it is observed.
#[derive(Debug, Default)]
pub struct ConnectionReconciler {
    last: Option<Observed>,
}

impl ConnectionReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation. Returns true when the caller should disconnect.
    pub fn observe(&mut self, address: Option<&str>, connected: bool, has_session: bool) -> bool {
        let observed = Observed {
            address: address.map(str::to_string),
            connected,
            has_session,
        };
        if self.last.as_ref() == Some(&observed) {
            return false;
        }
        self.last = Some(observed);
        should_disconnect(address, connected, has_session)
    }

    /// Observe the wallet kit's view of `strategy` and disconnect it if needed.
    pub async fn reconcile(
        &mut self,
        strategy: &WAuthStrategy,
        address: Option<&str>,
        connected: bool,
    ) -> bool {
        let has_session = has_persisted_session(strategy.storage().as_ref());
        if !self.observe(address, connected, has_session) {
            return false;
        }
        tracing::info!(strategy = %strategy.id(), "Connected without address or session, disconnecting");
        strategy.disconnect().await;
        true
    }
}
