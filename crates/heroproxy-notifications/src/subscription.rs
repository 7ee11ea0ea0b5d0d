//! Subscription identity, scope and lifecycle state.

use parking_lot::Mutex;
use uuid::Uuid;

/// What a subscriber wants to receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every change event, regardless of hero
    All,
    /// Change events for the listed hero IDs only
    Heroes(Vec<String>),
}

impl Scope {
    /// Subscribe to a single hero ID.
    pub fn hero(id: impl Into<String>) -> Self {
        Scope::Heroes(vec![id.into()])
    }
}

/// Lifecycle state of a subscription.
///
/// `Cancelled` and `Completed` are terminal. Every transition goes through
/// [`StateCell::transition`]; there are no independently-set flags to race
/// against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Receiving events
    Active,
    /// Ended by the subscriber, a delivery failure, or unsubscribe
    Cancelled,
    /// Ended by the hub (shutdown)
    Completed,
}

impl std::fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Single mutation path for subscription state.
#[derive(Debug)]
pub(crate) struct StateCell(Mutex<SubscriptionState>);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(Mutex::new(SubscriptionState::Active))
    }

    pub(crate) fn get(&self) -> SubscriptionState {
        *self.0.lock()
    }

    /// Attempt a transition; returns true if the state actually changed.
    ///
    /// Only Active -> Cancelled and Active -> Completed are legal; terminal
    /// states are sticky and re-entering Active is never allowed.
    pub(crate) fn transition(&self, to: SubscriptionState) -> bool {
        let mut state = self.0.lock();
        match (*state, to) {
            (SubscriptionState::Active, SubscriptionState::Cancelled)
            | (SubscriptionState::Active, SubscriptionState::Completed) => {
                *state = to;
                true
            }
            _ => false,
        }
    }
}

/// Opaque handle identifying one subscription for later unsubscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    pub(crate) id: Uuid,
    pub(crate) scope: Scope,
}

impl SubscriptionHandle {
    /// The unique identity of this subscription.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The scope this subscription was registered with.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        let cell = StateCell::new();
        assert_eq!(cell.get(), SubscriptionState::Active);
        assert!(cell.transition(SubscriptionState::Cancelled));
        assert_eq!(cell.get(), SubscriptionState::Cancelled);
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        let cell = StateCell::new();
        assert!(cell.transition(SubscriptionState::Completed));
        assert!(!cell.transition(SubscriptionState::Cancelled));
        assert!(!cell.transition(SubscriptionState::Active));
        assert_eq!(cell.get(), SubscriptionState::Completed);
    }

    #[test]
    fn test_reactivation_rejected() {
        let cell = StateCell::new();
        assert!(!cell.transition(SubscriptionState::Active));
        assert_eq!(cell.get(), SubscriptionState::Active);
    }
}
