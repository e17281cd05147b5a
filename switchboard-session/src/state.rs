//! Session lifecycle state machine.
//!
//! [`transition`] is pure: it maps the current state and a transport event to
//! the next state plus the side effects the registry has to carry out.

use crate::challenge::Challenge;

/// Lifecycle state of a user's session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Initializing,
    AwaitingScan(Challenge),
    Connected,
    Disconnected,
    Failed,
}

impl SessionState {
    /// States that imply a live transport handle
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            Self::Initializing | Self::AwaitingScan(_) | Self::Connected
        )
    }

    /// Terminal for the current handle
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Failed)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Pending challenge, only while awaiting a scan
    pub fn challenge(&self) -> Option<&Challenge> {
        match self {
            Self::AwaitingScan(challenge) => Some(challenge),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::AwaitingScan(_) => "awaiting_scan",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Failed => "failed",
        }
    }
}

/// Lifecycle events reported by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    ChallengeReady(Challenge),
    Authenticated,
    Ready,
    AuthFailed(String),
    Disconnected(String),
}

/// Side effect requested by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Tear down the transport handle
    DestroyTransport,
    /// Drop the session from the registry
    RemoveSession,
}

/// Result of applying an event to a state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: SessionState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn stay(state: &SessionState) -> Self {
        Self {
            state: state.clone(),
            effects: Vec::new(),
        }
    }

    fn to(state: SessionState) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }

    fn terminal(state: SessionState) -> Self {
        Self {
            state,
            effects: vec![Effect::DestroyTransport, Effect::RemoveSession],
        }
    }

    pub fn has(&self, effect: Effect) -> bool {
        self.effects.contains(&effect)
    }
}

/// Apply `event` to `state`.
///
/// Events that do not apply to the current state leave it unchanged and
/// request no effects.
pub fn transition(state: &SessionState, event: &LifecycleEvent) -> Transition {
    use LifecycleEvent as E;
    use SessionState as S;

    match (state, event) {
        (S::Initializing | S::AwaitingScan(_), E::ChallengeReady(challenge)) => {
            Transition::to(S::AwaitingScan(challenge.clone()))
        }
        (S::Initializing | S::AwaitingScan(_), E::Ready) => Transition::to(S::Connected),
        (S::Initializing | S::AwaitingScan(_) | S::Connected, E::AuthFailed(_)) => {
            Transition::terminal(S::Failed)
        }
        (S::Initializing | S::AwaitingScan(_) | S::Connected, E::Disconnected(_)) => {
            Transition::terminal(S::Disconnected)
        }
        // Authenticated is informational; readiness follows separately
        _ => Transition::stay(state),
    }
}
