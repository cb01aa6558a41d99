//! Provisioning workflow states.

use std::fmt;

/// States of one provisioning run
///
/// The chain is linear: every state has at most one successor and there is no
/// way back. A failing run stops in whatever state it had reached, which is
/// reported in [`crate::ProvisioningFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvisioningState {
    Start,
    KeysGenerated,
    ServerRegistered,
    TrackerRegistered,
    IdentityPersisted,
    AliasPersisted,
    ActiveSet,
    Complete,
}

impl ProvisioningState {
    /// The single successor of this state, `None` once complete
    pub fn next(self) -> Option<Self> {
        use ProvisioningState::*;

        match self {
            Start => Some(KeysGenerated),
            KeysGenerated => Some(ServerRegistered),
            ServerRegistered => Some(TrackerRegistered),
            TrackerRegistered => Some(IdentityPersisted),
            IdentityPersisted => Some(AliasPersisted),
            AliasPersisted => Some(ActiveSet),
            ActiveSet => Some(Complete),
            Complete => None,
        }
    }

    pub fn is_complete(self) -> bool {
        self == ProvisioningState::Complete
    }
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProvisioningState::Start => "start",
            ProvisioningState::KeysGenerated => "keys-generated",
            ProvisioningState::ServerRegistered => "server-registered",
            ProvisioningState::TrackerRegistered => "tracker-registered",
            ProvisioningState::IdentityPersisted => "identity-persisted",
            ProvisioningState::AliasPersisted => "alias-persisted",
            ProvisioningState::ActiveSet => "active-set",
            ProvisioningState::Complete => "complete",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_is_linear_and_ends_at_complete() {
        let mut state = ProvisioningState::Start;
        let mut visited = vec![state];

        while let Some(next) = state.next() {
            assert!(!visited.contains(&next), "state {} visited twice", next);
            visited.push(next);
            state = next;
        }

        assert_eq!(visited.len(), 8);
        assert!(state.is_complete());
    }
}
