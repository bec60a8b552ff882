//! Which side of the connection this engine speaks for.

use crate::message::CloseCode;

/// WebSocket connection role.
///
/// Determines masking behavior per RFC 6455 and the status code used when
/// an application callback fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Client role - must mask outgoing frames.
    Client,
    /// Server role - must not mask outgoing frames.
    Server,
}

impl Role {
    /// Check if this role must mask outgoing frames.
    #[inline]
    #[must_use]
    pub const fn must_mask(&self) -> bool {
        matches!(self, Role::Client)
    }

    /// Check if this role expects incoming frames to be masked.
    #[inline]
    #[must_use]
    pub const fn expects_masked(&self) -> bool {
        matches!(self, Role::Server)
    }

    /// Close status sent when an application callback fails without naming
    /// one: 1011 for servers, 1008 for clients (1011 is server-only).
    #[must_use]
    pub const fn fault_code(&self) -> CloseCode {
        match self {
            Role::Server => CloseCode::InternalError,
            Role::Client => CloseCode::PolicyViolation,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Client => write!(f, "Client"),
            Role::Server => write!(f, "Server"),
        }
    }
}
