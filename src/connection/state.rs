//! Connection phase as tracked by the dispatcher.

/// Lifecycle phase of a connection.
///
/// `Connecting -> Open -> Closing -> Closed`. A connection may also drop
/// straight to `Closed` when the transport goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ConnectionState {
    /// Upgraded, `on_connect` not yet delivered.
    #[default]
    Connecting,
    /// Frames flow both ways.
    Open,
    /// A CLOSE was sent or received; the handshake is not complete yet.
    Closing,
    /// Terminal. No further frames are processed.
    Closed,
}

impl ConnectionState {
    /// Returns `true` for every state except `Closed`.
    #[must_use]
    #[inline]
    pub const fn is_active(&self) -> bool {
        !matches!(self, ConnectionState::Closed)
    }

    /// Returns `true` only for `Open`.
    #[must_use]
    #[inline]
    pub const fn can_send(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// Incoming frames are processed while `Open` or `Closing`.
    #[must_use]
    #[inline]
    pub const fn can_receive(&self) -> bool {
        matches!(self, ConnectionState::Open | ConnectionState::Closing)
    }

    /// A close is underway or done; `terminate` becomes a no-op.
    #[must_use]
    #[inline]
    pub const fn is_closing(&self) -> bool {
        matches!(self, ConnectionState::Closing | ConnectionState::Closed)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Open => write!(f, "Open"),
            ConnectionState::Closing => write!(f, "Closing"),
            ConnectionState::Closed => write!(f, "Closed"),
        }
    }
}
