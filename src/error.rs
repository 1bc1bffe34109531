use core::fmt;

use thiserror::Error;

use crate::{controller::RoamState, types::ConnectionId};

/// Why a request was refused by configuration or concurrency policy.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DenyCause {
    OffloadDisabled,
    ControlBitsSet(u8),
    ConcurrentPrimary(ConnectionId),
    NotInitialized,
    DataStallUnsupported,
    SelfBssRoam,
}

impl fmt::Display for DenyCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OffloadDisabled => f.write_str("roam offload disabled"),
            Self::ControlBitsSet(bits) => write!(f, "internally disabled bits={bits:#04x}"),
            Self::ConcurrentPrimary(id) => write!(f, "{id} holds roaming"),
            Self::NotInitialized => f.write_str("roaming not initialized"),
            Self::DataStallUnsupported => f.write_str("data-stall roaming unsupported"),
            Self::SelfBssRoam => f.write_str("roam to current bss disallowed"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum TransportError {
    #[error("command queue full")]
    QueueFull,
    #[error("firmware rejected command")]
    Rejected,
    #[error("transport not ready")]
    NotReady,
}

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum RoamError {
    #[error("invalid transition {from} -> {requested}")]
    InvalidTransition {
        from: RoamState,
        requested: RoamState,
    },
    #[error("transport failure: {0}")]
    TransportFailure(#[from] TransportError),
    #[error("no roam candidate found")]
    NoCandidateFound,
    #[error("roam attempt failed")]
    RoamFailed,
    #[error("denied by policy: {0}")]
    PolicyDenied(DenyCause),
    #[error("resource exhausted")]
    ResourceExhausted,
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),
}

impl RoamError {
    /// Policy refusals clear on their own once the blocking condition goes away.
    pub const fn is_temporary(&self) -> bool {
        matches!(self, Self::PolicyDenied(_))
    }
}
