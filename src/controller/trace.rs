use crate::{error::RoamError, types::ConnectionId};

use super::types::{RoamReason, RoamState};

const LOG_TARGET: &str = "wlan_roam::trace";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TraceStatus {
    Applied,
    Unchanged,
    InvalidTransition,
    PolicyDenied,
    TransportFailure,
    NoCandidateFound,
    RoamFailed,
    ResourceExhausted,
    UnknownConnection,
}

impl TraceStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Unchanged => "unchanged",
            Self::InvalidTransition => "invalid_transition",
            Self::PolicyDenied => "policy_denied",
            Self::TransportFailure => "transport_failure",
            Self::NoCandidateFound => "no_candidate_found",
            Self::RoamFailed => "roam_failed",
            Self::ResourceExhausted => "resource_exhausted",
            Self::UnknownConnection => "unknown_connection",
        }
    }

    pub const fn from_error(err: &RoamError) -> Self {
        match err {
            RoamError::InvalidTransition { .. } => Self::InvalidTransition,
            RoamError::TransportFailure(_) => Self::TransportFailure,
            RoamError::NoCandidateFound => Self::NoCandidateFound,
            RoamError::RoamFailed => Self::RoamFailed,
            RoamError::PolicyDenied(_) => Self::PolicyDenied,
            RoamError::ResourceExhausted => Self::ResourceExhausted,
            RoamError::UnknownConnection(_) => Self::UnknownConnection,
        }
    }
}

/// One applied request, as written to the log.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TransitionTrace {
    pub conn: ConnectionId,
    pub from: RoamState,
    pub to: RoamState,
    pub reason: RoamReason,
    pub status: TraceStatus,
    pub commands: u8,
}

impl TransitionTrace {
    pub fn emit(&self) {
        log::info!(
            target: LOG_TARGET,
            "ROAM_EVENT {{\"conn\":{},\"from\":\"{}\",\"to\":\"{}\",\"reason\":\"{}\",\"code\":{},\"status\":\"{}\",\"commands\":{}}}",
            self.conn.0,
            self.from.as_str(),
            self.to.as_str(),
            self.reason.as_str(),
            self.reason.code(),
            self.status.as_str(),
            self.commands
        );
    }
}
