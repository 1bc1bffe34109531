//! Configuration bundles for offload commands.
//!
//! The controller treats a [`ConfigBundle`] as opaque: it asks a
//! [`ConfigAssembler`] for one per command and hands it to the transport
//! unchanged.

mod basic;
mod bundle;

pub use basic::BasicAssembler;
pub use bundle::{ConfigBundle, ConfigBundleBuilder};

use crate::{
    collaborators::ConnectionInfo,
    controller::{RoamPolicyContext, RoamReason, RoamState, RsoCommand},
    error::RoamError,
    scoring::{CandidateAp, ScoreConfig, ScoringPolicy},
    types::ConnectionId,
};

/// What the assembler may look at when building a bundle.
#[derive(Clone, Copy, Debug)]
pub struct ConnectionSnapshot<'a> {
    pub id: ConnectionId,
    pub info: ConnectionInfo,
    pub state: RoamState,
    pub policy: &'a RoamPolicyContext,
    pub score: &'a ScoreConfig,
    /// Local capabilities and concurrency facts, shared with invoke target
    /// selection so both rank candidates alike.
    pub scoring: &'a ScoringPolicy,
    /// Scan results known for this connection, unranked.
    pub candidates: &'a [CandidateAp],
}

pub trait ConfigAssembler {
    fn assemble(
        &mut self,
        snapshot: &ConnectionSnapshot<'_>,
        command: RsoCommand,
        reason: RoamReason,
    ) -> Result<ConfigBundle, RoamError>;
}
