#![cfg_attr(not(feature = "std"), no_std)]

pub mod assembler;
pub mod collaborators;
pub mod config;
pub mod controller;
pub mod error;
pub mod scoring;
pub mod types;

pub use assembler::{
    BasicAssembler, ConfigAssembler, ConfigBundle, ConfigBundleBuilder, ConnectionSnapshot,
};
pub use collaborators::{
    ConnectionInfo, ConnectionManager, FirmwareTransport, LinkStatus, MloRole, OpMode,
    PolicyManager, ScanCache,
};
pub use config::RoamIni;
pub use controller::{
    ControlBits, InvokeRequest, InvokeTarget, RoamController, RoamPolicyContext, RoamReason,
    RoamRequest, RoamSource, RoamState, RsoCommand,
};
pub use error::{DenyCause, RoamError, TransportError};
pub use scoring::{rank, score, CandidateAp, ScoreConfig, ScoringPolicy};
pub use types::{Band, ConnectionId, MacAddr};
