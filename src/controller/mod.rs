//! Per-connection roam offload state and the work around it: primary
//! arbitration, roam-now requests and the stop/invoke timers.

mod arbitration;
#[allow(clippy::module_inception)]
mod controller;
mod engine;
mod events;
mod invoke;
mod machine;
mod policy;
mod timers;
mod trace;
mod types;

pub use controller::RoamController;
pub use invoke::MAX_PENDING_INVOKES;
pub use policy::RoamPolicyContext;
pub use timers::TimerKind;
pub use trace::{TraceStatus, TransitionTrace};
pub use types::{
    ControlBits, InvokeRequest, InvokeTarget, RoamReason, RoamRequest, RoamSource, RoamState,
    RsoCommand,
};
