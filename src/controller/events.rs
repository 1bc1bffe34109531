use heapless::Vec;

use crate::{error::RoamError, types::ConnectionId};

use super::types::{RoamReason, RoamRequest, RoamState, RsoCommand};

pub(super) const MAX_PLAN_STEPS: usize = 3;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum RoamEvent {
    /// Validate a request and plan its steps; the state does not move.
    Request(RoamRequest),
    /// A planned step went through; move to its state.
    Commit(RoamState),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PlanStep {
    pub command: Option<RsoCommand>,
    pub reason: RoamReason,
    pub state: RoamState,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlanVerdict {
    Proceed,
    Unchanged,
    Rejected(RoamError),
}

/// Outcome of validating one request against the current state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransitionPlan {
    pub verdict: PlanVerdict,
    pub steps: Vec<PlanStep, MAX_PLAN_STEPS>,
    /// Another connection to drive to deinit before the steps run.
    pub preempt: Option<(ConnectionId, RoamReason)>,
    pub link_lost: bool,
    pub rearm_election: bool,
    pub reenable_others: bool,
}

impl Default for TransitionPlan {
    fn default() -> Self {
        Self {
            verdict: PlanVerdict::Unchanged,
            steps: Vec::new(),
            preempt: None,
            link_lost: false,
            rearm_election: false,
            reenable_others: false,
        }
    }
}

impl TransitionPlan {
    pub(super) fn reject(&mut self, err: RoamError) {
        self.steps.clear();
        self.verdict = PlanVerdict::Rejected(err);
    }

    pub(super) fn unchanged(&mut self) {
        self.steps.clear();
        self.verdict = PlanVerdict::Unchanged;
    }

    pub(super) fn step(&mut self, command: Option<RsoCommand>, reason: RoamReason, state: RoamState) {
        let step = PlanStep {
            command,
            reason,
            state,
        };
        if self.steps.push(step).is_err() {
            self.reject(RoamError::ResourceExhausted);
            return;
        }
        if !matches!(self.verdict, PlanVerdict::Rejected(_)) {
            self.verdict = PlanVerdict::Proceed;
        }
    }

    pub(super) fn push(&mut self, step: PlanStep) {
        self.step(step.command, step.reason, step.state);
    }

    pub(super) fn commands(&self) -> usize {
        self.steps.iter().filter(|step| step.command.is_some()).count()
    }
}
