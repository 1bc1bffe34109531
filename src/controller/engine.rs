use statig::blocking::IntoStateMachineExt as _;

use super::{
    events::{RoamEvent, TransitionPlan},
    machine::{DispatchContext, Guard, RoamMachine},
    types::{RoamRequest, RoamState},
};
use crate::error::RoamError;

/// One connection's roam state machine.
///
/// Requests are handled in two phases: [`RoamEngine::plan`] validates a
/// request and lists its steps without moving the state, and
/// [`RoamEngine::commit`] moves to a step's state once its command went out.
pub(super) struct RoamEngine {
    machine: statig::blocking::StateMachine<RoamMachine>,
}

impl RoamEngine {
    pub(super) fn new() -> Self {
        Self {
            machine: RoamMachine::default().state_machine(),
        }
    }

    pub(super) fn state(&self) -> RoamState {
        self.machine.inner().state
    }

    pub(super) fn plan(&mut self, request: RoamRequest, guard: Guard) -> TransitionPlan {
        let mut context = DispatchContext {
            guard,
            plan: TransitionPlan::default(),
        };
        let from = self.state();
        if request.target != RoamState::Deinit && !guard.link_up {
            context.plan.reject(RoamError::InvalidTransition {
                from,
                requested: request.target,
            });
            return context.plan;
        }

        self.machine
            .handle_with_context(&RoamEvent::Request(request), &mut context);

        // member links follow the association link's commands
        if guard.member_link {
            for step in context.plan.steps.iter_mut() {
                step.command = None;
            }
        }
        context.plan
    }

    pub(super) fn commit(&mut self, state: RoamState) {
        let mut context = DispatchContext::default();
        self.machine
            .handle_with_context(&RoamEvent::Commit(state), &mut context);
    }
}
