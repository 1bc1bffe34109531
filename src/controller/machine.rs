use statig::prelude::*;

use crate::{
    error::{DenyCause, RoamError},
    types::ConnectionId,
};

use super::{
    events::{PlanStep, RoamEvent, TransitionPlan},
    policy::RoamPolicyContext,
    types::{RoamReason, RoamRequest, RoamState, RsoCommand},
};

/// Facts the state handlers decide on, sampled before each request.
#[derive(Clone, Copy, Debug, Default)]
pub(super) struct Guard {
    pub(super) link_up: bool,
    pub(super) member_link: bool,
    pub(super) offload_enabled: bool,
    pub(super) policy: RoamPolicyContext,
    /// A stop was sent and its acknowledgment is still awaited.
    pub(super) stop_pending: bool,
    /// Another connection already holding roam state.
    pub(super) conflict: Option<ConnectionId>,
    pub(super) pinned_primary: bool,
}

#[derive(Debug, Default)]
pub(super) struct DispatchContext {
    pub(super) guard: Guard,
    pub(super) plan: TransitionPlan,
}

#[derive(Clone, Copy, Debug, Default)]
pub(super) struct RoamMachine {
    pub(super) state: RoamState,
}

impl RoamMachine {
    fn invalid(context: &mut DispatchContext, from: RoamState, request: &RoamRequest) {
        context.plan.reject(RoamError::InvalidTransition {
            from,
            requested: request.target,
        });
    }

    fn deny(context: &mut DispatchContext, cause: DenyCause) {
        context.plan.reject(RoamError::PolicyDenied(cause));
    }

    fn plan_init(context: &mut DispatchContext, request: &RoamRequest) {
        let guard = context.guard;
        if guard.policy.trigger_bitmap == 0 {
            Self::invalid(context, RoamState::Deinit, request);
            return;
        }
        if let Some(other) = guard.conflict {
            if guard.pinned_primary {
                context.plan.preempt = Some((other, RoamReason::RoamSetPrimary));
            } else if request.reason == RoamReason::SupplicantInitRoaming {
                context.plan.preempt = Some((other, RoamReason::SupplicantInitRoaming));
            } else {
                Self::deny(context, DenyCause::ConcurrentPrimary(other));
                return;
            }
        }
        context
            .plan
            .step(Some(RsoCommand::Init), request.reason, RoamState::Init);
    }

    fn plan_start(context: &mut DispatchContext, request: &RoamRequest) {
        let policy = context.guard.policy;
        if !context.guard.offload_enabled {
            Self::deny(context, DenyCause::OffloadDisabled);
            return;
        }
        if !policy.control_bits.is_empty() {
            Self::deny(context, DenyCause::ControlBitsSet(policy.control_bits.bits()));
            return;
        }
        context
            .plan
            .step(Some(RsoCommand::Start), request.reason, RoamState::RsoEnabled);
        if policy.supplicant_disabled {
            context.plan.step(
                Some(RsoCommand::Stop),
                RoamReason::SupplicantDisabledRoaming,
                RoamState::RsoStopped,
            );
        }
    }

    fn stop_step(
        context: &DispatchContext,
        from: RoamState,
        reason: RoamReason,
    ) -> Option<PlanStep> {
        if context.guard.stop_pending
            && matches!(reason, RoamReason::RoamSyncFailed | RoamReason::RoamSetPrimary)
        {
            return None;
        }
        let stop_reason = reason.stop_reason();
        // firmware already tore the session down for a stop-all during sync
        let stop_all_in_sync =
            from == RoamState::RoamSyncInProgress && stop_reason == RoamReason::RoamStopAll;
        let command = (!stop_all_in_sync).then_some(RsoCommand::Stop);
        Some(PlanStep {
            command,
            reason: stop_reason,
            state: RoamState::RsoStopped,
        })
    }

    fn plan_stop(context: &mut DispatchContext, from: RoamState, request: &RoamRequest) {
        match Self::stop_step(context, from, request.reason) {
            Some(step) => context.plan.push(step),
            None => context.plan.unchanged(),
        }
    }

    /// Roam attempt ended without a handoff: fall back to scanning or stay
    /// stopped when something holds roaming off.
    fn plan_resume(context: &mut DispatchContext, command: Option<RsoCommand>, reason: RoamReason) {
        if context.guard.policy.offload_permitted() {
            context.plan.step(command, reason, RoamState::RsoEnabled);
        } else {
            context.plan.step(None, reason, RoamState::RsoStopped);
        }
    }

    fn plan_deinit(context: &mut DispatchContext, from: RoamState, request: &RoamRequest) {
        let reason = request.reason;
        match from {
            RoamState::Deinit => {
                context.plan.unchanged();
                return;
            }
            RoamState::MloRoamSyncInProgress => {
                let command =
                    (reason != RoamReason::RoamHandoffDone).then_some(RsoCommand::Deinit);
                context.plan.step(command, reason, RoamState::Deinit);
            }
            RoamState::RsoEnabled | RoamState::RoamingInProgress | RoamState::RoamSyncInProgress => {
                if let Some(step) = Self::stop_step(context, from, reason) {
                    context.plan.push(step);
                }
                context
                    .plan
                    .step(Some(RsoCommand::Deinit), reason, RoamState::Deinit);
            }
            RoamState::RsoStopped => {
                if context.guard.policy.supplicant_disabled {
                    context.plan.step(
                        Some(RsoCommand::Stop),
                        RoamReason::Disconnected,
                        RoamState::RsoStopped,
                    );
                }
                context
                    .plan
                    .step(Some(RsoCommand::Deinit), reason, RoamState::Deinit);
            }
            RoamState::Init => {
                context
                    .plan
                    .step(Some(RsoCommand::Deinit), reason, RoamState::Deinit);
            }
        }
        context.plan.reenable_others = !matches!(
            reason,
            RoamReason::SupplicantInitRoaming | RoamReason::RoamSetPrimary
        );
    }

    fn state_for(target: RoamState) -> State {
        match target {
            RoamState::Deinit => State::deinit(),
            RoamState::Init => State::init(),
            RoamState::RsoEnabled => State::rso_enabled(),
            RoamState::RsoStopped => State::rso_stopped(),
            RoamState::RoamingInProgress => State::roaming_in_progress(),
            RoamState::RoamSyncInProgress => State::roam_sync_in_progress(),
            RoamState::MloRoamSyncInProgress => State::mlo_roam_sync_in_progress(),
        }
    }
}

#[state_machine(initial = "State::deinit()")]
impl RoamMachine {
    #[state(superstate = "tracked")]
    fn deinit(&mut self, context: &mut DispatchContext, event: &RoamEvent) -> Outcome<State> {
        let RoamEvent::Request(request) = event else {
            return Super;
        };
        match request.target {
            RoamState::Deinit => context.plan.unchanged(),
            RoamState::Init => Self::plan_init(context, request),
            RoamState::MloRoamSyncInProgress
                if context.guard.member_link && request.reason == RoamReason::RoamHandoffDone =>
            {
                context
                    .plan
                    .step(None, request.reason, RoamState::MloRoamSyncInProgress);
            }
            _ => Self::invalid(context, RoamState::Deinit, request),
        }
        Handled
    }

    #[state(superstate = "tracked")]
    fn init(&mut self, context: &mut DispatchContext, event: &RoamEvent) -> Outcome<State> {
        let RoamEvent::Request(request) = event else {
            return Super;
        };
        match request.target {
            RoamState::RsoEnabled => Self::plan_start(context, request),
            RoamState::RsoStopped => context.plan.unchanged(),
            RoamState::Deinit => Self::plan_deinit(context, RoamState::Init, request),
            _ => Self::invalid(context, RoamState::Init, request),
        }
        Handled
    }

    #[state(superstate = "tracked")]
    fn rso_enabled(&mut self, context: &mut DispatchContext, event: &RoamEvent) -> Outcome<State> {
        let RoamEvent::Request(request) = event else {
            return Super;
        };
        let from = RoamState::RsoEnabled;
        match request.target {
            RoamState::RsoEnabled => {
                context
                    .plan
                    .step(Some(RsoCommand::Update), request.reason, RoamState::RsoEnabled);
            }
            RoamState::RsoStopped => Self::plan_stop(context, from, request),
            RoamState::RoamingInProgress | RoamState::RoamSyncInProgress => {
                context.plan.step(None, request.reason, request.target);
            }
            RoamState::Deinit => Self::plan_deinit(context, from, request),
            _ => Self::invalid(context, from, request),
        }
        Handled
    }

    #[state(superstate = "tracked")]
    fn rso_stopped(&mut self, context: &mut DispatchContext, event: &RoamEvent) -> Outcome<State> {
        let RoamEvent::Request(request) = event else {
            return Super;
        };
        let from = RoamState::RsoStopped;
        let policy = context.guard.policy;
        // only a roam the host asked for may run while the supplicant holds roaming off
        let host_invoked = policy.supplicant_disabled && policy.host_roam_in_progress;
        match request.target {
            RoamState::RsoEnabled => Self::plan_start(context, request),
            RoamState::RsoStopped => context.plan.unchanged(),
            RoamState::RoamingInProgress | RoamState::RoamSyncInProgress if host_invoked => {
                context.plan.step(None, request.reason, request.target);
            }
            RoamState::Deinit => Self::plan_deinit(context, from, request),
            _ => Self::invalid(context, from, request),
        }
        Handled
    }

    #[state(superstate = "tracked")]
    fn roaming_in_progress(
        &mut self,
        context: &mut DispatchContext,
        event: &RoamEvent,
    ) -> Outcome<State> {
        let RoamEvent::Request(request) = event else {
            return Super;
        };
        let from = RoamState::RoamingInProgress;
        match request.target {
            RoamState::RsoEnabled => {
                Self::plan_resume(context, None, request.reason);
                context.plan.link_lost = context.guard.policy.roam_reason_better_ap
                    && matches!(
                        request.reason,
                        RoamReason::PreauthFailedForAll | RoamReason::NoCandidateFound
                    );
            }
            RoamState::RsoStopped => Self::plan_stop(context, from, request),
            RoamState::RoamSyncInProgress => {
                context.plan.step(None, request.reason, request.target);
            }
            RoamState::Deinit => Self::plan_deinit(context, from, request),
            _ => Self::invalid(context, from, request),
        }
        Handled
    }

    #[state(superstate = "tracked")]
    fn roam_sync_in_progress(
        &mut self,
        context: &mut DispatchContext,
        event: &RoamEvent,
    ) -> Outcome<State> {
        let RoamEvent::Request(request) = event else {
            return Super;
        };
        let from = RoamState::RoamSyncInProgress;
        match request.target {
            RoamState::RsoEnabled if request.reason == RoamReason::RoamAbort => {
                context.plan.unchanged();
            }
            RoamState::RsoEnabled => {
                Self::plan_resume(context, Some(RsoCommand::Start), request.reason);
                context.plan.rearm_election = true;
            }
            RoamState::RsoStopped => Self::plan_stop(context, from, request),
            RoamState::Init => context.plan.step(None, request.reason, RoamState::Init),
            RoamState::Deinit => Self::plan_deinit(context, from, request),
            _ => Self::invalid(context, from, request),
        }
        Handled
    }

    #[state(superstate = "tracked")]
    fn mlo_roam_sync_in_progress(
        &mut self,
        context: &mut DispatchContext,
        event: &RoamEvent,
    ) -> Outcome<State> {
        let RoamEvent::Request(request) = event else {
            return Super;
        };
        let from = RoamState::MloRoamSyncInProgress;
        match request.target {
            RoamState::Deinit => Self::plan_deinit(context, from, request),
            _ => Self::invalid(context, from, request),
        }
        Handled
    }

    #[superstate]
    fn tracked(&mut self, context: &mut DispatchContext, event: &RoamEvent) -> Outcome<State> {
        let _ = context;
        match event {
            RoamEvent::Commit(target) if *target == self.state => Handled,
            RoamEvent::Commit(target) => {
                self.state = *target;
                Transition(Self::state_for(*target))
            }
            RoamEvent::Request(_) => Handled,
        }
    }
}
