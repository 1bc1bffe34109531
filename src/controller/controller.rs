use heapless::Vec;

use crate::{
    assembler::{ConfigAssembler, ConnectionSnapshot},
    collaborators::{ConnectionInfo, ConnectionManager, FirmwareTransport, MloRole, PolicyManager, ScanCache},
    config::RoamIni,
    error::{DenyCause, RoamError},
    scoring::{CandidateAp, ScoringPolicy},
    types::{Band, BandMask, ConnectionId, MAX_CONNECTIONS, MAX_SCAN_CANDIDATES},
};

use super::{
    arbitration::{elect_primary, single_roamer, Holder},
    engine::RoamEngine,
    events::{PlanVerdict, TransitionPlan},
    invoke::{resolve, InvokeContext, InvokeQueue, PendingInvoke},
    machine::Guard,
    policy::RoamPolicyContext,
    timers::{TimerKind, TimerTable},
    trace::{TraceStatus, TransitionTrace},
    types::{ControlBits, InvokeRequest, RoamReason, RoamRequest, RoamSource, RoamState, RsoCommand},
};

const LOG_TARGET: &str = "wlan_roam::controller";

struct ConnectionSlot {
    engine: RoamEngine,
    policy: RoamPolicyContext,
    invokes: InvokeQueue,
    enable_seq: u32,
}

/// What one applied request did.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(super) struct ApplyOutcome {
    pub(super) before: RoamState,
    pub(super) after: RoamState,
    pub(super) commands: u8,
    pub(super) stop_sent: bool,
}

impl ApplyOutcome {
    pub(super) fn changed(&self) -> bool {
        self.before != self.after || self.commands > 0
    }
}

/// Roam state for every connection plus the collaborators it drives.
///
/// All calls are synchronous. Requests for one connection are handled one
/// at a time; cross-connection work (primary arbitration, re-enabling other
/// stations) touches one connection slot at a time.
pub struct RoamController<A, C, S, T, P> {
    ini: RoamIni,
    scoring: ScoringPolicy,
    assembler: A,
    connections: C,
    scan: S,
    transport: T,
    policy: P,
    slots: [Option<ConnectionSlot>; MAX_CONNECTIONS],
    timers: TimerTable,
    next_enable_seq: u32,
}

impl<A, C, S, T, P> RoamController<A, C, S, T, P>
where
    A: ConfigAssembler,
    C: ConnectionManager,
    S: ScanCache,
    T: FirmwareTransport,
    P: PolicyManager,
{
    pub fn new(
        ini: RoamIni,
        scoring: ScoringPolicy,
        assembler: A,
        connections: C,
        scan: S,
        transport: T,
        policy: P,
    ) -> Self {
        Self {
            ini: ini.sanitized(),
            scoring,
            assembler,
            connections,
            scan,
            transport,
            policy,
            slots: core::array::from_fn(|_| None),
            timers: TimerTable::new(),
            next_enable_seq: 0,
        }
    }

    pub fn ini(&self) -> &RoamIni {
        &self.ini
    }

    pub fn assembler_mut(&mut self) -> &mut A {
        &mut self.assembler
    }

    pub fn connections(&self) -> &C {
        &self.connections
    }

    pub fn connections_mut(&mut self) -> &mut C {
        &mut self.connections
    }

    pub fn scan_cache_mut(&mut self) -> &mut S {
        &mut self.scan
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn policy_manager(&self) -> &P {
        &self.policy
    }

    pub fn policy_manager_mut(&mut self) -> &mut P {
        &mut self.policy
    }

    /// Local capabilities and preferred channels shared by every connection.
    ///
    /// The DBS flag and concurrent bands are filled per connection when a
    /// bundle is assembled or a roam target is picked.
    pub fn scoring_policy_mut(&mut self) -> &mut ScoringPolicy {
        &mut self.scoring
    }

    /// Scoring policy as seen from `id` right now.
    pub fn scoring_policy_for(&self, id: ConnectionId) -> ScoringPolicy {
        let mut scoring = self.scoring.clone();
        scoring.caps.dbs = self.policy.is_dbs();
        scoring.concurrent_bands = self.concurrent_bands(id);
        scoring
    }

    /// Bands the other associated stations operate on. Member links of
    /// `id`'s own association do not count.
    fn concurrent_bands(&self, id: ConnectionId) -> BandMask {
        let mut stations: Vec<ConnectionId, MAX_CONNECTIONS> = Vec::new();
        self.connections.connected_stations(&mut stations);
        stations
            .iter()
            .filter(|other| **other != id)
            .filter_map(|other| self.connections.connection_info(*other))
            .filter(|info| !matches!(info.mlo, MloRole::MemberLink { assoc } if assoc == id))
            .filter_map(|info| Band::from_freq(info.freq_mhz))
            .fold(BandMask::NONE, BandMask::with)
    }

    pub fn state(&self, id: ConnectionId) -> Option<RoamState> {
        self.slot(id).ok().map(|slot| slot.engine.state())
    }

    pub fn policy_context(&self, id: ConnectionId) -> Option<&RoamPolicyContext> {
        self.slot(id).ok().map(|slot| &slot.policy)
    }

    pub fn pending_invokes(&self, id: ConnectionId) -> usize {
        self.slot(id).map_or(0, |slot| slot.invokes.len())
    }

    pub fn timer_armed(&self, id: ConnectionId, kind: TimerKind) -> bool {
        self.timers.is_armed(id, kind)
    }

    /// When the caller should next run [`Self::poll_timers`] for this timer.
    pub fn timer_deadline(&self, id: ConnectionId, kind: TimerKind) -> Option<u64> {
        self.timers.deadline(id, kind)
    }

    fn slot(&self, id: ConnectionId) -> Result<&ConnectionSlot, RoamError> {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(RoamError::UnknownConnection(id))
    }

    fn slot_mut(&mut self, id: ConnectionId) -> Result<&mut ConnectionSlot, RoamError> {
        self.slots
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(RoamError::UnknownConnection(id))
    }

    fn info(&self, id: ConnectionId) -> Result<ConnectionInfo, RoamError> {
        self.connections
            .connection_info(id)
            .ok_or(RoamError::UnknownConnection(id))
    }

    /// Registers a connection in deinit. Adding a known connection is a no-op.
    ///
    /// A new connection re-runs primary election, so a pinned primary that
    /// comes up takes roaming over.
    pub fn add_connection(&mut self, id: ConnectionId) -> Result<(), RoamError> {
        let self_bss = self.ini.self_bss_roam_allowed;
        let supplicant_disabled = self.ini.user_roaming_disabled;
        let entry = self
            .slots
            .get_mut(id.index())
            .ok_or(RoamError::ResourceExhausted)?;
        if entry.is_some() {
            return Ok(());
        }
        *entry = Some(ConnectionSlot {
            engine: RoamEngine::new(),
            policy: RoamPolicyContext::new(self_bss, supplicant_disabled),
            invokes: InvokeQueue::new(),
            enable_seq: 0,
        });
        log::info!(target: LOG_TARGET, "roam: conn={} added", id);
        self.reevaluate_primary()
    }

    /// Drives the connection to deinit, then forgets it.
    ///
    /// The slot is released even when the deinit could not be sent; the
    /// error is still returned.
    pub fn remove_connection(&mut self, id: ConnectionId) -> Result<(), RoamError> {
        self.slot(id)?;
        let result = self
            .apply(id, RoamRequest::new(RoamState::Deinit, RoamReason::Disconnected))
            .map(|_| ());
        if self.timers.cancel(id, TimerKind::StopResponse) {
            self.connections.continue_disconnect(id, false);
        }
        self.timers.cancel_all(id);
        if let Some(entry) = self.slots.get_mut(id.index()) {
            *entry = None;
        }
        log::info!(target: LOG_TARGET, "roam: conn={} removed", id);
        match result {
            Err(RoamError::UnknownConnection(_)) => Ok(()),
            other => other,
        }
    }

    pub fn handle(&mut self, id: ConnectionId, request: RoamRequest) -> Result<(), RoamError> {
        let info = self.info(id)?;
        let id = match info.mlo {
            MloRole::MemberLink { assoc }
                if request.target == RoamState::Deinit
                    && request.reason == RoamReason::Disconnected =>
            {
                assoc
            }
            _ => id,
        };
        self.apply(id, request).map(|_| ())
    }

    fn guard(&mut self, id: ConnectionId, info: &ConnectionInfo) -> Result<Guard, RoamError> {
        let trigger_bitmap = self.policy.trigger_bitmap(id);
        let band_restriction = self.policy.band_mask(id);
        let pinned = self.policy.primary();
        let conflict = if single_roamer(self.ini.dual_sta_roam_allowed, self.policy.is_dbs()) {
            self.other_holder(id)
        } else {
            None
        };
        let stop_pending = self.timers.is_armed(id, TimerKind::StopResponse);
        let offload_enabled = self.ini.roam_offload_enabled;
        let slot = self.slot_mut(id)?;
        slot.policy.trigger_bitmap = trigger_bitmap;
        slot.policy.band_restriction = band_restriction;
        Ok(Guard {
            link_up: info.is_up(),
            member_link: info.mlo.is_member(),
            offload_enabled,
            policy: slot.policy,
            stop_pending,
            conflict,
            pinned_primary: pinned == Some(id),
        })
    }

    fn holders(&self) -> Vec<Holder, MAX_CONNECTIONS> {
        let mut holders = Vec::new();
        for (idx, slot) in self.slots.iter().enumerate() {
            let Some(slot) = slot else { continue };
            let id = ConnectionId(idx as u8);
            if slot.engine.state() == RoamState::Deinit {
                continue;
            }
            let roaming_station = self
                .connections
                .connection_info(id)
                .is_some_and(|info| info.is_station() && !info.mlo.is_member());
            if roaming_station {
                let _ = holders.push(Holder {
                    id,
                    enable_seq: slot.enable_seq,
                });
            }
        }
        holders
    }

    fn other_holder(&self, id: ConnectionId) -> Option<ConnectionId> {
        self.holders()
            .iter()
            .map(|holder| holder.id)
            .find(|holder| *holder != id)
    }

    fn apply(&mut self, id: ConnectionId, request: RoamRequest) -> Result<ApplyOutcome, RoamError> {
        let info = self.info(id)?;
        let guard = self.guard(id, &info)?;
        let before = self.slot(id)?.engine.state();
        let plan = self.slot_mut(id)?.engine.plan(request, guard);

        let mut outcome = ApplyOutcome {
            before,
            after: before,
            ..ApplyOutcome::default()
        };
        let result = match plan.verdict {
            PlanVerdict::Rejected(err) => Err(err),
            PlanVerdict::Unchanged => Ok(()),
            PlanVerdict::Proceed => {
                log::debug!(
                    target: LOG_TARGET,
                    "roam: conn={} {}->{} steps={} commands={}",
                    id,
                    before,
                    request.target,
                    plan.steps.len(),
                    plan.commands()
                );
                self.execute(id, &info, &plan, &mut outcome)
            }
        };
        outcome.after = self.slot(id)?.engine.state();

        let status = match &result {
            Ok(()) if outcome.changed() => TraceStatus::Applied,
            Ok(()) => TraceStatus::Unchanged,
            Err(err) => TraceStatus::from_error(err),
        };
        TransitionTrace {
            conn: id,
            from: before,
            to: outcome.after,
            reason: request.reason,
            status,
            commands: outcome.commands,
        }
        .emit();

        match result {
            Ok(()) => {
                self.after_apply(id, &plan, &outcome)?;
                Ok(outcome)
            }
            Err(err) => {
                if err.is_temporary() {
                    log::info!(
                        target: LOG_TARGET,
                        "roam: conn={} {}->{} blocked: {}",
                        id,
                        before,
                        request.target,
                        err
                    );
                } else {
                    log::debug!(
                        target: LOG_TARGET,
                        "roam: conn={} {}->{} rejected: {}",
                        id,
                        before,
                        request.target,
                        err
                    );
                }
                Err(err)
            }
        }
    }

    fn execute(
        &mut self,
        id: ConnectionId,
        info: &ConnectionInfo,
        plan: &TransitionPlan,
        outcome: &mut ApplyOutcome,
    ) -> Result<(), RoamError> {
        if let Some((other, reason)) = plan.preempt {
            log::info!(
                target: LOG_TARGET,
                "roam: conn={} takes roaming from conn={} reason={}",
                id,
                other,
                reason
            );
            self.apply(other, RoamRequest::new(RoamState::Deinit, reason))?;
        }

        for step in plan.steps.iter() {
            if let Some(command) = step.command {
                self.send(id, info, command, step.reason)?;
                outcome.commands = outcome.commands.saturating_add(1);
                outcome.stop_sent |= command == RsoCommand::Stop;
            }
            self.commit(id, step.state)?;
        }
        Ok(())
    }

    fn send(
        &mut self,
        id: ConnectionId,
        info: &ConnectionInfo,
        command: RsoCommand,
        reason: RoamReason,
    ) -> Result<(), RoamError> {
        let mut candidates: Vec<CandidateAp, MAX_SCAN_CANDIDATES> = Vec::new();
        if matches!(command, RsoCommand::Start | RsoCommand::Update) {
            self.scan.candidates(&mut candidates);
        }
        let scoring = self.scoring_policy_for(id);
        let slot = self.slot(id)?;
        let policy = slot.policy;
        let snapshot = ConnectionSnapshot {
            id,
            info: *info,
            state: slot.engine.state(),
            policy: &policy,
            score: &self.ini.score,
            scoring: &scoring,
            candidates: &candidates,
        };
        let bundle = self.assembler.assemble(&snapshot, command, reason)?;
        if let Err(err) = self.transport.send(id, command, &bundle) {
            log::warn!(
                target: LOG_TARGET,
                "roam: conn={} cmd={} reason={} send failed: {}",
                id,
                command.as_str(),
                reason,
                err
            );
            return Err(err.into());
        }
        log::debug!(
            target: LOG_TARGET,
            "roam: conn={} cmd={} reason={} sent",
            id,
            command.as_str(),
            reason
        );
        Ok(())
    }

    fn commit(&mut self, id: ConnectionId, state: RoamState) -> Result<(), RoamError> {
        let seq = self.next_enable_seq;
        let slot = self.slot_mut(id)?;
        let before = slot.engine.state();
        slot.engine.commit(state);
        if before == state {
            return Ok(());
        }
        match state {
            RoamState::Init => {
                slot.enable_seq = seq;
                self.next_enable_seq = self.next_enable_seq.wrapping_add(1);
            }
            RoamState::Deinit => self.enter_deinit(id)?,
            _ => {}
        }
        Ok(())
    }

    fn enter_deinit(&mut self, id: ConnectionId) -> Result<(), RoamError> {
        self.policy.set_pcl_active(id, false);
        let slot = self.slot_mut(id)?;
        slot.policy.reset_for_deinit();
        let purged = slot.invokes.len();
        slot.invokes.clear();
        if purged > 0 {
            log::info!(target: LOG_TARGET, "roam: conn={} purged invokes={}", id, purged);
        }
        // a disconnect waiting on the stop ack must not be left hanging
        if self.timers.cancel(id, TimerKind::StopResponse) {
            self.connections.continue_disconnect(id, false);
        }
        self.timers.cancel_all(id);
        Ok(())
    }

    fn after_apply(
        &mut self,
        id: ConnectionId,
        plan: &TransitionPlan,
        outcome: &ApplyOutcome,
    ) -> Result<(), RoamError> {
        if plan.link_lost {
            log::info!(target: LOG_TARGET, "roam: conn={} link lost after failed roam", id);
            self.connections.indicate_link_lost(id);
        }
        if plan.reenable_others && outcome.after == RoamState::Deinit && outcome.changed() {
            self.enable_other_stations(id);
        }
        if plan.rearm_election {
            self.reevaluate_primary()?;
        }
        Ok(())
    }

    fn enable_other_stations(&mut self, id: ConnectionId) {
        let mut stations: Vec<ConnectionId, MAX_CONNECTIONS> = Vec::new();
        self.connections.connected_stations(&mut stations);
        for other in stations {
            if other == id || self.state(other) != Some(RoamState::Deinit) {
                continue;
            }
            let member = self
                .connections
                .connection_info(other)
                .is_some_and(|info| info.mlo.is_member());
            if member {
                continue;
            }
            let enabled = self
                .apply(other, RoamRequest::new(RoamState::Init, RoamReason::CtxInit))
                .and_then(|_| {
                    self.apply(other, RoamRequest::new(RoamState::RsoEnabled, RoamReason::CtxInit))
                });
            if let Err(err) = enabled {
                log::debug!(
                    target: LOG_TARGET,
                    "roam: conn={} not re-enabled: {}",
                    other,
                    err
                );
            }
        }
    }

    /// Re-runs primary election; losers are driven to deinit.
    ///
    /// A pinned primary that sits in deinit while another station roams is
    /// brought up, which takes roaming away from that station.
    pub fn reevaluate_primary(&mut self) -> Result<(), RoamError> {
        if !single_roamer(self.ini.dual_sta_roam_allowed, self.policy.is_dbs()) {
            return Ok(());
        }
        self.promote_pinned()?;
        let holders = self.holders();
        if holders.len() < 2 {
            return Ok(());
        }
        let Some(primary) = elect_primary(self.policy.primary(), &holders) else {
            return Ok(());
        };
        log::info!(target: LOG_TARGET, "roam: primary={} holders={}", primary, holders.len());
        for holder in holders.iter().filter(|holder| holder.id != primary) {
            self.apply(
                holder.id,
                RoamRequest::new(RoamState::Deinit, RoamReason::RoamSetPrimary),
            )?;
        }
        Ok(())
    }

    fn promote_pinned(&mut self) -> Result<(), RoamError> {
        let Some(pinned) = self.policy.primary() else {
            return Ok(());
        };
        if self.state(pinned) != Some(RoamState::Deinit) {
            return Ok(());
        }
        let eligible = self
            .connections
            .connection_info(pinned)
            .is_some_and(|info| info.is_up() && info.is_station() && !info.mlo.is_member());
        if !eligible {
            return Ok(());
        }
        let Some(holder) = self.other_holder(pinned) else {
            return Ok(());
        };
        log::info!(
            target: LOG_TARGET,
            "roam: pinned primary={} replaces holder={}",
            pinned,
            holder
        );
        let reason = RoamReason::RoamSetPrimary;
        self.apply(pinned, RoamRequest::new(RoamState::Init, reason))?;
        self.apply(pinned, RoamRequest::new(RoamState::RsoEnabled, reason))?;
        Ok(())
    }

    /// Call after the policy manager changed its pinned primary.
    pub fn on_primary_changed(&mut self) -> Result<(), RoamError> {
        self.reevaluate_primary()
    }

    pub fn disable_roaming(&mut self, id: ConnectionId, bits: ControlBits) -> Result<(), RoamError> {
        let slot = self.slot_mut(id)?;
        slot.policy.control_bits.insert(bits);
        let state = slot.engine.state();
        log::info!(
            target: LOG_TARGET,
            "roam: conn={} disable bits={:#04x}",
            id,
            slot.policy.control_bits.bits()
        );
        if state.is_active() {
            self.handle(id, RoamRequest::new(RoamState::RsoStopped, RoamReason::DriverDisabled))?;
        }
        Ok(())
    }

    pub fn enable_roaming(&mut self, id: ConnectionId, bits: ControlBits) -> Result<(), RoamError> {
        let slot = self.slot_mut(id)?;
        slot.policy.control_bits.remove(bits);
        let remaining = slot.policy.control_bits;
        let state = slot.engine.state();
        log::info!(
            target: LOG_TARGET,
            "roam: conn={} enable remaining_bits={:#04x}",
            id,
            remaining.bits()
        );
        if remaining.is_empty() && matches!(state, RoamState::Init | RoamState::RsoStopped) {
            self.handle(id, RoamRequest::new(RoamState::RsoEnabled, RoamReason::DriverEnabled))?;
        }
        Ok(())
    }

    pub fn set_supplicant_roaming(&mut self, id: ConnectionId, enabled: bool) -> Result<(), RoamError> {
        let slot = self.slot_mut(id)?;
        slot.policy.supplicant_disabled = !enabled;
        let state = slot.engine.state();
        log::info!(target: LOG_TARGET, "roam: conn={} supplicant_roaming={}", id, enabled);

        if !enabled {
            if state.is_active() {
                self.handle(
                    id,
                    RoamRequest::new(RoamState::RsoStopped, RoamReason::SupplicantDisabledRoaming),
                )?;
            }
            return Ok(());
        }

        let reason = RoamReason::SupplicantInitRoaming;
        match state {
            RoamState::Deinit => {
                self.handle(id, RoamRequest::new(RoamState::Init, reason))?;
                self.handle(id, RoamRequest::new(RoamState::RsoEnabled, reason))
            }
            RoamState::Init | RoamState::RsoStopped => {
                self.handle(id, RoamRequest::new(RoamState::RsoEnabled, reason))
            }
            _ => Ok(()),
        }
    }

    /// Stops offload ahead of a disconnect.
    ///
    /// When the firmware acknowledges stops, the disconnect resumes on
    /// [`Self::on_stop_response`] or when the stop timer runs out; otherwise it
    /// resumes right away.
    pub fn stop_for_disconnect(&mut self, id: ConnectionId, now_ms: u64) -> Result<(), RoamError> {
        let result = self.apply(
            id,
            RoamRequest::new(RoamState::RsoStopped, RoamReason::DriverDisabled),
        );
        let awaiting_ack = self.ini.rso_stop_response_supported
            && result.as_ref().is_ok_and(|outcome| outcome.stop_sent);
        if awaiting_ack {
            let deadline = now_ms.saturating_add(u64::from(self.ini.rso_stop_timeout_ms));
            self.timers.arm(id, TimerKind::StopResponse, deadline)?;
            log::debug!(
                target: LOG_TARGET,
                "roam: conn={} awaiting stop ack until={}",
                id,
                deadline
            );
        } else {
            self.connections.continue_disconnect(id, false);
        }
        match result {
            Ok(_) | Err(RoamError::InvalidTransition { .. }) => Ok(()),
            Err(err) => Err(err),
        }
    }

    pub fn on_stop_response(&mut self, id: ConnectionId) -> Result<(), RoamError> {
        self.slot(id)?;
        if self.timers.cancel(id, TimerKind::StopResponse) {
            self.connections.continue_disconnect(id, false);
        } else {
            log::debug!(target: LOG_TARGET, "roam: conn={} unexpected stop ack", id);
        }
        Ok(())
    }

    pub fn on_roam_sync_complete(&mut self, id: ConnectionId, authenticated: bool) -> Result<(), RoamError> {
        let info = self.info(id)?;
        let slot = self.slot_mut(id)?;
        slot.policy.host_roam_in_progress = false;
        slot.policy.forced_roaming = false;

        if info.mlo.is_member() {
            return self.handle(
                id,
                RoamRequest::new(RoamState::Deinit, RoamReason::RoamHandoffDone),
            );
        }
        if authenticated {
            self.handle(id, RoamRequest::new(RoamState::RsoEnabled, RoamReason::Connect))?;
        } else {
            self.handle(id, RoamRequest::new(RoamState::RsoStopped, RoamReason::Disconnected))?;
        }

        let dual_dbs = self.ini.dual_sta_roam_allowed && self.policy.is_dbs();
        if dual_dbs && self.state(id) == Some(RoamState::RsoEnabled) {
            self.policy.set_pcl_active(id, true);
            self.enable_other_stations(id);
        }
        self.reevaluate_primary()
    }

    /// A roam attempt failed after a candidate was tried.
    ///
    /// Restores scanning (or the stopped state) and reports
    /// [`RoamError::RoamFailed`] so the caller can tell it from a search
    /// that found nothing.
    pub fn on_roam_failure(&mut self, id: ConnectionId) -> Result<(), RoamError> {
        let slot = self.slot_mut(id)?;
        slot.policy.host_roam_in_progress = false;
        slot.policy.forced_roaming = false;
        let state = slot.engine.state();
        match state {
            RoamState::RoamingInProgress => {
                self.handle(id, RoamRequest::new(RoamState::RsoEnabled, RoamReason::RoamAbort))?;
            }
            RoamState::RoamSyncInProgress => {
                self.handle(id, RoamRequest::new(RoamState::RsoStopped, RoamReason::RoamSyncFailed))?;
            }
            _ => {}
        }
        Err(RoamError::RoamFailed)
    }

    /// Pushes changed scan parameters to a running offload.
    pub fn update_config(&mut self, id: ConnectionId, reason: RoamReason) -> Result<(), RoamError> {
        let state = self.slot(id)?.engine.state();
        if state != RoamState::RsoEnabled {
            return Err(RoamError::InvalidTransition {
                from: state,
                requested: RoamState::RsoEnabled,
            });
        }
        self.handle(id, RoamRequest::new(RoamState::RsoEnabled, reason))
    }

    /// Validates a roam-now request and queues it on the connection.
    pub fn invoke(&mut self, id: ConnectionId, request: InvokeRequest, now_ms: u64) -> Result<(), RoamError> {
        let info = self.info(id)?;
        let slot = self.slot(id)?;
        let state = slot.engine.state();
        if info.mlo.is_member() {
            return Err(RoamError::InvalidTransition {
                from: state,
                requested: RoamState::RoamingInProgress,
            });
        }
        if !slot.policy.control_bits.is_empty() {
            return Err(RoamError::PolicyDenied(DenyCause::ControlBitsSet(
                slot.policy.control_bits.bits(),
            )));
        }
        if state == RoamState::Deinit {
            return Err(RoamError::PolicyDenied(DenyCause::NotInitialized));
        }

        let scoring = self.scoring_policy_for(id);
        let ctx = InvokeContext {
            info: &info,
            policy: &slot.policy,
            ini: &self.ini,
            scan: &self.scan,
            scoring: &scoring,
        };
        let target = resolve(&ctx, &request)?;
        let expires_at_ms = now_ms.saturating_add(u64::from(self.ini.invoke_expiry_ms));

        let slot = self.slot_mut(id)?;
        slot.invokes.push(PendingInvoke {
            target,
            expires_at_ms,
        })?;
        if target.source == RoamSource::DataStall {
            slot.policy.forced_roaming = true;
        }
        let queued = slot.invokes.len();
        if !self.timers.is_armed(id, TimerKind::InvokeExpiry) {
            self.timers.arm(id, TimerKind::InvokeExpiry, expires_at_ms)?;
        }
        log::info!(
            target: LOG_TARGET,
            "roam: conn={} invoke bssid={} freq={} source={} queued={}",
            id,
            target.bssid,
            target.freq_mhz,
            target.source.as_str(),
            queued
        );
        Ok(())
    }

    /// Sends queued roam-now requests while the connection is scanning.
    ///
    /// Returns how many went out. Requests stay queued in any other state.
    /// A request leaves the queue only once the connection moved to roaming
    /// and the transport accepted it; a refused send moves the connection
    /// back to scanning.
    pub fn process(&mut self, id: ConnectionId) -> Result<usize, RoamError> {
        let mut sent = 0;
        loop {
            let slot = self.slot(id)?;
            if slot.engine.state() != RoamState::RsoEnabled {
                break;
            }
            let Some(next) = slot.invokes.front().copied() else {
                break;
            };
            self.apply(
                id,
                RoamRequest::new(RoamState::RoamingInProgress, RoamReason::OsRequestedRoamingNow),
            )?;
            if let Err(err) = self.transport.invoke(id, &next.target) {
                log::warn!(
                    target: LOG_TARGET,
                    "roam: conn={} invoke bssid={} send failed: {}",
                    id,
                    next.target.bssid,
                    err
                );
                self.apply(id, RoamRequest::new(RoamState::RsoEnabled, RoamReason::RoamAbort))?;
                return Err(err.into());
            }

            let slot = self.slot_mut(id)?;
            slot.invokes.pop();
            slot.policy.host_roam_in_progress = true;
            slot.policy.roam_reason_better_ap = next.target.source != RoamSource::DataStall;
            let remaining = slot.invokes.len();
            sent += 1;
            if remaining == 0 {
                self.timers.cancel(id, TimerKind::InvokeExpiry);
            }
        }
        Ok(sent)
    }

    /// Fires every timer due at `now_ms`.
    pub fn poll_timers(&mut self, now_ms: u64) -> Result<(), RoamError> {
        while let Some((id, kind)) = self.timers.pop_expired(now_ms) {
            log::debug!(target: LOG_TARGET, "roam: conn={} timer={} fired", id, kind.as_str());
            match kind {
                TimerKind::StopResponse => {
                    log::warn!(target: LOG_TARGET, "roam: conn={} stop ack timed out", id);
                    self.connections.continue_disconnect(id, true);
                }
                TimerKind::InvokeExpiry => {
                    let Ok(slot) = self.slot_mut(id) else {
                        continue;
                    };
                    let dropped = slot.invokes.expire(now_ms);
                    let next = slot.invokes.front().map(|invoke| invoke.expires_at_ms);
                    if dropped > 0 {
                        log::info!(target: LOG_TARGET, "roam: conn={} expired invokes={}", id, dropped);
                    }
                    if let Some(deadline) = next {
                        self.timers.arm(id, TimerKind::InvokeExpiry, deadline)?;
                    }
                }
            }
        }
        Ok(())
    }
}
