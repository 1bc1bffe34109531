use heapless::{Deque, Vec};

use crate::{
    collaborators::{ConnectionInfo, ScanCache},
    config::RoamIni,
    error::{DenyCause, RoamError},
    scoring::{rank_vec, score, CandidateAp, DenylistAction, ScoringPolicy},
    types::{MacAddr, MAX_SCAN_CANDIDATES},
};

use super::{
    policy::RoamPolicyContext,
    types::{InvokeRequest, InvokeTarget, RoamSource},
};

pub const MAX_PENDING_INVOKES: usize = 4;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) struct PendingInvoke {
    pub(super) target: InvokeTarget,
    pub(super) expires_at_ms: u64,
}

/// Roam-now requests waiting for the connection to be scanning again.
#[derive(Debug, Default)]
pub(super) struct InvokeQueue {
    pending: Deque<PendingInvoke, MAX_PENDING_INVOKES>,
}

impl InvokeQueue {
    pub(super) fn new() -> Self {
        Self {
            pending: Deque::new(),
        }
    }

    pub(super) fn push(&mut self, invoke: PendingInvoke) -> Result<(), RoamError> {
        self.pending
            .push_back(invoke)
            .map_err(|_| RoamError::ResourceExhausted)
    }

    pub(super) fn front(&self) -> Option<&PendingInvoke> {
        self.pending.front()
    }

    pub(super) fn pop(&mut self) -> Option<PendingInvoke> {
        self.pending.pop_front()
    }

    pub(super) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(super) fn clear(&mut self) {
        self.pending.clear();
    }

    /// Drops stale entries; returns how many went.
    pub(super) fn expire(&mut self, now_ms: u64) -> usize {
        let mut dropped = 0;
        while self
            .pending
            .front()
            .is_some_and(|invoke| invoke.expires_at_ms <= now_ms)
        {
            self.pending.pop_front();
            dropped += 1;
        }
        dropped
    }
}

/// Everything target validation looks at.
pub(super) struct InvokeContext<'a, S: ScanCache> {
    pub(super) info: &'a ConnectionInfo,
    pub(super) policy: &'a RoamPolicyContext,
    pub(super) ini: &'a RoamIni,
    pub(super) scan: &'a S,
    pub(super) scoring: &'a ScoringPolicy,
}

/// Turns a roam-now request into a concrete target.
pub(super) fn resolve<S: ScanCache>(
    ctx: &InvokeContext<'_, S>,
    request: &InvokeRequest,
) -> Result<InvokeTarget, RoamError> {
    let bssid = request.bssid.unwrap_or(MacAddr::ZERO);
    if request.source == RoamSource::Firmware {
        return Ok(InvokeTarget {
            bssid,
            freq_mhz: request.freq_mhz.unwrap_or(ctx.info.freq_mhz),
            source: RoamSource::Firmware,
            forced: false,
        });
    }

    if bssid.is_zero() {
        if !ctx.ini.data_stall_roam_supported {
            return Err(RoamError::PolicyDenied(DenyCause::DataStallUnsupported));
        }
        return Ok(InvokeTarget {
            bssid,
            freq_mhz: request.freq_mhz.unwrap_or(0),
            source: RoamSource::DataStall,
            forced: true,
        });
    }

    if bssid.is_broadcast() {
        return better_candidate(ctx, request.source);
    }

    let forced = request.source == RoamSource::Forced;
    if bssid == ctx.info.bssid {
        if !ctx.policy.self_bss_roam_allowed && !forced {
            return Err(RoamError::PolicyDenied(DenyCause::SelfBssRoam));
        }
        return Ok(InvokeTarget {
            bssid,
            freq_mhz: ctx.info.freq_mhz,
            source: request.source,
            forced,
        });
    }

    let entry = ctx
        .scan
        .lookup(bssid, request.freq_mhz)
        .ok_or(RoamError::NoCandidateFound)?;
    let freq_mhz = match request.freq_mhz {
        Some(freq) if freq != 0 => freq,
        _ => entry.freq_mhz,
    };
    if freq_mhz == 0 {
        return Err(RoamError::NoCandidateFound);
    }
    Ok(InvokeTarget {
        bssid,
        freq_mhz,
        source: request.source,
        forced,
    })
}

/// Best cached candidate scoring strictly above the current AP.
///
/// Denylisted entries and bands the connection may not use never qualify,
/// so an unscanned current AP cannot turn an avoided one into a target.
fn better_candidate<S: ScanCache>(
    ctx: &InvokeContext<'_, S>,
    source: RoamSource,
) -> Result<InvokeTarget, RoamError> {
    let current_score = ctx
        .scan
        .lookup(ctx.info.bssid, Some(ctx.info.freq_mhz))
        .map_or(0, |current| score(&current, &ctx.ini.score, ctx.scoring, None));

    let mut candidates: Vec<CandidateAp, MAX_SCAN_CANDIDATES> = Vec::new();
    ctx.scan.candidates(&mut candidates);
    rank_vec(&mut candidates, &ctx.ini.score, ctx.scoring, None);

    let allowed = ctx.policy.band_restriction;
    candidates
        .iter()
        .find(|candidate| {
            candidate.bssid != ctx.info.bssid
                && candidate.denylist == DenylistAction::None
                && candidate.band().is_none_or(|band| allowed.contains(band))
        })
        .filter(|best| best.score > current_score)
        .map(|best| InvokeTarget {
            bssid: best.bssid,
            freq_mhz: best.freq_mhz,
            source,
            forced: false,
        })
        .ok_or(RoamError::NoCandidateFound)
}
