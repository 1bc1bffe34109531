use heapless::Vec;

use crate::{
    controller::{RoamReason, RsoCommand},
    error::RoamError,
    scoring::{rank_vec, CandidateAp},
    types::MAX_SCAN_CANDIDATES,
};

use super::{ConfigAssembler, ConfigBundle, ConfigBundleBuilder, ConnectionSnapshot};

const LOG_TARGET: &str = "wlan_roam::assembler";

/// Reference assembler: carries the policy flags and, for start and update,
/// a ranked preference list drawn from the snapshot's scan results.
#[derive(Clone, Copy, Debug, Default)]
pub struct BasicAssembler;

impl BasicAssembler {
    pub const fn new() -> Self {
        Self
    }

    fn with_candidates(
        &self,
        mut builder: ConfigBundleBuilder,
        snapshot: &ConnectionSnapshot<'_>,
    ) -> Result<ConfigBundleBuilder, RoamError> {
        let allowed = snapshot.policy.band_restriction;
        let mut ranked: Vec<CandidateAp, MAX_SCAN_CANDIDATES> = Vec::new();
        for candidate in snapshot.candidates {
            // unknown frequencies have no band to restrict on
            if candidate.band().is_some_and(|band| !allowed.contains(band)) {
                log::debug!(
                    target: LOG_TARGET,
                    "assembler: conn={} skip bssid={} freq={} outside bands={:#04x}",
                    snapshot.id,
                    candidate.bssid,
                    candidate.freq_mhz,
                    allowed.0
                );
                continue;
            }
            ranked
                .push(*candidate)
                .map_err(|_| RoamError::ResourceExhausted)?;
        }
        rank_vec(&mut ranked, snapshot.score, snapshot.scoring, None);

        for candidate in ranked.iter() {
            if candidate.bssid == snapshot.info.bssid {
                continue;
            }
            if builder.remaining_candidates() == 0 {
                break;
            }
            builder = builder.candidate(candidate.bssid)?;
        }
        Ok(builder.score(*snapshot.score))
    }
}

impl ConfigAssembler for BasicAssembler {
    fn assemble(
        &mut self,
        snapshot: &ConnectionSnapshot<'_>,
        command: RsoCommand,
        reason: RoamReason,
    ) -> Result<ConfigBundle, RoamError> {
        let builder = ConfigBundleBuilder::new(snapshot.id, command, reason)
            .trigger_bitmap(snapshot.policy.trigger_bitmap)
            .self_bss_roam(snapshot.policy.self_bss_roam_allowed)
            .supplicant_disabled(snapshot.policy.supplicant_disabled)
            .band_mask(snapshot.policy.band_restriction);
        let builder = match command {
            RsoCommand::Start | RsoCommand::Update => self.with_candidates(builder, snapshot)?,
            RsoCommand::Init | RsoCommand::Stop | RsoCommand::Deinit => builder,
        };
        let bundle = builder.build();
        log::debug!(
            target: LOG_TARGET,
            "assembler: conn={} cmd={} reason={} candidates={}",
            snapshot.id,
            command.as_str(),
            reason,
            bundle.candidates().len()
        );
        Ok(bundle)
    }
}
