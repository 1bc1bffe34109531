use heapless::Vec;

use crate::{
    controller::{RoamReason, RsoCommand},
    error::RoamError,
    scoring::ScoreConfig,
    types::{BandMask, ConnectionId, MacAddr, MAX_BUNDLE_CANDIDATES},
};

/// Immutable parameters for one offload command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigBundle {
    connection: ConnectionId,
    command: RsoCommand,
    reason: RoamReason,
    trigger_bitmap: u32,
    self_bss_roam: bool,
    supplicant_disabled: bool,
    band_mask: BandMask,
    score: Option<ScoreConfig>,
    candidates: Vec<MacAddr, MAX_BUNDLE_CANDIDATES>,
}

impl ConfigBundle {
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub fn command(&self) -> RsoCommand {
        self.command
    }

    pub fn reason(&self) -> RoamReason {
        self.reason
    }

    pub fn trigger_bitmap(&self) -> u32 {
        self.trigger_bitmap
    }

    pub fn self_bss_roam(&self) -> bool {
        self.self_bss_roam
    }

    pub fn supplicant_disabled(&self) -> bool {
        self.supplicant_disabled
    }

    /// Bands the firmware may scan and roam on.
    pub fn band_mask(&self) -> BandMask {
        self.band_mask
    }

    pub fn score(&self) -> Option<&ScoreConfig> {
        self.score.as_ref()
    }

    /// Preferred candidates, best first.
    pub fn candidates(&self) -> &[MacAddr] {
        &self.candidates
    }
}

pub struct ConfigBundleBuilder {
    bundle: ConfigBundle,
}

impl ConfigBundleBuilder {
    pub fn new(connection: ConnectionId, command: RsoCommand, reason: RoamReason) -> Self {
        Self {
            bundle: ConfigBundle {
                connection,
                command,
                reason,
                trigger_bitmap: 0,
                self_bss_roam: false,
                supplicant_disabled: false,
                band_mask: BandMask::ALL,
                score: None,
                candidates: Vec::new(),
            },
        }
    }

    pub fn trigger_bitmap(mut self, bitmap: u32) -> Self {
        self.bundle.trigger_bitmap = bitmap;
        self
    }

    pub fn self_bss_roam(mut self, allowed: bool) -> Self {
        self.bundle.self_bss_roam = allowed;
        self
    }

    pub fn supplicant_disabled(mut self, disabled: bool) -> Self {
        self.bundle.supplicant_disabled = disabled;
        self
    }

    pub fn band_mask(mut self, mask: BandMask) -> Self {
        self.bundle.band_mask = mask;
        self
    }

    pub fn score(mut self, config: ScoreConfig) -> Self {
        self.bundle.score = Some(config.sanitized());
        self
    }

    pub fn candidate(mut self, bssid: MacAddr) -> Result<Self, RoamError> {
        self.bundle
            .candidates
            .push(bssid)
            .map_err(|_| RoamError::ResourceExhausted)?;
        Ok(self)
    }

    pub fn remaining_candidates(&self) -> usize {
        MAX_BUNDLE_CANDIDATES - self.bundle.candidates.len()
    }

    pub fn build(self) -> ConfigBundle {
        self.bundle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_overflow_is_resource_exhausted() {
        let mut builder =
            ConfigBundleBuilder::new(ConnectionId(0), RsoCommand::Start, RoamReason::Connect);
        for last in 0..MAX_BUNDLE_CANDIDATES as u8 {
            builder = match builder.candidate(MacAddr::new([2, 0, 0, 0, 0, last])) {
                Ok(builder) => builder,
                Err(err) => panic!("unexpected error {err}"),
            };
        }
        assert_eq!(builder.remaining_candidates(), 0);
        assert!(matches!(
            builder.candidate(MacAddr::BROADCAST),
            Err(RoamError::ResourceExhausted)
        ));
    }

    #[test]
    fn score_is_stored_sanitized() {
        let mut config = ScoreConfig::defaults();
        config.weights.rssi = 200;
        let bundle = ConfigBundleBuilder::new(
            ConnectionId(1),
            RsoCommand::Update,
            RoamReason::ScoringCriteriaChanged,
        )
        .score(config)
        .build();
        assert_eq!(bundle.score().copied(), Some(config.sanitized()));
        assert_eq!(bundle.command(), RsoCommand::Update);
        assert_eq!(bundle.band_mask(), BandMask::ALL);
        assert!(bundle.candidates().is_empty());
    }
}
