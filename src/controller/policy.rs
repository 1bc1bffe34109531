use crate::types::BandMask;

use super::types::ControlBits;

/// Per-connection roaming policy, owned by the connection's arena slot.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RoamPolicyContext {
    pub trigger_bitmap: u32,
    pub supplicant_disabled: bool,
    pub forced_roaming: bool,
    pub self_bss_roam_allowed: bool,
    /// Bands this connection may roam on while another station is active.
    pub band_restriction: BandMask,
    pub control_bits: ControlBits,
    /// Roam was triggered to find a better AP rather than by link loss.
    pub roam_reason_better_ap: bool,
    pub host_roam_in_progress: bool,
}

impl RoamPolicyContext {
    pub const fn new(self_bss_roam_allowed: bool, supplicant_disabled: bool) -> Self {
        Self {
            trigger_bitmap: 0,
            supplicant_disabled,
            forced_roaming: false,
            self_bss_roam_allowed,
            band_restriction: BandMask::ALL,
            control_bits: ControlBits::NONE,
            roam_reason_better_ap: false,
            host_roam_in_progress: false,
        }
    }

    /// Offload may run: no internal disable bit and the supplicant allows it.
    pub const fn offload_permitted(&self) -> bool {
        self.control_bits.is_empty() && !self.supplicant_disabled
    }

    /// State reset on entering deinit.
    pub fn reset_for_deinit(&mut self) {
        self.control_bits = ControlBits::NONE;
        self.forced_roaming = false;
        self.host_roam_in_progress = false;
        self.roam_reason_better_ap = false;
    }
}
