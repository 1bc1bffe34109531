use core::fmt;

use crate::types::MacAddr;

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum RoamState {
    #[default]
    Deinit,
    Init,
    RsoEnabled,
    RsoStopped,
    RoamingInProgress,
    RoamSyncInProgress,
    MloRoamSyncInProgress,
}

impl RoamState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deinit => "deinit",
            Self::Init => "init",
            Self::RsoEnabled => "rso_enabled",
            Self::RsoStopped => "rso_stopped",
            Self::RoamingInProgress => "roaming_in_progress",
            Self::RoamSyncInProgress => "roam_sync_in_progress",
            Self::MloRoamSyncInProgress => "mlo_roam_sync_in_progress",
        }
    }

    /// States in which the offload engine has been told to scan.
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            Self::RsoEnabled | Self::RoamingInProgress | Self::RoamSyncInProgress
        )
    }
}

impl fmt::Display for RoamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum RoamReason {
    Connect = 1,
    Disconnected = 4,
    PreauthFailedForAll = 11,
    NoCandidateFound = 12,
    OsRequestedRoamingNow = 15,
    SetDenylistBssid = 29,
    RoamSyncFailed = 36,
    PskPmkChanged = 37,
    RoamStopAll = 38,
    SupplicantDisabledRoaming = 39,
    CtxInit = 40,
    SmeIssued = 42,
    DriverEnabled = 43,
    ScoringCriteriaChanged = 45,
    SupplicantInitRoaming = 46,
    SupplicantDeinitRoaming = 47,
    DriverDisabled = 48,
    RoamCandidateFound = 51,
    RoamHandoffDone = 52,
    RoamAbort = 53,
    RoamSetPrimary = 54,
}

impl RoamReason {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Disconnected => "disconnected",
            Self::PreauthFailedForAll => "preauth_failed_for_all",
            Self::NoCandidateFound => "no_candidate_found",
            Self::OsRequestedRoamingNow => "os_requested_roaming_now",
            Self::SetDenylistBssid => "set_denylist_bssid",
            Self::RoamSyncFailed => "roam_sync_failed",
            Self::PskPmkChanged => "psk_pmk_changed",
            Self::RoamStopAll => "roam_stop_all",
            Self::SupplicantDisabledRoaming => "supplicant_disabled_roaming",
            Self::CtxInit => "ctx_init",
            Self::SmeIssued => "sme_issued",
            Self::DriverEnabled => "driver_enabled",
            Self::ScoringCriteriaChanged => "scoring_criteria_changed",
            Self::SupplicantInitRoaming => "supplicant_init_roaming",
            Self::SupplicantDeinitRoaming => "supplicant_deinit_roaming",
            Self::DriverDisabled => "driver_disabled",
            Self::RoamCandidateFound => "roam_candidate_found",
            Self::RoamHandoffDone => "roam_handoff_done",
            Self::RoamAbort => "roam_abort",
            Self::RoamSetPrimary => "roam_set_primary",
        }
    }

    /// Reason carried by the stop command issued for a request with this reason.
    pub const fn stop_reason(self) -> Self {
        match self {
            Self::RoamSyncFailed => Self::RoamSyncFailed,
            Self::DriverDisabled => Self::RoamStopAll,
            Self::SupplicantDisabledRoaming => Self::SupplicantDisabledRoaming,
            Self::Disconnected => Self::Disconnected,
            Self::OsRequestedRoamingNow => Self::OsRequestedRoamingNow,
            Self::RoamSetPrimary => Self::RoamSetPrimary,
            _ => Self::SmeIssued,
        }
    }
}

impl fmt::Display for RoamReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested target state and why it was requested.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RoamRequest {
    pub target: RoamState,
    pub reason: RoamReason,
}

impl RoamRequest {
    pub const fn new(target: RoamState, reason: RoamReason) -> Self {
        Self { target, reason }
    }
}

/// Internal reasons roaming is held off, one bit each.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ControlBits(u8);

impl ControlBits {
    pub const NONE: Self = Self(0);
    pub const START_BSS: Self = Self(1 << 0);
    pub const CHANNEL_SWITCH: Self = Self(1 << 1);
    pub const CONNECT_START: Self = Self(1 << 2);
    pub const SAP_CHANNEL_CHANGE: Self = Self(1 << 3);
    pub const NDP_CON_ON_NDI: Self = Self(1 << 4);
    pub const SET_PCL: Self = Self(1 << 5);

    const ALL: u8 = 0x3f;

    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

/// Command handed to the offload engine.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RsoCommand {
    Init,
    Start,
    Update,
    Stop,
    Deinit,
}

impl RsoCommand {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Start => "start",
            Self::Update => "update",
            Self::Stop => "stop",
            Self::Deinit => "deinit",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RoamSource {
    #[default]
    Host,
    Firmware,
    DataStall,
    Forced,
}

impl RoamSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Firmware => "firmware",
            Self::DataStall => "data_stall",
            Self::Forced => "forced",
        }
    }
}

/// Roam-now request as issued by the caller.
///
/// A zero BSSID asks for data-stall recovery; the broadcast BSSID asks to
/// roam only if a better candidate exists.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct InvokeRequest {
    pub bssid: Option<MacAddr>,
    pub freq_mhz: Option<u16>,
    pub source: RoamSource,
}

impl InvokeRequest {
    pub const fn to(bssid: MacAddr, source: RoamSource) -> Self {
        Self {
            bssid: Some(bssid),
            freq_mhz: None,
            source,
        }
    }
}

/// Validated roam-now target handed to the transport.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InvokeTarget {
    pub bssid: MacAddr,
    pub freq_mhz: u16,
    pub source: RoamSource,
    pub forced: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_reason_mapping() {
        assert_eq!(RoamReason::RoamSyncFailed.stop_reason(), RoamReason::RoamSyncFailed);
        assert_eq!(RoamReason::DriverDisabled.stop_reason(), RoamReason::RoamStopAll);
        assert_eq!(
            RoamReason::SupplicantDisabledRoaming.stop_reason(),
            RoamReason::SupplicantDisabledRoaming
        );
        assert_eq!(RoamReason::Disconnected.stop_reason(), RoamReason::Disconnected);
        assert_eq!(
            RoamReason::OsRequestedRoamingNow.stop_reason(),
            RoamReason::OsRequestedRoamingNow
        );
        assert_eq!(RoamReason::RoamSetPrimary.stop_reason(), RoamReason::RoamSetPrimary);
        assert_eq!(RoamReason::PskPmkChanged.stop_reason(), RoamReason::SmeIssued);
        assert_eq!(RoamReason::CtxInit.stop_reason(), RoamReason::SmeIssued);
    }

    #[test]
    fn reason_codes_match_wire_values() {
        assert_eq!(RoamReason::Connect.code(), 1);
        assert_eq!(RoamReason::RoamStopAll.code(), 38);
        assert_eq!(RoamReason::RoamSetPrimary.code(), 54);
    }

    #[test]
    fn control_bits_insert_remove() {
        let mut bits = ControlBits::NONE;
        bits.insert(ControlBits::CHANNEL_SWITCH);
        bits.insert(ControlBits::SET_PCL);
        assert!(bits.contains(ControlBits::SET_PCL));
        assert_eq!(bits.bits(), 0b10_0010);
        bits.remove(ControlBits::CHANNEL_SWITCH.union(ControlBits::SET_PCL));
        assert!(bits.is_empty());
        assert_eq!(ControlBits::from_bits_truncate(0xff).bits(), 0x3f);
    }
}
