//! Seams to the rest of the WLAN stack.
//!
//! The controller never reaches past these traits: link status comes from the
//! connection manager, candidates from the scan cache, commands leave through
//! the firmware transport and concurrency facts come from the policy manager.

use heapless::Vec;

use crate::{
    assembler::ConfigBundle,
    controller::{InvokeTarget, RsoCommand},
    error::TransportError,
    scoring::CandidateAp,
    types::{BandMask, ConnectionId, MacAddr, MAX_CONNECTIONS, MAX_SCAN_CANDIDATES},
};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LinkStatus {
    #[default]
    Down,
    Connecting,
    Up,
    Disconnecting,
}

impl LinkStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Down => "down",
            Self::Connecting => "connecting",
            Self::Up => "up",
            Self::Disconnecting => "disconnecting",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum OpMode {
    #[default]
    Station,
    AccessPoint,
    Other,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MloRole {
    #[default]
    None,
    AssocLink,
    MemberLink { assoc: ConnectionId },
}

impl MloRole {
    pub const fn is_member(self) -> bool {
        matches!(self, Self::MemberLink { .. })
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ConnectionInfo {
    pub link: LinkStatus,
    pub mode: OpMode,
    pub mlo: MloRole,
    pub bssid: MacAddr,
    pub freq_mhz: u16,
}

impl ConnectionInfo {
    pub const fn is_up(&self) -> bool {
        matches!(self.link, LinkStatus::Up)
    }

    pub const fn is_station(&self) -> bool {
        matches!(self.mode, OpMode::Station)
    }
}

pub trait ConnectionManager {
    fn connection_info(&self, id: ConnectionId) -> Option<ConnectionInfo>;

    /// Station connections currently associated.
    fn connected_stations(&self, out: &mut Vec<ConnectionId, MAX_CONNECTIONS>);

    /// Raised when a failed roam leaves the current link unusable.
    fn indicate_link_lost(&mut self, id: ConnectionId);

    /// Resumes a disconnect that was waiting for the offload stop.
    fn continue_disconnect(&mut self, id: ConnectionId, timed_out: bool);
}

pub trait ScanCache {
    /// Entry for `bssid`, restricted to `freq_mhz` when given.
    fn lookup(&self, bssid: MacAddr, freq_mhz: Option<u16>) -> Option<CandidateAp>;

    fn candidates(&self, out: &mut Vec<CandidateAp, MAX_SCAN_CANDIDATES>);
}

pub trait FirmwareTransport {
    fn send(
        &mut self,
        id: ConnectionId,
        command: RsoCommand,
        bundle: &ConfigBundle,
    ) -> Result<(), TransportError>;

    fn invoke(&mut self, id: ConnectionId, target: &InvokeTarget) -> Result<(), TransportError>;
}

pub trait PolicyManager {
    /// Enabled roam trigger reasons, one bit per trigger.
    fn trigger_bitmap(&self, id: ConnectionId) -> u32;

    fn band_mask(&self, id: ConnectionId) -> BandMask;

    /// Connection explicitly pinned as the roaming primary, if any.
    fn primary(&self) -> Option<ConnectionId>;

    /// Whether the hardware can scan both bands concurrently.
    fn is_dbs(&self) -> bool;

    fn set_pcl_active(&mut self, id: ConnectionId, active: bool);
}
