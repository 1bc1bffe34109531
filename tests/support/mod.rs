//! Collaborator doubles shared by the integration tests.

#![allow(dead_code)]

use heapless::Vec as BoundedVec;
use wlan_roam::{
    types::{BandMask, ConnectionId, MacAddr, MAX_CONNECTIONS, MAX_SCAN_CANDIDATES},
    BasicAssembler, CandidateAp, ConfigBundle, ConnectionInfo, ConnectionManager,
    FirmwareTransport, InvokeTarget, LinkStatus, PolicyManager, RoamController, RoamIni,
    RsoCommand, ScanCache, ScoringPolicy, TransportError,
};

pub type Controller =
    RoamController<BasicAssembler, FakeLinks, FakeScanCache, RecordingTransport, FakePolicy>;

#[derive(Debug, Default)]
pub struct FakeLinks {
    pub infos: [Option<ConnectionInfo>; MAX_CONNECTIONS],
    pub link_lost: Vec<ConnectionId>,
    pub resumed: Vec<(ConnectionId, bool)>,
}

impl ConnectionManager for FakeLinks {
    fn connection_info(&self, id: ConnectionId) -> Option<ConnectionInfo> {
        self.infos.get(id.index()).copied().flatten()
    }

    fn connected_stations(&self, out: &mut BoundedVec<ConnectionId, MAX_CONNECTIONS>) {
        for (idx, info) in self.infos.iter().enumerate() {
            if info.is_some_and(|info| info.is_up() && info.is_station()) {
                let _ = out.push(ConnectionId(idx as u8));
            }
        }
    }

    fn indicate_link_lost(&mut self, id: ConnectionId) {
        self.link_lost.push(id);
    }

    fn continue_disconnect(&mut self, id: ConnectionId, timed_out: bool) {
        self.resumed.push((id, timed_out));
    }
}

#[derive(Debug, Default)]
pub struct FakeScanCache {
    pub entries: Vec<CandidateAp>,
}

impl ScanCache for FakeScanCache {
    fn lookup(&self, bssid: MacAddr, freq_mhz: Option<u16>) -> Option<CandidateAp> {
        self.entries
            .iter()
            .find(|ap| ap.bssid == bssid && freq_mhz.is_none_or(|freq| freq == ap.freq_mhz))
            .copied()
    }

    fn candidates(&self, out: &mut BoundedVec<CandidateAp, MAX_SCAN_CANDIDATES>) {
        for ap in self.entries.iter().take(MAX_SCAN_CANDIDATES) {
            let _ = out.push(*ap);
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SentBundle {
    pub conn: ConnectionId,
    pub command: RsoCommand,
    pub candidates: Vec<MacAddr>,
    pub supplicant_disabled: bool,
    pub band_mask: BandMask,
}

#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub sent: Vec<SentBundle>,
    pub invoked: Vec<(ConnectionId, InvokeTarget)>,
    pub reject: Option<RsoCommand>,
    pub invoke_error: Option<TransportError>,
}

impl RecordingTransport {
    pub fn commands(&self, conn: ConnectionId) -> Vec<RsoCommand> {
        self.sent
            .iter()
            .filter(|bundle| bundle.conn == conn)
            .map(|bundle| bundle.command)
            .collect()
    }
}

impl FirmwareTransport for RecordingTransport {
    fn send(
        &mut self,
        id: ConnectionId,
        command: RsoCommand,
        bundle: &ConfigBundle,
    ) -> Result<(), TransportError> {
        if self.reject == Some(command) {
            return Err(TransportError::Rejected);
        }
        self.sent.push(SentBundle {
            conn: id,
            command,
            candidates: bundle.candidates().to_vec(),
            supplicant_disabled: bundle.supplicant_disabled(),
            band_mask: bundle.band_mask(),
        });
        Ok(())
    }

    fn invoke(&mut self, id: ConnectionId, target: &InvokeTarget) -> Result<(), TransportError> {
        if let Some(err) = self.invoke_error {
            return Err(err);
        }
        self.invoked.push((id, *target));
        Ok(())
    }
}

#[derive(Debug)]
pub struct FakePolicy {
    pub triggers: u32,
    pub primary: Option<ConnectionId>,
    pub dbs: bool,
    pub bands: BandMask,
    pub pcl_active: Vec<ConnectionId>,
}

impl Default for FakePolicy {
    fn default() -> Self {
        Self {
            triggers: 0xffff,
            primary: None,
            dbs: false,
            bands: BandMask::ALL,
            pcl_active: Vec::new(),
        }
    }
}

impl PolicyManager for FakePolicy {
    fn trigger_bitmap(&self, _id: ConnectionId) -> u32 {
        self.triggers
    }

    fn band_mask(&self, _id: ConnectionId) -> BandMask {
        self.bands
    }

    fn primary(&self) -> Option<ConnectionId> {
        self.primary
    }

    fn is_dbs(&self) -> bool {
        self.dbs
    }

    fn set_pcl_active(&mut self, id: ConnectionId, active: bool) {
        if active {
            self.pcl_active.push(id);
        } else {
            self.pcl_active.retain(|conn| *conn != id);
        }
    }
}

pub fn mac(last: u8) -> MacAddr {
    MacAddr::new([0x02, 0x11, 0x22, 0x33, 0x44, last])
}

pub fn controller(ini: RoamIni) -> Controller {
    RoamController::new(
        ini,
        ScoringPolicy::default(),
        BasicAssembler::default(),
        FakeLinks::default(),
        FakeScanCache::default(),
        RecordingTransport::default(),
        FakePolicy::default(),
    )
}

/// Marks `id` as an associated station on `bssid` and registers it.
pub fn associate(ctl: &mut Controller, id: ConnectionId, bssid: MacAddr, freq_mhz: u16) {
    ctl.connections_mut().infos[id.index()] = Some(ConnectionInfo {
        link: LinkStatus::Up,
        bssid,
        freq_mhz,
        ..ConnectionInfo::default()
    });
    ctl.add_connection(id).expect("add connection");
}
