use heapless::Vec;

use crate::{
    error::RoamError,
    types::{Band, BandMask, MacAddr, MAX_PCL_CHANNELS},
};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[repr(u8)]
pub enum ChannelWidth {
    #[default]
    W20 = 0,
    W40 = 1,
    W80 = 2,
    W160 = 3,
}

impl ChannelWidth {
    pub const fn index(self) -> u8 {
        self as u8
    }

    pub const fn min(self, other: Self) -> Self {
        if (self as u8) <= (other as u8) {
            self
        } else {
            other
        }
    }
}

/// Capabilities advertised by the access point.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PhyCaps {
    pub ht: bool,
    pub vht: bool,
    pub he: bool,
    pub width: ChannelWidth,
    pub su_beamformer: bool,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DenylistAction {
    #[default]
    None,
    Avoid,
    Remove,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct OceAttributes {
    /// Reduced WAN metrics downlink capacity, 0..=15.
    pub wan_downlink_capacity: Option<u8>,
    pub subnet_id_present: bool,
    pub ap_tx_power_dbm: Option<i8>,
    pub assoc_disallowed: bool,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CandidateAp {
    pub bssid: MacAddr,
    pub freq_mhz: u16,
    pub rssi_raw: i32,
    pub phy: PhyCaps,
    /// ESP estimated air time fraction, 0..=255; zero when absent.
    pub air_time_fraction: u8,
    /// QBSS channel load, 0..=255; zero when absent.
    pub qbss_chan_load: u8,
    pub oce: OceAttributes,
    pub sae_pk: bool,
    pub nss: u8,
    pub denylist: DenylistAction,
    pub score: i32,
}

impl CandidateAp {
    pub fn new(bssid: MacAddr, freq_mhz: u16, rssi_raw: i32) -> Self {
        Self {
            bssid,
            freq_mhz,
            rssi_raw,
            nss: 1,
            ..Self::default()
        }
    }

    pub const fn band(&self) -> Option<Band> {
        Band::from_freq(self.freq_mhz)
    }

    pub fn is_2g(&self) -> bool {
        matches!(self.band(), Some(Band::Ghz2))
    }

    pub fn is_6g(&self) -> bool {
        matches!(self.band(), Some(Band::Ghz6))
    }

    /// Higher score wins; equal scores fall back to raw RSSI.
    pub fn is_better_than(&self, other: &Self) -> bool {
        self.score > other.score || (self.score == other.score && self.rssi_raw > other.rssi_raw)
    }
}

/// Local radio capabilities the score depends on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LocalCaps {
    pub ht: bool,
    pub vht: bool,
    pub vht_24g: bool,
    pub he: bool,
    pub beamformee: bool,
    pub wide_channels_24g: bool,
    pub wide_channels_5g: bool,
    pub nss_2g: u8,
    pub nss_5g: u8,
    pub dbs: bool,
    pub dbs_2x2: bool,
}

impl LocalCaps {
    pub const fn defaults() -> Self {
        Self {
            ht: true,
            vht: true,
            vht_24g: false,
            he: true,
            beamformee: true,
            wide_channels_24g: false,
            wide_channels_5g: true,
            nss_2g: 2,
            nss_5g: 2,
            dbs: false,
            dbs_2x2: false,
        }
    }

    /// VHT as seen from the candidate's band.
    pub fn vht_on(&self, band: Option<Band>) -> bool {
        match band {
            Some(Band::Ghz2) => self.vht_24g,
            _ => self.vht,
        }
    }

    pub fn wide_channels_on(&self, band: Option<Band>) -> bool {
        match band {
            Some(Band::Ghz2) => self.wide_channels_24g,
            _ => self.wide_channels_5g,
        }
    }
}

impl Default for LocalCaps {
    fn default() -> Self {
        Self::defaults()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PclEntry {
    pub freq_mhz: u16,
    pub weight: u8,
}

/// Preferred channel list: per-frequency weights from the concurrency manager.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PclTable {
    entries: Vec<PclEntry, MAX_PCL_CHANNELS>,
}

impl PclTable {
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn push(&mut self, freq_mhz: u16, weight: u8) -> Result<(), RoamError> {
        self.entries
            .push(PclEntry { freq_mhz, weight })
            .map_err(|_| RoamError::ResourceExhausted)
    }

    pub fn weight_of(&self, freq_mhz: u16) -> Option<u8> {
        self.entries
            .iter()
            .find(|entry| entry.freq_mhz == freq_mhz)
            .map(|entry| entry.weight)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ScoringPolicy {
    pub caps: LocalCaps,
    /// Bands occupied by other active connections.
    pub concurrent_bands: BandMask,
    pub pcl: PclTable,
}

impl ScoringPolicy {
    pub fn new(caps: LocalCaps) -> Self {
        Self {
            caps,
            concurrent_bands: BandMask::NONE,
            pcl: PclTable::new(),
        }
    }
}
