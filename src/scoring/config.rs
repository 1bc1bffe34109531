//! Scoring weights, RSSI banding and per-index percentage tables.
//!
//! Thresholds are stored as dBm (negative). Per-index tables pack four
//! percentages into one `u32`, index 0 in the low byte.

pub const BEST_CANDIDATE_MAX_WEIGHT: u32 = 200;
pub const BEST_CANDIDATE_MAX_BSS_SCORE: i32 = 20_000;
pub const AVOID_CANDIDATE_MIN_SCORE: i32 = 1;
pub const MAX_PCT_SCORE: i32 = 100;
pub const SCORE_MAX_INDEX: u8 = 15;

pub const BW_20MHZ_INDEX: u8 = 0;
pub const NSS_1X1_INDEX: u8 = 0;
pub const NSS_2X2_INDEX: u8 = 1;
pub const NSS_3X3_INDEX: u8 = 2;
pub const NSS_4X4_INDEX: u8 = 3;
pub const BAND_2G_INDEX: u8 = 0;
pub const BAND_5G_INDEX: u8 = 1;
pub const BAND_6G_INDEX: u8 = 2;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WeightConfig {
    pub rssi: u8,
    pub ht_caps: u8,
    pub vht_caps: u8,
    pub he_caps: u8,
    pub chan_width: u8,
    pub chan_band: u8,
    pub nss: u8,
    pub beamforming_cap: u8,
    pub pcl: u8,
    pub channel_congestion: u8,
    pub oce_wan: u8,
    pub oce_ap_tx_pwr: u8,
    pub oce_subnet_id: u8,
    pub sae_pk_ap: u8,
}

impl WeightConfig {
    /// Shipped configuration values.
    pub const fn defaults() -> Self {
        Self {
            rssi: 20,
            ht_caps: 2,
            vht_caps: 1,
            he_caps: 2,
            chan_width: 12,
            chan_band: 2,
            nss: 16,
            beamforming_cap: 2,
            pcl: 10,
            channel_congestion: 25,
            oce_wan: 2,
            oce_ap_tx_pwr: 5,
            oce_subnet_id: 3,
            sae_pk_ap: 3,
        }
    }

    /// Built-in table substituted for any over-budget configuration.
    pub const fn fallback() -> Self {
        Self {
            rssi: 20,
            ht_caps: 2,
            vht_caps: 1,
            he_caps: 2,
            chan_width: 12,
            chan_band: 2,
            nss: 16,
            beamforming_cap: 2,
            pcl: 10,
            channel_congestion: 5,
            oce_wan: 2,
            oce_ap_tx_pwr: 5,
            oce_subnet_id: 3,
            sae_pk_ap: 3,
        }
    }

    pub fn total(&self) -> u32 {
        [
            self.rssi,
            self.ht_caps,
            self.vht_caps,
            self.he_caps,
            self.chan_width,
            self.chan_band,
            self.nss,
            self.beamforming_cap,
            self.pcl,
            self.channel_congestion,
            self.oce_wan,
            self.oce_ap_tx_pwr,
            self.oce_subnet_id,
            self.sae_pk_ap,
        ]
        .iter()
        .map(|w| u32::from(*w))
        .sum()
    }

    pub fn within_budget(&self) -> bool {
        self.total() <= BEST_CANDIDATE_MAX_WEIGHT
    }
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RssiConfig {
    pub best_threshold: i32,
    pub good_threshold: i32,
    pub bad_threshold: i32,
    pub good_pct: u8,
    pub bad_pct: u8,
    pub good_bucket: u8,
    pub bad_bucket: u8,
    /// Below this level 5/6 GHz candidates lose their band preference.
    pub pref_5g_threshold: i32,
}

impl RssiConfig {
    pub const fn defaults() -> Self {
        Self {
            best_threshold: -55,
            good_threshold: -70,
            bad_threshold: -80,
            good_pct: 80,
            bad_pct: 25,
            good_bucket: 5,
            bad_bucket: 5,
            pref_5g_threshold: -76,
        }
    }

    pub(crate) fn good_bucket_size(&self) -> i32 {
        i32::from(self.good_bucket.max(1))
    }

    pub(crate) fn bad_bucket_size(&self) -> i32 {
        i32::from(self.bad_bucket.max(1))
    }
}

impl Default for RssiConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PackedPercent(pub u32);

impl PackedPercent {
    pub const fn get(self, index: u8) -> u8 {
        ((self.0 >> (8 * (index as u32 % 4))) & 0xff) as u8
    }

    /// Caps every byte at 100 %.
    pub fn clamped(self) -> Self {
        let mut raw = 0u32;
        for index in 0..4u8 {
            let pct = u32::from(self.get(index).min(MAX_PCT_SCORE as u8));
            raw |= pct << (8 * u32::from(index));
        }
        Self(raw)
    }
}

/// Sixteen indexed percentages spread over four packed words, plus the
/// number of slots in use.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SlotTable {
    pub words: [PackedPercent; 4],
    pub num_slots: u8,
}

impl SlotTable {
    pub const fn new(words: [u32; 4], num_slots: u8) -> Self {
        Self {
            words: [
                PackedPercent(words[0]),
                PackedPercent(words[1]),
                PackedPercent(words[2]),
                PackedPercent(words[3]),
            ],
            num_slots,
        }
    }

    pub fn pct(&self, index: u8) -> u8 {
        let index = index.min(SCORE_MAX_INDEX);
        self.words[usize::from(index / 4)].get(index % 4)
    }

    pub fn score(&self, index: u8, weight: u8) -> i32 {
        i32::from(weight) * i32::from(self.pct(index))
    }

    fn sanitized(self) -> Self {
        Self {
            words: self.words.map(PackedPercent::clamped),
            num_slots: self.num_slots.min(SCORE_MAX_INDEX),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ScoreConfig {
    pub weights: WeightConfig,
    pub rssi: RssiConfig,
    pub bandwidth_per_index: PackedPercent,
    pub nss_per_index: PackedPercent,
    pub band_per_index: PackedPercent,
    pub esp_qbss: SlotTable,
    pub oce_wan: SlotTable,
    pub is_bssid_hint_priority: bool,
    pub check_assoc_disallowed: bool,
}

impl ScoreConfig {
    pub const fn defaults() -> Self {
        Self {
            weights: WeightConfig::defaults(),
            rssi: RssiConfig::defaults(),
            bandwidth_per_index: PackedPercent(0x6432_190C),
            nss_per_index: PackedPercent(0x6432_190C),
            band_per_index: PackedPercent(0x0064_4B32),
            esp_qbss: SlotTable::new([0x505A_6432, 0x0A19_3246, 0x0000_0005, 0x0000_0000], 8),
            oce_wan: SlotTable::new([0x0000_0032, 0x0000_0000, 0x0603_0000, 0x6432_190C], 15),
            is_bssid_hint_priority: true,
            check_assoc_disallowed: true,
        }
    }

    /// Returns a configuration that is safe to score with.
    ///
    /// An over-budget weight table is replaced wholesale by
    /// [`WeightConfig::fallback`]; per-index bytes are capped at 100 and slot
    /// counts at [`SCORE_MAX_INDEX`]. Applying it twice changes nothing.
    pub fn sanitized(self) -> Self {
        let weights = if self.weights.within_budget() {
            self.weights
        } else {
            WeightConfig::fallback()
        };
        Self {
            weights,
            bandwidth_per_index: self.bandwidth_per_index.clamped(),
            nss_per_index: self.nss_per_index.clamped(),
            band_per_index: self.band_per_index.clamped(),
            esp_qbss: self.esp_qbss.sanitized(),
            oce_wan: self.oce_wan.sanitized(),
            ..self
        }
    }
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self::defaults()
    }
}
