use std::{fs, path::Path};

use serde::Deserialize;
use thiserror::Error;

use crate::scoring::{
    PackedPercent, RssiConfig, ScoreConfig, SlotTable, WeightConfig, BEST_CANDIDATE_MAX_WEIGHT,
};

use super::RoamIni;

const PCT_MAX: u8 = 100;
const WEIGHT_MAX: u8 = 100;
const RSSI_MAGNITUDE_MAX: u8 = 127;
const SLOTS_MAX: u8 = 15;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("validation error: {0}")]
    Validation(String),
}

/// On-disk layout. RSSI thresholds are positive magnitudes (`55` is -55 dBm).
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RoamFile {
    pub roam: RoamSection,
    pub scoring: ScoringSection,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RoamSection {
    pub offload_enabled: bool,
    pub dual_sta_roam_allowed: bool,
    pub self_bss_roam_allowed: bool,
    pub data_stall_roam_supported: bool,
    pub stop_response_supported: bool,
    pub stop_timeout_ms: u32,
    pub invoke_expiry_ms: u32,
    pub user_roaming_disabled: bool,
}

impl Default for RoamSection {
    fn default() -> Self {
        let ini = RoamIni::defaults();
        Self {
            offload_enabled: ini.roam_offload_enabled,
            dual_sta_roam_allowed: ini.dual_sta_roam_allowed,
            self_bss_roam_allowed: ini.self_bss_roam_allowed,
            data_stall_roam_supported: ini.data_stall_roam_supported,
            stop_response_supported: ini.rso_stop_response_supported,
            stop_timeout_ms: ini.rso_stop_timeout_ms,
            invoke_expiry_ms: ini.invoke_expiry_ms,
            user_roaming_disabled: ini.user_roaming_disabled,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringSection {
    pub bssid_hint_priority: bool,
    pub check_assoc_disallowed: bool,
    pub bandwidth_per_index: u32,
    pub nss_per_index: u32,
    pub band_per_index: u32,
    pub weights: WeightsSection,
    pub rssi: RssiSection,
    pub esp_qbss: SlotSection,
    pub oce_wan: SlotSection,
}

impl Default for ScoringSection {
    fn default() -> Self {
        let score = ScoreConfig::defaults();
        Self {
            bssid_hint_priority: score.is_bssid_hint_priority,
            check_assoc_disallowed: score.check_assoc_disallowed,
            bandwidth_per_index: score.bandwidth_per_index.0,
            nss_per_index: score.nss_per_index.0,
            band_per_index: score.band_per_index.0,
            weights: WeightsSection::default(),
            rssi: RssiSection::default(),
            esp_qbss: SlotSection::from_table(score.esp_qbss),
            oce_wan: SlotSection::from_table(score.oce_wan),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct WeightsSection {
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

impl WeightsSection {
    fn fields(&self) -> [(&'static str, u8); 14] {
        [
            ("rssi", self.rssi),
            ("ht_caps", self.ht_caps),
            ("vht_caps", self.vht_caps),
            ("he_caps", self.he_caps),
            ("chan_width", self.chan_width),
            ("chan_band", self.chan_band),
            ("nss", self.nss),
            ("beamforming_cap", self.beamforming_cap),
            ("pcl", self.pcl),
            ("channel_congestion", self.channel_congestion),
            ("oce_wan", self.oce_wan),
            ("oce_ap_tx_pwr", self.oce_ap_tx_pwr),
            ("oce_subnet_id", self.oce_subnet_id),
            ("sae_pk_ap", self.sae_pk_ap),
        ]
    }

    fn to_weights(&self) -> WeightConfig {
        WeightConfig {
            rssi: self.rssi,
            ht_caps: self.ht_caps,
            vht_caps: self.vht_caps,
            he_caps: self.he_caps,
            chan_width: self.chan_width,
            chan_band: self.chan_band,
            nss: self.nss,
            beamforming_cap: self.beamforming_cap,
            pcl: self.pcl,
            channel_congestion: self.channel_congestion,
            oce_wan: self.oce_wan,
            oce_ap_tx_pwr: self.oce_ap_tx_pwr,
            oce_subnet_id: self.oce_subnet_id,
            sae_pk_ap: self.sae_pk_ap,
        }
    }
}

impl Default for WeightsSection {
    fn default() -> Self {
        let w = WeightConfig::defaults();
        Self {
            rssi: w.rssi,
            ht_caps: w.ht_caps,
            vht_caps: w.vht_caps,
            he_caps: w.he_caps,
            chan_width: w.chan_width,
            chan_band: w.chan_band,
            nss: w.nss,
            beamforming_cap: w.beamforming_cap,
            pcl: w.pcl,
            channel_congestion: w.channel_congestion,
            oce_wan: w.oce_wan,
            oce_ap_tx_pwr: w.oce_ap_tx_pwr,
            oce_subnet_id: w.oce_subnet_id,
            sae_pk_ap: w.sae_pk_ap,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RssiSection {
    pub best_threshold: u8,
    pub good_threshold: u8,
    pub bad_threshold: u8,
    pub good_pct: u8,
    pub bad_pct: u8,
    pub good_bucket: u8,
    pub bad_bucket: u8,
    pub pref_5g_threshold: u8,
}

impl Default for RssiSection {
    fn default() -> Self {
        let r = RssiConfig::defaults();
        Self {
            best_threshold: magnitude(r.best_threshold),
            good_threshold: magnitude(r.good_threshold),
            bad_threshold: magnitude(r.bad_threshold),
            good_pct: r.good_pct,
            bad_pct: r.bad_pct,
            good_bucket: r.good_bucket,
            bad_bucket: r.bad_bucket,
            pref_5g_threshold: magnitude(r.pref_5g_threshold),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SlotSection {
    pub words: [u32; 4],
    pub num_slots: u8,
}

impl SlotSection {
    fn from_table(table: SlotTable) -> Self {
        Self {
            words: table.words.map(|word| word.0),
            num_slots: table.num_slots,
        }
    }
}

fn magnitude(dbm: i32) -> u8 {
    u8::try_from(dbm.unsigned_abs()).unwrap_or(u8::MAX)
}

fn dbm(magnitude: u8) -> i32 {
    -i32::from(magnitude)
}

pub fn parse_roam_file(path: &Path) -> Result<RoamFile, ConfigError> {
    let text = fs::read_to_string(path)?;
    parse_roam_str(&text)
}

fn parse_roam_str(text: &str) -> Result<RoamFile, ConfigError> {
    toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))
}

pub fn validate_roam_file(file: &RoamFile) -> Result<(), ConfigError> {
    let roam = &file.roam;
    if roam.stop_timeout_ms == 0 {
        return invalid("roam.stop_timeout_ms must be > 0");
    }
    if roam.invoke_expiry_ms == 0 {
        return invalid("roam.invoke_expiry_ms must be > 0");
    }

    let scoring = &file.scoring;
    for (name, weight) in scoring.weights.fields() {
        if weight > WEIGHT_MAX {
            return Err(ConfigError::Validation(format!(
                "scoring.weights.{name} must be <= {WEIGHT_MAX}"
            )));
        }
    }
    let total = scoring.weights.to_weights().total();
    if total > BEST_CANDIDATE_MAX_WEIGHT {
        log::warn!(
            target: "wlan_roam::config",
            "config: weight total={} over budget={}, defaults will apply",
            total,
            BEST_CANDIDATE_MAX_WEIGHT
        );
    }

    let rssi = &scoring.rssi;
    for (name, value) in [
        ("best_threshold", rssi.best_threshold),
        ("good_threshold", rssi.good_threshold),
        ("bad_threshold", rssi.bad_threshold),
        ("pref_5g_threshold", rssi.pref_5g_threshold),
    ] {
        if value == 0 || value > RSSI_MAGNITUDE_MAX {
            return Err(ConfigError::Validation(format!(
                "scoring.rssi.{name} must be in 1..={RSSI_MAGNITUDE_MAX}"
            )));
        }
    }
    if rssi.best_threshold >= rssi.good_threshold {
        return invalid("scoring.rssi.good_threshold must be weaker than scoring.rssi.best_threshold");
    }
    if rssi.good_threshold >= rssi.bad_threshold {
        return invalid("scoring.rssi.bad_threshold must be weaker than scoring.rssi.good_threshold");
    }
    if rssi.good_pct > PCT_MAX || rssi.bad_pct > PCT_MAX {
        return invalid("scoring.rssi.good_pct and bad_pct must be <= 100");
    }
    if rssi.bad_pct > rssi.good_pct {
        return invalid("scoring.rssi.bad_pct must be <= scoring.rssi.good_pct");
    }
    if rssi.good_bucket == 0 || rssi.bad_bucket == 0 {
        return invalid("scoring.rssi bucket sizes must be > 0");
    }

    for (name, table) in [("esp_qbss", &scoring.esp_qbss), ("oce_wan", &scoring.oce_wan)] {
        if table.num_slots > SLOTS_MAX {
            return Err(ConfigError::Validation(format!(
                "scoring.{name}.num_slots must be <= {SLOTS_MAX}"
            )));
        }
    }
    Ok(())
}

fn invalid(msg: &str) -> Result<(), ConfigError> {
    Err(ConfigError::Validation(msg.to_owned()))
}

impl RoamFile {
    pub fn to_ini(&self) -> RoamIni {
        let roam = &self.roam;
        let scoring = &self.scoring;
        let rssi = &scoring.rssi;
        let score = ScoreConfig {
            weights: scoring.weights.to_weights(),
            rssi: RssiConfig {
                best_threshold: dbm(rssi.best_threshold),
                good_threshold: dbm(rssi.good_threshold),
                bad_threshold: dbm(rssi.bad_threshold),
                good_pct: rssi.good_pct,
                bad_pct: rssi.bad_pct,
                good_bucket: rssi.good_bucket,
                bad_bucket: rssi.bad_bucket,
                pref_5g_threshold: dbm(rssi.pref_5g_threshold),
            },
            bandwidth_per_index: PackedPercent(scoring.bandwidth_per_index),
            nss_per_index: PackedPercent(scoring.nss_per_index),
            band_per_index: PackedPercent(scoring.band_per_index),
            esp_qbss: SlotTable::new(scoring.esp_qbss.words, scoring.esp_qbss.num_slots),
            oce_wan: SlotTable::new(scoring.oce_wan.words, scoring.oce_wan.num_slots),
            is_bssid_hint_priority: scoring.bssid_hint_priority,
            check_assoc_disallowed: scoring.check_assoc_disallowed,
        };
        RoamIni {
            roam_offload_enabled: roam.offload_enabled,
            dual_sta_roam_allowed: roam.dual_sta_roam_allowed,
            self_bss_roam_allowed: roam.self_bss_roam_allowed,
            data_stall_roam_supported: roam.data_stall_roam_supported,
            rso_stop_response_supported: roam.stop_response_supported,
            rso_stop_timeout_ms: roam.stop_timeout_ms,
            invoke_expiry_ms: roam.invoke_expiry_ms,
            user_roaming_disabled: roam.user_roaming_disabled,
            score,
        }
    }
}

pub fn load_from_str(text: &str) -> Result<RoamIni, ConfigError> {
    let file = parse_roam_str(text)?;
    validate_roam_file(&file)?;
    Ok(file.to_ini().sanitized())
}

pub fn load_from_path(path: &Path) -> Result<RoamIni, ConfigError> {
    let file = parse_roam_file(path)?;
    validate_roam_file(&file)?;
    Ok(file.to_ini().sanitized())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let ini = load_from_str("").expect("empty config should load");
        assert_eq!(ini, RoamIni::defaults());
    }

    #[test]
    fn magnitudes_become_negative_dbm() {
        let ini = load_from_str(
            "[scoring.rssi]\nbest_threshold = 50\ngood_threshold = 65\nbad_threshold = 85\n",
        )
        .expect("config should load");
        assert_eq!(ini.score.rssi.best_threshold, -50);
        assert_eq!(ini.score.rssi.good_threshold, -65);
        assert_eq!(ini.score.rssi.bad_threshold, -85);
    }

    #[test]
    fn oce_wan_default_table_differs_from_esp() {
        let file = RoamFile::default();
        assert_eq!(file.scoring.oce_wan.num_slots, 15);
        assert_eq!(file.scoring.esp_qbss.num_slots, 8);
    }
}
