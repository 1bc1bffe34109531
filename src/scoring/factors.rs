use crate::types::{Band, BandMask};

use super::{
    config::{
        ScoreConfig, BAND_2G_INDEX, BAND_5G_INDEX, BAND_6G_INDEX, BW_20MHZ_INDEX, MAX_PCT_SCORE,
        NSS_1X1_INDEX, NSS_2X2_INDEX, NSS_3X3_INDEX, NSS_4X4_INDEX, SCORE_MAX_INDEX,
    },
    rssi::banded_pct,
    types::{CandidateAp, ChannelWidth, LocalCaps},
};

pub const PCL_RSSI_THRESHOLD: i32 = -75;
pub const MAX_WEIGHT_OF_PCL_CHANNELS: i32 = 255;
pub const PCL_GROUPS_WEIGHT_DIFFERENCE: i32 = 20;
pub const CONGESTION_THRESHOLD_FOR_BAND_OCE: i32 = 75;
const MAX_CHANNEL_UTILIZATION: u32 = 100;
const MAX_ESTIMATED_AIR_TIME_FRACTION: u32 = 255;
const MAX_AP_LOAD: u32 = 255;
// Uplink estimate assumes a fixed station transmit power.
const STA_TX_POWER_DBM: i32 = 20;

/// Bonus for channels carrying a preference weight; each 20-point group
/// below the best group costs one weight unit.
pub fn pcl_score(chan_weight: u8, pcl_weight: u8) -> i32 {
    if chan_weight == 0 {
        return 0;
    }
    let demotion = (MAX_WEIGHT_OF_PCL_CHANNELS - i32::from(chan_weight)) / PCL_GROUPS_WEIGHT_DIFFERENCE;
    (i32::from(pcl_weight) - demotion).max(0) * MAX_PCT_SCORE
}

pub fn effective_width(candidate: &CandidateAp, caps: &LocalCaps) -> ChannelWidth {
    let band = candidate.band();
    let mut width = candidate.phy.width;
    if !caps.ht {
        width = width.min(ChannelWidth::W20);
    }
    if !caps.vht_on(band) {
        width = width.min(ChannelWidth::W40);
    }
    if !caps.wide_channels_on(band) {
        width = ChannelWidth::W20;
    }
    width
}

pub fn bandwidth_score(
    candidate: &CandidateAp,
    config: &ScoreConfig,
    caps: &LocalCaps,
    prorated_pct: i32,
) -> i32 {
    let index = match effective_width(candidate, caps) {
        ChannelWidth::W20 => BW_20MHZ_INDEX,
        width => width.index(),
    };
    let pct = i32::from(config.bandwidth_per_index.get(index));
    prorated_pct * pct * i32::from(config.weights.chan_width) / MAX_PCT_SCORE
}

/// Channel congestion in percent: air-time fraction first, then QBSS load.
pub fn congestion_pct(candidate: &CandidateAp) -> i32 {
    let congestion = if candidate.air_time_fraction != 0 {
        let est_air_time = u32::from(candidate.air_time_fraction) * MAX_CHANNEL_UTILIZATION
            / MAX_ESTIMATED_AIR_TIME_FRACTION;
        MAX_CHANNEL_UTILIZATION - est_air_time
    } else if candidate.qbss_chan_load != 0 {
        u32::from(candidate.qbss_chan_load) * MAX_PCT_SCORE as u32 / MAX_AP_LOAD
    } else {
        0
    };
    congestion as i32
}

pub fn congestion_score(candidate: &CandidateAp, config: &ScoreConfig, congestion: i32) -> i32 {
    let table = &config.esp_qbss;
    let num_slots = table.num_slots.min(SCORE_MAX_INDEX);
    if num_slots == 0 {
        return 0;
    }
    let weight = config.weights.channel_congestion;

    // weak links score from the last slot
    if candidate.rssi_raw <= config.rssi.good_threshold {
        return table.score(num_slots, weight);
    }
    if congestion == 0 {
        return table.score(0, weight);
    }

    let window = MAX_PCT_SCORE / i32::from(num_slots);
    let index = (congestion / window + 1).min(i32::from(num_slots));
    table.score(index as u8, weight)
}

/// Streams usable toward the candidate. Concurrent operation on another
/// band drops to one stream on DBS hardware without 2x2 per MAC.
pub fn sta_nss(candidate: &CandidateAp, caps: &LocalCaps, concurrent_bands: BandMask) -> u8 {
    let band = candidate.band();
    let diff_band = band.is_some_and(|band| concurrent_bands.has_other_than(band));
    if diff_band && caps.dbs && !caps.dbs_2x2 {
        return 1;
    }
    if matches!(band, Some(Band::Ghz2)) {
        caps.nss_2g
    } else {
        caps.nss_5g
    }
}

pub fn nss_score(config: &ScoreConfig, ap_nss: u8, sta_nss: u8, prorated_pct: i32) -> i32 {
    let index = match ap_nss.min(sta_nss) {
        4.. => NSS_4X4_INDEX,
        3 => NSS_3X3_INDEX,
        2 => NSS_2X2_INDEX,
        _ => NSS_1X1_INDEX,
    };
    let pct = i32::from(config.nss_per_index.get(index));
    i32::from(config.weights.nss) * pct * prorated_pct / MAX_PCT_SCORE
}

pub fn band_score(freq_mhz: u16, config: &ScoreConfig) -> i32 {
    let index = match Band::from_freq(freq_mhz) {
        Some(Band::Ghz5) => BAND_5G_INDEX,
        Some(Band::Ghz2) => BAND_2G_INDEX,
        Some(Band::Ghz6) => BAND_6G_INDEX,
        None => return 0,
    };
    i32::from(config.weights.chan_band) * i32::from(config.band_per_index.get(index))
}

pub fn oce_wan_score(candidate: &CandidateAp, config: &ScoreConfig) -> i32 {
    let table = &config.oce_wan;
    let num_slots = table.num_slots.min(SCORE_MAX_INDEX);
    if num_slots == 0 {
        return 0;
    }
    let window = SCORE_MAX_INDEX / num_slots;
    let index = match candidate.oce.wan_downlink_capacity {
        Some(0) => return 0,
        Some(capacity) => capacity / window,
        None => 0,
    };
    table.score(index.min(num_slots), config.weights.oce_wan)
}

pub fn oce_subnet_id_score(candidate: &CandidateAp, config: &ScoreConfig) -> i32 {
    if candidate.oce.subnet_id_present {
        i32::from(config.weights.oce_subnet_id) * (MAX_PCT_SCORE / 2)
    } else {
        0
    }
}

pub fn sae_pk_score(candidate: &CandidateAp, config: &ScoreConfig) -> i32 {
    if candidate.sae_pk {
        i32::from(config.weights.sae_pk_ap) * MAX_PCT_SCORE
    } else {
        0
    }
}

/// Estimated uplink RSSI; without an advertised AP power the downlink
/// RSSI stands in.
pub fn uplink_rssi(candidate: &CandidateAp) -> i32 {
    match candidate.oce.ap_tx_power_dbm {
        Some(ap_tx_power) => STA_TX_POWER_DBM - (i32::from(ap_tx_power) - candidate.rssi_raw),
        None => candidate.rssi_raw,
    }
}

pub fn oce_ap_tx_power_score(candidate: &CandidateAp, config: &ScoreConfig) -> i32 {
    let factor = banded_pct(&config.rssi, uplink_rssi(candidate));
    i32::from(config.weights.oce_ap_tx_pwr) * factor
}
