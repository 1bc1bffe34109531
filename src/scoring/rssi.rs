use super::config::{RssiConfig, MAX_PCT_SCORE};

/// Percentage for `rssi` inside the window `high..low`, stepping down by one
/// slot per `bucket` dB and never dropping under `low_pct`.
pub fn pct_for_slot(high: i32, low: i32, high_pct: i32, low_pct: i32, bucket: i32, rssi: i32) -> i32 {
    let bucket = bucket.max(1);
    let num_slot = (high - low) / bucket + 1;
    let slot_size = ((high_pct - low_pct) + num_slot / 2) / num_slot;
    let slot_index = (high - rssi) / bucket + 1;
    let pct = high_pct - slot_size * slot_index;
    pct.max(low_pct)
}

pub fn same_bucket(top: i32, a: i32, b: i32, bucket: i32) -> bool {
    let bucket = bucket.max(1);
    (top - a) / bucket == (top - b) / bucket
}

/// Three-band RSSI percentage: full at or above best, floor at or below bad,
/// interpolated in between.
pub fn banded_pct(cfg: &RssiConfig, rssi: i32) -> i32 {
    if rssi >= cfg.best_threshold {
        return MAX_PCT_SCORE;
    }
    if rssi <= cfg.bad_threshold {
        return i32::from(cfg.bad_pct);
    }
    if rssi > cfg.good_threshold {
        pct_for_slot(
            cfg.best_threshold,
            cfg.good_threshold,
            MAX_PCT_SCORE,
            i32::from(cfg.good_pct),
            cfg.good_bucket_size(),
            rssi,
        )
    } else {
        pct_for_slot(
            cfg.good_threshold,
            cfg.bad_threshold,
            i32::from(cfg.good_pct),
            i32::from(cfg.bad_pct),
            cfg.bad_bucket_size(),
            rssi,
        )
    }
}

pub fn rssi_score(cfg: &RssiConfig, rssi: i32, weight: u8) -> i32 {
    let total = MAX_PCT_SCORE * i32::from(weight);
    total * banded_pct(cfg, rssi) / MAX_PCT_SCORE
}

/// RSSI-derived multiplier applied to capability factors.
pub fn prorated_pct(cfg: &RssiConfig, rssi: i32) -> i32 {
    if rssi > cfg.good_threshold {
        return MAX_PCT_SCORE;
    }
    let near_pref = same_bucket(
        cfg.good_threshold,
        rssi,
        cfg.pref_5g_threshold,
        cfg.bad_bucket_size(),
    );
    if near_pref || rssi < cfg.pref_5g_threshold || rssi <= cfg.bad_threshold {
        return 0;
    }
    pct_for_slot(
        cfg.good_threshold,
        cfg.bad_threshold,
        i32::from(cfg.good_pct),
        i32::from(cfg.bad_pct),
        cfg.bad_bucket_size(),
        rssi,
    )
}
