use heapless::Vec;

use crate::types::MacAddr;

use super::{
    config::{ScoreConfig, AVOID_CANDIDATE_MIN_SCORE, BEST_CANDIDATE_MAX_BSS_SCORE, MAX_PCT_SCORE},
    factors::{
        band_score, bandwidth_score, congestion_pct, congestion_score, nss_score,
        oce_ap_tx_power_score, oce_subnet_id_score, oce_wan_score, pcl_score, sae_pk_score,
        sta_nss, CONGESTION_THRESHOLD_FOR_BAND_OCE, PCL_RSSI_THRESHOLD,
    },
    rssi::{prorated_pct, rssi_score, same_bucket},
    types::{CandidateAp, DenylistAction, ScoringPolicy},
};

const LOG_TARGET: &str = "wlan_roam::scoring";

/// Per-factor contributions of one candidate's score.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ScoreBreakdown {
    pub hint_match: bool,
    pub rssi: i32,
    pub pcl: i32,
    pub ht: i32,
    pub vht: i32,
    pub he: i32,
    pub bandwidth: i32,
    pub beamforming: i32,
    pub congestion: i32,
    pub band: i32,
    pub oce_wan: i32,
    pub oce_ap_tx_power: i32,
    pub oce_subnet_id: i32,
    pub sae_pk: i32,
    pub nss: i32,
    pub congestion_pct: i32,
    pub prorated_pct: i32,
    /// False when congestion was high enough to skip band and OCE-WAN.
    pub band_oce_considered: bool,
    pub total: i32,
}

impl ScoreBreakdown {
    fn hint() -> Self {
        Self {
            hint_match: true,
            total: BEST_CANDIDATE_MAX_BSS_SCORE,
            ..Self::default()
        }
    }
}

fn pcl_weight_for(candidate: &CandidateAp, config: &ScoreConfig, policy: &ScoringPolicy) -> u8 {
    if candidate.denylist != DenylistAction::None
        || policy.pcl.is_empty()
        || candidate.rssi_raw <= PCL_RSSI_THRESHOLD
        || config.weights.pcl == 0
    {
        return 0;
    }
    policy.pcl.weight_of(candidate.freq_mhz).unwrap_or(0)
}

fn breakdown_with(
    candidate: &CandidateAp,
    config: &ScoreConfig,
    policy: &ScoringPolicy,
    bssid_hint: Option<MacAddr>,
) -> ScoreBreakdown {
    if config.is_bssid_hint_priority && bssid_hint == Some(candidate.bssid) {
        return ScoreBreakdown::hint();
    }

    let weights = &config.weights;
    let caps = &policy.caps;
    let rssi = candidate.rssi_raw;
    let band = candidate.band();
    let mut out = ScoreBreakdown::default();

    out.rssi = rssi_score(&config.rssi, rssi, weights.rssi);
    out.pcl = pcl_score(pcl_weight_for(candidate, config, policy), weights.pcl);
    out.prorated_pct = prorated_pct(&config.rssi, rssi);
    let prorated = out.prorated_pct;

    // 6 GHz carries no HT/VHT elements but is credited as if it did.
    if caps.ht && (candidate.phy.ht || candidate.is_6g()) {
        out.ht = prorated * i32::from(weights.ht_caps);
    }
    let local_vht = caps.vht_on(band);
    if local_vht && (candidate.phy.vht || candidate.is_6g()) {
        out.vht = prorated * i32::from(weights.vht_caps);
    }
    if caps.he && candidate.phy.he {
        out.he = prorated * i32::from(weights.he_caps);
    }

    out.bandwidth = bandwidth_score(candidate, config, caps, prorated);

    let pref_5g = config.rssi.pref_5g_threshold;
    let near_pref = rssi < config.rssi.good_threshold
        && same_bucket(
            config.rssi.good_threshold,
            rssi,
            pref_5g,
            config.rssi.bad_bucket_size(),
        );
    if caps.beamformee && local_vht && candidate.phy.su_beamformer && rssi > pref_5g && !near_pref {
        out.beamforming = MAX_PCT_SCORE * i32::from(weights.beamforming_cap);
    }

    out.congestion_pct = congestion_pct(candidate);
    out.congestion = congestion_score(candidate, config, out.congestion_pct);

    if out.congestion_pct < CONGESTION_THRESHOLD_FOR_BAND_OCE {
        out.band_oce_considered = true;
        // strong signal favours 5/6 GHz; otherwise only 2.4 GHz earns band credit
        if rssi > pref_5g && !near_pref {
            if !candidate.is_2g() {
                out.band = band_score(candidate.freq_mhz, config);
            }
        } else if candidate.is_2g() {
            out.band = band_score(candidate.freq_mhz, config);
        }
        out.oce_wan = oce_wan_score(candidate, config);
    }

    out.oce_ap_tx_power = oce_ap_tx_power_score(candidate, config);
    out.oce_subnet_id = oce_subnet_id_score(candidate, config);
    out.sae_pk = sae_pk_score(candidate, config);

    let sta_nss = sta_nss(candidate, caps, policy.concurrent_bands);
    out.nss = nss_score(config, candidate.nss, sta_nss, prorated);

    out.total = out.rssi
        + out.pcl
        + out.ht
        + out.vht
        + out.he
        + out.bandwidth
        + out.beamforming
        + out.congestion
        + out.band
        + out.oce_wan
        + out.oce_ap_tx_power
        + out.oce_subnet_id
        + out.sae_pk
        + out.nss;
    out
}

/// Scores one candidate and returns every factor that went into it.
pub fn score_breakdown(
    candidate: &CandidateAp,
    config: &ScoreConfig,
    policy: &ScoringPolicy,
    bssid_hint: Option<MacAddr>,
) -> ScoreBreakdown {
    breakdown_with(candidate, &config.sanitized(), policy, bssid_hint)
}

pub fn score(
    candidate: &CandidateAp,
    config: &ScoreConfig,
    policy: &ScoringPolicy,
    bssid_hint: Option<MacAddr>,
) -> i32 {
    score_breakdown(candidate, config, policy, bssid_hint).total
}

fn dropped(candidate: &CandidateAp, config: &ScoreConfig) -> bool {
    candidate.denylist == DenylistAction::Remove
        || (config.check_assoc_disallowed && candidate.oce.assoc_disallowed)
}

// Avoided entries always trail regular ones, whatever their score.
fn ranks_before(a: &CandidateAp, b: &CandidateAp) -> bool {
    let a_avoid = a.denylist == DenylistAction::Avoid;
    let b_avoid = b.denylist == DenylistAction::Avoid;
    if a_avoid != b_avoid {
        return b_avoid;
    }
    a.is_better_than(b)
}

/// Scores, filters and sorts `candidates` in place.
///
/// Returns the number of ranked entries. Entries flagged for removal (or
/// disallowing association) are moved behind that prefix in their original
/// order and are not part of the result. The sort is stable: equal score and
/// equal RSSI keep scan-list order.
pub fn rank(
    candidates: &mut [CandidateAp],
    config: &ScoreConfig,
    policy: &ScoringPolicy,
    bssid_hint: Option<MacAddr>,
) -> usize {
    if !config.weights.within_budget() {
        log::warn!(
            target: LOG_TARGET,
            "scoring: weight total={} over budget, using default weights",
            config.weights.total()
        );
    }
    let config = config.sanitized();

    let mut kept = 0usize;
    for idx in 0..candidates.len() {
        if dropped(&candidates[idx], &config) {
            log::debug!(
                target: LOG_TARGET,
                "scoring: drop bssid={} freq={} rssi={}",
                candidates[idx].bssid,
                candidates[idx].freq_mhz,
                candidates[idx].rssi_raw
            );
            continue;
        }
        candidates[kept..=idx].rotate_right(1);
        kept += 1;
    }

    let ranked = &mut candidates[..kept];
    for candidate in ranked.iter_mut() {
        candidate.score = match candidate.denylist {
            DenylistAction::Avoid => AVOID_CANDIDATE_MIN_SCORE,
            _ => breakdown_with(candidate, &config, policy, bssid_hint).total,
        };
        log::debug!(
            target: LOG_TARGET,
            "scoring: bssid={} freq={} rssi={} score={}",
            candidate.bssid,
            candidate.freq_mhz,
            candidate.rssi_raw,
            candidate.score
        );
    }

    for idx in 1..ranked.len() {
        let mut pos = idx;
        while pos > 0 && ranks_before(&ranked[pos], &ranked[pos - 1]) {
            ranked.swap(pos, pos - 1);
            pos -= 1;
        }
    }

    kept
}

/// [`rank`] over a bounded list, truncating the dropped tail.
pub fn rank_vec<const N: usize>(
    candidates: &mut Vec<CandidateAp, N>,
    config: &ScoreConfig,
    policy: &ScoringPolicy,
    bssid_hint: Option<MacAddr>,
) {
    let kept = rank(candidates.as_mut_slice(), config, policy, bssid_hint);
    candidates.truncate(kept);
}
