//! End-to-end roaming flows driven through `RoamController` with recording
//! collaborator doubles.
//!
//! Covers:
//! - candidate ordering as it reaches the firmware
//! - enable/disable gating by trigger bitmap, supplicant and control bits
//! - queued roam-now requests
//! - concurrent station arbitration
//! - disconnect stop handshake and timers

mod support;

use support::{associate, controller, mac, Controller};
use wlan_roam::{
    controller::{TimerKind, MAX_PENDING_INVOKES},
    scoring::{ChannelWidth, DenylistAction},
    types::{Band, BandMask, ConnectionId, MacAddr},
    CandidateAp, ControlBits, DenyCause, InvokeRequest, RoamError, RoamIni, RoamReason,
    RoamRequest, RoamSource, RoamState, RsoCommand, TransportError,
};

const STA0: ConnectionId = ConnectionId(0);
const STA1: ConnectionId = ConnectionId(1);

fn vht_ap(last: u8, freq_mhz: u16, rssi: i32) -> CandidateAp {
    let mut ap = CandidateAp::new(mac(last), freq_mhz, rssi);
    ap.phy.ht = true;
    ap.phy.vht = true;
    ap.phy.width = ChannelWidth::W80;
    ap.nss = 2;
    ap
}

fn request(target: RoamState, reason: RoamReason) -> RoamRequest {
    RoamRequest::new(target, reason)
}

fn enable(ctl: &mut Controller, id: ConnectionId) {
    ctl.handle(id, request(RoamState::Init, RoamReason::Connect))
        .expect("init");
    ctl.handle(id, request(RoamState::RsoEnabled, RoamReason::Connect))
        .expect("start");
}

fn running(ini: RoamIni) -> Controller {
    let mut ctl = controller(ini);
    associate(&mut ctl, STA0, mac(1), 5180);
    enable(&mut ctl, STA0);
    ctl
}

mod candidate_order {
    use super::*;

    #[test]
    fn equal_scores_send_stronger_rssi_first() {
        let mut ini = RoamIni::defaults();
        ini.score.weights.rssi = 0;
        ini.score.weights.oce_ap_tx_pwr = 0;
        let mut ctl = controller(ini);
        associate(&mut ctl, STA0, mac(1), 5180);
        ctl.scan_cache_mut().entries = vec![vht_ap(10, 5180, -60), vht_ap(11, 5180, -55)];
        enable(&mut ctl, STA0);

        let start = ctl
            .transport()
            .sent
            .iter()
            .find(|bundle| bundle.command == RsoCommand::Start)
            .cloned()
            .expect("start bundle");
        assert_eq!(start.candidates, vec![mac(11), mac(10)]);
    }

    #[test]
    fn full_ties_keep_scan_order() {
        let mut ctl = controller(RoamIni::defaults());
        associate(&mut ctl, STA0, mac(1), 5180);
        ctl.scan_cache_mut().entries = vec![
            vht_ap(30, 5180, -62),
            vht_ap(20, 5180, -62),
            vht_ap(40, 5180, -62),
        ];
        enable(&mut ctl, STA0);
        let start = &ctl.transport().sent[1];
        assert_eq!(start.candidates, vec![mac(30), mac(20), mac(40)]);
    }

    #[test]
    fn current_and_removed_aps_are_not_offered() {
        let mut ctl = controller(RoamIni::defaults());
        associate(&mut ctl, STA0, mac(1), 5180);
        let mut removed = vht_ap(12, 5180, -40);
        removed.denylist = DenylistAction::Remove;
        let mut avoided = vht_ap(13, 5180, -40);
        avoided.denylist = DenylistAction::Avoid;
        ctl.scan_cache_mut().entries = vec![
            vht_ap(1, 5180, -45),
            removed,
            avoided,
            vht_ap(14, 5180, -75),
        ];
        enable(&mut ctl, STA0);
        let start = &ctl.transport().sent[1];
        assert_eq!(start.candidates, vec![mac(14), mac(13)]);
    }

    #[test]
    fn restricted_band_is_left_out_of_start() {
        let mut ctl = controller(RoamIni::defaults());
        ctl.policy_manager_mut().bands = BandMask::NONE.with(Band::Ghz5).with(Band::Ghz6);
        associate(&mut ctl, STA0, mac(1), 5180);
        ctl.scan_cache_mut().entries = vec![
            vht_ap(20, 2437, -40),
            vht_ap(21, 5955, -58),
            vht_ap(22, 5200, -66),
        ];
        enable(&mut ctl, STA0);
        let start = &ctl.transport().sent[1];
        assert_eq!(start.command, RsoCommand::Start);
        assert_eq!(start.candidates, vec![mac(21), mac(22)]);
        assert_eq!(start.band_mask, ctl.policy_manager().bands);
    }

    #[test]
    fn subnet_id_breaks_an_otherwise_even_match() {
        let mut ctl = running(RoamIni::defaults());
        let mut with_subnet = vht_ap(11, 5180, -60);
        with_subnet.oce.subnet_id_present = true;
        ctl.scan_cache_mut().entries = vec![
            vht_ap(1, 5180, -72),
            vht_ap(10, 5180, -60),
            with_subnet,
        ];
        ctl.invoke(STA0, InvokeRequest::to(MacAddr::BROADCAST, RoamSource::Host), 0)
            .expect("broadcast invoke");
        assert_eq!(ctl.process(STA0), Ok(1));
        assert_eq!(ctl.transport().invoked[0].1.bssid, mac(11));
    }
}

mod gating {
    use super::*;

    #[test]
    fn empty_trigger_bitmap_rejects_enable() {
        let mut ctl = controller(RoamIni::defaults());
        associate(&mut ctl, STA0, mac(1), 5180);
        ctl.policy_manager_mut().triggers = 0;
        let result = ctl.handle(STA0, request(RoamState::Init, RoamReason::Connect));
        assert!(matches!(
            result,
            Err(RoamError::InvalidTransition {
                from: RoamState::Deinit,
                requested: RoamState::Init
            })
        ));
        assert_eq!(ctl.state(STA0), Some(RoamState::Deinit));
        assert!(ctl.transport().sent.is_empty());
    }

    #[test]
    fn offload_disabled_in_ini_denies_start() {
        let mut ini = RoamIni::defaults();
        ini.roam_offload_enabled = false;
        let mut ctl = controller(ini);
        associate(&mut ctl, STA0, mac(1), 5180);
        ctl.handle(STA0, request(RoamState::Init, RoamReason::Connect))
            .expect("init");
        assert!(matches!(
            ctl.handle(STA0, request(RoamState::RsoEnabled, RoamReason::Connect)),
            Err(RoamError::PolicyDenied(DenyCause::OffloadDisabled))
        ));
        assert_eq!(ctl.state(STA0), Some(RoamState::Init));
    }

    #[test]
    fn supplicant_disable_queues_invoke_until_reenabled() {
        let mut ctl = running(RoamIni::defaults());
        ctl.scan_cache_mut().entries = vec![vht_ap(20, 5500, -58)];

        ctl.set_supplicant_roaming(STA0, false).expect("disable");
        assert_eq!(ctl.state(STA0), Some(RoamState::RsoStopped));

        ctl.invoke(STA0, InvokeRequest::to(mac(20), RoamSource::Host), 0)
            .expect("queued");
        assert_eq!(ctl.process(STA0), Ok(0));
        assert_eq!(ctl.pending_invokes(STA0), 1);
        assert!(ctl.transport().invoked.is_empty());

        ctl.set_supplicant_roaming(STA0, true).expect("enable");
        assert_eq!(ctl.state(STA0), Some(RoamState::RsoEnabled));
        assert_eq!(ctl.process(STA0), Ok(1));
        assert_eq!(ctl.state(STA0), Some(RoamState::RoamingInProgress));
        let (_, target) = ctl.transport().invoked[0];
        assert_eq!(target.bssid, mac(20));
        assert_eq!(target.freq_mhz, 5500);
    }

    #[test]
    fn supplicant_disabled_at_boot_starts_then_stops() {
        let mut ini = RoamIni::defaults();
        ini.user_roaming_disabled = true;
        let mut ctl = controller(ini);
        associate(&mut ctl, STA0, mac(1), 5180);
        enable(&mut ctl, STA0);
        assert_eq!(ctl.state(STA0), Some(RoamState::RsoStopped));
        assert_eq!(
            ctl.transport().commands(STA0),
            vec![RsoCommand::Init, RsoCommand::Start, RsoCommand::Stop]
        );
    }

    #[test]
    fn control_bits_block_enable_until_all_cleared() {
        let mut ctl = running(RoamIni::defaults());
        ctl.disable_roaming(STA0, ControlBits::START_BSS).expect("disable");
        ctl.disable_roaming(STA0, ControlBits::NDP_CON_ON_NDI)
            .expect("disable again");
        assert_eq!(ctl.state(STA0), Some(RoamState::RsoStopped));
        assert!(matches!(
            ctl.handle(STA0, request(RoamState::RsoEnabled, RoamReason::Connect)),
            Err(RoamError::PolicyDenied(DenyCause::ControlBitsSet(bits))) if bits == 0x11
        ));

        ctl.enable_roaming(STA0, ControlBits::START_BSS).expect("enable");
        assert_eq!(ctl.state(STA0), Some(RoamState::RsoStopped));
        ctl.enable_roaming(STA0, ControlBits::NDP_CON_ON_NDI)
            .expect("enable again");
        assert_eq!(ctl.state(STA0), Some(RoamState::RsoEnabled));
    }

    #[test]
    fn requests_need_an_up_link() {
        let mut ctl = running(RoamIni::defaults());
        if let Some(info) = ctl.connections_mut().infos[0].as_mut() {
            info.link = wlan_roam::LinkStatus::Disconnecting;
        }
        assert!(matches!(
            ctl.update_config(STA0, RoamReason::ScoringCriteriaChanged),
            Err(RoamError::InvalidTransition { .. })
        ));
        ctl.handle(STA0, request(RoamState::Deinit, RoamReason::Disconnected))
            .expect("deinit is always allowed");
        assert_eq!(ctl.state(STA0), Some(RoamState::Deinit));
    }
}

mod invoke {
    use super::*;

    #[test]
    fn unknown_bssid_is_no_candidate() {
        let mut ctl = running(RoamIni::defaults());
        assert!(matches!(
            ctl.invoke(STA0, InvokeRequest::to(mac(99), RoamSource::Host), 0),
            Err(RoamError::NoCandidateFound)
        ));
        assert_eq!(ctl.pending_invokes(STA0), 0);
    }

    #[test]
    fn queue_is_bounded() {
        let mut ctl = running(RoamIni::defaults());
        ctl.set_supplicant_roaming(STA0, false).expect("disable");
        for _ in 0..MAX_PENDING_INVOKES {
            ctl.invoke(STA0, InvokeRequest::to(mac(1), RoamSource::Host), 0)
                .expect("queued");
        }
        assert!(matches!(
            ctl.invoke(STA0, InvokeRequest::to(mac(1), RoamSource::Host), 0),
            Err(RoamError::ResourceExhausted)
        ));
    }

    #[test]
    fn transport_error_leaves_request_queued() {
        let mut ctl = running(RoamIni::defaults());
        ctl.invoke(STA0, InvokeRequest::to(mac(1), RoamSource::Host), 0)
            .expect("queued");
        ctl.transport_mut().invoke_error = Some(TransportError::NotReady);
        assert!(matches!(
            ctl.process(STA0),
            Err(RoamError::TransportFailure(TransportError::NotReady))
        ));
        assert_eq!(ctl.pending_invokes(STA0), 1);
        assert_eq!(ctl.state(STA0), Some(RoamState::RsoEnabled));

        ctl.transport_mut().invoke_error = None;
        assert_eq!(ctl.process(STA0), Ok(1));
        assert_eq!(ctl.pending_invokes(STA0), 0);
        assert_eq!(ctl.state(STA0), Some(RoamState::RoamingInProgress));
        assert_eq!(ctl.transport().invoked.len(), 1);
    }

    #[test]
    fn broadcast_skips_avoided_ap_when_current_is_unscanned() {
        let mut ctl = running(RoamIni::defaults());
        let mut avoided = vht_ap(5, 5200, -45);
        avoided.denylist = DenylistAction::Avoid;
        ctl.scan_cache_mut().entries = vec![avoided];
        assert!(matches!(
            ctl.invoke(STA0, InvokeRequest::to(MacAddr::BROADCAST, RoamSource::Host), 0),
            Err(RoamError::NoCandidateFound)
        ));
        assert_eq!(ctl.pending_invokes(STA0), 0);
    }

    #[test]
    fn data_stall_roam_is_forced() {
        let mut ini = RoamIni::defaults();
        ini.data_stall_roam_supported = true;
        let mut ctl = running(ini);
        ctl.invoke(STA0, InvokeRequest::default(), 0).expect("data stall");
        assert!(ctl
            .policy_context(STA0)
            .is_some_and(|policy| policy.forced_roaming));
        assert_eq!(ctl.process(STA0), Ok(1));
        assert_eq!(ctl.transport().invoked[0].1.source, RoamSource::DataStall);
    }

    #[test]
    fn expired_requests_are_dropped_in_order() {
        let mut ctl = running(RoamIni::defaults());
        ctl.set_supplicant_roaming(STA0, false).expect("disable");
        ctl.invoke(STA0, InvokeRequest::to(mac(1), RoamSource::Host), 0)
            .expect("first");
        ctl.invoke(STA0, InvokeRequest::to(mac(1), RoamSource::Host), 3_000)
            .expect("second");

        ctl.poll_timers(5_000).expect("poll");
        assert_eq!(ctl.pending_invokes(STA0), 1);
        assert!(ctl.timer_armed(STA0, TimerKind::InvokeExpiry));

        ctl.poll_timers(8_000).expect("poll");
        assert_eq!(ctl.pending_invokes(STA0), 0);
        assert!(!ctl.timer_armed(STA0, TimerKind::InvokeExpiry));
    }

    #[test]
    fn deinit_purges_queue() {
        let mut ctl = running(RoamIni::defaults());
        ctl.set_supplicant_roaming(STA0, false).expect("disable");
        ctl.invoke(STA0, InvokeRequest::to(mac(1), RoamSource::Host), 0)
            .expect("queued");
        ctl.handle(STA0, request(RoamState::Deinit, RoamReason::Disconnected))
            .expect("deinit");
        assert_eq!(ctl.pending_invokes(STA0), 0);
        assert!(!ctl.timer_armed(STA0, TimerKind::InvokeExpiry));
    }
}

mod arbitration {
    use super::*;

    fn two_stations(ini: RoamIni) -> Controller {
        let mut ctl = running(ini);
        associate(&mut ctl, STA1, mac(2), 2437);
        ctl
    }

    #[test]
    fn single_roamer_without_dbs() {
        let mut ctl = two_stations(RoamIni::defaults());
        assert!(matches!(
            ctl.handle(STA1, request(RoamState::Init, RoamReason::Connect)),
            Err(RoamError::PolicyDenied(DenyCause::ConcurrentPrimary(STA0)))
        ));
    }

    #[test]
    fn dual_sta_on_dbs_lets_both_roam() {
        let mut ctl = two_stations(RoamIni::defaults());
        ctl.policy_manager_mut().dbs = true;
        enable(&mut ctl, STA1);
        assert_eq!(ctl.state(STA0), Some(RoamState::RsoEnabled));
        assert_eq!(ctl.state(STA1), Some(RoamState::RsoEnabled));
    }

    #[test]
    fn supplicant_init_takes_over() {
        let mut ctl = two_stations(RoamIni::defaults());
        ctl.set_supplicant_roaming(STA1, true).expect("supplicant enable");
        assert_eq!(ctl.state(STA0), Some(RoamState::Deinit));
        assert_eq!(ctl.state(STA1), Some(RoamState::RsoEnabled));
    }

    #[test]
    fn pinning_primary_demotes_the_other_holder() {
        let mut ctl = two_stations(RoamIni::defaults());
        ctl.policy_manager_mut().dbs = true;
        enable(&mut ctl, STA1);

        ctl.policy_manager_mut().dbs = false;
        ctl.policy_manager_mut().primary = Some(STA1);
        ctl.on_primary_changed().expect("reevaluate");
        assert_eq!(ctl.state(STA0), Some(RoamState::Deinit));
        assert_eq!(ctl.state(STA1), Some(RoamState::RsoEnabled));
    }

    #[test]
    fn pinning_idle_station_moves_roaming_to_it() {
        let mut ctl = two_stations(RoamIni::defaults());
        assert_eq!(ctl.state(STA1), Some(RoamState::Deinit));

        ctl.policy_manager_mut().primary = Some(STA1);
        ctl.on_primary_changed().expect("reevaluate");
        assert_eq!(ctl.state(STA0), Some(RoamState::Deinit));
        assert_eq!(ctl.state(STA1), Some(RoamState::RsoEnabled));
    }

    #[test]
    fn pinned_station_takes_roaming_on_connect() {
        let mut ctl = running(RoamIni::defaults());
        ctl.policy_manager_mut().primary = Some(STA1);
        associate(&mut ctl, STA1, mac(2), 2437);
        assert_eq!(ctl.state(STA0), Some(RoamState::Deinit));
        assert_eq!(ctl.state(STA1), Some(RoamState::RsoEnabled));
    }

    #[test]
    fn disconnect_deactivates_pcl() {
        let mut ctl = two_stations(RoamIni::defaults());
        ctl.policy_manager_mut().dbs = true;
        ctl.handle(
            STA0,
            request(RoamState::RoamSyncInProgress, RoamReason::RoamCandidateFound),
        )
        .expect("sync");
        ctl.on_roam_sync_complete(STA0, true).expect("complete");
        assert_eq!(ctl.policy_manager().pcl_active, vec![STA0]);

        ctl.handle(STA0, request(RoamState::Deinit, RoamReason::Disconnected))
            .expect("deinit");
        assert!(ctl.policy_manager().pcl_active.is_empty());
    }

    #[test]
    fn first_enabled_keeps_roaming_without_pin() {
        let mut ctl = two_stations(RoamIni::defaults());
        ctl.policy_manager_mut().dbs = true;
        enable(&mut ctl, STA1);

        ctl.policy_manager_mut().dbs = false;
        ctl.reevaluate_primary().expect("reevaluate");
        assert_eq!(ctl.state(STA0), Some(RoamState::RsoEnabled));
        assert_eq!(ctl.state(STA1), Some(RoamState::Deinit));
    }

    #[test]
    fn sync_complete_on_dbs_activates_pcl() {
        let mut ctl = two_stations(RoamIni::defaults());
        ctl.policy_manager_mut().dbs = true;
        ctl.handle(
            STA0,
            request(RoamState::RoamSyncInProgress, RoamReason::RoamCandidateFound),
        )
        .expect("sync");
        ctl.on_roam_sync_complete(STA0, true).expect("complete");
        assert_eq!(ctl.policy_manager().pcl_active, vec![STA0]);
        assert_eq!(ctl.state(STA1), Some(RoamState::RsoEnabled));
    }
}

mod disconnect {
    use super::*;

    #[test]
    fn stop_ack_resumes_disconnect() {
        let mut ctl = running(RoamIni::defaults());
        ctl.stop_for_disconnect(STA0, 0).expect("stop");
        assert!(ctl.connections().resumed.is_empty());
        ctl.on_stop_response(STA0).expect("ack");
        assert_eq!(ctl.connections().resumed, vec![(STA0, false)]);

        // a late duplicate ack is ignored
        ctl.on_stop_response(STA0).expect("late ack");
        assert_eq!(ctl.connections().resumed.len(), 1);
    }

    #[test]
    fn stop_timeout_follows_ini() {
        let mut ini = RoamIni::defaults();
        ini.rso_stop_timeout_ms = 2_500;
        let mut ctl = running(ini);
        ctl.stop_for_disconnect(STA0, 100).expect("stop");
        ctl.poll_timers(2_599).expect("poll");
        assert!(ctl.connections().resumed.is_empty());
        ctl.poll_timers(2_600).expect("poll");
        assert_eq!(ctl.connections().resumed, vec![(STA0, true)]);
    }

    #[test]
    fn stop_timeout_out_of_range_is_clamped() {
        let mut ini = RoamIni::defaults();
        ini.rso_stop_timeout_ms = 1;
        let ctl = controller(ini);
        assert_eq!(
            ctl.ini().rso_stop_timeout_ms,
            wlan_roam::config::RSO_STOP_TIMEOUT_MIN_MS
        );
    }

    #[test]
    fn failed_roam_after_handoff_stops_offload() {
        let mut ctl = running(RoamIni::defaults());
        ctl.handle(
            STA0,
            request(RoamState::RoamSyncInProgress, RoamReason::RoamCandidateFound),
        )
        .expect("sync");
        assert!(matches!(ctl.on_roam_failure(STA0), Err(RoamError::RoamFailed)));
        assert_eq!(ctl.state(STA0), Some(RoamState::RsoStopped));
    }

    #[test]
    fn unauthenticated_sync_stops_offload() {
        let mut ctl = running(RoamIni::defaults());
        ctl.handle(
            STA0,
            request(RoamState::RoamSyncInProgress, RoamReason::RoamCandidateFound),
        )
        .expect("sync");
        ctl.on_roam_sync_complete(STA0, false).expect("complete");
        assert_eq!(ctl.state(STA0), Some(RoamState::RsoStopped));
    }
}
