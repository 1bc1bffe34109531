//! Which station connection may hold roam state when only one can.

use crate::types::ConnectionId;

/// A connection currently holding roam state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) struct Holder {
    pub(super) id: ConnectionId,
    /// Order in which the connection initialized roaming.
    pub(super) enable_seq: u32,
}

/// Only one station may roam unless dual-station roaming is allowed and the
/// hardware can scan both bands at once.
pub(super) const fn single_roamer(dual_sta_roam_allowed: bool, dbs: bool) -> bool {
    !dual_sta_roam_allowed || !dbs
}

/// Explicit pin when it is among the holders, else the first enabled.
pub(super) fn elect_primary(pinned: Option<ConnectionId>, holders: &[Holder]) -> Option<ConnectionId> {
    if let Some(pinned) = pinned {
        if holders.iter().any(|holder| holder.id == pinned) {
            return Some(pinned);
        }
    }
    holders
        .iter()
        .min_by_key(|holder| holder.enable_seq)
        .map(|holder| holder.id)
}
