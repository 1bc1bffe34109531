use heapless::Vec;

use crate::{
    error::RoamError,
    types::{ConnectionId, MAX_CONNECTIONS},
};

const MAX_TIMERS: usize = MAX_CONNECTIONS * 2;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimerKind {
    /// Waiting for the firmware to acknowledge a stop before disconnecting.
    StopResponse,
    /// Oldest queued roam-now request goes stale.
    InvokeExpiry,
}

impl TimerKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StopResponse => "stop_response",
            Self::InvokeExpiry => "invoke_expiry",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct TimerEntry {
    conn: ConnectionId,
    kind: TimerKind,
    deadline_ms: u64,
}

/// Named delayed events, at most one per connection and kind.
#[derive(Debug, Default)]
pub(super) struct TimerTable {
    entries: Vec<TimerEntry, MAX_TIMERS>,
}

impl TimerTable {
    pub(super) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn position(&self, conn: ConnectionId, kind: TimerKind) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.conn == conn && entry.kind == kind)
    }

    /// Arms or re-arms a timer.
    pub(super) fn arm(
        &mut self,
        conn: ConnectionId,
        kind: TimerKind,
        deadline_ms: u64,
    ) -> Result<(), RoamError> {
        if let Some(idx) = self.position(conn, kind) {
            self.entries[idx].deadline_ms = deadline_ms;
            return Ok(());
        }
        self.entries
            .push(TimerEntry {
                conn,
                kind,
                deadline_ms,
            })
            .map_err(|_| RoamError::ResourceExhausted)
    }

    /// Returns whether a timer was armed. Cancelling an idle timer is a no-op.
    pub(super) fn cancel(&mut self, conn: ConnectionId, kind: TimerKind) -> bool {
        match self.position(conn, kind) {
            Some(idx) => {
                self.entries.swap_remove(idx);
                true
            }
            None => false,
        }
    }

    pub(super) fn cancel_all(&mut self, conn: ConnectionId) {
        self.entries.retain(|entry| entry.conn != conn);
    }

    pub(super) fn is_armed(&self, conn: ConnectionId, kind: TimerKind) -> bool {
        self.position(conn, kind).is_some()
    }

    pub(super) fn deadline(&self, conn: ConnectionId, kind: TimerKind) -> Option<u64> {
        self.position(conn, kind)
            .map(|idx| self.entries[idx].deadline_ms)
    }

    /// Removes and returns the earliest timer due at `now_ms`.
    pub(super) fn pop_expired(&mut self, now_ms: u64) -> Option<(ConnectionId, TimerKind)> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.deadline_ms <= now_ms)
            .min_by_key(|(_, entry)| entry.deadline_ms)
            .map(|(idx, _)| idx)?;
        let entry = self.entries.swap_remove(idx);
        Some((entry.conn, entry.kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_idempotent() {
        let mut timers = TimerTable::new();
        assert!(timers.arm(ConnectionId(0), TimerKind::StopResponse, 100).is_ok());
        assert!(timers.cancel(ConnectionId(0), TimerKind::StopResponse));
        assert!(!timers.cancel(ConnectionId(0), TimerKind::StopResponse));
        assert!(!timers.is_armed(ConnectionId(0), TimerKind::StopResponse));
    }

    #[test]
    fn rearm_replaces_deadline() {
        let mut timers = TimerTable::new();
        assert!(timers.arm(ConnectionId(1), TimerKind::InvokeExpiry, 100).is_ok());
        assert!(timers.arm(ConnectionId(1), TimerKind::InvokeExpiry, 250).is_ok());
        assert_eq!(timers.deadline(ConnectionId(1), TimerKind::InvokeExpiry), Some(250));
        assert_eq!(timers.pop_expired(200), None);
    }

    #[test]
    fn expired_timers_pop_in_deadline_order() {
        let mut timers = TimerTable::new();
        assert!(timers.arm(ConnectionId(0), TimerKind::InvokeExpiry, 300).is_ok());
        assert!(timers.arm(ConnectionId(1), TimerKind::StopResponse, 100).is_ok());
        assert!(timers.arm(ConnectionId(2), TimerKind::StopResponse, 900).is_ok());
        assert_eq!(
            timers.pop_expired(500),
            Some((ConnectionId(1), TimerKind::StopResponse))
        );
        assert_eq!(
            timers.pop_expired(500),
            Some((ConnectionId(0), TimerKind::InvokeExpiry))
        );
        assert_eq!(timers.pop_expired(500), None);
        timers.cancel_all(ConnectionId(2));
        assert_eq!(timers.pop_expired(u64::MAX), None);
    }
}
