//! Roaming configuration.
//!
//! [`RoamIni`] carries the driver-level switches and the score
//! configuration. It is plain data with `const` defaults so it can live in a
//! `static`; with the `std` feature it can also be loaded from TOML.

#[cfg(feature = "std")]
mod file;

#[cfg(feature = "std")]
pub use file::{
    load_from_path, load_from_str, parse_roam_file, validate_roam_file, ConfigError, RoamFile,
};

use crate::scoring::ScoreConfig;

pub const RSO_STOP_TIMEOUT_DEFAULT_MS: u32 = 1_000;
pub const RSO_STOP_TIMEOUT_MIN_MS: u32 = 100;
pub const RSO_STOP_TIMEOUT_MAX_MS: u32 = 10_000;
pub const INVOKE_EXPIRY_DEFAULT_MS: u32 = 5_000;
pub const INVOKE_EXPIRY_MIN_MS: u32 = 500;
pub const INVOKE_EXPIRY_MAX_MS: u32 = 60_000;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RoamIni {
    pub roam_offload_enabled: bool,
    /// Both station connections may hold roam state on DBS hardware.
    pub dual_sta_roam_allowed: bool,
    pub self_bss_roam_allowed: bool,
    pub data_stall_roam_supported: bool,
    /// Firmware acknowledges stop commands; disconnect waits for it.
    pub rso_stop_response_supported: bool,
    pub rso_stop_timeout_ms: u32,
    pub invoke_expiry_ms: u32,
    /// New connections start with supplicant roaming disabled.
    pub user_roaming_disabled: bool,
    pub score: ScoreConfig,
}

impl RoamIni {
    pub const fn defaults() -> Self {
        Self {
            roam_offload_enabled: true,
            dual_sta_roam_allowed: true,
            self_bss_roam_allowed: true,
            data_stall_roam_supported: false,
            rso_stop_response_supported: true,
            rso_stop_timeout_ms: RSO_STOP_TIMEOUT_DEFAULT_MS,
            invoke_expiry_ms: INVOKE_EXPIRY_DEFAULT_MS,
            user_roaming_disabled: false,
            score: ScoreConfig::defaults(),
        }
    }

    pub fn sanitized(self) -> Self {
        Self {
            rso_stop_timeout_ms: clamp_u32(
                self.rso_stop_timeout_ms,
                RSO_STOP_TIMEOUT_MIN_MS,
                RSO_STOP_TIMEOUT_MAX_MS,
            ),
            invoke_expiry_ms: clamp_u32(
                self.invoke_expiry_ms,
                INVOKE_EXPIRY_MIN_MS,
                INVOKE_EXPIRY_MAX_MS,
            ),
            score: self.score.sanitized(),
            ..self
        }
    }
}

impl Default for RoamIni {
    fn default() -> Self {
        Self::defaults()
    }
}

const fn clamp_u32(value: u32, min: u32, max: u32) -> u32 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}
