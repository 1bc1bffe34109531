//! Candidate access point scoring.
//!
//! Everything here is pure: a score depends only on the candidate, the
//! [`ScoreConfig`] and the local [`ScoringPolicy`].

pub mod config;
pub mod engine;
pub mod factors;
pub mod rssi;
pub mod types;

pub use config::{
    PackedPercent, RssiConfig, ScoreConfig, SlotTable, WeightConfig, AVOID_CANDIDATE_MIN_SCORE,
    BEST_CANDIDATE_MAX_BSS_SCORE, BEST_CANDIDATE_MAX_WEIGHT,
};
pub use engine::{rank, rank_vec, score, score_breakdown, ScoreBreakdown};
pub use types::{
    CandidateAp, ChannelWidth, DenylistAction, LocalCaps, OceAttributes, PclTable, PhyCaps,
    ScoringPolicy,
};
