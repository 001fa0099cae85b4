//! Housekeeping counters and the read-only telemetry snapshot (spec.md §2
//! component 9; SPEC_FULL.md §4 "Counters reported in housekeeping").
//!
//! Pure bookkeeping: every field here is incremented exactly where the
//! corresponding event fires in [`crate::atp`]/[`crate::rtp`]/
//! [`crate::engine`], and [`RESET_COUNTERS`](crate::engine::Engine::reset_counters)
//! zeroes this struct alone, never processor state.

use sc_common::bus::SequenceRef;
use sc_common::ids::AtsId;
use sc_common::status::AtpState;

/// Counters maintained across the engine's lifetime (reset only by
/// `RESET_COUNTERS`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Ground commands accepted (spec.md §6 command codes).
    pub cmd_counter: u32,
    /// Ground commands rejected.
    pub cmd_error_counter: u32,
    /// Stored ATS commands successfully dispatched.
    pub ats_cmds_completed: u32,
    /// Stored RTS commands successfully dispatched.
    pub rts_cmds_completed: u32,
    /// ATS dispatch-time errors (status-invalid, mismatch, checksum, publish).
    pub ats_error_counter: u32,
    /// RTS dispatch-time errors (checksum, publish).
    pub rts_error_counter: u32,
}

impl Counters {
    /// Zero every field (`RESET_COUNTERS`).
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Everything a housekeeping-request command code dumps (spec.md §2
/// component 9: "read-only status surface").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HousekeepingSnapshot {
    /// Counters since the last `RESET_COUNTERS`.
    pub counters: Counters,
    /// Sequence the last ATS error occurred on.
    pub last_ats_error: SequenceRef,
    /// Sequence the last RTS error occurred on.
    pub last_rts_error: SequenceRef,
    /// Current ATP state.
    pub atp_state: AtpState,
    /// ATS currently selected by the ATP, if any.
    pub current_ats: Option<AtsId>,
    /// Number of RTS slots currently EXECUTING.
    pub num_active_rts: u16,
}
