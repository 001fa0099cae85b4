//! Per-entry and per-processor status/state enumerations (spec.md §3, §9
//! "C-style tagged status cells → sum types").
//!
//! These are the sum types that replace the source's status-code bytes.
//! Dispatch on the ATP/RTP state machines matches exhaustively on these so
//! the compiler enforces that every `(state, event)` pair is handled.

/// Status of a single ATS command slot (`cmd_status[n]`, spec.md §3).
///
/// Invariant I1: `CmdStatus::Loaded == (cmd_offset[n] is Some(_))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CmdStatus {
    /// No entry loaded at this command number.
    Empty,
    /// Entry loaded, not yet executed, not yet due.
    Loaded,
    /// Entry dispatched successfully.
    Executed,
    /// Entry skipped by a Jump or an incoming-ATS switch.
    Skipped,
    /// Checksum verification failed before dispatch.
    FailedChecksum,
    /// Bus publish failed.
    FailedDistrib,
}

impl Default for CmdStatus {
    fn default() -> Self {
        Self::Empty
    }
}

impl CmdStatus {
    /// True for statuses that still count toward `time_index` (invariant
    /// I2: `time_index` holds exactly the `Loaded` or `Executed` entries).
    pub const fn is_in_time_index(self) -> bool {
        matches!(self, Self::Loaded | Self::Executed)
    }
}

/// State of the single ATP control block (spec.md §3, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtpState {
    /// No ATS selected; nothing to dispatch.
    Idle,
    /// An ATS is selected and being walked in time order.
    Executing,
    /// Mid-switch: the outgoing ATS is still nominally `Executing` but a
    /// switch has been serviced and the incoming ATS is being initialized.
    Starting,
}

impl Default for AtpState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Status of one RTS slot (spec.md §3 "Per-RTS info"). The `disabled` flag
/// is tracked separately (spec.md §4.7: "slot not disabled" and "slot
/// status LOADED" are independent preconditions for Start).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RtsStatus {
    /// No table loaded into this slot.
    Empty,
    /// Table loaded, not running.
    Loaded,
    /// Table running; RTP may dispatch from it.
    Executing,
}

impl Default for RtsStatus {
    fn default() -> Self {
        Self::Empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cmd_status_time_index_membership() {
        assert!(CmdStatus::Loaded.is_in_time_index());
        assert!(CmdStatus::Executed.is_in_time_index());
        assert!(!CmdStatus::Empty.is_in_time_index());
        assert!(!CmdStatus::Skipped.is_in_time_index());
        assert!(!CmdStatus::FailedChecksum.is_in_time_index());
        assert!(!CmdStatus::FailedDistrib.is_in_time_index());
    }

    #[test]
    fn defaults() {
        assert_eq!(CmdStatus::default(), CmdStatus::Empty);
        assert_eq!(AtpState::default(), AtpState::Idle);
        assert_eq!(RtsStatus::default(), RtsStatus::Empty);
    }
}
