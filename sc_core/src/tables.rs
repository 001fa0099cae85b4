//! ATS/Append/RTS word buffers and per-ATS auxiliary tables (spec.md §3).
//!
//! Grounded in the teacher's pre-allocated, zero-heap `AxisRuntimeState`
//! array pattern (`evo_control_unit::cycle::AxisRuntimeState`): every
//! table here is a fixed-capacity array or `heapless::Vec`, sized from
//! [`sc_common::limits`] at compile time. Nothing in this module performs
//! I/O; it is pure storage plus the bookkeeping the loader and Append
//! need to stay consistent.

use heapless::Vec as HVec;

use sc_common::ids::{CmdNum, EntryOffset};
use sc_common::limits::{APPEND_BUFFER_SIZE, ATS_BUFFER_SIZE, MAX_ATS_CMDS, RTS_BUFFER_SIZE};
use sc_common::status::CmdStatus;

/// Size/count/use-counter summary published in housekeeping (spec.md §3
/// "summary").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableSummary {
    /// Words currently occupied in the buffer.
    pub size_words: u16,
    /// Number of entries (commands) currently present.
    pub num_commands: u16,
    /// Incremented on every successful load (SPEC_FULL.md §3 "Use
    /// counters").
    pub use_counter: u32,
}

/// One ATS buffer plus its auxiliary tables (spec.md §3).
///
/// Invariant I1 (`cmd_status[n] == Loaded` iff `cmd_offset[n].is_some()`)
/// and I2 (`time_index` holds exactly the `Loaded`/`Executed` command
/// numbers, time-sorted) are maintained by [`crate::loader`],
/// [`crate::time_index`] and [`crate::append`] — nothing else mutates
/// these fields.
pub struct AtsTable {
    /// Raw packed word buffer.
    pub words: HVec<u32, ATS_BUFFER_SIZE>,
    /// Word offset of the entry carrying each command number, or `None`.
    pub cmd_offset: [Option<EntryOffset>; MAX_ATS_CMDS],
    /// Status of each command number.
    pub cmd_status: [CmdStatus; MAX_ATS_CMDS],
    /// Command numbers of `Loaded`/`Executed` entries, ascending by time tag.
    pub time_index: HVec<CmdNum, MAX_ATS_CMDS>,
    /// Size/count/use-counter summary.
    pub summary: TableSummary,
}

impl AtsTable {
    /// An empty table: no buffer, all auxiliaries cleared.
    pub fn new() -> Self {
        Self {
            words: HVec::new(),
            cmd_offset: [None; MAX_ATS_CMDS],
            cmd_status: [CmdStatus::Empty; MAX_ATS_CMDS],
            time_index: HVec::new(),
            summary: TableSummary::default(),
        }
    }

    /// Clear every auxiliary without touching `words` (spec.md §4.3: the
    /// loader "clears the slot's auxiliaries" before re-walking the
    /// buffer).
    pub fn clear_auxiliaries(&mut self) {
        self.cmd_offset = [None; MAX_ATS_CMDS];
        self.cmd_status = [CmdStatus::Empty; MAX_ATS_CMDS];
        self.time_index.clear();
        self.summary = TableSummary::default();
    }

    /// Reinitialize the whole slot, buffer included. Used when a new load
    /// replaces a table wholesale (spec.md §3 "Lifecycle": "destroyed
    /// implicitly by the next successful load into the same slot").
    pub fn reset(&mut self) {
        self.words.clear();
        self.clear_auxiliaries();
    }

    /// `true` when no command is loaded (spec.md §4.5 Append precondition:
    /// "target ATS has size > 0").
    pub fn is_empty(&self) -> bool {
        self.summary.num_commands == 0
    }
}

impl Default for AtsTable {
    fn default() -> Self {
        Self::new()
    }
}

/// The single Append buffer (spec.md §3 "Append buffer").
pub struct AppendTable {
    /// Raw packed word buffer.
    pub words: HVec<u32, APPEND_BUFFER_SIZE>,
    /// Size/count summary.
    pub summary: TableSummary,
}

impl AppendTable {
    /// An empty Append buffer.
    pub fn new() -> Self {
        Self {
            words: HVec::new(),
            summary: TableSummary::default(),
        }
    }

    /// Reinitialize the buffer and its summary.
    pub fn reset(&mut self) {
        self.words.clear();
        self.summary = TableSummary::default();
    }
}

impl Default for AppendTable {
    fn default() -> Self {
        Self::new()
    }
}

/// One RTS word buffer (spec.md §3 "RTS buffer"). Per-slot run state
/// (status, counters, next-command pointers) lives in [`crate::rtp`],
/// mirroring how the teacher keeps `evo_control_unit::shm::segments`
/// (the raw transport) separate from `evo_control_unit::state` (the run
/// state machines).
pub struct RtsTable {
    /// Raw packed word buffer.
    pub words: HVec<u32, RTS_BUFFER_SIZE>,
    /// Size/count/use-counter summary.
    pub summary: TableSummary,
}

impl RtsTable {
    /// An empty RTS buffer.
    pub fn new() -> Self {
        Self {
            words: HVec::new(),
            summary: TableSummary::default(),
        }
    }

    /// Reinitialize the buffer and its summary.
    pub fn reset(&mut self) {
        self.words.clear();
        self.summary = TableSummary::default();
    }
}

impl Default for RtsTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ats_table_starts_empty() {
        let table = AtsTable::new();
        assert!(table.is_empty());
        assert_eq!(table.time_index.len(), 0);
        assert!(table.cmd_offset.iter().all(Option::is_none));
        assert!(table.cmd_status.iter().all(|s| *s == CmdStatus::Empty));
    }

    #[test]
    fn ats_table_clear_auxiliaries_preserves_words() {
        let mut table = AtsTable::new();
        table.words.extend_from_slice(&[1, 2, 3]).unwrap();
        table.cmd_status[0] = CmdStatus::Loaded;
        table.clear_auxiliaries();
        assert_eq!(table.words.len(), 3);
        assert_eq!(table.cmd_status[0], CmdStatus::Empty);
    }

    #[test]
    fn ats_table_reset_clears_everything() {
        let mut table = AtsTable::new();
        table.words.extend_from_slice(&[1, 2, 3]).unwrap();
        table.summary.num_commands = 2;
        table.reset();
        assert_eq!(table.words.len(), 0);
        assert!(table.is_empty());
    }
}
