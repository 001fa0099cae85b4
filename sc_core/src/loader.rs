//! ATS loader (spec.md §4.3).
//!
//! Takes a buffer that has already passed [`crate::validate::ats::validate_ats`]
//! and populates a table's auxiliaries from it. Re-walking rather than
//! trusting a cached entry list means a buffer corrupted between validate
//! and load still surfaces as a load failure instead of silently wrong
//! state — the "on any internal inconsistency... reinitializes the slot
//! and aborts" clause of spec.md §4.3.

use sc_common::bus::MessageBus;
use sc_common::error::AtsVerifyError;
use sc_common::status::CmdStatus;

use crate::tables::AtsTable;
use crate::time_index;
use crate::validate::ats::walk_ats_entries;

/// Load `words` into `table`: clear auxiliaries, re-walk, populate
/// `cmd_offset`/`cmd_status`, build `time_index`. Idempotent: loading the
/// same buffer twice leaves the table in the same state (spec.md §4.3).
///
/// Callers are expected to have already run [`crate::validate::ats::validate_ats`]
/// on `words` (spec.md §4.1/§4.3 split validate-then-load); this function
/// re-derives entries from `words` itself rather than accepting a cached
/// result, so it can detect and reject a buffer that changed underneath
/// the caller between the two calls.
pub fn load_ats(table: &mut AtsTable, words: &[u32], bus: &dyn MessageBus) -> Result<(), AtsVerifyError> {
    table.clear_auxiliaries();

    let result = walk_ats_entries(words, bus);
    let (entries, words_used) = match result {
        Ok(v) => v,
        Err(e) => {
            table.reset();
            return Err(e);
        }
    };

    table.words.clear();
    if table.words.extend_from_slice(words).is_err() {
        table.reset();
        return Err(AtsVerifyError::PacketOverrunsBuffer { word_offset: 0 });
    }

    for (cmd, offset) in entries.iter().copied() {
        table.cmd_offset[cmd.index()] = Some(offset);
        table.cmd_status[cmd.index()] = CmdStatus::Loaded;
    }
    table.summary.num_commands = entries.len() as u16;
    table.summary.size_words = words_used;
    table.summary.use_counter += 1;

    time_index::rebuild(table);
    Ok(())
}
