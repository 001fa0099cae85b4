//! Append merge (spec.md §4.5).
//!
//! Merges the single Append buffer onto the tail of a target ATS table.
//! The restart-if-currently-executing half of spec.md §4.5 ("If the ATS
//! being appended to is the currently EXECUTING ATS, restart it...") is
//! the caller's job: [`append`] only knows about tables, not ATP state, so
//! [`Engine::append_ats`](crate::engine::Engine::append_ats) checks whether
//! the target is the live ATS and calls [`crate::atp::Atp::restart_in_place`]
//! itself after a successful merge.

use sc_common::bus::MessageBus;
use sc_common::error::AppendError;
use sc_common::ids::EntryOffset;
use sc_common::limits::ATS_BUFFER_SIZE;
use sc_common::status::CmdStatus;

use crate::tables::{AppendTable, AtsTable};
use crate::time_index;
use crate::validate::ats::walk_ats_entries;

/// Result of a successful append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Number of entries copied from the Append buffer.
    pub appended: u16,
}

/// Merge `source` onto the tail of `target` (spec.md §4.5).
pub fn append(
    target: &mut AtsTable,
    source: &AppendTable,
    bus: &dyn MessageBus,
) -> Result<AppendOutcome, AppendError> {
    if target.is_empty() {
        return Err(AppendError::TargetEmpty);
    }
    if source.words.is_empty() {
        return Err(AppendError::SourceEmpty);
    }

    let (entries, _) =
        walk_ats_entries(&source.words, bus).map_err(|_| AppendError::SourceEmpty)?;
    if entries.is_empty() {
        return Err(AppendError::SourceEmpty);
    }

    let source_word_count = source.words.len();
    if target.words.len() + source_word_count > ATS_BUFFER_SIZE {
        return Err(AppendError::NoRoom);
    }

    let base_offset = target.words.len() as u16;
    target
        .words
        .extend_from_slice(&source.words)
        .map_err(|_| AppendError::NoRoom)?;

    for (cmd, rel_offset) in entries.iter().copied() {
        let idx = cmd.index();
        let abs_offset = EntryOffset::new(base_offset + rel_offset.as_u16());
        if target.cmd_status[idx] == CmdStatus::Empty {
            target.summary.num_commands += 1;
        }
        target.cmd_offset[idx] = Some(abs_offset);
        target.cmd_status[idx] = CmdStatus::Loaded;
    }

    target.summary.size_words = target.words.len() as u16;
    target.summary.use_counter += 1;
    time_index::rebuild(target);

    Ok(AppendOutcome {
        appended: entries.len() as u16,
    })
}
