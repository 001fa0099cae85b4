//! Time-index builder (spec.md §4.4).
//!
//! `time_index` holds the command numbers of `Loaded`/`Executed` entries
//! (invariant I2), ascending by absolute time tag. Built by insertion sort
//! from the tail so that equal-time entries keep command-number order —
//! the loader always walks command numbers ascending, so "later-inserted"
//! and "higher command number" coincide.

use sc_common::ids::CmdNum;
use sc_common::status::CmdStatus;
use sc_common::time::Tick;
use sc_common::wire::AtsEntryHeader;

use crate::tables::AtsTable;

pub(crate) fn time_tag_of(table: &AtsTable, cmd: CmdNum) -> Tick {
    let offset = table.cmd_offset[cmd.index()]
        .expect("I1: is_in_time_index() entries always carry a cmd_offset");
    let start = offset.as_usize();
    AtsEntryHeader::parse(&table.words[start..start + AtsEntryHeader::WORDS]).time_tag
}

/// Rebuild `table.time_index` from scratch, from `table.cmd_status` and
/// `table.cmd_offset` (spec.md §4.4). Used by the loader after a fresh
/// load and by Append after a merge.
pub fn rebuild(table: &mut AtsTable) {
    table.time_index.clear();
    for raw in 1..=(table.cmd_status.len() as u16) {
        let cmd = CmdNum::new(raw).unwrap();
        if !table.cmd_status[cmd.index()].is_in_time_index() {
            continue;
        }
        insert(table, cmd);
    }
}

/// Insert one already-loaded command number into `table.time_index`,
/// preserving ascending-time order. Used both by [`rebuild`] and directly
/// by the loader when it appends one entry at a time.
pub fn insert(table: &mut AtsTable, cmd: CmdNum) {
    debug_assert!(table.cmd_status[cmd.index()].is_in_time_index());
    let time = time_tag_of(table, cmd);

    let mut at = table.time_index.len();
    while at > 0 {
        let existing = table.time_index[at - 1];
        if time_tag_of(table, existing).0 > time.0 {
            at -= 1;
        } else {
            break;
        }
    }
    table
        .time_index
        .insert(at, cmd)
        .expect("time_index capacity equals MAX_ATS_CMDS, one slot per command number");
}

/// Remove a command number from `table.time_index` (used when a command
/// transitions to a status no longer tracked by the index, e.g. Skipped
/// after a Jump does not remove it — only a full rebuild after Append
/// does). Kept for callers that need to drop a single stale entry without
/// a full rebuild.
pub fn remove(table: &mut AtsTable, cmd: CmdNum) {
    if let Some(pos) = table.time_index.iter().position(|&c| c == cmd) {
        table.time_index.remove(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sc_common::ids::EntryOffset;

    fn write_entry(table: &mut AtsTable, offset: u16, cmd_number: u16, time: u32) {
        let start = offset as usize;
        if table.words.len() < start + 2 {
            table.words.resize_default(start + 2).unwrap();
        }
        let header = AtsEntryHeader {
            cmd_number,
            time_tag: Tick(time),
        };
        header.write(&mut table.words[start..start + 2]);
        let cmd = CmdNum::new(cmd_number).unwrap();
        table.cmd_offset[cmd.index()] = Some(EntryOffset::new(offset));
        table.cmd_status[cmd.index()] = CmdStatus::Loaded;
    }

    #[test]
    fn orders_by_ascending_time() {
        let mut table = AtsTable::new();
        write_entry(&mut table, 0, 1, 300);
        write_entry(&mut table, 2, 2, 100);
        write_entry(&mut table, 4, 3, 200);
        rebuild(&mut table);
        let order: Vec<u16> = table.time_index.iter().map(|c| c.as_u16()).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn ties_keep_command_number_order() {
        let mut table = AtsTable::new();
        write_entry(&mut table, 0, 1, 100);
        write_entry(&mut table, 2, 2, 100);
        rebuild(&mut table);
        let order: Vec<u16> = table.time_index.iter().map(|c| c.as_u16()).collect();
        assert_eq!(order, vec![1, 2]);
    }

    #[test]
    fn skipped_and_empty_entries_excluded() {
        let mut table = AtsTable::new();
        write_entry(&mut table, 0, 1, 100);
        table.cmd_status[CmdNum::new(1).unwrap().index()] = CmdStatus::Skipped;
        rebuild(&mut table);
        assert!(table.time_index.is_empty());
    }
}
