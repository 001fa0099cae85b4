//! ATS/Append table validator (spec.md §4.1).
//!
//! Walks a candidate word buffer header by header without mutating
//! anything, checking exactly the invariants the loader and Append later
//! rely on holding: legal command numbers, legal packet lengths, no entry
//! overrunning the buffer, no duplicate command number. Packet length is
//! never read from a hardcoded offset; it comes from the bus's own framing
//! (spec.md §6), so the validator takes the bus as a read-only collaborator
//! even though it performs no I/O of its own.

use heapless::Vec as HVec;

use sc_common::bus::MessageBus;
use sc_common::error::AtsVerifyError;
use sc_common::ids::{CmdNum, EntryOffset};
use sc_common::limits::{MAX_ATS_CMDS, PACKET_MAX_SIZE, PACKET_MIN_SIZE};
use sc_common::wire::{ats_entry_word_len, AtsEntryHeader};

/// Successful validation result (spec.md §4.1 "Output").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtsValidationOk {
    /// Number of non-terminating entries found.
    pub entry_count: u16,
    /// Total words consumed by those entries (excludes any terminator).
    pub words_used: u16,
}

/// Shared walk used by both [`validate_ats`] and [`crate::loader`]: the
/// loader re-walks the same buffer rather than trusting a cached entry
/// list, so a corrupted buffer between validate and load still surfaces as
/// an error instead of a mismatched table (spec.md §4.3 "on any internal
/// inconsistency... reinitializes the slot and aborts").
pub(crate) fn walk_ats_entries(
    words: &[u32],
    bus: &dyn MessageBus,
) -> Result<(HVec<(CmdNum, EntryOffset), MAX_ATS_CMDS>, u16), AtsVerifyError> {
    let buffer_words = words.len();
    let mut seen = [false; MAX_ATS_CMDS];
    let mut entries: HVec<(CmdNum, EntryOffset), MAX_ATS_CMDS> = HVec::new();
    let mut offset: usize = 0;

    loop {
        if offset == buffer_words {
            // Reached the buffer end exactly: a valid terminator by omission.
            break;
        }

        let remaining = buffer_words - offset;
        if remaining < AtsEntryHeader::WORDS {
            // Only the first header word is present; it still carries the
            // command-number field, so a zero there is a legal (truncated)
            // terminator.
            let cmd_number = (words[offset] & 0xFFFF) as u16;
            if cmd_number == 0 {
                break;
            }
            return Err(AtsVerifyError::BufferFullBeforeMinEntry);
        }

        let header = AtsEntryHeader::parse(&words[offset..offset + AtsEntryHeader::WORDS]);
        if header.is_terminator() {
            break;
        }

        let word_offset = offset as u16;

        if header.cmd_number as usize > MAX_ATS_CMDS {
            return Err(AtsVerifyError::InvalidCmdNumber { word_offset });
        }

        let packet_start = offset + AtsEntryHeader::WORDS;
        let packet_len = bus
            .packet_byte_len(&words[packet_start..])
            .filter(|&len| (len as usize) >= PACKET_MIN_SIZE && (len as usize) <= PACKET_MAX_SIZE)
            .ok_or(AtsVerifyError::PacketLengthInvalid { word_offset })?;

        let entry_words = ats_entry_word_len(packet_len as usize);
        if offset + entry_words > buffer_words {
            return Err(AtsVerifyError::PacketOverrunsBuffer { word_offset });
        }

        let slot = header.cmd_number as usize - 1;
        if seen[slot] {
            return Err(AtsVerifyError::DuplicateCmdNumber {
                cmd_number: header.cmd_number,
                word_offset,
            });
        }
        seen[slot] = true;
        // Capacity matches MAX_ATS_CMDS and `seen` forbids duplicates, so
        // this can never exceed the vec's fixed capacity.
        let _ = entries.push((CmdNum::new(header.cmd_number).unwrap(), EntryOffset::new(word_offset)));
        offset += entry_words;
    }

    Ok((entries, offset as u16))
}

/// Validate a candidate ATS/Append buffer.
///
/// `words` is the full candidate buffer at its current fill length (not
/// necessarily the buffer's allocated capacity).
pub fn validate_ats(words: &[u32], bus: &dyn MessageBus) -> Result<AtsValidationOk, AtsVerifyError> {
    let (entries, words_used) = walk_ats_entries(words, bus)?;
    if entries.is_empty() {
        return Err(AtsVerifyError::Empty);
    }
    Ok(AtsValidationOk {
        entry_count: entries.len() as u16,
        words_used,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sc_common::bus::{BusError, InlineCommand};

    struct FixedLenBus {
        len: u16,
    }

    impl MessageBus for FixedLenBus {
        fn publish(&mut self, _words: &[u32]) -> Result<(), BusError> {
            Ok(())
        }
        fn packet_byte_len(&self, _words: &[u32]) -> Option<u16> {
            Some(self.len)
        }
        fn is_valid_message_id(&self, _words: &[u32]) -> bool {
            true
        }
        fn inline_command(&self, _words: &[u32]) -> Option<InlineCommand> {
            None
        }
        fn verify_checksum(&self, _words: &[u32]) -> bool {
            true
        }
    }

    fn push_entry(buf: &mut Vec<u32>, cmd_number: u16, packet_words: usize) {
        buf.push(cmd_number as u32);
        buf.push(0);
        buf.extend(std::iter::repeat(0u32).take(packet_words));
    }

    #[test]
    fn empty_buffer_is_empty_table() {
        let bus = FixedLenBus { len: 8 };
        let words: Vec<u32> = vec![0, 0];
        assert_eq!(validate_ats(&words, &bus), Err(AtsVerifyError::Empty));
    }

    #[test]
    fn single_entry_validates() {
        let bus = FixedLenBus { len: 8 };
        let mut words = Vec::new();
        push_entry(&mut words, 1, 2);
        words.push(0);
        words.push(0);
        let ok = validate_ats(&words, &bus).unwrap();
        assert_eq!(ok.entry_count, 1);
        assert_eq!(ok.words_used, 4);
    }

    #[test]
    fn reaching_end_exactly_terminates() {
        let bus = FixedLenBus { len: 8 };
        let mut words = Vec::new();
        push_entry(&mut words, 1, 2);
        let ok = validate_ats(&words, &bus).unwrap();
        assert_eq!(ok.entry_count, 1);
        assert_eq!(ok.words_used, 4);
    }

    #[test]
    fn duplicate_command_number_fails() {
        let bus = FixedLenBus { len: 8 };
        let mut words = Vec::new();
        push_entry(&mut words, 3, 2);
        push_entry(&mut words, 3, 2);
        words.push(0);
        assert_eq!(
            validate_ats(&words, &bus),
            Err(AtsVerifyError::DuplicateCmdNumber {
                cmd_number: 3,
                word_offset: 4,
            })
        );
    }

    #[test]
    fn invalid_command_number_fails() {
        let bus = FixedLenBus { len: 8 };
        let words: Vec<u32> = vec![MAX_ATS_CMDS as u32 + 1, 0, 0, 0];
        assert_eq!(
            validate_ats(&words, &bus),
            Err(AtsVerifyError::InvalidCmdNumber { word_offset: 0 })
        );
    }

    #[test]
    fn packet_overrunning_buffer_fails() {
        let bus = FixedLenBus { len: 64 };
        let words: Vec<u32> = vec![1, 0];
        assert_eq!(
            validate_ats(&words, &bus),
            Err(AtsVerifyError::PacketOverrunsBuffer { word_offset: 0 })
        );
    }

    #[test]
    fn packet_length_out_of_range_fails() {
        let bus = FixedLenBus { len: 4 };
        let words: Vec<u32> = vec![1, 0, 0];
        assert_eq!(
            validate_ats(&words, &bus),
            Err(AtsVerifyError::PacketLengthInvalid { word_offset: 0 })
        );
    }

    #[test]
    fn truncated_terminator_word_is_ok_if_two_entries_precede() {
        let bus = FixedLenBus { len: 8 };
        let mut words = Vec::new();
        push_entry(&mut words, 1, 2);
        push_entry(&mut words, 2, 2);
        words.push(0); // single trailing word, cmd_number field reads zero
        let ok = validate_ats(&words, &bus).unwrap();
        assert_eq!(ok.entry_count, 2);
        assert_eq!(ok.words_used, 8);
    }

    #[test]
    fn truncated_nonzero_trailing_word_fails() {
        let bus = FixedLenBus { len: 8 };
        let mut words = Vec::new();
        push_entry(&mut words, 1, 2);
        words.push(7); // one trailing word, nonzero cmd_number field, no room for a header
        assert_eq!(
            validate_ats(&words, &bus),
            Err(AtsVerifyError::BufferFullBeforeMinEntry)
        );
    }
}
