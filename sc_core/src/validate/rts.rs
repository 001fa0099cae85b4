//! RTS table validator (spec.md §4.2).
//!
//! Same pure-function shape as [`super::ats::validate_ats`]: walks entry
//! headers without mutating anything, deferring to the bus for message-id
//! validity and packet length. One RTS-specific wrinkle (spec.md §4.2):
//! "an entry with message-id invalid but time-tag zero is treated as
//! end-of-sequence" rather than a hard failure — ground sometimes pads an
//! RTS buffer by zeroing only the relative-time word of the next entry.

use sc_common::bus::MessageBus;
use sc_common::limits::{PACKET_MAX_SIZE, PACKET_MIN_SIZE};
use sc_common::wire::{rts_entry_word_len, RtsEntryHeader};
use sc_common::error::RtsVerifyError;

/// Successful validation result, mirroring [`super::ats::AtsValidationOk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtsValidationOk {
    /// Number of non-terminating entries found.
    pub entry_count: u16,
    /// Total words consumed by those entries (excludes trailing zero fill).
    pub words_used: u16,
}

/// Validate a candidate RTS buffer.
pub fn validate_rts(words: &[u32], bus: &dyn MessageBus) -> Result<RtsValidationOk, RtsVerifyError> {
    let buffer_words = words.len();
    let min_entry_words = rts_entry_word_len(PACKET_MIN_SIZE);
    let mut entry_count: u16 = 0;
    let mut offset: usize = 0;

    loop {
        let remaining = buffer_words - offset;
        if remaining < min_entry_words {
            if words[offset..].iter().all(|&w| w == 0) {
                break;
            }
            return Err(RtsVerifyError::TrailingNonzeroData {
                word_offset: offset as u16,
            });
        }

        let word_offset = offset as u16;
        let header = RtsEntryHeader::parse(&words[offset..offset + RtsEntryHeader::WORDS]);
        let packet_start = offset + RtsEntryHeader::WORDS;

        if !bus.is_valid_message_id(&words[packet_start..]) {
            if header.is_zero() {
                break;
            }
            return Err(RtsVerifyError::InvalidMsgId { word_offset });
        }

        let packet_len = bus
            .packet_byte_len(&words[packet_start..])
            .filter(|&len| (len as usize) >= PACKET_MIN_SIZE && (len as usize) <= PACKET_MAX_SIZE)
            .ok_or(RtsVerifyError::CmdLengthInvalid { word_offset })?;

        let entry_words = rts_entry_word_len(packet_len as usize);
        if offset + entry_words > buffer_words {
            return Err(RtsVerifyError::CmdOverrunsBuffer { word_offset });
        }

        entry_count += 1;
        offset += entry_words;
    }

    Ok(RtsValidationOk {
        entry_count,
        words_used: offset as u16,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sc_common::bus::{BusError, InlineCommand};

    struct FixedBus {
        len: u16,
        valid_mid: bool,
    }

    impl MessageBus for FixedBus {
        fn publish(&mut self, _words: &[u32]) -> Result<(), BusError> {
            Ok(())
        }
        fn packet_byte_len(&self, _words: &[u32]) -> Option<u16> {
            Some(self.len)
        }
        fn is_valid_message_id(&self, _words: &[u32]) -> bool {
            self.valid_mid
        }
        fn inline_command(&self, _words: &[u32]) -> Option<InlineCommand> {
            None
        }
        fn verify_checksum(&self, _words: &[u32]) -> bool {
            true
        }
    }

    fn push_entry(buf: &mut Vec<u32>, relative_delta: u32, packet_words: usize) {
        buf.push(relative_delta);
        buf.extend(std::iter::repeat(0u32).take(packet_words));
    }

    #[test]
    fn all_zero_buffer_is_ok_empty() {
        let bus = FixedBus { len: 8, valid_mid: true };
        let words = vec![0u32; 3];
        let ok = validate_rts(&words, &bus).unwrap();
        assert_eq!(ok.entry_count, 0);
        assert_eq!(ok.words_used, 0);
    }

    #[test]
    fn single_entry_validates() {
        let bus = FixedBus { len: 8, valid_mid: true };
        let mut words = Vec::new();
        push_entry(&mut words, 0, 2);
        words.extend([0u32; 3]);
        let ok = validate_rts(&words, &bus).unwrap();
        assert_eq!(ok.entry_count, 1);
        assert_eq!(ok.words_used, 3);
    }

    #[test]
    fn invalid_message_id_with_nonzero_delta_fails() {
        let bus = FixedBus { len: 8, valid_mid: false };
        let mut words = Vec::new();
        push_entry(&mut words, 5, 2);
        assert_eq!(
            validate_rts(&words, &bus),
            Err(RtsVerifyError::InvalidMsgId { word_offset: 0 })
        );
    }

    #[test]
    fn invalid_message_id_with_zero_delta_is_end_of_sequence() {
        let bus = FixedBus { len: 8, valid_mid: false };
        let words: Vec<u32> = vec![0, 0, 0];
        let ok = validate_rts(&words, &bus).unwrap();
        assert_eq!(ok.entry_count, 0);
        assert_eq!(ok.words_used, 0);
    }

    #[test]
    fn trailing_nonzero_data_fails() {
        let bus = FixedBus { len: 8, valid_mid: true };
        let words: Vec<u32> = vec![7];
        assert_eq!(
            validate_rts(&words, &bus),
            Err(RtsVerifyError::TrailingNonzeroData { word_offset: 0 })
        );
    }

    #[test]
    fn command_overrunning_buffer_fails() {
        let bus = FixedBus { len: 64, valid_mid: true };
        let words: Vec<u32> = vec![0, 0, 0];
        assert_eq!(
            validate_rts(&words, &bus),
            Err(RtsVerifyError::CmdOverrunsBuffer { word_offset: 0 })
        );
    }
}
