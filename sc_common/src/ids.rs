//! Typed identifiers (spec.md §3, §9 "Raw pointer mirror tables → arena+index").
//!
//! ATS-id, RTS-id, command-number and entry-offset are distinct semantic
//! types even though all four are backed by `u16`. Keeping them as
//! newtypes with explicit `as_u16`/`from_u16` conversions (mirroring the
//! source's `IDNUM` macros) prevents accidentally indexing a command
//! table with an ATS id or vice versa.

use crate::limits::{MAX_ATS_CMDS, NUM_ATS, NUM_RTS};

/// 1-based identifier of an ATS slot. `0` is the reserved NULL value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtsId(u16);

impl AtsId {
    /// The reserved "no ATS" value.
    pub const NULL: Self = Self(0);

    /// Construct from a raw 1-based value, rejecting 0 and anything past
    /// `NUM_ATS`.
    pub const fn new(raw: u16) -> Option<Self> {
        if raw == 0 || raw as usize > NUM_ATS {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Raw 1-based value, explicit by construction (never implicit `From`).
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// 0-based index into a `[T; NUM_ATS]` array. Panics on `NULL`; callers
    /// must check `is_null()` first, matching the source's assumption that
    /// NULL is never used to index a table.
    pub const fn index(self) -> usize {
        self.0 as usize - 1
    }

    /// True when this is the reserved NULL id.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// The other ATS id, for the two-buffer switch protocol. Only
    /// meaningful when `NUM_ATS == 2`.
    pub const fn other(self) -> Self {
        debug_assert!(NUM_ATS == 2);
        match self.0 {
            1 => Self(2),
            2 => Self(1),
            _ => Self::NULL,
        }
    }
}

/// 1-based identifier of an RTS slot. `0` is the reserved NULL value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RtsId(u16);

impl RtsId {
    /// The reserved "no RTS" value.
    pub const NULL: Self = Self(0);

    /// Construct from a raw 1-based value, rejecting 0 and anything past
    /// `NUM_RTS`.
    pub const fn new(raw: u16) -> Option<Self> {
        if raw == 0 || raw as usize > NUM_RTS {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Raw 1-based value.
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// 0-based index into a `[T; NUM_RTS]` array.
    pub const fn index(self) -> usize {
        self.0 as usize - 1
    }

    /// True when this is the reserved NULL id.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// 1-based command number within a single ATS, in `[1..=MAX_ATS_CMDS]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CmdNum(u16);

impl CmdNum {
    /// The reserved "no command" value (also the ATS-entry terminator).
    pub const NULL: Self = Self(0);

    /// Construct from a raw 1-based value, rejecting 0 and anything past
    /// `MAX_ATS_CMDS`.
    pub const fn new(raw: u16) -> Option<Self> {
        if raw == 0 || raw as usize > MAX_ATS_CMDS {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Raw 1-based value.
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// 0-based index into a `[T; MAX_ATS_CMDS]` array.
    pub const fn index(self) -> usize {
        self.0 as usize - 1
    }

    /// True when this is the reserved NULL value / entry terminator.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// 0-based word offset into an ATS or RTS buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryOffset(u16);

impl EntryOffset {
    /// Offset zero — the first word of a buffer.
    pub const ZERO: Self = Self(0);

    /// Construct from a raw 0-based word offset.
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Raw word offset.
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Raw word offset as `usize`, for array indexing.
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Byte offset (4x word offset), per spec.md §3.
    pub const fn as_byte_offset(self) -> u32 {
        self.0 as u32 * 4
    }

    /// Offset advanced by `words` words.
    pub const fn advance(self, words: u16) -> Self {
        Self(self.0 + words)
    }
}

/// Marker for "no offset recorded" in `cmd_offset` tables.
pub const NONE_OFFSET: Option<EntryOffset> = None;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ats_id_null_and_range() {
        assert!(AtsId::NULL.is_null());
        assert_eq!(AtsId::new(0), None);
        assert_eq!(AtsId::new(1).unwrap().as_u16(), 1);
        assert_eq!(AtsId::new(NUM_ATS as u16).unwrap().index(), NUM_ATS - 1);
        assert_eq!(AtsId::new(NUM_ATS as u16 + 1), None);
    }

    #[test]
    fn ats_id_other_swaps_between_two_buffers() {
        let a = AtsId::new(1).unwrap();
        let b = AtsId::new(2).unwrap();
        assert_eq!(a.other(), b);
        assert_eq!(b.other(), a);
    }

    #[test]
    fn cmd_num_range() {
        assert!(CmdNum::NULL.is_null());
        assert_eq!(CmdNum::new(0), None);
        assert_eq!(CmdNum::new(1).unwrap().index(), 0);
        assert_eq!(
            CmdNum::new(MAX_ATS_CMDS as u16).unwrap().index(),
            MAX_ATS_CMDS - 1
        );
        assert_eq!(CmdNum::new(MAX_ATS_CMDS as u16 + 1), None);
    }

    #[test]
    fn entry_offset_byte_conversion() {
        let off = EntryOffset::new(5);
        assert_eq!(off.as_byte_offset(), 20);
        assert_eq!(off.advance(3).as_u16(), 8);
    }

    #[test]
    fn rts_id_range() {
        assert_eq!(RtsId::new(0), None);
        assert_eq!(RtsId::new(1).unwrap().index(), 0);
        assert_eq!(RtsId::new(NUM_RTS as u16).unwrap().index(), NUM_RTS - 1);
        assert_eq!(RtsId::new(NUM_RTS as u16 + 1), None);
    }
}
