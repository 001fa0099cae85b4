//! The engine's error enumeration (spec.md §7).
//!
//! Validators and Append return a richer per-operation error carrying a
//! diagnostic word offset (spec.md §4.1 rationale: "a specific failure
//! kind with a diagnostic offset"); [`EngineError`] is the coarse,
//! offset-free kind spec.md §7 says is "surfaced via the event sink" —
//! every rich error maps onto exactly one `EngineError` variant via
//! `From`. Nothing in `sc_core` panics on a value derived from ground or
//! table input; these types are how failure is always returned instead.

use thiserror::Error;

/// Failure kinds returned by the ATS/Append validator (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AtsVerifyError {
    /// The table contained zero entries.
    #[error("VERIFY_ATS_EMPTY: table has no entries")]
    Empty,
    /// A command number fell outside `[1..MaxAtsCmds]`.
    #[error("VERIFY_ATS_NUM: invalid command number at word offset {word_offset}")]
    InvalidCmdNumber {
        /// Word offset of the offending entry.
        word_offset: u16,
    },
    /// A packet's embedded byte length fell outside `[PacketMinSize..PacketMaxSize]`.
    #[error("VERIFY_ATS_PKT: invalid packet length at word offset {word_offset}")]
    PacketLengthInvalid {
        /// Word offset of the offending entry.
        word_offset: u16,
    },
    /// An entry's word length would run past the end of the buffer.
    #[error("VERIFY_ATS_BUF: entry at word offset {word_offset} overruns the buffer")]
    PacketOverrunsBuffer {
        /// Word offset of the offending entry.
        word_offset: u16,
    },
    /// Two entries shared the same command number.
    #[error("VERIFY_ATS_DUP: duplicate command number {cmd_number} at word offset {word_offset}")]
    DuplicateCmdNumber {
        /// The duplicated command number.
        cmd_number: u16,
        /// Word offset of the second occurrence.
        word_offset: u16,
    },
    /// The buffer ran out before a terminator or a full minimum-size entry.
    #[error("VERIFY_ATS_END: buffer exhausted before a terminating entry")]
    BufferFullBeforeMinEntry,
}

impl From<AtsVerifyError> for EngineError {
    fn from(e: AtsVerifyError) -> Self {
        match e {
            AtsVerifyError::Empty => EngineError::VerifyAtsEmpty,
            AtsVerifyError::InvalidCmdNumber { .. } => EngineError::VerifyAtsNum,
            AtsVerifyError::PacketLengthInvalid { .. } => EngineError::VerifyAtsPkt,
            AtsVerifyError::PacketOverrunsBuffer { .. } => EngineError::VerifyAtsBuf,
            AtsVerifyError::DuplicateCmdNumber { .. } => EngineError::VerifyAtsDup,
            AtsVerifyError::BufferFullBeforeMinEntry => EngineError::VerifyAtsEnd,
        }
    }
}

/// Failure kinds returned by the RTS validator (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RtsVerifyError {
    /// A non-terminating entry's message-id was not bus-valid.
    #[error("VERIFY_RTS_MID: invalid message id at word offset {word_offset}")]
    InvalidMsgId {
        /// Word offset of the offending entry.
        word_offset: u16,
    },
    /// A packet's embedded byte length fell outside the legal range.
    #[error("VERIFY_RTS_LEN: invalid command length at word offset {word_offset}")]
    CmdLengthInvalid {
        /// Word offset of the offending entry.
        word_offset: u16,
    },
    /// An entry's word length would run past the end of the buffer.
    #[error("VERIFY_RTS_BUF_OVERRUN: entry at word offset {word_offset} overruns the buffer")]
    CmdOverrunsBuffer {
        /// Word offset of the offending entry.
        word_offset: u16,
    },
    /// Words remained after the terminator and were non-zero.
    #[error("VERIFY_RTS_TRAILING: non-zero trailing data at word offset {word_offset}")]
    TrailingNonzeroData {
        /// Word offset of the offending word.
        word_offset: u16,
    },
}

impl From<RtsVerifyError> for EngineError {
    fn from(e: RtsVerifyError) -> Self {
        match e {
            RtsVerifyError::InvalidMsgId { .. } => EngineError::VerifyRtsMid,
            RtsVerifyError::CmdLengthInvalid { .. } => EngineError::VerifyRtsLen,
            RtsVerifyError::CmdOverrunsBuffer { .. } => EngineError::VerifyRtsBufOverrun,
            RtsVerifyError::TrailingNonzeroData { .. } => EngineError::VerifyRtsTrailing,
        }
    }
}

/// Failure kinds returned by Append (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AppendError {
    /// An id/target argument was invalid.
    #[error("APPEND_INVALID_ARG: {0}")]
    InvalidArg(&'static str),
    /// The target ATS has no commands loaded.
    #[error("APPEND_TARGET_EMPTY: target ATS is empty")]
    TargetEmpty,
    /// The Append source table has no commands loaded.
    #[error("APPEND_SOURCE_EMPTY: source table is empty")]
    SourceEmpty,
    /// Target size plus source word count would exceed `AtsBufferSize`.
    #[error("APPEND_NO_ROOM: target + source would exceed the ATS buffer")]
    NoRoom,
}

impl From<AppendError> for EngineError {
    fn from(e: AppendError) -> Self {
        match e {
            AppendError::InvalidArg(_) => EngineError::AppendInvalidArg,
            AppendError::TargetEmpty => EngineError::AppendTargetEmpty,
            AppendError::SourceEmpty => EngineError::AppendSourceEmpty,
            AppendError::NoRoom => EngineError::AppendNoRoom,
        }
    }
}

/// Engine-level error kinds surfaced via the event sink (spec.md §7, plus
/// the MANAGE/UNKNOWN_MID/UNKNOWN_CC additions of SPEC_FULL.md §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EngineError {
    /// An ATS id argument was out of range.
    #[error("INVALID_ATS_ID")]
    InvalidAtsId,
    /// An RTS id argument was out of range.
    #[error("INVALID_RTS_ID")]
    InvalidRtsId,
    /// The targeted ATS has no commands loaded.
    #[error("ATS_NOT_LOADED")]
    AtsNotLoaded,
    /// The targeted RTS is not LOADED, or already EXECUTING.
    #[error("RTS_NOT_LOADED_OR_IN_USE")]
    RtsNotLoadedOrInUse,
    /// Start was issued while the ATP was not IDLE.
    #[error("ATP_NOT_IDLE")]
    AtpNotIdle,
    /// Start was issued against a disabled RTS.
    #[error("RTS_DISABLED")]
    RtsDisabled,
    /// The RTS's first entry has an out-of-range packet length.
    #[error("RTS_FIRST_CMD_LEN_INVALID")]
    RtsFirstCmdLenInvalid,
    /// Checksum verification of an ATS entry's packet failed.
    #[error("ATS_CHECKSUM_FAILED")]
    AtsChecksumFailed,
    /// Checksum verification of an RTS entry's packet failed.
    #[error("RTS_CHECKSUM_FAILED")]
    RtsChecksumFailed,
    /// The entry at `cmd_offset[cn]` did not itself carry command number `cn`.
    #[error("ATS_CMD_NUMBER_MISMATCH")]
    AtsCmdNumberMismatch,
    /// The command's status was not `Loaded` at dispatch time.
    #[error("ATS_CMD_STATUS_INVALID")]
    AtsCmdStatusInvalid,
    /// Bus publish of an ATS command failed.
    #[error("ATS_PUBLISH_FAILED")]
    AtsPublishFailed,
    /// Bus publish of an RTS command failed.
    #[error("RTS_PUBLISH_FAILED")]
    RtsPublishFailed,
    /// Every command in the ATS ended up SKIPPED.
    #[error("ALL_CMDS_SKIPPED")]
    AllCmdsSkipped,
    /// A Jump found no entry beyond the target time.
    #[error("JUMP_PAST_END")]
    JumpPastEnd,
    /// Append's id/target argument was invalid.
    #[error("APPEND_INVALID_ARG")]
    AppendInvalidArg,
    /// Append's target ATS was empty.
    #[error("APPEND_TARGET_EMPTY")]
    AppendTargetEmpty,
    /// Append's source table was empty.
    #[error("APPEND_SOURCE_EMPTY")]
    AppendSourceEmpty,
    /// Append's target had no room for the source.
    #[error("APPEND_NO_ROOM")]
    AppendNoRoom,
    /// ATS/Append table validation failures (see [`AtsVerifyError`]).
    #[error("VERIFY_ATS_EMPTY")]
    VerifyAtsEmpty,
    /// See [`AtsVerifyError::InvalidCmdNumber`].
    #[error("VERIFY_ATS_NUM")]
    VerifyAtsNum,
    /// See [`AtsVerifyError::BufferFullBeforeMinEntry`].
    #[error("VERIFY_ATS_END")]
    VerifyAtsEnd,
    /// See [`AtsVerifyError::PacketLengthInvalid`].
    #[error("VERIFY_ATS_PKT")]
    VerifyAtsPkt,
    /// See [`AtsVerifyError::PacketOverrunsBuffer`].
    #[error("VERIFY_ATS_BUF")]
    VerifyAtsBuf,
    /// See [`AtsVerifyError::DuplicateCmdNumber`].
    #[error("VERIFY_ATS_DUP")]
    VerifyAtsDup,
    /// See [`RtsVerifyError::InvalidMsgId`].
    #[error("VERIFY_RTS_MID")]
    VerifyRtsMid,
    /// See [`RtsVerifyError::CmdLengthInvalid`].
    #[error("VERIFY_RTS_LEN")]
    VerifyRtsLen,
    /// See [`RtsVerifyError::CmdOverrunsBuffer`].
    #[error("VERIFY_RTS_BUF_OVERRUN")]
    VerifyRtsBufOverrun,
    /// See [`RtsVerifyError::TrailingNonzeroData`].
    #[error("VERIFY_RTS_TRAILING")]
    VerifyRtsTrailing,
    /// Unknown inbound message id.
    #[error("UNKNOWN_MID")]
    UnknownMid,
    /// Unknown command code for a known message id.
    #[error("UNKNOWN_CC")]
    UnknownCc,
    /// `MANAGE_TABLE` referenced an id outside the known table-id space.
    #[error("MANAGE_UNKNOWN_TBL")]
    ManageUnknownTable,
}
