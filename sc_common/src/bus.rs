//! Collaborator traits for the message bus, event sink and table service
//! (spec.md §1, §2, §5, §6) — the external systems `sc_core` consumes but
//! does not implement. Grounded in the teacher's pluggable-driver pattern
//! (`evo_common::hal::driver::HalDriver`): one trait per collaborator, a
//! `thiserror` error type, `sc_app` supplies the concrete adapter.

use thiserror::Error;

use crate::error::EngineError;
use crate::ids::{AtsId, RtsId};

/// Error returned by [`MessageBus::publish`].
#[derive(Debug, Clone, Error)]
pub enum BusError {
    /// The transport rejected the publish (queue full, subscriber gone, ...).
    #[error("publish failed: {0}")]
    PublishFailed(String),
}

/// A self-addressed command embedded in a sequence, recognized before
/// publish so the ATP can service it inline (spec.md §4.6 "Inline
/// switch").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineCommand {
    /// `SWITCH_ATS` addressed to the engine's own message id.
    SwitchAts,
}

/// The publish/subscribe transport (spec.md §1: "the message-bus
/// transport" is an external collaborator). `sc_core` never serializes or
/// deserializes packets itself — it hands over the word-addressed slice
/// that starts right after an entry's own header and asks the bus to
/// interpret it.
pub trait MessageBus {
    /// Publish a pre-formed command packet (the bytes starting after the
    /// entry header) onto the bus.
    fn publish(&mut self, words: &[u32]) -> Result<(), BusError>;

    /// The packet's own self-described byte length, read from its
    /// embedded header (spec.md §6: "the engine never hardcodes it").
    /// `None` means the bus could not find a valid header.
    fn packet_byte_len(&self, words: &[u32]) -> Option<u16>;

    /// True if the packet's message id is one the bus recognizes as
    /// routable (spec.md §4.2: "bus-valid message-id").
    fn is_valid_message_id(&self, words: &[u32]) -> bool;

    /// Recognize a self-addressed inline command, e.g. an embedded
    /// `SWITCH_ATS` (spec.md §4.6).
    fn inline_command(&self, words: &[u32]) -> Option<InlineCommand>;

    /// Verify the packet's pre-computed checksum. Only consulted when the
    /// engine's `verify_checksums` configuration is enabled (spec.md §9:
    /// "a simple bool... its scope is checksum failures only").
    fn verify_checksum(&self, words: &[u32]) -> bool;
}

/// Where the last error on an ATS or RTS occurred, for housekeeping
/// (spec.md §9: "the source updates a 'last error sequence' field... using
/// the ATS id"/"using the RTS id" — store the *id*, not the command
/// number; this type exists to make that choice unambiguous at the call
/// site rather than implicit in an untyped integer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceRef {
    /// No error recorded yet.
    #[default]
    None,
    /// Error occurred on this ATS.
    Ats(AtsId),
    /// Error occurred on this RTS.
    Rts(RtsId),
}

/// One event the engine reports through the [`EventSink`]. Error events
/// carry the abstract [`EngineError`] kind plus which sequence (if any)
/// it occurred on; informational events report successful completions and
/// transitions that ground control needs to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// A recoverable or fatal-to-the-sequence error occurred.
    Error {
        /// The error kind.
        kind: EngineError,
        /// Which sequence it occurred on, if any.
        sequence: SequenceRef,
    },
    /// An ATS ran its last entry and returned to IDLE.
    AtsComplete(AtsId),
    /// A switch or Jump left every entry SKIPPED; the ATS auto-completed.
    AllSkipped(AtsId),
    /// A ground or inline switch was serviced.
    SwitchServiced {
        /// Outgoing ATS id.
        from: AtsId,
        /// Incoming ATS id.
        to: AtsId,
    },
    /// An RTS ran its last entry and returned to LOADED.
    RtsComplete(RtsId),
    /// A group RTS operation's summary (spec.md §4.7 "Group operations").
    GroupOpSummary {
        /// Number of slots actually affected.
        modified: u16,
    },
    /// `NOOP` was processed.
    Noop,
    /// `RESET_COUNTERS` was processed.
    CountersReset,
}

/// The event/log sink (spec.md §1: external collaborator). `sc_core`
/// reports through this trait; it never formats a ground-facing message
/// itself.
pub trait EventSink {
    /// Record one engine event.
    fn emit(&mut self, event: EngineEvent);
}

/// Dense table-id space for `MANAGE_TABLE` (spec.md §6). Conversion to and
/// from the raw wire value is explicit, matching the identifier
/// conventions of [`crate::ids`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableId {
    /// One of the `NUM_ATS` ATS buffers.
    Ats(AtsId),
    /// One of the `NUM_RTS` RTS buffers.
    Rts(RtsId),
    /// One ATS's `cmd_status` dump-only mirror.
    AtsCmdStatus(AtsId),
    /// The Append buffer.
    Append,
    /// ATS info/summary dump-only mirror.
    AtsInfo,
    /// RTS info/summary dump-only mirror.
    RtsInfo,
    /// ATP control-block dump-only mirror.
    AtpCtrl,
    /// RTP control-block dump-only mirror.
    RtpCtrl,
}

impl TableId {
    const ATS_CMD_STATUS_BASE: i32 = 1000;
    const APPEND: i32 = 2000;
    const ATS_INFO: i32 = 2001;
    const RTS_INFO: i32 = 2002;
    const ATP_CTRL: i32 = 2003;
    const RTP_CTRL: i32 = 2004;

    /// Decode a raw `MANAGE_TABLE` table id. `None` for anything outside
    /// the known ranges (spec.md §6: "Unknown ids produce an error
    /// event").
    pub fn from_raw(raw: i32) -> Option<Self> {
        use crate::limits::{NUM_ATS, NUM_RTS};
        if (0..NUM_ATS as i32).contains(&raw) {
            return AtsId::new(raw as u16 + 1).map(TableId::Ats);
        }
        if (100..100 + NUM_RTS as i32).contains(&raw) {
            return RtsId::new((raw - 100) as u16 + 1).map(TableId::Rts);
        }
        if (Self::ATS_CMD_STATUS_BASE..Self::ATS_CMD_STATUS_BASE + NUM_ATS as i32).contains(&raw) {
            return AtsId::new((raw - Self::ATS_CMD_STATUS_BASE) as u16 + 1)
                .map(TableId::AtsCmdStatus);
        }
        match raw {
            v if v == Self::APPEND => Some(TableId::Append),
            v if v == Self::ATS_INFO => Some(TableId::AtsInfo),
            v if v == Self::RTS_INFO => Some(TableId::RtsInfo),
            v if v == Self::ATP_CTRL => Some(TableId::AtpCtrl),
            v if v == Self::RTP_CTRL => Some(TableId::RtpCtrl),
            _ => None,
        }
    }

    /// Raw wire value for this table id.
    pub fn as_raw(self) -> i32 {
        match self {
            TableId::Ats(id) => id.as_u16() as i32 - 1,
            TableId::Rts(id) => 100 + id.as_u16() as i32 - 1,
            TableId::AtsCmdStatus(id) => Self::ATS_CMD_STATUS_BASE + id.as_u16() as i32 - 1,
            TableId::Append => Self::APPEND,
            TableId::AtsInfo => Self::ATS_INFO,
            TableId::RtsInfo => Self::RTS_INFO,
            TableId::AtpCtrl => Self::ATP_CTRL,
            TableId::RtpCtrl => Self::RTP_CTRL,
        }
    }
}

/// The two-phase release/manage/reacquire protocol (spec.md §5, §9).
/// `sc_core` exclusively owns the parsed auxiliary tables; the raw word
/// buffers are shared with this external service.
pub trait TableService {
    /// Release the engine's claim on `table` so the service may update it.
    fn release(&mut self, table: TableId);

    /// Reacquire the engine's claim on `table`. Returns `true` if the
    /// service actually updated the underlying buffer while it was
    /// released, signaling that the loader/Append-updater must rebuild
    /// auxiliaries for it.
    fn reacquire(&mut self, table: TableId) -> bool;

    /// Fetch the freshly written word buffer after a `reacquire` reports an
    /// update. Only called when `reacquire` returned `true`; the table's
    /// backing memory lives outside `sc_core`, so this is how the updated
    /// contents actually cross the boundary.
    fn take_buffer(&mut self, table: TableId) -> Vec<u32>;
}

/// One message pulled off the command pipe, still addressed by its raw
/// message-id (spec.md §4.9 "Routes by (message-id, command-code)"). The
/// thin dispatcher — not this crate — decides whether `message_id` is the
/// command-pipe, housekeeping-request or wakeup id, or unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// The message-id the transport delivered this under.
    pub message_id: u16,
    /// The message's own words, starting at its own header.
    pub words: Vec<u32>,
}

/// The blocking-with-timeout command pipe (spec.md §5: "the pipe receive
/// uses a bounded timeout; a timeout is a normal no-op"). `sc_app` supplies
/// the concrete transport; `None` means the timeout elapsed with nothing
/// to do.
pub trait CommandSource {
    /// Wait up to the adapter's configured timeout for the next message.
    fn recv_timeout(&mut self) -> Option<RawMessage>;
}
