//! The thin command dispatcher (spec.md §1, §4.9).
//!
//! Deliberately outside `sc_core`: demultiplexes an inbound [`RawMessage`]
//! by message-id, then a command packet further by its own embedded
//! command-code, checks the packet's word length against what that code
//! expects, and calls exactly one `Engine` method. No core state lives
//! here; `Dispatcher` only owns the `Engine` plus the adapters it needs to
//! hand down.

use sc_common::bus::{EventSink, MessageBus, RawMessage, TableService};
use sc_common::config::DeploymentConfig;
use sc_common::error::EngineError;
use sc_common::time::Tick;
use sc_core::engine::Engine;

/// Command codes routed by the dispatcher (spec.md §6). Values are the
/// order they're listed in spec.md, matching `sc_dispatch.c`'s switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandCode {
    Noop,
    ResetCounters,
    StartAts,
    StopAts,
    StartRts,
    StopRts,
    EnableRts,
    DisableRts,
    SwitchAts,
    JumpAts,
    ContinueAtsOnFailure,
    AppendAts,
    ManageTable,
    StartRtsGrp,
    StopRtsGrp,
    EnableRtsGrp,
    DisableRtsGrp,
}

impl CommandCode {
    /// Decode a raw command-code value. `None` for anything the dispatcher
    /// doesn't recognize.
    pub const fn from_u16(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(Self::Noop),
            1 => Some(Self::ResetCounters),
            2 => Some(Self::StartAts),
            3 => Some(Self::StopAts),
            4 => Some(Self::StartRts),
            5 => Some(Self::StopRts),
            6 => Some(Self::EnableRts),
            7 => Some(Self::DisableRts),
            8 => Some(Self::SwitchAts),
            9 => Some(Self::JumpAts),
            10 => Some(Self::ContinueAtsOnFailure),
            11 => Some(Self::AppendAts),
            12 => Some(Self::ManageTable),
            13 => Some(Self::StartRtsGrp),
            14 => Some(Self::StopRtsGrp),
            15 => Some(Self::EnableRtsGrp),
            16 => Some(Self::DisableRtsGrp),
            _ => None,
        }
    }

    /// Word length the packet must have for this code: one header word,
    /// plus one argument word for every code but the four that carry no
    /// argument (spec.md §4.9: "packet-length mismatch... rejected before
    /// the core operation is invoked").
    pub const fn expected_words(self) -> usize {
        match self {
            Self::Noop | Self::ResetCounters | Self::StopAts | Self::SwitchAts => 1,
            _ => 2,
        }
    }

    /// Raw wire value, the inverse of [`Self::from_u16`].
    pub const fn as_u16(self) -> u16 {
        match self {
            Self::Noop => 0,
            Self::ResetCounters => 1,
            Self::StartAts => 2,
            Self::StopAts => 3,
            Self::StartRts => 4,
            Self::StopRts => 5,
            Self::EnableRts => 6,
            Self::DisableRts => 7,
            Self::SwitchAts => 8,
            Self::JumpAts => 9,
            Self::ContinueAtsOnFailure => 10,
            Self::AppendAts => 11,
            Self::ManageTable => 12,
            Self::StartRtsGrp => 13,
            Self::StopRtsGrp => 14,
            Self::EnableRtsGrp => 15,
            Self::DisableRtsGrp => 16,
        }
    }
}

/// Split a `first`/`last` pair out of one word, high-then-low, matching
/// [`sc_common::wire::AtsEntryHeader`]'s time-tag convention.
fn split_pair(word: u32) -> (u16, u16) {
    (((word >> 16) & 0xFFFF) as u16, (word & 0xFFFF) as u16)
}

/// Routes one already-demultiplexed inbound message to an `Engine` method.
pub struct Dispatcher<'a> {
    pub engine: &'a mut Engine,
    pub config: &'a DeploymentConfig,
}

impl<'a> Dispatcher<'a> {
    /// Handle one [`RawMessage`] off the command pipe (spec.md §4.9).
    pub fn handle(
        &mut self,
        msg: RawMessage,
        bus: &mut dyn MessageBus,
        table_service: &mut dyn TableService,
        sink: &mut dyn EventSink,
        now: Tick,
    ) {
        if msg.message_id == self.config.wakeup_mid {
            self.engine.tick(bus, sink, now);
        } else if msg.message_id == self.config.housekeeping_request_mid {
            self.engine.handle_housekeeping_request(bus, now);
        } else if msg.message_id == self.config.command_pipe_mid {
            self.handle_command(&msg.words, bus, table_service, sink, now);
        } else {
            tracing::warn!("unknown command pipe message id: {}", msg.message_id);
            self.engine.reject_dispatch(sink, EngineError::UnknownMid);
        }
    }

    fn handle_command(
        &mut self,
        words: &[u32],
        bus: &mut dyn MessageBus,
        table_service: &mut dyn TableService,
        sink: &mut dyn EventSink,
        now: Tick,
    ) {
        let Some(&header) = words.first() else {
            tracing::warn!("empty command packet");
            self.engine.reject_dispatch(sink, EngineError::UnknownCc);
            return;
        };
        let Some(code) = CommandCode::from_u16((header & 0xFFFF) as u16) else {
            tracing::warn!("unknown command code: {}", header & 0xFFFF);
            self.engine.reject_dispatch(sink, EngineError::UnknownCc);
            return;
        };
        if words.len() != code.expected_words() {
            tracing::warn!(
                "command length mismatch for {:?}: got {} words, expected {}",
                code,
                words.len(),
                code.expected_words()
            );
            self.engine.reject_dispatch(sink, EngineError::UnknownCc);
            return;
        }
        let arg = words.get(1).copied().unwrap_or(0);

        let result = match code {
            CommandCode::Noop => {
                self.engine.noop(sink);
                Ok(())
            }
            CommandCode::ResetCounters => {
                self.engine.reset_counters(sink);
                Ok(())
            }
            CommandCode::StartAts => self.engine.start_ats(arg as u16, sink),
            CommandCode::StopAts => self.engine.stop_ats(sink),
            CommandCode::StartRts => self.engine.start_rts(arg as u16, bus, now, sink),
            CommandCode::StopRts => self.engine.stop_rts(arg as u16, sink),
            CommandCode::EnableRts => self.engine.enable_rts(arg as u16, sink),
            CommandCode::DisableRts => self.engine.disable_rts(arg as u16, sink),
            CommandCode::SwitchAts => self.engine.switch_ats(sink),
            CommandCode::JumpAts => self.engine.jump_ats(arg, sink),
            CommandCode::ContinueAtsOnFailure => {
                self.engine.set_continue_ats_on_failure((arg & 0xFFFF) != 0);
                Ok(())
            }
            CommandCode::AppendAts => self.engine.append_ats(arg as u16, bus, now, sink),
            CommandCode::ManageTable => self.engine.manage_table(arg as i32, table_service, bus, sink),
            CommandCode::StartRtsGrp => {
                let (first, last) = split_pair(arg);
                self.engine.start_rts_group(first, last, bus, now, sink)
            }
            CommandCode::StopRtsGrp => {
                let (first, last) = split_pair(arg);
                self.engine.stop_rts_group(first, last, sink)
            }
            CommandCode::EnableRtsGrp => {
                let (first, last) = split_pair(arg);
                self.engine.enable_rts_group(first, last, sink)
            }
            CommandCode::DisableRtsGrp => {
                let (first, last) = split_pair(arg);
                self.engine.disable_rts_group(first, last, sink)
            }
        };

        if let Err(err) = result {
            tracing::warn!("command {:?} rejected: {}", code, err);
        }
    }
}
