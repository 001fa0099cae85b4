//! Absolute-Time Processor state machine (spec.md §4.6).
//!
//! One `Atp` value per engine (there is exactly one ATP; it switches
//! between the two ATS buffers, it does not run them concurrently). Every
//! public method matches one row of the state table in spec.md §4.6;
//! `dispatch_one` is the only one the tick loop calls unconditionally —
//! the rest are the command handlers [`crate::engine::Engine`] calls
//! directly.

use heapless::Vec as HVec;

use sc_common::bus::{EngineEvent, EventSink, InlineCommand, MessageBus, SequenceRef};
use sc_common::error::EngineError;
use sc_common::ids::AtsId;
use sc_common::limits::{MAX_ATS_CMDS, NUM_ATS};
use sc_common::status::{AtpState, CmdStatus};
use sc_common::time::Tick;
use sc_common::wire::AtsEntryHeader;

use crate::housekeeping::Counters;
use crate::tables::AtsTable;
use crate::time_index;

fn packet_tag(table: &AtsTable, cmd_idx: usize) -> Tick {
    let offset = table.cmd_offset[cmd_idx].expect("I1: Loaded entries carry a cmd_offset");
    let start = offset.as_usize();
    AtsEntryHeader::parse(&table.words[start..start + AtsEntryHeader::WORDS]).time_tag
}

fn recompute_next_time(table: &AtsTable, pos: usize) -> Tick {
    match table.time_index.get(pos) {
        Some(&cn) => time_index::time_tag_of(table, cn),
        None => Tick::INFINITE,
    }
}

/// Skip every `Loaded` entry whose time has passed, leaving `Executed`
/// entries untouched, and return the position of the first remaining
/// `Loaded`-and-not-due entry. `None` means every entry ended up
/// non-`Loaded` (all skipped, or already run) — the caller completes to
/// `IDLE` with `ALL_SKIPPED` in that case.
fn resume_from(table: &mut AtsTable, now: Tick) -> Option<usize> {
    let entries: HVec<_, MAX_ATS_CMDS> = table.time_index.clone();
    for (pos, cn) in entries.iter().copied().enumerate() {
        let idx = cn.index();
        if table.cmd_status[idx] != CmdStatus::Loaded {
            continue;
        }
        if packet_tag(table, idx).is_due(now) {
            table.cmd_status[idx] = CmdStatus::Skipped;
        } else {
            return Some(pos);
        }
    }
    None
}

/// The ATP control block.
#[derive(Debug, Clone, Copy)]
pub struct Atp {
    state: AtpState,
    current: Option<AtsId>,
    pos: usize,
    next_time: Tick,
    switch_pending: bool,
    last_error: SequenceRef,
}

impl Default for Atp {
    fn default() -> Self {
        Self {
            state: AtpState::Idle,
            current: None,
            pos: 0,
            next_time: Tick::INFINITE,
            switch_pending: false,
            last_error: SequenceRef::None,
        }
    }
}

impl Atp {
    /// A freshly power-on ATP: IDLE, nothing selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> AtpState {
        self.state
    }

    /// The ATS currently selected, if any.
    pub fn current(&self) -> Option<AtsId> {
        self.current
    }

    /// Absolute time the next dispatch is due.
    pub fn next_time(&self) -> Tick {
        self.next_time
    }

    /// Sequence the last ATP-side error occurred on.
    pub fn last_error(&self) -> SequenceRef {
        self.last_error
    }

    /// `true` if the tick loop should call [`Self::dispatch_one`].
    pub fn is_due(&self, now: Tick) -> bool {
        self.state == AtpState::Executing && self.next_time.is_due(now)
    }

    fn complete(&mut self, sink: &mut dyn EventSink, id: AtsId) {
        self.state = AtpState::Idle;
        self.current = None;
        self.pos = 0;
        self.next_time = Tick::INFINITE;
        tracing::info!("ATS {:?} ran to completion", id);
        sink.emit(EngineEvent::AtsComplete(id));
    }

    fn all_skipped(&mut self, sink: &mut dyn EventSink, id: AtsId) {
        self.state = AtpState::Idle;
        self.current = None;
        self.pos = 0;
        self.next_time = Tick::INFINITE;
        tracing::warn!("ATS {:?} completed with every entry skipped", id);
        sink.emit(EngineEvent::AllSkipped(id));
    }

    fn abort(&mut self, sink: &mut dyn EventSink, id: AtsId, kind: EngineError) {
        self.last_error = SequenceRef::Ats(id);
        tracing::warn!("ATS {:?} aborted: {}", id, kind);
        sink.emit(EngineEvent::Error {
            kind,
            sequence: SequenceRef::Ats(id),
        });
        self.state = AtpState::Idle;
        self.current = None;
        self.pos = 0;
        self.next_time = Tick::INFINITE;
    }

    fn advance(&mut self, table: &AtsTable, sink: &mut dyn EventSink, id: AtsId) {
        self.pos += 1;
        if self.pos >= table.time_index.len() {
            self.complete(sink, id);
        } else {
            self.next_time = recompute_next_time(table, self.pos);
        }
    }

    /// **Start** (spec.md §4.6): requires `IDLE` and a non-empty target.
    pub fn start(&mut self, id: AtsId, tables: &[AtsTable; NUM_ATS]) -> Result<(), EngineError> {
        if self.state != AtpState::Idle {
            return Err(EngineError::AtpNotIdle);
        }
        let table = &tables[id.index()];
        if table.is_empty() {
            return Err(EngineError::AtsNotLoaded);
        }
        self.current = Some(id);
        self.pos = 0;
        self.next_time = recompute_next_time(table, 0);
        self.state = AtpState::Executing;
        Ok(())
    }

    /// **Stop** (spec.md §4.6): EXECUTING → IDLE, clears current-ats.
    pub fn stop(&mut self) {
        self.state = AtpState::Idle;
        self.current = None;
        self.pos = 0;
        self.next_time = Tick::INFINITE;
    }

    /// Request a ground switch: serviced at the top of the next tick
    /// (spec.md §4.6 "Switch protocol... Ground switch sets
    /// switch_pending_flag").
    pub fn request_switch(&mut self) -> Result<(), EngineError> {
        if self.state != AtpState::Executing {
            return Err(EngineError::AtpNotIdle);
        }
        self.switch_pending = true;
        Ok(())
    }

    /// Service a pending ground switch, if any. Called at the top of every
    /// tick, before any dispatch.
    pub fn service_pending_switch(
        &mut self,
        tables: &mut [AtsTable; NUM_ATS],
        sink: &mut dyn EventSink,
        now: Tick,
    ) {
        if self.switch_pending {
            self.switch_pending = false;
            let _ = self.switch(tables, sink, now);
        }
    }

    /// Inline switch: a `SWITCH_ATS` command embedded in the currently
    /// dispatching entry (spec.md §4.6 "Inline switch... swaps immediately
    /// within the current dispatch step").
    pub fn inline_switch(
        &mut self,
        tables: &mut [AtsTable; NUM_ATS],
        sink: &mut dyn EventSink,
        now: Tick,
    ) -> Result<(AtsId, AtsId), EngineError> {
        self.switch(tables, sink, now)
    }

    fn switch(
        &mut self,
        tables: &mut [AtsTable; NUM_ATS],
        sink: &mut dyn EventSink,
        now: Tick,
    ) -> Result<(AtsId, AtsId), EngineError> {
        let from = self.current.ok_or(EngineError::AtpNotIdle)?;
        let to = from.other();
        if tables[to.index()].is_empty() {
            return Err(EngineError::AtsNotLoaded);
        }
        self.state = AtpState::Starting;
        let to_table = &mut tables[to.index()];
        match resume_from(to_table, now) {
            Some(pos) => {
                self.current = Some(to);
                self.pos = pos;
                self.next_time = recompute_next_time(to_table, pos);
                self.state = AtpState::Executing;
                tracing::info!("ATS switch serviced: {:?} -> {:?}", from, to);
                sink.emit(EngineEvent::SwitchServiced { from, to });
                Ok((from, to))
            }
            None => {
                tracing::info!("ATS switch serviced: {:?} -> {:?}", from, to);
                sink.emit(EngineEvent::SwitchServiced { from, to });
                self.all_skipped(sink, to);
                Ok((from, to))
            }
        }
    }

    /// Merge interaction (spec.md §4.5): when Append targets the currently
    /// EXECUTING ATS, it restarts in place at the current clock rather
    /// than switching buffers.
    pub fn restart_in_place(
        &mut self,
        id: AtsId,
        tables: &mut [AtsTable; NUM_ATS],
        sink: &mut dyn EventSink,
        now: Tick,
    ) {
        if self.current != Some(id) {
            return;
        }
        let table = &mut tables[id.index()];
        match resume_from(table, now) {
            Some(pos) => {
                self.pos = pos;
                self.next_time = recompute_next_time(table, pos);
            }
            None => self.all_skipped(sink, id),
        }
    }

    /// **Jump** (spec.md §4.6): skip every `Loaded` entry at or before `t`;
    /// resume at the first entry beyond `t`, preserving the source's
    /// documented quirk of never touching `Executed` entries.
    pub fn jump(
        &mut self,
        t: Tick,
        tables: &mut [AtsTable; NUM_ATS],
        sink: &mut dyn EventSink,
    ) -> Result<(), EngineError> {
        let id = self.current.ok_or(EngineError::AtpNotIdle)?;
        let table = &mut tables[id.index()];
        let entries: HVec<_, MAX_ATS_CMDS> = table.time_index.clone();
        for cn in entries.iter().copied() {
            let idx = cn.index();
            if table.cmd_status[idx] != CmdStatus::Loaded {
                continue;
            }
            if packet_tag(table, idx).0 <= t.0 {
                table.cmd_status[idx] = CmdStatus::Skipped;
            }
        }
        let new_pos = entries
            .iter()
            .position(|&cn| packet_tag(table, cn.index()).0 > t.0);
        match new_pos {
            Some(pos) => {
                self.pos = pos;
                self.next_time = recompute_next_time(table, pos);
                Ok(())
            }
            None => {
                self.abort(sink, id, EngineError::JumpPastEnd);
                Err(EngineError::JumpPastEnd)
            }
        }
    }

    /// **Dispatch** (tick-triggered, spec.md §4.6). Precondition: caller
    /// has already checked [`Self::is_due`].
    pub fn dispatch_one(
        &mut self,
        tables: &mut [AtsTable; NUM_ATS],
        bus: &mut dyn MessageBus,
        sink: &mut dyn EventSink,
        now: Tick,
        verify_checksums: bool,
        continue_on_failure: bool,
        counters: &mut Counters,
    ) {
        let id = match self.current {
            Some(id) => id,
            None => return,
        };
        let table = &mut tables[id.index()];
        let pos = self.pos;
        let cn = match table.time_index.get(pos).copied() {
            Some(cn) => cn,
            None => {
                self.complete(sink, id);
                return;
            }
        };
        let idx = cn.index();

        if table.cmd_status[idx] != CmdStatus::Loaded {
            counters.ats_error_counter += 1;
            tracing::warn!("ATS {:?} entry {:?} has unexpected status {:?}", id, cn, table.cmd_status[idx]);
            sink.emit(EngineEvent::Error {
                kind: EngineError::AtsCmdStatusInvalid,
                sequence: SequenceRef::Ats(id),
            });
            self.advance(table, sink, id);
            return;
        }

        let offset = table.cmd_offset[idx].expect("checked Loaded above");
        let header = AtsEntryHeader::parse(
            &table.words[offset.as_usize()..offset.as_usize() + AtsEntryHeader::WORDS],
        );
        if header.cmd_number != cn.as_u16() {
            table.cmd_status[idx] = CmdStatus::Skipped;
            counters.ats_error_counter += 1;
            self.abort(sink, id, EngineError::AtsCmdNumberMismatch);
            return;
        }

        let packet_start = offset.as_usize() + AtsEntryHeader::WORDS;
        if verify_checksums && !bus.verify_checksum(&table.words[packet_start..]) {
            table.cmd_status[idx] = CmdStatus::FailedChecksum;
            counters.ats_error_counter += 1;
            tracing::warn!("ATS {:?} entry {:?} failed checksum verification", id, cn);
            sink.emit(EngineEvent::Error {
                kind: EngineError::AtsChecksumFailed,
                sequence: SequenceRef::Ats(id),
            });
            if continue_on_failure {
                self.advance(table, sink, id);
            } else {
                self.abort(sink, id, EngineError::AtsChecksumFailed);
            }
            return;
        }

        if let Some(InlineCommand::SwitchAts) = bus.inline_command(&table.words[packet_start..]) {
            match self.inline_switch(tables, sink, now) {
                Ok(_) => {
                    tables[id.index()].cmd_status[idx] = CmdStatus::Executed;
                    counters.ats_cmds_completed += 1;
                }
                Err(_) => {
                    tables[id.index()].cmd_status[idx] = CmdStatus::FailedDistrib;
                    counters.ats_error_counter += 1;
                    self.last_error = SequenceRef::Ats(id);
                    self.advance(&tables[id.index()], sink, id);
                }
            }
            return;
        }

        match bus.publish(&table.words[packet_start..]) {
            Ok(()) => {
                table.cmd_status[idx] = CmdStatus::Executed;
                counters.ats_cmds_completed += 1;
                self.advance(table, sink, id);
            }
            Err(_) => {
                table.cmd_status[idx] = CmdStatus::FailedDistrib;
                counters.ats_error_counter += 1;
                self.abort(sink, id, EngineError::AtsPublishFailed);
            }
        }
    }
}
