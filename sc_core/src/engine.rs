//! The single aggregate engine value (spec.md §9 "Global operational state
//! → single engine value").
//!
//! `Engine` replaces the source's two sprawling globals (`SC_AppData`,
//! `SC_OperData`): every table, the ATP, the RTP and the counters are
//! fields of one value. `sc_app` constructs it once at init and calls one
//! method per inbound command code (spec.md §6) plus [`Engine::tick`] on
//! every one-hertz wakeup.

use sc_common::bus::{EngineEvent, EventSink, MessageBus, SequenceRef, TableId, TableService};
use sc_common::config::DeploymentConfig;
use sc_common::error::EngineError;
use sc_common::ids::{AtsId, RtsId};
use sc_common::status::AtpState;
use sc_common::time::Tick;

use crate::append;
use crate::atp::Atp;
use crate::guard::TableAddressGuard;
use crate::housekeeping::{Counters, HousekeepingSnapshot};
use crate::loader;
use crate::rtp::Rtp;
use crate::tables::{AppendTable, AtsTable, RtsTable};
use crate::tick;
use crate::validate;

use sc_common::limits::{NUM_ATS, NUM_RTS};

/// The engine: every table, the two processors, and the counters.
pub struct Engine {
    ats: [AtsTable; NUM_ATS],
    append_table: AppendTable,
    rts: [RtsTable; NUM_RTS],
    atp: Atp,
    rtp: Rtp,
    counters: Counters,
    continue_ats_on_failure: bool,
    verify_checksums: bool,
}

impl Engine {
    /// Construct a freshly power-on engine from deployment configuration.
    pub fn new(config: &DeploymentConfig) -> Self {
        Self {
            ats: std::array::from_fn(|_| AtsTable::new()),
            append_table: AppendTable::new(),
            rts: std::array::from_fn(|_| RtsTable::new()),
            atp: Atp::new(),
            rtp: Rtp::new(),
            counters: Counters::default(),
            continue_ats_on_failure: config.continue_ats_on_failure_default,
            verify_checksums: config.verify_checksums,
        }
    }

    /// Record the RTS to autostart on the first housekeeping request
    /// (spec.md §4.7 Autostart). `sc_app` picks power-on vs. processor-reset
    /// id per `DeploymentConfig` and calls this once at init.
    pub fn set_autostart(&mut self, id: Option<RtsId>) {
        self.rtp.set_autostart(id);
    }

    /// Read-only telemetry (spec.md §2 component 9).
    pub fn snapshot(&self) -> HousekeepingSnapshot {
        HousekeepingSnapshot {
            counters: self.counters,
            last_ats_error: self.atp.last_error(),
            last_rts_error: self.rtp.last_error(),
            atp_state: self.atp.state(),
            current_ats: self.atp.current(),
            num_active_rts: self.rtp.num_active(),
        }
    }

    /// Read-only view of one ATS table, for dump-only mirrors.
    pub fn ats_table(&self, id: AtsId) -> &AtsTable {
        &self.ats[id.index()]
    }

    /// Read-only view of one RTS table, for dump-only mirrors.
    pub fn rts_table(&self, id: RtsId) -> &RtsTable {
        &self.rts[id.index()]
    }

    /// Read-only view of the RTP's per-slot run state.
    pub fn rtp(&self) -> &Rtp {
        &self.rtp
    }

    fn reject(&mut self, sink: &mut dyn EventSink, kind: EngineError, sequence: SequenceRef) -> EngineError {
        self.counters.cmd_error_counter += 1;
        tracing::warn!("rejected on {:?}: {}", sequence, kind);
        sink.emit(EngineEvent::Error { kind, sequence });
        kind
    }

    fn require_ats_id(&mut self, raw: u16, sink: &mut dyn EventSink) -> Result<AtsId, EngineError> {
        AtsId::new(raw).ok_or_else(|| self.reject(sink, EngineError::InvalidAtsId, SequenceRef::None))
    }

    fn require_rts_id(&mut self, raw: u16, sink: &mut dyn EventSink) -> Result<RtsId, EngineError> {
        RtsId::new(raw).ok_or_else(|| self.reject(sink, EngineError::InvalidRtsId, SequenceRef::None))
    }

    /// `NOOP` (SPEC_FULL.md §4 supplement).
    pub fn noop(&mut self, sink: &mut dyn EventSink) {
        self.counters.cmd_counter += 1;
        tracing::debug!("NOOP");
        sink.emit(EngineEvent::Noop);
    }

    /// `RESET_COUNTERS` (SPEC_FULL.md §4 supplement): zeroes counters only.
    pub fn reset_counters(&mut self, sink: &mut dyn EventSink) {
        self.counters.reset();
        tracing::info!("counters reset");
        sink.emit(EngineEvent::CountersReset);
    }

    /// `START_ATS`.
    pub fn start_ats(&mut self, raw_id: u16, sink: &mut dyn EventSink) -> Result<(), EngineError> {
        let id = self.require_ats_id(raw_id, sink)?;
        match self.atp.start(id, &self.ats) {
            Ok(()) => {
                self.counters.cmd_counter += 1;
                Ok(())
            }
            Err(e) => Err(self.reject(sink, e, SequenceRef::Ats(id))),
        }
    }

    /// `STOP_ATS`.
    pub fn stop_ats(&mut self, sink: &mut dyn EventSink) -> Result<(), EngineError> {
        if self.atp.state() != AtpState::Executing {
            return Err(self.reject(sink, EngineError::AtpNotIdle, SequenceRef::None));
        }
        self.atp.stop();
        self.counters.cmd_counter += 1;
        Ok(())
    }

    /// `SWITCH_ATS` (ground switch; serviced at the top of the next tick).
    pub fn switch_ats(&mut self, sink: &mut dyn EventSink) -> Result<(), EngineError> {
        let seq = self.atp.current().map(SequenceRef::Ats).unwrap_or(SequenceRef::None);
        match self.atp.request_switch() {
            Ok(()) => {
                self.counters.cmd_counter += 1;
                Ok(())
            }
            Err(e) => Err(self.reject(sink, e, seq)),
        }
    }

    /// `JUMP_ATS`. The ATP itself emits the abort event on failure, so this
    /// only adjusts counters.
    pub fn jump_ats(&mut self, target_time: u32, sink: &mut dyn EventSink) -> Result<(), EngineError> {
        match self.atp.jump(Tick(target_time), &mut self.ats, sink) {
            Ok(()) => {
                self.counters.cmd_counter += 1;
                Ok(())
            }
            Err(e) => {
                self.counters.cmd_error_counter += 1;
                Err(e)
            }
        }
    }

    /// `CONTINUE_ATS_ON_FAILURE`.
    pub fn set_continue_ats_on_failure(&mut self, flag: bool) {
        self.continue_ats_on_failure = flag;
        self.counters.cmd_counter += 1;
    }

    /// `START_RTS`.
    pub fn start_rts(
        &mut self,
        raw_id: u16,
        bus: &dyn MessageBus,
        now: Tick,
        sink: &mut dyn EventSink,
    ) -> Result<(), EngineError> {
        let id = self.require_rts_id(raw_id, sink)?;
        match self.rtp.start(id, &self.rts, bus, now) {
            Ok(()) => {
                self.counters.cmd_counter += 1;
                Ok(())
            }
            Err(e) => Err(self.reject(sink, e, SequenceRef::Rts(id))),
        }
    }

    /// `STOP_RTS`.
    pub fn stop_rts(&mut self, raw_id: u16, sink: &mut dyn EventSink) -> Result<(), EngineError> {
        let id = self.require_rts_id(raw_id, sink)?;
        match self.rtp.stop(id) {
            Ok(()) => {
                self.counters.cmd_counter += 1;
                Ok(())
            }
            Err(e) => Err(self.reject(sink, e, SequenceRef::Rts(id))),
        }
    }

    /// `ENABLE_RTS`.
    pub fn enable_rts(&mut self, raw_id: u16, sink: &mut dyn EventSink) -> Result<(), EngineError> {
        let id = self.require_rts_id(raw_id, sink)?;
        self.rtp.enable(id);
        self.counters.cmd_counter += 1;
        Ok(())
    }

    /// `DISABLE_RTS`.
    pub fn disable_rts(&mut self, raw_id: u16, sink: &mut dyn EventSink) -> Result<(), EngineError> {
        let id = self.require_rts_id(raw_id, sink)?;
        self.rtp.disable(id);
        self.counters.cmd_counter += 1;
        Ok(())
    }

    /// `START_RTS_GRP`.
    pub fn start_rts_group(
        &mut self,
        first_raw: u16,
        last_raw: u16,
        bus: &dyn MessageBus,
        now: Tick,
        sink: &mut dyn EventSink,
    ) -> Result<(), EngineError> {
        let first = self.require_rts_id(first_raw, sink)?;
        let last = self.require_rts_id(last_raw, sink)?;
        match self.rtp.group_start(first, last, &self.rts, bus, now, sink, &mut self.counters) {
            Ok(()) => {
                self.counters.cmd_counter += 1;
                Ok(())
            }
            Err(e) => Err(self.reject(sink, e, SequenceRef::None)),
        }
    }

    /// `STOP_RTS_GRP`.
    pub fn stop_rts_group(&mut self, first_raw: u16, last_raw: u16, sink: &mut dyn EventSink) -> Result<(), EngineError> {
        let first = self.require_rts_id(first_raw, sink)?;
        let last = self.require_rts_id(last_raw, sink)?;
        match self.rtp.group_stop(first, last, sink) {
            Ok(()) => {
                self.counters.cmd_counter += 1;
                Ok(())
            }
            Err(e) => Err(self.reject(sink, e, SequenceRef::None)),
        }
    }

    /// `ENABLE_RTS_GRP`.
    pub fn enable_rts_group(&mut self, first_raw: u16, last_raw: u16, sink: &mut dyn EventSink) -> Result<(), EngineError> {
        let first = self.require_rts_id(first_raw, sink)?;
        let last = self.require_rts_id(last_raw, sink)?;
        match self.rtp.group_enable(first, last, sink) {
            Ok(()) => {
                self.counters.cmd_counter += 1;
                Ok(())
            }
            Err(e) => Err(self.reject(sink, e, SequenceRef::None)),
        }
    }

    /// `DISABLE_RTS_GRP`.
    pub fn disable_rts_group(&mut self, first_raw: u16, last_raw: u16, sink: &mut dyn EventSink) -> Result<(), EngineError> {
        let first = self.require_rts_id(first_raw, sink)?;
        let last = self.require_rts_id(last_raw, sink)?;
        match self.rtp.group_disable(first, last, sink) {
            Ok(()) => {
                self.counters.cmd_counter += 1;
                Ok(())
            }
            Err(e) => Err(self.reject(sink, e, SequenceRef::None)),
        }
    }

    /// `APPEND_ATS` (spec.md §4.5).
    pub fn append_ats(
        &mut self,
        raw_id: u16,
        bus: &dyn MessageBus,
        now: Tick,
        sink: &mut dyn EventSink,
    ) -> Result<(), EngineError> {
        let id = self.require_ats_id(raw_id, sink)?;
        match append::append(&mut self.ats[id.index()], &self.append_table, bus) {
            Ok(_) => {
                if self.atp.current() == Some(id) {
                    self.atp.restart_in_place(id, &mut self.ats, sink, now);
                }
                self.counters.cmd_counter += 1;
                Ok(())
            }
            Err(e) => Err(self.reject(sink, EngineError::from(e), SequenceRef::Ats(id))),
        }
    }

    /// `MANAGE_TABLE` (spec.md §5, §6): release → manage → reacquire, then
    /// rebuild auxiliaries if the table service reports an update.
    pub fn manage_table(
        &mut self,
        raw_table_id: i32,
        service: &mut dyn TableService,
        bus: &dyn MessageBus,
        sink: &mut dyn EventSink,
    ) -> Result<(), EngineError> {
        let table =
            TableId::from_raw(raw_table_id).ok_or_else(|| self.reject(sink, EngineError::ManageUnknownTable, SequenceRef::None))?;

        let updated = {
            let mut guard = TableAddressGuard::acquire(service, table);
            guard.reacquire_now()
        };
        if !updated {
            self.counters.cmd_counter += 1;
            return Ok(());
        }
        let words = service.take_buffer(table);

        match table {
            TableId::Ats(id) => {
                loader::load_ats(&mut self.ats[id.index()], &words, bus)
                    .map_err(|e| self.reject(sink, EngineError::from(e), SequenceRef::Ats(id)))?;
            }
            TableId::Rts(id) => {
                let ok = validate::rts::validate_rts(&words, bus)
                    .map_err(|e| self.reject(sink, EngineError::from(e), SequenceRef::Rts(id)))?;
                let rts_table = &mut self.rts[id.index()];
                rts_table.words.clear();
                let extend_result = rts_table.words.extend_from_slice(&words);
                extend_result.map_err(|_| self.reject(sink, EngineError::VerifyRtsBufOverrun, SequenceRef::Rts(id)))?;
                let rts_table = &mut self.rts[id.index()];
                rts_table.summary.num_commands = ok.entry_count;
                rts_table.summary.size_words = ok.words_used;
                rts_table.summary.use_counter += 1;
                self.rtp.mark_loaded(id);
            }
            TableId::Append => {
                self.append_table.words.clear();
                self.append_table
                    .words
                    .extend_from_slice(&words)
                    .map_err(|_| self.reject(sink, EngineError::AppendNoRoom, SequenceRef::None))?;
                self.append_table.summary.size_words = self.append_table.words.len() as u16;
                self.append_table.summary.use_counter += 1;
            }
            TableId::AtsCmdStatus(_) | TableId::AtsInfo | TableId::RtsInfo | TableId::AtpCtrl | TableId::RtpCtrl => {
                // Dump-only mirrors the core writes but never reads back.
            }
        }

        self.counters.cmd_counter += 1;
        Ok(())
    }

    /// Record a dispatcher-level rejection — unknown message-id or unknown
    /// command-code (spec.md §4.9) — that never reaches a core operation.
    /// The thin dispatcher lives in `sc_app` (spec.md §1: "the top-level
    /// command dispatcher... " is an external collaborator), so it has no
    /// other way to bump `cmd_error_counter` through the same path as
    /// every other rejection.
    pub fn reject_dispatch(&mut self, sink: &mut dyn EventSink, kind: EngineError) {
        self.reject(sink, kind, SequenceRef::None);
    }

    /// Housekeeping-request message: services the one-shot autostart, then
    /// returns the current snapshot (spec.md §4.7 Autostart, §2 component 9).
    pub fn handle_housekeeping_request(&mut self, bus: &dyn MessageBus, now: Tick) -> HousekeepingSnapshot {
        self.rtp.service_autostart(&self.rts, bus, now);
        self.snapshot()
    }

    /// One-hertz wakeup (spec.md §4.8). Idempotent under either a "wakeup"
    /// or a "one-hertz" inbound message (spec.md §9 open question) — both
    /// route here with the same `now`.
    pub fn tick(&mut self, bus: &mut dyn MessageBus, sink: &mut dyn EventSink, now: Tick) {
        tick::run_tick(
            &mut self.atp,
            &mut self.rtp,
            &mut self.ats,
            &mut self.rts,
            bus,
            sink,
            now,
            self.verify_checksums,
            self.continue_ats_on_failure,
            &mut self.counters,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sc_common::bus::{BusError, InlineCommand};
    use sc_common::wire::AtsEntryHeader;

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

    #[derive(Default)]
    struct CountingSink {
        events: Vec<EngineEvent>,
    }
    impl EventSink for CountingSink {
        fn emit(&mut self, event: EngineEvent) {
            self.events.push(event);
        }
    }

    fn config() -> DeploymentConfig {
        sc_common::config::load_config_from_str(
            r#"
service_name = "sc"
command_pipe_mid = 1
housekeeping_request_mid = 2
wakeup_mid = 3
self_mid = 4
"#,
        )
        .unwrap()
    }

    fn load_one_entry(table: &mut AtsTable, cmd_number: u16, time: u32) {
        let mut header_words = [0u32; 2];
        AtsEntryHeader {
            cmd_number,
            time_tag: Tick(time),
        }
        .write(&mut header_words);
        let mut words = header_words.to_vec();
        words.extend([0u32, 0u32]);
        let bus = FixedLenBus { len: 8 };
        loader::load_ats(table, &words, &bus).unwrap();
    }

    #[test]
    fn noop_increments_cmd_counter_and_emits_event() {
        let mut engine = Engine::new(&config());
        let mut sink = CountingSink::default();
        engine.noop(&mut sink);
        assert_eq!(engine.snapshot().counters.cmd_counter, 1);
        assert!(matches!(sink.events[0], EngineEvent::Noop));
    }

    #[test]
    fn invalid_ats_id_is_rejected() {
        let mut engine = Engine::new(&config());
        let mut sink = CountingSink::default();
        let err = engine.start_ats(0, &mut sink).unwrap_err();
        assert_eq!(err, EngineError::InvalidAtsId);
        assert_eq!(engine.snapshot().counters.cmd_error_counter, 1);
    }

    #[test]
    fn start_ats_requires_loaded_table() {
        let mut engine = Engine::new(&config());
        let mut sink = CountingSink::default();
        let err = engine.start_ats(1, &mut sink).unwrap_err();
        assert_eq!(err, EngineError::AtsNotLoaded);
    }

    #[test]
    fn start_ats_then_tick_dispatches_and_completes() {
        let mut engine = Engine::new(&config());
        load_one_entry(&mut engine.ats[0], 1, 10);
        let mut sink = CountingSink::default();
        engine.start_ats(1, &mut sink).unwrap();
        let mut bus = FixedLenBus { len: 8 };
        engine.tick(&mut bus, &mut sink, Tick(10));
        assert_eq!(engine.snapshot().atp_state, AtpState::Idle);
        assert_eq!(engine.snapshot().counters.ats_cmds_completed, 1);
        assert!(sink.events.iter().any(|e| matches!(e, EngineEvent::AtsComplete(_))));
    }

    #[test]
    fn reset_counters_zeroes_counters_not_state() {
        let mut engine = Engine::new(&config());
        load_one_entry(&mut engine.ats[0], 1, 10);
        let mut sink = CountingSink::default();
        engine.start_ats(1, &mut sink).unwrap();
        engine.reset_counters(&mut sink);
        assert_eq!(engine.snapshot().counters.cmd_counter, 0);
        assert_eq!(engine.snapshot().atp_state, AtpState::Executing);
    }
}
