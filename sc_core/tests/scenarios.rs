//! End-to-end scenarios, built only from `sc_core`'s public API (spec.md
//! §8 "End-to-end scenarios"). Each test reproduces one scenario's literal
//! values and checks the outcome the spec states.

use sc_common::bus::{BusError, EngineEvent, EventSink, InlineCommand, MessageBus, TableId, TableService};
use sc_common::config::{load_config_from_str, DeploymentConfig};
use sc_common::error::EngineError;
use sc_common::ids::{AtsId, CmdNum, RtsId};
use sc_common::limits::MAX_CMDS_PER_SECOND;
use sc_common::status::{AtpState, CmdStatus, RtsStatus};
use sc_common::time::Tick;
use sc_common::wire::{AtsEntryHeader, RtsEntryHeader};

use sc_core::engine::Engine;

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
struct RecordingSink {
    events: Vec<EngineEvent>,
}
impl EventSink for RecordingSink {
    fn emit(&mut self, event: EngineEvent) {
        self.events.push(event);
    }
}

/// Stand-in for the external table service: a ground op writes a new
/// buffer into it before the `MANAGE_TABLE` command, same as a real table
/// load would deliver the bytes via shared memory.
#[derive(Default)]
struct FakeTableService {
    buffers: Vec<(TableId, Vec<u32>)>,
}
impl FakeTableService {
    fn new() -> Self {
        Self::default()
    }
    fn set(&mut self, table: TableId, words: Vec<u32>) {
        self.buffers.retain(|(t, _)| *t != table);
        self.buffers.push((table, words));
    }
}
impl TableService for FakeTableService {
    fn release(&mut self, _table: TableId) {}
    fn reacquire(&mut self, table: TableId) -> bool {
        self.buffers.iter().any(|(t, _)| *t == table)
    }
    fn take_buffer(&mut self, table: TableId) -> Vec<u32> {
        match self.buffers.iter().position(|(t, _)| *t == table) {
            Some(pos) => self.buffers.remove(pos).1,
            None => Vec::new(),
        }
    }
}

fn config() -> DeploymentConfig {
    load_config_from_str(
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

fn ats_words(entries: &[(u16, u32)], packet_words: usize) -> Vec<u32> {
    let mut words = Vec::new();
    for &(cmd_number, time) in entries {
        let mut header = [0u32; 2];
        AtsEntryHeader {
            cmd_number,
            time_tag: Tick(time),
        }
        .write(&mut header);
        words.extend_from_slice(&header);
        words.extend(std::iter::repeat(0u32).take(packet_words));
    }
    words.push(0);
    words.push(0);
    words
}

fn rts_words(entries: &[(u32, usize)]) -> Vec<u32> {
    let mut words = Vec::new();
    for &(delta, packet_words) in entries {
        let mut header = [0u32; 1];
        RtsEntryHeader { relative_delta: delta }.write(&mut header);
        words.extend_from_slice(&header);
        words.extend(std::iter::repeat(0u32).take(packet_words));
    }
    words.push(0);
    words.push(0);
    words
}

fn cmd(n: u16) -> CmdNum {
    CmdNum::new(n).unwrap()
}

/// 1. Start simple ATS (spec.md §8 scenario 1).
#[test]
fn scenario_start_simple_ats() {
    let mut engine = Engine::new(&config());
    let mut sink = RecordingSink::default();
    let mut service = FakeTableService::new();
    let id = AtsId::new(1).unwrap();
    let bus = FixedLenBus { len: 8 };

    service.set(TableId::Ats(id), ats_words(&[(1, 10), (2, 20)], 2));
    engine.manage_table(TableId::Ats(id).as_raw(), &mut service, &bus, &mut sink).unwrap();

    engine.start_ats(1, &mut sink).unwrap();
    assert_eq!(engine.snapshot().atp_state, AtpState::Executing);

    let mut bus = FixedLenBus { len: 8 };
    engine.tick(&mut bus, &mut sink, Tick(10));
    assert_eq!(engine.ats_table(id).cmd_status[cmd(1).index()], CmdStatus::Executed);
    assert_eq!(engine.snapshot().atp_state, AtpState::Executing);

    engine.tick(&mut bus, &mut sink, Tick(20));
    assert_eq!(engine.ats_table(id).cmd_status[cmd(2).index()], CmdStatus::Executed);
    assert_eq!(engine.snapshot().atp_state, AtpState::Idle);
}

/// 2. Jump past end (spec.md §8 scenario 2).
#[test]
fn scenario_jump_past_end() {
    let mut engine = Engine::new(&config());
    let mut sink = RecordingSink::default();
    let mut service = FakeTableService::new();
    let id = AtsId::new(1).unwrap();
    let bus = FixedLenBus { len: 8 };

    service.set(TableId::Ats(id), ats_words(&[(1, 10), (2, 20)], 2));
    engine.manage_table(TableId::Ats(id).as_raw(), &mut service, &bus, &mut sink).unwrap();
    engine.start_ats(1, &mut sink).unwrap();

    let err = engine.jump_ats(100, &mut sink).unwrap_err();
    assert_eq!(err, EngineError::JumpPastEnd);
    assert_eq!(engine.snapshot().atp_state, AtpState::Idle);
    assert_eq!(engine.ats_table(id).cmd_status[cmd(1).index()], CmdStatus::Skipped);
    assert_eq!(engine.ats_table(id).cmd_status[cmd(2).index()], CmdStatus::Skipped);
}

/// 3. Switch with tail (spec.md §8 scenario 3).
#[test]
fn scenario_switch_with_tail() {
    let mut engine = Engine::new(&config());
    let mut sink = RecordingSink::default();
    let mut service = FakeTableService::new();
    let id1 = AtsId::new(1).unwrap();
    let id2 = AtsId::new(2).unwrap();
    let bus = FixedLenBus { len: 8 };

    service.set(TableId::Ats(id1), ats_words(&[(1, 10)], 2));
    service.set(TableId::Ats(id2), ats_words(&[(1, 50), (2, 60)], 2));
    engine.manage_table(TableId::Ats(id1).as_raw(), &mut service, &bus, &mut sink).unwrap();
    engine.manage_table(TableId::Ats(id2).as_raw(), &mut service, &bus, &mut sink).unwrap();

    engine.start_ats(1, &mut sink).unwrap();
    engine.switch_ats(&mut sink).unwrap();

    let mut bus = FixedLenBus { len: 8 };
    engine.tick(&mut bus, &mut sink, Tick(10));

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.atp_state, AtpState::Executing);
    assert_eq!(snapshot.current_ats, Some(id2));
    // no command published at t=10: ATS 2's first entry (t=50) is not yet due.
    assert_eq!(engine.ats_table(id2).cmd_status[cmd(1).index()], CmdStatus::Loaded);
}

/// 4. Duplicate command number (spec.md §8 scenario 4).
#[test]
fn scenario_duplicate_command_number_rejected() {
    let mut engine = Engine::new(&config());
    let mut sink = RecordingSink::default();
    let mut service = FakeTableService::new();
    let id = AtsId::new(1).unwrap();
    let bus = FixedLenBus { len: 8 };

    service.set(TableId::Ats(id), ats_words(&[(1, 10), (1, 20)], 2));
    let err = engine.manage_table(TableId::Ats(id).as_raw(), &mut service, &bus, &mut sink).unwrap_err();

    assert_eq!(err, EngineError::VerifyAtsDup);
    assert!(engine.ats_table(id).is_empty());
}

/// 5. RTS group start with one disabled (spec.md §8 scenario 5).
#[test]
fn scenario_rts_group_start_with_one_disabled() {
    let mut engine = Engine::new(&config());
    let mut sink = RecordingSink::default();
    let mut service = FakeTableService::new();
    let ids = [RtsId::new(1).unwrap(), RtsId::new(2).unwrap(), RtsId::new(3).unwrap()];
    let bus = FixedLenBus { len: 8 };

    for &id in &ids {
        service.set(TableId::Rts(id), rts_words(&[(0, 2)]));
        engine.manage_table(TableId::Rts(id).as_raw(), &mut service, &bus, &mut sink).unwrap();
    }
    engine.disable_rts(2, &mut sink).unwrap();

    let before = engine.snapshot().counters.cmd_counter;
    engine.start_rts_group(1, 3, &bus, Tick(0), &mut sink).unwrap();

    assert_eq!(engine.rtp().slot(ids[0]).status, RtsStatus::Executing);
    assert_eq!(engine.rtp().slot(ids[2]).status, RtsStatus::Executing);
    assert_eq!(engine.rtp().slot(ids[1]).status, RtsStatus::Loaded);

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.counters.cmd_counter, before + 1);
    assert_eq!(snapshot.counters.rts_error_counter, 1);
    assert!(sink
        .events
        .iter()
        .any(|e| matches!(e, EngineEvent::GroupOpSummary { modified: 2 })));
}

/// 6. Append growing a running ATS (spec.md §8 scenario 6).
#[test]
fn scenario_append_growing_running_ats() {
    let mut engine = Engine::new(&config());
    let mut sink = RecordingSink::default();
    let mut service = FakeTableService::new();
    let id = AtsId::new(1).unwrap();
    let bus = FixedLenBus { len: 8 };

    service.set(TableId::Ats(id), ats_words(&[(1, 10), (2, 20)], 2));
    service.set(TableId::Append, ats_words(&[(3, 15), (2, 25)], 2));
    engine.manage_table(TableId::Ats(id).as_raw(), &mut service, &bus, &mut sink).unwrap();
    engine.manage_table(TableId::Append.as_raw(), &mut service, &bus, &mut sink).unwrap();

    engine.start_ats(1, &mut sink).unwrap();

    let mut bus = FixedLenBus { len: 8 };
    engine.tick(&mut bus, &mut sink, Tick(10));
    assert_eq!(engine.ats_table(id).cmd_status[cmd(1).index()], CmdStatus::Executed);

    engine.append_ats(1, &bus, Tick(12), &mut sink).unwrap();

    let order: Vec<u16> = engine.ats_table(id).time_index.iter().map(|c| c.as_u16()).collect();
    assert_eq!(order, vec![1, 3, 2]);

    engine.tick(&mut bus, &mut sink, Tick(15));
    assert_eq!(engine.ats_table(id).cmd_status[cmd(3).index()], CmdStatus::Executed);
    assert_eq!(engine.snapshot().atp_state, AtpState::Executing);

    engine.tick(&mut bus, &mut sink, Tick(25));
    assert_eq!(engine.ats_table(id).cmd_status[cmd(2).index()], CmdStatus::Executed);
    assert_eq!(engine.snapshot().atp_state, AtpState::Idle);
}

/// 7. Rate cap (spec.md §8 scenario 7).
#[test]
fn scenario_rate_cap() {
    let mut engine = Engine::new(&config());
    let mut sink = RecordingSink::default();
    let mut service = FakeTableService::new();
    let id = AtsId::new(1).unwrap();
    let bus = FixedLenBus { len: 8 };

    let entries: Vec<(u16, u32)> = (1..=50u16).map(|cn| (cn, 10)).collect();
    service.set(TableId::Ats(id), ats_words(&entries, 2));
    engine.manage_table(TableId::Ats(id).as_raw(), &mut service, &bus, &mut sink).unwrap();
    engine.start_ats(1, &mut sink).unwrap();

    let mut bus = FixedLenBus { len: 8 };
    engine.tick(&mut bus, &mut sink, Tick(10));
    assert_eq!(engine.snapshot().counters.ats_cmds_completed, MAX_CMDS_PER_SECOND as u32);

    engine.tick(&mut bus, &mut sink, Tick(11));
    assert_eq!(engine.snapshot().counters.ats_cmds_completed, 2 * MAX_CMDS_PER_SECOND as u32);

    let skipped = (1..=50u16).filter(|&cn| engine.ats_table(id).cmd_status[cmd(cn).index()] == CmdStatus::Skipped).count();
    assert_eq!(skipped, 0);
}
