//! Relative-Time Processor: `NUM_RTS` concurrent slots (spec.md §4.7).
//!
//! Unlike the ATP's single time-sorted index, each RTS slot only ever
//! knows its own next offset and next due time — RTS entries are
//! dispatched strictly in buffer order, so there is nothing to sort.

use sc_common::bus::{EngineEvent, EventSink, MessageBus, SequenceRef};
use sc_common::error::EngineError;
use sc_common::ids::{EntryOffset, RtsId};
use sc_common::limits::{NUM_RTS, PACKET_MAX_SIZE, PACKET_MIN_SIZE};
use sc_common::status::RtsStatus;
use sc_common::time::Tick;
use sc_common::wire::{rts_entry_word_len, RtsEntryHeader};

use crate::housekeeping::Counters;
use crate::tables::RtsTable;

/// Per-slot run state. The table's word buffer lives in [`RtsTable`]; this
/// is everything else spec.md §3 lists under "Per-RTS info".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtsSlot {
    /// Run status.
    pub status: RtsStatus,
    /// Disabled flag, independent of `status` (spec.md §4.7 Start
    /// preconditions check both separately).
    pub disabled: bool,
    /// Word offset of the next entry to dispatch.
    pub next_offset: EntryOffset,
    /// Absolute time the next entry is due.
    pub next_time: Tick,
}

impl Default for RtsSlot {
    fn default() -> Self {
        Self {
            status: RtsStatus::Empty,
            disabled: false,
            next_offset: EntryOffset::ZERO,
            next_time: Tick::INFINITE,
        }
    }
}

/// The RTP: `NUM_RTS` slots plus the shared autostart/active-count state.
pub struct Rtp {
    slots: [RtsSlot; NUM_RTS],
    num_active: u16,
    last_error: SequenceRef,
    autostart_pending: Option<RtsId>,
}

impl Default for Rtp {
    fn default() -> Self {
        Self {
            slots: [RtsSlot::default(); NUM_RTS],
            num_active: 0,
            last_error: SequenceRef::None,
            autostart_pending: None,
        }
    }
}

fn first_packet_len_ok(table: &RtsTable, bus: &dyn MessageBus) -> bool {
    let packet_start = RtsEntryHeader::WORDS;
    if packet_start > table.words.len() {
        return false;
    }
    match bus.packet_byte_len(&table.words[packet_start..]) {
        Some(len) => (len as usize) >= PACKET_MIN_SIZE && (len as usize) <= PACKET_MAX_SIZE,
        None => false,
    }
}

impl Rtp {
    /// A freshly power-on RTP: every slot EMPTY, nothing active.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view of one slot.
    pub fn slot(&self, id: RtsId) -> &RtsSlot {
        &self.slots[id.index()]
    }

    /// Number of slots currently EXECUTING.
    pub fn num_active(&self) -> u16 {
        self.num_active
    }

    /// Sequence the last RTP-side error occurred on.
    pub fn last_error(&self) -> SequenceRef {
        self.last_error
    }

    /// Mark a slot LOADED (called by the slot's table loader once a buffer
    /// has been validated and copied in).
    pub fn mark_loaded(&mut self, id: RtsId) {
        let slot = &mut self.slots[id.index()];
        slot.status = RtsStatus::Loaded;
        slot.next_offset = EntryOffset::ZERO;
        slot.next_time = Tick::INFINITE;
    }

    /// Mark a slot EMPTY (table cleared).
    pub fn mark_empty(&mut self, id: RtsId) {
        let slot = &mut self.slots[id.index()];
        if slot.status == RtsStatus::Executing {
            self.num_active = self.num_active.saturating_sub(1);
        }
        *slot = RtsSlot::default();
    }

    /// Record which RTS should autostart on the first housekeeping request
    /// after init (spec.md §4.7 Autostart).
    pub fn set_autostart(&mut self, id: Option<RtsId>) {
        self.autostart_pending = id;
    }

    /// **Start** (spec.md §4.7).
    pub fn start(
        &mut self,
        id: RtsId,
        tables: &[RtsTable; NUM_RTS],
        bus: &dyn MessageBus,
        now: Tick,
    ) -> Result<(), EngineError> {
        let table = &tables[id.index()];
        {
            let slot = &self.slots[id.index()];
            if slot.disabled {
                return Err(EngineError::RtsDisabled);
            }
            if slot.status != RtsStatus::Loaded {
                return Err(EngineError::RtsNotLoadedOrInUse);
            }
        }
        if !first_packet_len_ok(table, bus) {
            return Err(EngineError::RtsFirstCmdLenInvalid);
        }
        let first_delta = RtsEntryHeader::parse(&table.words[..RtsEntryHeader::WORDS]).relative_delta;

        let slot = &mut self.slots[id.index()];
        slot.status = RtsStatus::Executing;
        slot.next_offset = EntryOffset::ZERO;
        slot.next_time = now.saturating_add(first_delta);
        self.num_active += 1;
        Ok(())
    }

    /// **Stop/Kill** (spec.md §4.7): EXECUTING → LOADED.
    pub fn stop(&mut self, id: RtsId) -> Result<(), EngineError> {
        let slot = &mut self.slots[id.index()];
        if slot.status != RtsStatus::Executing {
            return Err(EngineError::RtsNotLoadedOrInUse);
        }
        slot.status = RtsStatus::Loaded;
        slot.next_time = Tick::INFINITE;
        self.num_active = self.num_active.saturating_sub(1);
        Ok(())
    }

    /// Enable a disabled slot.
    pub fn enable(&mut self, id: RtsId) {
        self.slots[id.index()].disabled = false;
    }

    /// Disable a slot. Running slots keep running; only future Starts are
    /// blocked (spec.md §4.7 Start precondition).
    pub fn disable(&mut self, id: RtsId) {
        self.slots[id.index()].disabled = true;
    }

    fn group_range(first: RtsId, last: RtsId) -> Result<(), EngineError> {
        if first.as_u16() > last.as_u16() {
            return Err(EngineError::InvalidRtsId);
        }
        Ok(())
    }

    /// Group Start over `[first..=last]` (spec.md §4.7 "Group operations").
    /// Per-slot rejections don't abort the batch, but each one still bumps
    /// `rts_error_counter` (spec.md §8 scenario 5).
    pub fn group_start(
        &mut self,
        first: RtsId,
        last: RtsId,
        tables: &[RtsTable; NUM_RTS],
        bus: &dyn MessageBus,
        now: Tick,
        sink: &mut dyn EventSink,
        counters: &mut Counters,
    ) -> Result<(), EngineError> {
        Self::group_range(first, last)?;
        let mut modified = 0u16;
        for raw in first.as_u16()..=last.as_u16() {
            let id = RtsId::new(raw).expect("range validated above");
            match self.start(id, tables, bus, now) {
                Ok(()) => modified += 1,
                Err(_) => counters.rts_error_counter += 1,
            }
        }
        tracing::info!("RTS group start [{:?}..={:?}] modified {} slot(s)", first, last, modified);
        sink.emit(EngineEvent::GroupOpSummary { modified });
        Ok(())
    }

    /// Group Stop over `[first..=last]`.
    pub fn group_stop(&mut self, first: RtsId, last: RtsId, sink: &mut dyn EventSink) -> Result<(), EngineError> {
        Self::group_range(first, last)?;
        let mut modified = 0u16;
        for raw in first.as_u16()..=last.as_u16() {
            let id = RtsId::new(raw).expect("range validated above");
            if self.stop(id).is_ok() {
                modified += 1;
            }
        }
        tracing::info!("RTS group stop [{:?}..={:?}] modified {} slot(s)", first, last, modified);
        sink.emit(EngineEvent::GroupOpSummary { modified });
        Ok(())
    }

    /// Group Enable over `[first..=last]`.
    pub fn group_enable(&mut self, first: RtsId, last: RtsId, sink: &mut dyn EventSink) -> Result<(), EngineError> {
        Self::group_range(first, last)?;
        let mut modified = 0u16;
        for raw in first.as_u16()..=last.as_u16() {
            let id = RtsId::new(raw).expect("range validated above");
            self.enable(id);
            modified += 1;
        }
        tracing::info!("RTS group enable [{:?}..={:?}] modified {} slot(s)", first, last, modified);
        sink.emit(EngineEvent::GroupOpSummary { modified });
        Ok(())
    }

    /// Group Disable over `[first..=last]`.
    pub fn group_disable(&mut self, first: RtsId, last: RtsId, sink: &mut dyn EventSink) -> Result<(), EngineError> {
        Self::group_range(first, last)?;
        let mut modified = 0u16;
        for raw in first.as_u16()..=last.as_u16() {
            let id = RtsId::new(raw).expect("range validated above");
            self.disable(id);
            modified += 1;
        }
        tracing::info!("RTS group disable [{:?}..={:?}] modified {} slot(s)", first, last, modified);
        sink.emit(EngineEvent::GroupOpSummary { modified });
        Ok(())
    }

    /// Lowest-index slot that is EXECUTING and due at `now`, if any.
    pub fn due_slot(&self, now: Tick) -> Option<RtsId> {
        self.slots.iter().enumerate().find_map(|(i, slot)| {
            (slot.status == RtsStatus::Executing && slot.next_time.is_due(now))
                .then(|| RtsId::new(i as u16 + 1).expect("index within NUM_RTS"))
        })
    }

    /// The earliest `next_time` among EXECUTING slots and which slot owns
    /// it, for the tick loop's ATP-vs-RTP comparison (spec.md §4.8). Ties
    /// among RTS slots favor the lowest index; `Tick::INFINITE`/`None` when
    /// nothing is EXECUTING.
    pub fn min_next_time(&self) -> (Tick, Option<RtsId>) {
        let mut best: (Tick, Option<RtsId>) = (Tick::INFINITE, None);
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.status != RtsStatus::Executing {
                continue;
            }
            if slot.next_time.0 < (best.0).0 {
                best = (slot.next_time, Some(RtsId::new(i as u16 + 1).expect("index within NUM_RTS")));
            }
        }
        best
    }

    fn stop_on_error(&mut self, id: RtsId, kind: EngineError) {
        self.last_error = SequenceRef::Rts(id);
        let slot = &mut self.slots[id.index()];
        slot.status = RtsStatus::Loaded;
        slot.next_time = Tick::INFINITE;
        self.num_active = self.num_active.saturating_sub(1);
        let _ = kind;
    }

    /// **Dispatch** (tick-triggered, spec.md §4.7). Precondition: `id` was
    /// returned by [`Self::due_slot`] this tick.
    pub fn dispatch_one(
        &mut self,
        id: RtsId,
        tables: &mut [RtsTable; NUM_RTS],
        bus: &mut dyn MessageBus,
        sink: &mut dyn EventSink,
        now: Tick,
        verify_checksums: bool,
        counters: &mut Counters,
    ) {
        let table = &mut tables[id.index()];
        let offset = self.slots[id.index()].next_offset.as_usize();
        if offset + RtsEntryHeader::WORDS > table.words.len() {
            self.complete(id, sink);
            return;
        }
        let packet_start = offset + RtsEntryHeader::WORDS;

        if verify_checksums && !bus.verify_checksum(&table.words[packet_start..]) {
            counters.rts_error_counter += 1;
            tracing::warn!("RTS {:?} entry failed checksum verification", id);
            sink.emit(EngineEvent::Error {
                kind: EngineError::RtsChecksumFailed,
                sequence: SequenceRef::Rts(id),
            });
            self.stop_on_error(id, EngineError::RtsChecksumFailed);
            return;
        }

        if let Err(_) = bus.publish(&table.words[packet_start..]) {
            counters.rts_error_counter += 1;
            tracing::warn!("RTS {:?} entry failed to publish", id);
            sink.emit(EngineEvent::Error {
                kind: EngineError::RtsPublishFailed,
                sequence: SequenceRef::Rts(id),
            });
            self.stop_on_error(id, EngineError::RtsPublishFailed);
            return;
        }
        counters.rts_cmds_completed += 1;

        let packet_len = bus.packet_byte_len(&table.words[packet_start..]).unwrap_or(0);
        let entry_words = rts_entry_word_len(packet_len as usize);
        let new_offset = offset + entry_words;

        if new_offset + RtsEntryHeader::WORDS > table.words.len() {
            self.complete(id, sink);
            return;
        }
        let next_header =
            RtsEntryHeader::parse(&table.words[new_offset..new_offset + RtsEntryHeader::WORDS]);
        if next_header.is_zero() {
            self.complete(id, sink);
            return;
        }

        let slot = &mut self.slots[id.index()];
        slot.next_offset = EntryOffset::new(new_offset as u16);
        slot.next_time = now.saturating_add(next_header.relative_delta);
    }

    fn complete(&mut self, id: RtsId, sink: &mut dyn EventSink) {
        let slot = &mut self.slots[id.index()];
        slot.status = RtsStatus::Loaded;
        slot.next_time = Tick::INFINITE;
        self.num_active = self.num_active.saturating_sub(1);
        tracing::info!("RTS {:?} ran to completion", id);
        sink.emit(EngineEvent::RtsComplete(id));
    }

    /// Service the pending autostart, if any (spec.md §4.7 Autostart):
    /// fires at most once, on the first call after it is set.
    pub fn service_autostart(
        &mut self,
        tables: &[RtsTable; NUM_RTS],
        bus: &dyn MessageBus,
        now: Tick,
    ) {
        let Some(id) = self.autostart_pending.take() else {
            return;
        };
        if self.slots[id.index()].status == RtsStatus::Loaded {
            self.slots[id.index()].disabled = false;
            let _ = self.start(id, tables, bus, now);
        }
    }
}
