//! One-hertz tick loop (spec.md §4.8).
//!
//! `run_tick` is the contractual pseudocode translated directly: service
//! any pending ground switch first, then repeatedly pick whichever of
//! ATP/RTP is next due (ATP wins ties), dispatch one command from it, and
//! stop when nothing is due or the per-second cap is hit.

use sc_common::bus::{EventSink, MessageBus};
use sc_common::limits::{MAX_CMDS_PER_SECOND, NUM_ATS, NUM_RTS};
use sc_common::status::AtpState;
use sc_common::time::Tick;

use crate::atp::Atp;
use crate::housekeeping::Counters;
use crate::rtp::Rtp;
use crate::tables::{AtsTable, RtsTable};

/// Run one one-hertz wakeup's worth of dispatch (spec.md §4.8). Idempotent
/// under either a "wakeup" or a "one-hertz" input message, per spec.md §9's
/// open question — both map onto a single call to this function with the
/// same `now`.
#[allow(clippy::too_many_arguments)]
pub fn run_tick(
    atp: &mut Atp,
    rtp: &mut Rtp,
    ats_tables: &mut [AtsTable; NUM_ATS],
    rts_tables: &mut [RtsTable; NUM_RTS],
    bus: &mut dyn MessageBus,
    sink: &mut dyn EventSink,
    now: Tick,
    verify_checksums: bool,
    continue_ats_on_failure: bool,
    counters: &mut Counters,
) {
    atp.service_pending_switch(ats_tables, sink, now);

    let mut cmds_this_second: usize = 0;
    loop {
        let atp_next = if atp.state() == AtpState::Executing {
            atp.next_time()
        } else {
            Tick::INFINITE
        };
        let (rtp_next, rtp_id) = rtp.min_next_time();

        if atp_next == Tick::INFINITE && rtp_id.is_none() {
            break;
        }

        let dispatch_atp = atp_next.0 <= rtp_next.0;
        let next_time = if dispatch_atp { atp_next } else { rtp_next };
        if next_time.0 > now.0 {
            break;
        }

        if dispatch_atp {
            atp.dispatch_one(
                ats_tables,
                bus,
                sink,
                now,
                verify_checksums,
                continue_ats_on_failure,
                counters,
            );
        } else {
            let id = rtp_id.expect("dispatch_atp is false only when an RTS slot is due");
            rtp.dispatch_one(id, rts_tables, bus, sink, now, verify_checksums, counters);
        }

        cmds_this_second += 1;
        if cmds_this_second >= MAX_CMDS_PER_SECOND {
            break;
        }
    }
}
