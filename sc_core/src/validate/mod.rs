//! Pure table-load validators (spec.md §4.1, §4.2).
//!
//! "Pure" here means referentially transparent given the same buffer and
//! the same packet-length reader — the only external input is the
//! read-only [`sc_common::bus::MessageBus::packet_byte_len`]/
//! [`sc_common::bus::MessageBus::is_valid_message_id`] calls spec.md §6
//! requires ("the engine never hardcodes [packet length]"). Neither
//! validator mutates anything; they run before a load becomes visible
//! (spec.md §4.1 rationale), so everything downstream may assume their
//! postconditions hold without re-checking.

pub mod ats;
pub mod rts;
