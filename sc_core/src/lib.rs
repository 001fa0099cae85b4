//! Stored Command sequence execution engine.
//!
//! This is THE CORE named in spec.md §1: the ATS processor (ATP) with its
//! two-buffer switch protocol, the RTS processor (RTP) with its
//! concurrent slots, the table-load validators, Append, and the
//! one-hertz tick loop. It owns the auxiliary tables (spec.md §3
//! "Ownership") and takes the message bus, event sink, table service and
//! clock as trait objects from [`sc_common::bus`] and
//! [`sc_common::time`] — nothing here performs I/O directly.
//!
//! ## Module Structure
//!
//! - [`tables`] - ATS/Append/RTS word buffers and per-ATS auxiliary tables
//! - [`validate`] - pure validators (spec.md §4.1, §4.2)
//! - [`loader`] - ATS loader (spec.md §4.3)
//! - [`time_index`] - time-index builder (spec.md §4.4)
//! - [`append`] - Append merge (spec.md §4.5)
//! - [`atp`] - Absolute-Time Processor state machine (spec.md §4.6)
//! - [`rtp`] - Relative-Time Processor slots (spec.md §4.7)
//! - [`tick`] - one-hertz tick loop (spec.md §4.8)
//! - [`guard`] - two-phase table-address acquisition (spec.md §5, §9)
//! - [`housekeeping`] - read-only telemetry snapshot (spec.md §2 component 9)
//! - [`engine`] - the single aggregate [`engine::Engine`] value

pub mod append;
pub mod atp;
pub mod engine;
pub mod guard;
pub mod housekeeping;
pub mod loader;
pub mod rtp;
pub mod tables;
pub mod tick;
pub mod time_index;
pub mod validate;
