//! Build-time table sizes and rate caps (spec.md §2, §3).
//!
//! All sizes are fixed at build time; the engine never allocates a table
//! dynamically. These mirror the mission-configurable `#define`s of the
//! source application, baked in as Rust `const`s per the "no dynamic
//! table allocation" non-goal.

/// Number of ATS buffers the ATP switches between. Always two: the
/// two-buffer switch protocol (spec.md §4.6) is only meaningful for
/// exactly two live ATS slots.
pub const NUM_ATS: usize = 2;

/// Number of concurrent RTS slots serviced by the RTP.
pub const NUM_RTS: usize = 64;

/// Word capacity of one ATS buffer.
pub const ATS_BUFFER_SIZE: usize = 4002;

/// Word capacity of the Append buffer. Must be `<= ATS_BUFFER_SIZE`.
pub const APPEND_BUFFER_SIZE: usize = 4002;

/// Word capacity of one RTS buffer.
pub const RTS_BUFFER_SIZE: usize = 1002;

/// Highest legal command number within a single ATS.
pub const MAX_ATS_CMDS: usize = 1000;

/// Maximum number of commands the tick loop dispatches in one second.
pub const MAX_CMDS_PER_SECOND: usize = 8;

/// Minimum legal byte length of a self-describing command packet.
pub const PACKET_MIN_SIZE: usize = 8;

/// Maximum legal byte length of a self-describing command packet.
pub const PACKET_MAX_SIZE: usize = 250;

/// Word length of an ATS entry header (2-byte pad, cmd-number, 2x16-bit time).
pub const ATS_HEADER_WORDS: usize = 2;

/// Word length of an RTS entry header (4-byte relative-time tag).
pub const RTS_HEADER_WORDS: usize = 1;

static_assertions::const_assert!(APPEND_BUFFER_SIZE <= ATS_BUFFER_SIZE);
static_assertions::const_assert!(ATS_BUFFER_SIZE >= PACKET_MIN_SIZE / 4);
static_assertions::const_assert!(RTS_BUFFER_SIZE >= PACKET_MIN_SIZE / 4);
static_assertions::const_assert!(MAX_ATS_CMDS <= u16::MAX as usize);
static_assertions::const_assert!(NUM_RTS <= u16::MAX as usize);
static_assertions::const_assert!(PACKET_MIN_SIZE % 4 == 0);
static_assertions::const_assert!(PACKET_MAX_SIZE >= PACKET_MIN_SIZE);
