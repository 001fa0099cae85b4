//! The [`Clock`] adapter (spec.md §2 component 1): one implementation,
//! reporting whichever source was baked in at build time via a Cargo
//! feature. `sc_core` never reads the wall clock itself.

use sc_common::time::{Clock, ClockSource, Tick};
use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(not(any(feature = "mission-time", feature = "tai", feature = "utc")))]
compile_error!("sc_app requires exactly one of the `mission-time`, `tai`, `utc` features");
#[cfg(all(feature = "mission-time", feature = "tai"))]
compile_error!("`mission-time` and `tai` are mutually exclusive clock-source features");
#[cfg(all(feature = "mission-time", feature = "utc"))]
compile_error!("`mission-time` and `utc` are mutually exclusive clock-source features");
#[cfg(all(feature = "tai", feature = "utc"))]
compile_error!("`tai` and `utc` are mutually exclusive clock-source features");

#[cfg(feature = "mission-time")]
const SELECTED_SOURCE: ClockSource = ClockSource::MissionTime;
#[cfg(feature = "tai")]
const SELECTED_SOURCE: ClockSource = ClockSource::Tai;
#[cfg(feature = "utc")]
const SELECTED_SOURCE: ClockSource = ClockSource::Utc;

/// Wall-clock-backed [`Clock`]. Subseconds are truncated at the boundary
/// (spec.md §2 component 1: "Produces a 32-bit seconds count; subseconds
/// are discarded").
pub struct SystemClock {
    epoch: SystemTime,
}

impl SystemClock {
    /// A clock counting whole seconds since the Unix epoch, saturating at
    /// `u32::MAX` rather than panicking past 2106.
    pub fn new() -> Self {
        Self { epoch: UNIX_EPOCH }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Tick {
        let secs = SystemTime::now()
            .duration_since(self.epoch)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Tick(secs.min(u32::MAX as u64) as u32)
    }

    fn source(&self) -> ClockSource {
        SELECTED_SOURCE
    }
}
