//! Common re-exports, mirroring the teacher's `evo_common::prelude`.

pub use crate::bus::{
    BusError, CommandSource, EngineEvent, EventSink, InlineCommand, MessageBus, RawMessage, SequenceRef, TableId,
    TableService,
};
pub use crate::config::{ConfigError, DeploymentConfig, LogLevel};
pub use crate::error::{AppendError, AtsVerifyError, EngineError, RtsVerifyError};
pub use crate::ids::{AtsId, CmdNum, EntryOffset, RtsId};
pub use crate::limits::*;
pub use crate::status::{AtpState, CmdStatus, RtsStatus};
pub use crate::time::{Clock, ClockSource, ManualClock, Tick};
