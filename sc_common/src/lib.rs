//! Shared types for the Stored Command engine.
//!
//! This crate provides the identifiers, wire formats, build-time limits,
//! and collaborator traits used by both the sequence execution engine
//! (`sc_core`) and the daemon that hosts it (`sc_app`). It owns no
//! behavior of its own beyond type conversions and validation that is
//! independent of engine state.
//!
//! # Module Structure
//!
//! - [`ids`] - 1-based/0-based typed identifiers (`AtsId`, `RtsId`, `CmdNum`, `EntryOffset`)
//! - [`limits`] - compile-time table sizes and rate caps
//! - [`time`] - absolute/relative time types and the [`Clock`] trait
//! - [`status`] - per-entry and per-processor status/state enumerations
//! - [`wire`] - binary entry header layouts for ATS/RTS buffers
//! - [`bus`] - collaborator traits: [`bus::MessageBus`], [`bus::EventSink`], [`bus::TableService`]
//! - [`error`] - the engine's error enumeration
//! - [`config`] - deployment configuration (message ids, clock source, autostart)
//! - [`prelude`] - common re-exports

pub mod bus;
pub mod config;
pub mod error;
pub mod ids;
pub mod limits;
pub mod prelude;
pub mod status;
pub mod time;
pub mod wire;
