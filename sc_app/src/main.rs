//! Stored Command daemon: bus wiring, dispatcher, tick loop (spec.md §5).
//!
//! No CLI (spec.md §6): deployment configuration is a TOML file, located
//! by the `SC_CONFIG_PATH` environment variable and defaulting to
//! [`DEFAULT_CONFIG_PATH`]. The one-hertz wakeup and housekeeping-request
//! messages are generated in-process (spec.md §1: the real message-bus
//! transport is an external collaborator this daemon doesn't implement).

mod adapters;
mod clock;
mod dispatch;

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use sc_common::bus::{CommandSource, RawMessage};
use sc_common::config::{self, DeploymentConfig};
use sc_common::ids::RtsId;
use sc_common::time::Clock;
use sc_core::engine::Engine;

use adapters::{ChannelCommandSource, LoopbackBus, LoopbackTableService, TracingEventSink};
use clock::SystemClock;
use dispatch::Dispatcher;

/// Default configuration path, overridable by `SC_CONFIG_PATH`.
const DEFAULT_CONFIG_PATH: &str = "/etc/sc/sc.toml";

/// Selects which configured autostart RTS id applies (spec.md §4.7
/// Autostart: "selected by reset type"). Read from `SC_RESET_TYPE`;
/// defaults to power-on, matching a cold start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResetType {
    PowerOn,
    Processor,
}

fn reset_type_from_env() -> ResetType {
    match std::env::var("SC_RESET_TYPE").as_deref() {
        Ok("processor") => ResetType::Processor,
        _ => ResetType::PowerOn,
    }
}

fn load_config() -> DeploymentConfig {
    let path = std::env::var("SC_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    match config::load_config_from_path(std::path::Path::new(&path)) {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::error!("failed to load configuration from {}: {}", path, err);
            std::process::exit(1);
        }
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let config = load_config();
    tracing::info!("{} starting", config.service_name);

    let mut engine = Engine::new(&config);
    let reset_type = reset_type_from_env();
    let autostart = match reset_type {
        ResetType::PowerOn => config.autostart_rts_power_on,
        ResetType::Processor => config.autostart_rts_processor_reset,
    };
    engine.set_autostart(autostart.and_then(RtsId::new));
    tracing::info!("reset type: {:?}, autostart RTS: {:?}", reset_type, autostart);

    let mut bus = LoopbackBus::new(config.self_mid);
    let mut table_service = LoopbackTableService::new();
    let mut sink = TracingEventSink;
    let clock = SystemClock::new();

    let (tx, rx) = mpsc::channel();
    spawn_wakeup_driver(tx.clone(), config.wakeup_mid);
    spawn_housekeeping_driver(tx, config.housekeeping_request_mid);

    let mut source = ChannelCommandSource::new(rx, Duration::from_millis(1500));

    loop {
        let Some(msg) = source.recv_timeout() else {
            if source.is_disconnected() {
                tracing::error!("command pipe disconnected, shutting down");
                break;
            }
            // Bounded-timeout receive: a plain timeout is a normal no-op
            // (spec.md §5), not an error — just wait for the next message.
            continue;
        };
        let now = clock.now();
        let mut dispatcher = Dispatcher { engine: &mut engine, config: &config };
        dispatcher.handle(msg, &mut bus, &mut table_service, &mut sink, now);
    }
}

/// Feeds a wakeup message onto the pipe every second — the daemon's own
/// one-hertz driver (spec.md §4.8). A real deployment subscribes to an
/// external 1Hz message instead of generating its own.
fn spawn_wakeup_driver(tx: mpsc::Sender<RawMessage>, wakeup_mid: u16) {
    thread::spawn(move || loop {
        thread::sleep(Duration::from_secs(1));
        if tx.send(RawMessage { message_id: wakeup_mid, words: vec![0] }).is_err() {
            return;
        }
    });
}

/// Feeds a housekeeping-request message every four seconds, a typical
/// quarter-rate telemetry cadence.
fn spawn_housekeeping_driver(tx: mpsc::Sender<RawMessage>, hk_mid: u16) {
    thread::spawn(move || loop {
        thread::sleep(Duration::from_secs(4));
        if tx.send(RawMessage { message_id: hk_mid, words: vec![0] }).is_err() {
            return;
        }
    });
}
