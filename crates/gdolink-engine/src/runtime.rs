//! Tokio adapter for the poll loop.
//!
//! The engine itself is synchronous; hosts that live on an async runtime
//! drive it with [`run_poll_loop`], which ticks at a fixed cadence until
//! told to shut down through a watch channel.
//!
//! ```no_run
//! use gdolink_engine::{Engine, EngineConfig, run_poll_loop, DEFAULT_POLL_PERIOD};
//! use gdolink_hardware::{LoopbackTransport, MemoryPreferences, PulseCounter};
//! use tokio::sync::watch;
//!
//! # async fn example() {
//! let (transport, _handle) = LoopbackTransport::new();
//! let mut engine = Engine::new(
//!     transport,
//!     MemoryPreferences::new(),
//!     PulseCounter::new(),
//!     EngineConfig::default(),
//! );
//! engine.setup();
//!
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! // Keep shutdown_tx wherever the host decides to stop (signal handler,
//! // supervisor, test harness) and send `true` when it is time.
//! run_poll_loop(&mut engine, DEFAULT_POLL_PERIOD, shutdown_rx).await;
//! drop(shutdown_tx);
//! # }
//! ```

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

use gdolink_hardware::{PreferenceStore, SerialTransport};

use crate::engine::Engine;

/// Default tick cadence; comfortably faster than the shortest engine
/// sampling period.
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_millis(20);

/// Tick `engine` every `period` until `shutdown` turns true (or its
/// sender is dropped).
pub async fn run_poll_loop<T, P>(
    engine: &mut Engine<T, P>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) where
    T: SerialTransport,
    P: PreferenceStore,
{
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => engine.tick(),
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("poll loop shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use gdolink_hardware::{LoopbackTransport, MemoryPreferences, PulseCounter};

    #[tokio::test]
    async fn test_poll_loop_ticks_and_shuts_down() {
        let (transport, handle) = LoopbackTransport::new();
        let mut engine = Engine::new(
            transport,
            MemoryPreferences::new(),
            PulseCounter::new(),
            EngineConfig::default(),
        );
        engine.setup();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            shutdown_tx.send(true).ok();
        });

        run_poll_loop(&mut engine, Duration::from_millis(5), shutdown_rx).await;

        // The sync issued by setup() must have reached the wire.
        assert!(!handle.sent_frames().is_empty());
    }

    #[tokio::test]
    async fn test_poll_loop_stops_when_sender_dropped() {
        let (transport, _handle) = LoopbackTransport::new();
        let mut engine = Engine::new(
            transport,
            MemoryPreferences::new(),
            PulseCounter::new(),
            EngineConfig::default(),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        drop(shutdown_tx);

        // Must return promptly rather than loop forever.
        tokio::time::timeout(
            Duration::from_secs(1),
            run_poll_loop(&mut engine, Duration::from_millis(5), shutdown_rx),
        )
        .await
        .expect("poll loop did not stop");
    }
}
