//! Protocol engine for Security+ 2.0 door openers.
//!
//! [`Engine`] ties the wire codec, the rolling-code state and the hardware
//! boundaries together behind a single cooperative poll loop: every call
//! to [`Engine::tick`] drains the serial line, runs due deadline timers,
//! samples the obstruction counter and door position on their cadences,
//! and flushes at most one queued frame to the bus.
//!
//! Host applications issue commands (`open_door`, `set_ttc_sec`, ...) and
//! register per-field subscriptions; all domain state updates flow through
//! equality-gated observables, so subscribers fire exactly once per actual
//! change.

pub mod config;
pub mod engine;
pub mod motion;
pub mod runtime;
pub mod timers;
pub mod transmit;

pub use config::EngineConfig;
pub use engine::Engine;
pub use motion::{DoorTravel, TravelDirection};
pub use runtime::{DEFAULT_POLL_PERIOD, run_poll_loop};
pub use timers::{TimerId, Timers};
pub use transmit::TransmitQueue;
