//! Bus monitor for development and installation debugging.
//!
//! Runs the protocol engine against a serial device (with the
//! `hardware-serial` feature) or an inert loopback for a dry run, and
//! logs every observable state change.
//!
//! ```text
//! gdolink [--device /dev/ttyUSB0] [--prefs ~/.gdolink.json]
//! ```

use anyhow::{Context, Result, bail};
use tokio::sync::watch;
use tracing::info;

use gdolink_engine::{DEFAULT_POLL_PERIOD, Engine, EngineConfig, run_poll_loop};
use gdolink_hardware::{FilePreferences, PreferenceStore, PulseCounter, SerialTransport};

struct Args {
    device: Option<String>,
    prefs: String,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        device: None,
        prefs: "gdolink-prefs.json".to_string(),
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--device" => {
                args.device = Some(iter.next().context("--device needs a path")?);
            }
            "--prefs" => {
                args.prefs = iter.next().context("--prefs needs a path")?;
            }
            "--help" | "-h" => {
                eprintln!("usage: gdolink [--device <serial-device>] [--prefs <file>]");
                std::process::exit(0);
            }
            other => bail!("unrecognized argument: {other}"),
        }
    }
    Ok(args)
}

fn subscribe_logging<T, P>(engine: &mut Engine<T, P>)
where
    T: SerialTransport,
    P: PreferenceStore,
{
    engine.subscribe_door_state(|state, position| {
        info!(%state, position, "door");
    });
    engine.subscribe_light_state(|state| info!(%state, "light"));
    engine.subscribe_lock_state(|state| info!(%state, "lock"));
    engine.subscribe_hold_state(|state| info!(%state, "hold"));
    engine.subscribe_obstruction_state(|state| info!(%state, "obstruction"));
    engine.subscribe_motor_state(|state| info!(%state, "motor"));
    engine.subscribe_button_state(|state| info!(%state, "button"));
    engine.subscribe_motion_state(|state| info!(%state, "motion"));
    engine.subscribe_ttc_seconds(|secs| info!(secs, "time-to-close"));
    engine.subscribe_openings(|count| info!(count, "openings"));
    engine.subscribe_opening_duration(|secs| info!(secs, "opening duration calibrated"));
    engine.subscribe_closing_duration(|secs| info!(secs, "closing duration calibrated"));
    engine.subscribe_sync_failed(|failed| {
        if failed {
            tracing::warn!("sync failed; check wiring and rolling code state");
        }
    });
}

async fn run<T>(transport: T, prefs: FilePreferences) -> Result<()>
where
    T: SerialTransport,
{
    let mut engine = Engine::new(
        transport,
        prefs,
        PulseCounter::new(),
        EngineConfig::default(),
    );
    subscribe_logging(&mut engine);
    engine.setup();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutting down");
        shutdown_tx.send(true).ok();
    });

    run_poll_loop(&mut engine, DEFAULT_POLL_PERIOD, shutdown_rx).await;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = parse_args()?;
    let prefs = FilePreferences::new(&args.prefs);

    match args.device {
        #[cfg(feature = "hardware-serial")]
        Some(device) => {
            let transport = gdolink_hardware::UartTransport::open(&device)
                .with_context(|| format!("opening {device}"))?;
            info!(device = %device, "monitoring bus");
            run(transport, prefs).await
        }
        #[cfg(not(feature = "hardware-serial"))]
        Some(_) => {
            bail!("built without the hardware-serial feature; rebuild with --features hardware-serial")
        }
        None => {
            info!("no device given; dry run against a loopback transport");
            let (transport, _handle) = gdolink_hardware::LoopbackTransport::new();
            run(transport, prefs).await
        }
    }
}
