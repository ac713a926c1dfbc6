//! # msync
//!
//! Motor synchronization service. Keeps one or two drives at the speed
//! commanded on `motion/set_rpm`, reports position on `server/position` and
//! stops everything for good on a desync.
//!
//! Bus: the MQTT broker on `localhost:1883` by default, `--bus local` for an
//! in-process bus nothing else can reach.
//!
//! Configuration: `--config <FILE>` (default `/etc/msync/msync.toml` when it
//! exists, built-in defaults otherwise), then CLI / environment overrides.

use clap::Parser;
use clap::builder::FalseyValueParser;
use msync_bus::BusNotifier;
use msync_common::config::{BusKind, ChannelConfig, ConfigLoader, MsyncConfig};
use msync_common::consts::DEFAULT_CONFIG_PATH;
use msync_control::cycle::PollCycle;
use msync_control::listener::CommandListener;
use msync_control::state::ControlState;
use msync_control::supervisor::{Supervisor, fatal_cooldown};
use msync_drive::DriverRegistry;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// msync: dual-drive motor synchronization service
#[derive(Parser, Debug)]
#[command(name = "msync")]
#[command(version)]
#[command(about = "Keeps motor drives in lock-step and reports their position")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Device path of the first drive.
    #[arg(long, env = "MSYNC_MOTOR1", value_name = "PATH")]
    motor1: Option<String>,

    /// Device path of the second drive.
    #[arg(long, env = "MSYNC_MOTOR2", value_name = "PATH")]
    motor2: Option<String>,

    /// Drive only the first motor (no divergence check).
    #[arg(long, env = "MSYNC_SINGLE_MOTOR", value_parser = FalseyValueParser::new())]
    single_motor: bool,

    /// Message bus backend: `mqtt` or `local`.
    #[arg(long, env = "MSYNC_BUS", value_name = "KIND")]
    bus: Option<BusKind>,

    /// MQTT broker host.
    #[arg(long, env = "MSYNC_MQTT_HOST", value_name = "HOST")]
    mqtt_host: Option<String>,

    /// MQTT broker port.
    #[arg(long, env = "MSYNC_MQTT_PORT", value_name = "PORT")]
    mqtt_port: Option<u16>,

    /// Drive driver to use (see `--list-drivers`).
    #[arg(long)]
    driver: Option<String>,

    /// List registered drivers and exit.
    #[arg(long)]
    list_drivers: bool,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long, env = "MSYNC_DEBUG", value_parser = FalseyValueParser::new())]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let loaded = load_config(&args);

    let level = match (&loaded, args.verbose) {
        (_, true) => "debug",
        (Ok(config), false) => config.shared.log_level.as_directive(),
        (Err(_), false) => "info",
    };
    setup_tracing(level, args.json);

    info!("msync v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!("FATAL: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run(&args, &config) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("msync shutdown complete");
}

fn run(args: &Args, config: &MsyncConfig) -> Result<(), Box<dyn std::error::Error>> {
    let registry = DriverRegistry::with_builtin()?;
    if args.list_drivers {
        for name in registry.list_drivers() {
            println!("{name}");
        }
        return Ok(());
    }

    let driver = registry.create_driver(&config.sync.driver, config)?;
    let running = Arc::new(AtomicBool::new(true));
    let state = Arc::new(ControlState::from_config(
        &config.sync,
        driver,
        Arc::clone(&running),
    )?);

    let bus = msync_bus::connect(&config.bus)?;
    info!("Message bus: {}", config.bus.kind);
    let notifier = BusNotifier::new(Arc::clone(&bus));

    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let mut supervisor = Supervisor::new(Arc::clone(&running));

    let mut cycle = PollCycle::from_config(&config.sync, Arc::clone(&state), notifier);
    supervisor.spawn("poll cycle", move || {
        cycle.run();
        Ok(())
    })?;

    let mut listener = CommandListener::from_config(&config.sync, Arc::clone(&state), bus);
    supervisor.spawn("command listener", move || {
        listener.run();
        Ok(())
    })?;

    info!("{} running", config.shared.service_name);

    match supervisor.wait() {
        Ok(()) => {
            state.stop_all();
            info!("All motors stopped");
            Ok(())
        }
        Err(e) => {
            state.stop_all();
            let interactive = std::env::var_os("SHELL").is_some();
            let cooldown = fatal_cooldown(interactive, config.sync.fatal_cooldown());
            if !cooldown.is_zero() {
                warn!("Waiting {} s before exit", cooldown.as_secs());
                std::thread::sleep(cooldown);
            }
            Err(e.into())
        }
    }
}

/// Load the configuration file and apply CLI / environment overrides.
fn load_config(args: &Args) -> Result<MsyncConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => MsyncConfig::load(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            MsyncConfig::load(Path::new(DEFAULT_CONFIG_PATH))?
        }
        None => MsyncConfig::default(),
    };

    let sync = &mut config.sync;
    for (index, address) in [&args.motor1, &args.motor2].into_iter().enumerate() {
        let Some(address) = address else { continue };
        if let Some(channel) = sync.channels.get_mut(index) {
            channel.address.clone_from(address);
        } else if sync.channels.len() == index {
            let name = format!("Motor{}", index + 1);
            sync.channels.push(ChannelConfig::new(name, address.as_str()));
        } else {
            return Err(format!("motor{} given without motor{}", index + 1, index).into());
        }
    }
    if args.single_motor {
        sync.single_motor = true;
    }
    if let Some(driver) = &args.driver {
        sync.driver.clone_from(driver);
    }

    let bus = &mut config.bus;
    if let Some(kind) = args.bus {
        bus.kind = kind;
    }
    if let Some(host) = &args.mqtt_host {
        bus.host.clone_from(host);
    }
    if let Some(port) = args.mqtt_port {
        bus.port = port;
    }

    config.validate()?;
    Ok(config)
}

/// Setup tracing subscriber. `RUST_LOG` takes precedence over `level`.
fn setup_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
