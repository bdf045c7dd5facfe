//! # PTZ Session Daemon
//!
//! Owns the pan/tilt motor device, serializes access to it for clients
//! talking over a Unix socket, and keeps per-session speed and axis
//! inversion across requests.
//!
//! # Usage
//!
//! ```bash
//! # Run against real hardware with the default config
//! ptzd
//!
//! # Run with the simulation backend
//! ptzd --simulate
//!
//! # Explicit paths, verbose logging
//! ptzd --device /dev/motor --socket /run/ptzd.sock -v
//! ```

#![deny(warnings)]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use ptz_common::config::{ConfigError, DaemonConfig};
use ptz_common::stopflag::StopFlag;
use ptz_daemon::device::IoctlMotor;
use ptz_daemon::dispatch::Dispatcher;
use ptz_daemon::motion::MotionController;
use ptz_daemon::pidfile::PidFile;
use ptz_daemon::server::Server;
use ptz_daemon::session::SessionState;
use ptz_daemon::sim::SimMotor;

/// PTZ session daemon - serializes access to the pan/tilt motor device
#[derive(Parser, Debug)]
#[command(name = "ptzd")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Pan/tilt motor session daemon")]
#[command(long_about = None)]
struct Args {
    /// Path to the daemon configuration file
    #[arg(short, long, default_value = "/etc/ptz/ptzd.toml")]
    config: PathBuf,

    /// Motor device path (overrides the config file)
    #[arg(long, value_name = "PATH")]
    device: Option<PathBuf>,

    /// Request socket path (overrides the config file)
    #[arg(long, value_name = "PATH")]
    socket: Option<PathBuf>,

    /// Use the simulation backend instead of real hardware
    #[arg(short = 's', long)]
    simulate: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("daemon startup failed: {e}");
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    setup_tracing(&args);

    info!("ptzd v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = load_config(&args)?;
    if let Some(device) = args.device {
        config.device_path = device;
    }
    if let Some(socket) = args.socket {
        config.socket_path = socket;
    }

    // Single-instance lock; held until shutdown.
    let _pidfile = PidFile::acquire(&config.pid_path)?;

    // Acquire the motor device. Failure is survivable: the daemon keeps
    // serving so clients get a clear "device unavailable" behavior instead
    // of a missing socket.
    let device: Option<Box<dyn ptz_daemon::device::MotorDevice>> = if args.simulate {
        info!("simulation backend selected");
        Some(Box::new(SimMotor::new()))
    } else {
        match IoctlMotor::open(&config.device_path) {
            Ok(motor) => Some(Box::new(motor)),
            Err(e) => {
                warn!("serving without a device handle: {e}");
                None
            }
        }
    };

    let mut motion = MotionController::new(device, config.poll_interval());

    // Re-home the counters once at startup, like a fresh power-on.
    info!("resetting position, please wait");
    if let Err(e) = motion.reset() {
        warn!("startup reset failed: {e}");
    }

    let mut dispatcher = Dispatcher::new(
        SessionState::new(config.default_speed),
        motion,
        StopFlag::default(),
    );

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            info!("received shutdown signal");
            running.store(false, Ordering::SeqCst);
        })?;
    }

    let server = Server::bind(&config.socket_path)?;
    info!("ptzd started");

    server.serve(&mut dispatcher, &running)?;

    info!("ptzd shutdown complete");
    Ok(())
}

/// Load the configuration file; a missing file means defaults.
fn load_config(args: &Args) -> Result<DaemonConfig, ConfigError> {
    match DaemonConfig::load(&args.config) {
        Ok(config) => {
            info!("loaded configuration from {}", args.config.display());
            Ok(config)
        }
        Err(ConfigError::FileNotFound) => {
            info!(
                "no configuration file at {}, using defaults",
                args.config.display()
            );
            Ok(DaemonConfig::default())
        }
        Err(e) => Err(e),
    }
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
