//! # PTZ Client
//!
//! Thin command-line client for the session daemon. Flags map one-to-one
//! onto request fields; the daemon replies with a full status snapshot for
//! queries and this tool picks the fields to show.
//!
//! # Usage
//!
//! ```bash
//! # Step 100 right, 20 up, at 500 steps/s
//! ptzctl -d g -x 100 -y 20 -s 500
//!
//! # Absolute position, pan axis only
//! ptzctl -d h -x 2000
//!
//! # Queries
//! ptzctl -S          # text status
//! ptzctl -j          # status JSON
//! ptzctl -p          # "x,y"
//! ptzctl -b          # exit 1 while moving
//!
//! # Stop, even when another process is driving the motors
//! ptzctl -d s
//! ```
//!
//! Exit codes: 0 on success, 1 on connect/transport failure, on a device
//! that cannot be reached, or when the busy probe finds the motors moving.

#![deny(warnings)]

mod output;

use std::fs::OpenOptions;
use std::io;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::thread;

use clap::Parser;
use thiserror::Error;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

use ptz_common::consts::{DEFAULT_DEVICE_PATH, DEFAULT_SOCKET_PATH, STOP_POLL_INTERVAL};
use ptz_common::protocol::{self, Command, MoveType, ProtocolError, Request};
use ptz_common::stopflag::{StopFlag, StopFlagError};
use ptz_common::types::{InvertAxis, MotorStatus};

/// PTZ client - command the pan/tilt motor session daemon
#[derive(Parser, Debug)]
#[command(name = "ptzctl")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Command-line client for the pan/tilt motor daemon")]
#[command(long_about = None)]
struct Args {
    /// Movement: g relative steps, h absolute position, c cruise,
    /// b go back, s stop
    #[arg(short = 'd', long = "direction", value_name = "TYPE")]
    direction: Option<char>,

    /// Pan steps or position
    #[arg(short, allow_negative_numbers = true)]
    x: Option<i32>,

    /// Tilt steps or position
    #[arg(short, allow_negative_numbers = true)]
    y: Option<i32>,

    /// Step speed [steps/s]; alone (no -d) it updates the session speed
    #[arg(short, long)]
    speed: Option<u32>,

    /// Reset the position counters
    #[arg(short, long)]
    reset: bool,

    /// Print a status summary
    #[arg(short = 'S', long)]
    status: bool,

    /// Print status as JSON
    #[arg(short, long)]
    json: bool,

    /// Print all startup parameters as JSON
    #[arg(short, long)]
    initial: bool,

    /// Print the current position as "x,y"
    #[arg(short, long)]
    position: bool,

    /// Exit 1 if the motors are moving, 0 if idle (no output)
    #[arg(short, long)]
    busy: bool,

    /// Toggle axis inversion for the daemon session
    #[arg(long, value_enum, value_name = "AXIS")]
    invert: Option<InvertArg>,

    /// Verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Daemon request socket
    #[arg(long, default_value = DEFAULT_SOCKET_PATH, value_name = "PATH")]
    socket: PathBuf,

    /// Motor device path (used by the stop fallback)
    #[arg(long, default_value = DEFAULT_DEVICE_PATH, value_name = "PATH")]
    device: PathBuf,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
enum InvertArg {
    X,
    Y,
    Both,
}

impl From<InvertArg> for InvertAxis {
    fn from(arg: InvertArg) -> Self {
        match arg {
            InvertArg::X => Self::X,
            InvertArg::Y => Self::Y,
            InvertArg::Both => Self::Both,
        }
    }
}

/// Client-side failures. Every variant ends in a message and exit code 1.
#[derive(Debug, Error)]
enum ClientError {
    /// The daemon socket is unreachable.
    #[error("cannot connect to the daemon at {path} ({source}); is ptzd running?")]
    Connect {
        /// Socket path tried.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// Writing the request failed mid-stream.
    #[error("failed to send request: {0}")]
    Send(io::Error),

    /// The reply was missing or malformed.
    #[error("no usable reply from the daemon: {0}")]
    Reply(#[from] ProtocolError),

    /// Stop flag manipulation failed.
    #[error(transparent)]
    StopFlag(#[from] StopFlagError),

    /// The stop fallback has no device to wait on.
    #[error("motor device {path} does not exist")]
    DeviceMissing {
        /// Device path tried.
        path: PathBuf,
    },

    /// Direction letter outside the contract.
    #[error("invalid direction '{0}' (expected g, h, c, b or s)")]
    BadDirection(char),
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    match run(&args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("ptzctl: {e}");
            std::process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<i32, ClientError> {
    let request = build_request(args)?;

    let mut stream = match UnixStream::connect(&args.socket) {
        Ok(stream) => stream,
        Err(source) => {
            if is_external_stop(&request) {
                // No daemon to ask, but another process may be driving the
                // motors; fall back to the out-of-band stop signal.
                info!("daemon unreachable, falling back to the stop flag");
                request_stop(&args.device)?;
                return Ok(0);
            }
            return Err(ClientError::Connect {
                path: args.socket.clone(),
                source,
            });
        }
    };

    protocol::write_request(&mut stream, &request).map_err(ClientError::Send)?;
    if !request.command.expects_reply() {
        return Ok(0);
    }

    let status = protocol::read_reply(&mut stream)?;
    Ok(render(args, &request, &status))
}

/// Map the parsed flags onto one request.
///
/// Queries win over state-changing flags, mirroring the original tool
/// where query options replied and exited during argument parsing.
fn build_request(args: &Args) -> Result<Request, ClientError> {
    if args.busy {
        return Ok(Request::query(Command::QueryBusy));
    }
    if args.json {
        return Ok(Request::query(Command::QueryStatus));
    }
    if args.initial {
        return Ok(Request::query(Command::QueryInitial));
    }
    if args.position {
        return Ok(Request::query(Command::QueryPosition));
    }
    if args.status {
        return Ok(Request::query(Command::QueryStatus));
    }
    if args.reset {
        return Ok(Request::reset());
    }
    if let Some(axis) = args.invert {
        return Ok(Request::invert(axis.into()));
    }
    if args.direction.is_none()
        && let Some(speed) = args.speed
    {
        return Ok(Request::set_speed(speed));
    }

    // No explicit command means stop, as it always has.
    match args.direction.unwrap_or('s') {
        'g' => Ok(Request::move_relative(
            args.x.unwrap_or(0),
            args.y.unwrap_or(0),
            args.speed,
        )),
        'h' => Ok(Request::move_absolute(args.x, args.y, args.speed)),
        'c' => Ok(Request::cruise(args.speed)),
        'b' => Ok(Request::go_back(args.speed)),
        's' => Ok(Request::stop_motion()),
        other => Err(ClientError::BadDirection(other)),
    }
}

/// A stop request that may target motion owned by another process.
fn is_external_stop(request: &Request) -> bool {
    request.command == Command::Move && request.move_type == MoveType::Stop
}

/// Requester side of the stop signal: raise the flag, then wait for the
/// device to come free, the only acknowledgment this channel has.
/// Blocks until the owning process lets go.
fn request_stop(device: &Path) -> Result<(), ClientError> {
    let flag = StopFlag::default();
    flag.ensure_present()?;
    info!("stop flag raised, waiting for the motor device to come free");

    loop {
        match OpenOptions::new().read(true).open(device) {
            Ok(_handle) => break,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // Nobody will ever observe this flag; take it back down.
                let _ = flag.ensure_absent();
                return Err(ClientError::DeviceMissing {
                    path: device.to_owned(),
                });
            }
            Err(_) => thread::sleep(STOP_POLL_INTERVAL),
        }
    }

    flag.ensure_absent()?;
    info!("motor device released");
    Ok(())
}

/// Format the reply per the query mode. Returns the process exit code.
fn render(args: &Args, request: &Request, status: &MotorStatus) -> i32 {
    match request.command {
        Command::QueryBusy => {
            // The exit code is the entire output: 1 while moving.
            i32::from(status.is_moving())
        }
        Command::QueryPosition => {
            println!("{}", output::xy_pos(status));
            0
        }
        Command::QueryInitial => {
            println!("{}", output::json_initial(status));
            0
        }
        Command::QueryStatus if args.json => {
            println!("{}", output::json_status(status));
            0
        }
        Command::QueryStatus => {
            print!("{}", output::show_status(status));
            0
        }
        _ => 0,
    }
}

/// Verbose mode logs to stderr so query output on stdout stays parseable.
fn setup_tracing(args: &Args) {
    if !args.verbose {
        return;
    }
    let filter = EnvFilter::from_default_env().add_directive(Level::DEBUG.into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cli: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("ptzctl").chain(cli.iter().copied())).unwrap()
    }

    #[test]
    fn queries_win_over_moves() {
        let request = build_request(&args(&["-b", "-d", "g", "-x", "10"])).unwrap();
        assert_eq!(request.command, Command::QueryBusy);
    }

    #[test]
    fn relative_move_flags_map_onto_the_request() {
        let request = build_request(&args(&["-d", "g", "-x", "100", "-y", "-20", "-s", "500"]))
            .unwrap();
        assert_eq!(request.command, Command::Move);
        assert_eq!(request.move_type, MoveType::RelativeSteps);
        assert_eq!((request.x, request.y), (100, -20));
        assert_eq!(request.speed, Some(500));
    }

    #[test]
    fn absolute_move_keeps_omitted_axes_unset() {
        let request = build_request(&args(&["-d", "h", "-x", "2000"])).unwrap();
        assert_eq!(request.move_type, MoveType::AbsolutePosition);
        assert!(request.x_supplied);
        assert!(!request.y_supplied);
    }

    #[test]
    fn bare_speed_becomes_a_set_speed_request() {
        let request = build_request(&args(&["-s", "400"])).unwrap();
        assert_eq!(request.command, Command::SetSpeed);
        assert_eq!(request.speed, Some(400));
    }

    #[test]
    fn no_flags_means_stop() {
        let request = build_request(&args(&[])).unwrap();
        assert!(is_external_stop(&request));
    }

    #[test]
    fn unknown_direction_is_rejected() {
        let err = build_request(&args(&["-d", "q"])).unwrap_err();
        assert!(matches!(err, ClientError::BadDirection('q')));
    }

    #[test]
    fn invert_flag_selects_the_axis() {
        let request = build_request(&args(&["--invert", "y"])).unwrap();
        assert_eq!(request.command, Command::Invert);
        assert_eq!(request.invert_axis(), InvertAxis::Y);
    }
}
