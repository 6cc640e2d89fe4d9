//! # RC Link
//!
//! Runs one end of the RC link over a serial radio adapter, or both ends
//! against each other in-process.
//!
//! ```bash
//! rc-link [CONFIG] [--loopback]
//! ```
//!
//! Expected output (loopback):
//! ```text
//! INFO rc_link: RC Link v0.1.0 starting...
//! INFO rc_link: Running ground and aircraft in loopback at 50Hz
//! INFO rc_link::link::tracker: Link restored (seq=0)
//! ```

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use rc_link::config::Config;
use rc_link::error::RcLinkError;
use rc_link::link::{ChannelTransport, RcLink, Role, SystemClock};
use rc_link::protocol::PacketCodec;
use rc_link::serial::{run_bridge, RadioSerial};
use rc_link::telemetry::{StatsLogger, StatsRecord};

/// Config file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// File name prefix of the daily application log
const APP_LOG_PREFIX: &str = "rc-link.log";

/// Number of ticks between status log messages
const STATUS_INTERVAL_TICKS: u64 = 500;

/// Neutral stick value of the demo command stream
const CHANNEL_CENTER: u16 = 1024;

type Link = RcLink<ChannelTransport, SystemClock>;

#[derive(Debug, PartialEq, Eq)]
struct Args {
    config_path: String,
    loopback: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Args {
    let mut parsed = Args {
        config_path: DEFAULT_CONFIG_PATH.to_string(),
        loopback: false,
    };

    for arg in args {
        if arg == "--loopback" {
            parsed.loopback = true;
        } else {
            parsed.config_path = arg;
        }
    }

    parsed
}

/// Console logging plus, when telemetry is enabled, a daily-rolling file
/// in the telemetry log directory. The guard must outlive the runtime.
fn init_logging(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = if config.telemetry.enabled {
        let appender = tracing_appender::rolling::daily(&config.telemetry.log_dir, APP_LOG_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

/// Eight little-endian channels, switches and mode. Throttle sweeps slowly.
fn demo_command(tick: u64, payload_size: usize) -> Vec<u8> {
    let throttle = ((tick * 4) % 2048) as u16;
    let channels = [
        CHANNEL_CENTER,
        CHANNEL_CENTER,
        throttle,
        CHANNEL_CENTER,
        CHANNEL_CENTER,
        CHANNEL_CENTER,
        CHANNEL_CENTER,
        CHANNEL_CENTER,
    ];

    let mut command: Vec<u8> = channels.iter().flat_map(|c| c.to_le_bytes()).collect();
    command.extend_from_slice(&[0, 0]);
    command.resize(payload_size, 0);
    command
}

/// Telemetry echoing the last command's throttle, padded to `payload_size`
fn demo_telemetry(last_command: &[u8], payload_size: usize) -> Vec<u8> {
    let mut telemetry = vec![0u8; payload_size];
    let n = last_command.len().min(payload_size).min(6);
    telemetry[..n].copy_from_slice(&last_command[..n]);
    telemetry
}

/// One end of the link plus the application state around it
struct Station {
    link: Link,
    command_size: usize,
    telemetry_size: usize,
    last_command: Vec<u8>,
    ticks: u64,
}

impl Station {
    fn new(role: Role, config: &Config, transport: ChannelTransport, clock: SystemClock) -> Result<Self> {
        let codec = PacketCodec::new(config.link.protocol_version);
        let mut link = RcLink::new(role, codec, config.link.tracker_config(), transport, clock);
        link.set_failsafe(&config.failsafe.command)?;

        Ok(Self {
            link,
            command_size: config.link.command_payload_size,
            telemetry_size: config.link.telemetry_payload_size,
            last_command: config.failsafe.command.clone(),
            ticks: 0,
        })
    }

    fn step(&mut self) {
        self.ticks += 1;

        // The tracker logs loss and recovery itself
        if let Some(event) = self.link.update() {
            debug!("{} link event: {:?}", self.link.role(), event);
        }

        match self.link.role() {
            Role::Ground => self.step_ground(),
            Role::Aircraft => self.step_aircraft(),
        }

        if self.ticks % STATUS_INTERVAL_TICKS == 0 {
            info!(
                "{}: active={} failsafe={} stats={:?}",
                self.link.role(),
                self.link.is_active(),
                self.link.failsafe_engaged(),
                self.link.stats()
            );
        }
    }

    fn step_ground(&mut self) {
        let command = demo_command(self.ticks, self.command_size);
        if let Err(e) = self.link.send_command(&command) {
            debug!("Failed to send command: {}", e);
        }

        loop {
            match self.link.receive_telemetry(self.telemetry_size) {
                Ok(telemetry) => debug!("Telemetry: {:02X?}", telemetry),
                Err(RcLinkError::NoData) => break,
                Err(e) => debug!("Telemetry rejected: {}", e),
            }
        }
    }

    fn step_aircraft(&mut self) {
        match self.link.receive_command_with_failsafe(self.command_size) {
            Ok(command) => self.last_command = command,
            Err(RcLinkError::NoData) => {}
            Err(e) => debug!("Command rejected: {}", e),
        }

        // Emergency from the ground: fly the failsafe values
        if self.link.take_emergency() {
            self.last_command = self.link.failsafe().to_vec();
        }

        let telemetry = demo_telemetry(&self.last_command, self.telemetry_size);
        if let Err(e) = self.link.send_telemetry(&telemetry) {
            debug!("Failed to send telemetry: {}", e);
        }
    }
}

/// Both roles wired to each other through in-memory channels
fn loopback_stations(config: &Config) -> Result<Vec<Station>> {
    let (ground_radio, aircraft_radio) = ChannelTransport::pair(config.serial.channel_capacity);
    let clock = SystemClock::new();

    Ok(vec![
        Station::new(Role::Ground, config, ground_radio, clock)?,
        Station::new(Role::Aircraft, config, aircraft_radio, clock)?,
    ])
}

/// The configured role behind the serial radio adapter
fn serial_station(config: &Config) -> Result<Station> {
    let serial = RadioSerial::open_configured(&config.serial.port, config.serial.baud_rate)?;
    info!("Radio adapter opened at: {}", serial.device_path());

    let capacity = config.serial.channel_capacity;
    let (out_tx, out_rx) = mpsc::channel(capacity);
    let (in_tx, in_rx) = mpsc::channel(capacity);

    tokio::spawn(async move {
        match run_bridge(serial.into_stream(), out_rx, in_tx).await {
            Ok(stats) => info!("Serial bridge stopped: {:?}", stats),
            Err(e) => error!("Serial bridge failed: {}", e),
        }
    });

    Station::new(
        config.link.role.into(),
        config,
        ChannelTransport::new(out_tx, in_rx),
        SystemClock::new(),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1));
    let config = Config::load(&args.config_path)
        .with_context(|| format!("Failed to load config from {}", args.config_path))?;

    let _log_guard = init_logging(&config);

    info!("RC Link v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut stations = if args.loopback {
        info!(
            "Running ground and aircraft in loopback at {}Hz",
            config.link.update_rate_hz
        );
        loopback_stations(&config)?
    } else {
        info!(
            "Running {:?} role over serial at {}Hz",
            config.link.role, config.link.update_rate_hz
        );
        vec![serial_station(&config)?]
    };

    let mut stats_logger = if config.telemetry.enabled {
        Some(StatsLogger::new(&config.telemetry)?)
    } else {
        None
    };

    let period_us = 1_000_000 / u64::from(config.link.update_rate_hz);
    let mut tick_interval = interval(Duration::from_micros(period_us));
    tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut log_interval = interval(Duration::from_millis(config.telemetry.log_interval_ms));

    info!("Press Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                for station in stations.iter_mut() {
                    station.step();
                }
            }

            _ = log_interval.tick(), if stats_logger.is_some() => {
                if let Some(logger) = stats_logger.as_mut() {
                    for station in &stations {
                        if let Err(e) = logger.log(&StatsRecord::capture(&station.link)) {
                            warn!("Failed to write statistics record: {}", e);
                        }
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    for station in &stations {
        info!(
            "Final {} statistics: {:?}",
            station.link.role(),
            station.link.stats()
        );
    }

    Ok(())
}
