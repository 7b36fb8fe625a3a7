//! P1125 command line
//!
//! Thin front end over `p1125-client`: one subcommand per instrument operation, plus a
//! `measure` sequence for a single triggered acquisition and `mahr` for integrated current.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use p1125_core::models::{
    AcquireMode, ClientConfig, Endpoint, TimebaseSpan, TriggerPosition, TriggerSlope,
    TriggerSource,
};
use p1125_core::storage::{get_config_dir, ConfigStorage};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "p1125")]
#[command(about = "Drive a P1125 over its JSON-RPC API", long_about = None)]
pub struct Args {
    /// Full JSON-RPC URL, e.g. http://p1125-a12b.local/api/V1
    #[arg(short, long, conflicts_with_all = ["host", "pass_through"])]
    url: Option<String>,

    /// Hostname or IP address of the P1125
    #[arg(long, conflicts_with = "pass_through")]
    host: Option<String>,

    /// Run without an instrument; every call succeeds with an empty result
    #[arg(long)]
    pass_through: bool,

    /// Directory holding config.json
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Identification and version information
    Ping,
    /// Instrument status
    Status,
    /// Calibration
    #[command(subcommand)]
    Cal(CalCommand),
    /// Set VOUT in mV (1800-8200, steps of 100)
    Vout {
        #[arg(short, long)]
        set: u32,
    },
    /// Probe connection
    #[command(subcommand)]
    Probe(ProbeCommand),
    /// Configure the trigger
    Trig {
        #[arg(short, long, default_value = "TRIG_SRC_NONE")]
        source: TriggerSource,
        #[arg(short, long, default_value = "TRIG_POS_LEFT")]
        position: TriggerPosition,
        #[arg(short = 'e', long, default_value = "TRIG_SLOPE_RISE")]
        slope: TriggerSlope,
        /// Trigger level in µA or mV
        #[arg(short, long, default_value_t = 1.0)]
        level: f64,
    },
    /// Acquisition control
    #[command(subcommand)]
    Acquire(AcquireCommand),
    /// Fetch the last acquisition's data
    PlotData,
    /// Set the timebase span
    Timebase {
        #[arg(short, long)]
        span: TimebaseSpan,
    },
    /// Connect demo loads, comma separated (e.g. 2K,200K); NONE disconnects them
    CalLoad {
        #[arg(short, long, default_value = "NONE")]
        load: String,
    },
    /// Integrated current (mAhr) measurement
    #[command(subcommand)]
    Intcurr(IntcurrCommand),
    /// Shut the instrument down
    Shutdown {
        /// Reboot instead of powering off
        #[arg(short, long)]
        restart: bool,
    },
    /// Calibrate, configure and take one triggered acquisition, then summarize it
    Measure(MeasureArgs),
    /// Measure integrated current (mAhr) over a fixed time at one VOUT
    Mahr(MahrArgs),
}

#[derive(Subcommand, Debug)]
pub enum CalCommand {
    /// Start calibration and return immediately
    Start,
    /// Calibration status
    Status,
    /// Calibration values
    Values,
    /// Calibrate and wait until done
    Run {
        /// Calibrate even if already calibrated
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProbeCommand {
    Status,
    Connect {
        /// Bypass the soft start
        #[arg(long)]
        hard: bool,
    },
    Disconnect,
}

#[derive(Subcommand, Debug)]
pub enum AcquireCommand {
    Start {
        #[arg(short, long, default_value = "ACQUIRE_MODE_SINGLE")]
        mode: AcquireMode,
    },
    Stop,
    /// Has the acquisition triggered
    Triggered,
    /// Poll until triggered
    Wait {
        #[arg(short, long)]
        retries: Option<u32>,
    },
}

#[derive(Subcommand, Debug)]
pub enum IntcurrCommand {
    /// Set the stop time in seconds
    Set { time_stop_s: u64 },
    Complete,
    Data,
    /// Poll until the measurement is complete
    Wait {
        #[arg(short, long, default_value_t = 120)]
        retries: u32,
    },
}

#[derive(clap::Args, Debug)]
pub struct MeasureArgs {
    /// VOUT in mV
    #[arg(long, default_value_t = 3000)]
    pub vout: u32,

    #[arg(long, default_value = "TBASE_SPAN_100MS")]
    pub span: TimebaseSpan,

    /// Connect the probe at VOUT during the acquisition. Check VOUT first!
    #[arg(long)]
    pub connect_probe: bool,

    /// Demo loads to switch in while measuring, comma separated
    #[arg(long)]
    pub load: Option<String>,

    /// Print the raw acquisition data instead of a summary
    #[arg(long)]
    pub raw: bool,
}

#[derive(clap::Args, Debug)]
pub struct MahrArgs {
    /// Seconds over which to integrate
    #[arg(long, default_value_t = 30)]
    pub time_stop_s: u64,

    /// VOUT in mV
    #[arg(long, default_value_t = 3000)]
    pub vout: u32,

    /// Connect the probe at VOUT during the measurement. Check VOUT first!
    #[arg(long)]
    pub connect_probe: bool,
}

fn setup_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

fn load_config(args: &Args) -> Result<ClientConfig> {
    let config_dir = match &args.config {
        Some(dir) => Some(dir.clone()),
        None => get_config_dir().ok(),
    };

    let mut config = match config_dir {
        Some(dir) => ConfigStorage::new(dir.clone())
            .load()
            .with_context(|| format!("Failed to load config from {}", dir.display()))?,
        None => ClientConfig::default(),
    };

    if let Some(url) = &args.url {
        config.endpoint = Endpoint::Url(url.clone());
    } else if let Some(host) = &args.host {
        config.endpoint = Endpoint::from_host(host);
    } else if args.pass_through {
        config.endpoint = Endpoint::PassThrough;
    }

    if args.verbose > 1 {
        config.log_level = "trace".to_string();
    } else if args.verbose == 1 {
        config.log_level = "debug".to_string();
    } else if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    setup_logging(&config.log_level)?;
    tracing::debug!("Endpoint: {}", config.endpoint);

    commands::run(&config, args.command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_trigger() {
        let args = parse(&["p1125", "trig", "-s", "CUR", "-p", "TRIG_POS_CENTER", "-e", "fall", "-l", "25"]);
        match args.command {
            Command::Trig {
                source,
                position,
                slope,
                level,
            } => {
                assert_eq!(source, TriggerSource::Current);
                assert_eq!(position, TriggerPosition::Center);
                assert_eq!(slope, TriggerSlope::Fall);
                assert_eq!(level, 25.0);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_mahr_and_cal_load_defaults() {
        match parse(&["p1125", "mahr", "--time-stop-s", "120", "--connect-probe"]).command {
            Command::Mahr(args) => {
                assert_eq!(args.time_stop_s, 120);
                assert_eq!(args.vout, 3000);
                assert!(args.connect_probe);
            }
            other => panic!("unexpected command {:?}", other),
        }

        match parse(&["p1125", "cal-load"]).command {
            Command::CalLoad { load } => assert_eq!(load, "NONE"),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_span() {
        assert!(Args::try_parse_from(["p1125", "timebase", "--span", "BOGUS"]).is_err());
    }

    #[test]
    fn test_endpoint_flags_conflict() {
        assert!(Args::try_parse_from(["p1125", "--url", "http://x/api/V1", "--host", "x", "ping"]).is_err());
        assert!(Args::try_parse_from(["p1125", "--host", "x", "--pass-through", "ping"]).is_err());
    }

    #[test]
    fn test_load_config_applies_flags() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().to_str().unwrap();

        let config = load_config(&parse(&["p1125", "-c", dir, "--host", "p1125-a12b.local", "-v", "ping"])).unwrap();
        assert_eq!(config.endpoint.url(), Some("http://p1125-a12b.local/api/V1"));
        assert_eq!(config.log_level, "debug");

        let config = load_config(&parse(&["p1125", "-c", dir, "--pass-through", "ping"])).unwrap();
        assert_eq!(config.endpoint, Endpoint::PassThrough);

        assert!(load_config(&parse(&["p1125", "-c", dir, "-l", "loud", "ping"])).is_err());
    }
}
