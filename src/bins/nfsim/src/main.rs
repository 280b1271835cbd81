//! nfsim - 5G Core Network Function Simulator
//!
//! Runs the demo scenario end to end:
//! - NF start-up and NRF registration
//! - UE attachment, authentication and registration
//! - PDU session establishment with policy and QoS
//! - Uplink/downlink traffic with charging
//! - Reports and shutdown

use anyhow::{Context, Result};
use clap::Parser;
use nfsim::Simulator;
use nfsim_core::{init_logging, SimConfig};

/// nfsim - 5G core network function simulator
#[derive(Parser, Debug)]
#[command(name = "nfsim")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "5G Core Network Function Simulator", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'e', long)]
    log_level: Option<String>,

    /// Disable color output
    #[arg(short = 'm', long)]
    no_color: bool,

    /// Number of UEs
    #[arg(long)]
    ues: Option<u32>,

    /// Number of gNodeBs
    #[arg(long)]
    gnbs: Option<u32>,

    /// Write a packet capture to this path
    #[arg(short = 'p', long)]
    pcap: Option<String>,

    /// Print the per-NF reports after the run
    #[arg(short = 'd', long)]
    detailed: bool,
}

/// Load the configuration file (if any) and apply command-line overrides
fn load_config(args: &Args) -> Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => SimConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => SimConfig::default(),
    };

    if let Some(level) = &args.log_level {
        config.logger.level = level.clone();
    }
    if args.no_color {
        config.logger.no_color = true;
    }
    if let Some(ues) = args.ues {
        config.simulation.ues = ues;
    }
    if let Some(gnbs) = args.gnbs {
        config.simulation.gnbs = gnbs;
    }
    if let Some(path) = &args.pcap {
        config.capture.enabled = true;
        config.capture.path = path.clone();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    init_logging(&config.logger).context("Failed to initialize logging")?;
    log::info!("nfsim v{} starting...", env!("CARGO_PKG_VERSION"));

    let ues = config.simulation.ues;
    let gnbs = config.simulation.gnbs;
    let capture = config.capture.clone();

    let mut sim = Simulator::new(config).context("Failed to start network functions")?;
    if capture.enabled {
        sim.enable_capture(&capture.path)
            .with_context(|| format!("Failed to open capture file {}", capture.path))?;
    }

    sim.create_gnbs(gnbs).context("Failed to create gNodeBs")?;
    sim.create_ues(ues);

    let registered = sim.attach_all().context("UE attachment failed")?;
    log::info!("{} of {} UEs registered", registered, ues);

    let sessions = sim
        .establish_sessions()
        .context("PDU session establishment failed")?;
    log::info!("{} PDU sessions established", sessions.len());

    sim.simulate_data_transfer().context("Data transfer failed")?;

    println!("{}", sim.status_report().context("Status collection failed")?);
    if args.detailed {
        println!("{}", sim.detailed_report().context("Report collection failed")?);
    }
    if capture.enabled {
        println!("Packet capture: {} ({} packets)", capture.path, sim.captured_packets());
    }

    sim.shutdown().context("Shutdown failed")?;
    log::info!("nfsim stopped");
    Ok(())
}
