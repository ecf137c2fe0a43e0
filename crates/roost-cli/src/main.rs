use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use roost_bridge::{CommandFeed, FlightLog, PoseExport};
use roost_control::config::{FilterKind, Mode, OperatingConfig, Regulator};
use roost_link::{ActuatorLink, MAX_FRAME_LEN};
use roost_vision::PoseSource;

mod console;
mod cycle;
mod shared;

use console::Console;
use cycle::ControlCycle;
use shared::Shared;

#[derive(Debug, Parser)]
#[command(name = "roost", version, about = "ROOST - ground station for marker-tracked vehicles")]
struct Cli {
    #[arg(long)]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the configuration and filesystem preconditions.
    Doctor,
    /// Connect the actuator and run the console + control tasks.
    Run,
}

#[derive(Debug, serde::Deserialize)]
struct Config {
    link: LinkCfg,
    tracker: TrackerCfg,
    bridge: BridgeCfg,
    control: ControlCfg,
}

#[derive(Debug, serde::Deserialize)]
struct LinkCfg {
    /// Serial device tried first; the operator is prompted when it fails.
    device: Option<String>,
    baud: u32,
}

#[derive(Debug, serde::Deserialize)]
struct TrackerCfg {
    /// "udp" for a live tracker, "file" for a recorded replay.
    source: String,
    udp_bind: Option<String>,
    replay_file: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct BridgeCfg {
    pose_file: String,
    feed_file: String,
    log_file: String,
}

#[derive(Debug, serde::Deserialize)]
struct ControlCfg {
    mode: Mode,
    regulator: Regulator,
    filter: FilterKind,
    setpoint: [f64; 3],
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).context("read config")?;
    Ok(toml::from_str(&s).context("parse config toml")?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor(&cfg),
        Command::Run => run(&cfg).await,
    }
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");

    anyhow::ensure!(cfg.link.baud > 0, "link.baud invalid");

    match cfg.tracker.source.as_str() {
        "udp" => anyhow::ensure!(
            cfg.tracker.udp_bind.as_deref().is_some_and(|s| !s.is_empty()),
            "tracker.udp_bind missing"
        ),
        "file" => anyhow::ensure!(
            cfg.tracker
                .replay_file
                .as_deref()
                .is_some_and(|p| std::path::Path::new(p).is_file()),
            "tracker.replay_file missing or not a file"
        ),
        other => anyhow::bail!("unknown tracker.source: {}", other),
    }

    for path in [&cfg.bridge.pose_file, &cfg.bridge.log_file] {
        let parent = std::path::Path::new(path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        anyhow::ensure!(parent.is_dir(), "bridge directory missing for {}", path);
    }
    anyhow::ensure!(
        cfg.bridge.pose_file != cfg.bridge.feed_file,
        "bridge.pose_file and bridge.feed_file must differ"
    );

    anyhow::ensure!(
        cfg.control.setpoint.iter().all(|v| v.is_finite()),
        "control.setpoint must be finite"
    );

    info!("doctor: OK");
    Ok(())
}

/// Blocks until an actuator is reachable and has produced at least one
/// feedback byte. A failed open is never fatal: the operator is re-prompted
/// for a device path indefinitely.
fn connect_actuator(cfg: &LinkCfg) -> Result<ActuatorLink> {
    let stdin = std::io::stdin();
    let mut candidate = cfg.device.clone();

    println!("Welcome to the actuator interface.");
    let link = loop {
        let dev = match candidate.take() {
            Some(dev) if !dev.is_empty() => dev,
            _ => {
                print!("Enter the serial device your actuator is connected to: ");
                std::io::stdout().flush()?;
                let mut line = String::new();
                stdin.read_line(&mut line)?;
                let dev = line.trim().to_owned();
                if dev.is_empty() {
                    continue;
                }
                dev
            }
        };
        println!("Waiting for connection on {} . . .", dev);
        match ActuatorLink::open(&dev, cfg.baud) {
            Ok(link) => {
                println!("Actuator connected at {}.", dev);
                break link;
            }
            Err(e) => {
                warn!("actuator connect failed: {}", e);
                println!("Actuator not found on {} . . .", dev);
            }
        }
    };
    Ok(link)
}

async fn run(cfg: &Config) -> Result<()> {
    info!("run: starting");

    let mut link = connect_actuator(&cfg.link)?;
    println!("Waiting for vehicle feedback . . .");
    let mut feedback = [0u8; MAX_FRAME_LEN];
    loop {
        let n = link.read_feedback(&mut feedback).await?;
        if n > 0 {
            break;
        }
    }
    println!("The vehicle is connected. If it drops, restart it and the actuator;");
    println!("the running process is unaffected.\n");

    let shared = Arc::new(Shared::new(OperatingConfig::new(
        cfg.control.mode,
        cfg.control.regulator,
        cfg.control.filter,
        cfg.control.setpoint,
    )));

    let mut source = match cfg.tracker.source.as_str() {
        "udp" => {
            PoseSource::udp(cfg.tracker.udp_bind.as_ref().context("tracker.udp_bind missing")?)
                .await?
        }
        "file" => {
            PoseSource::file(cfg.tracker.replay_file.as_ref().context("tracker.replay_file missing")?)
                .await?
        }
        other => anyhow::bail!("unknown tracker.source: {}", other),
    };

    // Pose ingestion feeds the control task; the channel soaks up bursts.
    let (pose_tx, pose_rx) = mpsc::channel(32);
    let ingest = tokio::spawn(async move {
        loop {
            match source.next_sample().await {
                Ok(sample) => {
                    if pose_tx.send(sample).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("pose source failed: {:#}", e);
                    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                }
            }
        }
    });

    let cycle = ControlCycle::new(
        shared.clone(),
        PoseExport::new(&cfg.bridge.pose_file),
        CommandFeed::new(&cfg.bridge.feed_file),
        FlightLog::new(&cfg.bridge.log_file),
    );
    let control = tokio::spawn(cycle.run(link, pose_rx));

    let console_shared = shared.clone();
    let console = tokio::task::spawn_blocking(move || {
        let stdin = std::io::BufReader::new(std::io::stdin());
        Console::new(console_shared, stdin, std::io::stdout()).run()
    });

    // Cooperative shutdown: the console reaches Stopping first, then the
    // control task observes it and tears down the actuator and files.
    console.await.context("join console task")??;
    control.await.context("join control task")??;
    ingest.abort();

    info!("run: stopped");
    Ok(())
}
