use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{info, warn};

use roost_bridge::{CommandFeed, ExportRecord, FlightLog, PoseExport};
use roost_control::config::Mode;
use roost_control::failsafe::FailSafe;
use roost_control::state::SystemState;
use roost_control::timing::RateGate;
use roost_control::values::ControlValues;
use roost_link::ActuatorLink;
use roost_vision::PoseSample;

use crate::shared::Shared;

/// Minimum spacing between actuator transmissions and export writes.
pub const DATA_INTERVAL: Duration = Duration::from_millis(30);

/// How often the loop polls shared state between data-ready ticks.
const LOOP_PACE: Duration = Duration::from_millis(5);

/// The rate-limited orchestrator run by the perception/control task. Each
/// tick evaluates the fail-safe, the operating mode, and the bridge, then
/// publishes and (dedup-gated) transmits the command.
pub struct ControlCycle {
    shared: Arc<Shared>,
    export: PoseExport,
    feed: CommandFeed,
    log: FlightLog,
    failsafe: FailSafe,
    data_gate: RateGate,
    started_at: Instant,
    stop_line: String,
}

impl ControlCycle {
    pub fn new(shared: Arc<Shared>, export: PoseExport, feed: CommandFeed, log: FlightLog) -> Self {
        Self {
            shared,
            export,
            feed,
            log,
            failsafe: FailSafe::default(),
            data_gate: RateGate::new(DATA_INTERVAL),
            started_at: Instant::now(),
            stop_line: ControlValues::stop().serialize(),
        }
    }

    /// Overrides the data cadence. The 30 ms default matches the actuator
    /// firmware; tests shrink it to make single ticks observable.
    pub fn with_data_interval(mut self, interval: Duration) -> Self {
        self.data_gate = RateGate::new(interval);
        self
    }

    fn snapshot(&self) -> ExportRecord {
        let (throttle, roll, pitch, yaw) = {
            let v = self.shared.values.lock().unwrap();
            (v.throttle(), v.roll(), v.pitch(), v.yaw())
        };
        let (mode, regulator, filter, setpoint) = {
            let c = self.shared.config.lock().unwrap();
            (c.mode.code(), c.regulator.code(), c.filter.code(), c.setpoint)
        };
        let (translation, rotation) = {
            let p = self.shared.pose.lock().unwrap();
            (p.translation, p.rotation)
        };
        ExportRecord {
            elapsed_s: self.started_at.elapsed().as_secs_f64(),
            state: self.shared.state.get().code(),
            mode,
            regulator,
            filter,
            throttle,
            roll,
            pitch,
            yaw,
            translation,
            rotation,
            setpoint,
        }
    }

    /// One pass of the control cycle. See the crate-level flow: paused ticks
    /// drive the vehicle to the stop sentinel, running ticks derive and
    /// transmit the published command, idle/stopping ticks do no I/O.
    pub async fn tick<T>(&mut self, link: &mut ActuatorLink<T>) -> Result<()>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        match self.shared.state.get() {
            SystemState::Paused => {
                let flying = self.shared.values.lock().unwrap().is_flying();
                if self.data_gate.ready() && flying {
                    let record = self.snapshot();
                    self.export.write(&record).await?;
                    link.send_command(&self.stop_line).await?;
                    self.data_gate.reset();
                }
            }
            SystemState::Running => {
                let mode = self.shared.config.lock().unwrap().mode;
                if mode == Mode::Automatic {
                    let (detected, last_seen) = {
                        let p = self.shared.pose.lock().unwrap();
                        (p.detected, p.last_seen)
                    };
                    let throttle = self.shared.values.lock().unwrap().throttle();
                    if self
                        .failsafe
                        .should_force_stop(mode, detected, last_seen, throttle)
                    {
                        warn!("fail-safe: marker lost, forcing stop command");
                        self.shared
                            .command
                            .lock()
                            .unwrap()
                            .publish(self.stop_line.clone());
                    } else if detected {
                        if let Some(line) = self.feed.read_latest().await? {
                            self.shared.command.lock().unwrap().publish(line);
                        }
                    }
                }
                if self.data_gate.ready() {
                    let record = self.snapshot();
                    if self.shared.logging_enabled() {
                        self.log.append(&record).await?;
                    }
                    self.export.write(&record).await?;
                    let pending = self.shared.command.lock().unwrap().take_if_changed();
                    if let Some(command) = pending {
                        link.send_command(&command).await?;
                    }
                    self.data_gate.reset();
                }
            }
            SystemState::Idle | SystemState::Stopping => {}
        }
        Ok(())
    }

    /// The perception/control task body: drains pose samples, ticks at the
    /// loop pace, and tears down once the operator stops the system.
    pub async fn run<T>(
        mut self,
        mut link: ActuatorLink<T>,
        mut poses: mpsc::Receiver<PoseSample>,
    ) -> Result<()>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let mut ever_ran = false;
        while !self.shared.state.is_stopping() {
            if self.shared.state.get() == SystemState::Idle {
                tokio::time::sleep(Duration::from_millis(20)).await;
                continue;
            }
            if !ever_ran {
                ever_ran = true;
                self.started_at = Instant::now();
                info!("control task: running");
            }
            while let Ok(sample) = poses.try_recv() {
                self.shared.pose.lock().unwrap().apply(&sample);
            }
            if let Err(e) = self.tick(&mut link).await {
                warn!("control tick failed: {:#}", e);
            }
            tokio::time::sleep(LOOP_PACE).await;
        }

        // Teardown: tell the external controller to stop, close out the log,
        // and drive the actuator to the stop sentinel no matter what.
        if ever_ran {
            let record = self.snapshot();
            if let Err(e) = self.export.write(&record).await {
                warn!("final pose export failed: {:#}", e);
            }
            if let Err(e) = self.log.finalize().await {
                warn!("flight log finalize failed: {:#}", e);
            }
        }
        if let Err(e) = link.send_command(&self.stop_line).await {
            warn!("final stop command failed: {:#}", e);
        }
        info!("control task: stopped");
        Ok(())
    }
}
