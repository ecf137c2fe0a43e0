use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Top-level system state. The numeric codes are part of the pose-export
/// record format read by the external controller; keep them stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SystemState {
    Stopping = 0,
    Running = 1,
    Paused = 2,
    Idle = 3,
}

impl SystemState {
    pub fn code(self) -> u8 {
        self as u8
    }

    fn from_code(code: u8) -> Self {
        match code {
            0 => SystemState::Stopping,
            1 => SystemState::Running,
            2 => SystemState::Paused,
            _ => SystemState::Idle,
        }
    }
}

impl fmt::Display for SystemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SystemState::Stopping => "stopping",
            SystemState::Running => "running",
            SystemState::Paused => "paused",
            SystemState::Idle => "idle",
        })
    }
}

/// Lock-free state cell shared between the console and control tasks.
/// Transitions are operator-driven; the control task only ever reads.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(initial: SystemState) -> Self {
        Self(AtomicU8::new(initial.code()))
    }

    pub fn get(&self) -> SystemState {
        SystemState::from_code(self.0.load(Ordering::SeqCst))
    }

    /// `start` moves Idle or Paused into Running. Returns the state the
    /// transition left, or `None` when already Running (rejected).
    pub fn start(&self) -> Option<SystemState> {
        for from in [SystemState::Idle, SystemState::Paused] {
            if self
                .0
                .compare_exchange(
                    from.code(),
                    SystemState::Running.code(),
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                )
                .is_ok()
            {
                return Some(from);
            }
        }
        None
    }

    /// `pause` is valid only while Running.
    pub fn pause(&self) -> bool {
        self.0
            .compare_exchange(
                SystemState::Running.code(),
                SystemState::Paused.code(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// `resume` is valid only while Paused.
    pub fn resume(&self) -> bool {
        self.0
            .compare_exchange(
                SystemState::Paused.code(),
                SystemState::Running.code(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Stopping is terminal; both task loops exit on observing it.
    pub fn stop(&self) {
        self.0.store(SystemState::Stopping.code(), Ordering::SeqCst);
    }

    pub fn is_stopping(&self) -> bool {
        self.get() == SystemState::Stopping
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new(SystemState::Idle)
    }
}
