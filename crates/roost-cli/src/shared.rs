use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use roost_control::config::OperatingConfig;
use roost_control::state::StateCell;
use roost_control::values::ControlValues;
use roost_vision::{PoseTrack, TrackerToggles};

/// The published actuator command: what we currently intend to send and what
/// was last actually sent. One cell, one lock; both tasks go through it.
#[derive(Debug)]
pub struct CommandBuffer {
    current: String,
    last_sent: String,
}

impl CommandBuffer {
    pub fn new(initial: impl Into<String>) -> Self {
        let initial = initial.into();
        Self {
            last_sent: initial.clone(),
            current: initial,
        }
    }

    pub fn publish(&mut self, command: String) {
        self.current = command;
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    /// Transmission dedup: yields the current command and marks it sent only
    /// when it differs from the last transmitted value.
    pub fn take_if_changed(&mut self) -> Option<String> {
        if self.current != self.last_sent {
            self.last_sent = self.current.clone();
            Some(self.current.clone())
        } else {
            None
        }
    }
}

/// Everything the console and control tasks share. Each field is written by
/// exactly one task but read by the other, so every one sits behind its own
/// lock or atomic.
pub struct Shared {
    pub state: StateCell,
    pub config: Mutex<OperatingConfig>,
    pub values: Mutex<ControlValues>,
    pub pose: Mutex<PoseTrack>,
    pub command: Mutex<CommandBuffer>,
    pub toggles: Mutex<TrackerToggles>,
    logging: AtomicBool,
}

impl Shared {
    pub fn new(config: OperatingConfig) -> Self {
        let stop_line = ControlValues::stop().serialize();
        Self {
            state: StateCell::default(),
            config: Mutex::new(config),
            values: Mutex::new(ControlValues::default()),
            pose: Mutex::new(PoseTrack::new()),
            command: Mutex::new(CommandBuffer::new(stop_line)),
            toggles: Mutex::new(TrackerToggles::default()),
            logging: AtomicBool::new(false),
        }
    }

    /// Serializes the live control values into the command buffer and
    /// returns the published line. Called after every console-side mutation.
    pub fn republish_values(&self) -> String {
        let line = self.values.lock().unwrap().serialize();
        self.command.lock().unwrap().publish(line.clone());
        line
    }

    pub fn logging_enabled(&self) -> bool {
        self.logging.load(Ordering::Relaxed)
    }

    /// Flips the logging flag and returns the new value.
    pub fn toggle_logging(&self) -> bool {
        !self.logging.fetch_xor(true, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_yields_only_on_change() {
        let mut buf = CommandBuffer::new("1000,1500,1500,1500");
        assert_eq!(buf.take_if_changed(), None);
        buf.publish("1200,1500,1500,1500".into());
        assert_eq!(buf.take_if_changed().as_deref(), Some("1200,1500,1500,1500"));
        assert_eq!(buf.take_if_changed(), None);
        buf.publish("1200,1500,1500,1500".into());
        assert_eq!(buf.take_if_changed(), None);
    }

    #[test]
    fn republish_reflects_the_live_values() {
        let shared = Shared::new(OperatingConfig::default());
        {
            let mut values = shared.values.lock().unwrap();
            values.set(roost_control::values::Axis::Throttle, 1300);
        }
        let line = shared.republish_values();
        assert_eq!(line, "1300,1500,1500,1500");
        assert_eq!(shared.command.lock().unwrap().current(), line);
    }

    #[test]
    fn logging_toggle_round_trips() {
        let shared = Shared::new(OperatingConfig::default());
        assert!(!shared.logging_enabled());
        assert!(shared.toggle_logging());
        assert!(shared.logging_enabled());
        assert!(!shared.toggle_logging());
        assert!(!shared.logging_enabled());
    }
}
