use std::time::Instant;

/// One sample from the external marker tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    pub translation: [f64; 3],
    pub rotation: [f64; 3],
    pub detected: bool,
}

/// Latest detection state. Overwritten on every detection; when the tracker
/// loses the marker only the flag changes and the last-known pose is held.
#[derive(Debug, Clone, Copy)]
pub struct PoseTrack {
    pub translation: [f64; 3],
    pub rotation: [f64; 3],
    pub detected: bool,
    pub last_seen: Instant,
}

impl PoseTrack {
    pub fn new() -> Self {
        Self {
            translation: [0.0; 3],
            rotation: [0.0; 3],
            detected: false,
            last_seen: Instant::now(),
        }
    }

    pub fn apply(&mut self, sample: &PoseSample) {
        self.detected = sample.detected;
        if sample.detected {
            self.translation = sample.translation;
            self.rotation = sample.rotation;
            self.last_seen = Instant::now();
        }
    }
}

impl Default for PoseTrack {
    fn default() -> Self {
        Self::new()
    }
}
