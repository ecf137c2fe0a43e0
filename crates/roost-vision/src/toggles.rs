use std::fmt;

/// On/off switch for a tracker display feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn flip(&mut self) {
        *self = match self {
            Toggle::On => Toggle::Off,
            Toggle::Off => Toggle::On,
        };
    }

    pub fn is_on(self) -> bool {
        self == Toggle::On
    }
}

impl fmt::Display for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Toggle::On => "on",
            Toggle::Off => "off",
        })
    }
}

/// Which camera the tracker should use. Hot-swappable at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraSource {
    Local,
    External,
}

impl CameraSource {
    pub fn swap(&mut self) {
        *self = match self {
            CameraSource::Local => CameraSource::External,
            CameraSource::External => CameraSource::Local,
        };
    }
}

impl fmt::Display for CameraSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CameraSource::Local => "local",
            CameraSource::External => "external",
        })
    }
}

/// Tracker display settings owned by the console. The tracker process reads
/// them; the core only flips and reports them.
#[derive(Debug, Clone, Copy)]
pub struct TrackerToggles {
    pub video: Toggle,
    pub markers: Toggle,
    pub axes: Toggle,
    pub camera: CameraSource,
}

impl Default for TrackerToggles {
    fn default() -> Self {
        Self {
            video: Toggle::On,
            markers: Toggle::Off,
            axes: Toggle::Off,
            camera: CameraSource::Local,
        }
    }
}
