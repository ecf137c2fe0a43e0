use std::fmt;

use serde::Deserialize;

/// Where commands come from: the operator console or the external
/// automatic-controller process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Manual,
    Automatic,
}

/// Regulator selection forwarded to the external controller. Pure metadata:
/// no control law is attached on this side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regulator {
    Off,
    Pid,
    Mpc,
}

/// Filter selection forwarded to the external controller. Metadata only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Off,
    Kalman,
}

impl Mode {
    pub fn code(self) -> u8 {
        match self {
            Mode::Manual => 0,
            Mode::Automatic => 1,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Mode::Manual => Mode::Automatic,
            Mode::Automatic => Mode::Manual,
        }
    }
}

impl Regulator {
    pub fn code(self) -> u8 {
        match self {
            Regulator::Off => 0,
            Regulator::Pid => 1,
            Regulator::Mpc => 2,
        }
    }
}

impl FilterKind {
    pub fn code(self) -> u8 {
        match self {
            FilterKind::Off => 0,
            FilterKind::Kalman => 1,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Manual => "manual",
            Mode::Automatic => "automatic",
        })
    }
}

impl fmt::Display for Regulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Regulator::Off => "OFF",
            Regulator::Pid => "PID",
            Regulator::Mpc => "MPC",
        })
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FilterKind::Off => "OFF",
            FilterKind::Kalman => "Kalman filter",
        })
    }
}

/// Operating selections plus the target setpoint. Mutated by the console
/// task only; snapshotted by the control cycle for export records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatingConfig {
    pub mode: Mode,
    pub regulator: Regulator,
    pub filter: FilterKind,
    pub setpoint: [f64; 3],
}

impl OperatingConfig {
    pub fn new(mode: Mode, regulator: Regulator, filter: FilterKind, setpoint: [f64; 3]) -> Self {
        Self {
            mode,
            regulator,
            filter,
            setpoint,
        }
    }
}

impl Default for OperatingConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Manual,
            regulator: Regulator::Off,
            filter: FilterKind::Off,
            setpoint: [0.0, 0.0, 0.8],
        }
    }
}
