use std::fmt;
use std::str::FromStr;

pub const MIN_CONTROL_VALUE: i32 = 1000;
pub const MAX_CONTROL_VALUE: i32 = 2000;

pub const THROTTLE_DEFAULT: i32 = 1000;
pub const ROLL_DEFAULT: i32 = 1500;
pub const PITCH_DEFAULT: i32 = 1500;
pub const YAW_DEFAULT: i32 = 1500;

/// Selector for one of the four control channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Throttle,
    Roll,
    Pitch,
    Yaw,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::Throttle => "throttle",
            Axis::Roll => "roll",
            Axis::Pitch => "pitch",
            Axis::Yaw => "yaw",
        };
        f.write_str(name)
    }
}

/// The four actuator channels. Every stored value lies in
/// [`MIN_CONTROL_VALUE`, `MAX_CONTROL_VALUE`]; out-of-range assignments are
/// clamped, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlValues {
    throttle: i32,
    roll: i32,
    pitch: i32,
    yaw: i32,
}

impl Default for ControlValues {
    fn default() -> Self {
        Self {
            throttle: THROTTLE_DEFAULT,
            roll: ROLL_DEFAULT,
            pitch: PITCH_DEFAULT,
            yaw: YAW_DEFAULT,
        }
    }
}

fn clamp(v: i32) -> i32 {
    v.clamp(MIN_CONTROL_VALUE, MAX_CONTROL_VALUE)
}

impl ControlValues {
    pub fn new(throttle: i32, roll: i32, pitch: i32, yaw: i32) -> Self {
        let mut cv = Self::default();
        cv.set_all(throttle, roll, pitch, yaw);
        cv
    }

    /// The fixed shutdown/fail-safe payload: throttle at minimum, attitude
    /// channels centered.
    pub fn stop() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn reset_axis(&mut self, axis: Axis) {
        let def = match axis {
            Axis::Throttle => THROTTLE_DEFAULT,
            Axis::Roll => ROLL_DEFAULT,
            Axis::Pitch => PITCH_DEFAULT,
            Axis::Yaw => YAW_DEFAULT,
        };
        self.set(axis, def);
    }

    pub fn get(&self, axis: Axis) -> i32 {
        match axis {
            Axis::Throttle => self.throttle,
            Axis::Roll => self.roll,
            Axis::Pitch => self.pitch,
            Axis::Yaw => self.yaw,
        }
    }

    pub fn set(&mut self, axis: Axis, value: i32) {
        let v = clamp(value);
        match axis {
            Axis::Throttle => self.throttle = v,
            Axis::Roll => self.roll = v,
            Axis::Pitch => self.pitch = v,
            Axis::Yaw => self.yaw = v,
        }
    }

    /// Clamps each channel independently.
    pub fn set_all(&mut self, throttle: i32, roll: i32, pitch: i32, yaw: i32) {
        self.throttle = clamp(throttle);
        self.roll = clamp(roll);
        self.pitch = clamp(pitch);
        self.yaw = clamp(yaw);
    }

    /// Step one channel by a signed delta (console single-key control).
    pub fn adjust(&mut self, axis: Axis, delta: i32) {
        self.set(axis, self.get(axis) + delta);
    }

    pub fn throttle(&self) -> i32 {
        self.throttle
    }

    pub fn roll(&self) -> i32 {
        self.roll
    }

    pub fn pitch(&self) -> i32 {
        self.pitch
    }

    pub fn yaw(&self) -> i32 {
        self.yaw
    }

    /// True once any throttle above the floor has been commanded.
    pub fn is_flying(&self) -> bool {
        self.throttle > MIN_CONTROL_VALUE
    }

    /// Actuator wire format: `"throttle,roll,pitch,yaw"`.
    pub fn serialize(&self) -> String {
        format!("{},{},{},{}", self.throttle, self.roll, self.pitch, self.yaw)
    }
}

impl fmt::Display for ControlValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl FromStr for ControlValues {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.trim().splitn(4, ',');
        let mut next = || fields.next().unwrap_or("").trim().parse::<i32>();
        let throttle = next()?;
        let roll = next()?;
        let pitch = next()?;
        let yaw = next()?;
        Ok(Self::new(throttle, roll, pitch, yaw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stop_sentinel() {
        let cv = ControlValues::default();
        assert_eq!(
            (cv.throttle(), cv.roll(), cv.pitch(), cv.yaw()),
            (1000, 1500, 1500, 1500)
        );
        assert_eq!(cv.serialize(), "1000,1500,1500,1500");
        assert_eq!(cv, ControlValues::stop());
    }

    #[test]
    fn assignments_are_clamped_on_every_path() {
        let mut cv = ControlValues::default();
        for v in [-5000, 0, 999, 1000, 1234, 2000, 2001, 90000] {
            for axis in [Axis::Throttle, Axis::Roll, Axis::Pitch, Axis::Yaw] {
                cv.set(axis, v);
                let got = cv.get(axis);
                assert!((1000..=2000).contains(&got), "{axis}={got} from {v}");
            }
        }
        cv.set_all(10, 9000, 500, 2500);
        assert_eq!(cv.serialize(), "1000,2000,1000,2000");
    }

    #[test]
    fn adjust_saturates_at_the_limits() {
        let mut cv = ControlValues::default();
        for _ in 0..40 {
            cv.adjust(Axis::Throttle, 25);
        }
        assert_eq!(cv.throttle(), 2000);
        for _ in 0..100 {
            cv.adjust(Axis::Roll, -25);
        }
        assert_eq!(cv.roll(), 1000);
    }

    #[test]
    fn reset_axis_restores_the_default() {
        let mut cv = ControlValues::new(1800, 1800, 1800, 1800);
        cv.reset_axis(Axis::Throttle);
        assert_eq!(cv.throttle(), 1000);
        assert_eq!(cv.roll(), 1800);
        cv.reset();
        assert_eq!(cv, ControlValues::default());
    }

    #[test]
    fn wire_format_round_trips() {
        for cv in [
            ControlValues::default(),
            ControlValues::new(1250, 1500, 1750, 2000),
            ControlValues::new(2000, 1000, 1001, 1999),
        ] {
            let parsed: ControlValues = cv.serialize().parse().unwrap();
            assert_eq!(parsed, cv);
        }
    }

    #[test]
    fn flying_means_throttle_above_floor() {
        let mut cv = ControlValues::default();
        assert!(!cv.is_flying());
        cv.set(Axis::Throttle, 1001);
        assert!(cv.is_flying());
    }
}
