pub mod pose;
pub mod source;
pub mod toggles;

pub use pose::{PoseSample, PoseTrack};
pub use source::PoseSource;
pub use toggles::{CameraSource, Toggle, TrackerToggles};
