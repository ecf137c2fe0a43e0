//! File-based exchange with the out-of-process automatic controller.
//!
//! The coupling is deliberately loose: the pose export is a full-file
//! overwrite the external process polls, and the command feed is a CSV file
//! the external process overwrites and this side reads last-line-wins. There
//! is no framing, locking, or acknowledgment in either direction, so a read
//! can observe a partially written file. The record format keeps each line
//! short enough that this has not been seen in practice; it remains an
//! accepted race of the protocol, exercised (not fixed) by the tests.

pub mod feed;
pub mod flight_log;
pub mod record;

pub use feed::CommandFeed;
pub use flight_log::FlightLog;
pub use record::{ExportRecord, PoseExport};
