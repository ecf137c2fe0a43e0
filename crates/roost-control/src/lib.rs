pub mod config;
pub mod failsafe;
pub mod state;
pub mod timing;
pub mod values;
