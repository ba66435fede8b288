pub mod actions;
pub mod config;
pub mod error;
pub mod learning;
pub mod lidar;
pub mod simulation;

pub use error::{Error, Result};

pub type Int = i32;
pub type UInt = u32;

/// Number of discrete states: 3 * 3 * 4 * 4 zone/sector levels.
pub const N_STATES: usize = 144;
/// Number of motion primitives.
pub const N_ACTIONS: usize = 3;
/// Number of lidar readings per frame, one per degree.
pub const N_BEARINGS: usize = 360;

pub const CRASH_REWARD: f64 = -100.0;
