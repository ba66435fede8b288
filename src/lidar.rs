use serde::{Deserialize, Serialize};

use crate::{Int, N_BEARINGS};

/// One full lidar sweep: a range reading per degree, index 0 facing forward.
///
/// Positive bearings are to the left of the robot, negative bearings (or
/// indices above 180) to the right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LidarFrame {
    ranges: Vec<f64>,
}

impl LidarFrame {
    /// Builds a frame from exactly [`N_BEARINGS`] readings.
    pub fn new(ranges: Vec<f64>) -> Option<Self> {
        (ranges.len() == N_BEARINGS).then_some(LidarFrame { ranges })
    }

    /// A frame with the same reading at every bearing.
    pub fn uniform(range: f64) -> Self {
        LidarFrame {
            ranges: vec![range; N_BEARINGS],
        }
    }

    pub fn ranges(&self) -> &[f64] {
        &self.ranges
    }

    /// Reading at a signed bearing in degrees, taken modulo 360.
    pub fn at(&self, bearing: Int) -> f64 {
        self.ranges[wrap_bearing(bearing)]
    }

    /// Reading at `bearing` with negative ranges raised to zero. NaN counts as
    /// no return, the same as `+inf`.
    pub fn clamped_at(&self, bearing: Int) -> f64 {
        let range = self.at(bearing);
        if range.is_nan() {
            f64::INFINITY
        } else {
            range.max(0.0)
        }
    }

    /// Returns a copy of the frame with one reading replaced.
    pub fn with_reading(mut self, bearing: Int, range: f64) -> Self {
        self.ranges[wrap_bearing(bearing)] = range;
        self
    }

    /// Minimum clamped reading over the given bearings, or `None` if there
    /// are none.
    pub fn min_over(&self, bearings: impl IntoIterator<Item = Int>) -> Option<f64> {
        bearings
            .into_iter()
            .map(|b| self.clamped_at(b))
            .reduce(f64::min)
    }
}

/// Maps a signed bearing onto an index in `0..N_BEARINGS`.
pub fn wrap_bearing(bearing: Int) -> usize {
    bearing.rem_euclid(N_BEARINGS as Int) as usize
}

/// Bearings of the forward horizon of half-width `width`: `width, width - 1,
/// ..., 1` on the left followed by `-1, -2, ..., -width` on the right.
///
/// The dead-ahead bearing is not part of the horizon.
pub fn horizon_bearings(width: usize) -> impl Iterator<Item = Int> {
    let width = width as Int;
    (1..=width).rev().chain((1..=width).map(|b| -b))
}
