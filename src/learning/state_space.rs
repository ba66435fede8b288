use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

use crate::config::SensingConfig;
use crate::lidar::LidarFrame;
use crate::{Int, N_STATES};

/// Distance of the closest return in one side zone of the horizon.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
pub enum ZoneLevel {
    Near,
    Mid,
    Clear,
}

/// Which of the three sectors of one side (front, middle, far flank) is the
/// most forward occupied one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
pub enum SectorLevel {
    Front,
    Middle,
    Flank,
    Clear,
}

impl ZoneLevel {
    fn from_range(range: f64, sensing: &SensingConfig) -> Self {
        if range <= sensing.zone_0_length {
            ZoneLevel::Near
        } else if range < sensing.zone_1_length {
            ZoneLevel::Mid
        } else {
            ZoneLevel::Clear
        }
    }
}

/// The discretised situation: one bucket per zone and per sector group.
///
/// Encodes to a state id in mixed radix with bases 3, 3, 4, 4.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneLevels {
    pub left_zone: ZoneLevel,
    pub right_zone: ZoneLevel,
    pub left_sectors: SectorLevel,
    pub right_sectors: SectorLevel,
}

const ZONE_BASE: usize = 3;
const SECTOR_BASE: usize = 4;

impl ZoneLevels {
    pub fn encode(&self) -> usize {
        let x1 = self.left_zone as usize;
        let x2 = self.right_zone as usize;
        let x3 = self.left_sectors as usize;
        let x4 = self.right_sectors as usize;
        ((x1 * ZONE_BASE + x2) * SECTOR_BASE + x3) * SECTOR_BASE + x4
    }

    /// Inverse of [`ZoneLevels::encode`]. Only meant for inspection.
    pub fn decode(state: usize) -> Option<Self> {
        if state >= N_STATES {
            return None;
        }
        let x4 = state % SECTOR_BASE;
        let rest = state / SECTOR_BASE;
        let x3 = rest % SECTOR_BASE;
        let rest = rest / SECTOR_BASE;
        let x2 = rest % ZONE_BASE;
        let x1 = rest / ZONE_BASE;
        Some(ZoneLevels {
            left_zone: ZoneLevel::iter().nth(x1)?,
            right_zone: ZoneLevel::iter().nth(x2)?,
            left_sectors: SectorLevel::iter().nth(x3)?,
            right_sectors: SectorLevel::iter().nth(x4)?,
        })
    }

    /// Every bucket combination, in ascending state id order.
    pub fn iter() -> impl Iterator<Item = ZoneLevels> {
        ZoneLevel::iter()
            .cartesian_product(ZoneLevel::iter())
            .cartesian_product(SectorLevel::iter().cartesian_product(SectorLevel::iter()))
            .map(|((left_zone, right_zone), (left_sectors, right_sectors))| ZoneLevels {
                left_zone,
                right_zone,
                left_sectors,
                right_sectors,
            })
    }
}

/// Maps lidar frames onto the 144 discrete states.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSpace {
    sensing: SensingConfig,
}

impl StateSpace {
    pub fn new(sensing: SensingConfig) -> Self {
        StateSpace { sensing }
    }

    /// All state ids, ascending.
    pub fn enumerate(&self) -> Vec<usize> {
        ZoneLevels::iter().map(|levels| levels.encode()).collect()
    }

    pub fn to_index(&self, frame: &LidarFrame) -> usize {
        self.levels(frame).encode()
    }

    /// Discretises a frame.
    ///
    /// Negative readings clamp to zero; NaN and infinite readings count as no
    /// return, which lands in the farthest bucket.
    pub fn levels(&self, frame: &LidarFrame) -> ZoneLevels {
        let width = self.sensing.horizon_width as Int;
        let left = |lo: Int, hi: Int| self.min_range(frame, lo..=hi);
        let right = |lo: Int, hi: Int| self.min_range(frame, (lo..=hi).map(|b| -b));

        let third = width / 3;
        let left_sectors = [left(1, third), left(third + 1, 2 * third), left(2 * third + 1, width)];
        let right_sectors = [
            right(1, third),
            right(third + 1, 2 * third),
            right(2 * third + 1, width),
        ];

        ZoneLevels {
            left_zone: ZoneLevel::from_range(left(1, width), &self.sensing),
            right_zone: ZoneLevel::from_range(right(1, width), &self.sensing),
            left_sectors: self.sector_level(left_sectors),
            right_sectors: self.sector_level(right_sectors),
        }
    }

    fn min_range(&self, frame: &LidarFrame, bearings: impl Iterator<Item = Int>) -> f64 {
        frame.min_over(bearings).unwrap_or(f64::INFINITY)
    }

    fn sector_level(&self, [front, middle, flank]: [f64; 3]) -> SectorLevel {
        let occupied = |range: f64| range < self.sensing.sector_length;
        if occupied(front) {
            SectorLevel::Front
        } else if occupied(middle) {
            SectorLevel::Middle
        } else if occupied(flank) {
            SectorLevel::Flank
        } else {
            SectorLevel::Clear
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn space() -> StateSpace {
        StateSpace::new(SensingConfig::default())
    }

    #[test]
    fn test_enumerate_is_a_bijection() {
        let ids = space().enumerate();
        assert_eq!(ids.len(), N_STATES);
        let distinct: HashSet<usize> = ids.iter().copied().collect();
        assert_eq!(distinct.len(), N_STATES);
        assert_eq!(ids, (0..N_STATES).collect::<Vec<_>>());
    }

    #[test]
    fn test_decode_inverts_encode() {
        for levels in ZoneLevels::iter() {
            assert_eq!(ZoneLevels::decode(levels.encode()), Some(levels));
        }
        assert_eq!(ZoneLevels::decode(N_STATES), None);
    }

    #[test]
    fn test_open_space_is_the_last_state() {
        let frame = LidarFrame::uniform(10.0);
        let levels = space().levels(&frame);
        assert_eq!(levels.left_zone, ZoneLevel::Clear);
        assert_eq!(levels.right_sectors, SectorLevel::Clear);
        assert_eq!(space().to_index(&frame), N_STATES - 1);
    }

    #[test]
    fn test_obstacle_front_left() {
        // Sectors of a 75 degree side span 1..=25, 26..=50 and 51..=75.
        let frame = LidarFrame::uniform(10.0).with_reading(10, 0.3);
        let levels = space().levels(&frame);
        assert_eq!(levels.left_zone, ZoneLevel::Near);
        assert_eq!(levels.left_sectors, SectorLevel::Front);
        assert_eq!(levels.right_zone, ZoneLevel::Clear);
        assert_eq!(levels.right_sectors, SectorLevel::Clear);
    }

    #[test]
    fn test_obstacle_right_flank() {
        let frame = LidarFrame::uniform(10.0).with_reading(-60, 0.5);
        let levels = space().levels(&frame);
        assert_eq!(levels.right_zone, ZoneLevel::Mid);
        assert_eq!(levels.right_sectors, SectorLevel::Flank);
        assert_eq!(levels.left_zone, ZoneLevel::Clear);
    }

    #[test]
    fn test_readings_behind_the_horizon_are_ignored() {
        let frame = LidarFrame::uniform(10.0)
            .with_reading(0, 0.1)
            .with_reading(180, 0.1)
            .with_reading(90, 0.1);
        assert_eq!(space().to_index(&frame), N_STATES - 1);
    }

    #[test]
    fn test_out_of_range_readings_are_clamped() {
        let negative = LidarFrame::uniform(10.0).with_reading(5, -3.0);
        assert_eq!(space().levels(&negative).left_zone, ZoneLevel::Near);

        let mut readings = vec![f64::NAN; 360];
        readings[1] = f64::INFINITY;
        let blind = LidarFrame::new(readings).unwrap();
        assert_eq!(space().to_index(&blind), N_STATES - 1);
    }

    #[test]
    fn test_index_is_always_in_range() {
        let space = space();
        for range in [0.0, 0.2, 0.4, 0.5, 0.7, 0.9, 1.0, 5.0, -1.0, f64::MAX] {
            for bearing in [1, 20, 30, 70, -1, -40, -75] {
                let frame = LidarFrame::uniform(2.0).with_reading(bearing, range);
                assert!(space.to_index(&frame) < N_STATES);
            }
        }
    }
}
