use serde::{Deserialize, Serialize};

use crate::CRASH_REWARD;
use crate::actions::Action;
use crate::lidar::{LidarFrame, horizon_bearings};

const FORWARD_REWARD: f64 = 0.2;
const TURN_REWARD: f64 = -0.1;
const CLEARANCE_REWARD: f64 = 0.2;
const DIRECTION_CHANGE_REWARD: f64 = -0.8;
const FLANK_WEIGHT: f64 = 0.9;
const FRONT_WEIGHT: f64 = 1.1;

/// Scalar reward of one step and whether it ended the episode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    pub val: f64,
    pub terminal: bool,
}

impl Reward {
    pub fn new(val: f64, terminal: bool) -> Self {
        Reward { val, terminal }
    }
}

/// Shapes rewards from consecutive lidar frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardModel {
    horizon_width: usize,
    weights: Vec<f64>,
}

/// `n` evenly spaced values from `start` to `end` inclusive.
fn linspace(start: f64, end: f64, n: usize) -> impl Iterator<Item = f64> {
    let step = if n > 1 {
        (end - start) / (n - 1) as f64
    } else {
        0.0
    };
    (0..n).map(move |i| start + step * i as f64)
}

impl RewardModel {
    pub fn new(horizon_width: usize) -> Self {
        let weights = linspace(FLANK_WEIGHT, FRONT_WEIGHT, horizon_width)
            .chain(linspace(FRONT_WEIGHT, FLANK_WEIGHT, horizon_width))
            .collect();
        RewardModel {
            horizon_width,
            weights,
        }
    }

    /// Weights applied across the horizon, left flank first.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// `prev_action` is `None` on the first step of an episode.
    pub fn reward(
        &self,
        action: Action,
        prev_action: Option<Action>,
        frame: &LidarFrame,
        prev_frame: &LidarFrame,
        crash: bool,
    ) -> Reward {
        if crash {
            return Reward::new(CRASH_REWARD, true);
        }
        let val = action_term(action)
            + self.obstacle_term(frame, prev_frame)
            + direction_change_term(action, prev_action);
        Reward::new(val, false)
    }

    /// Weighted sum of range changes across the horizon. Positive when
    /// obstacles are receding.
    ///
    /// Readings are clamped as in [`LidarFrame::clamped_at`]. A bearing with
    /// no return in both frames has not changed. If returns are both gained
    /// and lost somewhere on the horizon the change is unbounded either way
    /// and counts as zero.
    pub fn clearance_change(&self, frame: &LidarFrame, prev_frame: &LidarFrame) -> f64 {
        let change: f64 = horizon_bearings(self.horizon_width)
            .zip(&self.weights)
            .map(|(bearing, w)| {
                let (now, before) = (frame.clamped_at(bearing), prev_frame.clamped_at(bearing));
                if now == before { 0.0 } else { w * (now - before) }
            })
            .sum();
        if change.is_nan() { 0.0 } else { change }
    }

    fn obstacle_term(&self, frame: &LidarFrame, prev_frame: &LidarFrame) -> f64 {
        if self.clearance_change(frame, prev_frame) >= 0.0 {
            CLEARANCE_REWARD
        } else {
            -CLEARANCE_REWARD
        }
    }
}

fn action_term(action: Action) -> f64 {
    match action {
        Action::Forward => FORWARD_REWARD,
        Action::TurnLeft | Action::TurnRight => TURN_REWARD,
    }
}

fn direction_change_term(action: Action, prev_action: Option<Action>) -> f64 {
    match prev_action {
        Some(prev) if prev.reverses(&action) => DIRECTION_CHANGE_REWARD,
        _ => 0.0,
    }
}
