use log::trace;
use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::actions::Action;
use crate::error::{Error, Result};
use crate::learning::training::{Environment, Observation};
use crate::lidar::LidarFrame;
use crate::{N_BEARINGS, UInt};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// A rectangular arena with circular obstacles and a point robot carrying a
/// 360 degree lidar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub arena_width: f64,
    pub arena_height: f64,
    pub obstacles: Vec<Obstacle>,
    /// Readings beyond this are reported as `max_range`.
    pub max_range: f64,
    /// The robot has crashed when any reading drops below this.
    pub crash_distance: f64,
    pub forward_step: f64,
    pub turn_step_deg: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            arena_width: 4.0,
            arena_height: 4.0,
            obstacles: vec![
                Obstacle { x: 1.0, y: 1.0, radius: 0.3 },
                Obstacle { x: 3.0, y: 2.5, radius: 0.4 },
                Obstacle { x: 1.5, y: 3.0, radius: 0.25 },
            ],
            max_range: 3.5,
            crash_distance: 0.15,
            forward_step: 0.05,
            turn_step_deg: 15.0,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("arena_width", self.arena_width),
            ("arena_height", self.arena_height),
            ("max_range", self.max_range),
            ("crash_distance", self.crash_distance),
            ("forward_step", self.forward_step),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(Error::invalid_config(format!(
                    "simulation.{name} must be positive, got {value}"
                )));
            }
        }
        if self.obstacles.iter().any(|o| !(o.radius > 0.0)) {
            return Err(Error::invalid_config("obstacle radii must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    /// Heading in degrees, counter-clockwise from the +x axis.
    pub heading: f64,
}

impl Pose {
    fn centre(config: &SimulationConfig) -> Self {
        Pose {
            x: config.arena_width / 2.0,
            y: config.arena_height / 2.0,
            heading: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    pub time: UInt,
    pub pose: Pose,
    pub config: SimulationConfig,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        Simulation {
            time: 0,
            pose: Pose::centre(&config),
            config,
        }
    }

    /// Casts one ray per degree from the current pose.
    pub fn scan(&self) -> LidarFrame {
        let ranges = (0..N_BEARINGS)
            .map(|bearing| self.cast((self.pose.heading + bearing as f64).to_radians()))
            .collect();
        LidarFrame::new(ranges).unwrap_or_else(|| LidarFrame::uniform(self.config.max_range))
    }

    fn cast(&self, angle: f64) -> f64 {
        let (dy, dx) = angle.sin_cos();
        let Pose { x, y, .. } = self.pose;
        let walls = [
            wall_distance(x, dx, self.config.arena_width),
            wall_distance(y, dy, self.config.arena_height),
        ];
        let obstacles = self
            .config
            .obstacles
            .iter()
            .filter_map(|o| circle_distance(x, y, dx, dy, o));
        walls
            .into_iter()
            .chain(obstacles)
            .fold(self.config.max_range, f64::min)
            .max(0.0)
    }

    fn is_free(&self, x: f64, y: f64, clearance: f64) -> bool {
        let inside = x > clearance
            && y > clearance
            && x < self.config.arena_width - clearance
            && y < self.config.arena_height - clearance;
        inside
            && self
                .config
                .obstacles
                .iter()
                .all(|o| (x - o.x).hypot(y - o.y) > o.radius + clearance)
    }

    fn crashed(&self, frame: &LidarFrame) -> bool {
        !self.is_free(self.pose.x, self.pose.y, 0.0)
            || frame
                .ranges()
                .iter()
                .any(|r| *r < self.config.crash_distance)
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Forward => {
                let (dy, dx) = self.pose.heading.to_radians().sin_cos();
                self.pose.x += dx * self.config.forward_step;
                self.pose.y += dy * self.config.forward_step;
            }
            Action::TurnLeft => self.pose.heading += self.config.turn_step_deg,
            Action::TurnRight => self.pose.heading -= self.config.turn_step_deg,
        }
        self.pose.heading = self.pose.heading.rem_euclid(360.0);
    }
}

/// Distance along one axis to the arena wall at `0` or `limit`.
fn wall_distance(pos: f64, dir: f64, limit: f64) -> f64 {
    if dir > f64::EPSILON {
        (limit - pos) / dir
    } else if dir < -f64::EPSILON {
        -pos / dir
    } else {
        f64::INFINITY
    }
}

fn circle_distance(x: f64, y: f64, dx: f64, dy: f64, obstacle: &Obstacle) -> Option<f64> {
    let (fx, fy) = (x - obstacle.x, y - obstacle.y);
    let b = fx * dx + fy * dy;
    let c = fx * fx + fy * fy - obstacle.radius * obstacle.radius;
    if c < 0.0 {
        return Some(0.0);
    }
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = -b - disc.sqrt();
    (t >= 0.0).then_some(t)
}

impl Environment for Simulation {
    /// Places the robot at a random collision-free pose.
    fn reset(&mut self, rng: &mut StdRng) -> Option<LidarFrame> {
        let clearance = 2.0 * self.config.crash_distance;
        self.time = 0;
        self.pose = Pose::centre(&self.config);
        for _ in 0..100 {
            let x = rng.random_range(0.0..self.config.arena_width);
            let y = rng.random_range(0.0..self.config.arena_height);
            if self.is_free(x, y, clearance) {
                self.pose = Pose {
                    x,
                    y,
                    heading: rng.random_range(0.0..360.0),
                };
                break;
            }
        }
        Some(self.scan())
    }

    fn step(&mut self, action: Action) -> Observation {
        self.apply(action);
        self.time += 1;
        let frame = self.scan();
        let crash = self.crashed(&frame);
        trace!("t={} {:?} {:?} crash={}", self.time, action, self.pose, crash);
        Observation { frame, crash }
    }
}
