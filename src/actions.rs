use rand::Rng;
use rand::distr::Distribution;
use rand::distr::StandardUniform as Standard;
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

use crate::N_ACTIONS;

/// Discrete motion primitives handed to the actuation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum Action {
    Forward,
    TurnLeft,
    TurnRight,
}

impl Action {
    /// Column of this action in the Q table.
    pub fn id(&self) -> usize {
        match self {
            Action::Forward => 0,
            Action::TurnLeft => 1,
            Action::TurnRight => 2,
        }
    }

    pub fn from_id(id: usize) -> Option<Self> {
        match id {
            0 => Some(Action::Forward),
            1 => Some(Action::TurnLeft),
            2 => Some(Action::TurnRight),
            _ => None,
        }
    }

    /// Returns true if `self` and `other` are the two opposite turns.
    pub fn reverses(&self, other: &Action) -> bool {
        matches!(
            (self, other),
            (Action::TurnLeft, Action::TurnRight) | (Action::TurnRight, Action::TurnLeft)
        )
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        rng.random()
    }
}

impl Distribution<Action> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Action {
        match rng.random_range(0..N_ACTIONS) {
            0 => Action::Forward,
            1 => Action::TurnLeft,
            _ => Action::TurnRight,
        }
    }
}

impl TryFrom<usize> for Action {
    type Error = usize;

    fn try_from(id: usize) -> Result<Self, Self::Error> {
        Action::from_id(id).ok_or(id)
    }
}

impl From<Action> for usize {
    fn from(action: Action) -> Self {
        action.id()
    }
}
