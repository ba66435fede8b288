use log::warn;
use serde::{Deserialize, Serialize};

use crate::Int;
use crate::actions::Action;
use crate::learning::Status;
use crate::learning::q_table::QTable;

/// One step of experience, consumed once by the updater.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state: Int,
    pub action: Action,
    pub reward: f64,
    pub next_state: Int,
    pub next_action: Action,
    pub terminal: bool,
}

/// Applies the SARSA rule
/// `Q(s, a) <- (1 - alpha) Q(s, a) + alpha (r + gamma Q(s', a'))`.
///
/// If either state id is out of range the table is left untouched.
#[allow(clippy::too_many_arguments)]
pub fn update(
    table: &mut QTable,
    state: Int,
    action: Action,
    reward: f64,
    next_state: Int,
    next_action: Action,
    alpha: f64,
    gamma: f64,
) -> Status {
    let (Some(s), Some(next_s)) = (table.state_index(state), table.state_index(next_state)) else {
        warn!("SARSA update skipped: invalid state index ({state}, {next_state})");
        return Status::InvalidStateIndex;
    };
    let target = reward + gamma * table.get(next_s, next_action);
    let q = (1.0 - alpha) * table.get(s, action) + alpha * target;
    table.set(s, action, q);
    Status::Ok
}

pub fn apply(table: &mut QTable, transition: &Transition, alpha: f64, gamma: f64) -> Status {
    update(
        table,
        transition.state,
        transition.action,
        transition.reward,
        transition.next_state,
        transition.next_action,
        alpha,
        gamma,
    )
}
