pub mod policy;
pub mod q_table;
pub mod reward;
pub mod sarsa;
pub mod state_space;
pub mod training;

use serde::{Deserialize, Serialize};

/// Outcome of a table operation that can meet an out-of-range state id.
///
/// An invalid index is recovered where it occurs (random action, skipped
/// update) and only reported through this flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Ok,
    InvalidStateIndex,
}
