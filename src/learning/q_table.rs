use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::actions::Action;
use crate::error::{Error, Result};
use crate::learning::Status;
use crate::{Int, N_ACTIONS, N_STATES};

/// Field separator of the persisted text format.
pub const DELIMITER: &str = " , ";

/// Dense action-value table, one row per state and one column per
/// [`Action`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QTable {
    n_states: usize,
    tab: Vec<f64>,
}

impl Default for QTable {
    fn default() -> Self {
        QTable::new(N_STATES)
    }
}

impl QTable {
    /// A zeroed table of `n_states` rows. The column count is fixed by the
    /// action set.
    pub fn new(n_states: usize) -> Self {
        QTable {
            n_states,
            tab: vec![0.0; n_states * N_ACTIONS],
        }
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    pub fn n_actions(&self) -> usize {
        N_ACTIONS
    }

    /// Checks a raw state id against the rows of this table.
    pub fn state_index(&self, state: Int) -> Option<usize> {
        usize::try_from(state).ok().filter(|s| *s < self.n_states)
    }

    pub fn get(&self, state: usize, action: Action) -> f64 {
        self.tab[self.offset(state, action.id())]
    }

    pub fn set(&mut self, state: usize, action: Action, value: f64) {
        let offset = self.offset(state, action.id());
        self.tab[offset] = value;
    }

    pub fn row(&self, state: usize) -> &[f64] {
        let start = self.offset(state, 0);
        &self.tab[start..start + N_ACTIONS]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.tab.chunks(N_ACTIONS)
    }

    fn offset(&self, state: usize, action: usize) -> usize {
        assert!(
            state < self.n_states && action < N_ACTIONS,
            "Q table index ({state}, {action}) out of bounds"
        );
        state * N_ACTIONS + action
    }

    /// Greedy action of a valid state; ties go to the lowest action id.
    pub fn greedy_action(&self, state: usize) -> Action {
        let (best, _) = Action::iter()
            .map(|a| (a, self.get(state, a)))
            .fold((Action::Forward, f64::NEG_INFINITY), |(best, best_q), (a, q)| {
                if q > best_q { (a, q) } else { (best, best_q) }
            });
        best
    }

    /// Greedy action for a raw state id. Out-of-range ids fall back to a
    /// uniformly random action and report [`Status::InvalidStateIndex`].
    pub fn best_action<R: Rng + ?Sized>(&self, state: Int, rng: &mut R) -> (Action, Status) {
        match self.state_index(state) {
            Some(state) => (self.greedy_action(state), Status::Ok),
            None => {
                warn!("best_action: invalid state index {state}");
                (Action::random(rng), Status::InvalidStateIndex)
            }
        }
    }

    pub fn to_writer<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        for row in self.rows() {
            let line = row
                .iter()
                .map(|q| format!("{q:.18e}"))
                .collect::<Vec<_>>()
                .join(DELIMITER);
            writeln!(writer, "{line}")?;
        }
        writer.flush()
    }

    /// Parses a `N_STATES` x `N_ACTIONS` table. Blank lines are skipped.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut tab = Vec::with_capacity(N_STATES * N_ACTIONS);
        let mut rows = 0;
        let mut last_line = 0;
        for (idx, line) in BufReader::new(reader).lines().enumerate() {
            let line_no = idx + 1;
            last_line = line_no;
            let line = line.map_err(|e| match e.kind() {
                ErrorKind::InvalidData => Error::Format {
                    line: line_no,
                    message: "not valid UTF-8 text".to_string(),
                },
                _ => Error::io("read Q table", e),
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(DELIMITER.trim()).map(str::trim).collect();
            if fields.len() != N_ACTIONS {
                return Err(Error::Format {
                    line: line_no,
                    message: format!("expected {N_ACTIONS} columns, found {}", fields.len()),
                });
            }
            for field in fields {
                let q: f64 = field.parse().map_err(|_| Error::Format {
                    line: line_no,
                    message: format!("non-numeric field {field:?}"),
                })?;
                tab.push(q);
            }
            rows += 1;
            if rows > N_STATES {
                return Err(Error::Format {
                    line: line_no,
                    message: format!("more than {N_STATES} rows"),
                });
            }
        }
        if rows != N_STATES {
            // The first row that should have followed the end of the input.
            return Err(Error::Format {
                line: last_line + 1,
                message: format!("expected {N_STATES} rows, found {rows}"),
            });
        }
        Ok(QTable {
            n_states: N_STATES,
            tab,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| Error::io(format!("open Q table {}", path.display()), e))?;
        let table = QTable::from_reader(file)?;
        debug!("Loaded Q table from {}", path.display());
        Ok(table)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|e| Error::io(format!("create Q table {}", path.display()), e))?;
        self.to_writer(BufWriter::new(file))
            .map_err(|e| Error::io(format!("write Q table {}", path.display()), e))?;
        debug!("Saved Q table to {}", path.display());
        Ok(())
    }
}
