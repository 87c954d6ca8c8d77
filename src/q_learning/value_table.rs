//! Dense action-value table

use std::fmt;

/// Action-value table mapping `(state, action)` to an estimated long-term value
///
/// Every cell starts at zero. Updates overwrite a single cell; nothing is
/// accumulated or merged.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTable {
    num_states: usize,
    /// Row-major Q-values
    values: Vec<f64>,
}

impl ValueTable {
    /// Create a zeroed `num_states x num_states` table
    pub fn new(num_states: usize) -> Self {
        Self {
            num_states,
            values: vec![0.0; num_states * num_states],
        }
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    /// Get Q-value for a state-action pair
    pub fn get(&self, state: usize, action: usize) -> f64 {
        self.values[self.index(state, action)]
    }

    /// Overwrite Q-value for a state-action pair
    pub fn set(&mut self, state: usize, action: usize, value: f64) {
        let idx = self.index(state, action);
        self.values[idx] = value;
    }

    /// All action values of `state`, indexed by action
    pub fn row(&self, state: usize) -> &[f64] {
        assert!(
            state < self.num_states,
            "state {state} outside a {n}x{n} value table",
            n = self.num_states
        );
        let start = state * self.num_states;
        &self.values[start..start + self.num_states]
    }

    /// Iterate over rows in state order
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks(self.num_states.max(1))
    }

    /// Largest value anywhere in the table
    pub fn max_value(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Actions of `state` holding the row maximum, in ascending order.
    ///
    /// Ties are exact floating-point equality.
    pub fn max_actions(&self, state: usize) -> Vec<usize> {
        let row = self.row(state);
        let best = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        row.iter()
            .enumerate()
            .filter(|&(_, &value)| value == best)
            .map(|(action, _)| action)
            .collect()
    }

    /// Table rescaled so the global maximum reads 100.
    ///
    /// Every entry is divided by the global maximum, so a negative maximum
    /// flips signs. A zero maximum (for instance before any update)
    /// normalizes to all zeros.
    pub fn normalized(&self) -> ValueTable {
        let max = self.max_value();
        let values = if max != 0.0 {
            self.values.iter().map(|v| v / max * 100.0).collect()
        } else {
            vec![0.0; self.values.len()]
        };
        ValueTable {
            num_states: self.num_states,
            values,
        }
    }

    /// Render as a grid with `precision` fractional digits
    pub fn display(&self, precision: usize) -> TableDisplay<'_> {
        TableDisplay {
            table: self,
            precision,
        }
    }

    fn index(&self, state: usize, action: usize) -> usize {
        assert!(
            state < self.num_states && action < self.num_states,
            "({state}, {action}) outside a {n}x{n} value table",
            n = self.num_states
        );
        state * self.num_states + action
    }
}

/// Grid rendering of a [`ValueTable`], one state per line
pub struct TableDisplay<'a> {
    table: &'a ValueTable,
    precision: usize,
}

impl fmt::Display for TableDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = self.precision;
        let width = self
            .table
            .values
            .iter()
            .map(|v| format!("{v:.precision$}").len())
            .max()
            .unwrap_or(1);

        for (state, row) in self.table.rows().enumerate() {
            let cells: Vec<String> = row
                .iter()
                .map(|v| format!("{v:>width$.precision$}"))
                .collect();
            write!(f, "[{}]", cells.join(" "))?;
            if state + 1 < self.table.num_states {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
