use serde::{Deserialize, Serialize};

/// How one array axis of a coordinate system is kept during sub-selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisSelection {
    /// Keep the axis, restricted to `start..stop` (`stop = None` runs to the end).
    Range { start: usize, stop: Option<usize> },
    /// Drop the axis by fixing it to one index.
    Index(usize),
}

impl AxisSelection {
    /// Keeps the whole axis.
    pub fn full() -> Self {
        AxisSelection::Range {
            start: 0,
            stop: None,
        }
    }

    pub fn range(start: usize, stop: usize) -> Self {
        AxisSelection::Range {
            start,
            stop: Some(stop),
        }
    }

    /// Whether the axis survives the selection.
    pub fn is_retained(&self) -> bool {
        matches!(self, AxisSelection::Range { .. })
    }
}

impl Default for AxisSelection {
    fn default() -> Self {
        Self::full()
    }
}
