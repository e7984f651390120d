use crate::coords::selection::AxisSelection;
use crate::error::{CubeError, Result};
use ndarray::{Array1, ArrayD, Axis, Slice, SliceInfoElem};
use serde::{Deserialize, Serialize};

/// What happened to one original axis when a view was taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SliceEntry {
    /// Axis retained over `start..stop` (`stop = None` runs to the end).
    Range { start: usize, stop: Option<usize> },
    /// Axis collapsed to a single index.
    Point(usize),
}

impl SliceEntry {
    /// The whole axis.
    pub fn full() -> Self {
        SliceEntry::Range {
            start: 0,
            stop: None,
        }
    }

    pub fn range(start: usize, stop: usize) -> Self {
        SliceEntry::Range {
            start,
            stop: Some(stop),
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self, SliceEntry::Range { .. })
    }

    /// The coordinate selection reproducing this entry exactly.
    pub fn as_selection(&self) -> AxisSelection {
        match *self {
            SliceEntry::Range { start, stop } => AxisSelection::Range { start, stop },
            SliceEntry::Point(index) => AxisSelection::Index(index),
        }
    }

    /// The coordinate selection for a spatial axis.
    ///
    /// A range keeps its sub-range. A collapsed spatial axis keeps its full
    /// extent: the view has no axis left for it, so a caller's index along it is
    /// read in the original pixel grid.
    pub fn spatial_selection(&self) -> AxisSelection {
        match *self {
            SliceEntry::Range { start, stop } => AxisSelection::Range { start, stop },
            SliceEntry::Point(_) => AxisSelection::full(),
        }
    }

    /// Clamps an open or overlong range to `len`, checking the entry fits the axis.
    fn normalized(&self, len: usize) -> Result<Self> {
        match *self {
            SliceEntry::Range { start, stop } => {
                let stop = stop.unwrap_or(len).min(len);
                if start > stop {
                    return Err(CubeError::InvalidSliceLedger(format!(
                        "range {}..{} on an axis of length {}",
                        start, stop, len
                    )));
                }
                Ok(SliceEntry::range(start, stop))
            }
            SliceEntry::Point(index) if index >= len => Err(CubeError::InvalidSliceLedger(
                format!("point {} on an axis of length {}", index, len),
            )),
            point => Ok(point),
        }
    }

    fn to_slice_elem(self) -> SliceInfoElem {
        match self {
            SliceEntry::Range { start, stop } => SliceInfoElem::Slice {
                start: start as isize,
                end: stop.map(|s| s as isize),
                step: 1,
            },
            SliceEntry::Point(index) => SliceInfoElem::Index(index as isize),
        }
    }

    /// Cuts a one-dimensional grid. A point keeps a single sample.
    pub fn apply_1d(&self, grid: &Array1<f64>) -> Result<Array1<f64>> {
        let (start, stop) = match self.normalized(grid.len())? {
            SliceEntry::Range { start, stop } => (start, stop.unwrap_or(grid.len())),
            SliceEntry::Point(index) => (index, index + 1),
        };
        Ok(grid
            .slice_axis(Axis(0), Slice::from(start..stop))
            .to_owned())
    }

    /// Refines this entry by a request made against the view it produced.
    fn refine(&self, request: &SliceEntry) -> Result<Self> {
        let (start, stop) = match *self {
            SliceEntry::Range { start, stop } => (start, stop),
            SliceEntry::Point(_) => {
                return Err(CubeError::InvalidSliceLedger(
                    "cannot re-slice a collapsed axis".to_string(),
                ))
            }
        };
        let visible = stop.map(|s| s.saturating_sub(start));
        let refined = match *request {
            SliceEntry::Range {
                start: inner_start,
                stop: inner_stop,
            } => {
                let inner_stop = match (inner_stop, visible) {
                    (Some(s), Some(v)) => Some(s.min(v)),
                    (s, v) => s.or(v),
                };
                if inner_stop.map_or(false, |s| inner_start > s) {
                    return Err(CubeError::InvalidSliceLedger(format!(
                        "range {}..{:?} outside the view",
                        inner_start, inner_stop
                    )));
                }
                SliceEntry::Range {
                    start: start + inner_start,
                    stop: inner_stop.map(|s| start + s),
                }
            }
            SliceEntry::Point(index) => {
                if visible.map_or(false, |v| index >= v) {
                    return Err(CubeError::InvalidSliceLedger(format!(
                        "point {} outside a view of length {:?}",
                        index, visible
                    )));
                }
                SliceEntry::Point(start + index)
            }
        };
        Ok(refined)
    }
}

/// Per-axis record of how a view was cut from the original cube.
///
/// The ledger is aligned with the original axis order and has one entry per
/// original axis. The last two entries are the spatial axes (latitude rows,
/// longitude columns); the ones before them are leading axes such as depth or
/// an instrumental axis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceLedger {
    entries: Vec<SliceEntry>,
}

impl SliceLedger {
    pub fn new(entries: Vec<SliceEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SliceEntry] {
        &self.entries
    }

    /// Entries of the axes in front of the spatial pair.
    pub fn leading(&self) -> &[SliceEntry] {
        &self.entries[..self.entries.len().saturating_sub(2)]
    }

    /// Entries of the two spatial axes, `(row, col)`.
    pub fn trailing(&self) -> Option<(SliceEntry, SliceEntry)> {
        match self.entries.as_slice() {
            [.., row, col] => Some((*row, *col)),
            _ => None,
        }
    }

    /// Rank of the sliced data arrays.
    pub fn data_rank(&self) -> usize {
        self.entries.iter().filter(|e| e.is_range()).count()
    }

    /// Dimensionality of the view's coordinate system.
    ///
    /// Both spatial axes always stay in the coordinate system, whatever the
    /// data kept of them; only leading axes can be collapsed away.
    pub fn coordinate_rank(&self) -> usize {
        if self.entries.len() < 2 {
            return self.data_rank();
        }
        2 + self.leading().iter().filter(|e| e.is_range()).count()
    }

    /// Checks the ledger against the original dimensionality and the claimed
    /// effective dimensionality of the view.
    pub fn validate(&self, original_dimensionality: usize, effective: usize) -> Result<()> {
        if self.len() != original_dimensionality {
            return Err(CubeError::InvalidSliceLedger(format!(
                "{} entries for a {}-dimensional coordinate system",
                self.len(),
                original_dimensionality
            )));
        }
        if self.coordinate_rank() != effective {
            return Err(CubeError::InvalidSliceLedger(format!(
                "ledger retains {} coordinate axes but the view claims {}",
                self.coordinate_rank(),
                effective
            )));
        }
        Ok(())
    }

    /// Builds the ledger of a view cut from the view this ledger describes.
    ///
    /// `request` has one entry per axis of the current view, i.e. per `Range`
    /// entry of this ledger.
    pub fn compose(&self, request: &[SliceEntry]) -> Result<Self> {
        if request.len() != self.data_rank() {
            return Err(CubeError::InvalidSliceLedger(format!(
                "{} entries for a view of rank {}",
                request.len(),
                self.data_rank()
            )));
        }
        let mut request = request.iter();
        let entries = self
            .entries
            .iter()
            .map(|entry| match entry {
                SliceEntry::Point(_) => Ok(*entry),
                SliceEntry::Range { .. } => match request.next() {
                    Some(inner) => entry.refine(inner),
                    None => Err(CubeError::InvalidSliceLedger(
                        "request shorter than view rank".to_string(),
                    )),
                },
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// Clamps every entry to `shape` (original array order) and checks bounds.
    pub fn normalized(&self, shape: &[usize]) -> Result<Self> {
        if shape.len() != self.len() {
            return Err(CubeError::InvalidSliceLedger(format!(
                "{} entries for an array of rank {}",
                self.len(),
                shape.len()
            )));
        }
        let entries = self
            .entries
            .iter()
            .zip(shape)
            .map(|(entry, &len)| entry.normalized(len))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// Coordinate selection describing the view itself: leading entries as
    /// recorded, spatial entries per [`SliceEntry::spatial_selection`].
    pub fn view_selection(&self) -> Vec<AxisSelection> {
        let mut selection: Vec<AxisSelection> =
            self.leading().iter().map(SliceEntry::as_selection).collect();
        if let Some((row, col)) = self.trailing() {
            selection.push(row.spatial_selection());
            selection.push(col.spatial_selection());
        }
        selection
    }

    /// The ledger as `ndarray` slice arguments, one per original axis.
    pub fn to_ndarray_slice(&self) -> Vec<SliceInfoElem> {
        self.entries.iter().map(|e| e.to_slice_elem()).collect()
    }

    /// Cuts an array of the original shape down to the view.
    pub fn apply<A: Clone>(&self, array: &ArrayD<A>) -> Result<ArrayD<A>> {
        let info = self.normalized(array.shape())?.to_ndarray_slice();
        Ok(array.slice(info.as_slice()).to_owned())
    }
}
