use super::selection::AxisSelection;
use super::world::WorldPoint;
use crate::error::Result;

/// Trait for bidirectional mappings between array indices and sky positions.
///
/// Axes are always addressed in array (row-major) order, i.e. the reverse of the
/// FITS axis numbering: the last array axis is the longitude axis.
pub trait CoordinateSystem: Sized {
    /// Number of retained pixel axes.
    fn dimensionality(&self) -> usize;

    /// Lengths of the retained pixel axes, in array order.
    fn shape(&self) -> Vec<usize>;

    /// Sub-selects the coordinate system along its leading axes.
    ///
    /// Selections apply to the retained axes in array order; axes past the end
    /// of `selection` are kept whole.
    ///
    /// # Errors
    /// Fails when `selection` is longer than the number of retained axes or when
    /// an entry falls outside its axis.
    fn select(&self, selection: &[AxisSelection]) -> Result<Self>;

    /// Converts a `(row, col)` array index to a sky position.
    fn index_to_world(&self, row: usize, col: usize) -> Result<WorldPoint>;

    /// Converts a sky position to the nearest `(row, col)` array index.
    fn world_to_index(&self, point: &WorldPoint) -> Result<(i64, i64)>;
}
