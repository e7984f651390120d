use crate::coords::selection::AxisSelection;
use crate::coords::traits::CoordinateSystem;
use crate::coords::world::{Angle, WorldPoint};
use crate::error::{CubeError, Result};
use crate::slicing::ledger::SliceLedger;
use log::debug;
use serde::{Deserialize, Serialize};

/// Tunables of the dimensionality reduction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverOptions {
    /// Index every leading (non-spatial) axis is fixed to when a 3-D or 4-D
    /// view is reduced to its sky plane. The axes are assumed to be
    /// instrumental or depth axes along which the sky mapping does not change.
    pub leading_index: usize,
}

/// Result form requested from an index-to-world conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorldForm {
    /// The full world point, frame metadata included.
    Object,
    /// A pair of angle quantities in arcseconds.
    Quantity,
    /// A pair of bare values in arcseconds.
    Arcsec,
}

impl WorldForm {
    /// Maps the `(as_object, as_quantity)` flag pair; `as_object` wins.
    pub fn from_flags(as_object: bool, as_quantity: bool) -> Self {
        match (as_object, as_quantity) {
            (true, _) => WorldForm::Object,
            (false, true) => WorldForm::Quantity,
            (false, false) => WorldForm::Arcsec,
        }
    }
}

/// A sky position in one of the [`WorldForm`]s.
#[derive(Clone, Debug, PartialEq)]
pub enum WorldOutput {
    Object(WorldPoint),
    Quantity(Angle, Angle),
    Arcsec(f64, f64),
}

impl WorldOutput {
    pub fn from_point(point: WorldPoint, form: WorldForm) -> Self {
        match form {
            WorldForm::Object => WorldOutput::Object(point),
            WorldForm::Quantity => {
                let (lon, lat) = point.to_quantity();
                WorldOutput::Quantity(lon, lat)
            }
            WorldForm::Arcsec => {
                let (lon, lat) = point.to_arcsec();
                WorldOutput::Arcsec(lon, lat)
            }
        }
    }

    /// Strips every form down to `(lon, lat)` in arcseconds.
    pub fn to_arcsec(&self) -> (f64, f64) {
        match self {
            WorldOutput::Object(point) => point.to_arcsec(),
            WorldOutput::Quantity(lon, lat) => (lon.to_arcsec(), lat.to_arcsec()),
            WorldOutput::Arcsec(lon, lat) => (*lon, *lat),
        }
    }
}

/// Reduces a cube's coordinate system to the sky plane of its current view.
///
/// The base coordinate system is the one built for the original, unsliced cube.
/// The effective dimensionality and the optional ledger describe the view. The
/// reduction is a table over the effective dimensionality:
///
/// | effective | selection                                                   |
/// |-----------|-------------------------------------------------------------|
/// | 2         | the view itself (ledger entries, or the base as-is)         |
/// | 3, 4      | every leading axis fixed, then the spatial rule per ledger  |
/// | other     | `UnsupportedDimensionality`                                 |
///
/// The spatial rule keeps a range-sliced spatial axis as its range and a
/// point-sliced one at full extent, so the 2×2 case matrix of the two spatial
/// ledger entries collapses to one per-axis mapping.
#[derive(Debug)]
pub struct CoordinateResolver<'a, C> {
    base: &'a C,
    effective: usize,
    ledger: Option<&'a SliceLedger>,
    options: ResolverOptions,
}

impl<'a, C: CoordinateSystem> CoordinateResolver<'a, C> {
    pub fn new(base: &'a C, effective: usize, ledger: Option<&'a SliceLedger>) -> Self {
        Self {
            base,
            effective,
            ledger,
            options: ResolverOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    /// Computes the per-axis selection, in array order, applied to the base.
    ///
    /// # Errors
    /// - `UnsupportedDimensionality` for an effective dimensionality outside 2..=4.
    /// - `InvalidSliceLedger` when the ledger does not describe the base and view.
    pub fn selection(&self) -> Result<Vec<AxisSelection>> {
        if !(2..=4).contains(&self.effective) {
            return Err(CubeError::UnsupportedDimensionality {
                found: self.effective,
                context: "only 2-, 3- and 4-dimensional views can be resolved",
            });
        }

        let base_dimensionality = self.base.dimensionality();
        match self.ledger {
            Some(ledger) => ledger.validate(base_dimensionality, self.effective)?,
            None if base_dimensionality != self.effective => {
                return Err(CubeError::InvalidSliceLedger(format!(
                    "no ledger, but the view claims {} of {} dimensions",
                    self.effective, base_dimensionality
                )));
            }
            None => {}
        }

        let selection = if self.effective == 2 {
            self.ledger
                .map(SliceLedger::view_selection)
                .unwrap_or_default()
        } else {
            let mut selection =
                vec![AxisSelection::Index(self.options.leading_index); base_dimensionality - 2];
            if let Some((row, col)) = self.ledger.and_then(SliceLedger::trailing) {
                selection.push(row.spatial_selection());
                selection.push(col.spatial_selection());
            }
            selection
        };

        debug!(
            "effective dimensionality {} of {}, ledger {:?} -> selection {:?}",
            self.effective,
            base_dimensionality,
            self.ledger.map(SliceLedger::entries),
            selection
        );
        Ok(selection)
    }

    /// The two-dimensional coordinate system of the current view's sky plane.
    pub fn resolve(&self) -> Result<C> {
        let reduced = self.base.select(&self.selection()?)?;
        match reduced.dimensionality() {
            2 => Ok(reduced),
            found => Err(CubeError::UnsupportedDimensionality {
                found,
                context: "reduced coordinate system must be 2-dimensional",
            }),
        }
    }

    /// Sky position of array index `(row, col)` in the current view.
    pub fn to_world_point(&self, row: usize, col: usize) -> Result<WorldPoint> {
        self.resolve()?.index_to_world(row, col)
    }

    pub fn to_world(&self, row: usize, col: usize, form: WorldForm) -> Result<WorldOutput> {
        Ok(WorldOutput::from_point(self.to_world_point(row, col)?, form))
    }

    /// Array index `(row, col)` of a helioprojective position given in arcseconds.
    pub fn from_world(&self, lon: f64, lat: f64) -> Result<(i64, i64)> {
        self.resolve()?.world_to_index(&WorldPoint::from_arcsec(lon, lat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::wcs::{Wcs, WcsAxis};
    use crate::coords::world::{AngleUnit, Frame};
    use crate::slicing::ledger::SliceEntry;
    use std::cell::Cell;

    fn sky() -> Wcs {
        Wcs::new(
            vec![
                WcsAxis::new("HPLN-TAN", "arcsec", 80, 40.5, 120.0, 0.059),
                WcsAxis::new("HPLT-TAN", "arcsec", 50, 25.5, -340.0, 0.059),
            ],
            Frame::default(),
        )
        .unwrap()
    }

    fn cube3() -> Wcs {
        sky().with_axis(WcsAxis::new("HEIGHT", "Mm", 30, 15.0, 1.2, 1.0))
    }

    fn cube4(depth: usize, extra: usize) -> Wcs {
        sky()
            .with_axis(WcsAxis::new("HEIGHT", "Mm", depth, 1.0, 1.2, 1.0))
            .with_axis(WcsAxis::new("STOKES", "", extra, 1.0, 1.0, 1.0))
    }

    #[test]
    fn test_two_dimensional_passes_through() {
        let base = sky();
        let resolver = CoordinateResolver::new(&base, 2, None);
        assert!(resolver.selection().unwrap().is_empty());
        assert_eq!(resolver.resolve().unwrap(), base);
    }

    #[test]
    fn test_four_dimensional_range_range_dispatch() {
        let base = cube4(1, 1);
        let ledger = SliceLedger::new(vec![
            SliceEntry::full(),
            SliceEntry::full(),
            SliceEntry::range(10, 40),
            SliceEntry::range(0, 64),
        ]);
        let resolver = CoordinateResolver::new(&base, 4, Some(&ledger));
        assert_eq!(
            resolver.selection().unwrap(),
            vec![
                AxisSelection::Index(0),
                AxisSelection::Index(0),
                AxisSelection::range(10, 40),
                AxisSelection::range(0, 64),
            ]
        );
        let reduced = resolver.resolve().unwrap();
        assert_eq!(reduced.dimensionality(), 2);
        assert_eq!(reduced.shape(), vec![30, 64]);
        assert_eq!(reduced.retained_ctypes(), vec!["HPLT-TAN", "HPLN-TAN"]);
    }

    #[test]
    fn test_no_ledger_three_dimensional_fixes_axis_zero() {
        let base = cube3();
        let resolver = CoordinateResolver::new(&base, 3, None);
        let explicit = base.select(&[AxisSelection::Index(0)]).unwrap();
        assert_eq!(
            resolver.to_world_point(5, 10).unwrap(),
            explicit.index_to_world(5, 10).unwrap()
        );
    }

    #[test]
    fn test_no_ledger_four_dimensional_fixes_two_axes() {
        let base = cube4(3, 2);
        let resolver = CoordinateResolver::new(&base, 4, None);
        assert_eq!(
            resolver.selection().unwrap(),
            vec![AxisSelection::Index(0), AxisSelection::Index(0)]
        );
    }

    #[test]
    fn test_trailing_case_matrix() {
        use SliceEntry::{Point, Range};
        let base = cube4(4, 1);
        let rows = SliceEntry::range(5, 15);
        let cols = SliceEntry::range(20, 60);
        let cases = [
            (rows, cols, [AxisSelection::range(5, 15), AxisSelection::range(20, 60)]),
            (rows, Point(12), [AxisSelection::range(5, 15), AxisSelection::full()]),
            (Point(3), cols, [AxisSelection::full(), AxisSelection::range(20, 60)]),
            (Point(3), Point(12), [AxisSelection::full(), AxisSelection::full()]),
        ];
        for (row, col, expected) in cases {
            // 4-axis base reduced to an effective 3-D view by collapsing the leading axis.
            let ledger = SliceLedger::new(vec![
                Point(0),
                Range {
                    start: 0,
                    stop: None,
                },
                row,
                col,
            ]);
            let resolver = CoordinateResolver::new(&base, 3, Some(&ledger));
            let selection = resolver.selection().unwrap();
            assert_eq!(selection[..2], [AxisSelection::Index(0), AxisSelection::Index(0)]);
            assert_eq!(selection[2..], expected);
            assert_eq!(resolver.resolve().unwrap().dimensionality(), 2);
        }
    }

    #[test]
    fn test_three_axis_base_with_ledger_fixes_one_axis() {
        let base = cube3();
        let ledger = SliceLedger::new(vec![
            SliceEntry::range(2, 9),
            SliceEntry::Point(7),
            SliceEntry::range(30, 70),
        ]);
        let resolver = CoordinateResolver::new(&base, 3, Some(&ledger));
        assert_eq!(
            resolver.selection().unwrap(),
            vec![
                AxisSelection::Index(0),
                AxisSelection::full(),
                AxisSelection::range(30, 70)
            ]
        );
        // Column 4 of the view is column 34 of the full sky plane; rows stay original.
        let full = base.select(&[AxisSelection::Index(0)]).unwrap();
        assert_eq!(
            resolver.to_world_point(7, 4).unwrap(),
            full.index_to_world(7, 34).unwrap()
        );
    }

    #[test]
    fn test_documented_example_single_row_profile() {
        // Cube of shape (1, 1, 50, 80) cut down to row-profile data with column 12 collapsed.
        let base = cube4(1, 1);
        let ledger = SliceLedger::new(vec![
            SliceEntry::Point(0),
            SliceEntry::Point(0),
            SliceEntry::full(),
            SliceEntry::Point(12),
        ]);
        let effective = ledger.coordinate_rank();
        assert_eq!(effective, 2);
        let resolver = CoordinateResolver::new(&base, effective, Some(&ledger));
        let manual = base
            .select(&[
                AxisSelection::Index(0),
                AxisSelection::Index(0),
                AxisSelection::full(),
                AxisSelection::full(),
            ])
            .unwrap();
        assert_eq!(resolver.resolve().unwrap(), manual);
        assert_eq!(
            resolver.to_world_point(3, 7).unwrap(),
            manual.index_to_world(3, 7).unwrap()
        );
    }

    #[test]
    fn test_leading_index_option() {
        let base = cube3();
        let resolver = CoordinateResolver::new(&base, 3, None)
            .with_options(ResolverOptions { leading_index: 29 });
        assert_eq!(resolver.selection().unwrap(), vec![AxisSelection::Index(29)]);
        assert!(resolver.resolve().is_ok());

        let out_of_range = CoordinateResolver::new(&base, 3, None)
            .with_options(ResolverOptions { leading_index: 30 });
        assert!(matches!(
            out_of_range.resolve(),
            Err(CubeError::InvalidSelection(_))
        ));
    }

    #[test]
    fn test_invalid_ledgers() {
        let base = cube3();
        let short = SliceLedger::new(vec![SliceEntry::full(), SliceEntry::full()]);
        assert!(matches!(
            CoordinateResolver::new(&base, 2, Some(&short)).resolve(),
            Err(CubeError::InvalidSliceLedger(_))
        ));

        let mismatched = SliceLedger::new(vec![
            SliceEntry::Point(1),
            SliceEntry::full(),
            SliceEntry::full(),
        ]);
        assert!(matches!(
            CoordinateResolver::new(&base, 3, Some(&mismatched)).resolve(),
            Err(CubeError::InvalidSliceLedger(_))
        ));
        assert!(matches!(
            CoordinateResolver::new(&base, 2, None).resolve(),
            Err(CubeError::InvalidSliceLedger(_))
        ));
    }

    #[test]
    fn test_output_forms_agree() {
        let base = cube3();
        let resolver = CoordinateResolver::new(&base, 3, None);
        for &(row, col) in &[(0, 0), (10, 33), (49, 79)] {
            let quantity = resolver.to_world(row, col, WorldForm::Quantity).unwrap();
            let bare = resolver.to_world(row, col, WorldForm::Arcsec).unwrap();
            match (&quantity, &bare) {
                (WorldOutput::Quantity(lon, lat), WorldOutput::Arcsec(x, y)) => {
                    assert_eq!(lon.unit(), AngleUnit::Arcsec);
                    assert!((lon.value() - x).abs() < 1e-12);
                    assert!((lat.value() - y).abs() < 1e-12);
                }
                other => panic!("unexpected forms {:?}", other),
            }
            let object = resolver.to_world(row, col, WorldForm::Object).unwrap();
            assert_eq!(object.to_arcsec(), bare.to_arcsec());
        }
    }

    #[test]
    fn test_from_world_inverts_to_world() {
        let base = cube4(2, 1);
        let ledger = SliceLedger::new(vec![
            SliceEntry::full(),
            SliceEntry::full(),
            SliceEntry::range(10, 50),
            SliceEntry::range(25, 80),
        ]);
        let resolver = CoordinateResolver::new(&base, 4, Some(&ledger));
        for &(row, col) in &[(0, 0), (7, 19), (39, 54)] {
            let (lon, lat) = resolver
                .to_world(row, col, WorldForm::Arcsec)
                .unwrap()
                .to_arcsec();
            assert_eq!(
                resolver.from_world(lon, lat).unwrap(),
                (row as i64, col as i64)
            );
        }
    }

    #[test]
    fn test_form_flags() {
        assert_eq!(WorldForm::from_flags(true, true), WorldForm::Object);
        assert_eq!(WorldForm::from_flags(false, true), WorldForm::Quantity);
        assert_eq!(WorldForm::from_flags(false, false), WorldForm::Arcsec);
    }

    /// Coordinate system of arbitrary rank that records every transform attempt.
    struct Recording {
        rank: usize,
        transforms: Cell<usize>,
    }

    impl CoordinateSystem for Recording {
        fn dimensionality(&self) -> usize {
            self.rank
        }

        fn shape(&self) -> Vec<usize> {
            vec![1; self.rank]
        }

        fn select(&self, selection: &[AxisSelection]) -> Result<Self> {
            let dropped = selection.iter().filter(|s| !s.is_retained()).count();
            Ok(Recording {
                rank: self.rank - dropped,
                transforms: Cell::new(0),
            })
        }

        fn index_to_world(&self, _row: usize, _col: usize) -> Result<WorldPoint> {
            self.transforms.set(self.transforms.get() + 1);
            Ok(WorldPoint::from_arcsec(0.0, 0.0))
        }

        fn world_to_index(&self, _point: &WorldPoint) -> Result<(i64, i64)> {
            self.transforms.set(self.transforms.get() + 1);
            Ok((0, 0))
        }
    }

    #[test]
    fn test_unsupported_dimensionality_is_rejected_up_front() {
        for rank in [1, 5] {
            let base = Recording {
                rank,
                transforms: Cell::new(0),
            };
            let resolver = CoordinateResolver::new(&base, rank, None);
            assert!(matches!(
                resolver.to_world_point(0, 0),
                Err(CubeError::UnsupportedDimensionality { found, .. }) if found == rank
            ));
            assert!(matches!(
                resolver.from_world(0.0, 0.0),
                Err(CubeError::UnsupportedDimensionality { .. })
            ));
            assert_eq!(base.transforms.get(), 0);
        }
    }

    #[test]
    fn test_real_five_dimensional_wcs_is_rejected() {
        let base = cube4(2, 2).with_axis(WcsAxis::new("TIME", "s", 3, 1.0, 0.0, 1.0));
        assert_eq!(base.dimensionality(), 5);
        assert!(matches!(
            CoordinateResolver::new(&base, 5, None).resolve(),
            Err(CubeError::UnsupportedDimensionality { found: 5, .. })
        ));
    }
}
