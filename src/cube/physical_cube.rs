use super::container::ArrayContainer;
use super::layout::{KeyLayout, Parameter};
use crate::config::CubeConfig;
use crate::coords::header::Header;
use crate::coords::traits::CoordinateSystem;
use crate::coords::wcs::Wcs;
use crate::coords::world::{Angle, WorldPoint};
use crate::error::{CubeError, Result};
use crate::resolver::{CoordinateResolver, ResolverOptions, WorldForm, WorldOutput};
use crate::slicing::ledger::{SliceEntry, SliceLedger};
use log::{debug, info};
use ndarray::{Array1, ArrayD, Ix1};
use std::fmt;
use std::sync::Arc;

/// Where the depth grid of a cube comes from.
#[derive(Clone, Default)]
pub enum DepthSource {
    /// The cube's own container, under the configured depth key.
    #[default]
    Container,
    /// A separate container, under the same key.
    Separate(Arc<dyn ArrayContainer>),
    /// A grid supplied by the caller; the container's grid is ignored.
    Explicit(Array1<f64>),
}

impl DepthSource {
    fn read(&self, container: &dyn ArrayContainer, config: &CubeConfig) -> Result<Array1<f64>> {
        match self {
            DepthSource::Container => read_depth(container, config),
            DepthSource::Separate(store) => read_depth(store.as_ref(), config),
            DepthSource::Explicit(z) => Ok(z.clone()),
        }
    }
}

impl fmt::Debug for DepthSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepthSource::Container => write!(f, "Container"),
            DepthSource::Separate(_) => write!(f, "Separate(..)"),
            DepthSource::Explicit(z) => write!(f, "Explicit({} samples)", z.len()),
        }
    }
}

/// Physical parameters of a spectral-line inversion on a sky grid.
///
/// A cube is either the full inversion or a view cut from it with
/// [`PhysicalCube::slice`]. Views share the container and the original
/// coordinate system; each view carries the ledger of how it was cut, which is
/// what coordinate conversions on the view are resolved against.
pub struct PhysicalCube<C = Wcs> {
    container: Arc<dyn ArrayContainer>,
    layout: KeyLayout,
    z: Array1<f64>,
    coordinates: Arc<C>,
    header: Option<Arc<Header>>,
    ledger: Option<SliceLedger>,
    effective: usize,
    options: ResolverOptions,
}

impl PhysicalCube<Wcs> {
    /// Opens an inversion, building its coordinate system from `header`.
    ///
    /// The depth grid is read from the container when present and becomes the
    /// `HEIGHT` axis of the coordinate system.
    ///
    /// # Errors
    /// Fails when the header lacks a spatial description or the depth grid is
    /// not one-dimensional.
    pub fn open(
        container: Arc<dyn ArrayContainer>,
        header: Header,
        config: &CubeConfig,
    ) -> Result<Self> {
        Self::open_with_depth(container, header, DepthSource::Container, config)
    }

    /// Like [`PhysicalCube::open`], with the depth grid taken from `depth`.
    pub fn open_with_depth(
        container: Arc<dyn ArrayContainer>,
        header: Header,
        depth: DepthSource,
        config: &CubeConfig,
    ) -> Result<Self> {
        let z = depth.read(container.as_ref(), config)?;
        debug!("depth grid from {:?}", depth);
        let depth = z.as_slice().filter(|z| !z.is_empty());
        let coordinates = header.to_wcs(depth)?;
        Self::assemble(container, coordinates, z, Some(header), config)
    }
}

impl<C: CoordinateSystem> PhysicalCube<C> {
    /// Opens an inversion with an explicitly supplied coordinate system.
    ///
    /// The header, if any, only feeds the textual summary.
    pub fn with_coordinates(
        container: Arc<dyn ArrayContainer>,
        coordinates: C,
        header: Option<Header>,
        config: &CubeConfig,
    ) -> Result<Self> {
        let z = read_depth(container.as_ref(), config)?;
        Self::assemble(container, coordinates, z, header, config)
    }

    fn assemble(
        container: Arc<dyn ArrayContainer>,
        coordinates: C,
        z: Array1<f64>,
        header: Option<Header>,
        config: &CubeConfig,
    ) -> Result<Self> {
        let dimensionality = coordinates.dimensionality();
        if !(2..=4).contains(&dimensionality) {
            return Err(CubeError::UnsupportedDimensionality {
                found: dimensionality,
                context: "cubes are 2-, 3- or 4-dimensional",
            });
        }
        info!(
            "opened {}-dimensional cube of shape {:?} ({:?} keys, {} depth samples)",
            dimensionality,
            coordinates.shape(),
            config.layout,
            z.len()
        );
        Ok(Self {
            container,
            layout: config.layout,
            z,
            coordinates: Arc::new(coordinates),
            header: header.map(Arc::new),
            ledger: None,
            effective: dimensionality,
            options: config.resolver,
        })
    }

    /// Dimensionality of the original cube.
    pub fn dimensionality(&self) -> usize {
        self.coordinates.dimensionality()
    }

    /// Dimensionality of this view's coordinate system.
    pub fn effective_dimensionality(&self) -> usize {
        self.effective
    }

    /// The coordinate system of the original cube.
    pub fn coordinates(&self) -> &C {
        &self.coordinates
    }

    pub fn header(&self) -> Option<&Header> {
        self.header.as_deref()
    }

    pub fn has_ledger(&self) -> bool {
        self.ledger.is_some()
    }

    pub fn ledger(&self) -> Option<&SliceLedger> {
        self.ledger.as_ref()
    }

    /// Shape of the data arrays of this view.
    pub fn shape(&self) -> Vec<usize> {
        let shape = self.coordinates.shape();
        match &self.ledger {
            None => shape,
            Some(ledger) => ledger
                .entries()
                .iter()
                .zip(&shape)
                .filter_map(|(entry, &len)| match *entry {
                    SliceEntry::Range { start, stop } => {
                        Some(stop.unwrap_or(len).min(len).saturating_sub(start))
                    }
                    SliceEntry::Point(_) => None,
                })
                .collect(),
        }
    }

    /// Cuts a view out of this cube.
    ///
    /// `entries` has one entry per axis of this view's data. On a view that
    /// was already sliced the request refines the existing ledger, so indices
    /// are always relative to the current view.
    ///
    /// # Errors
    /// `InvalidSliceLedger` for a request of the wrong length or outside the view.
    pub fn slice(&self, entries: &[SliceEntry]) -> Result<Self> {
        let ledger = match &self.ledger {
            Some(ledger) => ledger.compose(entries)?,
            None => SliceLedger::new(entries.to_vec()),
        }
        .normalized(&self.coordinates.shape())?;
        let effective = ledger.coordinate_rank();
        debug!(
            "sliced view {:?}: data rank {}, coordinate rank {}",
            ledger.entries(),
            ledger.data_rank(),
            effective
        );
        Ok(Self {
            ledger: Some(ledger),
            effective,
            ..self.clone()
        })
    }

    fn field(&self, parameter: Parameter) -> Result<ArrayD<f64>> {
        let array = self.container.get(&self.layout.key(parameter))?;
        match &self.ledger {
            Some(ledger) => ledger.apply(&array),
            None => Ok(array),
        }
    }

    /// Electron number density.
    pub fn ne(&self) -> Result<ArrayD<f64>> {
        self.field(Parameter::ElectronDensity)
    }

    pub fn temp(&self) -> Result<ArrayD<f64>> {
        self.field(Parameter::Temperature)
    }

    /// Line-of-sight velocity.
    pub fn vel(&self) -> Result<ArrayD<f64>> {
        self.field(Parameter::Velocity)
    }

    pub fn ne_err(&self) -> Result<ArrayD<f64>> {
        self.field(Parameter::ElectronDensityError)
    }

    pub fn temp_err(&self) -> Result<ArrayD<f64>> {
        self.field(Parameter::TemperatureError)
    }

    pub fn vel_err(&self) -> Result<ArrayD<f64>> {
        self.field(Parameter::VelocityError)
    }

    /// Depth grid of this view.
    ///
    /// Cut by the ledger entry of the depth axis, the one in front of the two
    /// spatial axes. A collapsed depth axis leaves its single sample.
    pub fn z(&self) -> Result<Array1<f64>> {
        let depth_axis = self.dimensionality().checked_sub(3);
        match (&self.ledger, depth_axis) {
            (Some(ledger), Some(axis)) if !self.z.is_empty() => {
                ledger.entries()[axis].apply_1d(&self.z)
            }
            _ => Ok(self.z.clone()),
        }
    }

    fn resolver(&self) -> CoordinateResolver<'_, C> {
        CoordinateResolver::new(self.coordinates.as_ref(), self.effective, self.ledger.as_ref())
            .with_options(self.options)
    }

    /// Sky position of the view's array index `(row, col)`.
    ///
    /// # Arguments
    /// * `as_object` - Return the full [`WorldPoint`]; takes precedence.
    /// * `as_quantity` - Return a pair of arcsecond [`Angle`]s.
    ///
    /// With both flags unset a bare arcsecond pair is returned.
    pub fn to_world(
        &self,
        row: usize,
        col: usize,
        as_object: bool,
        as_quantity: bool,
    ) -> Result<WorldOutput> {
        self.resolver()
            .to_world(row, col, WorldForm::from_flags(as_object, as_quantity))
    }

    pub fn to_world_point(&self, row: usize, col: usize) -> Result<WorldPoint> {
        self.resolver().to_world_point(row, col)
    }

    pub fn to_lonlat_quantity(&self, row: usize, col: usize) -> Result<(Angle, Angle)> {
        Ok(self.to_world_point(row, col)?.to_quantity())
    }

    /// `(Solar-X, Solar-Y)` of `(row, col)` in arcseconds.
    pub fn to_lonlat(&self, row: usize, col: usize) -> Result<(f64, f64)> {
        Ok(self.to_world_point(row, col)?.to_arcsec())
    }

    /// Array index `(row, col)` nearest to `(lon, lat)` given in arcseconds.
    pub fn from_world(&self, lon: f64, lat: f64) -> Result<(i64, i64)> {
        self.resolver().from_world(lon, lat)
    }
}

fn read_depth(container: &dyn ArrayContainer, config: &CubeConfig) -> Result<Array1<f64>> {
    let key = config.depth_key();
    if !container.contains(&key) {
        debug!("no depth grid under `{}`", key);
        return Ok(Array1::zeros(0));
    }
    Ok(container.get(&key)?.into_dimensionality::<Ix1>()?)
}

// Views share the coordinate system, so cloning never needs `C: Clone`.
impl<C> Clone for PhysicalCube<C> {
    fn clone(&self) -> Self {
        Self {
            container: Arc::clone(&self.container),
            layout: self.layout,
            z: self.z.clone(),
            coordinates: Arc::clone(&self.coordinates),
            header: self.header.clone(),
            ledger: self.ledger.clone(),
            effective: self.effective,
            options: self.options,
        }
    }
}

impl<C> fmt::Display for PhysicalCube<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Inversion")?;
        writeln!(f, "------------------")?;
        let header = match &self.header {
            Some(header) => header,
            None => return write!(f, "(no header)"),
        };
        match header.obstime() {
            Some(obstime) => match obstime.split_once('T') {
                Some((date, time)) => writeln!(f, "{} {}", date, time)?,
                None => writeln!(f, "{}", obstime)?,
            },
            None => writeln!(f, "(no observation time)")?,
        }
        writeln!(f)?;
        match header.pointing() {
            Some((x, y)) => write!(f, "Pointing: ({}, {})", x, y),
            None => write!(f, "Pointing: unknown"),
        }
    }
}

impl<C> fmt::Debug for PhysicalCube<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PhysicalCube")
            .field("layout", &self.layout)
            .field("depth_samples", &self.z.len())
            .field("ledger", &self.ledger)
            .field("effective", &self.effective)
            .finish()
    }
}
