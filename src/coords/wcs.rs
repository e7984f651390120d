use super::selection::AxisSelection;
use super::traits::CoordinateSystem;
use super::world::{Angle, AngleUnit, Frame, WorldPoint};
use crate::error::{CubeError, Result};
use log::trace;
use mapproj::img2celestial::Img2Celestial;
use mapproj::img2proj::WcsImgXY2ProjXY;
use mapproj::zenithal::tan::Tan;
use mapproj::{CenteredProjection, ImgXY, LonLat};
use serde::{Deserialize, Serialize};

/// One FITS-style world coordinate axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WcsAxis {
    /// Axis type, e.g. `HPLN-TAN`, `HPLT-TAN` or `HEIGHT`.
    pub ctype: String,
    /// Unit of `crval` and `cdelt`.
    pub cunit: String,
    /// Number of pixels along the axis.
    pub naxis: usize,
    /// Reference pixel, 1-based as in FITS.
    pub crpix: f64,
    /// World value at the reference pixel.
    pub crval: f64,
    /// World increment per pixel.
    pub cdelt: f64,
}

impl WcsAxis {
    pub fn new(
        ctype: impl Into<String>,
        cunit: impl Into<String>,
        naxis: usize,
        crpix: f64,
        crval: f64,
        cdelt: f64,
    ) -> Self {
        Self {
            ctype: ctype.into(),
            cunit: cunit.into(),
            naxis,
            crpix,
            crval,
            cdelt,
        }
    }

    pub fn is_longitude(&self) -> bool {
        self.ctype.starts_with("HPLN")
    }

    pub fn is_latitude(&self) -> bool {
        self.ctype.starts_with("HPLT")
    }
}

/// Pixel state of one FITS axis after sub-selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum PixelState {
    /// Still an array axis; index 0 of the view is original pixel `offset`.
    Retained { offset: usize, len: usize },
    /// Collapsed onto one original pixel.
    Fixed(usize),
}

/// A helioprojective world coordinate system with any number of extra linear axes.
///
/// Axes are stored in FITS order (axis 1 first). Sub-selection never touches the
/// axis definitions; it only records which original pixels the retained array
/// axes start at and which axes were collapsed, so a reduced system converts
/// indices exactly like the original one does for the corresponding pixels.
///
/// The sky transform itself is `mapproj`'s gnomonic (`TAN`) projection centred
/// on the reference value, fed with 1-based FITS pixel coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Wcs {
    axes: Vec<WcsAxis>,
    pixels: Vec<PixelState>,
    frame: Frame,
    lon_axis: usize,
    lat_axis: usize,
    lon_unit: AngleUnit,
    lat_unit: AngleUnit,
}

impl Wcs {
    /// Creates a coordinate system from axis definitions in FITS order.
    ///
    /// # Errors
    /// Returns `CubeError::NonCelestialAxes` unless exactly one `HPLN` and one
    /// `HPLT` axis with angular units are present, and `CubeError::Projection`
    /// when either of them has a zero or non-finite `CDELT`.
    pub fn new(axes: Vec<WcsAxis>, frame: Frame) -> Result<Self> {
        let find = |pred: fn(&WcsAxis) -> bool| -> Result<usize> {
            let mut found = axes.iter().enumerate().filter(|(_, a)| pred(a));
            match (found.next(), found.next()) {
                (Some((i, _)), None) => Ok(i),
                _ => Err(CubeError::NonCelestialAxes),
            }
        };
        let lon_axis = find(WcsAxis::is_longitude)?;
        let lat_axis = find(WcsAxis::is_latitude)?;
        let lon_unit =
            AngleUnit::from_fits(&axes[lon_axis].cunit).ok_or(CubeError::NonCelestialAxes)?;
        let lat_unit =
            AngleUnit::from_fits(&axes[lat_axis].cunit).ok_or(CubeError::NonCelestialAxes)?;
        if [lon_axis, lat_axis]
            .iter()
            .any(|&i| axes[i].cdelt == 0.0 || !axes[i].cdelt.is_finite())
        {
            return Err(CubeError::Projection("sky axis CDELT must be finite and non-zero"));
        }

        let pixels = axes
            .iter()
            .map(|a| PixelState::Retained {
                offset: 0,
                len: a.naxis,
            })
            .collect();

        Ok(Self {
            axes,
            pixels,
            frame,
            lon_axis,
            lat_axis,
            lon_unit,
            lat_unit,
        })
    }

    /// Appends a FITS axis, which becomes the new leading array axis.
    pub fn with_axis(mut self, axis: WcsAxis) -> Self {
        self.pixels.push(PixelState::Retained {
            offset: 0,
            len: axis.naxis,
        });
        self.axes.push(axis);
        self
    }

    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frame = frame;
        self
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// All axis definitions in FITS order, including collapsed ones.
    pub fn axes(&self) -> &[WcsAxis] {
        &self.axes
    }

    /// `CTYPE` of each retained axis, in array order.
    pub fn retained_ctypes(&self) -> Vec<&str> {
        self.retained()
            .into_iter()
            .map(|(axis, _, _)| self.axes[axis].ctype.as_str())
            .collect()
    }

    /// Retained axes in array order as `(fits_axis, offset, len)`.
    fn retained(&self) -> Vec<(usize, usize, usize)> {
        self.pixels
            .iter()
            .enumerate()
            .rev()
            .filter_map(|(axis, state)| match *state {
                PixelState::Retained { offset, len } => Some((axis, offset, len)),
                PixelState::Fixed(_) => None,
            })
            .collect()
    }

    /// Pixel-to-sky transform of the longitude/latitude pair.
    fn celestial(&self) -> Img2Celestial<Tan, WcsImgXY2ProjXY> {
        let lon = &self.axes[self.lon_axis];
        let lat = &self.axes[self.lat_axis];
        let img2proj = WcsImgXY2ProjXY::from_cr(
            lon.crpix,
            lat.crpix,
            0.0,
            Angle::new(lon.cdelt, self.lon_unit).to_degrees(),
            Angle::new(lat.cdelt, self.lat_unit).to_degrees(),
        );
        let mut projection = CenteredProjection::new(Tan::new());
        projection.set_proj_center_from_lonlat(&LonLat::new(
            Angle::new(lon.crval, self.lon_unit).to_degrees().to_radians(),
            Angle::new(lat.crval, self.lat_unit).to_degrees().to_radians(),
        ));
        Img2Celestial::new(img2proj, projection)
    }

    /// The two retained axes as `(row, col)` entries, checked to be the sky pair.
    fn spatial_pair(&self) -> Result<[(usize, usize); 2]> {
        match self.retained().as_slice() {
            &[(row_axis, row_offset, _), (col_axis, col_offset, _)] => {
                let celestial = [self.lon_axis, self.lat_axis];
                if celestial.contains(&row_axis) && celestial.contains(&col_axis) {
                    Ok([(row_axis, row_offset), (col_axis, col_offset)])
                } else {
                    Err(CubeError::NonCelestialAxes)
                }
            }
            other => Err(CubeError::UnsupportedDimensionality {
                found: other.len(),
                context: "pixel/world conversion needs exactly two retained axes",
            }),
        }
    }
}

impl CoordinateSystem for Wcs {
    fn dimensionality(&self) -> usize {
        self.pixels
            .iter()
            .filter(|s| matches!(s, PixelState::Retained { .. }))
            .count()
    }

    fn shape(&self) -> Vec<usize> {
        self.retained().into_iter().map(|(_, _, len)| len).collect()
    }

    fn select(&self, selection: &[AxisSelection]) -> Result<Self> {
        let retained = self.retained();
        if selection.len() > retained.len() {
            return Err(CubeError::InvalidSelection(format!(
                "{} entries for a {}-dimensional coordinate system",
                selection.len(),
                retained.len()
            )));
        }

        let mut reduced = self.clone();
        for (sel, &(axis, offset, len)) in selection.iter().zip(&retained) {
            reduced.pixels[axis] = match *sel {
                AxisSelection::Range { start, stop } => {
                    let stop = stop.unwrap_or(len).min(len);
                    if start > stop {
                        return Err(CubeError::InvalidSelection(format!(
                            "range {}..{} on an axis of length {}",
                            start, stop, len
                        )));
                    }
                    PixelState::Retained {
                        offset: offset + start,
                        len: stop - start,
                    }
                }
                AxisSelection::Index(index) => {
                    if index >= len {
                        return Err(CubeError::InvalidSelection(format!(
                            "index {} on an axis of length {}",
                            index, len
                        )));
                    }
                    PixelState::Fixed(offset + index)
                }
            };
        }
        Ok(reduced)
    }

    fn index_to_world(&self, row: usize, col: usize) -> Result<WorldPoint> {
        let [(row_axis, row_offset), (_, col_offset)] = self.spatial_pair()?;
        let (row_pixel, col_pixel) = ((row_offset + row) as f64, (col_offset + col) as f64);
        let (lat_pixel, lon_pixel) = if row_axis == self.lat_axis {
            (row_pixel, col_pixel)
        } else {
            (col_pixel, row_pixel)
        };

        let lonlat = self
            .celestial()
            .img2lonlat(&ImgXY::new(lon_pixel + 1.0, lat_pixel + 1.0))
            .ok_or(CubeError::Projection("pixel has no sky position"))?;
        let lon = signed_longitude(lonlat.lon().to_degrees());
        let lat = lonlat.lat().to_degrees();
        trace!("pixel (lon {}, lat {}) -> ({} deg, {} deg)", lon_pixel, lat_pixel, lon, lat);

        Ok(WorldPoint::new(
            Angle::degrees(lon).to(self.lon_unit),
            Angle::degrees(lat).to(self.lat_unit),
            self.frame.clone(),
        ))
    }

    fn world_to_index(&self, point: &WorldPoint) -> Result<(i64, i64)> {
        let [(row_axis, row_offset), (_, col_offset)] = self.spatial_pair()?;

        let (lon, lat) = (point.tx().to_degrees(), point.ty().to_degrees());
        if !(lon.is_finite() && lat.is_finite()) {
            return Err(CubeError::Projection("sky position is not finite"));
        }
        let img = self
            .celestial()
            .lonlat2img(&LonLat::new(lon.to_radians(), lat.to_radians()))
            .ok_or(CubeError::Projection("sky position outside the TAN hemisphere"))?;
        let (lon_pixel, lat_pixel) = (img.x() - 1.0, img.y() - 1.0);
        trace!("{} -> pixel (lon {}, lat {})", point, lon_pixel, lat_pixel);

        let (row_pixel, col_pixel) = if row_axis == self.lat_axis {
            (lat_pixel, lon_pixel)
        } else {
            (lon_pixel, lat_pixel)
        };
        Ok((
            nearest_index(row_pixel)? - row_offset as i64,
            nearest_index(col_pixel)? - col_offset as i64,
        ))
    }
}

/// Maps a longitude in degrees into `(-180, 180]`, the signed range of
/// helioprojective Solar-X.
fn signed_longitude(lon: f64) -> f64 {
    let wrapped = lon.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Rounds a pixel position to the array index whose pixel contains it.
fn nearest_index(pixel: f64) -> Result<i64> {
    let index = (pixel + 0.5).floor();
    if !index.is_finite() || index.abs() >= i64::MAX as f64 {
        return Err(CubeError::Projection("pixel position is not representable"));
    }
    Ok(index as i64)
}
