use super::wcs::{Wcs, WcsAxis};
use super::world::Frame;
use crate::error::{CubeError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Key-naming convention a header describes its spatial axes with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderConvention {
    /// FITS keywords: `NAXIS1`, `CRPIX1`, `CRVAL1`, `CDELT1`, ...
    Fits,
    /// Reduction-pipeline keys: `dimensions`, `crpix`, `crval` arrays and one `pixel_scale`.
    Pipeline,
}

/// Pixel grid and reference values of the two spatial axes, in FITS axis order
/// (index 0 is longitude, index 1 is latitude).
#[derive(Clone, Debug, PartialEq)]
pub struct SpatialDescriptor {
    pub convention: HeaderConvention,
    pub naxis: [usize; 2],
    pub crpix: [f64; 2],
    pub crval: [f64; 2],
    pub cdelt: [f64; 2],
}

/// Observation header: a flat key/value mapping as read from JSON.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Header {
    fields: Map<String, Value>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, builder style.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a header from a JSON object file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    fn string(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    fn number(&self, key: &str) -> Result<f64> {
        self.fields
            .get(key)
            .and_then(Value::as_f64)
            .ok_or_else(|| CubeError::MissingHeaderField(key.to_string()))
    }

    /// Element `len - back` of an array field, so `back = 1` is the last one.
    fn number_from_end(&self, key: &str, back: usize) -> Result<f64> {
        self.fields
            .get(key)
            .and_then(Value::as_array)
            .and_then(|values| values.len().checked_sub(back).map(|i| &values[i]))
            .and_then(Value::as_f64)
            .ok_or_else(|| CubeError::MissingHeaderField(format!("{}[-{}]", key, back)))
    }

    /// An axis length, which must be a non-negative whole number.
    fn extent(key: &str, value: f64) -> Result<usize> {
        if value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
            Ok(value as usize)
        } else {
            Err(CubeError::InvalidHeaderField(format!(
                "`{}` = {}: axis length must be a non-negative integer",
                key, value
            )))
        }
    }

    fn fits_spatial(&self) -> Result<SpatialDescriptor> {
        Ok(SpatialDescriptor {
            convention: HeaderConvention::Fits,
            naxis: [
                Self::extent("NAXIS1", self.number("NAXIS1")?)?,
                Self::extent("NAXIS2", self.number("NAXIS2")?)?,
            ],
            crpix: [self.number("CRPIX1")?, self.number("CRPIX2")?],
            crval: [self.number("CRVAL1")?, self.number("CRVAL2")?],
            cdelt: [self.number("CDELT1")?, self.number("CDELT2")?],
        })
    }

    fn pipeline_spatial(&self) -> Result<SpatialDescriptor> {
        let scale = self.number("pixel_scale")?;
        Ok(SpatialDescriptor {
            convention: HeaderConvention::Pipeline,
            naxis: [
                Self::extent("dimensions[-1]", self.number_from_end("dimensions", 1)?)?,
                Self::extent("dimensions[-2]", self.number_from_end("dimensions", 2)?)?,
            ],
            crpix: [
                self.number_from_end("crpix", 1)?,
                self.number_from_end("crpix", 2)?,
            ],
            crval: [
                self.number_from_end("crval", 1)?,
                self.number_from_end("crval", 2)?,
            ],
            cdelt: [scale, scale],
        })
    }

    /// Reads the spatial axis description, trying FITS keywords first.
    ///
    /// # Errors
    /// `CubeError::MissingHeaderField` naming the missing key of both conventions,
    /// or `CubeError::InvalidHeaderField` when an axis length is not a
    /// non-negative integer.
    pub fn spatial(&self) -> Result<SpatialDescriptor> {
        match self.fits_spatial() {
            Ok(descriptor) => Ok(descriptor),
            Err(CubeError::MissingHeaderField(fits_key)) => {
                debug!("FITS key `{}` missing, trying pipeline keys", fits_key);
                self.pipeline_spatial().map_err(|err| match err {
                    CubeError::MissingHeaderField(pipeline_key) => CubeError::MissingHeaderField(
                        format!("{} (or {})", fits_key, pipeline_key),
                    ),
                    other => other,
                })
            }
            Err(other) => Err(other),
        }
    }

    /// Observation timestamp: `DATE-AVG`, else `date_obs` and `time_obs` joined by `T`.
    pub fn obstime(&self) -> Option<String> {
        if let Some(date_avg) = self.string("DATE-AVG") {
            return Some(date_avg.to_string());
        }
        match (self.string("date_obs"), self.string("time_obs")) {
            (Some(date), Some(time)) => Some(format!("{}T{}", date, time)),
            _ => None,
        }
    }

    /// Pointing `(Solar-X, Solar-Y)` of the observation, in header units.
    pub fn pointing(&self) -> Option<(f64, f64)> {
        self.spatial().ok().map(|s| (s.crval[0], s.crval[1]))
    }

    /// Builds the coordinate system of an inversion observed with this header.
    ///
    /// The spatial axes are `HPLN-TAN`/`HPLT-TAN` in arcseconds. When a depth
    /// grid is given a `HEIGHT` axis in Mm is added as FITS axis 3, referenced at
    /// the middle sample with a nominal unit increment since the grid is not
    /// uniformly spaced.
    pub fn to_wcs(&self, depth: Option<&[f64]>) -> Result<Wcs> {
        let spatial = self.spatial()?;
        let axes = vec![
            WcsAxis::new(
                "HPLN-TAN",
                "arcsec",
                spatial.naxis[0],
                spatial.crpix[0],
                spatial.crval[0],
                spatial.cdelt[0],
            ),
            WcsAxis::new(
                "HPLT-TAN",
                "arcsec",
                spatial.naxis[1],
                spatial.crpix[1],
                spatial.crval[1],
                spatial.cdelt[1],
            ),
        ];
        let frame = Frame::Helioprojective {
            obstime: self.obstime(),
        };
        let wcs = Wcs::new(axes, frame)?;

        Ok(match depth {
            Some(z) if !z.is_empty() => {
                let middle = z.len() / 2;
                wcs.with_axis(WcsAxis::new(
                    "HEIGHT",
                    "Mm",
                    z.len(),
                    middle as f64,
                    z[middle],
                    1.0,
                ))
            }
            _ => wcs,
        })
    }
}
