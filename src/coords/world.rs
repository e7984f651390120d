use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Angular units a sky coordinate can be expressed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AngleUnit {
    Arcsec,
    Degree,
    Radian,
}

impl AngleUnit {
    /// Size of one unit in degrees.
    fn in_degrees(self) -> f64 {
        match self {
            AngleUnit::Arcsec => 1.0 / 3600.0,
            AngleUnit::Degree => 1.0,
            AngleUnit::Radian => 180.0 / PI,
        }
    }

    /// Parses a FITS `CUNITn` string.
    pub fn from_fits(unit: &str) -> Option<Self> {
        match unit.trim().to_ascii_lowercase().as_str() {
            "arcsec" => Some(AngleUnit::Arcsec),
            "deg" | "degree" => Some(AngleUnit::Degree),
            "rad" | "radian" => Some(AngleUnit::Radian),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            AngleUnit::Arcsec => "arcsec",
            AngleUnit::Degree => "deg",
            AngleUnit::Radian => "rad",
        }
    }
}

/// An angle quantity: a value with its unit attached.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Angle {
    value: f64,
    unit: AngleUnit,
}

impl Angle {
    pub fn new(value: f64, unit: AngleUnit) -> Self {
        Self { value, unit }
    }

    pub fn arcsec(value: f64) -> Self {
        Self::new(value, AngleUnit::Arcsec)
    }

    pub fn degrees(value: f64) -> Self {
        Self::new(value, AngleUnit::Degree)
    }

    /// The bare numeric value in the angle's own unit.
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> AngleUnit {
        self.unit
    }

    /// Converts the angle to another unit.
    pub fn to(&self, unit: AngleUnit) -> Self {
        if unit == self.unit {
            return *self;
        }
        Self::new(self.value * self.unit.in_degrees() / unit.in_degrees(), unit)
    }

    pub fn to_degrees(&self) -> f64 {
        self.to(AngleUnit::Degree).value
    }

    pub fn to_arcsec(&self) -> f64 {
        self.to(AngleUnit::Arcsec).value
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit.symbol())
    }
}

/// Observer-centred frame metadata carried by a world point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Frame {
    /// Helioprojective Cartesian frame, optionally pinned to an observation time.
    Helioprojective { obstime: Option<String> },
}

impl Default for Frame {
    fn default() -> Self {
        Frame::Helioprojective { obstime: None }
    }
}

impl Frame {
    pub fn obstime(&self) -> Option<&str> {
        match self {
            Frame::Helioprojective { obstime } => obstime.as_deref(),
        }
    }
}

/// A sky position: helioprojective longitude (Solar-X) and latitude (Solar-Y).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    lon: Angle,
    lat: Angle,
    frame: Frame,
}

impl WorldPoint {
    pub fn new(lon: Angle, lat: Angle, frame: Frame) -> Self {
        Self { lon, lat, frame }
    }

    /// Builds a helioprojective point from values in arcseconds.
    pub fn from_arcsec(lon: f64, lat: f64) -> Self {
        Self::new(Angle::arcsec(lon), Angle::arcsec(lat), Frame::default())
    }

    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frame = frame;
        self
    }

    /// Helioprojective longitude.
    pub fn tx(&self) -> Angle {
        self.lon
    }

    /// Helioprojective latitude.
    pub fn ty(&self) -> Angle {
        self.lat
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// The `(lon, lat)` quantity pair in arcseconds.
    pub fn to_quantity(&self) -> (Angle, Angle) {
        (self.lon.to(AngleUnit::Arcsec), self.lat.to(AngleUnit::Arcsec))
    }

    /// The `(lon, lat)` pair in arcseconds with the unit stripped.
    pub fn to_arcsec(&self) -> (f64, f64) {
        let (lon, lat) = self.to_quantity();
        (lon.value(), lat.value())
    }
}

impl fmt::Display for WorldPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(Tx, Ty) = ({}, {})", self.lon, self.lat)?;
        if let Some(obstime) = self.frame.obstime() {
            write!(f, " at {}", obstime)?;
        }
        Ok(())
    }
}
