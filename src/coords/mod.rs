//! Coordinate systems mapping array indices to helioprojective sky positions.

pub mod header;
pub mod selection;
pub mod traits;
pub mod wcs;
pub mod world;

pub use header::{Header, HeaderConvention, SpatialDescriptor};
pub use selection::AxisSelection;
pub use traits::CoordinateSystem;
pub use wcs::{Wcs, WcsAxis};
pub use world::{Angle, AngleUnit, Frame, WorldPoint};
