//! Physical-parameter cubes from spectral-line inversions, with conversions
//! between array indices and helioprojective sky positions that keep working
//! on sliced views of any supported dimensionality.

pub mod config;
pub mod coords;
pub mod cube;
pub mod error;
pub mod resolver;
pub mod slicing;

pub use config::CubeConfig;
pub use cube::{
    ArrayContainer, DepthSource, DirectoryContainer, KeyLayout, MemoryContainer, PhysicalCube,
};
pub use error::{CubeError, Result};
pub use resolver::{CoordinateResolver, ResolverOptions, WorldForm, WorldOutput};
pub use slicing::{SliceEntry, SliceLedger};
