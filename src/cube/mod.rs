//! Inversion cubes and the containers their arrays are read from.

pub mod container;
pub mod layout;
pub mod physical_cube;

pub use container::{ArrayContainer, DirectoryContainer, MemoryContainer};
pub use layout::{KeyLayout, Parameter};
pub use physical_cube::{DepthSource, PhysicalCube};
