use crate::cube::layout::{KeyLayout, Parameter};
use crate::error::Result;
use crate::resolver::ResolverOptions;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Options for opening a [`PhysicalCube`](crate::cube::PhysicalCube).
///
/// Every field has a default, so a config file only lists what it changes:
///
/// ```json
/// { "layout": "Atmos", "resolver": { "leading_index": 0 } }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CubeConfig {
    pub layout: KeyLayout,
    pub resolver: ResolverOptions,
    /// Container key of the depth grid, overriding the layout's.
    pub depth_key: Option<String>,
}

impl CubeConfig {
    pub fn with_layout(mut self, layout: KeyLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_resolver(mut self, resolver: ResolverOptions) -> Self {
        self.resolver = resolver;
        self
    }

    /// Key the depth grid is read from.
    pub fn depth_key(&self) -> String {
        self.depth_key
            .clone()
            .unwrap_or_else(|| self.layout.key(Parameter::Depth))
    }

    /// Loads a config from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}
