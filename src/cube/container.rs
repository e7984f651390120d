use crate::error::{CubeError, Result};
use log::trace;
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Trait for keyed stores of the arrays an inversion produced.
pub trait ArrayContainer: Send + Sync {
    /// Fetches the full array stored under `key`.
    ///
    /// # Errors
    /// `CubeError::MissingArray` when nothing is stored under `key`.
    fn get(&self, key: &str) -> Result<ArrayD<f64>>;

    fn contains(&self, key: &str) -> bool;
}

/// All arrays held in memory.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryContainer {
    arrays: HashMap<String, ArrayD<f64>>,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an array, builder style. An existing entry under `key` is replaced.
    pub fn with(mut self, key: &str, array: ArrayD<f64>) -> Self {
        self.insert(key, array);
        self
    }

    pub fn insert(&mut self, key: &str, array: ArrayD<f64>) {
        self.arrays.insert(key.to_string(), array);
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.arrays.keys().map(String::as_str)
    }

    /// Saves every array to one JSON file.
    ///
    /// # Arguments
    /// * `path` - Path to the output JSON file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, &self)?;
        Ok(())
    }

    /// Loads a container written by [`MemoryContainer::save_to_file`].
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl ArrayContainer for MemoryContainer {
    fn get(&self, key: &str) -> Result<ArrayD<f64>> {
        self.arrays
            .get(key)
            .cloned()
            .ok_or_else(|| CubeError::MissingArray(key.to_string()))
    }

    fn contains(&self, key: &str) -> bool {
        self.arrays.contains_key(key)
    }
}

/// Arrays stored one JSON file per key below a root directory.
///
/// Key `/atmos/ne` lives in `<root>/atmos/ne.json`. Nothing is read until an
/// array is requested, and every request reads its file again. Keys with `.`
/// or `..` segments are rejected, so every path stays below the root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryContainer {
    root: PathBuf,
}

impl DirectoryContainer {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, key: &str) -> Result<PathBuf> {
        let parts: Vec<&str> = key.split('/').filter(|part| !part.is_empty()).collect();
        let (last, dirs) = parts
            .split_last()
            .ok_or_else(|| CubeError::InvalidKey(key.to_string()))?;
        if parts.iter().any(|&part| part == "." || part == "..") {
            return Err(CubeError::InvalidKey(key.to_string()));
        }
        let mut path = self.root.clone();
        path.extend(dirs);
        path.push(format!("{}.json", last));
        Ok(path)
    }

    /// Writes `array` under `key`, creating intermediate directories.
    pub fn store(&self, key: &str, array: &ArrayD<f64>) -> Result<()> {
        let path = self.path_of(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, array)?;
        Ok(())
    }
}

impl ArrayContainer for DirectoryContainer {
    fn get(&self, key: &str) -> Result<ArrayD<f64>> {
        let path = self.path_of(key)?;
        if !path.is_file() {
            return Err(CubeError::MissingArray(key.to_string()));
        }
        trace!("reading `{}` from {}", key, path.display());
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    fn contains(&self, key: &str) -> bool {
        self.path_of(key).map_or(false, |path| path.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, Dimension, IxDyn};
    use tempfile::{tempdir, NamedTempFile};

    fn sample(shape: &[usize]) -> ArrayD<f64> {
        Array::from_shape_fn(IxDyn(shape), |ix| ix.slice().iter().sum::<usize>() as f64)
    }

    #[test]
    fn test_memory_get_and_missing() {
        let container = MemoryContainer::new().with("ne", sample(&[2, 3]));
        assert!(container.contains("ne"));
        assert_eq!(container.get("ne").unwrap(), sample(&[2, 3]));
        assert!(matches!(
            container.get("vel"),
            Err(CubeError::MissingArray(key)) if key == "vel"
        ));
    }

    #[test]
    fn test_memory_save_and_load_json_temp() -> Result<()> {
        let container = MemoryContainer::new()
            .with("ne", sample(&[2, 3, 4]))
            .with("z", sample(&[2]));

        // Save to a temporary file and read it back
        let temp_file = NamedTempFile::new()?;
        container.save_to_file(temp_file.path())?;
        let loaded = MemoryContainer::load_from_file(temp_file.path())?;

        assert_eq!(loaded, container);
        assert_eq!(loaded.get("ne")?.shape(), &[2, 3, 4]);
        Ok(())
    }

    #[test]
    fn test_directory_layout_and_lazy_reads() -> Result<()> {
        let dir = tempdir()?;
        let container = DirectoryContainer::new(dir.path());
        assert!(!container.contains("/atmos/ne"));

        container.store("/atmos/ne", &sample(&[3, 4]))?;
        assert!(dir.path().join("atmos").join("ne.json").is_file());
        assert!(container.contains("/atmos/ne"));
        assert_eq!(container.get("/atmos/ne")?, sample(&[3, 4]));

        // Files are read on every access, so a rewrite is picked up.
        container.store("/atmos/ne", &sample(&[1, 2]))?;
        assert_eq!(container.get("/atmos/ne")?.shape(), &[1, 2]);

        assert!(matches!(
            container.get("/atmos/vel"),
            Err(CubeError::MissingArray(_))
        ));
        Ok(())
    }

    #[test]
    fn test_directory_keys_stay_below_root() -> Result<()> {
        let dir = tempdir()?;
        let container = DirectoryContainer::new(dir.path().join("store"));
        for key in ["../ne", "/atmos/../../ne", "./z", "", "/"] {
            assert!(matches!(
                container.store(key, &sample(&[2])),
                Err(CubeError::InvalidKey(_))
            ));
            assert!(!container.contains(key));
        }
        assert!(!dir.path().join("ne.json").exists());

        // Dots inside a name are part of the name.
        container.store("ne.v2", &sample(&[2]))?;
        container.store("ne", &sample(&[3]))?;
        assert!(dir.path().join("store").join("ne.v2.json").is_file());
        assert_eq!(container.get("ne.v2")?.shape(), &[2]);
        assert_eq!(container.get("ne")?.shape(), &[3]);
        Ok(())
    }
}
