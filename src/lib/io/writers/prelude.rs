use std::path::Path;

use crate::{helpers::H5OutError, models::array::ArrayData};

/// Trait implemented by container backends (e.g. HDF5, in-memory) that persist named datasets.
///
/// A writer holds at most one open container at a time.
pub trait ContainerWriter {
    /// Creates the container at `path`, truncating any existing file.
    fn open(&mut self, path: &Path) -> Result<(), H5OutError>;

    /// Writes `array` as the dataset `name`, replacing a previous dataset of the same name.
    fn write_dataset(&mut self, name: &str, array: &ArrayData) -> Result<(), H5OutError>;

    /// Deletes the dataset `name`, returning whether it existed.
    fn remove_dataset(&mut self, name: &str) -> Result<bool, H5OutError>;

    /// Flushes and releases the container. No-op when nothing is open.
    fn close(&mut self) -> Result<(), H5OutError>;

    fn is_open(&self) -> bool;

    fn path(&self) -> Option<&Path>;
}
