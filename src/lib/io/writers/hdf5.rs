use std::path::{Path, PathBuf};

use hdf5::{File, H5Type};
use log::debug;
use ndarray::Array4;

use crate::{helpers::H5OutError, models::array::ArrayData};

use super::prelude::ContainerWriter;

struct Hdf5Container {
    path: PathBuf,
    file: File,
}

/// Writes every dataset into a single HDF5 file, one dataset per slot name.
#[derive(Default)]
pub struct Hdf5Writer {
    container: Option<Hdf5Container>,
}

impl Hdf5Writer {
    pub fn new() -> Self {
        Self::default()
    }

    fn file(&self, name: &str) -> Result<&File, H5OutError> {
        self.container
            .as_ref()
            .map(|container| &container.file)
            .ok_or_else(|| H5OutError::write(name, "no open HDF5 file"))
    }
}

fn write_nd<T: H5Type + Copy>(file: &File, name: &str, values: &Array4<T>) -> hdf5::Result<()> {
    let (count, channels, height, width) = values.dim();
    let dataset = file
        .new_dataset::<T>()
        .shape([count, channels, height, width])
        .create(name)?;
    let values = values.as_standard_layout();
    let values = values
        .as_slice()
        .ok_or_else(|| hdf5::Error::from("array is not contiguous"))?;
    dataset.write_raw(values)
}

impl ContainerWriter for Hdf5Writer {
    fn open(&mut self, path: &Path) -> Result<(), H5OutError> {
        if let Some(current) = &self.container {
            return Err(H5OutError::Open {
                path: path.to_path_buf(),
                reason: format!("writer already holds {:?}", current.path),
            });
        }
        // File::create truncates an existing file
        let file = File::create(path).map_err(|err| H5OutError::Open {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        debug!("[H5] Created {:?}", path);
        self.container = Some(Hdf5Container {
            path: path.to_path_buf(),
            file,
        });
        Ok(())
    }

    fn write_dataset(&mut self, name: &str, array: &ArrayData) -> Result<(), H5OutError> {
        self.remove_dataset(name)?;
        let file = self.file(name)?;

        debug!("[H5] Writing dataset {} ({})", name, array.shape());
        let result = match array {
            ArrayData::F32(values) => write_nd(file, name, values),
            ArrayData::F64(values) => write_nd(file, name, values),
        };
        result.map_err(|err| H5OutError::write(name, err))
    }

    fn remove_dataset(&mut self, name: &str) -> Result<bool, H5OutError> {
        let file = self.file(name)?;
        if !file.link_exists(name) {
            return Ok(false);
        }
        file.unlink(name)
            .map_err(|err| H5OutError::write(name, format!("cannot replace dataset: {err}")))?;
        Ok(true)
    }

    fn close(&mut self) -> Result<(), H5OutError> {
        let Some(container) = self.container.take() else {
            return Ok(());
        };
        debug!("[H5] Closing {:?}", container.path);
        let Hdf5Container { path, file } = container;
        let reason = |err: hdf5::Error| H5OutError::Close {
            path: path.clone(),
            reason: err.to_string(),
        };
        file.flush().map_err(reason)?;
        file.close().map_err(reason)
    }

    fn is_open(&self) -> bool {
        self.container.is_some()
    }

    fn path(&self) -> Option<&Path> {
        self.container.as_ref().map(|container| container.path.as_path())
    }
}
