use std::path::{Path, PathBuf};

use hdf5::{
    types::{FloatSize, TypeDescriptor},
    File,
};

use crate::{
    constants::MAX_RANK,
    helpers::H5OutError,
    models::array::{ArrayData, Shape},
};

use super::prelude::ContainerReader;

/// Read-only view over an HDF5 container written by [`Hdf5Writer`](crate::io::writers::hdf5::Hdf5Writer)
pub struct Hdf5Reader {
    path: PathBuf,
    file: File,
}

impl Hdf5Reader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, H5OutError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|err| H5OutError::Read {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn error(&self, reason: impl ToString) -> H5OutError {
        H5OutError::Read {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl ContainerReader for Hdf5Reader {
    fn dataset_names(&self) -> Result<Vec<String>, H5OutError> {
        let mut names: Vec<String> = self
            .file
            .member_names()
            .map_err(|err| self.error(err))?
            .into_iter()
            .filter(|name| self.file.dataset(name).is_ok())
            .collect();
        names.sort();
        Ok(names)
    }

    fn read_dataset(&self, name: &str) -> Result<ArrayData, H5OutError> {
        let dataset = self
            .file
            .dataset(name)
            .map_err(|err| self.error(format!("dataset {name}: {err}")))?;

        let dims = dataset.shape();
        let shape = Shape::from_dims(&dims).ok_or_else(|| {
            self.error(format!("dataset {name} has rank {} > {MAX_RANK}", dims.len()))
        })?;

        let descriptor = dataset
            .dtype()
            .and_then(|dtype| dtype.to_descriptor())
            .map_err(|err| self.error(format!("dataset {name}: {err}")))?;

        let data = match descriptor {
            TypeDescriptor::Float(FloatSize::U4) => dataset
                .read_raw::<f32>()
                .map(|values| ArrayData::from_shape_vec(shape, values)),
            TypeDescriptor::Float(FloatSize::U8) => dataset
                .read_raw::<f64>()
                .map(|values| ArrayData::from_shape_vec(shape, values)),
            other => {
                return Err(self.error(format!("dataset {name} has unsupported type {other:?}")))
            }
        };

        data.map_err(|err| self.error(format!("dataset {name}: {err}")))?
            .map_err(|err| self.error(format!("dataset {name}: {err}")))
    }

    fn dataset_shape(&self, name: &str) -> Result<Shape, H5OutError> {
        let dataset = self
            .file
            .dataset(name)
            .map_err(|err| self.error(format!("dataset {name}: {err}")))?;
        let dims = dataset.shape();
        Shape::from_dims(&dims).ok_or_else(|| {
            self.error(format!("dataset {name} has rank {} > {MAX_RANK}", dims.len()))
        })
    }
}
