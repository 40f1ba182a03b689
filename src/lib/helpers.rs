use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use thiserror::Error;

use crate::models::slots::Slot;

#[derive(Debug, Error)]
pub enum H5OutError {
    #[error("failed to open container {path:?}: {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("failed to write dataset {name}: {reason}")]
    Write { name: String, reason: String },

    #[error("failed to close container {path:?}: {reason}")]
    Close { path: PathBuf, reason: String },

    #[error("failed to read container {path:?}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("slot {slot} expects leading dimension {expected}, got {got}")]
    ShapeMismatch {
        slot: Slot,
        expected: usize,
        got: usize,
    },

    #[error("slot {slot} cannot be staged before slot {missing}")]
    SlotOrderViolation { slot: Slot, missing: Slot },

    #[error("data and label must have the same batch size: {data} != {label}")]
    BatchSizeMismatch { data: usize, label: usize },

    #[error("expected from 2 to 4 input arrays, got {0}")]
    InputCount(usize),

    #[error("invalid array {name}: {reason}")]
    InvalidArray { name: String, reason: String },

    #[error("output stage used after close")]
    UseAfterClose,

    #[error("output stage used before setup")]
    NotSetUp,

    #[error("output stage already set up")]
    AlreadySetUp,

    #[error("configuration error: {0}")]
    Config(String),
}

impl H5OutError {
    pub(crate) fn write(name: &str, reason: impl ToString) -> Self {
        H5OutError::Write {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Appends `.<instance>` to the configured base name, keeping any extension it already has.
pub fn instance_path(base: &Path, instance: u64) -> PathBuf {
    let mut name: OsString = base.as_os_str().to_owned();
    name.push(format!(".{instance}"));
    PathBuf::from(name)
}

/// Formats a shape as `4x3x32x32`
pub fn format_dims(dims: &[usize]) -> String {
    dims.iter().join("x")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_path_appends_counter() {
        let path = instance_path(Path::new("/tmp/out.h5"), 3);
        assert_eq!(path, PathBuf::from("/tmp/out.h5.3"));
    }

    #[test]
    fn instance_path_without_extension() {
        let path = instance_path(Path::new("features"), 0);
        assert_eq!(path, PathBuf::from("features.0"));
    }

    #[test]
    fn format_dims_joins_with_x() {
        assert_eq!(format_dims(&[4, 3, 32, 32]), "4x3x32x32");
        assert_eq!(format_dims(&[]), "");
    }
}
