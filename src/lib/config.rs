use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use serde_derive::{Deserialize, Serialize};

use crate::helpers::H5OutError;

/// Configuration of an output stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Base name of the output file; each stage instance appends `.<instance>` to it
    pub file_name: PathBuf,
}

impl StageConfig {
    pub fn new(file_name: impl Into<PathBuf>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    pub fn from_file(config_file: impl AsRef<Path>) -> Result<Self, H5OutError> {
        let config_file = config_file.as_ref();
        // Check the file extension to determine which parser to use
        match config_file.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&read_to_string(config_file)?),
            Some("json") => Self::from_json(&read_to_string(config_file)?),
            _ => Err(H5OutError::Config(format!(
                "Unsupported config file format: {}",
                config_file.display()
            ))),
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self, H5OutError> {
        serde_yaml::from_str(contents)
            .map_err(|err| H5OutError::Config(format!("Cannot parse config: {err}")))
    }

    pub fn from_json(contents: &str) -> Result<Self, H5OutError> {
        serde_json::from_str(contents)
            .map_err(|err| H5OutError::Config(format!("Cannot parse config: {err}")))
    }
}

fn read_to_string(config_file: &Path) -> Result<String, H5OutError> {
    let mut file = File::open(config_file).map_err(|err| {
        H5OutError::Config(format!(
            "Cannot open config file {}: {err}",
            config_file.display()
        ))
    })?;

    let mut contents = String::new();
    file.read_to_string(&mut contents).map_err(|err| {
        H5OutError::Config(format!(
            "Cannot read config file {}: {err}",
            config_file.display()
        ))
    })?;
    Ok(contents)
}
