use std::env::{set_var, var};
use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{arg, command, Parser};
use h5out::helpers::instance_path;
use h5out::io::readers::hdf5::Hdf5Reader;
use h5out::io::readers::prelude::ContainerReader;
use h5out::{ElementType, H5OutError, InstanceCounter, Shape, StageConfig};
use log::{info, warn};
use serde_derive::Serialize;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Inspect the HDF5 containers written by the HDF5Output stage",
    long_about = "Lists the datasets (data, label, additional1, additional2) stored in each container, \
with their element type and shape. With --config, prints the file names the stage instances \
built from that configuration resolve to."
)]
struct Args {
    #[arg(help = "Path to the container files to inspect")]
    paths: Vec<String>,

    #[arg(long, help = "Print a JSON report on stdout")]
    json: bool,

    #[arg(long, help = "Path to a stage configuration file (yaml or json)")]
    config: Option<String>,

    #[arg(long, default_value_t = 1, help = "Number of stage instances to resolve")]
    instances: u64,
}

#[derive(Debug, Serialize)]
struct DatasetReport {
    name: String,
    element_type: ElementType,
    shape: Shape,
}

#[derive(Debug, Serialize)]
struct ContainerReport {
    path: PathBuf,
    datasets: Vec<DatasetReport>,
}

fn inspect(path: &Path) -> Result<ContainerReport, H5OutError> {
    let reader = Hdf5Reader::open(path)?;
    let datasets = reader
        .dataset_names()?
        .into_iter()
        .map(|name| {
            let array = reader.read_dataset(&name)?;
            Ok(DatasetReport {
                name,
                element_type: array.element_type(),
                shape: array.shape(),
            })
        })
        .collect::<Result<Vec<_>, H5OutError>>()?;

    Ok(ContainerReport {
        path: path.to_path_buf(),
        datasets,
    })
}

fn resolve_paths(config_path: &str, instances: u64) -> Result<Vec<PathBuf>, H5OutError> {
    let config = StageConfig::from_file(config_path)?;
    let counter = InstanceCounter::new();
    Ok((0..instances)
        .map(|_| instance_path(&config.file_name, counter.claim()))
        .collect())
}

/// main function
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    if var("RUST_LOG").is_err() {
        set_var("RUST_LOG", "info")
    }
    pretty_env_logger::init();

    if let Some(config_path) = &args.config {
        if !Path::new(config_path).is_file() {
            return Err(format!("Config file {} is not a file", config_path).into());
        }
        for path in resolve_paths(config_path, args.instances)? {
            println!("{}", path.display());
        }
    }

    let mut reports = Vec::new();
    for path in &args.paths {
        match inspect(Path::new(path)) {
            Ok(report) => reports.push(report),
            Err(err) => warn!("Error inspecting {}: {}", path, err),
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for report in &reports {
        info!(
            "{}: {} datasets",
            report.path.display(),
            report.datasets.len()
        );
        for dataset in &report.datasets {
            info!(
                "  {} {} {}",
                dataset.name, dataset.element_type, dataset.shape
            );
        }
    }

    Ok(())
}
