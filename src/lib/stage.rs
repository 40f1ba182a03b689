use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use chrono::Utc;
use log::{debug, error, info, trace};
use serde_derive::Serialize;
use strum_macros::Display;

use crate::{
    config::StageConfig,
    constants::{MAX_INPUTS, MIN_INPUTS, NUM_OUTPUTS, STAGE_TYPE_NAME},
    helpers::{instance_path, H5OutError},
    io::writers::prelude::ContainerWriter,
    models::{
        array::NamedArray,
        slots::{Slot, SlotBuffer},
    },
};

/// Shared source of instance numbers used to give every stage its own output file.
///
/// Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct InstanceCounter {
    next: Arc<AtomicU64>,
}

impl InstanceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: Arc::new(AtomicU64::new(first)),
        }
    }

    /// Claims the next instance number
    pub fn claim(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Number the next claim will return
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StageState {
    Uninitialized,
    Open,
    Flushing,
    Closed,
}

/// What a single `consume` call persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlushSummary {
    /// Sequence number of the batch within this stage, starting at 0
    pub batch: u64,
    /// Leading dimension shared by the written arrays
    pub rows: usize,
    /// Number of datasets written
    pub datasets: usize,
}

/// Terminal pipeline stage saving the arrays of each batch into its own container.
///
/// Every flush replaces the datasets of the previous one: the container holds the last batch.
pub struct OutputStage {
    config: StageConfig,
    instance: u64,
    path: PathBuf,
    writer: Box<dyn ContainerWriter>,
    buffer: SlotBuffer,
    state: StageState,
    batches: u64,
}

impl OutputStage {
    pub fn new(
        config: StageConfig,
        writer: Box<dyn ContainerWriter>,
        counter: &InstanceCounter,
    ) -> Self {
        let instance = counter.claim();
        let path = instance_path(&config.file_name, instance);
        Self {
            config,
            instance,
            path,
            writer,
            buffer: SlotBuffer::new(),
            state: StageState::Uninitialized,
            batches: 0,
        }
    }

    /// Builds a stage writing HDF5 files
    #[cfg(feature = "hdf5")]
    pub fn hdf5(config: StageConfig, counter: &InstanceCounter) -> Self {
        Self::new(
            config,
            Box::new(crate::io::writers::hdf5::Hdf5Writer::new()),
            counter,
        )
    }

    /// Opens the output container. A failed open leaves the stage closed.
    pub fn setup(&mut self) -> Result<&Path, H5OutError> {
        match self.state {
            StageState::Uninitialized => {}
            StageState::Closed => return Err(H5OutError::UseAfterClose),
            StageState::Open | StageState::Flushing => return Err(H5OutError::AlreadySetUp),
        }

        info!("HDF5 file name : {}", self.path.display());
        if let Err(err) = self.writer.open(&self.path) {
            self.state = StageState::Closed;
            return Err(err);
        }
        self.state = StageState::Open;
        Ok(&self.path)
    }

    /// Stages and writes one batch of 2 to 4 arrays: data, label, then up to two
    /// additional arrays.
    pub fn consume(&mut self, batch: &[NamedArray]) -> Result<FlushSummary, H5OutError> {
        match self.state {
            StageState::Open | StageState::Flushing => {}
            StageState::Closed => return Err(H5OutError::UseAfterClose),
            StageState::Uninitialized => return Err(H5OutError::NotSetUp),
        }

        if !self.input_range().contains(&batch.len()) {
            return Err(H5OutError::InputCount(batch.len()));
        }

        let (data, label) = (batch[0].count(), batch[1].count());
        if data != label {
            return Err(H5OutError::BatchSizeMismatch { data, label });
        }

        self.buffer.clear();
        for (position, array) in batch.iter().enumerate() {
            let slot = Slot::at(position).ok_or(H5OutError::InputCount(batch.len()))?;
            debug!("Staging {} as {}", array.name(), slot);
            self.buffer.stage(slot, array.data())?;
        }

        self.state = StageState::Flushing;
        let result = self.flush();
        self.state = StageState::Open;
        result
    }

    fn flush(&mut self) -> Result<FlushSummary, H5OutError> {
        let start = Utc::now();
        info!("Saving HDF5 file {}", self.path.display());

        for (slot, array) in self.buffer.iter() {
            self.writer.write_dataset(slot.as_ref(), array)?;
        }
        // keep the container in sync with the batch when it has fewer arrays than the last one
        for slot in &Slot::ALL[self.buffer.len()..] {
            if self.writer.remove_dataset(slot.as_ref())? {
                debug!("Removed stale dataset {}", slot);
            }
        }

        let summary = FlushSummary {
            batch: self.batches,
            rows: self.buffer.batch_size().unwrap_or(0),
            datasets: self.buffer.len(),
        };
        self.batches += 1;

        info!(
            "Successfully saved {} rows for {} datasets",
            summary.rows, summary.datasets
        );
        trace!("Flush took {} seconds", Utc::now() - start);
        Ok(summary)
    }

    /// The stage computes no gradients
    pub fn backward(&self) {}

    /// The stage has no outputs to reshape
    pub fn reshape(&self) {}

    /// Closes the container. Closing an already closed stage is a no-op.
    pub fn close(&mut self) -> Result<(), H5OutError> {
        if self.state == StageState::Closed {
            return Ok(());
        }
        self.state = StageState::Closed;
        self.writer.close().inspect_err(|err| {
            error!("Failed to close HDF5 file {}: {}", self.path.display(), err);
        })
    }

    pub fn type_name(&self) -> &'static str {
        STAGE_TYPE_NAME
    }

    /// Accepted number of input arrays per batch
    pub fn input_range(&self) -> std::ops::RangeInclusive<usize> {
        MIN_INPUTS..=MAX_INPUTS
    }

    pub fn num_outputs(&self) -> usize {
        NUM_OUTPUTS
    }

    /// Separate instances never share a file, so parallel contexts may each build one
    pub fn shares_in_parallel(&self) -> bool {
        true
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn state(&self) -> StageState {
        self.state
    }

    /// Number of batches flushed so far
    pub fn batches_written(&self) -> u64 {
        self.batches
    }

    /// Slots written by the last flush
    pub fn active_slots(&self) -> &[Slot] {
        self.buffer.active_slots()
    }
}

impl Drop for OutputStage {
    fn drop(&mut self) {
        // close() logs failures itself
        let _ = self.close();
    }
}
