use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use log::debug;

use crate::{
    helpers::H5OutError,
    io::readers::prelude::ContainerReader,
    models::array::ArrayData,
};

use super::prelude::ContainerWriter;

type Datasets = BTreeMap<String, ArrayData>;
type Files = BTreeMap<PathBuf, Datasets>;

/// In-memory stand-in for a filesystem of containers. Clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: Arc<Mutex<Files>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn files(&self) -> Result<MutexGuard<'_, Files>, String> {
        self.files
            .lock()
            .map_err(|err| format!("Mutex poisoned: {err}"))
    }

    /// Snapshot of the container at `path`
    pub fn container(&self, path: &Path) -> Result<MemoryContainer, H5OutError> {
        let read_error = |reason: String| H5OutError::Read {
            path: path.to_path_buf(),
            reason,
        };
        let files = self.files().map_err(read_error)?;
        let datasets = files
            .get(path)
            .ok_or_else(|| read_error("container not found".to_string()))?;
        Ok(MemoryContainer {
            path: path.to_path_buf(),
            datasets: datasets.clone(),
        })
    }

    /// Deletes the container at `path` behind the back of any open writer
    pub fn remove(&self, path: &Path) -> Result<bool, H5OutError> {
        let mut files = self
            .files()
            .map_err(|reason| H5OutError::write(&path.display().to_string(), reason))?;
        Ok(files.remove(path).is_some())
    }
}

#[derive(Debug, Clone)]
pub struct MemoryContainer {
    path: PathBuf,
    datasets: Datasets,
}

impl MemoryContainer {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

impl ContainerReader for MemoryContainer {
    fn dataset_names(&self) -> Result<Vec<String>, H5OutError> {
        Ok(self.datasets.keys().cloned().collect())
    }

    fn read_dataset(&self, name: &str) -> Result<ArrayData, H5OutError> {
        self.datasets
            .get(name)
            .cloned()
            .ok_or_else(|| H5OutError::Read {
                path: self.path.clone(),
                reason: format!("dataset not found: {name}"),
            })
    }
}

pub struct MemoryWriter {
    store: MemoryStore,
    open: Option<PathBuf>,
}

impl MemoryWriter {
    pub fn new(store: &MemoryStore) -> Self {
        Self {
            store: store.clone(),
            open: None,
        }
    }

    fn with_datasets<R>(
        &self,
        name: &str,
        fun: impl FnOnce(&mut Datasets) -> R,
    ) -> Result<R, H5OutError> {
        let path = self
            .open
            .as_ref()
            .ok_or_else(|| H5OutError::write(name, "no open container"))?;
        let mut files = self
            .store
            .files()
            .map_err(|reason| H5OutError::write(name, reason))?;
        let datasets = files
            .get_mut(path)
            .ok_or_else(|| H5OutError::write(name, format!("container {path:?} no longer exists")))?;
        Ok(fun(datasets))
    }
}

impl ContainerWriter for MemoryWriter {
    fn open(&mut self, path: &Path) -> Result<(), H5OutError> {
        if let Some(current) = &self.open {
            return Err(H5OutError::Open {
                path: path.to_path_buf(),
                reason: format!("writer already holds {current:?}"),
            });
        }
        self.store
            .files()
            .map_err(|reason| H5OutError::Open {
                path: path.to_path_buf(),
                reason,
            })?
            .insert(path.to_path_buf(), Datasets::new());
        self.open = Some(path.to_path_buf());
        Ok(())
    }

    fn write_dataset(&mut self, name: &str, array: &ArrayData) -> Result<(), H5OutError> {
        self.with_datasets(name, |datasets| {
            datasets.insert(name.to_string(), array.clone());
        })?;
        debug!("[MEM] Wrote dataset {} ({})", name, array.shape());
        Ok(())
    }

    fn remove_dataset(&mut self, name: &str) -> Result<bool, H5OutError> {
        self.with_datasets(name, |datasets| datasets.remove(name).is_some())
    }

    fn close(&mut self) -> Result<(), H5OutError> {
        let Some(path) = self.open.take() else {
            return Ok(());
        };
        let exists = match self.store.files() {
            Ok(files) => files.contains_key(&path),
            Err(reason) => return Err(H5OutError::Close { path, reason }),
        };
        if exists {
            Ok(())
        } else {
            Err(H5OutError::Close {
                path,
                reason: "container no longer exists".to_string(),
            })
        }
    }

    fn is_open(&self) -> bool {
        self.open.is_some()
    }

    fn path(&self) -> Option<&Path> {
        self.open.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::array::{ElementType, Shape};

    fn array(count: usize) -> ArrayData {
        ArrayData::zeros(Shape::new(count, 1, 1, 1), ElementType::F32)
    }

    #[test]
    fn open_truncates_existing_container() {
        let store = MemoryStore::new();
        let path = Path::new("out.h5.0");

        let mut writer = MemoryWriter::new(&store);
        writer.open(path).expect("open");
        writer.write_dataset("data", &array(2)).expect("write");
        writer.close().expect("close");

        let mut writer = MemoryWriter::new(&store);
        writer.open(path).expect("reopen");
        let container = store.container(path).expect("container exists");
        assert!(container.is_empty());
    }

    #[test]
    fn write_replaces_dataset() {
        let store = MemoryStore::new();
        let mut writer = MemoryWriter::new(&store);
        writer.open(Path::new("a")).expect("open");
        writer.write_dataset("data", &array(2)).expect("write");
        writer.write_dataset("data", &array(5)).expect("overwrite");

        let container = store.container(Path::new("a")).expect("container");
        assert_eq!(container.len(), 1);
        assert_eq!(
            container.dataset_shape("data").expect("shape"),
            Shape::new(5, 1, 1, 1)
        );
    }

    #[test]
    fn second_open_is_rejected() {
        let store = MemoryStore::new();
        let mut writer = MemoryWriter::new(&store);
        writer.open(Path::new("a")).expect("open");
        assert!(matches!(
            writer.open(Path::new("b")),
            Err(H5OutError::Open { .. })
        ));
        assert_eq!(writer.path(), Some(Path::new("a")));
    }

    #[test]
    fn write_without_open_fails() {
        let mut writer = MemoryWriter::new(&MemoryStore::new());
        assert!(matches!(
            writer.write_dataset("data", &array(1)),
            Err(H5OutError::Write { .. })
        ));
    }

    #[test]
    fn close_is_noop_when_never_opened() {
        let mut writer = MemoryWriter::new(&MemoryStore::new());
        writer.close().expect("noop");
        assert!(!writer.is_open());
    }

    #[test]
    fn close_fails_when_container_disappeared() {
        let store = MemoryStore::new();
        let mut writer = MemoryWriter::new(&store);
        writer.open(Path::new("gone")).expect("open");
        assert!(store.remove(Path::new("gone")).expect("remove"));
        assert!(matches!(writer.close(), Err(H5OutError::Close { .. })));
        assert!(!writer.is_open());
    }

    #[test]
    fn missing_container_is_a_read_error() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.container(Path::new("never-opened")),
            Err(H5OutError::Read { .. })
        ));
        assert!(!store.remove(Path::new("never-opened")).expect("remove"));
    }

    #[test]
    fn poisoned_store_fails_every_call() {
        let store = MemoryStore::new();
        let mut writer = MemoryWriter::new(&store);
        writer.open(Path::new("a")).expect("open");

        let shared = store.clone();
        let crashed = std::thread::spawn(move || {
            let _files = shared.files.lock().expect("lock");
            panic!("writer thread died holding the store");
        })
        .join();
        assert!(crashed.is_err());

        assert!(matches!(
            writer.write_dataset("data", &array(1)),
            Err(H5OutError::Write { reason, .. }) if reason.starts_with("Mutex poisoned")
        ));
        assert!(matches!(
            store.container(Path::new("a")),
            Err(H5OutError::Read { .. })
        ));
        assert!(matches!(
            store.remove(Path::new("a")),
            Err(H5OutError::Write { .. })
        ));
        assert!(matches!(
            MemoryWriter::new(&store).open(Path::new("b")),
            Err(H5OutError::Open { .. })
        ));
        assert!(matches!(writer.close(), Err(H5OutError::Close { .. })));
        assert!(!writer.is_open());
    }
}
