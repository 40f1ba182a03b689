use crate::{
    helpers::H5OutError,
    models::array::{ArrayData, Shape},
};

/// Read access to the datasets of a container
pub trait ContainerReader {
    /// Names of the datasets in the container, sorted
    fn dataset_names(&self) -> Result<Vec<String>, H5OutError>;

    fn read_dataset(&self, name: &str) -> Result<ArrayData, H5OutError>;

    fn dataset_shape(&self, name: &str) -> Result<Shape, H5OutError> {
        self.read_dataset(name).map(|array| array.shape())
    }

    fn contains(&self, name: &str) -> Result<bool, H5OutError> {
        Ok(self.dataset_names()?.iter().any(|dataset| dataset == name))
    }
}
