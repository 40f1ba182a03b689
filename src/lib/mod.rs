pub mod config;
pub mod constants;
pub mod helpers;
pub mod stage;

pub mod models {
    pub mod array;
    pub mod slots;
}

pub mod io {
    pub mod readers {
        #[cfg(feature = "hdf5")]
        pub mod hdf5;
        pub mod prelude;
    }

    pub mod writers {
        #[cfg(feature = "hdf5")]
        pub mod hdf5;
        pub mod memory;
        pub mod prelude;
    }
}

pub use config::StageConfig;
pub use helpers::H5OutError;
pub use models::array::{ArrayData, ElementType, NamedArray, Shape};
pub use models::slots::{Slot, SlotBuffer};
pub use stage::{FlushSummary, InstanceCounter, OutputStage, StageState};
