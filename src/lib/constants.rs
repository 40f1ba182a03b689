/// Type name the stage registers under in the host graph
pub const STAGE_TYPE_NAME: &str = "HDF5Output";

/// Minimum number of input arrays per batch (data + label)
pub const MIN_INPUTS: usize = 2;
/// Maximum number of input arrays per batch (data + label + two additional arrays)
pub const MAX_INPUTS: usize = 4;
/// The stage is a terminal sink
pub const NUM_OUTPUTS: usize = 0;

/// Arrays are stored as (count, channels, height, width)
pub const MAX_RANK: usize = 4;
