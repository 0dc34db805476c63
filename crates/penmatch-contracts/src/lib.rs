pub mod dataset;
pub mod events;
pub mod records;
pub mod runs;

pub use dataset::Dataset;
pub use records::{Decision, PairRecord};
