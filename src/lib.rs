#![warn(clippy::large_types_passed_by_value)]

pub mod duration;
pub mod feature;
pub mod mixture;
pub mod sequence;
pub mod states;
pub mod utils;

pub use crate::duration::{DurationOptions, SegmentLengthFeature, TrainedSegmentLength};
pub use crate::feature::{CacheStrategy, FeatureList, LengthFeature, ModelTopology};
pub use crate::mixture::{
    DurationDistribution, EmOptions, Exponential, GammaComponent, GammaMixture,
};
pub use crate::sequence::{state_run_lengths, TrainingSequence};
pub use crate::states::{Category, CategoryMap, NUM_STATES};
