//! The segment-duration feature itself: training pools per-state run
//! lengths into the three categories and fits one duration distribution
//! per category; evaluation scores a (state, length) segment with the
//! fitted log-density.
use crate::feature::{CacheStrategy, FeatureList, LengthFeature, ModelTopology};
use crate::mixture::{DurationDistribution, EmOptions};
use crate::sequence::{state_run_lengths, TrainingSequence};
use crate::states::{Category, CategoryMap, NUM_STATES};
use anyhow::{anyhow, Context, Result};
use log::warn;
use ndarray::Array1;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Configuration of the duration feature, fixed before training.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct DurationOptions {
    /// Model every category with a single exponential.
    pub force_exponential: bool,
    /// Force the exponential for exon lengths only.
    pub exon_exponential: bool,
    /// Force the exponential for intron lengths only.
    pub intron_exponential: bool,
    /// Give intergenic, exon and intron lengths three independent weights
    /// instead of one shared weight.
    pub multiple_features: bool,
    /// Perform no write for intergenic segments (their duration weighting
    /// is handled or suppressed elsewhere).
    pub no_intergenic: bool,
    /// EM stopping rule for the mixture fits.
    pub em: EmOptions,
}

/// The untrained feature: configuration only. `train` produces the
/// immutable value every evaluation call goes through.
#[derive(Clone, Copy, Debug, Default)]
pub struct SegmentLengthFeature {
    pub options: DurationOptions,
}

impl SegmentLengthFeature {
    pub fn new(options: DurationOptions) -> SegmentLengthFeature {
        SegmentLengthFeature { options }
    }

    /// Assign the feature offset and fit the three category models from
    /// the labeled training corpus.
    pub fn train(
        &self,
        starting_index: usize,
        topology: &ModelTopology,
        data: &[TrainingSequence],
    ) -> Result<TrainedSegmentLength> {
        if topology.num_states != NUM_STATES {
            return Err(anyhow!(
                "This duration feature is specific to a {}-state topology, the model declares {}",
                NUM_STATES,
                topology.num_states
            ));
        }

        let per_state = state_run_lengths(data, NUM_STATES)?;
        let category_map = CategoryMap::new();
        let mut pools: Vec<Vec<f64>> = vec![Vec::new(); 3];
        for (state, lengths) in per_state.iter().enumerate() {
            let category = category_map.category(state)?;
            pools[category.index()].extend(lengths.iter().map(|&l| l as f64));
        }

        // Intergenic lengths are always modeled with an exponential; exon
        // and intron use the mixture unless forced off.
        let force = [
            true,
            self.options.force_exponential || self.options.exon_exponential,
            self.options.force_exponential || self.options.intron_exponential,
        ];

        // The three pooled fits are independent of each other.
        let models = pools
            .par_iter()
            .enumerate()
            .map(|(k, pool)| {
                DurationDistribution::fit(
                    &Array1::from_vec(pool.clone()),
                    force[k],
                    &self.options.em,
                )
                .with_context(|| {
                    format!("Failed to fit the {} duration model", Category::ALL[k].name())
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let models: [DurationDistribution; 3] = models
            .try_into()
            .map_err(|_| anyhow!("Expected one duration model per category"))?;

        Ok(TrainedSegmentLength {
            options: self.options,
            start_ix: starting_index,
            category_map,
            models,
        })
    }
}

/// A trained duration feature. Immutable once built, so evaluation can run
/// from any number of scoring workers without locking.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainedSegmentLength {
    options: DurationOptions,
    start_ix: usize,
    #[serde(skip, default)]
    category_map: CategoryMap,
    models: [DurationDistribution; 3],
}

impl TrainedSegmentLength {
    pub fn options(&self) -> &DurationOptions {
        &self.options
    }

    pub fn starting_index(&self) -> usize {
        self.start_ix
    }

    pub fn model(&self, category: Category) -> &DurationDistribution {
        &self.models[category.index()]
    }

    /// Sample a synthetic segment length for `category`, rounded to the
    /// nearest positive integer.
    pub fn generate_length<R: Rng>(&self, category: Category, rng: &mut R) -> usize {
        self.model(category).generate(rng).round().max(1.0) as usize
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<TrainedSegmentLength> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }
}

impl LengthFeature for TrainedSegmentLength {
    fn evaluate_length(
        &self,
        _seq: &[u8],
        _pos: usize,
        length: usize,
        state: usize,
        result: &mut FeatureList,
    ) -> Result<()> {
        if length == 0 {
            return Err(anyhow!(
                "Zero-length segment for state {}: upstream segmentation is broken",
                state
            ));
        }
        let category = self.category_map.category(state)?;
        if self.options.no_intergenic && category == Category::Intergenic {
            return Ok(());
        }

        let val = self.model(category).log_density(length as f64);
        if !val.is_finite() {
            return Err(anyhow!(
                "Non-finite duration log-probability {} for state {} at length {}",
                val,
                state,
                length
            ));
        }
        if val > 0.0 {
            // Summing the continuous density over integer lengths is only
            // approximately normalized, so a small positive value can occur.
            warn!(
                "Duration log-probability {} at length {} is positive",
                val, length
            );
        }

        let offset = if self.options.multiple_features {
            category.index()
        } else {
            0
        };
        result.add_feature(self.start_ix + offset, val);
        Ok(())
    }

    fn num_features(&self) -> usize {
        if self.options.multiple_features {
            3
        } else {
            1
        }
    }

    fn feature_name(&self, feature_index: usize) -> String {
        if self.options.multiple_features {
            let category = Category::ALL[feature_index - self.start_ix];
            format!("{} lengths", category.name())
        } else {
            "State duration log-probability".to_string()
        }
    }

    fn cache_strategy(&self) -> CacheStrategy {
        CacheStrategy::LengthFunction
    }
}
