//! The seam between this feature and the enclosing CRF engine: the
//! accumulator features write into, the caching contract they declare,
//! and the explicit-length (semi-Markov) feature trait.
use anyhow::Result;

/// Accumulates (weight index, value) pairs produced by feature
/// evaluations. Owned by the caller; a feature performs at most one write
/// per evaluation.
#[derive(Default, Clone, Debug)]
pub struct FeatureList {
    entries: Vec<(usize, f64)>,
}

impl FeatureList {
    pub fn new() -> FeatureList {
        FeatureList::default()
    }

    pub fn add_feature(&mut self, index: usize, value: f64) {
        self.entries.push((index, value));
    }

    /// Last value written at `index`, if any.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.entries
            .iter()
            .rev()
            .find(|(i, _)| *i == index)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(usize, f64)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// What the inference engine is allowed to cache about a feature's value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheStrategy {
    /// Recompute at every position.
    Uncached,
    /// The value depends only on (state, length), never on sequence
    /// content or absolute position: safe to memoize per (state, length)
    /// pair instead of per DP cell.
    LengthFunction,
}

/// The slice of model bookkeeping this feature needs: how many states the
/// enclosing model declares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelTopology {
    pub num_states: usize,
}

impl ModelTopology {
    pub fn new(num_states: usize) -> ModelTopology {
        ModelTopology { num_states }
    }
}

/// A feature scored once per contiguous segment of one state, rather than
/// once per position.
pub trait LengthFeature {
    /// Score the segment of `state` covering `[pos, pos + length)` and
    /// write the value(s) into `result`. Errors are fatal: they signal a
    /// defect in upstream segmentation or in the trained models.
    fn evaluate_length(
        &self,
        seq: &[u8],
        pos: usize,
        length: usize,
        state: usize,
        result: &mut FeatureList,
    ) -> Result<()>;

    /// Number of weight-vector slots this feature occupies.
    fn num_features(&self) -> usize;

    /// Display name of the feature at `feature_index`.
    fn feature_name(&self, feature_index: usize) -> String;

    fn cache_strategy(&self) -> CacheStrategy;
}
