//! Labeled training sequences and their run-length decomposition.
use anyhow::{anyhow, Result};
use itertools::Itertools;

/// One training sequence: the observed bases and, for each position, the
/// state id assigned by the labeling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrainingSequence {
    pub observed: Vec<u8>,
    pub labels: Vec<usize>,
}

impl TrainingSequence {
    pub fn new(observed: Vec<u8>, labels: Vec<usize>) -> Result<TrainingSequence> {
        if observed.len() != labels.len() {
            return Err(anyhow!(
                "Sequence has {} positions but {} labels",
                observed.len(),
                labels.len()
            ));
        }
        Ok(TrainingSequence { observed, labels })
    }

    /// Duration training only looks at the labels, so tests and simulators
    /// can skip the observed bases.
    pub fn from_labels(labels: Vec<usize>) -> TrainingSequence {
        TrainingSequence {
            observed: vec![b'N'; labels.len()],
            labels,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Decompose every label stream into maximal runs of identical consecutive
/// state and return, per state, the ordered list of observed run lengths.
pub fn state_run_lengths(
    data: &[TrainingSequence],
    num_states: usize,
) -> Result<Vec<Vec<usize>>> {
    let mut runs = vec![Vec::new(); num_states];
    for sequence in data {
        for (state, group) in &sequence.labels.iter().group_by(|&&s| s) {
            if state >= num_states {
                return Err(anyhow!(
                    "Label {} out of range for a {}-state model",
                    state,
                    num_states
                ));
            }
            runs[state].push(group.count());
        }
    }
    Ok(runs)
}
