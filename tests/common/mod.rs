#![allow(dead_code)]
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use seglen::TrainingSequence;

/// Expand (state, run length) pairs into one labeled sequence.
pub fn sequence_from_runs(runs: &[(usize, usize)]) -> TrainingSequence {
    let mut labels = Vec::new();
    for &(state, len) in runs {
        labels.extend(std::iter::repeat(state).take(len));
    }
    TrainingSequence::from_labels(labels)
}

/// A gene-like corpus: intergenic runs around 200 bases, exon lengths
/// drawn from two well-separated clusters (around 50 and around 500),
/// intron lengths around 120.
pub fn two_cluster_corpus(rng: &mut StdRng, genes: usize) -> Vec<TrainingSequence> {
    let short_exon = Normal::new(50.0, 5.0).unwrap();
    let long_exon = Normal::new(500.0, 30.0).unwrap();
    let intron = Normal::new(120.0, 15.0).unwrap();
    let mut corpus = Vec::new();
    for i in 0..genes {
        let exon = if i % 2 == 0 { short_exon } else { long_exon };
        let runs = [
            (0, 150 + rng.gen_range(0..100)),
            (1, positive(exon.sample(rng))),
            (4, positive(intron.sample(rng))),
            (2, positive(exon.sample(rng))),
            (0, 150 + rng.gen_range(0..100)),
        ];
        corpus.push(sequence_from_runs(&runs));
    }
    corpus
}

fn positive(x: f64) -> usize {
    x.round().max(1.0) as usize
}
