//! Duration distributions for segment lengths: a single Exponential or a
//! two-component mixture of Gammas trained with EM.
//!
//! The mixture fit adds synthetic pseudo-observations at 90%, 95%, 105%
//! and 110% of the sample median before running EM. Without them EM can
//! converge to a component holding a single data point, whose likelihood
//! grows without bound as its variance shrinks.
use crate::utils::{log_add_exp, log_gamma, log_sum_exp, mean, median, variance};
use anyhow::{anyhow, Result};
use ndarray::Array1;
use rand::Rng;
use rand_distr::Distribution;
use serde::{Deserialize, Serialize};

/// Relative floor on a component variance (in units of mean^2). Keeps the
/// method-of-moments update finite when a component concentrates on
/// near-identical lengths.
const VARIANCE_FLOOR: f64 = 1e-6;

/// Below this total responsibility a component is left untouched by the
/// M-step instead of being refit on numerical noise.
const RESPONSIBILITY_FLOOR: f64 = 1e-9;

/// EM stopping rule. Both knobs are estimator parameters, not hidden
/// constants: callers can tighten or relax them per training run.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EmOptions {
    /// Hard cap on the number of EM iterations.
    pub max_iterations: usize,
    /// Stop once the relative change of the total log-likelihood between
    /// two iterations drops below this.
    pub tolerance: f64,
}

impl Default for EmOptions {
    fn default() -> EmOptions {
        EmOptions {
            max_iterations: 500,
            tolerance: 1e-6,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Exponential {
    rate: f64,
}

impl Exponential {
    pub fn fit(samples: &Array1<f64>) -> Result<Exponential> {
        check_samples(samples)?;
        let m = samples
            .mean()
            .ok_or(anyhow!("Cannot fit an exponential on an empty sample set"))?;
        Ok(Exponential { rate: 1.0 / m })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn log_density(&self, x: f64) -> f64 {
        self.rate.ln() - self.rate * x
    }

    pub fn generate<R: Rng>(&self, rng: &mut R) -> f64 {
        rand_distr::Exp::new(self.rate).unwrap().sample(rng)
    }
}

/// One Gamma component, rate parameterization:
/// f(x) = β^α / Γ(α) * x^(α−1) * e^(−βx)
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GammaComponent {
    pub shape: f64,
    pub rate: f64,
}

impl GammaComponent {
    /// Method-of-moments estimate from a weighted mean and variance.
    fn from_moments(mean: f64, variance: f64) -> GammaComponent {
        let var = variance.max(VARIANCE_FLOOR * mean * mean);
        GammaComponent {
            shape: mean * mean / var,
            rate: mean / var,
        }
    }

    pub fn mean(&self) -> f64 {
        self.shape / self.rate
    }

    pub fn log_density(&self, x: f64) -> f64 {
        self.shape * self.rate.ln() - log_gamma(self.shape) + (self.shape - 1.0) * x.ln()
            - self.rate * x
    }

    pub fn generate<R: Rng>(&self, rng: &mut R) -> f64 {
        // rand_distr parameterizes Gamma by shape and scale
        rand_distr::Gamma::new(self.shape, 1.0 / self.rate)
            .unwrap()
            .sample(rng)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GammaMixture {
    weights: [f64; 2],
    components: [GammaComponent; 2],
}

impl GammaMixture {
    /// Fit by EM on the raw samples plus the median pseudo-observations.
    /// Initialization is deterministic (median split + method of moments),
    /// so repeated fits on the same data give the same model.
    pub fn fit(samples: &Array1<f64>, options: &EmOptions) -> Result<GammaMixture> {
        check_samples(samples)?;
        if samples.len() < 2 {
            return Err(anyhow!(
                "Need at least two samples to fit a mixture, got {}",
                samples.len()
            ));
        }

        let med = median(&samples.to_vec());
        let mut observed = samples.to_vec();
        observed.extend([0.90, 0.95, 1.05, 1.10].iter().map(|f| f * med));
        let xs = Array1::from_vec(observed);
        let n = xs.len();

        let low: Vec<f64> = xs.iter().copied().filter(|&x| x <= med).collect();
        let high: Vec<f64> = xs.iter().copied().filter(|&x| x > med).collect();
        let mut weights = [low.len() as f64 / n as f64, high.len() as f64 / n as f64];
        let mut components = [
            GammaComponent::from_moments(mean(&low), variance(&low)),
            GammaComponent::from_moments(mean(&high), variance(&high)),
        ];

        let mut prev_ll = f64::NEG_INFINITY;
        for _ in 0..options.max_iterations {
            // E-step, in the log domain
            let mut resp0 = Array1::<f64>::zeros(n);
            let mut ll = 0.0;
            for (i, &x) in xs.iter().enumerate() {
                let a = weights[0].ln() + components[0].log_density(x);
                let b = weights[1].ln() + components[1].log_density(x);
                let total = log_sum_exp(&[a, b]);
                resp0[i] = (a - total).exp();
                ll += total;
            }

            // M-step: weighted method of moments per component
            let resp = |i: usize, k: usize| if k == 0 { resp0[i] } else { 1.0 - resp0[i] };
            for k in 0..2 {
                let nk: f64 = (0..n).map(|i| resp(i, k)).sum();
                if nk < RESPONSIBILITY_FLOOR {
                    continue;
                }
                let mk = (0..n).map(|i| resp(i, k) * xs[i]).sum::<f64>() / nk;
                let vk = (0..n)
                    .map(|i| resp(i, k) * (xs[i] - mk) * (xs[i] - mk))
                    .sum::<f64>()
                    / nk;
                components[k] = GammaComponent::from_moments(mk, vk);
                weights[k] = nk / n as f64;
            }
            let wsum = weights[0] + weights[1];
            weights[0] /= wsum;
            weights[1] /= wsum;

            if (ll - prev_ll).abs() <= options.tolerance * ll.abs().max(1.0) {
                break;
            }
            prev_ll = ll;
        }

        Ok(GammaMixture {
            weights,
            components,
        })
    }

    pub fn log_density(&self, x: f64) -> f64 {
        log_add_exp(
            self.weights[0].ln() + self.components[0].log_density(x),
            self.weights[1].ln() + self.components[1].log_density(x),
        )
    }

    pub fn weights(&self) -> [f64; 2] {
        self.weights
    }

    pub fn component_means(&self) -> [f64; 2] {
        [self.components[0].mean(), self.components[1].mean()]
    }

    pub fn generate<R: Rng>(&self, rng: &mut R) -> f64 {
        if rng.gen::<f64>() < self.weights[0] {
            self.components[0].generate(rng)
        } else {
            self.components[1].generate(rng)
        }
    }
}

/// A fitted duration distribution for one category of states.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum DurationDistribution {
    Exponential(Exponential),
    GammaMixture(GammaMixture),
}

impl DurationDistribution {
    /// Fit from pooled run lengths. `force_exponential` short-circuits the
    /// mixture; so does a zero-variance pool, since identical lengths give
    /// the EM nothing to separate.
    pub fn fit(
        samples: &Array1<f64>,
        force_exponential: bool,
        options: &EmOptions,
    ) -> Result<DurationDistribution> {
        check_samples(samples)?;
        if force_exponential || variance(&samples.to_vec()) == 0.0 {
            Ok(DurationDistribution::Exponential(Exponential::fit(
                samples,
            )?))
        } else {
            Ok(DurationDistribution::GammaMixture(GammaMixture::fit(
                samples, options,
            )?))
        }
    }

    pub fn log_density(&self, x: f64) -> f64 {
        match self {
            DurationDistribution::Exponential(d) => d.log_density(x),
            DurationDistribution::GammaMixture(d) => d.log_density(x),
        }
    }

    pub fn generate<R: Rng>(&self, rng: &mut R) -> f64 {
        match self {
            DurationDistribution::Exponential(d) => d.generate(rng),
            DurationDistribution::GammaMixture(d) => d.generate(rng),
        }
    }
}

fn check_samples(samples: &Array1<f64>) -> Result<()> {
    if samples.is_empty() {
        return Err(anyhow!("Cannot fit a duration distribution on an empty sample set"));
    }
    if samples.iter().any(|&x| !x.is_finite() || x <= 0.0) {
        return Err(anyhow!("Segment lengths must be finite and positive"));
    }
    Ok(())
}
