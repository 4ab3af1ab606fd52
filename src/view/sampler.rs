use super::validator_set::ValidatorSet;

use crate::zfx_id::Id;
use crate::{Error, Result};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use std::cmp::Ordering;
use std::collections::HashSet;

/// How validators are drawn into a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplingMode {
    /// Inclusion probability proportional to stake weight. Zero-weight validators are
    /// never drawn.
    Weighted,
    /// Every validator is equally likely.
    Uniform,
}

impl Default for SamplingMode {
    fn default() -> Self {
        SamplingMode::Weighted
    }
}

/// Draws size-bounded samples of validators without replacement.
pub struct Sampler {
    mode: SamplingMode,
    rng: StdRng,
}

impl Sampler {
    pub fn new(mode: SamplingMode) -> Self {
        Sampler { mode, rng: StdRng::from_entropy() }
    }

    /// A sampler with a fixed seed, producing reproducible samples.
    pub fn with_seed(mode: SamplingMode, seed: u64) -> Self {
        Sampler { mode, rng: StdRng::seed_from_u64(seed) }
    }

    pub fn mode(&self) -> SamplingMode {
        self.mode
    }

    /// Samples `min(k, |eligible|)` distinct validators.
    ///
    /// When `exact` is set and fewer than `k` validators are eligible this fails with
    /// `InsufficientValidators` instead of returning the maximal subset.
    pub fn sample(&mut self, validators: &ValidatorSet, k: usize, exact: bool) -> Result<HashSet<Id>> {
        let eligible: Vec<(Id, u64)> = validators
            .sorted_ids()
            .into_iter()
            .filter_map(|id| {
                let w = validators.get(&id).cloned().unwrap_or(0);
                match self.mode {
                    SamplingMode::Weighted if w == 0 => None,
                    _ => Some((id, w)),
                }
            })
            .collect();
        if exact && k > eligible.len() {
            return Err(Error::InsufficientValidators { requested: k, available: eligible.len() });
        }
        let sample = match self.mode {
            SamplingMode::Uniform => eligible
                .choose_multiple(&mut self.rng, k)
                .map(|(id, _)| id.clone())
                .collect(),
            SamplingMode::Weighted => sample_weighted(&mut self.rng, eligible, k),
        };
        Ok(sample)
    }
}

// Weighted sampling without replacement: every validator draws the key `ln(u) / w` and the
// `k` largest keys win.
fn sample_weighted<R: Rng>(rng: &mut R, eligible: Vec<(Id, u64)>, k: usize) -> HashSet<Id> {
    let mut keyed: Vec<(f64, Id)> = eligible
        .into_iter()
        .map(|(id, w)| {
            let u: f64 = 1.0 - rng.gen::<f64>();
            (u.ln() / w as f64, id)
        })
        .collect();
    keyed.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(Ordering::Equal));
    keyed.into_iter().take(k).map(|(_, id)| id).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    use std::collections::HashMap;

    fn validators(n: u8) -> ValidatorSet {
        (1..=n).map(|i| (Id::new(&[i]), 1)).collect()
    }

    #[test]
    fn test_sample_exactly_k_distinct() {
        let set = validators(10);
        for mode in vec![SamplingMode::Weighted, SamplingMode::Uniform] {
            let mut sampler = Sampler::with_seed(mode, 42);
            for k in 0..=10 {
                let sample = sampler.sample(&set, k, true).unwrap();
                assert_eq!(sample.len(), k);
                for id in sample.iter() {
                    assert!(set.contains_key(id));
                }
            }
        }
    }

    #[test]
    fn test_insufficient_validators() {
        let set = validators(3);
        let mut sampler = Sampler::with_seed(SamplingMode::Uniform, 1);
        match sampler.sample(&set, 5, true) {
            Err(Error::InsufficientValidators { requested: 5, available: 3 }) => (),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(sampler.sample(&set, 5, false).unwrap().len(), 3);
    }

    #[test]
    fn test_zero_weight_never_sampled() {
        let mut set = validators(3);
        set.insert(Id::one(), 0);
        let mut sampler = Sampler::with_seed(SamplingMode::Weighted, 3);
        for _ in 0..50 {
            let sample = sampler.sample(&set, 4, false).unwrap();
            assert_eq!(sample.len(), 3);
            assert!(!sample.contains(&Id::one()));
        }
        // Uniform sampling ignores weights entirely.
        let mut sampler = Sampler::with_seed(SamplingMode::Uniform, 3);
        assert_eq!(sampler.sample(&set, 4, false).unwrap().len(), 4);
    }

    #[test]
    fn test_weighted_prefers_heavy_validators() {
        let mut set = ValidatorSet::new();
        let heavy = Id::new(b"heavy");
        let light = Id::new(b"light");
        set.insert(heavy, 1000);
        set.insert(light, 1);
        let mut sampler = Sampler::with_seed(SamplingMode::Weighted, 7);
        let mut counts: HashMap<Id, usize> = HashMap::new();
        for _ in 0..200 {
            for id in sampler.sample(&set, 1, true).unwrap() {
                *counts.entry(id).or_insert(0) += 1;
            }
        }
        assert!(counts.get(&heavy).cloned().unwrap_or(0) > 180);
    }

    #[test]
    fn test_empty_set() {
        let mut sampler = Sampler::with_seed(SamplingMode::Weighted, 1);
        assert!(sampler.sample(&ValidatorSet::new(), 3, false).unwrap().is_empty());
        assert!(sampler.sample(&ValidatorSet::new(), 3, true).is_err());
    }
}
