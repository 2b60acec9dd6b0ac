//! Seeded weighted random split.
//!
//! Every item is assigned to a subset by hashing its key together with the
//! seed, so the assignment depends neither on the item order nor on the
//! degree of parallelism. It may change across major versions of the `rand`
//! crate.

use crate::{
    common::*,
    config::SplitConfig,
    dataset::{CachedDataset, LabeledRecord},
    error::ConfigError,
};

/// Assign items to subsets with probabilities proportional to weights.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomSplit {
    /// Normalized cumulative upper bounds, the last one being 1.0.
    bounds: Vec<f64>,
    seed: u64,
}

impl RandomSplit {
    pub fn new(weights: &[f64], seed: u64) -> Result<Self, ConfigError> {
        if weights.is_empty() {
            return Err(ConfigError::InvalidSplit("weights must not be empty".into()));
        }
        if weights.iter().any(|&w| !w.is_finite() || w < 0.0) {
            return Err(ConfigError::InvalidSplit(format!(
                "weights must be non-negative, but get {:?}",
                weights
            )));
        }
        let sum: f64 = weights.iter().sum();
        if sum <= 0.0 {
            return Err(ConfigError::InvalidSplit(
                "the sum of weights must be positive".into(),
            ));
        }

        let mut bounds: Vec<_> = weights
            .iter()
            .scan(0.0, |acc, &weight| {
                *acc += weight / sum;
                Some(*acc)
            })
            .collect();
        // guard against rounding so that every draw in [0, 1) has a bucket
        if let Some(last) = bounds.last_mut() {
            *last = 1.0;
        }

        Ok(Self { bounds, seed })
    }

    pub fn num_subsets(&self) -> usize {
        self.bounds.len()
    }

    /// Return the subset index of the item identified by `key`.
    pub fn assign(&self, key: &[u8]) -> usize {
        let digest = {
            let mut hasher = blake3::Hasher::new();
            hasher.update(&self.seed.to_le_bytes());
            hasher.update(key);
            hasher.finalize()
        };
        let mut rng = StdRng::from_seed(*digest.as_bytes());
        let sample: f64 = rng.gen();

        self.bounds
            .iter()
            .position(|&bound| sample < bound)
            .unwrap_or(self.bounds.len() - 1)
    }

    /// Partition items into one `Vec` per weight, preserving input order.
    pub fn split<T, K, F>(&self, items: impl IntoIterator<Item = T>, mut key_fn: F) -> Vec<Vec<T>>
    where
        F: FnMut(&T) -> K,
        K: AsRef<[u8]>,
    {
        let mut subsets: Vec<Vec<T>> = iter::repeat_with(Vec::new)
            .take(self.num_subsets())
            .collect();
        items.into_iter().for_each(|item| {
            let index = self.assign(key_fn(&item).as_ref());
            subsets[index].push(item);
        });
        subsets
    }
}

/// Indices of the training and test records of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl TrainTestSplit {
    /// Split the dataset by the source path of each record.
    pub fn new(dataset: &CachedDataset, config: &SplitConfig) -> Result<Self> {
        config.validate()?;
        let SplitConfig { ref weights, seed } = *config;
        let split = RandomSplit::new(weights, seed)?;

        let raw = dataset.raw_records();
        let [train, test]: [Vec<usize>; 2] = split
            .split(0..dataset.num_records(), |&index| raw[index].path.as_str())
            .try_into()
            .map_err(|subsets: Vec<_>| {
                format_err!("expect 2 subsets, but get {}", subsets.len())
            })?;

        Ok(Self { train, test })
    }

    pub fn num_train(&self) -> usize {
        self.train.len()
    }

    pub fn num_test(&self) -> usize {
        self.test.len()
    }

    /// Resolve the indices to labeled records.
    pub fn records<'a>(
        &self,
        dataset: &'a CachedDataset,
    ) -> (Vec<&'a LabeledRecord>, Vec<&'a LabeledRecord>) {
        let labeled = dataset.labeled_records();
        let select = |indices: &[usize]| -> Vec<&'a LabeledRecord> {
            indices.iter().map(|&index| &labeled[index]).collect()
        };
        (select(&self.train), select(&self.test))
    }
}
