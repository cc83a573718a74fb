//! Finite indexable datasets of training tuples.
//!
//! - [`TripletProvider`] - one `(anchor, positive, negative)` per pool slot
//! - [`MultiPosNegProvider`] - one anchor, `n_pos` positives and `n_neg`
//!   negatives per fully-specified class
//!
//! Providers are read-only views over the annotations and mined shortlists;
//! the triplet pool is the only state they own. Every access takes the random
//! source explicitly, so index accesses are independent draws.
//!
//! # Example
//!
//! ```rust
//! use ecsample_core::{
//!     mine, Annotations, Dataset, DistanceMap, InMemoryStore, MultiPosNegConfig,
//!     MultiPosNegProvider,
//! };
//! use rand::SeedableRng;
//!
//! let annotations = Annotations::from_tsv_reader(
//!     "Entry\tEC number\nP1\t1.1.1.1\nP2\t1.1.1.1\nP3\t2.1.1.1\n".as_bytes(),
//! )
//! .unwrap();
//! let distances = DistanceMap::new()
//!     .with_row("1.1.1.1", [("1.1.1.1", 0.0), ("2.1.1.1", 0.4)])
//!     .with_row("2.1.1.1", [("1.1.1.1", 0.4), ("2.1.1.1", 0.0)]);
//! let mined = mine(&distances, 10).unwrap();
//!
//! let store = InMemoryStore::new()
//!     .with("P1", vec![1.0])
//!     .with("P2", vec![2.0])
//!     .with("P3", vec![3.0]);
//!
//! let config = MultiPosNegConfig::default().with_n_pos(2).with_n_neg(1);
//! let provider = MultiPosNegProvider::new(&annotations, &mined, &store, config).unwrap();
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(42);
//! let rows = provider.get(0, &mut rng).unwrap();
//! assert_eq!(rows.len(), 4);
//! ```

use crate::sampling::{pick, sample_negative, sample_positive, SamplingConfig};
use crate::{Annotations, ClassId, EntityId, Error, MiningResult, Result, TensorStore};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Finite, indexable dataset consumed by a batching loader.
pub trait Dataset {
    type Item;

    /// Number of indices.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample and load the item at `index`.
    fn get<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> Result<Self::Item>;
}

/// How the triplet pool of anchor classes is drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolStrategy {
    /// Uniform entity, then a uniform class of that entity. A class's
    /// frequency follows its membership count, with multi-class entities
    /// splitting their share. Partial classes can appear.
    #[default]
    EntityWeighted,
    /// Uniform over fully-specified classes, with replacement.
    UniformClasses,
    /// Every fully-specified class exactly once; `pool_size` is ignored.
    FullySpecified,
}

/// Triplet provider configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripletConfig {
    /// Pool slots per epoch (default: 256).
    pub pool_size: usize,
    pub pool_strategy: PoolStrategy,
    pub sampling: SamplingConfig,
}

impl Default for TripletConfig {
    fn default() -> Self {
        Self {
            pool_size: 256,
            pool_strategy: PoolStrategy::default(),
            sampling: SamplingConfig::default(),
        }
    }
}

impl TripletConfig {
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_pool_strategy(mut self, strategy: PoolStrategy) -> Self {
        self.pool_strategy = strategy;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }
}

/// Anchor, positive and negative of one training example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triplet<T = EntityId> {
    pub anchor: T,
    pub positive: T,
    pub negative: T,
}

impl<T> Triplet<T> {
    /// Apply a fallible conversion to each member, anchor first.
    pub fn try_map<U, F>(self, mut f: F) -> Result<Triplet<U>>
    where
        F: FnMut(T) -> Result<U>,
    {
        Ok(Triplet {
            anchor: f(self.anchor)?,
            positive: f(self.positive)?,
            negative: f(self.negative)?,
        })
    }

    pub fn into_array(self) -> [T; 3] {
        [self.anchor, self.positive, self.negative]
    }
}

/// Triplets drawn from a pool of anchor classes.
pub struct TripletProvider<'a, S> {
    annotations: &'a Annotations,
    mined: &'a MiningResult,
    store: S,
    config: TripletConfig,
    pool: Vec<ClassId>,
}

impl<'a, S: TensorStore> TripletProvider<'a, S> {
    /// Create a provider and draw its first pool.
    pub fn new<R: Rng + ?Sized>(
        annotations: &'a Annotations,
        mined: &'a MiningResult,
        store: S,
        config: TripletConfig,
        rng: &mut R,
    ) -> Result<Self> {
        config.sampling.validate()?;
        if config.pool_size == 0 && config.pool_strategy != PoolStrategy::FullySpecified {
            return Err(Error::InvalidConfig("pool_size must be at least 1".into()));
        }

        let mut provider = Self {
            annotations,
            mined,
            store,
            config,
            pool: Vec::new(),
        };
        provider.regenerate_pool(rng)?;
        Ok(provider)
    }

    /// Redraw the pool of anchor classes, e.g. once per epoch.
    pub fn regenerate_pool<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        self.pool = build_pool(self.annotations, &self.config, rng)?;
        tracing::info!(
            size = self.pool.len(),
            strategy = ?self.config.pool_strategy,
            "Built triplet pool"
        );
        Ok(())
    }

    /// Anchor classes, one per index.
    pub fn pool(&self) -> &[ClassId] {
        &self.pool
    }

    pub fn config(&self) -> &TripletConfig {
        &self.config
    }

    /// Sample the entity ids for `index` without loading tensors.
    pub fn sample_ids<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> Result<Triplet> {
        let class = self.pool.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.pool.len(),
        })?;
        let anchor = pick(self.annotations.members_of(class)?, rng).clone();
        let sampling = &self.config.sampling;
        let positive = sample_positive(&anchor, self.annotations, sampling, rng)?;
        let negative = sample_negative(&anchor, self.annotations, self.mined, sampling, rng)?;

        Ok(Triplet {
            anchor,
            positive,
            negative,
        })
    }
}

impl<S: TensorStore> Dataset for TripletProvider<'_, S> {
    type Item = Triplet<S::Tensor>;

    fn len(&self) -> usize {
        self.pool.len()
    }

    fn get<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> Result<Self::Item> {
        self.sample_ids(index, rng)?
            .try_map(|id| self.store.load(&id))
    }
}

fn build_pool<R: Rng + ?Sized>(
    annotations: &Annotations,
    config: &TripletConfig,
    rng: &mut R,
) -> Result<Vec<ClassId>> {
    match config.pool_strategy {
        PoolStrategy::EntityWeighted => {
            let entities = annotations.entities();
            if entities.is_empty() {
                return Err(Error::InvalidConfig("no entities to build a pool from".into()));
            }
            (0..config.pool_size)
                .map(|_| {
                    let entity = pick(entities, rng);
                    annotations
                        .classes_of(entity)
                        .map(|classes| pick(classes, rng).clone())
                })
                .collect()
        }
        PoolStrategy::UniformClasses => {
            let classes = annotations.fully_specified_classes();
            if classes.is_empty() {
                return Err(Error::InvalidConfig(
                    "no fully-specified classes to build a pool from".into(),
                ));
            }
            Ok((0..config.pool_size)
                .map(|_| pick(&classes, rng).clone())
                .collect())
        }
        PoolStrategy::FullySpecified => Ok(annotations.fully_specified_classes()),
    }
}

/// Configuration for multi-positive/negative sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiPosNegConfig {
    /// Positives per anchor (default: 1).
    pub n_pos: usize,
    /// Negatives per anchor (default: 1).
    pub n_neg: usize,
    pub sampling: SamplingConfig,
}

impl Default for MultiPosNegConfig {
    fn default() -> Self {
        Self {
            n_pos: 1,
            n_neg: 1,
            sampling: SamplingConfig::default(),
        }
    }
}

impl MultiPosNegConfig {
    pub fn with_n_pos(mut self, n_pos: usize) -> Self {
        self.n_pos = n_pos;
        self
    }

    pub fn with_n_neg(mut self, n_neg: usize) -> Self {
        self.n_neg = n_neg;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    /// Items per sample: anchor, positives, negatives.
    pub fn group_size(&self) -> usize {
        1 + self.n_pos + self.n_neg
    }
}

/// One anchor with several positives and negatives per fully-specified class.
///
/// Items are ordered anchor first, then positives, then negatives. Losses
/// index into this layout, so the order is part of the contract.
pub struct MultiPosNegProvider<'a, S> {
    annotations: &'a Annotations,
    mined: &'a MiningResult,
    store: S,
    config: MultiPosNegConfig,
    classes: Vec<ClassId>,
}

impl<'a, S: TensorStore> MultiPosNegProvider<'a, S> {
    pub fn new(
        annotations: &'a Annotations,
        mined: &'a MiningResult,
        store: S,
        config: MultiPosNegConfig,
    ) -> Result<Self> {
        config.sampling.validate()?;
        let classes = annotations.fully_specified_classes();
        tracing::info!(
            classes = classes.len(),
            n_pos = config.n_pos,
            n_neg = config.n_neg,
            "Built multi-positive/negative provider"
        );
        Ok(Self {
            annotations,
            mined,
            store,
            config,
            classes,
        })
    }

    /// Anchor classes, one per index.
    pub fn classes(&self) -> &[ClassId] {
        &self.classes
    }

    pub fn config(&self) -> &MultiPosNegConfig {
        &self.config
    }

    /// Sample `[anchor, positives.., negatives..]` for `index`.
    pub fn sample_ids<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> Result<Vec<EntityId>> {
        let class = self.classes.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.classes.len(),
        })?;
        let anchor = pick(self.annotations.members_of(class)?, rng).clone();
        let sampling = &self.config.sampling;

        let mut ids = Vec::with_capacity(self.config.group_size());
        ids.push(anchor.clone());
        for _ in 0..self.config.n_pos {
            ids.push(sample_positive(&anchor, self.annotations, sampling, rng)?);
        }
        for _ in 0..self.config.n_neg {
            ids.push(sample_negative(
                &anchor,
                self.annotations,
                self.mined,
                sampling,
                rng,
            )?);
        }
        Ok(ids)
    }
}

impl<S: TensorStore> Dataset for MultiPosNegProvider<'_, S> {
    type Item = Vec<S::Tensor>;

    fn len(&self) -> usize {
        self.classes.len()
    }

    fn get<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> Result<Self::Item> {
        self.sample_ids(index, rng)?
            .iter()
            .map(|id| self.store.load(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::IdToClasses;
    use crate::{mine, DistanceMap, InMemoryStore};
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    fn fixture() -> (Annotations, MiningResult, InMemoryStore) {
        let mut id_to_classes = IdToClasses::new();
        id_to_classes.insert("a1".into(), vec!["1.1.1.1".into()]);
        id_to_classes.insert("a2".into(), vec!["1.1.1.1".into()]);
        id_to_classes.insert("b1".into(), vec!["1.1.1.2".into()]);
        id_to_classes.insert("c1".into(), vec!["1.1.1.-".into()]);
        let annotations = Annotations::from_id_to_classes(id_to_classes);

        let distances = DistanceMap::new()
            .with_row("1.1.1.1", [("1.1.1.1", 0.0), ("1.1.1.2", 1.0), ("1.1.1.-", 2.0)])
            .with_row("1.1.1.2", [("1.1.1.1", 1.0), ("1.1.1.2", 0.0), ("1.1.1.-", 1.0)])
            .with_row("1.1.1.-", [("1.1.1.1", 2.0), ("1.1.1.2", 1.0), ("1.1.1.-", 0.0)]);
        let mined = mine(&distances, 10).unwrap();

        let mut store = InMemoryStore::new()
            .with("a1", vec![1.0])
            .with("a2", vec![2.0])
            .with("b1", vec![3.0])
            .with("c1", vec![4.0]);
        for variant in 0..10 {
            store.insert(format!("b1_{variant}"), vec![30.0 + variant as f32]);
            store.insert(format!("c1_{variant}"), vec![40.0 + variant as f32]);
        }

        (annotations, mined, store)
    }

    #[test]
    fn test_triplet_pool_size() {
        let (ann, mined, store) = fixture();
        let mut rng = XorShiftRng::seed_from_u64(42);
        let config = TripletConfig::default().with_pool_size(16);
        let provider = TripletProvider::new(&ann, &mined, &store, config, &mut rng).unwrap();

        assert_eq!(provider.len(), 16);
        for class in provider.pool() {
            assert!(ann.members_of(class).is_ok());
        }
    }

    #[test]
    fn test_triplet_ids_respect_labels() {
        let (ann, mined, store) = fixture();
        let mut rng = XorShiftRng::seed_from_u64(3);
        let provider =
            TripletProvider::new(&ann, &mined, &store, TripletConfig::default(), &mut rng).unwrap();

        for index in 0..provider.len() {
            let triplet = provider.sample_ids(index, &mut rng).unwrap();
            assert_ne!(triplet.anchor, triplet.positive);

            let anchor_classes = ann.classes_of(&triplet.anchor).unwrap();
            let negative_classes = ann.classes_of(&triplet.negative).unwrap();
            assert!(negative_classes.iter().all(|c| !anchor_classes.contains(c)));
        }
    }

    #[test]
    fn test_triplet_get_loads_tensors() {
        let (ann, mined, store) = fixture();
        let mut rng = XorShiftRng::seed_from_u64(9);
        let provider =
            TripletProvider::new(&ann, &mined, &store, TripletConfig::default(), &mut rng).unwrap();

        let triplet = provider.get(0, &mut rng).unwrap();
        assert_eq!(triplet.into_array().len(), 3);
    }

    #[test]
    fn test_triplet_missing_resource_propagates() {
        let (ann, mined, _) = fixture();
        let empty = InMemoryStore::new();
        let mut rng = XorShiftRng::seed_from_u64(1);
        let provider =
            TripletProvider::new(&ann, &mined, &empty, TripletConfig::default(), &mut rng).unwrap();

        assert!(matches!(
            provider.get(0, &mut rng),
            Err(Error::MissingResource { .. })
        ));
    }

    #[test]
    fn test_triplet_index_out_of_range() {
        let (ann, mined, store) = fixture();
        let mut rng = XorShiftRng::seed_from_u64(1);
        let config = TripletConfig::default().with_pool_size(4);
        let provider = TripletProvider::new(&ann, &mined, &store, config, &mut rng).unwrap();

        assert!(matches!(
            provider.get(4, &mut rng),
            Err(Error::IndexOutOfRange { index: 4, len: 4 })
        ));
    }

    #[test]
    fn test_fully_specified_pool() {
        let (ann, mined, store) = fixture();
        let mut rng = XorShiftRng::seed_from_u64(1);
        let config = TripletConfig::default().with_pool_strategy(PoolStrategy::FullySpecified);
        let provider = TripletProvider::new(&ann, &mined, &store, config, &mut rng).unwrap();

        assert_eq!(
            provider.pool(),
            &[ClassId::from("1.1.1.1"), ClassId::from("1.1.1.2")]
        );
    }

    #[test]
    fn test_uniform_classes_pool_excludes_partial() {
        let (ann, mined, store) = fixture();
        let mut rng = XorShiftRng::seed_from_u64(5);
        let config = TripletConfig::default()
            .with_pool_size(64)
            .with_pool_strategy(PoolStrategy::UniformClasses);
        let provider = TripletProvider::new(&ann, &mined, &store, config, &mut rng).unwrap();

        assert_eq!(provider.len(), 64);
        assert!(provider.pool().iter().all(ClassId::is_fully_specified));
    }

    #[test]
    fn test_regenerate_pool_keeps_size() {
        let (ann, mined, store) = fixture();
        let mut rng = XorShiftRng::seed_from_u64(5);
        let config = TripletConfig::default().with_pool_size(32);
        let mut provider = TripletProvider::new(&ann, &mined, &store, config, &mut rng).unwrap();

        provider.regenerate_pool(&mut rng).unwrap();
        assert_eq!(provider.len(), 32);
    }

    #[test]
    fn test_zero_pool_size_rejected() {
        let (ann, mined, store) = fixture();
        let mut rng = XorShiftRng::seed_from_u64(1);
        let config = TripletConfig::default().with_pool_size(0);
        assert!(matches!(
            TripletProvider::new(&ann, &mined, &store, config, &mut rng),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_multi_layout() {
        let (ann, mined, store) = fixture();
        let config = MultiPosNegConfig::default().with_n_pos(2).with_n_neg(1);
        let provider = MultiPosNegProvider::new(&ann, &mined, &store, config).unwrap();

        // Partial class 1.1.1.- is not an anchor class.
        assert_eq!(provider.len(), 2);

        let mut rng = XorShiftRng::seed_from_u64(11);
        for index in 0..provider.len() {
            let ids = provider.sample_ids(index, &mut rng).unwrap();
            assert_eq!(ids.len(), 4);

            let anchor_class = &provider.classes()[index];
            assert!(ann.classes_of(&ids[0]).unwrap().contains(anchor_class));
            for positive in &ids[1..3] {
                assert_ne!(positive, &ids[0]);
            }
            let negative_classes = ann.classes_of(&ids[3]).unwrap();
            assert!(!negative_classes.contains(anchor_class));
        }
    }

    #[test]
    fn test_multi_get_follows_id_order() {
        let (ann, mined, store) = fixture();
        let config = MultiPosNegConfig::default().with_n_pos(3).with_n_neg(2);
        let provider = MultiPosNegProvider::new(&ann, &mined, &store, config).unwrap();

        // Same seed gives the same draws for ids and tensors.
        let ids = provider
            .sample_ids(0, &mut XorShiftRng::seed_from_u64(21))
            .unwrap();
        let tensors = provider.get(0, &mut XorShiftRng::seed_from_u64(21)).unwrap();

        assert_eq!(tensors.len(), config.group_size());
        for (id, tensor) in ids.iter().zip(&tensors) {
            assert_eq!(&store.load(id).unwrap(), tensor);
        }
    }
}
