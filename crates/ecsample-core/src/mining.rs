//! Hard-negative mining over class distances.
//!
//! For every class, the nearest classes at non-zero distance form a weighted
//! shortlist: closer classes get proportionally more weight (`1 / distance`,
//! normalized). Negative sampling draws from this shortlist so that
//! training sees "close but wrong" classes more often than random ones.
//!
//! # Example
//!
//! ```rust
//! use ecsample_core::{mine, ClassId, DistanceMap};
//!
//! let map = DistanceMap::new()
//!     .with_row("A", [("A", 0.0), ("B", 1.0), ("C", 2.0)])
//!     .with_row("B", [("A", 1.0), ("B", 0.0), ("C", 1.0)])
//!     .with_row("C", [("A", 2.0), ("B", 1.0), ("C", 0.0)]);
//!
//! let mined = mine(&map, 2).unwrap();
//! let a = mined.get(&"A".into()).unwrap();
//! assert_eq!(a.candidates, vec![ClassId::from("B"), ClassId::from("C")]);
//! assert!((a.weights[0] - 2.0 / 3.0).abs() < 1e-12);
//! ```

use crate::{ClassId, DistanceMap, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::Path;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Mining configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    /// Shortlist size per class (default: 10).
    pub knn: usize,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self { knn: 10 }
    }
}

impl MinerConfig {
    pub fn with_knn(mut self, knn: usize) -> Self {
        self.knn = knn;
        self
    }
}

/// Nearest distinct classes of one class, with aligned sampling weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegativeShortlist {
    /// Candidate classes, nearest first.
    pub candidates: Vec<ClassId>,
    /// Normalized weights, aligned with `candidates`.
    pub weights: Vec<f64>,
}

impl NegativeShortlist {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// `(candidate, weight)` pairs, nearest first.
    pub fn iter(&self) -> impl Iterator<Item = (&ClassId, f64)> {
        self.candidates.iter().zip(self.weights.iter().copied())
    }
}

/// Shortlists for every mined class.
///
/// Read-only once built; sampling never mutates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MiningResult {
    shortlists: BTreeMap<ClassId, NegativeShortlist>,
}

impl MiningResult {
    /// Shortlist for `class`.
    pub fn get(&self, class: &ClassId) -> Option<&NegativeShortlist> {
        self.shortlists.get(class)
    }

    /// Shortlist for `class`, or [`Error::MissingMiningEntry`].
    pub fn require(&self, class: &ClassId) -> Result<&NegativeShortlist> {
        self.shortlists
            .get(class)
            .ok_or_else(|| Error::MissingMiningEntry {
                class: class.clone(),
            })
    }

    pub fn len(&self) -> usize {
        self.shortlists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shortlists.is_empty()
    }

    /// Shortlists in class order.
    pub fn iter(&self) -> impl Iterator<Item = (&ClassId, &NegativeShortlist)> {
        self.shortlists.iter()
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_json_reader(BufReader::new(file))
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Load from binary file (bincode).
    #[cfg(feature = "binary")]
    pub fn from_binary_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(bincode::deserialize_from(BufReader::new(file))?)
    }

    /// Save to binary file (bincode).
    #[cfg(feature = "binary")]
    pub fn to_binary_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, self)?;
        Ok(())
    }
}

impl FromIterator<(ClassId, NegativeShortlist)> for MiningResult {
    fn from_iter<T: IntoIterator<Item = (ClassId, NegativeShortlist)>>(iter: T) -> Self {
        Self {
            shortlists: iter.into_iter().collect(),
        }
    }
}

/// Hard-negative miner with a fixed configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardNegativeMiner {
    config: MinerConfig,
}

impl HardNegativeMiner {
    pub fn new(config: MinerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    /// Mine shortlists for every class in `distances`.
    pub fn mine(&self, distances: &DistanceMap) -> Result<MiningResult> {
        mine(distances, self.config.knn)
    }
}

/// Mine a shortlist of up to `knn` nearest distinct classes for every class.
///
/// # Errors
///
/// - [`Error::InvalidConfig`] if `knn` is zero.
/// - [`Error::InvalidDistance`] for negative or non-finite distances.
/// - [`Error::DegenerateDistance`] if a row has no non-zero distance.
pub fn mine(distances: &DistanceMap, knn: usize) -> Result<MiningResult> {
    if knn == 0 {
        return Err(Error::InvalidConfig("knn must be at least 1".into()));
    }

    tracing::info!(classes = distances.len(), knn, "Mining hard negatives");

    #[cfg(feature = "parallel")]
    let shortlists = distances
        .rows()
        .par_iter()
        .map(|(class, row)| mine_row(class, row, knn).map(|s| (class.clone(), s)))
        .collect::<Result<BTreeMap<_, _>>>()?;

    #[cfg(not(feature = "parallel"))]
    let shortlists = distances
        .rows()
        .iter()
        .map(|(class, row)| mine_row(class, row, knn).map(|s| (class.clone(), s)))
        .collect::<Result<BTreeMap<_, _>>>()?;

    Ok(MiningResult { shortlists })
}

/// Mine the shortlist of a single row.
pub fn mine_row(class: &ClassId, row: &[(ClassId, f64)], knn: usize) -> Result<NegativeShortlist> {
    if let Some((other, distance)) = row.iter().find(|(_, d)| !d.is_finite() || *d < 0.0) {
        return Err(Error::InvalidDistance {
            from: class.clone(),
            to: other.clone(),
            distance: *distance,
        });
    }

    // Stable: equal distances stay in source order.
    let mut sorted: Vec<&(ClassId, f64)> = row.iter().collect();
    sorted.sort_by(|a, b| a.1.total_cmp(&b.1));

    // Zero-distance classes are duplicates of `class`, not negatives.
    let start = sorted
        .iter()
        .position(|(_, d)| *d != 0.0)
        .ok_or_else(|| Error::DegenerateDistance {
            class: class.clone(),
        })?;
    let closest = &sorted[start..sorted.len().min(start + knn)];

    let inverse: Vec<f64> = closest.iter().map(|(_, d)| d.recip()).collect();
    let total: f64 = inverse.iter().sum();
    if !total.is_finite() {
        return Err(Error::InvalidDistance {
            from: class.clone(),
            to: closest[0].0.clone(),
            distance: closest[0].1,
        });
    }

    let shortlist = NegativeShortlist {
        candidates: closest.iter().map(|(c, _)| c.clone()).collect(),
        weights: inverse.iter().map(|w| w / total).collect(),
    };
    tracing::debug!(
        %class,
        candidates = shortlist.len(),
        nearest = %closest[0].0,
        "Mined shortlist"
    );
    Ok(shortlist)
}
