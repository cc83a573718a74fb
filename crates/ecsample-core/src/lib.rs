#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::module_name_repetitions)]

//! Hard-negative mining and tuple sampling for metric learning over
//! class-labelled entities, such as protein sequences grouped by EC number.
//!
//! - [`Annotations`] - entity ↔ class labelling, loadable from an annotation table
//! - [`DistanceMap`] - pairwise class distances
//! - [`mine`] / [`HardNegativeMiner`] - per-class weighted shortlists of near classes
//! - [`sample_positive`] / [`sample_negative`] - single-anchor samplers
//! - [`TripletProvider`] / [`MultiPosNegProvider`] - indexable datasets of tuples
//! - [`TensorStore`] - resolves sampled ids to embeddings
//!
//! # Example
//!
//! ```rust
//! use ecsample_core::{
//!     mine, Annotations, DistanceMap, InMemoryStore, TripletConfig, TripletProvider,
//! };
//! use rand::SeedableRng;
//!
//! let annotations = Annotations::from_tsv_reader(
//!     "Entry\tEC number\nP1\t1.1.1.1\nP2\t1.1.1.1\nP3\t1.1.1.2\nP4\t1.1.1.2\n".as_bytes(),
//! )
//! .unwrap();
//! let distances = DistanceMap::new()
//!     .with_row("1.1.1.1", [("1.1.1.1", 0.0), ("1.1.1.2", 0.3)])
//!     .with_row("1.1.1.2", [("1.1.1.1", 0.3), ("1.1.1.2", 0.0)]);
//! let mined = mine(&distances, 10).unwrap();
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(42);
//! let provider = TripletProvider::new(
//!     &annotations,
//!     &mined,
//!     InMemoryStore::new(),
//!     TripletConfig::default().with_pool_size(8),
//!     &mut rng,
//! )
//! .unwrap();
//!
//! let triplet = provider.sample_ids(0, &mut rng).unwrap();
//! assert_ne!(triplet.anchor, triplet.positive);
//! ```

pub mod annotations;
pub mod distance;
mod error;
mod ids;
pub mod mining;
pub mod provider;
pub mod sampling;
pub mod store;

pub use annotations::{AnnotationStats, Annotations, ClassToIds, IdToClasses};
pub use distance::{DistanceMap, DistanceRow};
pub use error::{Error, Result};
pub use ids::{ClassId, EntityId, PARTIAL_MARKER, SYNTHETIC_SEPARATOR};
pub use mining::{mine, HardNegativeMiner, MinerConfig, MiningResult, NegativeShortlist};
pub use provider::{
    Dataset, MultiPosNegConfig, MultiPosNegProvider, PoolStrategy, Triplet, TripletConfig,
    TripletProvider,
};
pub use sampling::{sample_negative, sample_positive, SamplingConfig};
pub use store::{DirectoryStore, InMemoryStore, StoredTensor, TensorStore};
