//! Tensor stores: resolve entity ids to embeddings.
//!
//! Sampling only produces keys. A [`TensorStore`] turns each key (including
//! synthetic `<anchor>_<d>` ids) into a tensor, failing with
//! [`Error::MissingResource`] when nothing is stored under it.

use crate::{EntityId, Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};

/// Lookup of formatted tensors by entity id.
pub trait TensorStore {
    type Tensor;

    /// Load the tensor stored under `key`.
    fn load(&self, key: &EntityId) -> Result<Self::Tensor>;
}

impl<S: TensorStore + ?Sized> TensorStore for &S {
    type Tensor = S::Tensor;

    fn load(&self, key: &EntityId) -> Result<Self::Tensor> {
        (**self).load(key)
    }
}

/// Embeddings held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tensors: HashMap<EntityId, Vec<f32>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<EntityId>, tensor: Vec<f32>) {
        self.tensors.insert(key.into(), tensor);
    }

    pub fn with(mut self, key: impl Into<EntityId>, tensor: Vec<f32>) -> Self {
        self.insert(key, tensor);
        self
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

impl TensorStore for InMemoryStore {
    type Tensor = Vec<f32>;

    fn load(&self, key: &EntityId) -> Result<Vec<f32>> {
        self.tensors
            .get(key)
            .cloned()
            .ok_or_else(|| Error::MissingResource { key: key.clone() })
    }
}

/// Default representation layer for ESM-style records.
pub const DEFAULT_LAYER: u32 = 33;

/// On-disk tensor: a bare vector or a record of per-layer mean representations.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StoredTensor {
    Plain(Vec<f32>),
    Representations {
        #[serde(default)]
        label: Option<String>,
        /// Layer index (as a string key) to mean-pooled embedding.
        mean_representations: BTreeMap<String, Vec<f32>>,
    },
}

impl StoredTensor {
    /// Reduce to a flat embedding, picking `layer` from records.
    pub fn format(self, key: &EntityId, layer: u32) -> Result<Vec<f32>> {
        match self {
            Self::Plain(values) => Ok(values),
            Self::Representations {
                mut mean_representations,
                ..
            } => mean_representations
                .remove(&layer.to_string())
                .ok_or_else(|| Error::MissingLayer {
                    key: key.clone(),
                    layer,
                }),
        }
    }
}

/// Embeddings stored as `<root>/<id>.json`, one file per entity.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    layer: u32,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            layer: DEFAULT_LAYER,
        }
    }

    /// Representation layer to select from per-layer records.
    pub fn with_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `key`.
    ///
    /// Keys name a single file directly under the root; empty keys and keys
    /// containing path separators are [`Error::InvalidKey`].
    pub fn path_for(&self, key: &EntityId) -> Result<PathBuf> {
        let name = key.as_str();
        if name.is_empty() || name.contains(['/', '\\', '\0']) {
            return Err(Error::InvalidKey { key: key.clone() });
        }
        Ok(self.root.join(format!("{name}.json")))
    }
}

impl TensorStore for DirectoryStore {
    type Tensor = Vec<f32>;

    fn load(&self, key: &EntityId) -> Result<Vec<f32>> {
        let file = match File::open(self.path_for(key)?) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::MissingResource { key: key.clone() })
            }
            Err(e) => return Err(e.into()),
        };
        let stored: StoredTensor = serde_json::from_reader(BufReader::new(file))?;
        stored.format(key, self.layer)
    }
}
