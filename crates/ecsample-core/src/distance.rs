//! Class-to-class distance maps.
//!
//! Rows keep the order they were inserted (or read) in. Mining sorts each row
//! with a stable sort, so equal distances resolve to source order.

use crate::{ClassId, Result};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// One row: distances from a class to every other class, in source order.
pub type DistanceRow = Vec<(ClassId, f64)>;

/// Pairwise class distances, `class -> class -> distance`.
///
/// # Example
///
/// ```rust
/// use ecsample_core::DistanceMap;
///
/// let map = DistanceMap::from_json_str(r#"{"A": {"A": 0, "B": 1.5}, "B": {"A": 1.5, "B": 0}}"#)
///     .unwrap();
/// assert_eq!(map.len(), 2);
/// assert_eq!(map.distance(&"A".into(), &"B".into()), Some(1.5));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistanceMap {
    rows: Vec<(ClassId, DistanceRow)>,
    index: HashMap<ClassId, usize>,
}

impl DistanceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the row for `class`.
    pub fn insert_row(&mut self, class: ClassId, row: DistanceRow) {
        if let Some(&idx) = self.index.get(&class) {
            self.rows[idx].1 = row;
        } else {
            self.index.insert(class.clone(), self.rows.len());
            self.rows.push((class, row));
        }
    }

    /// Builder form of [`insert_row`](Self::insert_row).
    pub fn with_row<C, I, K>(mut self, class: C, row: I) -> Self
    where
        C: Into<ClassId>,
        I: IntoIterator<Item = (K, f64)>,
        K: Into<ClassId>,
    {
        let row = row.into_iter().map(|(k, d)| (k.into(), d)).collect();
        self.insert_row(class.into(), row);
        self
    }

    /// Row for `class`, if present.
    pub fn row(&self, class: &ClassId) -> Option<&[(ClassId, f64)]> {
        self.index.get(class).map(|&idx| self.rows[idx].1.as_slice())
    }

    /// Distance between two classes, if recorded.
    pub fn distance(&self, from: &ClassId, to: &ClassId) -> Option<f64> {
        self.row(from)?
            .iter()
            .find(|(other, _)| other == to)
            .map(|(_, d)| *d)
    }

    /// Rows in source order.
    pub fn rows(&self) -> &[(ClassId, DistanceRow)] {
        &self.rows
    }

    /// Classes in source order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassId> {
        self.rows.iter().map(|(c, _)| c)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Load from a JSON file of nested objects.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_json_reader(BufReader::new(file))
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

impl FromIterator<(ClassId, DistanceRow)> for DistanceMap {
    fn from_iter<T: IntoIterator<Item = (ClassId, DistanceRow)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (class, row) in iter {
            map.insert_row(class, row);
        }
        map
    }
}

impl Serialize for DistanceMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut outer = serializer.serialize_map(Some(self.rows.len()))?;
        for (class, row) in &self.rows {
            outer.serialize_entry(class, &RowRef(row))?;
        }
        outer.end()
    }
}

struct RowRef<'a>(&'a [(ClassId, f64)]);

impl Serialize for RowRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut inner = serializer.serialize_map(Some(self.0.len()))?;
        for (other, d) in self.0 {
            inner.serialize_entry(other, d)?;
        }
        inner.end()
    }
}

impl<'de> Deserialize<'de> for DistanceMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(DistanceMapVisitor)
    }
}

struct DistanceMapVisitor;

impl<'de> Visitor<'de> for DistanceMapVisitor {
    type Value = DistanceMap;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of class to distance rows")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut map = DistanceMap::new();
        while let Some((class, row)) = access.next_entry::<ClassId, OrderedRow>()? {
            map.insert_row(class, row.0);
        }
        Ok(map)
    }
}

/// A row deserialized in source key order.
struct OrderedRow(DistanceRow);

impl<'de> Deserialize<'de> for OrderedRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedRowVisitor)
    }
}

struct OrderedRowVisitor;

impl<'de> Visitor<'de> for OrderedRowVisitor {
    type Value = OrderedRow;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of class to distance")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut row = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(entry) = access.next_entry::<ClassId, f64>()? {
            row.push(entry);
        }
        Ok(OrderedRow(row))
    }
}
