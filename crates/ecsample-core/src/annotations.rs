//! Entity ↔ class annotations.
//!
//! [`Annotations`] holds both directions of the labelling: each entity's
//! ordered class list ([`IdToClasses`]) and each class's members
//! ([`ClassToIds`]). The two maps are expected to agree; [`Annotations::new`]
//! takes them as given, [`Annotations::from_id_to_classes`] derives the
//! inverse index.
//!
//! # Table format
//!
//! [`Annotations::from_tsv_reader`] reads the tab-separated table used for
//! enzyme datasets. The first row is a header, the first column is the entry
//! id and the second holds one or more classes separated by `;`:
//!
//! ```text
//! Entry	EC number	Sequence
//! P12345	1.1.1.1;1.1.1.2	MKV...
//! ```

use crate::{ClassId, EntityId, Error, Result};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Entity → ordered class list. Always a sequence, even for one class.
pub type IdToClasses = HashMap<EntityId, Vec<ClassId>>;

/// Class → member entities.
pub type ClassToIds = HashMap<ClassId, Vec<EntityId>>;

/// Separator between classes in the annotation table.
pub const CLASS_SEPARATOR: char = ';';

/// Both directions of the entity/class labelling.
#[derive(Debug, Clone, Default)]
pub struct Annotations {
    id_to_classes: IdToClasses,
    class_to_ids: ClassToIds,
    /// Sorted entity ids, so seeded sampling is reproducible.
    entities: Vec<EntityId>,
}

/// Summary counts for an annotation set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationStats {
    pub entity_count: usize,
    pub class_count: usize,
    pub fully_specified_count: usize,
    pub singleton_class_count: usize,
    pub multi_class_entity_count: usize,
}

impl Annotations {
    /// Wrap caller-maintained maps. No consistency check is made.
    pub fn new(id_to_classes: IdToClasses, class_to_ids: ClassToIds) -> Self {
        let mut entities: Vec<EntityId> = id_to_classes.keys().cloned().collect();
        entities.sort();
        Self {
            id_to_classes,
            class_to_ids,
            entities,
        }
    }

    /// Build from entity labels, deriving the class → members index.
    ///
    /// Members are listed in entity id order.
    pub fn from_id_to_classes(id_to_classes: IdToClasses) -> Self {
        let mut entities: Vec<EntityId> = id_to_classes.keys().cloned().collect();
        entities.sort();

        let mut class_to_ids: ClassToIds = HashMap::new();
        for entity in &entities {
            let mut seen = HashSet::new();
            for class in &id_to_classes[entity] {
                if seen.insert(class) {
                    class_to_ids
                        .entry(class.clone())
                        .or_default()
                        .push(entity.clone());
                }
            }
        }

        Self {
            id_to_classes,
            class_to_ids,
            entities,
        }
    }

    /// Load from a tab-separated annotation table.
    pub fn from_tsv_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_tsv_reader(BufReader::new(file))
    }

    /// Parse a tab-separated annotation table (header row required).
    ///
    /// Rows without a class column are skipped. Repeated entries merge their
    /// class lists.
    pub fn from_tsv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut id_to_classes: IdToClasses = HashMap::new();
        let mut skipped = 0usize;

        for record in reader.records() {
            let record = record?;
            let (Some(entry), Some(labels)) = (record.get(0), record.get(1)) else {
                skipped += 1;
                continue;
            };
            let entry = entry.trim();
            if entry.is_empty() {
                skipped += 1;
                continue;
            }

            let classes = id_to_classes.entry(EntityId::from(entry)).or_default();
            for label in labels.split(CLASS_SEPARATOR) {
                let label = label.trim();
                if label.is_empty() {
                    continue;
                }
                let class = ClassId::from(label);
                if !classes.contains(&class) {
                    classes.push(class);
                }
            }
        }

        // Entries whose class column was blank carry no labels.
        id_to_classes.retain(|_, classes| !classes.is_empty());

        if skipped > 0 {
            tracing::warn!("Skipped {} annotation rows without an entry or class column", skipped);
        }

        let annotations = Self::from_id_to_classes(id_to_classes);
        tracing::info!(
            entities = annotations.entity_count(),
            classes = annotations.class_count(),
            "Loaded annotations"
        );
        Ok(annotations)
    }

    /// Class list of an entity; never empty.
    pub fn classes_of(&self, entity: &EntityId) -> Result<&[ClassId]> {
        match self.id_to_classes.get(entity) {
            Some(classes) if !classes.is_empty() => Ok(classes),
            _ => Err(Error::UnknownEntity(entity.clone())),
        }
    }

    /// Members of a class; never empty.
    pub fn members_of(&self, class: &ClassId) -> Result<&[EntityId]> {
        match self.class_to_ids.get(class) {
            Some(members) if !members.is_empty() => Ok(members),
            _ => Err(Error::UnknownClass(class.clone())),
        }
    }

    pub fn id_to_classes(&self) -> &IdToClasses {
        &self.id_to_classes
    }

    pub fn class_to_ids(&self) -> &ClassToIds {
        &self.class_to_ids
    }

    /// All entities in id order.
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn class_count(&self) -> usize {
        self.class_to_ids.len()
    }

    /// Classes without a partial marker, sorted.
    pub fn fully_specified_classes(&self) -> Vec<ClassId> {
        let mut classes: Vec<ClassId> = self
            .class_to_ids
            .keys()
            .filter(|c| c.is_fully_specified())
            .cloned()
            .collect();
        classes.sort();
        classes
    }

    /// Summary counts.
    pub fn stats(&self) -> AnnotationStats {
        AnnotationStats {
            entity_count: self.entity_count(),
            class_count: self.class_count(),
            fully_specified_count: self
                .class_to_ids
                .keys()
                .filter(|c| c.is_fully_specified())
                .count(),
            singleton_class_count: self
                .class_to_ids
                .values()
                .filter(|members| members.len() == 1)
                .count(),
            multi_class_entity_count: self
                .id_to_classes
                .values()
                .filter(|classes| classes.len() > 1)
                .count(),
        }
    }
}
