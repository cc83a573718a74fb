//! Positive and negative sampling for a single anchor.
//!
//! Both samplers take the random source as an argument, so the caller decides
//! seeding and whether the generator is shared or thread-local. Rejection
//! loops are bounded by [`SamplingConfig::max_attempts`] and fail with
//! [`Error::ExhaustedCandidates`] instead of spinning.

use crate::{Annotations, ClassId, EntityId, Error, MiningResult, NegativeShortlist, Result};
use rand::distr::weighted::WeightedIndex;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Knobs shared by the positive and negative samplers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Draws allowed per rejection loop (default: 100).
    pub max_attempts: usize,
    /// Number of augmentation variants per entity for singleton classes;
    /// synthetic ids end in `_0` .. `_{n-1}` (default: 10).
    pub synthetic_variants: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            synthetic_variants: 10,
        }
    }
}

impl SamplingConfig {
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_synthetic_variants(mut self, n: u32) -> Self {
        self.synthetic_variants = n;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::InvalidConfig("max_attempts must be at least 1".into()));
        }
        if self.synthetic_variants == 0 {
            return Err(Error::InvalidConfig(
                "synthetic_variants must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Uniform pick from a non-empty slice.
pub(crate) fn pick<'a, T, R: Rng + ?Sized>(items: &'a [T], rng: &mut R) -> &'a T {
    &items[rng.random_range(0..items.len())]
}

/// Sample a positive for `anchor`: another member of one of its classes.
///
/// One of the anchor's classes is picked uniformly. If the anchor is the only
/// member, the result is a synthetic id `<anchor>_<d>` naming an augmented
/// copy of the anchor. Otherwise members are drawn until one differs from the
/// anchor.
///
/// # Errors
///
/// - [`Error::UnknownEntity`] / [`Error::UnknownClass`] for missing labels.
/// - [`Error::ExhaustedCandidates`] if every draw returned the anchor.
pub fn sample_positive<R: Rng + ?Sized>(
    anchor: &EntityId,
    annotations: &Annotations,
    config: &SamplingConfig,
    rng: &mut R,
) -> Result<EntityId> {
    config.validate()?;

    let class = pick(annotations.classes_of(anchor)?, rng);
    let members = annotations.members_of(class)?;

    if members.len() == 1 {
        let variant = rng.random_range(0..config.synthetic_variants);
        tracing::debug!(%anchor, %class, variant, "Singleton class, using synthetic positive");
        return Ok(EntityId::synthetic(anchor, variant));
    }

    for _ in 0..config.max_attempts {
        let candidate = pick(members, rng);
        if candidate != anchor {
            return Ok(candidate.clone());
        }
    }

    Err(Error::ExhaustedCandidates {
        anchor: anchor.clone(),
        attempts: config.max_attempts,
    })
}

/// Sample a hard negative for `anchor`.
///
/// One of the anchor's classes is picked uniformly and its mined shortlist
/// drives a weighted draw of a negative class. A draw is rejected when the
/// class is one of the anchor's own, or when every member of it also carries
/// one of the anchor's classes (multi-label entities). Otherwise a member
/// sharing no class with the anchor is picked uniformly. The result is not
/// deduplicated against positives.
///
/// # Errors
///
/// - [`Error::MissingMiningEntry`] if the picked class was never mined.
/// - [`Error::ExhaustedCandidates`] if no admissible negative was drawn.
/// - [`Error::UnknownEntity`] / [`Error::UnknownClass`] for missing labels.
pub fn sample_negative<R: Rng + ?Sized>(
    anchor: &EntityId,
    annotations: &Annotations,
    mined: &MiningResult,
    config: &SamplingConfig,
    rng: &mut R,
) -> Result<EntityId> {
    config.validate()?;

    let anchor_classes = annotations.classes_of(anchor)?;
    let class = pick(anchor_classes, rng);
    let shortlist = mined.require(class)?;
    check_shortlist(class, shortlist)?;

    // Nothing admissible: every draw would be rejected.
    if shortlist.candidates.iter().all(|c| anchor_classes.contains(c)) {
        return Err(Error::ExhaustedCandidates {
            anchor: anchor.clone(),
            attempts: 0,
        });
    }

    let weights = WeightedIndex::new(&shortlist.weights).map_err(|e| Error::MalformedShortlist {
        class: class.clone(),
        reason: e.to_string(),
    })?;

    for attempt in 0..config.max_attempts {
        let candidate = &shortlist.candidates[weights.sample(rng)];
        if anchor_classes.contains(candidate) {
            tracing::debug!(%anchor, %candidate, attempt, "Rejected negative class shared with anchor");
            continue;
        }

        let members = disjoint_members(candidate, anchor_classes, annotations)?;
        if members.is_empty() {
            tracing::debug!(%anchor, %candidate, attempt, "Every member of negative class overlaps anchor");
            continue;
        }
        let negative = *pick(&members, rng);
        return Ok(negative.clone());
    }

    Err(Error::ExhaustedCandidates {
        anchor: anchor.clone(),
        attempts: config.max_attempts,
    })
}

fn check_shortlist(class: &ClassId, shortlist: &NegativeShortlist) -> Result<()> {
    if shortlist.candidates.len() != shortlist.weights.len() {
        return Err(Error::MalformedShortlist {
            class: class.clone(),
            reason: format!(
                "{} candidates but {} weights",
                shortlist.candidates.len(),
                shortlist.weights.len()
            ),
        });
    }
    Ok(())
}

/// Members of `class` whose labels are disjoint from `anchor_classes`.
fn disjoint_members<'a>(
    class: &ClassId,
    anchor_classes: &[ClassId],
    annotations: &'a Annotations,
) -> Result<Vec<&'a EntityId>> {
    let mut members = Vec::new();
    for member in annotations.members_of(class)? {
        let classes = annotations.classes_of(member)?;
        if classes.iter().all(|c| !anchor_classes.contains(c)) {
            members.push(member);
        }
    }
    Ok(members)
}
