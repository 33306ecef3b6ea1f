use thiserror::Error;

use crate::{
    objective::vector::{ObjectiveKind, ObjectiveVector, OBJECTIVE_COUNT},
    pareto::archive::NonDominatedSet,
};

const RANGE_EPSILON: f64 = 1e-12;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("no range observed yet for {0:?}, cannot denormalize")]
    Uninitialized(ObjectiveKind),
    #[error("invalid range for {kind:?}: min {min} > max {max}")]
    InvalidRange {
        kind: ObjectiveKind,
        min: f64,
        max: f64,
    },
}

/// Running per-objective [min, max] over comparable values, mapping raw
/// objective values onto [0, 1] so heterogeneous objectives become
/// distance-comparable. Ranges only ever widen until `reset`.
#[derive(Debug, Clone, Default)]
pub struct DynamicNormalizer {
    ranges: [Option<(f64, f64)>; OBJECTIVE_COUNT],
}

impl DynamicNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, kind: ObjectiveKind, raw: f64) {
        let value = kind.comparable(raw);
        let range = &mut self.ranges[kind.index()];
        *range = match *range {
            None => Some((value, value)),
            Some((min, max)) => Some((min.min(value), max.max(value))),
        };
    }

    pub fn update_vector(&mut self, vector: &ObjectiveVector) {
        for kind in ObjectiveKind::ALL {
            self.update(kind, vector.get(kind));
        }
    }

    pub fn update_vectors<'a>(&mut self, vectors: impl IntoIterator<Item = &'a ObjectiveVector>) {
        for vector in vectors {
            self.update_vector(vector);
        }
    }

    pub fn update_from_archive(&mut self, archive: &NonDominatedSet) {
        self.update_vectors(archive.vectors());
    }

    /// Maps a raw value into [0, 1], clamped. Returns 0.5 when the range
    /// is unobserved or has zero width.
    pub fn normalize(&self, kind: ObjectiveKind, raw: f64) -> f64 {
        let value = kind.comparable(raw);
        match self.ranges[kind.index()] {
            Some((min, max)) if max - min > RANGE_EPSILON => {
                ((value - min) / (max - min)).clamp(0.0, 1.0)
            }
            _ => 0.5,
        }
    }

    /// Inverts `normalize` back to a raw value. Fails on an unobserved
    /// range since no inverse exists.
    pub fn denormalize(&self, kind: ObjectiveKind, normalized: f64) -> Result<f64, NormalizeError> {
        match self.ranges[kind.index()] {
            Some((min, max)) => {
                let value = min + normalized * (max - min);
                Ok(if kind.is_maximize() { -value } else { value })
            }
            None => Err(NormalizeError::Uninitialized(kind)),
        }
    }

    pub fn range(&self, kind: ObjectiveKind) -> Option<(f64, f64)> {
        self.ranges[kind.index()]
    }

    /// Overrides an objective's range with explicit comparable bounds.
    pub fn set_range(&mut self, kind: ObjectiveKind, min: f64, max: f64) -> Result<(), NormalizeError> {
        if min > max {
            return Err(NormalizeError::InvalidRange { kind, min, max });
        }
        self.ranges[kind.index()] = Some((min, max));
        Ok(())
    }

    pub fn reset(&mut self) {
        self.ranges = [None; OBJECTIVE_COUNT];
    }

    /// Euclidean distance between two vectors in normalized space, the
    /// annealing energy gap.
    pub fn energy_difference(&self, a: &ObjectiveVector, b: &ObjectiveVector) -> f64 {
        ObjectiveKind::ALL
            .iter()
            .map(|&kind| {
                let delta = self.normalize(kind, a.get(kind)) - self.normalize(kind, b.get(kind));
                delta * delta
            })
            .sum::<f64>()
            .sqrt()
    }
}
