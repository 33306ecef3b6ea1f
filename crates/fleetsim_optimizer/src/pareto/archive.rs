use rand::{rngs::SmallRng, seq::IndexedRandom};

use crate::{
    objective::vector::{ObjectiveKind, ObjectiveVector},
    pareto::dominance::{self, Dominance},
    solution::WorkingSolution,
};

/// How an insertion attempt relates to the current frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Dominated by a member, not inserted.
    Rejected,
    /// Mutually non-dominated with every member.
    NonDominated,
    /// Insertion evicted at least one dominated member.
    DominatesOthers,
}

#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub vector: ObjectiveVector,
    pub solution: WorkingSolution,
}

/// The Pareto frontier of solutions found so far this cycle. No member
/// ever dominates another; exact duplicates are kept, matching the
/// comparator's treatment of ties as non-dominated.
#[derive(Debug, Clone, Default)]
pub struct NonDominatedSet {
    entries: Vec<ArchiveEntry>,
}

impl NonDominatedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies `vector` against the frontier without mutating it.
    pub fn analyze_add(&self, vector: &ObjectiveVector) -> AddOutcome {
        let mut evicts = false;
        for entry in &self.entries {
            match dominance::compare(vector, &entry.vector) {
                Dominance::Dominated => return AddOutcome::Rejected,
                Dominance::Dominates => evicts = true,
                Dominance::NonDominated => {}
            }
        }
        if evicts {
            AddOutcome::DominatesOthers
        } else {
            AddOutcome::NonDominated
        }
    }

    /// Dominance-checked insertion: rejected if dominated, otherwise
    /// evicts every member the new vector dominates.
    pub fn add(&mut self, vector: ObjectiveVector, solution: WorkingSolution) -> AddOutcome {
        let outcome = self.analyze_add(&vector);
        if outcome == AddOutcome::Rejected {
            return outcome;
        }
        self.entries
            .retain(|entry| dominance::compare(&vector, &entry.vector) != Dominance::Dominates);
        self.entries.push(ArchiveEntry { vector, solution });
        outcome
    }

    /// Unchecked insertion, used once to seed the frontier.
    pub fn force_add(&mut self, vector: ObjectiveVector, solution: WorkingSolution) {
        self.entries.push(ArchiveEntry { vector, solution });
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn vectors(&self) -> impl Iterator<Item = &ObjectiveVector> {
        self.entries.iter().map(|entry| &entry.vector)
    }

    pub fn choose(&self, rng: &mut SmallRng) -> Option<&ArchiveEntry> {
        self.entries.choose(rng)
    }

    pub fn first(&self) -> Option<&ArchiveEntry> {
        self.entries.first()
    }

    /// Smallest comparable value across members, NaN when empty.
    pub fn best_value(&self, kind: ObjectiveKind) -> f64 {
        self.vectors()
            .map(|v| v.comparable(kind))
            .fold(f64::NAN, f64::min)
    }

    /// Largest comparable value across members, NaN when empty.
    pub fn worst_value(&self, kind: ObjectiveKind) -> f64 {
        self.vectors()
            .map(|v| v.comparable(kind))
            .fold(f64::NAN, f64::max)
    }

    /// Comparable [min, max] per objective, for normalizer seeding.
    pub fn value_range(&self, kind: ObjectiveKind) -> Option<(f64, f64)> {
        if self.entries.is_empty() {
            return None;
        }
        Some((self.best_value(kind), self.worst_value(kind)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(values: [f64; 5]) -> ObjectiveVector {
        ObjectiveVector::from(values)
    }

    fn empty_solution() -> WorkingSolution {
        WorkingSolution::with_route_count(0)
    }

    #[test]
    fn test_dominated_insert_is_rejected() {
        let mut archive = NonDominatedSet::new();
        archive.force_add(vector([1.0, 1.0, 1.0, 5.0, 1.0]), empty_solution());

        let outcome = archive.add(vector([2.0, 2.0, 2.0, 1.0, 2.0]), empty_solution());

        assert_eq!(outcome, AddOutcome::Rejected);
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn test_dominating_insert_evicts_members() {
        let mut archive = NonDominatedSet::new();
        archive.force_add(vector([2.0, 2.0, 2.0, 1.0, 2.0]), empty_solution());
        archive.force_add(vector([3.0, 3.0, 3.0, 0.5, 3.0]), empty_solution());

        let outcome = archive.add(vector([1.0, 1.0, 1.0, 5.0, 1.0]), empty_solution());

        assert_eq!(outcome, AddOutcome::DominatesOthers);
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn test_frontier_never_holds_dominated_pairs() {
        let mut archive = NonDominatedSet::new();
        let candidates = [
            [5.0, 1.0, 3.0, 2.0, 1.0],
            [1.0, 5.0, 3.0, 2.0, 1.0],
            [3.0, 3.0, 1.0, 4.0, 2.0],
            [0.5, 0.5, 0.5, 9.0, 0.5],
            [4.0, 4.0, 4.0, 1.0, 4.0],
        ];
        for values in candidates {
            archive.add(vector(values), empty_solution());
        }

        for a in archive.vectors() {
            for b in archive.vectors() {
                assert_ne!(dominance::compare(a, b), Dominance::Dominates);
            }
        }
    }

    #[test]
    fn test_empty_archive_reports_nan_ranges() {
        let archive = NonDominatedSet::new();
        for kind in ObjectiveKind::ALL {
            assert!(archive.best_value(kind).is_nan());
            assert!(archive.worst_value(kind).is_nan());
            assert!(archive.value_range(kind).is_none());
        }
    }
}
