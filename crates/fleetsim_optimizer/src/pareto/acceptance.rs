use rand::{rngs::SmallRng, Rng};

use crate::{
    objective::vector::ObjectiveVector,
    pareto::{
        archive::{AddOutcome, NonDominatedSet},
        normalizer::DynamicNormalizer,
    },
};

/// Why a candidate was (or was not) let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptReason {
    DominatesOthers,
    NonDominated,
    /// Dominated by the frontier, decided by an annealed coin flip.
    Annealed,
}

#[derive(Debug, Clone, Copy)]
pub struct AcceptDecision {
    pub accepted: bool,
    pub reason: AcceptReason,
}

/// Scalar annealing rule. At non-positive temperature only improvements
/// pass; otherwise worsening moves pass with probability exp(-dE/T).
pub fn acceptance_probability(delta_energy: f64, temperature: f64) -> f64 {
    if temperature <= 0.0 {
        return if delta_energy < 0.0 { 1.0 } else { 0.0 };
    }
    if delta_energy < 0.0 {
        1.0
    } else {
        (-delta_energy / temperature).exp().min(1.0)
    }
}

/// Multi-objective acceptance against the current frontier. Dominating or
/// mutually non-dominated candidates always pass; dominated candidates
/// pass with annealed probability over the normalized distance to their
/// nearest frontier member. Passing only means the candidate may be
/// offered to the dominance-checked archive insert.
pub fn multi_objective_acceptance(
    candidate: &ObjectiveVector,
    archive: &NonDominatedSet,
    normalizer: &DynamicNormalizer,
    temperature: f64,
    rng: &mut SmallRng,
) -> AcceptDecision {
    match archive.analyze_add(candidate) {
        AddOutcome::DominatesOthers => AcceptDecision {
            accepted: true,
            reason: AcceptReason::DominatesOthers,
        },
        AddOutcome::NonDominated => AcceptDecision {
            accepted: true,
            reason: AcceptReason::NonDominated,
        },
        AddOutcome::Rejected => {
            let delta = archive
                .vectors()
                .map(|member| normalizer.energy_difference(candidate, member))
                .fold(f64::INFINITY, f64::min);
            let probability = acceptance_probability(delta, temperature);
            AcceptDecision {
                accepted: rng.random::<f64>() < probability,
                reason: AcceptReason::Annealed,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solution::WorkingSolution;
    use rand::SeedableRng;

    #[test]
    fn test_scalar_probability_boundaries() {
        assert_eq!(acceptance_probability(-5.0, 10.0), 1.0);
        assert_eq!(acceptance_probability(5.0, 0.0), 0.0);
        assert_eq!(acceptance_probability(0.0, 10.0), 1.0);
        assert_eq!(acceptance_probability(-1.0, 0.0), 1.0);

        let p = acceptance_probability(5.0, 10.0);
        assert!((p - (-0.5f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_non_dominated_candidate_always_accepted() {
        let mut archive = NonDominatedSet::new();
        archive.force_add(
            ObjectiveVector::from([1.0, 2.0, 1.0, 1.0, 1.0]),
            WorkingSolution::with_route_count(0),
        );
        let normalizer = DynamicNormalizer::new();
        let mut rng = SmallRng::seed_from_u64(3);

        let candidate = ObjectiveVector::from([2.0, 1.0, 1.0, 1.0, 1.0]);
        let decision =
            multi_objective_acceptance(&candidate, &archive, &normalizer, 0.0, &mut rng);

        assert!(decision.accepted);
        assert_eq!(decision.reason, AcceptReason::NonDominated);
    }

    #[test]
    fn test_dominated_candidate_rejected_at_zero_temperature() {
        let mut archive = NonDominatedSet::new();
        archive.force_add(
            ObjectiveVector::from([1.0, 1.0, 1.0, 5.0, 1.0]),
            WorkingSolution::with_route_count(0),
        );
        let mut normalizer = DynamicNormalizer::new();
        normalizer.update_from_archive(&archive);
        let mut rng = SmallRng::seed_from_u64(3);

        let candidate = ObjectiveVector::from([2.0, 2.0, 2.0, 1.0, 2.0]);
        normalizer.update_vector(&candidate);
        let decision =
            multi_objective_acceptance(&candidate, &archive, &normalizer, 0.0, &mut rng);

        assert!(!decision.accepted);
        assert_eq!(decision.reason, AcceptReason::Annealed);
    }

    #[test]
    fn test_dominated_candidate_can_pass_when_hot() {
        let mut archive = NonDominatedSet::new();
        archive.force_add(
            ObjectiveVector::from([1.0, 1.0, 1.0, 5.0, 1.0]),
            WorkingSolution::with_route_count(0),
        );
        let normalizer = DynamicNormalizer::new();
        let mut rng = SmallRng::seed_from_u64(3);

        // uninitialized normalizer: every dimension reads 0.5, distance 0,
        // so exp(0) = 1 and the draw always passes
        let candidate = ObjectiveVector::from([2.0, 2.0, 2.0, 1.0, 2.0]);
        let decision =
            multi_objective_acceptance(&candidate, &archive, &normalizer, 100.0, &mut rng);

        assert!(decision.accepted);
        assert_eq!(decision.reason, AcceptReason::Annealed);
    }
}
