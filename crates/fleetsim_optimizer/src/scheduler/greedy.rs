use rand::rngs::SmallRng;
use tracing::debug;

use crate::{
    objective::{
        evaluator::RouteEvaluator,
        vector::{ObjectiveKind, ObjectiveVector},
    },
    problem::{DispatchProblem, OptimizerParams},
    scheduler::Scheduler,
    solution::{self, WorkingSolution},
};

/// Scalarization used by the baseline schedulers. Tonnage carries a
/// negative weight since more delivered tonnage is better.
pub(crate) fn weighted_cost(vector: &ObjectiveVector) -> f64 {
    0.25 * vector.get(ObjectiveKind::WaitingTime)
        + 0.20 * vector.get(ObjectiveKind::EmptyDistance)
        + 0.20 * vector.get(ObjectiveKind::LoadWaste)
        + 0.15 * vector.get(ObjectiveKind::CarbonEmission)
        - 0.20 * vector.get(ObjectiveKind::DeliveredTonnage)
}

/// Assigns every pending chunk to the vehicle whose route, with the
/// chunk's pickup+delivery appended, has the lowest weighted cost.
/// Chunks no vehicle can take stay unassigned for the next cycle.
pub struct GreedyScheduler {
    evaluator: RouteEvaluator,
}

impl GreedyScheduler {
    pub fn new(params: &OptimizerParams) -> Self {
        Self {
            evaluator: RouteEvaluator::new(params),
        }
    }
}

impl Scheduler for GreedyScheduler {
    fn schedule(&self, problem: &DispatchProblem, _rng: &mut SmallRng) -> WorkingSolution {
        let mut result = WorkingSolution::seeded(problem);
        let mut unassigned = 0usize;

        for &chunk in &problem.pending {
            let mut best: Option<(usize, f64)> = None;
            for (vehicle, seed) in problem.vehicles.iter().enumerate() {
                let mut trial = result.route(vehicle).clone();
                if !solution::try_append_pair(&mut trial, seed, &problem.chunks, chunk) {
                    continue;
                }
                let cost = weighted_cost(&self.evaluator.route_vector(seed, &trial, &problem.chunks));
                if best.is_none_or(|(_, best_cost)| cost < best_cost) {
                    best = Some((vehicle, cost));
                }
            }

            match best {
                Some((vehicle, _)) => {
                    let seed = &problem.vehicles[vehicle];
                    solution::try_append_pair(
                        result.route_mut(vehicle),
                        seed,
                        &problem.chunks,
                        chunk,
                    );
                }
                None => unassigned += 1,
            }
        }

        if unassigned > 0 {
            debug!(unassigned, "greedy left chunks unassigned");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::ChunkSource;
    use crate::test_utils::{registry_with_vehicles, simple_demand};
    use fleetsim_model::registry::DemandRegistry;
    use rand::SeedableRng;

    #[test]
    fn test_assigns_every_feasible_chunk() {
        let vehicles = registry_with_vehicles(&[(100.0, 50.0), (100.0, 50.0)]);
        let mut demands = DemandRegistry::new();
        for _ in 0..4 {
            demands.insert(simple_demand(40.0, 10.0));
        }

        let params = OptimizerParams::default();
        let problem = DispatchProblem::snapshot(&vehicles, &demands, &params);
        let scheduler = GreedyScheduler::new(&params);
        let mut rng = SmallRng::seed_from_u64(1);

        let result = scheduler.schedule(&problem, &mut rng);

        for &chunk in &problem.pending {
            assert!(result.contains_chunk(chunk));
        }
        for (vehicle, seed) in problem.vehicles.iter().enumerate() {
            assert!(solution::is_feasible(
                seed,
                result.route(vehicle),
                &problem.chunks
            ));
        }
    }

    #[test]
    fn test_infeasible_chunk_stays_unassigned() {
        let mut vehicles = registry_with_vehicles(&[(100.0, 50.0)]);
        // the only vehicle is nearly full already
        vehicles.vehicles_mut()[0].apply_pickup(90.0, 0.0);
        let mut demands = DemandRegistry::new();
        demands.insert(simple_demand(40.0, 10.0));

        let params = OptimizerParams::default();
        let problem = DispatchProblem::snapshot(&vehicles, &demands, &params);
        let scheduler = GreedyScheduler::new(&params);
        let mut rng = SmallRng::seed_from_u64(1);

        let result = scheduler.schedule(&problem, &mut rng);

        assert!(result.routes().iter().all(|route| route.is_empty()));
    }

    #[test]
    fn test_prefers_cheaper_vehicle() {
        use fleetsim_model::location::Location;

        let mut vehicles = registry_with_vehicles(&[(100.0, 50.0), (100.0, 50.0)]);
        // park the second vehicle on top of the pickup
        vehicles.vehicles_mut()[1].set_position(Location::from_lat_lon(48.9, 2.4));
        let mut demands = DemandRegistry::new();
        demands.insert(simple_demand(40.0, 10.0));

        let params = OptimizerParams::default();
        let problem = DispatchProblem::snapshot(&vehicles, &demands, &params);
        let scheduler = GreedyScheduler::new(&params);
        let mut rng = SmallRng::seed_from_u64(1);

        let result = scheduler.schedule(&problem, &mut rng);

        assert!(result.route(0).is_empty());
        assert_eq!(result.route(1).len(), 2);
        assert_eq!(
            problem.chunk(result.route(1)[0].chunk).source,
            ChunkSource::Whole(demands.iter().next().map(|(idx, _)| idx).unwrap())
        );
    }
}
