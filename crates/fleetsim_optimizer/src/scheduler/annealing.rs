use rand::{rngs::SmallRng, Rng};
use tracing::debug;

use crate::{
    objective::evaluator::RouteEvaluator,
    pareto::acceptance,
    problem::{DispatchProblem, OptimizerParams},
    scheduler::{greedy::{weighted_cost, GreedyScheduler}, neighborhood, Scheduler},
    solution::WorkingSolution,
};

const INITIAL_TEMPERATURE: f64 = 1000.0;

/// Single-objective refinement of the greedy seed: the same pair-moving
/// neighborhood as the multi-objective scheduler, accepted on the worst
/// per-vehicle weighted cost under a standard annealing schedule.
pub struct AnnealingScheduler {
    evaluator: RouteEvaluator,
    params: OptimizerParams,
}

impl AnnealingScheduler {
    pub fn new(params: &OptimizerParams) -> Self {
        Self {
            evaluator: RouteEvaluator::new(params),
            params: params.clone(),
        }
    }

    /// The cost to minimize: the most expensive vehicle in the solution.
    fn max_vehicle_cost(&self, solution: &WorkingSolution, problem: &DispatchProblem) -> f64 {
        problem
            .vehicles
            .iter()
            .zip(solution.routes())
            .map(|(seed, route)| {
                weighted_cost(&self.evaluator.route_vector(seed, route, &problem.chunks))
            })
            .fold(0.0, f64::max)
    }
}

impl Scheduler for AnnealingScheduler {
    fn schedule(&self, problem: &DispatchProblem, rng: &mut SmallRng) -> WorkingSolution {
        let greedy = GreedyScheduler::new(&self.params);
        let mut current = greedy.schedule(problem, rng);
        let mut current_cost = self.max_vehicle_cost(&current, problem);
        let mut best = current.clone();
        let mut best_cost = current_cost;

        let mut temperature = INITIAL_TEMPERATURE;
        let reheat_every = (self.params.sa_iterations / 10).max(1);

        for iteration in 0..self.params.sa_iterations {
            if temperature <= self.params.min_temperature {
                break;
            }

            let candidate = neighborhood::neighbor(
                &current,
                problem,
                self.params.neighbor_attempts,
                rng,
            );
            let candidate_cost = self.max_vehicle_cost(&candidate, problem);
            let delta = candidate_cost - current_cost;

            if rng.random::<f64>() < acceptance::acceptance_probability(delta, temperature) {
                current = candidate;
                current_cost = candidate_cost;
                if current_cost < best_cost {
                    best = current.clone();
                    best_cost = current_cost;
                }
            }

            temperature *= self.params.cooling_rate;
            if (iteration + 1) % reheat_every == 0 {
                temperature *= self.params.reheat_factor;
            }
        }

        debug!(best_cost, "annealing finished");
        best
    }
}
