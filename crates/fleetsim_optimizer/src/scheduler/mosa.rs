use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use rand::{rngs::SmallRng, seq::SliceRandom};
use tracing::debug;

use crate::{
    objective::{
        evaluator::RouteEvaluator,
        vector::{ObjectiveKind, ObjectiveVector, OBJECTIVE_COUNT},
    },
    pareto::{
        acceptance,
        archive::{AddOutcome, NonDominatedSet},
        normalizer::DynamicNormalizer,
    },
    problem::{DispatchProblem, OptimizerParams},
    scheduler::{greedy::GreedyScheduler, neighborhood, Scheduler},
    solution::{self, WorkingSolution},
};

const TEMPERATURE_FALLBACK: f64 = 1000.0;
const REHEAT_STEPS: u64 = 10;

/// Multi-objective simulated annealing over the Pareto frontier of full
/// fleet solutions. Anytime: cancellation between iterations returns the
/// best frontier found so far.
pub struct MosaScheduler {
    evaluator: RouteEvaluator,
    params: OptimizerParams,
    cancel: Arc<AtomicBool>,
    preferences: Option<[bool; OBJECTIVE_COUNT]>,
}

impl MosaScheduler {
    pub fn new(params: &OptimizerParams) -> Self {
        Self {
            evaluator: RouteEvaluator::new(params),
            params: params.clone(),
            cancel: Arc::new(AtomicBool::new(false)),
            preferences: None,
        }
    }

    /// Shares a flag that stops the main loop at the next iteration.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Enables ideal-point selection restricted to the masked objectives.
    pub fn with_preferences(mut self, mask: [bool; OBJECTIVE_COUNT]) -> Self {
        self.preferences = Some(mask);
        self
    }

    /// A feasible solution built by shuffling pending chunks into random
    /// vehicles, with a capacity-priority append for leftovers. Only used
    /// to widen the normalizer's ranges.
    fn random_solution(&self, problem: &DispatchProblem, rng: &mut SmallRng) -> WorkingSolution {
        let mut result = WorkingSolution::seeded(problem);
        let mut order = problem.pending.clone();
        order.shuffle(rng);

        let mut by_capacity: Vec<usize> = (0..problem.vehicles.len()).collect();
        by_capacity.sort_by(|&a, &b| {
            problem.vehicles[b]
                .max_load
                .total_cmp(&problem.vehicles[a].max_load)
        });

        for chunk in order {
            let mut vehicles: Vec<usize> = (0..problem.vehicles.len()).collect();
            vehicles.shuffle(rng);
            let placed = vehicles.into_iter().any(|vehicle| {
                solution::try_insert_pair(
                    result.route_mut(vehicle),
                    &problem.vehicles[vehicle],
                    &problem.chunks,
                    chunk,
                    rng,
                )
            });
            if !placed {
                // largest vehicles first for whatever could not be placed
                for &vehicle in &by_capacity {
                    if solution::try_append_pair(
                        result.route_mut(vehicle),
                        &problem.vehicles[vehicle],
                        &problem.chunks,
                        chunk,
                    ) {
                        break;
                    }
                }
            }
        }
        result
    }

    /// 10x the widest per-objective normalized range of the frontier, or
    /// the fallback when the frontier is empty or degenerate.
    fn initial_temperature(
        archive: &NonDominatedSet,
        normalizer: &DynamicNormalizer,
    ) -> f64 {
        let mut widest = 0.0f64;
        for kind in ObjectiveKind::ALL {
            if let Some((lo, hi)) = archive.value_range(kind) {
                // value_range yields comparable values; comparable() is
                // its own inverse, giving back the raw value
                let lo = normalizer.normalize(kind, kind.comparable(lo));
                let hi = normalizer.normalize(kind, kind.comparable(hi));
                widest = widest.max((hi - lo).abs());
            }
        }
        if widest <= 1e-9 {
            TEMPERATURE_FALLBACK
        } else {
            10.0 * widest
        }
    }

    /// Frontier member closest to the ideal (all-zero) point over the
    /// preferred objectives, or simply the first member.
    fn select(
        &self,
        archive: &NonDominatedSet,
        normalizer: &DynamicNormalizer,
    ) -> Option<WorkingSolution> {
        let mask = match self.preferences {
            Some(mask) if mask.iter().any(|&selected| selected) => mask,
            _ => return archive.first().map(|entry| entry.solution.clone()),
        };

        archive
            .entries()
            .iter()
            .min_by(|a, b| {
                let da = ideal_point_distance(&a.vector, normalizer, &mask);
                let db = ideal_point_distance(&b.vector, normalizer, &mask);
                da.total_cmp(&db)
            })
            .map(|entry| entry.solution.clone())
    }
}

fn ideal_point_distance(
    vector: &ObjectiveVector,
    normalizer: &DynamicNormalizer,
    mask: &[bool; OBJECTIVE_COUNT],
) -> f64 {
    ObjectiveKind::ALL
        .iter()
        .filter(|&&kind| mask[kind.index()])
        .map(|&kind| {
            let n = normalizer.normalize(kind, vector.get(kind));
            n * n
        })
        .sum::<f64>()
        .sqrt()
}

impl Scheduler for MosaScheduler {
    fn schedule(&self, problem: &DispatchProblem, rng: &mut SmallRng) -> WorkingSolution {
        let greedy = GreedyScheduler::new(&self.params);
        let seed_solution = greedy.schedule(problem, rng);
        let seed_vector = self
            .evaluator
            .solution_vector(seed_solution.routes(), problem);

        // samples widen the normalizer, they never enter the frontier
        let mut normalizer = DynamicNormalizer::new();
        for i in 0..self.params.sample_size {
            let sample = if i % 2 == 0 {
                greedy.schedule(problem, rng)
            } else {
                self.random_solution(problem, rng)
            };
            normalizer.update_vector(&self.evaluator.solution_vector(sample.routes(), problem));
        }

        let mut archive = NonDominatedSet::new();
        archive.force_add(seed_vector, seed_solution.clone());
        normalizer.update_from_archive(&archive);

        let mut temperature = Self::initial_temperature(&archive, &normalizer);
        let reheat_every = (self.params.mosa_iterations / REHEAT_STEPS).max(1);

        let mut iterations = 0;
        for iteration in 0..self.params.mosa_iterations {
            if temperature <= self.params.min_temperature {
                break;
            }
            if self.cancel.load(Ordering::Relaxed) {
                debug!(iteration, "dispatch cycle cancelled");
                break;
            }
            iterations = iteration + 1;

            let current = archive
                .choose(rng)
                .map(|entry| entry.solution.clone())
                .unwrap_or_else(|| seed_solution.clone());
            let candidate =
                neighborhood::neighbor(&current, problem, self.params.neighbor_attempts, rng);
            let vector = self.evaluator.solution_vector(candidate.routes(), problem);

            let decision = acceptance::multi_objective_acceptance(
                &vector,
                &archive,
                &normalizer,
                temperature,
                rng,
            );
            if decision.accepted && archive.add(vector, candidate) != AddOutcome::Rejected {
                normalizer.update_from_archive(&archive);
            }

            temperature *= self.params.cooling_rate;
            if (iteration + 1) % reheat_every == 0 {
                temperature *= self.params.reheat_factor;
            }
        }

        debug!(
            iterations,
            frontier = archive.len(),
            "mosa cycle finished"
        );
        self.select(&archive, &normalizer)
            .unwrap_or(seed_solution)
    }
}
