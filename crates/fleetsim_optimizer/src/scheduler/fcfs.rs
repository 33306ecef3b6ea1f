use rand::rngs::SmallRng;
use tracing::debug;

use crate::{
    problem::{DispatchProblem, PlanStop},
    scheduler::Scheduler,
    solution::WorkingSolution,
};

/// First-come-first-served baseline: pending chunks are taken in arrival
/// order and each goes to the first vehicle that has no stops planned
/// and can carry the chunk outright. Chunks that find no idle vehicle
/// stay unassigned for the next cycle.
#[derive(Debug, Default)]
pub struct FcfsScheduler;

impl Scheduler for FcfsScheduler {
    fn schedule(&self, problem: &DispatchProblem, _rng: &mut SmallRng) -> WorkingSolution {
        let mut result = WorkingSolution::seeded(problem);
        let mut unassigned = 0usize;

        for &chunk_idx in &problem.pending {
            let chunk = problem.chunk(chunk_idx);
            let target = (0..problem.vehicles.len()).find(|&vehicle| {
                let seed = &problem.vehicles[vehicle];
                result.route(vehicle).is_empty()
                    && seed.load + chunk.quantity <= seed.max_load
                    && seed.volume + chunk.volume <= seed.max_volume
            });

            match target {
                Some(vehicle) => {
                    let route = result.route_mut(vehicle);
                    route.push(PlanStop::pickup(chunk_idx));
                    route.push(PlanStop::delivery(chunk_idx));
                }
                None => unassigned += 1,
            }
        }

        if unassigned > 0 {
            debug!(unassigned, "fcfs found no idle vehicle for some chunks");
        }
        result
    }
}
