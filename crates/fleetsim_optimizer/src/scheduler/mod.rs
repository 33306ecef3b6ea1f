pub mod annealing;
pub mod fcfs;
pub mod greedy;
pub mod mosa;
pub mod neighborhood;

use rand::rngs::SmallRng;

use crate::{problem::DispatchProblem, solution::WorkingSolution};

/// One scheduling strategy: builds a full solution for a problem
/// snapshot, placing pending chunks on top of the committed routes.
pub trait Scheduler {
    fn schedule(&self, problem: &DispatchProblem, rng: &mut SmallRng) -> WorkingSolution;
}
