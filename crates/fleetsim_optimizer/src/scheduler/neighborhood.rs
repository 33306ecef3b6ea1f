use rand::{rngs::SmallRng, seq::IndexedRandom, Rng};

use crate::{
    problem::DispatchProblem,
    solution::{self, WorkingSolution},
};

/// Produces a neighboring solution by moving pickup+delivery pairs, never
/// a lone stop. Each operator gets `attempts` tries; if none lands, the
/// input comes back unchanged, which the caller treats as a no-op move.
pub fn neighbor(
    current: &WorkingSolution,
    problem: &DispatchProblem,
    attempts: u64,
    rng: &mut SmallRng,
) -> WorkingSolution {
    let mut next = current.clone();
    match rng.random_range(0..3) {
        0 => relocate(&mut next, problem, attempts, rng),
        1 => swap(&mut next, problem, attempts, rng),
        _ => reorder(&mut next, problem, attempts, rng),
    };
    next
}

fn routes_with_pairs(solution: &WorkingSolution, problem: &DispatchProblem) -> Vec<usize> {
    (0..problem.vehicles.len())
        .filter(|&vehicle| !solution.movable_pairs(problem, vehicle).is_empty())
        .collect()
}

/// Moves one pair from its route into a different route at a random
/// feasible position pair.
fn relocate(
    next: &mut WorkingSolution,
    problem: &DispatchProblem,
    attempts: u64,
    rng: &mut SmallRng,
) -> bool {
    if problem.vehicles.len() < 2 {
        return false;
    }
    for _ in 0..attempts {
        let sources = routes_with_pairs(next, problem);
        let Some(&from) = sources.choose(rng) else {
            return false;
        };
        let mut to = rng.random_range(0..problem.vehicles.len() - 1);
        if to >= from {
            to += 1;
        }
        let pairs = next.movable_pairs(problem, from);
        let Some(&chunk) = pairs.choose(rng) else {
            continue;
        };

        let saved = next.route(from).clone();
        solution::extract_pair(next.route_mut(from), chunk);
        if solution::try_insert_pair(
            next.route_mut(to),
            &problem.vehicles[to],
            &problem.chunks,
            chunk,
            rng,
        ) {
            return true;
        }
        *next.route_mut(from) = saved;
    }
    false
}

/// Exchanges one pair between two distinct routes; both reinsertions must
/// find a feasible position or the whole move reverts.
fn swap(
    next: &mut WorkingSolution,
    problem: &DispatchProblem,
    attempts: u64,
    rng: &mut SmallRng,
) -> bool {
    for _ in 0..attempts {
        let sources = routes_with_pairs(next, problem);
        if sources.len() < 2 {
            return false;
        }
        let first = sources[rng.random_range(0..sources.len())];
        let second = loop {
            let candidate = sources[rng.random_range(0..sources.len())];
            if candidate != first {
                break candidate;
            }
        };

        let Some(&chunk_first) = next.movable_pairs(problem, first).choose(rng) else {
            continue;
        };
        let Some(&chunk_second) = next.movable_pairs(problem, second).choose(rng) else {
            continue;
        };

        let saved_first = next.route(first).clone();
        let saved_second = next.route(second).clone();
        solution::extract_pair(next.route_mut(first), chunk_first);
        solution::extract_pair(next.route_mut(second), chunk_second);

        let placed = solution::try_insert_pair(
            next.route_mut(first),
            &problem.vehicles[first],
            &problem.chunks,
            chunk_second,
            rng,
        ) && solution::try_insert_pair(
            next.route_mut(second),
            &problem.vehicles[second],
            &problem.chunks,
            chunk_first,
            rng,
        );
        if placed {
            return true;
        }
        *next.route_mut(first) = saved_first;
        *next.route_mut(second) = saved_second;
    }
    false
}

/// Moves one pair to a different feasible position within its own route.
fn reorder(
    next: &mut WorkingSolution,
    problem: &DispatchProblem,
    attempts: u64,
    rng: &mut SmallRng,
) -> bool {
    for _ in 0..attempts {
        let sources = routes_with_pairs(next, problem);
        let Some(&vehicle) = sources.choose(rng) else {
            return false;
        };
        let pairs = next.movable_pairs(problem, vehicle);
        let Some(&chunk) = pairs.choose(rng) else {
            continue;
        };

        let saved = next.route(vehicle).clone();
        solution::extract_pair(next.route_mut(vehicle), chunk);
        if solution::try_insert_pair(
            next.route_mut(vehicle),
            &problem.vehicles[vehicle],
            &problem.chunks,
            chunk,
            rng,
        ) {
            return true;
        }
        *next.route_mut(vehicle) = saved;
    }
    false
}
