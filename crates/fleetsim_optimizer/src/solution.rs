use rand::{rngs::SmallRng, seq::SliceRandom};

use crate::problem::{ChunkIdx, DemandChunk, DispatchProblem, PlanRoute, PlanStop, VehicleSeed};

const CAPACITY_EPSILON: f64 = 1e-9;

/// One candidate assignment of every vehicle to a chunk-space route.
/// Routes are value copies: trials and archive members never alias the
/// live registries or each other.
#[derive(Debug, Clone)]
pub struct WorkingSolution {
    routes: Vec<PlanRoute>,
}

impl WorkingSolution {
    /// Starts from what every vehicle is already committed to.
    pub fn seeded(problem: &DispatchProblem) -> Self {
        Self {
            routes: problem
                .vehicles
                .iter()
                .map(|seed| seed.committed.clone())
                .collect(),
        }
    }

    pub fn with_route_count(count: usize) -> Self {
        Self {
            routes: vec![PlanRoute::new(); count],
        }
    }

    pub fn routes(&self) -> &[PlanRoute] {
        &self.routes
    }

    pub fn route(&self, vehicle: usize) -> &PlanRoute {
        &self.routes[vehicle]
    }

    pub fn route_mut(&mut self, vehicle: usize) -> &mut PlanRoute {
        &mut self.routes[vehicle]
    }

    /// Chunks whose pickup and delivery both sit past the locked prefix
    /// of `vehicle`'s route, i.e. pairs an operator may move.
    pub fn movable_pairs(&self, problem: &DispatchProblem, vehicle: usize) -> Vec<ChunkIdx> {
        let locked = problem.vehicles[vehicle].locked_len;
        let route = &self.routes[vehicle];
        route
            .iter()
            .skip(locked)
            .filter(|stop| stop.is_pickup())
            .filter(|stop| {
                route
                    .iter()
                    .skip(locked)
                    .any(|other| other.chunk == stop.chunk && !other.is_pickup())
            })
            .map(|stop| stop.chunk)
            .collect()
    }

    pub fn contains_chunk(&self, chunk: ChunkIdx) -> bool {
        self.routes
            .iter()
            .any(|route| route.iter().any(|stop| stop.chunk == chunk))
    }
}

/// Replays `route` from the vehicle's snapshotted load/volume; both must
/// stay within [0, max] at every stop.
pub fn is_feasible(seed: &VehicleSeed, route: &[PlanStop], chunks: &[DemandChunk]) -> bool {
    let mut load = seed.load;
    let mut volume = seed.volume;

    for stop in route {
        let chunk = &chunks[stop.chunk.get()];
        if stop.is_pickup() {
            load += chunk.quantity;
            volume += chunk.volume;
        } else {
            load -= chunk.quantity;
            volume -= chunk.volume;
        }
        if load < -CAPACITY_EPSILON
            || load > seed.max_load + CAPACITY_EPSILON
            || volume < -CAPACITY_EPSILON
            || volume > seed.max_volume + CAPACITY_EPSILON
        {
            return false;
        }
    }
    true
}

/// Removes a chunk's pickup+delivery pair from `route`. Returns the
/// (pickup, delivery) positions it held, or None if the pair is absent.
pub fn extract_pair(route: &mut PlanRoute, chunk: ChunkIdx) -> Option<(usize, usize)> {
    let pickup = route
        .iter()
        .position(|stop| stop.chunk == chunk && stop.is_pickup())?;
    let delivery = route
        .iter()
        .position(|stop| stop.chunk == chunk && !stop.is_pickup())?;
    // remove the later index first so the earlier one stays valid
    if pickup < delivery {
        route.remove(delivery);
        route.remove(pickup);
    } else {
        route.remove(pickup);
        route.remove(delivery);
    }
    Some((pickup, delivery))
}

/// Splices a pair back in: pickup at `start`, delivery so it lands at
/// `end` of the original indexing (both positions refer to the route
/// before insertion, `start <= end`).
pub fn insert_pair(route: &mut PlanRoute, chunk: ChunkIdx, start: usize, end: usize) {
    route.insert(start, PlanStop::pickup(chunk));
    route.insert(end + 1, PlanStop::delivery(chunk));
}

/// Tries every (start, end) position pair past the locked prefix in
/// shuffled order and keeps the first capacity-feasible splice. Leaves
/// `route` untouched when none fits.
pub fn try_insert_pair(
    route: &mut PlanRoute,
    seed: &VehicleSeed,
    chunks: &[DemandChunk],
    chunk: ChunkIdx,
    rng: &mut SmallRng,
) -> bool {
    let len = route.len();
    let mut positions: Vec<(usize, usize)> = (seed.locked_len..=len)
        .flat_map(|start| (start..=len).map(move |end| (start, end)))
        .collect();
    positions.shuffle(rng);

    for (start, end) in positions {
        let mut trial = route.clone();
        insert_pair(&mut trial, chunk, start, end);
        if is_feasible(seed, &trial, chunks) {
            *route = trial;
            return true;
        }
    }
    false
}

/// Deterministic fallback: append the pair at the end of the route.
pub fn try_append_pair(
    route: &mut PlanRoute,
    seed: &VehicleSeed,
    chunks: &[DemandChunk],
    chunk: ChunkIdx,
) -> bool {
    let len = route.len();
    let mut trial = route.clone();
    insert_pair(&mut trial, chunk, len, len);
    if is_feasible(seed, &trial, chunks) {
        *route = trial;
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{seed_at, simple_chunk};
    use fleetsim_model::location::Location;
    use rand::SeedableRng;

    fn chunks_of(quantities: &[f64]) -> Vec<DemandChunk> {
        quantities.iter().map(|&q| simple_chunk(q, q / 4.0)).collect()
    }

    fn seed() -> VehicleSeed {
        seed_at(100.0, 50.0, Location::from_lat_lon(48.0, 2.0))
    }

    #[test]
    fn test_feasibility_rejects_overload() {
        let seed = seed();
        let chunks = chunks_of(&[60.0, 60.0]);
        let route: PlanRoute = [
            PlanStop::pickup(ChunkIdx::new(0)),
            PlanStop::pickup(ChunkIdx::new(1)),
            PlanStop::delivery(ChunkIdx::new(0)),
            PlanStop::delivery(ChunkIdx::new(1)),
        ]
        .into_iter()
        .collect();

        assert!(!is_feasible(&seed, &route, &chunks));
    }

    #[test]
    fn test_feasibility_accepts_interleaved_pairs() {
        let seed = seed();
        let chunks = chunks_of(&[60.0, 60.0]);
        let route: PlanRoute = [
            PlanStop::pickup(ChunkIdx::new(0)),
            PlanStop::delivery(ChunkIdx::new(0)),
            PlanStop::pickup(ChunkIdx::new(1)),
            PlanStop::delivery(ChunkIdx::new(1)),
        ]
        .into_iter()
        .collect();

        assert!(is_feasible(&seed, &route, &chunks));
    }

    #[test]
    fn test_extract_then_insert_round_trips() {
        let chunks = chunks_of(&[40.0, 30.0]);
        let mut route: PlanRoute = [
            PlanStop::pickup(ChunkIdx::new(0)),
            PlanStop::pickup(ChunkIdx::new(1)),
            PlanStop::delivery(ChunkIdx::new(1)),
            PlanStop::delivery(ChunkIdx::new(0)),
        ]
        .into_iter()
        .collect();

        let removed = extract_pair(&mut route, ChunkIdx::new(1));
        assert_eq!(removed, Some((1, 2)));
        assert_eq!(route.len(), 2);
        assert!(route.iter().all(|stop| stop.chunk == ChunkIdx::new(0)));

        insert_pair(&mut route, ChunkIdx::new(1), 1, 1);
        assert_eq!(route[1], PlanStop::pickup(ChunkIdx::new(1)));
        assert_eq!(route[2], PlanStop::delivery(ChunkIdx::new(1)));
        assert!(is_feasible(&seed(), &route, &chunks));
    }

    #[test]
    fn test_try_insert_finds_feasible_position() {
        let seed = seed();
        let chunks = chunks_of(&[80.0, 80.0]);
        let mut route: PlanRoute = [
            PlanStop::pickup(ChunkIdx::new(0)),
            PlanStop::delivery(ChunkIdx::new(0)),
        ]
        .into_iter()
        .collect();

        let mut rng = SmallRng::seed_from_u64(11);
        // the only feasible placements keep the two 80-unit pairs disjoint
        assert!(try_insert_pair(&mut route, &seed, &chunks, ChunkIdx::new(1), &mut rng));
        assert!(is_feasible(&seed, &route, &chunks));
        assert_eq!(route.len(), 4);
    }

    #[test]
    fn test_try_insert_leaves_route_unchanged_on_failure() {
        let mut seed = seed();
        seed.load = 90.0;
        let chunks = chunks_of(&[80.0]);
        let mut route = PlanRoute::new();

        let mut rng = SmallRng::seed_from_u64(11);
        assert!(!try_insert_pair(&mut route, &seed, &chunks, ChunkIdx::new(0), &mut rng));
        assert!(route.is_empty());
    }

    #[test]
    fn test_movable_pairs_skip_locked_prefix() {
        use crate::problem::{DispatchProblem, OptimizerParams};
        use crate::test_utils::{registry_with_vehicles, simple_demand};
        use fleetsim_model::{path_node::PathNode, registry::DemandRegistry, vehicle::Route};

        let mut vehicles = registry_with_vehicles(&[(100.0, 50.0)]);
        let mut demands = DemandRegistry::new();
        let in_flight = demands.insert(simple_demand(30.0, 5.0));
        let queued = demands.insert(simple_demand(20.0, 5.0));
        demands.get_mut(in_flight).mark_assigned();
        demands.get_mut(queued).mark_assigned();

        let mut route = Route::new();
        route.push(PathNode::delivery(in_flight));
        route.push(PathNode::pickup(queued));
        route.push(PathNode::delivery(queued));
        vehicles.vehicles_mut()[0].set_route(route);

        let problem = DispatchProblem::snapshot(&vehicles, &demands, &OptimizerParams::default());
        let solution = WorkingSolution::seeded(&problem);

        let movable = solution.movable_pairs(&problem, 0);
        assert_eq!(movable.len(), 1);
        // the lone in-flight delivery is not movable
        assert_eq!(problem.chunk(movable[0]).source.demand(), queued);
    }
}
