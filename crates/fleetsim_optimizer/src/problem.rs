use fxhash::FxHashMap;
use smallvec::SmallVec;

use fleetsim_model::{
    config::SimConfig,
    define_index_newtype,
    demand::DemandIdx,
    location::Location,
    path_node::StopKind,
    registry::{DemandRegistry, VehicleRegistry},
    vehicle::VehicleIdx,
};

define_index_newtype!(ChunkIdx, DemandChunk);

/// Where a chunk came from, which decides how a commit writes it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkSource {
    /// Already on a vehicle's route before this cycle.
    Committed(DemandIdx),
    /// A pending demand small enough for a single vehicle.
    Whole(DemandIdx),
    /// One slice of a pending demand too large for any single vehicle.
    Split(DemandIdx),
}

impl ChunkSource {
    pub fn demand(self) -> DemandIdx {
        match self {
            ChunkSource::Committed(idx) | ChunkSource::Whole(idx) | ChunkSource::Split(idx) => idx,
        }
    }
}

/// The unit the optimizer assigns: a demand, or a capacity-sized slice of
/// one. Origin/destination and amounts are copied out of the registry so
/// the whole cycle runs on an immutable snapshot.
#[derive(Debug, Clone, Copy)]
pub struct DemandChunk {
    pub source: ChunkSource,
    pub origin: Location,
    pub destination: Location,
    pub quantity: f64,
    pub volume: f64,
}

/// One pickup or delivery stop in chunk space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanStop {
    pub chunk: ChunkIdx,
    pub kind: StopKind,
}

impl PlanStop {
    pub fn pickup(chunk: ChunkIdx) -> Self {
        Self {
            chunk,
            kind: StopKind::Pickup,
        }
    }

    pub fn delivery(chunk: ChunkIdx) -> Self {
        Self {
            chunk,
            kind: StopKind::Delivery,
        }
    }

    pub fn is_pickup(&self) -> bool {
        self.kind == StopKind::Pickup
    }
}

pub type PlanRoute = SmallVec<[PlanStop; 8]>;

/// Frozen per-vehicle state a scheduling cycle plans against.
#[derive(Debug, Clone)]
pub struct VehicleSeed {
    pub idx: VehicleIdx,
    pub max_load: f64,
    pub max_volume: f64,
    pub load: f64,
    pub volume: f64,
    pub position: Location,
    /// The route the vehicle already carries, converted to chunk space.
    pub committed: PlanRoute,
    /// Leading stops that are in flight: deliveries whose pickup has
    /// already happened, plus a pickup the vehicle is currently
    /// executing. Operators must leave these in place.
    pub locked_len: usize,
}

/// An immutable snapshot of registries taken at cycle start. The
/// schedulers read only this; live state is touched again at commit.
#[derive(Debug, Clone)]
pub struct DispatchProblem {
    pub vehicles: Vec<VehicleSeed>,
    pub chunks: Vec<DemandChunk>,
    /// Chunks that still need a route this cycle.
    pub pending: Vec<ChunkIdx>,
}

impl DispatchProblem {
    pub fn snapshot(
        vehicles: &VehicleRegistry,
        demands: &DemandRegistry,
        params: &OptimizerParams,
    ) -> Self {
        let cap_load = vehicles
            .vehicles()
            .iter()
            .map(|v| v.max_load())
            .fold(0.0, f64::max);
        let cap_volume = vehicles
            .vehicles()
            .iter()
            .map(|v| v.max_volume())
            .fold(0.0, f64::max);

        let mut chunks = Vec::new();
        let mut seeds = Vec::with_capacity(vehicles.len());

        for (idx, vehicle) in vehicles.iter() {
            let mut by_demand: FxHashMap<DemandIdx, ChunkIdx> = FxHashMap::default();
            let mut committed = PlanRoute::new();
            for node in vehicle.route() {
                let chunk = *by_demand.entry(node.demand).or_insert_with(|| {
                    let demand = demands.get(node.demand);
                    chunks.push(DemandChunk {
                        source: ChunkSource::Committed(node.demand),
                        origin: *demand.origin(),
                        destination: *demand.destination(),
                        quantity: demand.quantity(),
                        volume: demand.volume(),
                    });
                    ChunkIdx::new(chunks.len() - 1)
                });
                committed.push(PlanStop {
                    chunk,
                    kind: node.kind,
                });
            }

            let has_pickup = |chunk: ChunkIdx| committed.iter().any(|s| s.chunk == chunk && s.is_pickup());
            let mut locked_len = committed
                .iter()
                .take_while(|stop| !stop.is_pickup() && !has_pickup(stop.chunk))
                .count();
            // A pickup the state machine is mid-way through executing
            // must stay on this vehicle as well: the live route head is
            // replayed against `current_demand` regardless of what the
            // commit writes back.
            if let Some(executing) = vehicle.current_demand()
                && committed
                    .get(locked_len)
                    .is_some_and(|stop| stop.is_pickup() && chunks[stop.chunk].source.demand() == executing)
            {
                locked_len += 1;
            }

            seeds.push(VehicleSeed {
                idx,
                max_load: vehicle.max_load(),
                max_volume: vehicle.max_volume(),
                load: vehicle.load(),
                volume: vehicle.volume(),
                position: *vehicle.position(),
                committed,
                locked_len,
            });
        }

        let mut pending = Vec::new();
        for (idx, demand) in demands.pending() {
            if demand.quantity() <= 1e-9 {
                continue;
            }
            let parts = split_count(
                demand.quantity(),
                demand.volume(),
                cap_load * params.split_headroom,
                cap_volume * params.split_headroom,
            );
            let source = if parts == 1 {
                ChunkSource::Whole(idx)
            } else {
                ChunkSource::Split(idx)
            };
            let quantity = demand.quantity() / parts as f64;
            let volume = demand.volume() / parts as f64;
            for _ in 0..parts {
                chunks.push(DemandChunk {
                    source,
                    origin: *demand.origin(),
                    destination: *demand.destination(),
                    quantity,
                    volume,
                });
                pending.push(ChunkIdx::new(chunks.len() - 1));
            }
        }

        Self {
            vehicles: seeds,
            chunks,
            pending,
        }
    }

    pub fn chunk(&self, idx: ChunkIdx) -> &DemandChunk {
        &self.chunks[idx.get()]
    }
}

/// Slices needed so each slice fits under the per-chunk caps. A demand no
/// vehicle can carry even in slices stays a single unassignable chunk.
fn split_count(quantity: f64, volume: f64, cap_load: f64, cap_volume: f64) -> usize {
    let mut parts = 1.0f64;
    if cap_load > 0.0 {
        parts = parts.max((quantity / cap_load).ceil());
    }
    if cap_volume > 0.0 {
        parts = parts.max((volume / cap_volume).ceil());
    }
    parts as usize
}

/// Tunables for one dispatch cycle, read from [`SimConfig`] with defaults
/// applied for every absent key.
#[derive(Debug, Clone)]
pub struct OptimizerParams {
    pub handling_time_per_unit: f64,
    pub carbon_emission_factor: f64,
    pub cooling_rate: f64,
    pub reheat_factor: f64,
    pub mosa_iterations: u64,
    pub sample_size: u64,
    pub sa_iterations: u64,
    pub min_temperature: f64,
    pub neighbor_attempts: u64,
    /// Fraction of the largest vehicle capacity a split chunk may use.
    pub split_headroom: f64,
    pub cycle_interval_secs: f64,
}

impl Default for OptimizerParams {
    fn default() -> Self {
        Self {
            handling_time_per_unit: 0.01,
            carbon_emission_factor: 0.0002,
            cooling_rate: 0.95,
            reheat_factor: 1.05,
            mosa_iterations: 500,
            sample_size: 50,
            sa_iterations: 750,
            min_temperature: 1.0,
            neighbor_attempts: 20,
            split_headroom: 1.0,
            cycle_interval_secs: 1.0,
        }
    }
}

impl OptimizerParams {
    pub fn from_config(config: &SimConfig) -> Self {
        let defaults = Self::default();
        Self {
            handling_time_per_unit: config
                .f64_or("handling_time_per_unit", defaults.handling_time_per_unit),
            carbon_emission_factor: config
                .f64_or("carbon_emission_factor", defaults.carbon_emission_factor),
            cooling_rate: config.f64_or("cooling_rate", defaults.cooling_rate),
            reheat_factor: config.f64_or("reheat_factor", defaults.reheat_factor),
            mosa_iterations: config.u64_or("mosa_iterations", defaults.mosa_iterations),
            sample_size: config.u64_or("sample_size", defaults.sample_size),
            sa_iterations: config.u64_or("sa_iterations", defaults.sa_iterations),
            min_temperature: config.f64_or("min_temperature", defaults.min_temperature),
            neighbor_attempts: config.u64_or("neighbor_attempts", defaults.neighbor_attempts),
            split_headroom: config.f64_or("split_headroom", defaults.split_headroom),
            cycle_interval_secs: config.f64_or("cycle_interval_secs", defaults.cycle_interval_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{registry_with_vehicles, simple_demand};

    #[test]
    fn test_snapshot_splits_oversized_demand() {
        let vehicles = registry_with_vehicles(&[(100.0, 50.0), (80.0, 40.0)]);
        let mut demands = DemandRegistry::new();
        let idx = demands.insert(simple_demand(250.0, 60.0));

        let problem = DispatchProblem::snapshot(&vehicles, &demands, &OptimizerParams::default());

        // 250 / 100 load cap -> 3 slices of ~83.3 each
        assert_eq!(problem.pending.len(), 3);
        for &chunk in &problem.pending {
            let chunk = problem.chunk(chunk);
            assert_eq!(chunk.source, ChunkSource::Split(idx));
            assert!(chunk.quantity <= 100.0);
            assert!((chunk.quantity - 250.0 / 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_snapshot_keeps_small_demand_whole() {
        let vehicles = registry_with_vehicles(&[(100.0, 50.0)]);
        let mut demands = DemandRegistry::new();
        let idx = demands.insert(simple_demand(40.0, 10.0));

        let problem = DispatchProblem::snapshot(&vehicles, &demands, &OptimizerParams::default());

        assert_eq!(problem.pending.len(), 1);
        assert_eq!(
            problem.chunk(problem.pending[0]).source,
            ChunkSource::Whole(idx)
        );
    }

    #[test]
    fn test_snapshot_locks_in_flight_delivery() {
        use fleetsim_model::{path_node::PathNode, vehicle::Route};

        let mut vehicles = registry_with_vehicles(&[(100.0, 50.0)]);
        let mut demands = DemandRegistry::new();
        let in_flight = demands.insert(simple_demand(30.0, 5.0));
        let queued = demands.insert(simple_demand(20.0, 5.0));
        demands.get_mut(in_flight).mark_assigned();
        demands.get_mut(queued).mark_assigned();

        // pickup already executed: route holds a lone delivery, then a
        // complete pair for the queued demand
        let mut route = Route::new();
        route.push(PathNode::delivery(in_flight));
        route.push(PathNode::pickup(queued));
        route.push(PathNode::delivery(queued));
        vehicles.vehicles_mut()[0].set_route(route);

        let problem = DispatchProblem::snapshot(&vehicles, &demands, &OptimizerParams::default());

        let seed = &problem.vehicles[0];
        assert_eq!(seed.committed.len(), 3);
        assert_eq!(seed.locked_len, 1);
        assert!(problem.pending.is_empty());
    }

    #[test]
    fn test_snapshot_locks_pickup_in_execution() {
        use crate::solution::WorkingSolution;
        use fleetsim_model::{
            path_node::PathNode,
            vehicle::{Route, VehicleState},
        };

        let mut vehicles = registry_with_vehicles(&[(100.0, 50.0), (100.0, 50.0)]);
        let mut demands = DemandRegistry::new();
        let loading = demands.insert(simple_demand(40.0, 10.0));
        demands.get_mut(loading).mark_assigned();

        // Vehicle 0 is mid-load: the pickup is still the route head and
        // `current_demand` points at it.
        let mut route = Route::new();
        route.push(PathNode::pickup(loading));
        route.push(PathNode::delivery(loading));
        let vehicle = &mut vehicles.vehicles_mut()[0];
        vehicle.set_route(route);
        vehicle.set_state(VehicleState::OrderTaken);
        vehicle.set_state(VehicleState::Loading);
        vehicle.set_current_demand(Some(loading));

        let problem = DispatchProblem::snapshot(&vehicles, &demands, &OptimizerParams::default());

        let seed = &problem.vehicles[0];
        assert_eq!(seed.committed.len(), 2);
        assert_eq!(seed.locked_len, 1);

        // The pair being executed must never be offered to the operators,
        // or a relocate could hand it to vehicle 1 mid-load.
        let solution = WorkingSolution::seeded(&problem);
        assert!(solution.movable_pairs(&problem, 0).is_empty());
        assert!(solution.movable_pairs(&problem, 1).is_empty());
    }
}
