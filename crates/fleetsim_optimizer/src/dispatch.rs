use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use fxhash::FxHashMap;
use parking_lot::RwLock;
use rand::rngs::SmallRng;
use tracing::{debug, info};

use fleetsim_model::{
    demand::DemandIdx,
    path_node::PathNode,
    registry::{DemandRegistry, VehicleRegistry},
    vehicle::{Route, VehicleStatistics},
};

use crate::{
    objective::{evaluator::RouteEvaluator, vector::ObjectiveKind},
    problem::{ChunkIdx, ChunkSource, DispatchProblem, OptimizerParams},
    scheduler::{
        annealing::AnnealingScheduler, fcfs::FcfsScheduler, greedy::GreedyScheduler,
        mosa::MosaScheduler, Scheduler,
    },
    solution::WorkingSolution,
};

/// Split residue below this counts as fully carved up.
const QUANTITY_EPSILON: f64 = 1e-9;

/// Which strategy a dispatch cycle runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerKind {
    Fcfs,
    Greedy,
    Annealing,
    Mosa,
}

impl SchedulerKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "fcfs" => SchedulerKind::Fcfs,
            "greedy" => SchedulerKind::Greedy,
            "annealing" => SchedulerKind::Annealing,
            _ => SchedulerKind::Mosa,
        }
    }
}

/// Runs one scheduling cycle at a fixed cadence: snapshot the registries,
/// schedule against the snapshot, commit the chosen routes back under the
/// write lock. Vehicle ticks may run between cycles but never interleave
/// with a commit.
pub struct DispatchWorker {
    vehicles: Arc<RwLock<VehicleRegistry>>,
    demands: Arc<RwLock<DemandRegistry>>,
    params: OptimizerParams,
    kind: SchedulerKind,
    cancel: Arc<AtomicBool>,
}

impl DispatchWorker {
    pub fn new(
        vehicles: Arc<RwLock<VehicleRegistry>>,
        demands: Arc<RwLock<DemandRegistry>>,
        params: OptimizerParams,
        kind: SchedulerKind,
    ) -> Self {
        Self {
            vehicles,
            demands,
            params,
            kind,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A handle that stops the worker (and any in-flight cycle) soon.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn stop(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub async fn run(self, mut rng: SmallRng) {
        let mut interval =
            tokio::time::interval(Duration::from_secs_f64(self.params.cycle_interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if self.cancel.load(Ordering::Relaxed) {
                info!("dispatch worker stopping");
                return;
            }
            self.cycle(&mut rng);
        }
    }

    /// One full scheduling cycle. Synchronous: the archive and normalizer
    /// live and die inside the scheduler call, so cycles never share them.
    pub fn cycle(&self, rng: &mut SmallRng) {
        let problem = {
            let vehicles = self.vehicles.read();
            let demands = self.demands.read();
            DispatchProblem::snapshot(&vehicles, &demands, &self.params)
        };
        if problem.pending.is_empty() {
            debug!("no pending demands, skipping cycle");
            return;
        }

        let solution = match self.kind {
            SchedulerKind::Fcfs => FcfsScheduler.schedule(&problem, rng),
            SchedulerKind::Greedy => GreedyScheduler::new(&self.params).schedule(&problem, rng),
            SchedulerKind::Annealing => {
                AnnealingScheduler::new(&self.params).schedule(&problem, rng)
            }
            SchedulerKind::Mosa => MosaScheduler::new(&self.params)
                .with_cancel(self.cancel.clone())
                .schedule(&problem, rng),
        };

        let mut vehicles = self.vehicles.write();
        let mut demands = self.demands.write();
        commit(&problem, &solution, &self.params, &mut vehicles, &mut demands);
    }
}

/// Writes the chosen solution back: each vehicle gets its new route and
/// the statistics of its contribution, each placed demand is marked
/// assigned, and split slices become child demands of their parent.
pub fn commit(
    problem: &DispatchProblem,
    solution: &WorkingSolution,
    params: &OptimizerParams,
    vehicles: &mut VehicleRegistry,
    demands: &mut DemandRegistry,
) {
    let evaluator = RouteEvaluator::new(params);
    let mut children: FxHashMap<ChunkIdx, DemandIdx> = FxHashMap::default();
    let mut placed_whole: Vec<DemandIdx> = Vec::new();
    let mut committed_routes = 0usize;

    for (index, seed) in problem.vehicles.iter().enumerate() {
        let plan = solution.route(index);

        let mut route = Route::new();
        for stop in plan {
            let chunk = problem.chunk(stop.chunk);
            let demand_idx = match chunk.source {
                ChunkSource::Committed(idx) => idx,
                ChunkSource::Whole(idx) => {
                    placed_whole.push(idx);
                    idx
                }
                ChunkSource::Split(parent) => *children.entry(stop.chunk).or_insert_with(|| {
                    let child = {
                        let parent = demands.get(parent);
                        parent.split_off(chunk.quantity, chunk.volume)
                    };
                    let idx = demands.insert(child);
                    demands.get_mut(idx).mark_assigned();
                    let parent = demands.get_mut(parent);
                    parent.reduce(chunk.quantity, chunk.volume);
                    if parent.quantity() <= QUANTITY_EPSILON {
                        parent.mark_assigned();
                    }
                    idx
                }),
            };
            route.push(PathNode {
                demand: demand_idx,
                kind: stop.kind,
            });
        }

        let vector = evaluator.route_vector(seed, plan, &problem.chunks);
        let vehicle = vehicles.get_mut(seed.idx);
        vehicle.set_route(route);
        vehicle.set_statistics(VehicleStatistics {
            waiting_time: vector.get(ObjectiveKind::WaitingTime),
            empty_distance: vector.get(ObjectiveKind::EmptyDistance),
            wasted_load: vector.get(ObjectiveKind::LoadWaste),
            total_tonnage: vector.get(ObjectiveKind::DeliveredTonnage),
            carbon_emission: vector.get(ObjectiveKind::CarbonEmission),
        });
        if !plan.is_empty() {
            committed_routes += 1;
        }
    }

    placed_whole.sort_unstable();
    placed_whole.dedup();
    for idx in placed_whole {
        demands.get_mut(idx).mark_assigned();
    }

    debug!(
        routes = committed_routes,
        split_children = children.len(),
        "committed dispatch solution"
    );
}
