use std::sync::{atomic::Ordering, Arc};
use std::time::Duration;

use mimalloc::MiMalloc;
use parking_lot::RwLock;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{info, Level};

use fleetsim_model::{
    behaviour,
    config::SimConfig,
    demand::{Demand, ProductType},
    location::Location,
    registry::{DemandRegistry, VehicleRegistry},
    vehicle::{Vehicle, VehicleState, VehicleType},
};
use fleetsim_optimizer::{
    dispatch::{DispatchWorker, SchedulerKind},
    problem::OptimizerParams,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const PRODUCT_TYPES: [ProductType; 4] = [
    ProductType::General,
    ProductType::Wood,
    ProductType::Steel,
    ProductType::Pharmaceutical,
];

const VEHICLE_TYPES: [VehicleType; 6] = [
    VehicleType::Common,
    VehicleType::InsulatedVan,
    VehicleType::Dangerous,
    VehicleType::Oversized,
    VehicleType::Tanker,
    VehicleType::ShockAbsorber,
];

// scenario centered on the Paris region
const CENTER_LAT: f64 = 48.85;
const CENTER_LON: f64 = 2.35;

fn build_fleet(config: &SimConfig, rng: &mut SmallRng) -> VehicleRegistry {
    let count = config.u64_or("vehicle_count", 12);
    let mut registry = VehicleRegistry::new();
    for i in 0..count {
        let vehicle_type = VEHICLE_TYPES[i as usize % VEHICLE_TYPES.len()];
        let max_load = 60.0 + rng.random_range(0..5) as f64 * 20.0;
        let max_volume = max_load / 2.0;
        let position = Location::from_lat_lon(
            CENTER_LAT + rng.random_range(-0.3..0.3),
            CENTER_LON + rng.random_range(-0.3..0.3),
        );
        registry.insert(Vehicle::new(vehicle_type, max_load, max_volume, position));
    }
    registry
}

fn build_demands(config: &SimConfig, rng: &mut SmallRng) -> DemandRegistry {
    let count = config.u64_or("demand_count", 40);
    let mut registry = DemandRegistry::new();
    for i in 0..count {
        let product = PRODUCT_TYPES[i as usize % PRODUCT_TYPES.len()];
        let origin = Location::from_lat_lon(
            CENTER_LAT + rng.random_range(-0.4..0.4),
            CENTER_LON + rng.random_range(-0.4..0.4),
        );
        let destination = Location::from_lat_lon(
            CENTER_LAT + rng.random_range(-0.4..0.4),
            CENTER_LON + rng.random_range(-0.4..0.4),
        );
        let quantity = rng.random_range(5.0..120.0);
        let volume = quantity / 4.0;
        registry.insert(Demand::new(origin, destination, product, quantity, volume));
    }
    registry
}

fn all_delivered(demands: &DemandRegistry) -> bool {
    demands
        .iter()
        .all(|(_, demand)| demand.is_fulfilled() || demand.quantity() <= 1e-9)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = match std::env::args().nth(1) {
        Some(path) => SimConfig::load(&path)?,
        None => SimConfig::default(),
    };
    let params = OptimizerParams::from_config(&config);
    let seed = config.u64_or("seed", 42);
    let mut rng = SmallRng::seed_from_u64(seed);

    let vehicles = Arc::new(RwLock::new(build_fleet(&config, &mut rng)));
    let demands = Arc::new(RwLock::new(build_demands(&config, &mut rng)));
    let vehicle_count = vehicles.read().len();
    info!(
        vehicles = vehicle_count,
        demands = demands.read().len(),
        seed,
        "scenario ready"
    );

    let kind = SchedulerKind::from_name(config.str_or("scheduler", "mosa"));
    let worker = DispatchWorker::new(vehicles.clone(), demands.clone(), params, kind);
    let cancel = worker.cancel_handle();
    let worker_task = tokio::spawn(worker.run(SmallRng::seed_from_u64(seed.wrapping_add(1))));

    let tick_seconds = config.f64_or("tick_seconds", 1.0);
    let tick_millis = config.u64_or("tick_millis", 50);
    let max_ticks = config.u64_or("max_ticks", 3600);

    // one generator per vehicle keeps parallel ticks replayable
    let mut tick_rngs: Vec<SmallRng> = (0..vehicle_count)
        .map(|i| SmallRng::seed_from_u64(seed.wrapping_add(0x9e37_79b9 + i as u64)))
        .collect();

    for tick in 0..max_ticks {
        tokio::time::sleep(Duration::from_millis(tick_millis)).await;

        let fulfilled: Vec<_> = {
            let mut vehicles = vehicles.write();
            let demands = demands.read();
            vehicles
                .vehicles_mut()
                .par_iter_mut()
                .zip(tick_rngs.par_iter_mut())
                .map(|(vehicle, rng)| behaviour::tick(vehicle, &demands, rng, tick_seconds))
                .collect::<Vec<_>>()
                .into_iter()
                .filter_map(|report| report.fulfilled)
                .collect()
        };
        if !fulfilled.is_empty() {
            let mut demands = demands.write();
            for idx in fulfilled {
                demands.get_mut(idx).mark_fulfilled();
            }
        }

        if tick % 60 == 0 {
            let vehicles = vehicles.read();
            let demands_guard = demands.read();
            let idle = vehicles
                .vehicles()
                .iter()
                .filter(|v| v.state() == VehicleState::Available)
                .count();
            let frozen = vehicles
                .vehicles()
                .iter()
                .filter(|v| v.state() == VehicleState::Freeze)
                .count();
            let moving = vehicles
                .vehicles()
                .iter()
                .filter(|v| behaviour::next_destination(v, &demands_guard).is_some())
                .count();
            let delivered = demands_guard
                .iter()
                .filter(|(_, d)| d.is_fulfilled())
                .count();
            info!(tick, idle, moving, frozen, delivered, "simulation progress");
        }

        if all_delivered(&demands.read()) {
            info!(tick, "all demands delivered");
            break;
        }
    }

    cancel.store(true, Ordering::Relaxed);
    worker_task.await.ok();

    let vehicles = vehicles.read();
    let mut tonnage = 0.0;
    let mut empty_distance = 0.0;
    let mut carbon = 0.0;
    for vehicle in vehicles.vehicles() {
        let stats = vehicle.statistics();
        tonnage += stats.total_tonnage;
        empty_distance += stats.empty_distance;
        carbon += stats.carbon_emission;
    }
    info!(tonnage, empty_distance, carbon, "fleet totals");
    Ok(())
}
