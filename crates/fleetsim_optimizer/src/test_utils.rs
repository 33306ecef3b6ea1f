use fleetsim_model::{
    demand::{Demand, DemandIdx, ProductType},
    location::Location,
    registry::VehicleRegistry,
    vehicle::{Vehicle, VehicleIdx, VehicleType},
};

use crate::problem::{ChunkSource, DemandChunk, PlanRoute, VehicleSeed};

pub fn registry_with_vehicles(capacities: &[(f64, f64)]) -> VehicleRegistry {
    let mut registry = VehicleRegistry::new();
    for &(max_load, max_volume) in capacities {
        registry.insert(Vehicle::new(
            VehicleType::Common,
            max_load,
            max_volume,
            Location::from_lat_lon(48.85, 2.35),
        ));
    }
    registry
}

pub fn simple_demand(quantity: f64, volume: f64) -> Demand {
    Demand::new(
        Location::from_lat_lon(48.9, 2.4),
        Location::from_lat_lon(49.5, 3.1),
        ProductType::General,
        quantity,
        volume,
    )
}

pub fn simple_chunk(quantity: f64, volume: f64) -> DemandChunk {
    DemandChunk {
        source: ChunkSource::Whole(DemandIdx::new(0)),
        origin: Location::from_lat_lon(48.9, 2.4),
        destination: Location::from_lat_lon(49.5, 3.1),
        quantity,
        volume,
    }
}

pub fn seed_at(max_load: f64, max_volume: f64, position: Location) -> VehicleSeed {
    VehicleSeed {
        idx: VehicleIdx::new(0),
        max_load,
        max_volume,
        load: 0.0,
        volume: 0.0,
        position,
        committed: PlanRoute::new(),
        locked_len: 0,
    }
}
