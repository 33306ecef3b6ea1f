use fxhash::FxHashMap;
use uuid::Uuid;

use crate::{
    demand::{Demand, DemandIdx},
    vehicle::{Vehicle, VehicleIdx},
};

/// Live set of vehicles, owned by the simulation and shared with the
/// dispatch worker behind a lock. Indices are stable: vehicles are never
/// removed, only added.
#[derive(Default)]
pub struct VehicleRegistry {
    vehicles: Vec<Vehicle>,
    by_id: FxHashMap<Uuid, VehicleIdx>,
}

impl VehicleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, vehicle: Vehicle) -> VehicleIdx {
        let idx = VehicleIdx::new(self.vehicles.len());
        self.by_id.insert(vehicle.id(), idx);
        self.vehicles.push(vehicle);
        idx
    }

    pub fn get(&self, idx: VehicleIdx) -> &Vehicle {
        &self.vehicles[idx]
    }

    pub fn get_mut(&mut self, idx: VehicleIdx) -> &mut Vehicle {
        &mut self.vehicles[idx]
    }

    pub fn lookup(&self, id: Uuid) -> Option<VehicleIdx> {
        self.by_id.get(&id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VehicleIdx, &Vehicle)> {
        self.vehicles
            .iter()
            .enumerate()
            .map(|(i, v)| (VehicleIdx::new(i), v))
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn vehicles_mut(&mut self) -> &mut [Vehicle] {
        &mut self.vehicles
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }
}

/// Pending and in-flight demands. Fulfilled demands stay in place so that
/// `DemandIdx` references held by routes never dangle.
#[derive(Default)]
pub struct DemandRegistry {
    demands: Vec<Demand>,
    by_id: FxHashMap<Uuid, DemandIdx>,
}

impl DemandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, demand: Demand) -> DemandIdx {
        let idx = DemandIdx::new(self.demands.len());
        self.by_id.insert(demand.id(), idx);
        self.demands.push(demand);
        idx
    }

    pub fn get(&self, idx: DemandIdx) -> &Demand {
        &self.demands[idx]
    }

    pub fn get_mut(&mut self, idx: DemandIdx) -> &mut Demand {
        &mut self.demands[idx]
    }

    pub fn lookup(&self, id: Uuid) -> Option<DemandIdx> {
        self.by_id.get(&id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DemandIdx, &Demand)> {
        self.demands
            .iter()
            .enumerate()
            .map(|(i, d)| (DemandIdx::new(i), d))
    }

    /// Demands that still wait for a scheduling commit.
    pub fn pending(&self) -> impl Iterator<Item = (DemandIdx, &Demand)> {
        self.iter()
            .filter(|(_, d)| !d.is_assigned() && !d.is_fulfilled())
    }

    pub fn demands(&self) -> &[Demand] {
        &self.demands
    }

    pub fn len(&self) -> usize {
        self.demands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.demands.is_empty()
    }
}
