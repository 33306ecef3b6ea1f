use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use uuid::Uuid;

use crate::{
    define_index_newtype,
    demand::DemandIdx,
    location::Location,
    path_node::PathNode,
    timer::Timer,
};

define_index_newtype!(VehicleIdx, Vehicle);

pub type Route = SmallVec<[PathNode; 8]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleType {
    Common,
    InsulatedVan,
    Dangerous,
    Oversized,
    Tanker,
    ShockAbsorber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleState {
    Available,
    OrderTaken,
    Loading,
    Transporting,
    Unloading,
    Freeze,
}

/// Accumulated per-vehicle statistics, overwritten by each scheduling
/// commit from the vehicle's contribution to the objective vector.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct VehicleStatistics {
    pub waiting_time: f64,
    pub empty_distance: f64,
    pub wasted_load: f64,
    pub total_tonnage: f64,
    pub carbon_emission: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    id: Uuid,
    vehicle_type: VehicleType,
    max_load: f64,
    max_volume: f64,
    load: f64,
    volume: f64,
    position: Location,
    route: Route,
    state: VehicleState,
    prev_state: VehicleState,
    state_timer: Timer,
    current_demand: Option<DemandIdx>,
    statistics: VehicleStatistics,
}

impl Vehicle {
    pub fn new(
        vehicle_type: VehicleType,
        max_load: f64,
        max_volume: f64,
        position: Location,
    ) -> Self {
        Vehicle {
            id: Uuid::new_v4(),
            vehicle_type,
            max_load,
            max_volume,
            load: 0.0,
            volume: 0.0,
            position,
            route: Route::new(),
            state: VehicleState::Available,
            prev_state: VehicleState::Available,
            state_timer: Timer::elapsed(),
            current_demand: None,
            statistics: VehicleStatistics::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn vehicle_type(&self) -> VehicleType {
        self.vehicle_type
    }

    pub fn max_load(&self) -> f64 {
        self.max_load
    }

    pub fn max_volume(&self) -> f64 {
        self.max_volume
    }

    pub fn load(&self) -> f64 {
        self.load
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn remaining_load(&self) -> f64 {
        self.max_load - self.load
    }

    pub fn remaining_volume(&self) -> f64 {
        self.max_volume - self.volume
    }

    pub fn position(&self) -> &Location {
        &self.position
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn route_head(&self) -> Option<&PathNode> {
        self.route.first()
    }

    pub fn state(&self) -> VehicleState {
        self.state
    }

    pub fn prev_state(&self) -> VehicleState {
        self.prev_state
    }

    pub fn state_timer(&self) -> &Timer {
        &self.state_timer
    }

    pub fn state_timer_mut(&mut self) -> &mut Timer {
        &mut self.state_timer
    }

    pub fn current_demand(&self) -> Option<DemandIdx> {
        self.current_demand
    }

    pub fn statistics(&self) -> &VehicleStatistics {
        &self.statistics
    }

    pub fn set_position(&mut self, position: Location) {
        self.position = position;
    }

    /// Transitions the state machine, remembering the previous state so a
    /// `Freeze` can restore it later.
    pub fn set_state(&mut self, state: VehicleState) {
        self.prev_state = self.state;
        self.state = state;
    }

    pub fn set_current_demand(&mut self, demand: Option<DemandIdx>) {
        self.current_demand = demand;
    }

    pub fn set_statistics(&mut self, statistics: VehicleStatistics) {
        self.statistics = statistics;
    }

    /// Replaces the assigned route. Only the dispatch commit step may call
    /// this, while holding exclusive access to the registry.
    pub fn set_route(&mut self, route: Route) {
        self.route = route;
    }

    pub fn pop_route_head(&mut self) -> Option<PathNode> {
        if self.route.is_empty() {
            None
        } else {
            Some(self.route.remove(0))
        }
    }

    /// Takes `quantity`/`volume` on board, clamped to capacity so the
    /// `0 <= load <= max_load` invariant holds after every operation.
    pub fn apply_pickup(&mut self, quantity: f64, volume: f64) {
        self.load = (self.load + quantity).min(self.max_load);
        self.volume = (self.volume + volume).min(self.max_volume);
    }

    pub fn apply_delivery(&mut self, quantity: f64, volume: f64) {
        self.load = (self.load - quantity).max(0.0);
        self.volume = (self.volume - volume).max(0.0);
    }
}
