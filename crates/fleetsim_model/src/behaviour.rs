use rand::{Rng, rngs::SmallRng};
use tracing::trace;

use crate::{
    demand::DemandIdx,
    location::Location,
    registry::DemandRegistry,
    vehicle::{Vehicle, VehicleState},
};

pub const FREEZE_DURATION_SECS: f64 = 30.0;
pub const HANDLING_TIME_PER_UNIT: f64 = 0.01;

/// Chance that a state change is preempted by a breakdown/parking freeze.
fn freeze_probability(state: VehicleState) -> f64 {
    match state {
        VehicleState::OrderTaken => 0.04,
        VehicleState::Loading => 0.02,
        VehicleState::Transporting => 0.04,
        VehicleState::Unloading => 0.02,
        VehicleState::Available | VehicleState::Freeze => 0.0,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TickReport {
    pub transitioned: bool,
    /// Demand whose delivery completed during this tick, to be marked
    /// fulfilled in the registry by the caller.
    pub fulfilled: Option<DemandIdx>,
}

/// Advances one vehicle by one simulated tick of `dt` seconds.
///
/// The countdown timer decrements first; when it reaches zero a transition
/// fires. A random draw below the state's freeze probability forces
/// `Freeze` instead of the deterministic transition, remembering the
/// pre-freeze state. `Freeze` itself never freezes again: it restores the
/// remembered state and immediately resolves that state's deterministic
/// transition.
pub fn tick(
    vehicle: &mut Vehicle,
    demands: &DemandRegistry,
    rng: &mut SmallRng,
    dt: f64,
) -> TickReport {
    vehicle.state_timer_mut().tick(dt);
    if !vehicle.state_timer().is_elapsed() {
        return TickReport::default();
    }

    let state = vehicle.state();
    if state == VehicleState::Freeze {
        let prior = vehicle.prev_state();
        trace!(vehicle = %vehicle.id(), ?prior, "thawing");
        return TickReport {
            transitioned: true,
            fulfilled: resolve_deterministic(vehicle, demands, prior),
        };
    }

    let p = freeze_probability(state);
    if p > 0.0 && rng.random::<f64>() < p {
        vehicle.set_state(VehicleState::Freeze);
        vehicle.state_timer_mut().set(FREEZE_DURATION_SECS);
        trace!(vehicle = %vehicle.id(), from = ?state, "frozen");
        return TickReport {
            transitioned: true,
            fulfilled: None,
        };
    }

    TickReport {
        transitioned: true,
        fulfilled: resolve_deterministic(vehicle, demands, state),
    }
}

/// The deterministic half of the transition table. Public so the freeze
/// restore path and the tests can resolve a state without a random draw.
pub fn resolve_deterministic(
    vehicle: &mut Vehicle,
    demands: &DemandRegistry,
    state: VehicleState,
) -> Option<DemandIdx> {
    match state {
        VehicleState::Available => {
            if let Some(head) = vehicle.route_head().copied() {
                vehicle.set_current_demand(Some(head.demand));
                vehicle.set_state(VehicleState::OrderTaken);
                vehicle.state_timer_mut().set(0.0);
            }
            None
        }
        VehicleState::OrderTaken => {
            match vehicle.current_demand() {
                Some(demand_idx) => {
                    let demand = demands.get(demand_idx);
                    let origin = *demand.origin();
                    let quantity = demand.quantity();
                    vehicle.set_position(origin);
                    vehicle.set_state(VehicleState::Loading);
                    vehicle
                        .state_timer_mut()
                        .set(HANDLING_TIME_PER_UNIT * quantity);
                }
                // Demand vanished under us, give the route back to dispatch.
                None => {
                    vehicle.set_state(VehicleState::Available);
                    vehicle.state_timer_mut().set(0.0);
                }
            }
            None
        }
        VehicleState::Loading => {
            if let Some(demand_idx) = vehicle.current_demand() {
                let demand = demands.get(demand_idx);
                vehicle.apply_pickup(demand.quantity(), demand.volume());
                vehicle.pop_route_head();
                advance_from_route(vehicle);
            }
            None
        }
        VehicleState::Transporting => {
            if let Some(demand_idx) = vehicle.current_demand() {
                let demand = demands.get(demand_idx);
                let destination = *demand.destination();
                let quantity = demand.quantity();
                vehicle.set_position(destination);
                vehicle.set_state(VehicleState::Unloading);
                vehicle
                    .state_timer_mut()
                    .set(HANDLING_TIME_PER_UNIT * quantity);
            }
            None
        }
        VehicleState::Unloading => {
            let fulfilled = vehicle.current_demand();
            if let Some(demand_idx) = fulfilled {
                let demand = demands.get(demand_idx);
                let (quantity, volume) = (demand.quantity(), demand.volume());
                vehicle.apply_delivery(quantity, volume);
                vehicle.pop_route_head();
                advance_from_route(vehicle);
            }
            fulfilled
        }
        // Freeze is resolved by `tick` via the remembered prior state.
        VehicleState::Freeze => None,
    }
}

/// Picks the next state from the new route head: another pickup means
/// driving to its origin, a delivery means the cargo is already on board.
fn advance_from_route(vehicle: &mut Vehicle) {
    match vehicle.route_head().copied() {
        Some(node) if node.is_pickup() => {
            vehicle.set_current_demand(Some(node.demand));
            vehicle.set_state(VehicleState::OrderTaken);
            vehicle.state_timer_mut().set(0.0);
        }
        Some(node) => {
            vehicle.set_current_demand(Some(node.demand));
            vehicle.set_state(VehicleState::Transporting);
            vehicle.state_timer_mut().set(0.0);
        }
        None => {
            vehicle.set_current_demand(None);
            vehicle.set_state(VehicleState::Available);
            vehicle.state_timer_mut().set(0.0);
        }
    }
}

/// Where the vehicle is headed next, if it is moving at all. Used by the
/// outer movement layer after each commit and tick.
pub fn next_destination(vehicle: &Vehicle, demands: &DemandRegistry) -> Option<Location> {
    match vehicle.state() {
        VehicleState::OrderTaken => vehicle
            .current_demand()
            .map(|idx| *demands.get(idx).origin()),
        VehicleState::Transporting => vehicle
            .current_demand()
            .map(|idx| *demands.get(idx).destination()),
        _ => None,
    }
}
