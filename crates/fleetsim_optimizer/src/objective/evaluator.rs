use crate::{
    objective::vector::{ObjectiveKind, ObjectiveVector},
    problem::{DemandChunk, DispatchProblem, OptimizerParams, PlanRoute, PlanStop, VehicleSeed},
};

const EMPTY_LOAD_EPSILON: f64 = 1e-6;

/// Scores a candidate route by replaying it against a private copy of the
/// vehicle's position and load. Never touches live state.
#[derive(Debug, Clone)]
pub struct RouteEvaluator {
    handling_time_per_unit: f64,
    carbon_emission_factor: f64,
}

impl Default for RouteEvaluator {
    fn default() -> Self {
        let params = OptimizerParams::default();
        Self::new(&params)
    }
}

impl RouteEvaluator {
    pub fn new(params: &OptimizerParams) -> Self {
        Self {
            handling_time_per_unit: params.handling_time_per_unit,
            carbon_emission_factor: params.carbon_emission_factor,
        }
    }

    /// The 5-dimensional objective vector of one vehicle executing `route`
    /// from its snapshotted position and load.
    pub fn route_vector(
        &self,
        seed: &VehicleSeed,
        route: &[PlanStop],
        chunks: &[DemandChunk],
    ) -> ObjectiveVector {
        let mut vector = ObjectiveVector::zero();
        let mut position = seed.position;
        let mut load = seed.load;

        for stop in route {
            let chunk = &chunks[stop.chunk.get()];
            let target = if stop.is_pickup() {
                chunk.origin
            } else {
                chunk.destination
            };
            let leg = position.haversine_distance(&target);

            vector.accumulate(
                ObjectiveKind::WaitingTime,
                chunk.quantity * self.handling_time_per_unit,
            );
            if load <= EMPTY_LOAD_EPSILON {
                vector.accumulate(ObjectiveKind::EmptyDistance, leg);
            }
            vector.accumulate(ObjectiveKind::LoadWaste, (seed.max_load - load) * leg);
            vector.accumulate(
                ObjectiveKind::CarbonEmission,
                load * leg * self.carbon_emission_factor,
            );

            if stop.is_pickup() {
                load = (load + chunk.quantity).min(seed.max_load);
            } else {
                load = (load - chunk.quantity).max(0.0);
                vector.accumulate(ObjectiveKind::DeliveredTonnage, chunk.quantity);
            }
            position = target;
        }

        vector
    }

    pub fn route_scalar(
        &self,
        kind: ObjectiveKind,
        seed: &VehicleSeed,
        route: &[PlanStop],
        chunks: &[DemandChunk],
    ) -> f64 {
        self.route_vector(seed, route, chunks).get(kind)
    }

    /// Sums route vectors across every vehicle of a solution.
    pub fn solution_vector(
        &self,
        routes: &[PlanRoute],
        problem: &DispatchProblem,
    ) -> ObjectiveVector {
        let mut total = ObjectiveVector::zero();
        for (seed, route) in problem.vehicles.iter().zip(routes) {
            total += self.route_vector(seed, route, &problem.chunks);
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{ChunkIdx, PlanRoute};
    use crate::test_utils::{seed_at, simple_chunk};
    use fleetsim_model::location::Location;

    #[test]
    fn test_pickup_then_delivery_scenario() {
        // maxLoad=100, one pickup of 40 then its delivery, handling 0.01
        let seed = seed_at(100.0, 50.0, Location::from_lat_lon(48.85, 2.35));
        let chunks = vec![simple_chunk(40.0, 10.0)];
        let route: PlanRoute = [
            PlanStop::pickup(ChunkIdx::new(0)),
            PlanStop::delivery(ChunkIdx::new(0)),
        ]
        .into_iter()
        .collect();

        let evaluator = RouteEvaluator::default();
        let vector = evaluator.route_vector(&seed, &route, &chunks);

        assert!((vector.get(ObjectiveKind::WaitingTime) - 0.8).abs() < 1e-12);
        assert_eq!(vector.get(ObjectiveKind::DeliveredTonnage), 40.0);
    }

    #[test]
    fn test_empty_distance_counted_only_while_unloaded() {
        let seed = seed_at(100.0, 50.0, Location::from_lat_lon(48.0, 2.0));
        let chunks = vec![simple_chunk(40.0, 10.0)];
        let route: PlanRoute = [
            PlanStop::pickup(ChunkIdx::new(0)),
            PlanStop::delivery(ChunkIdx::new(0)),
        ]
        .into_iter()
        .collect();

        let evaluator = RouteEvaluator::default();
        let vector = evaluator.route_vector(&seed, &route, &chunks);

        // empty only on the approach leg to the pickup
        let approach = seed.position.haversine_distance(&chunks[0].origin);
        assert!((vector.get(ObjectiveKind::EmptyDistance) - approach).abs() < 1e-6);

        let laden = chunks[0].origin.haversine_distance(&chunks[0].destination);
        let expected_carbon = 40.0 * laden * 0.0002;
        assert!((vector.get(ObjectiveKind::CarbonEmission) - expected_carbon).abs() < 1e-6);
    }

    #[test]
    fn test_load_waste_accounts_idle_capacity() {
        let seed = seed_at(100.0, 50.0, Location::from_lat_lon(48.0, 2.0));
        let chunks = vec![simple_chunk(40.0, 10.0)];
        let route: PlanRoute = [
            PlanStop::pickup(ChunkIdx::new(0)),
            PlanStop::delivery(ChunkIdx::new(0)),
        ]
        .into_iter()
        .collect();

        let evaluator = RouteEvaluator::default();
        let vector = evaluator.route_vector(&seed, &route, &chunks);

        let approach = seed.position.haversine_distance(&chunks[0].origin);
        let laden = chunks[0].origin.haversine_distance(&chunks[0].destination);
        let expected = 100.0 * approach + 60.0 * laden;
        assert!((vector.get(ObjectiveKind::LoadWaste) - expected).abs() < 1e-3);
    }
}
