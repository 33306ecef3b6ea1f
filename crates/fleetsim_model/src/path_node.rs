use serde::{Deserialize, Serialize};

use crate::demand::{Demand, DemandIdx};
use crate::location::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopKind {
    Pickup,
    Delivery,
}

/// One leg of a vehicle route: a demand plus whether the stop is at the
/// demand's origin (pickup) or destination (delivery). Every demand
/// contributes exactly one pickup and one delivery node to some route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathNode {
    pub demand: DemandIdx,
    pub kind: StopKind,
}

impl PathNode {
    pub fn pickup(demand: DemandIdx) -> Self {
        PathNode {
            demand,
            kind: StopKind::Pickup,
        }
    }

    pub fn delivery(demand: DemandIdx) -> Self {
        PathNode {
            demand,
            kind: StopKind::Delivery,
        }
    }

    pub fn is_pickup(&self) -> bool {
        self.kind == StopKind::Pickup
    }

    /// The coordinate this node drives the vehicle to.
    pub fn target<'a>(&self, demand: &'a Demand) -> &'a Location {
        match self.kind {
            StopKind::Pickup => demand.origin(),
            StopKind::Delivery => demand.destination(),
        }
    }
}
