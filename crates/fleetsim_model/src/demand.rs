use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{define_index_newtype, location::Location};

define_index_newtype!(DemandIdx, Demand);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductType {
    General,
    Wood,
    Steel,
    Pharmaceutical,
}

/// A pickup-delivery transport demand.
///
/// Immutable once created, except for quantity/volume decrements under
/// partial fulfillment and the two lifecycle flags: `assigned` is set
/// exactly once when a scheduling cycle commits the demand onto a route,
/// `fulfilled` when its delivery completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Demand {
    id: Uuid,
    origin: Location,
    destination: Location,
    product_type: ProductType,
    quantity: f64,
    volume: f64,
    assigned: bool,
    fulfilled: bool,
}

impl Demand {
    pub fn new(
        origin: Location,
        destination: Location,
        product_type: ProductType,
        quantity: f64,
        volume: f64,
    ) -> Self {
        Demand {
            id: Uuid::new_v4(),
            origin,
            destination,
            product_type,
            quantity,
            volume,
            assigned: false,
            fulfilled: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn origin(&self) -> &Location {
        &self.origin
    }

    pub fn destination(&self) -> &Location {
        &self.destination
    }

    pub fn product_type(&self) -> ProductType {
        self.product_type
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn is_assigned(&self) -> bool {
        self.assigned
    }

    pub fn is_fulfilled(&self) -> bool {
        self.fulfilled
    }

    pub fn route_length(&self) -> f64 {
        self.origin.haversine_distance(&self.destination)
    }

    pub fn mark_assigned(&mut self) {
        self.assigned = true;
    }

    pub fn mark_fulfilled(&mut self) {
        self.fulfilled = true;
    }

    /// Decrements quantity and volume after a partial fulfillment split.
    pub fn reduce(&mut self, quantity: f64, volume: f64) {
        self.quantity = (self.quantity - quantity).max(0.0);
        self.volume = (self.volume - volume).max(0.0);
    }

    /// Replaces quantity/volume, used when a snapshot chunk is built from
    /// a larger parent demand.
    pub fn with_amounts(mut self, quantity: f64, volume: f64) -> Self {
        self.quantity = quantity;
        self.volume = volume;
        self
    }

    /// Carves a portion of this demand out under a fresh identity, used
    /// when a large shipment is split across several vehicles.
    pub fn split_off(&self, quantity: f64, volume: f64) -> Self {
        let mut child = self.clone().with_amounts(quantity, volume);
        child.id = Uuid::new_v4();
        child
    }
}
