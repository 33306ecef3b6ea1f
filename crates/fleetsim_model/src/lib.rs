pub mod behaviour;
pub mod config;
pub mod demand;
pub mod location;
pub mod path_node;
pub mod registry;
pub mod timer;
pub mod vehicle;

mod newtype_index;
