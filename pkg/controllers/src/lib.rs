//! Event-driven scaling engine.
//!
//! A [`ScaledObjectController`](scaledobject::ScaledObjectController) runs one
//! [`ScaleHandler`](scale_handler::ScaleHandler) loop per ScaledObject. Each
//! cycle fans out to the object's scalers, gates activation through a
//! cooldown, computes a replica target and then either publishes it for an
//! HPA (Deployment targets) or creates a bounded batch of Jobs.

pub mod activation;
pub mod aggregator;
pub mod error;
pub mod job;
pub mod replicas;
pub mod resources;
pub mod scale_handler;
pub mod scaledobject;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ScalingError, ScalingResult};
pub use resources::{ResourceManager, StoreResourceManager};
pub use scale_handler::{ScaleDecision, ScaleHandler, ScalingContext};
pub use scaledobject::ScaledObjectController;
