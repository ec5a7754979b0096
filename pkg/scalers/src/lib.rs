//! Scaler capability interface and the registry that builds scalers from
//! trigger specs.
//!
//! A scaler answers one question for one trigger: what is the current metric
//! value, and is the source active? Everything else (aggregation, activation,
//! replica math) lives in `pkg-controllers`.
//!
//! New trigger types are additive: implement [`Scaler`] and register a
//! factory under the type tag.

pub mod error;
pub mod metadata;
pub mod metrics_api;
pub mod queue_depth;
pub mod registry;
pub mod scaler;

pub use error::{ScalerError, ScalerResult};
pub use registry::{ScalerFactory, ScalerRegistry};
pub use scaler::{Scaler, ScalerConfig};
