pub mod config;
pub mod deployment;
pub mod job;
pub mod metrics;
pub mod pod;
pub mod scaledobject;
pub mod validate;
