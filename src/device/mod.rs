// src/device/mod.rs

pub mod context;
pub mod controller;
pub mod plan;
pub mod state;

pub use context::DeviceContext;
pub use controller::{Controller, CycleReport};
pub use plan::{PollPlan, SensorRead};
pub use state::{Cadence, CollectionTimestamps, Due, ErrorTally};
