// State module - Per-run reporting state
// Identifier registry and launch state live here; both are cleared at run end

pub mod launch;
pub mod registry;

pub use launch::{LaunchState, OperationTracker};
pub use registry::{ItemRegistry, TrackedItem};
