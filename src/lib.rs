pub mod bridge;
pub mod client;
pub mod config;
pub mod logging;
pub mod model;
pub mod protocol;
pub mod report;
pub mod state;
pub mod time;
pub mod utils;

pub use bridge::{MetadataBridge, ReportingApi};
pub use client::{RecordingClient, ReportingClient};
pub use config::ReporterConfig;
pub use report::{Reporter, RpReporter};
