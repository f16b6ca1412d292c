// Model module - Runner entities, remote request records and reporting metadata

pub mod entity;
pub mod metadata;
pub mod request;

pub use entity::{
    ConsoleLog, EntityKind, EntityResult, EntityState, FinishInput, ReportableEntity, RunnerError,
    StreamKind, TaskMode,
};
pub use metadata::{LogEntry, ReportingMetadata};
pub use request::{
    Attribute, FinishItemRq, FinishLaunchRq, ItemStatus, ItemType, LaunchMode, LogFile, LogLevel,
    LogRq, StartItemRq, StartLaunchRq,
};
