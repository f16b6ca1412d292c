// Client module - Remote reporting service interface
// The core only issues requests and tracks their completions

pub mod recording;

use crate::model::{FinishItemRq, FinishLaunchRq, LogFile, LogRq, StartItemRq, StartLaunchRq};
use futures::future::BoxFuture;
use std::fmt;
use thiserror::Error;

pub use recording::{ClientCall, RecordingClient};

/// Resolves when the remote call settles; carries nothing but success or failure
pub type Completion = BoxFuture<'static, Result<(), ClientError>>;

/// Result of a "start" call: an id usable right away plus the pending completion
pub struct Started {
    pub temp_id: String,
    pub completion: Completion,
}

impl fmt::Debug for Started {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Started")
            .field("temp_id", &self.temp_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request rejected by reporting service: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Kind of remote call, used to label failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    StartLaunch,
    FinishLaunch,
    StartItem,
    FinishItem,
    SendLog,
}

impl Operation {
    pub fn failure_message(self) -> &'static str {
        match self {
            Self::StartLaunch => "Failed to start launch.",
            Self::FinishLaunch => "Failed to finish launch.",
            Self::StartItem => "Failed to start test item.",
            Self::FinishItem => "Failed to finish test item.",
            Self::SendLog => "Failed to send log.",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StartLaunch => "start launch",
            Self::FinishLaunch => "finish launch",
            Self::StartItem => "start item",
            Self::FinishItem => "finish item",
            Self::SendLog => "send log",
        };
        f.write_str(name)
    }
}

/// Remote reporting client.
///
/// Every method returns immediately. Start calls hand back a provisional id that
/// may be used as a parent or log target before the remote side has confirmed it.
pub trait ReportingClient: Send + Sync {
    fn start_launch(&self, rq: StartLaunchRq) -> Started;

    fn finish_launch(&self, launch_id: &str, rq: FinishLaunchRq) -> Completion;

    fn start_item(&self, rq: StartItemRq, launch_id: &str, parent_id: Option<&str>) -> Started;

    fn finish_item(&self, item_id: &str, rq: FinishItemRq) -> Completion;

    fn send_log(&self, item_id: &str, rq: LogRq, file: Option<LogFile>) -> Completion;
}
