// Recording client - dry-run client that keeps every call in issuance order

use super::{ClientError, Completion, Operation, ReportingClient, Started};
use crate::model::{FinishItemRq, FinishLaunchRq, LogFile, LogRq, StartItemRq, StartLaunchRq};
use futures::FutureExt;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

/// A call as it was issued to the client
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCall {
    StartLaunch {
        temp_id: String,
        rq: StartLaunchRq,
    },
    FinishLaunch {
        launch_id: String,
        rq: FinishLaunchRq,
    },
    StartItem {
        temp_id: String,
        rq: StartItemRq,
        launch_id: String,
        parent_id: Option<String>,
    },
    FinishItem {
        item_id: String,
        rq: FinishItemRq,
    },
    SendLog {
        item_id: String,
        rq: LogRq,
        file: Option<LogFile>,
    },
}

impl ClientCall {
    pub fn operation(&self) -> Operation {
        match self {
            Self::StartLaunch { .. } => Operation::StartLaunch,
            Self::FinishLaunch { .. } => Operation::FinishLaunch,
            Self::StartItem { .. } => Operation::StartItem,
            Self::FinishItem { .. } => Operation::FinishItem,
            Self::SendLog { .. } => Operation::SendLog,
        }
    }
}

#[derive(Default)]
struct Inner {
    calls: Vec<ClientCall>,
    failing: HashSet<Operation>,
}

/// Client that answers every call locally.
///
/// Cloning shares the same call log, so a test can keep a handle while the
/// reporter owns another.
#[derive(Clone, Default)]
pub struct RecordingClient {
    inner: Arc<Mutex<Inner>>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future call of `operation` resolve with an error
    pub fn fail_on(&self, operation: Operation) {
        self.lock().failing.insert(operation);
    }

    pub fn calls(&self) -> Vec<ClientCall> {
        self.lock().calls.clone()
    }

    pub fn count(&self, operation: Operation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    pub fn started_items(&self) -> Vec<(String, StartItemRq, Option<String>)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                ClientCall::StartItem {
                    temp_id,
                    rq,
                    parent_id,
                    ..
                } => Some((temp_id.clone(), rq.clone(), parent_id.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn finished_items(&self) -> Vec<(String, FinishItemRq)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                ClientCall::FinishItem { item_id, rq } => Some((item_id.clone(), rq.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn logs(&self) -> Vec<(String, LogRq, Option<LogFile>)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                ClientCall::SendLog { item_id, rq, file } => {
                    Some((item_id.clone(), rq.clone(), file.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Temp id handed out for the item started under `name`
    pub fn item_id(&self, name: &str) -> Option<String> {
        self.started_items()
            .into_iter()
            .find(|(_, rq, _)| rq.name == name)
            .map(|(id, _, _)| id)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: ClientCall) -> Completion {
        let operation = call.operation();
        debug!("{} issued", operation);

        let mut inner = self.lock();
        let fails = inner.failing.contains(&operation);
        inner.calls.push(call);
        drop(inner);

        async move {
            if fails {
                Err(ClientError::Rejected(format!("{} refused", operation)))
            } else {
                Ok(())
            }
        }
        .boxed()
    }
}

impl ReportingClient for RecordingClient {
    fn start_launch(&self, rq: StartLaunchRq) -> Started {
        let temp_id = Uuid::new_v4().to_string();
        let completion = self.record(ClientCall::StartLaunch {
            temp_id: temp_id.clone(),
            rq,
        });
        Started {
            temp_id,
            completion,
        }
    }

    fn finish_launch(&self, launch_id: &str, rq: FinishLaunchRq) -> Completion {
        self.record(ClientCall::FinishLaunch {
            launch_id: launch_id.to_string(),
            rq,
        })
    }

    fn start_item(&self, rq: StartItemRq, launch_id: &str, parent_id: Option<&str>) -> Started {
        let temp_id = Uuid::new_v4().to_string();
        let completion = self.record(ClientCall::StartItem {
            temp_id: temp_id.clone(),
            rq,
            launch_id: launch_id.to_string(),
            parent_id: parent_id.map(str::to_string),
        });
        Started {
            temp_id,
            completion,
        }
    }

    fn finish_item(&self, item_id: &str, rq: FinishItemRq) -> Completion {
        self.record(ClientCall::FinishItem {
            item_id: item_id.to_string(),
            rq,
        })
    }

    fn send_log(&self, item_id: &str, rq: LogRq, file: Option<LogFile>) -> Completion {
        self.record(ClientCall::SendLog {
            item_id: item_id.to_string(),
            rq,
            file,
        })
    }
}
