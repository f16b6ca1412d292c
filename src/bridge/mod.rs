//! Metadata bridge between test code and the reporter.
//!
//! Test bodies attach logs, attributes, a description or a test case id to the
//! entity that is currently executing. The bridge keeps this in its own map keyed
//! by the runner-local id; the runner's objects are never touched. The reporter
//! takes an entity's metadata exactly once, when the entity finishes.
//!
//! Binding is scoped: [`MetadataBridge::bind`] returns a guard that clears the
//! current entity when dropped, including during unwinding.

use crate::model::{Attribute, LogEntry, LogFile, LogLevel, ReportingMetadata};
use crate::time::{Clock, SystemClock};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

#[derive(Default)]
struct BridgeState {
    current: Option<String>,
    entries: HashMap<String, ReportingMetadata>,
}

/// Shared handle; clones see the same state
#[derive(Clone)]
pub struct MetadataBridge {
    state: Arc<Mutex<BridgeState>>,
    clock: Arc<dyn Clock>,
}

impl Default for MetadataBridge {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl MetadataBridge {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(BridgeState::default())),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BridgeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make `local_id` the current entity until the guard is dropped
    pub fn bind(&self, local_id: impl Into<String>) -> BindingGuard {
        let local_id = local_id.into();
        let previous = self.lock().current.replace(local_id.clone());
        if let Some(previous) = previous {
            warn!(
                "Entity {} still bound while binding {}; replacing",
                previous, local_id
            );
        }

        BindingGuard {
            bridge: self.clone(),
            local_id,
        }
    }

    /// Run `body` with `local_id` bound, unbinding on every exit path
    pub fn scope<T>(&self, local_id: impl Into<String>, body: impl FnOnce(&ReportingApi) -> T) -> T {
        let guard = self.bind(local_id);
        body(&guard.api())
    }

    pub fn current(&self) -> Option<String> {
        self.lock().current.clone()
    }

    /// Handle writing to whatever entity is current at call time
    pub fn api(&self) -> ReportingApi {
        ReportingApi {
            bridge: self.clone(),
            target: None,
        }
    }

    /// Handle writing to one explicit entity
    pub fn api_for(&self, local_id: impl Into<String>) -> ReportingApi {
        ReportingApi {
            bridge: self.clone(),
            target: Some(local_id.into()),
        }
    }

    /// Remove and return the entity's metadata
    pub fn take(&self, local_id: &str) -> Option<ReportingMetadata> {
        self.lock().entries.remove(local_id)
    }

    /// Copy of the entity's metadata without consuming it
    pub fn peek(&self, local_id: &str) -> Option<ReportingMetadata> {
        self.lock().entries.get(local_id).cloned()
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.current = None;
        state.entries.clear();
    }

    fn unbind(&self, local_id: &str) {
        let mut state = self.lock();
        if state.current.as_deref() == Some(local_id) {
            state.current = None;
        }
    }

    fn with_metadata(&self, target: Option<&str>, op: &str, f: impl FnOnce(&mut ReportingMetadata)) {
        let mut state = self.lock();
        let Some(local_id) = target.map(str::to_string).or_else(|| state.current.clone()) else {
            warn!("ReportingApi.{} called outside of a test body; ignored", op);
            return;
        };
        f(state.entries.entry(local_id).or_default());
    }
}

/// Releases the current-entity binding on drop
#[must_use = "the entity is unbound as soon as the guard is dropped"]
pub struct BindingGuard {
    bridge: MetadataBridge,
    local_id: String,
}

impl BindingGuard {
    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn api(&self) -> ReportingApi {
        self.bridge.api_for(self.local_id.clone())
    }
}

impl Drop for BindingGuard {
    fn drop(&mut self) {
        self.bridge.unbind(&self.local_id);
    }
}

/// API exposed to test code
#[derive(Clone)]
pub struct ReportingApi {
    bridge: MetadataBridge,
    target: Option<String>,
}

impl ReportingApi {
    /// Attach a file; the log message is the description or the file name
    pub fn attachment(&self, file: LogFile, description: Option<&str>) {
        let time = self.bridge.clock.now_millis();
        self.bridge
            .with_metadata(self.target.as_deref(), "attachment", |meta| {
                let message = description.map_or_else(|| file.name.clone(), str::to_string);
                meta.push_log(LogEntry {
                    message,
                    level: LogLevel::Info,
                    time: Some(time),
                    file: Some(file),
                });
            });
    }

    pub fn attributes(&self, attributes: Vec<Attribute>) {
        self.bridge
            .with_metadata(self.target.as_deref(), "attributes", |meta| {
                meta.add_attributes(attributes)
            });
    }

    pub fn test_case_id(&self, test_case_id: &str) {
        self.bridge
            .with_metadata(self.target.as_deref(), "testCaseId", |meta| {
                meta.set_test_case_id(test_case_id)
            });
    }

    pub fn description(&self, description: &str) {
        self.bridge
            .with_metadata(self.target.as_deref(), "description", |meta| {
                meta.append_description(description)
            });
    }

    pub fn log(&self, message: &str, level: LogLevel) {
        let time = self.bridge.clock.now_millis();
        self.bridge.with_metadata(self.target.as_deref(), "log", |meta| {
            meta.push_log(LogEntry::new(message, level, time))
        });
    }

    pub fn info(&self, message: &str) {
        self.log(message, LogLevel::Info);
    }
}
