// Task-pack protocol
// Runner hands over whole task trees at collection time and batched
// `[id, result, meta]` packs while tests run

use crate::model::{
    ConsoleLog, EntityKind, EntityResult, EntityState, FinishInput, ReportableEntity,
    ReportingMetadata, RunnerError, TaskMode,
};
use crate::report::Reporter;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Suite,
    Test,
    Custom,
}

/// Task as collected by the runner. A file is a suite with a `filepath`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerTask {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(default)]
    pub mode: TaskMode,
    #[serde(default)]
    pub tasks: Vec<RunnerTask>,
    #[serde(default)]
    pub filepath: Option<String>,
}

impl RunnerTask {
    pub fn file(id: impl Into<String>, filepath: impl Into<String>) -> Self {
        let filepath = filepath.into();
        Self {
            id: id.into(),
            name: filepath.clone(),
            task_type: TaskType::Suite,
            mode: TaskMode::Run,
            tasks: Vec::new(),
            filepath: Some(filepath),
        }
    }

    pub fn suite(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            task_type: TaskType::Suite,
            mode: TaskMode::Run,
            tasks: Vec::new(),
            filepath: None,
        }
    }

    pub fn test(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            task_type: TaskType::Test,
            ..Self::suite(id, name)
        }
    }

    pub fn with_mode(mut self, mode: TaskMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_task(mut self, task: RunnerTask) -> Self {
        self.tasks.push(task);
        self
    }

    fn kind(&self, top_level: bool) -> EntityKind {
        match self.task_type {
            TaskType::Suite if top_level && self.filepath.is_some() => EntityKind::Module,
            TaskType::Suite => EntityKind::Suite,
            TaskType::Test | TaskType::Custom => EntityKind::Test,
        }
    }

    fn to_entity(&self, parent_id: Option<&str>) -> ReportableEntity {
        ReportableEntity {
            local_id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind(parent_id.is_none()),
            parent_id: parent_id.map(str::to_string),
            mode: self.mode,
            children: self
                .tasks
                .iter()
                .map(|t| t.to_entity(Some(&self.id)))
                .collect(),
            file_path: self.filepath.clone(),
        }
    }
}

impl From<&RunnerTask> for ReportableEntity {
    fn from(task: &RunnerTask) -> Self {
        task.to_entity(None)
    }
}

/// Result carried in a pack
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskResult {
    pub state: Option<String>,
    pub start_time: Option<f64>,
    pub duration: Option<f64>,
    pub errors: Vec<RunnerError>,
}

impl TaskResult {
    fn to_result(&self) -> EntityResult {
        EntityResult {
            state: self.state.as_deref().map(EntityState::parse),
            start_time: self.start_time,
            duration: self.duration,
            errors: self.errors.clone(),
        }
    }
}

/// `[id, result, meta]` tuple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResultPack(pub String, pub Option<TaskResult>, pub Option<Value>);

impl TaskResultPack {
    pub fn new(id: impl Into<String>, result: Option<TaskResult>, meta: Option<Value>) -> Self {
        Self(id.into(), result, meta)
    }

    /// Finish input for terminal packs; intermediate updates yield `None`
    pub fn to_finish_input(&self) -> Option<FinishInput> {
        let result = self.1.as_ref()?.to_result();
        if !result.state.as_ref().is_some_and(|s| s.is_terminal()) {
            return None;
        }

        let metadata = self.2.as_ref().and_then(ReportingMetadata::from_runner_meta);
        Some(FinishInput::new(self.0.clone(), Some(result)).with_metadata(metadata))
    }
}

/// Adapter for runners speaking the task-pack protocol
pub struct TaskPackAdapter<R> {
    reporter: R,
}

impl<R: Reporter> TaskPackAdapter<R> {
    pub fn new(reporter: R) -> Self {
        Self { reporter }
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn reporter_mut(&mut self) -> &mut R {
        &mut self.reporter
    }

    pub fn into_inner(self) -> R {
        self.reporter
    }

    pub fn on_init(&mut self, root_dir: &str) {
        self.reporter.on_init(root_dir);
    }

    pub fn on_collected(&mut self, files: &[RunnerTask]) {
        let modules: Vec<ReportableEntity> = files.iter().map(ReportableEntity::from).collect();
        self.reporter.on_collected(&modules);
    }

    pub fn on_task_update(&mut self, packs: &[TaskResultPack]) {
        let batch = packs
            .iter()
            .filter_map(TaskResultPack::to_finish_input)
            .collect();
        self.reporter.on_results(batch);
    }

    pub fn on_user_console_log(&mut self, log: ConsoleLog) {
        self.reporter.on_console_log(log);
    }

    pub async fn on_finished(&mut self) {
        self.reporter.on_finished().await;
    }
}
