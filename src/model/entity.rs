// Runner entity model
// Every runner protocol is translated into these types before reaching the core

use super::metadata::ReportingMetadata;
use super::request::{ItemStatus, ItemType};
use serde::{Deserialize, Serialize};

/// Kind of reportable entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Module,
    Suite,
    Test,
}

impl EntityKind {
    pub fn is_container(self) -> bool {
        matches!(self, Self::Module | Self::Suite)
    }

    /// Remote item type: containers are suites, leaves are steps
    pub fn item_type(self) -> ItemType {
        if self.is_container() {
            ItemType::Suite
        } else {
            ItemType::Step
        }
    }
}

/// Run mode declared by the runner at collection time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskMode {
    #[default]
    Run,
    Skip,
    Todo,
    Only,
}

impl TaskMode {
    /// Entities excluded before the run starts; they never get a result
    pub fn is_static_skip(self) -> bool {
        matches!(self, Self::Skip | Self::Todo)
    }
}

/// Runner-reported state of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityState {
    Passed,
    Failed,
    Skipped,
    Pending,
    Queued,
    Running,
    Unknown(String),
}

impl EntityState {
    pub fn parse(s: &str) -> Self {
        match s {
            "pass" | "passed" => Self::Passed,
            "fail" | "failed" => Self::Failed,
            "skip" | "skipped" | "todo" => Self::Skipped,
            "pending" => Self::Pending,
            "queued" => Self::Queued,
            "run" | "running" => Self::Running,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// States after which the runner will not update the entity again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::Skipped)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Pending => "pending",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Unknown(s) => s,
        }
    }
}

impl From<String> for EntityState {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<EntityState> for String {
    fn from(value: EntityState) -> Self {
        value.as_str().to_string()
    }
}

impl ItemStatus {
    /// Map a runner state to the reported status. Anything unrecognised fails closed.
    pub fn from_state(state: Option<&EntityState>) -> Self {
        match state {
            Some(EntityState::Passed) => Self::Passed,
            Some(EntityState::Failed) => Self::Failed,
            Some(EntityState::Skipped | EntityState::Pending | EntityState::Queued) => {
                Self::Skipped
            }
            _ => Self::Failed,
        }
    }
}

/// Error attached to a runner result
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunnerError {
    pub message: String,
    pub stack: Option<String>,
    pub diff: Option<String>,
}

impl RunnerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_diff(mut self, diff: impl Into<String>) -> Self {
        self.diff = Some(diff.into());
        self
    }

    /// Stack when available, message otherwise
    pub fn trace(&self) -> &str {
        match &self.stack {
            Some(stack) if !stack.is_empty() => stack,
            _ => &self.message,
        }
    }
}

/// Result delivered by the runner for one entity
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EntityResult {
    pub state: Option<EntityState>,
    pub start_time: Option<f64>,
    pub duration: Option<f64>,
    pub errors: Vec<RunnerError>,
}

impl EntityResult {
    pub fn new(state: EntityState) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }

    pub fn with_timing(mut self, start_time: f64, duration: f64) -> Self {
        self.start_time = Some(start_time);
        self.duration = Some(duration);
        self
    }

    pub fn with_error(mut self, error: RunnerError) -> Self {
        self.errors.push(error);
        self
    }

    /// End time from the runner's own timing, in whole milliseconds.
    /// `None` when the timing is missing, not finite or out of range.
    pub fn end_time(&self) -> Option<i64> {
        match (self.start_time, self.duration) {
            (Some(start), Some(duration)) if start.is_finite() && duration.is_finite() => {
                (start.round() as i64).checked_add(duration.round() as i64)
            }
            _ => None,
        }
    }
}

/// Node of the collected entity tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportableEntity {
    pub local_id: String,
    pub name: String,
    pub kind: EntityKind,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub mode: TaskMode,
    #[serde(default)]
    pub children: Vec<ReportableEntity>,
    /// Source file, set on modules
    #[serde(default)]
    pub file_path: Option<String>,
}

impl ReportableEntity {
    fn new(local_id: impl Into<String>, name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            local_id: local_id.into(),
            name: name.into(),
            kind,
            parent_id: None,
            mode: TaskMode::Run,
            children: Vec::new(),
            file_path: None,
        }
    }

    pub fn module(local_id: impl Into<String>, file_path: impl Into<String>) -> Self {
        let file_path = file_path.into();
        let mut module = Self::new(local_id, file_path.clone(), EntityKind::Module);
        module.file_path = Some(file_path);
        module
    }

    pub fn suite(local_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(local_id, name, EntityKind::Suite)
    }

    pub fn test(local_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(local_id, name, EntityKind::Test)
    }

    pub fn with_mode(mut self, mode: TaskMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_child(mut self, mut child: ReportableEntity) -> Self {
        child.parent_id = Some(self.local_id.clone());
        self.children.push(child);
        self
    }
}

/// One finish notification for one entity
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FinishInput {
    pub local_id: String,
    pub result: Option<EntityResult>,
    /// Metadata delivered by the runner itself rather than through the bridge
    pub metadata: Option<ReportingMetadata>,
}

impl FinishInput {
    pub fn new(local_id: impl Into<String>, result: Option<EntityResult>) -> Self {
        Self {
            local_id: local_id.into(),
            result,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Option<ReportingMetadata>) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    #[default]
    Stdout,
    Stderr,
}

/// Console output captured by the runner
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleLog {
    pub content: String,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default, rename = "type")]
    pub stream: StreamKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_is_total() {
        let cases = [
            (Some(EntityState::Passed), ItemStatus::Passed),
            (Some(EntityState::Failed), ItemStatus::Failed),
            (Some(EntityState::Skipped), ItemStatus::Skipped),
            (Some(EntityState::Pending), ItemStatus::Skipped),
            (Some(EntityState::Queued), ItemStatus::Skipped),
            (Some(EntityState::Running), ItemStatus::Failed),
            (Some(EntityState::parse("bogus")), ItemStatus::Failed),
            (None, ItemStatus::Failed),
        ];

        for (state, expected) in cases {
            assert_eq!(ItemStatus::from_state(state.as_ref()), expected, "{:?}", state);
        }
    }

    #[test]
    fn test_state_parse_short_and_long_forms() {
        assert_eq!(EntityState::parse("pass"), EntityState::Passed);
        assert_eq!(EntityState::parse("failed"), EntityState::Failed);
        assert_eq!(EntityState::parse("skip"), EntityState::Skipped);
        assert_eq!(EntityState::parse("run"), EntityState::Running);
        assert!(!EntityState::parse("queued").is_terminal());
        assert!(EntityState::parse("fail").is_terminal());
    }

    #[test]
    fn test_end_time_rounds_duration() {
        let result = EntityResult::new(EntityState::Passed).with_timing(1000.0, 25.6);
        assert_eq!(result.end_time(), Some(1026));
    }

    #[test]
    fn test_end_time_out_of_range() {
        let result = EntityResult::new(EntityState::Passed).with_timing(9.0e18, 9.0e18);
        assert_eq!(result.end_time(), None);

        let result = EntityResult::new(EntityState::Passed).with_timing(-9.0e18, -9.0e18);
        assert_eq!(result.end_time(), None);
    }

    #[test]
    fn test_end_time_requires_finite_timing() {
        let result = EntityResult::new(EntityState::Passed).with_timing(1000.0, f64::NAN);
        assert_eq!(result.end_time(), None);

        let result = EntityResult::new(EntityState::Passed);
        assert_eq!(result.end_time(), None);
    }

    #[test]
    fn test_runner_error_trace_prefers_stack() {
        let error = RunnerError::new("boom").with_stack("Error: boom\n    at test.rs:1");
        assert!(error.trace().starts_with("Error: boom\n"));
        assert_eq!(RunnerError::new("boom").trace(), "boom");
    }

    #[test]
    fn test_with_child_sets_parent() {
        let suite = ReportableEntity::suite("s", "S").with_child(ReportableEntity::test("t", "T"));
        assert_eq!(suite.children[0].parent_id.as_deref(), Some("s"));
        assert!(EntityKind::Suite.is_container());
        assert_eq!(EntityKind::Test.item_type(), ItemType::Step);
    }
}
