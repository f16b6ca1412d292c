// Test-case protocol
// Runner reports rich per-entity objects: one module tree at collection,
// then one callback per finished test case, suite and module

use crate::bridge::BindingGuard;
use crate::model::{
    ConsoleLog, EntityKind, EntityResult, EntityState, FinishInput, ReportableEntity,
    ReportingMetadata, RunnerError, TaskMode,
};
use crate::report::Reporter;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Module,
    Suite,
    Test,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub start_time: Option<f64>,
    pub duration: Option<f64>,
}

/// Test module, suite or case as the runner describes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub mode: TaskMode,
    /// Source file of a module
    #[serde(default)]
    pub module_id: Option<String>,
    #[serde(default)]
    pub children: Vec<TestNode>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub errors: Vec<RunnerError>,
    #[serde(default)]
    pub diagnostic: Option<Diagnostic>,
    #[serde(default)]
    pub meta: Option<Value>,
}

impl TestNode {
    fn new(id: impl Into<String>, name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            node_type,
            mode: TaskMode::Run,
            module_id: None,
            children: Vec::new(),
            state: None,
            errors: Vec::new(),
            diagnostic: None,
            meta: None,
        }
    }

    pub fn module(id: impl Into<String>, module_id: impl Into<String>) -> Self {
        let module_id = module_id.into();
        let mut node = Self::new(id, module_id.clone(), NodeType::Module);
        node.module_id = Some(module_id);
        node
    }

    pub fn suite(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, NodeType::Suite)
    }

    pub fn test(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, NodeType::Test)
    }

    pub fn with_child(mut self, child: TestNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_mode(mut self, mode: TaskMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_diagnostic(mut self, start_time: f64, duration: f64) -> Self {
        self.diagnostic = Some(Diagnostic {
            start_time: Some(start_time),
            duration: Some(duration),
        });
        self
    }

    pub fn with_error(mut self, error: RunnerError) -> Self {
        self.errors.push(error);
        self
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    fn kind(&self) -> EntityKind {
        match self.node_type {
            NodeType::Module => EntityKind::Module,
            NodeType::Suite => EntityKind::Suite,
            NodeType::Test => EntityKind::Test,
        }
    }

    fn to_entity(&self, parent_id: Option<&str>) -> ReportableEntity {
        ReportableEntity {
            local_id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind(),
            parent_id: parent_id.map(str::to_string),
            mode: self.mode,
            children: self
                .children
                .iter()
                .map(|c| c.to_entity(Some(&self.id)))
                .collect(),
            file_path: self.module_id.clone(),
        }
    }

    pub fn to_finish_input(&self) -> FinishInput {
        let diagnostic = self.diagnostic.unwrap_or_default();
        let result = EntityResult {
            state: self.state.as_deref().map(EntityState::parse),
            start_time: diagnostic.start_time,
            duration: diagnostic.duration,
            errors: self.errors.clone(),
        };
        let metadata = self.meta.as_ref().and_then(ReportingMetadata::from_runner_meta);

        FinishInput::new(self.id.clone(), Some(result)).with_metadata(metadata)
    }
}

impl From<&TestNode> for ReportableEntity {
    fn from(node: &TestNode) -> Self {
        node.to_entity(None)
    }
}

/// Adapter for runners speaking the test-case protocol.
///
/// Binds the metadata bridge between `on_test_case_ready` and the matching
/// `on_test_case_result`.
pub struct TestCaseAdapter<R> {
    reporter: R,
    binding: Option<BindingGuard>,
}

impl<R: Reporter> TestCaseAdapter<R> {
    pub fn new(reporter: R) -> Self {
        Self {
            reporter,
            binding: None,
        }
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn reporter_mut(&mut self) -> &mut R {
        &mut self.reporter
    }

    pub fn into_inner(mut self) -> R {
        self.binding.take();
        self.reporter
    }

    pub fn on_init(&mut self, root_dir: &str) {
        self.reporter.on_init(root_dir);
    }

    pub fn on_test_module_collected(&mut self, module: &TestNode) {
        self.reporter.on_collected(&[ReportableEntity::from(module)]);
    }

    pub fn on_test_case_ready(&mut self, test: &TestNode) {
        self.binding.take();
        self.binding = Some(self.reporter.bridge().bind(test.id.clone()));
    }

    pub fn on_test_case_result(&mut self, test: &TestNode) {
        if self
            .binding
            .as_ref()
            .is_some_and(|b| b.local_id() == test.id)
        {
            self.binding.take();
        }
        self.reporter.on_results(vec![test.to_finish_input()]);
    }

    pub fn on_test_suite_result(&mut self, suite: &TestNode) {
        self.reporter.on_results(vec![suite.to_finish_input()]);
    }

    pub fn on_test_module_end(&mut self, module: &TestNode) {
        self.reporter.on_results(vec![module.to_finish_input()]);
    }

    pub fn on_user_console_log(&mut self, log: ConsoleLog) {
        self.reporter.on_console_log(log);
    }

    pub async fn on_test_run_end(&mut self) {
        self.binding.take();
        self.reporter.on_finished().await;
    }
}
