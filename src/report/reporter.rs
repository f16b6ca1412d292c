// Remote reporter - runner lifecycle mirrored into launch/item/log calls

use super::Reporter;
use super::context::ReportContext;
use crate::bridge::MetadataBridge;
use crate::client::ReportingClient;
use crate::config::ReporterConfig;
use crate::model::{ConsoleLog, FinishInput, ReportableEntity};
use crate::state::{ItemRegistry, LaunchState};
use crate::time::{Clock, SystemClock};
use crate::utils::PathUtils;
use std::sync::Arc;

/// Reporter driving a [`ReportingClient`].
///
/// Every callback returns without waiting on the remote side. Completions are
/// tracked and awaited together in [`Reporter::on_finished`].
pub struct RpReporter {
    config: ReporterConfig,
    client: Arc<dyn ReportingClient>,
    clock: Arc<dyn Clock>,
    bridge: MetadataBridge,
    launch: LaunchState,
    registry: ItemRegistry,
    root_dir: String,
}

impl RpReporter {
    pub fn new(config: ReporterConfig, client: Arc<dyn ReportingClient>) -> Self {
        Self::with_clock(config, client, Arc::new(SystemClock))
    }

    /// `RP_LAUNCH_ID` from the environment takes precedence over `config.launch_id`
    pub fn with_clock(
        config: ReporterConfig,
        client: Arc<dyn ReportingClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config: config.with_env_overrides(),
            client,
            bridge: MetadataBridge::new(Arc::clone(&clock)),
            clock,
            launch: LaunchState::new(),
            registry: ItemRegistry::new(),
            root_dir: String::new(),
        }
    }

    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }

    pub fn registry(&self) -> &ItemRegistry {
        &self.registry
    }

    pub fn launch_id(&self) -> Option<&str> {
        self.launch.launch_id()
    }

    /// Remote calls tracked and not yet awaited
    pub fn pending_operations(&self) -> usize {
        self.launch.operations.len()
    }

    /// Finish one entity directly, outside of a batch
    pub fn finish_entity(&mut self, input: FinishInput) {
        self.context().finish_entity(input);
    }

    fn context(&mut self) -> ReportContext<'_> {
        ReportContext {
            client: self.client.as_ref(),
            clock: self.clock.as_ref(),
            config: &self.config,
            bridge: &self.bridge,
            launch: &mut self.launch,
            registry: &mut self.registry,
        }
    }
}

impl Reporter for RpReporter {
    fn on_init(&mut self, root_dir: &str) {
        self.root_dir = root_dir.to_string();
        self.context().start_launch();
    }

    fn on_collected(&mut self, modules: &[ReportableEntity]) {
        let root_dir = self.root_dir.clone();
        let mut ctx = self.context();

        for module in modules {
            let file_path = module.file_path.as_deref().unwrap_or(&module.name);
            let base_path = PathUtils::base_path(file_path, &root_dir);
            ctx.start_entity(module, &base_path, None);
        }
    }

    fn on_results(&mut self, batch: Vec<FinishInput>) {
        self.context().finish_batch(batch);
    }

    fn on_console_log(&mut self, log: ConsoleLog) {
        self.context().route_console_log(log);
    }

    async fn on_finished(&mut self) {
        self.context().finish_launch().await;
        self.root_dir.clear();
    }

    fn bridge(&self) -> &MetadataBridge {
        &self.bridge
    }
}
