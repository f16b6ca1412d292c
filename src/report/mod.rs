// Report module - Runner lifecycle to remote reporting calls

mod context;

pub mod console;
pub mod finish;
pub mod launch;
pub mod reporter;
pub mod walker;

use crate::bridge::MetadataBridge;
use crate::model::{ConsoleLog, FinishInput, ReportableEntity};

pub use console::is_error_log;
pub use launch::system_attributes;
pub use reporter::RpReporter;

/// Runner lifecycle as seen by the core.
///
/// Protocol adapters translate their runner's callbacks into these calls, so the
/// same reporter serves runners with very different callback shapes.
#[allow(async_fn_in_trait)]
pub trait Reporter {
    /// Called once when the run starts
    fn on_init(&mut self, root_dir: &str);

    /// Called with the collected tree of each top-level module
    fn on_collected(&mut self, modules: &[ReportableEntity]);

    /// Called with one batch of finish notifications, in delivery order
    fn on_results(&mut self, batch: Vec<FinishInput>);

    /// Called for console output captured by the runner
    fn on_console_log(&mut self, log: ConsoleLog);

    /// Called when the run ends; resolves once every remote call has settled
    async fn on_finished(&mut self);

    /// Metadata bridge test code writes through
    fn bridge(&self) -> &MetadataBridge;
}

impl<R: Reporter> Reporter for &mut R {
    fn on_init(&mut self, root_dir: &str) {
        (**self).on_init(root_dir);
    }

    fn on_collected(&mut self, modules: &[ReportableEntity]) {
        (**self).on_collected(modules);
    }

    fn on_results(&mut self, batch: Vec<FinishInput>) {
        (**self).on_results(batch);
    }

    fn on_console_log(&mut self, log: ConsoleLog) {
        (**self).on_console_log(log);
    }

    async fn on_finished(&mut self) {
        (**self).on_finished().await;
    }

    fn bridge(&self) -> &MetadataBridge {
        (**self).bridge()
    }
}
