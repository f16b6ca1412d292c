// Borrowed view of the reporter state shared by the walker, coordinator and launch code

use crate::bridge::MetadataBridge;
use crate::client::{Operation, ReportingClient};
use crate::config::ReporterConfig;
use crate::model::{FinishItemRq, LogEntry, LogRq};
use crate::state::{ItemRegistry, LaunchState};
use crate::time::Clock;
use tracing::debug;

pub(crate) struct ReportContext<'a> {
    pub client: &'a dyn ReportingClient,
    pub clock: &'a dyn Clock,
    pub config: &'a ReporterConfig,
    pub bridge: &'a MetadataBridge,
    pub launch: &'a mut LaunchState,
    pub registry: &'a mut ItemRegistry,
}

impl ReportContext<'_> {
    pub fn send_log(&mut self, item_id: &str, entry: LogEntry) {
        let LogEntry {
            message,
            level,
            time,
            file,
        } = entry;
        let rq = LogRq {
            level,
            time: time.unwrap_or_else(|| self.clock.now_millis()),
            message,
        };

        let completion = self.client.send_log(item_id, rq, file);
        self.launch.track(Operation::SendLog, completion);
    }

    /// Issue the finish call and mark the item; issuance, not completion, counts as finished
    pub fn issue_finish(&mut self, local_id: &str, item_id: &str, rq: FinishItemRq) {
        debug!("Finishing {} as {:?}", local_id, rq.status);

        let completion = self.client.finish_item(item_id, rq.clone());
        self.launch.track(Operation::FinishItem, completion);
        self.registry.mark_finished(local_id);
        self.registry.cache_finish(local_id, &rq);
    }
}
