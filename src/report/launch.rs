// Launch lifecycle - open the launch, await every outstanding call, close it

use super::context::ReportContext;
use crate::client::{Operation, Started};
use crate::model::{Attribute, FinishLaunchRq, StartLaunchRq};
use tracing::{debug, info, warn};

pub const AGENT_NAME: &str = env!("CARGO_PKG_NAME");
pub const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Attributes the reporter adds to every launch
pub fn system_attributes(skipped_issue: Option<bool>) -> Vec<Attribute> {
    let mut attributes = vec![Attribute::system(
        "agent",
        format!("{}|{}", AGENT_NAME, AGENT_VERSION),
    )];

    // Only an explicit opt-out is reported
    if skipped_issue == Some(false) {
        attributes.push(Attribute::system("skippedIssue", "false"));
    }

    attributes
}

impl ReportContext<'_> {
    pub fn start_launch(&mut self) {
        if let Some(launch_id) = self.launch.launch_id() {
            warn!("Launch {} already started; ignoring second start", launch_id);
            return;
        }

        let config = self.config;
        let attributes = config
            .attributes
            .iter()
            .cloned()
            .chain(system_attributes(config.skipped_issue))
            .collect();

        let rq = StartLaunchRq {
            name: config.launch.clone(),
            start_time: self.clock.now_millis(),
            description: config.description.clone(),
            attributes,
            rerun: config.rerun,
            rerun_of: config.rerun_of.clone(),
            mode: config.mode,
            id: config.launch_id.clone(),
        };

        let Started {
            temp_id,
            completion,
        } = self.client.start_launch(rq);
        self.launch.track(Operation::StartLaunch, completion);
        info!("Launch {} started", temp_id);
        self.launch.set_launch(temp_id, config.launch_id.is_some());
    }

    /// Barrier at run end. Every tracked call settles before the launch is
    /// finished, and all per-run state is dropped afterwards.
    pub async fn finish_launch(&mut self) {
        self.launch.operations.wait_all().await;

        if let Some(launch_id) = self.launch.launch_id().map(str::to_string) {
            if self.launch.is_external() {
                debug!("Launch {} is owned externally; leaving it open", launch_id);
            } else {
                let rq = FinishLaunchRq {
                    end_time: self.clock.now_millis(),
                };
                let completion = self.client.finish_launch(&launch_id, rq);
                self.launch.track(Operation::FinishLaunch, completion);
                self.launch.operations.wait_all().await;
                info!("Launch {} finished", launch_id);
            }
        }

        self.registry.clear();
        self.bridge.clear();
        self.launch.clear();
    }
}
