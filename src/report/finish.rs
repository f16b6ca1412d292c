// Finish coordinator - one finish request per entity, whatever the runner sends

use super::context::ReportContext;
use crate::model::{
    EntityResult, FinishInput, FinishItemRq, ItemStatus, LogEntry, LogLevel, ReportingMetadata,
    RunnerError,
};
use tracing::debug;

impl ReportContext<'_> {
    /// Finish a batch last-to-first so descendants close before their ancestors
    pub fn finish_batch(&mut self, batch: Vec<FinishInput>) {
        for input in batch.into_iter().rev() {
            self.finish_entity(input);
        }
    }

    pub fn finish_entity(&mut self, input: FinishInput) {
        let FinishInput {
            local_id,
            result,
            metadata,
        } = input;

        // Bridge metadata is one-shot; drop it even if nothing gets sent
        let bridged = self.bridge.take(&local_id);
        let metadata = match (bridged, metadata) {
            (Some(mut bridged), Some(inline)) => {
                debug!("{} has bridge and runner metadata; merging", local_id);
                bridged.merge(inline);
                Some(bridged)
            }
            (bridged, inline) => bridged.or(inline),
        };

        let item_id = match self.registry.lookup(&local_id) {
            Some(item) if !item.finish_sent => item.remote_id.clone(),
            Some(_) => {
                debug!("{} already finished; ignoring result", local_id);
                return;
            }
            None => {
                debug!("{} was never started; ignoring result", local_id);
                return;
            }
        };

        let mut rq = self.finish_request(result.as_ref());

        if let Some(metadata) = metadata {
            self.apply_metadata(&item_id, &mut rq, metadata);
        }

        if let Some(error) = result.as_ref().and_then(|r| r.errors.first()) {
            self.report_error(&item_id, &mut rq, error);
        }

        self.issue_finish(&local_id, &item_id, rq);
    }

    pub(crate) fn finish_request(&self, result: Option<&EntityResult>) -> FinishItemRq {
        let status = ItemStatus::from_state(result.and_then(|r| r.state.as_ref()));
        let end_time = result
            .and_then(EntityResult::end_time)
            .unwrap_or_else(|| self.clock.now_millis());

        FinishItemRq::new(status, end_time)
    }

    fn apply_metadata(&mut self, item_id: &str, rq: &mut FinishItemRq, metadata: ReportingMetadata) {
        let ReportingMetadata {
            logs,
            attributes,
            description,
            test_case_id,
        } = metadata;

        for entry in logs {
            self.send_log(item_id, entry);
        }

        if !attributes.is_empty() {
            rq.attributes = Some(attributes);
        }
        if test_case_id.is_some() {
            rq.test_case_id = test_case_id;
        }
        if let Some(description) = description {
            match &mut rq.description {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(&description);
                }
                None => rq.description = Some(description),
            }
        }
    }

    fn report_error(&mut self, item_id: &str, rq: &mut FinishItemRq, error: &RunnerError) {
        let trace = error.trace();

        if self.config.extend_test_description_with_last_error {
            let mut description = rq.description.take().unwrap_or_default();
            description.push_str(&format!("\n```error\n{}\n```", trace));
            rq.description = Some(description);
        }

        self.send_log(item_id, LogEntry::new(trace, LogLevel::Error, rq.end_time));

        if let Some(diff) = error.diff.as_deref().filter(|d| !d.is_empty()) {
            let message = format!("```diff\n{}\n```", diff);
            self.send_log(item_id, LogEntry::new(message, LogLevel::Error, rq.end_time));
        }
    }
}
