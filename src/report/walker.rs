// Hierarchy walker - starts remote items top-down over the collected tree

use super::context::ReportContext;
use crate::client::{Operation, Started};
use crate::model::{Attribute, FinishItemRq, ItemStatus, ReportableEntity, StartItemRq, TaskMode};
use crate::utils::PathUtils;
use tracing::{debug, warn};

impl ReportContext<'_> {
    /// Start `entity` and, for containers, its children in declared order.
    ///
    /// Statically skipped entities are finished right here: the runner never
    /// sends a result for them.
    pub fn start_entity(
        &mut self,
        entity: &ReportableEntity,
        base_path: &str,
        parent_id: Option<&str>,
    ) {
        if self.registry.contains(&entity.local_id) {
            debug!("{} already started; ignoring repeated announcement", entity.local_id);
            return;
        }

        let Some(launch_id) = self.launch.launch_id().map(str::to_string) else {
            warn!("Entity {} collected before the launch was started", entity.local_id);
            return;
        };

        let start_time = self.clock.now_millis();
        let title = if parent_id.is_some() { entity.name.as_str() } else { "" };
        let code_ref = PathUtils::code_ref(base_path, title);

        let rq = StartItemRq {
            name: entity.name.clone(),
            start_time,
            item_type: entity.kind.item_type(),
            code_ref: code_ref.clone(),
        };
        let Started {
            temp_id,
            completion,
        } = self.client.start_item(rq, &launch_id, parent_id);
        self.launch.track(Operation::StartItem, completion);
        self.registry.register(entity.local_id.clone(), temp_id.clone());

        if entity.mode.is_static_skip() {
            let mut rq = FinishItemRq::new(ItemStatus::Skipped, start_time);
            rq.attributes = Some(if entity.mode == TaskMode::Todo {
                vec![Attribute::tag("todo")]
            } else {
                Vec::new()
            });
            self.issue_finish(&entity.local_id, &temp_id, rq);
            return;
        }

        if entity.kind.is_container() {
            for child in &entity.children {
                self.start_entity(child, &code_ref, Some(&temp_id));
            }
        }
    }
}
