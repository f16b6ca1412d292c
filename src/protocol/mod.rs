// Protocol adapters - runner callback shapes translated into `Reporter` calls

pub mod events;
pub mod task_pack;
pub mod test_case;

pub use events::{RunnerEvent, replay};
pub use task_pack::{RunnerTask, TaskPackAdapter, TaskResult, TaskResultPack, TaskType};
pub use test_case::{Diagnostic, NodeType, TestCaseAdapter, TestNode};
