// Runner event stream - newline-delimited JSON replayed into a reporter

use super::task_pack::{RunnerTask, TaskResultPack};
use super::test_case::{TestCaseAdapter, TestNode};
use crate::model::{ConsoleLog, ReportableEntity};
use crate::report::Reporter;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use tracing::{debug, warn};

/// One runner callback, tagged by its `event` field.
///
/// Both protocols share the stream: `collected` and `taskUpdate` come from
/// task-pack runners, the `test*` events from test-case runners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum RunnerEvent {
    /// Run started
    Init {
        #[serde(rename = "rootDir", default)]
        root_dir: String,
    },

    /// Task trees collected
    Collected { files: Vec<RunnerTask> },

    /// Batched `[id, result, meta]` packs
    TaskUpdate { packs: Vec<TaskResultPack> },

    /// Module tree collected
    TestModuleCollected { module: TestNode },

    /// Test case about to execute
    TestCaseReady { test: TestNode },

    /// Test case finished
    TestCaseResult { test: TestNode },

    /// Suite finished
    TestSuiteResult { suite: TestNode },

    /// Module finished
    TestModuleEnd { module: TestNode },

    /// Captured console output
    ConsoleLog { log: ConsoleLog },

    /// Run ended
    Finished,
}

impl RunnerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RunnerEvent::Init { .. } => "init",
            RunnerEvent::Collected { .. } => "collected",
            RunnerEvent::TaskUpdate { .. } => "taskUpdate",
            RunnerEvent::TestModuleCollected { .. } => "testModuleCollected",
            RunnerEvent::TestCaseReady { .. } => "testCaseReady",
            RunnerEvent::TestCaseResult { .. } => "testCaseResult",
            RunnerEvent::TestSuiteResult { .. } => "testSuiteResult",
            RunnerEvent::TestModuleEnd { .. } => "testModuleEnd",
            RunnerEvent::ConsoleLog { .. } => "consoleLog",
            RunnerEvent::Finished => "finished",
        }
    }

    async fn apply<R: Reporter>(self, adapter: &mut TestCaseAdapter<R>) {
        match self {
            RunnerEvent::Init { root_dir } => adapter.on_init(&root_dir),
            RunnerEvent::Collected { files } => {
                let modules: Vec<ReportableEntity> =
                    files.iter().map(ReportableEntity::from).collect();
                adapter.reporter_mut().on_collected(&modules);
            }
            RunnerEvent::TaskUpdate { packs } => {
                let batch = packs
                    .iter()
                    .filter_map(TaskResultPack::to_finish_input)
                    .collect();
                adapter.reporter_mut().on_results(batch);
            }
            RunnerEvent::TestModuleCollected { module } => adapter.on_test_module_collected(&module),
            RunnerEvent::TestCaseReady { test } => adapter.on_test_case_ready(&test),
            RunnerEvent::TestCaseResult { test } => adapter.on_test_case_result(&test),
            RunnerEvent::TestSuiteResult { suite } => adapter.on_test_suite_result(&suite),
            RunnerEvent::TestModuleEnd { module } => adapter.on_test_module_end(&module),
            RunnerEvent::ConsoleLog { log } => adapter.on_user_console_log(log),
            RunnerEvent::Finished => adapter.on_test_run_end().await,
        }
    }
}

/// Parse one line of the stream. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> serde_json::Result<Option<RunnerEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

/// Replay a newline-delimited event stream into `reporter`.
///
/// Malformed lines are logged and skipped. Returns the number of events applied.
pub async fn replay<B: BufRead, R: Reporter>(reader: B, reporter: R) -> Result<usize> {
    let mut adapter = TestCaseAdapter::new(reporter);
    let mut applied = 0;

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("Failed to read event stream at line {}", line_no))?;

        let event = match parse_line(&line) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                warn!("Skipping malformed runner event at line {}: {}", line_no, e);
                continue;
            }
        };

        debug!("Replaying '{}' event from line {}", event.name(), line_no);
        event.apply(&mut adapter).await;
        applied += 1;
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StreamKind;

    #[test]
    fn test_parse_tagged_events() {
        let event = parse_line(r#"{"event":"init","rootDir":"/repo"}"#).unwrap();
        assert_eq!(
            event,
            Some(RunnerEvent::Init {
                root_dir: "/repo".to_string()
            })
        );

        let event = parse_line(r#"{"event":"finished"}"#).unwrap().unwrap();
        assert_eq!(event.name(), "finished");

        let event = parse_line(
            r#"{"event":"consoleLog","log":{"content":"boom","type":"stderr","taskId":"t1"}}"#,
        )
        .unwrap()
        .unwrap();
        match event {
            RunnerEvent::ConsoleLog { log } => {
                assert_eq!(log.stream, StreamKind::Stderr);
                assert_eq!(log.task_id.as_deref(), Some("t1"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_task_update() {
        let event = parse_line(
            r#"{"event":"taskUpdate","packs":[["t1",{"state":"pass","startTime":1,"duration":2},null]]}"#,
        )
        .unwrap()
        .unwrap();
        match event {
            RunnerEvent::TaskUpdate { packs } => {
                assert_eq!(packs.len(), 1);
                assert!(packs[0].to_finish_input().is_some());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_blank_and_malformed_lines() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert!(parse_line("{not json").is_err());
        assert!(parse_line(r#"{"event":"unknown"}"#).is_err());
    }
}
