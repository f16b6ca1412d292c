// Tests for the metadata bridge - public API only

use rpreporter::model::{
    Attribute, EntityResult, EntityState, FinishInput, LogFile, LogLevel, ReportableEntity,
};
use rpreporter::time::FixedClock;
use rpreporter::{MetadataBridge, RecordingClient, Reporter, ReporterConfig, RpReporter};
use std::sync::Arc;

fn bridge() -> MetadataBridge {
    MetadataBridge::new(Arc::new(FixedClock::new(100)))
}

#[test]
fn test_attributes_concatenate_without_dedup() {
    // Arrange
    let bridge = bridge();
    let api = bridge.api_for("t1");

    // Act
    api.attributes(vec![Attribute::new("k", "v")]);
    api.attributes(vec![Attribute::new("k", "v"), Attribute::tag("smoke")]);

    // Assert
    let meta = bridge.take("t1").unwrap();
    assert_eq!(
        meta.attributes,
        vec![
            Attribute::new("k", "v"),
            Attribute::new("k", "v"),
            Attribute::tag("smoke")
        ]
    );
}

#[test]
fn test_description_appends_with_newline() {
    let bridge = bridge();
    let api = bridge.api_for("t1");

    api.description("a");
    api.description("b");
    api.description("c");

    assert_eq!(bridge.take("t1").unwrap().description.as_deref(), Some("a\nb\nc"));
}

#[test]
fn test_stale_guard_keeps_newer_binding() {
    // Arrange
    let bridge = bridge();
    let first = bridge.bind("t1");

    // Act
    let second = bridge.bind("t2");
    drop(first);

    // Assert
    assert_eq!(bridge.current().as_deref(), Some("t2"));
    assert_eq!(second.local_id(), "t2");
    drop(second);
    assert!(bridge.current().is_none());
}

#[test]
fn test_current_api_follows_binding() {
    let bridge = bridge();
    let api = bridge.api();

    {
        let _guard = bridge.bind("t1");
        api.log("first", LogLevel::Warn);
    }
    {
        let _guard = bridge.bind("t2");
        api.log("second", LogLevel::Error);
    }

    assert_eq!(bridge.take("t1").unwrap().logs[0].level, LogLevel::Warn);
    assert_eq!(bridge.take("t2").unwrap().logs[0].message, "second");
}

#[test]
fn test_writes_from_other_threads() {
    let bridge = bridge();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let api = bridge.api_for("shared");
            std::thread::spawn(move || api.attributes(vec![Attribute::tag(format!("t{}", i))]))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(bridge.take("shared").unwrap().attributes.len(), 4);
}

#[tokio::test]
async fn test_attachment_reaches_log_channel() {
    // Arrange
    let client = RecordingClient::new();
    let mut reporter = RpReporter::with_clock(
        ReporterConfig::default(),
        Arc::new(client.clone()),
        Arc::new(FixedClock::new(100)),
    );
    reporter.on_init("");
    reporter.on_collected(&[
        ReportableEntity::module("m", "a.spec.ts").with_child(ReportableEntity::test("t", "T"))
    ]);

    // Act
    reporter.bridge().scope("t", |api| {
        api.attachment(
            LogFile::new("screen.png", "image/png", vec![1, 2, 3]),
            Some("Screenshot"),
        );
        api.attachment(LogFile::new("trace.txt", "text/plain", b"trace".to_vec()), None);
    });
    reporter.on_results(vec![FinishInput::new(
        "t",
        Some(EntityResult::new(EntityState::Passed)),
    )]);
    reporter.on_finished().await;

    // Assert
    let logs = client.logs();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].1.message, "Screenshot");
    assert_eq!(logs[0].1.level, LogLevel::Info);
    assert_eq!(logs[0].2.as_ref().unwrap().mime_type, "image/png");
    assert_eq!(logs[1].1.message, "trace.txt");
    assert_eq!(logs[1].2.as_ref().unwrap().content, b"trace".to_vec());
}
