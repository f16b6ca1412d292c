// RP_LAUNCH_ID handling. Kept in its own test binary because it mutates the
// process environment.

use rpreporter::client::{ClientCall, Operation};
use rpreporter::config::ENV_RP_LAUNCH_ID;
use rpreporter::time::FixedClock;
use rpreporter::{RecordingClient, Reporter, ReporterConfig, RpReporter};
use std::sync::Arc;

#[tokio::test]
async fn test_env_launch_id_is_external() {
    // Arrange
    // SAFETY: the only test in this binary; no other thread reads the environment
    unsafe { std::env::set_var(ENV_RP_LAUNCH_ID, "external-from-env") };

    let overridden = ReporterConfig {
        launch_id: Some("from-config".to_string()),
        ..ReporterConfig::default()
    }
    .with_env_overrides();
    assert_eq!(overridden.launch_id.as_deref(), Some("external-from-env"));

    let client = RecordingClient::new();
    let mut reporter = RpReporter::with_clock(
        ReporterConfig::default(),
        Arc::new(client.clone()),
        Arc::new(FixedClock::new(1000)),
    );

    // Act
    reporter.on_init("");
    reporter.on_finished().await;

    // Assert
    assert_eq!(
        reporter.config().launch_id.as_deref(),
        Some("external-from-env")
    );
    match &client.calls()[0] {
        ClientCall::StartLaunch { rq, .. } => {
            assert_eq!(rq.id.as_deref(), Some("external-from-env"))
        }
        other => panic!("expected launch start, got {:?}", other),
    }
    assert_eq!(client.count(Operation::FinishLaunch), 0);

    // Blank values are ignored
    unsafe { std::env::set_var(ENV_RP_LAUNCH_ID, "  ") };
    assert_eq!(ReporterConfig::default().with_env_overrides().launch_id, None);

    unsafe { std::env::remove_var(ENV_RP_LAUNCH_ID) };
}
