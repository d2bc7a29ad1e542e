// Global logger installation.
//
// Installing a global subscriber is once per process, so the whole lifecycle
// is exercised in a single test.

use std::fs;

use telemetry::{init_logger, init_test_logger, FileRotation, LoggerConfig, TelemetryError};
use tracing::{debug, info};

#[test]
fn test_logger_lifecycle() {
    std::env::remove_var("RUST_LOG");

    let dir = tempfile::tempdir().unwrap();
    let config = LoggerConfig {
        level: "INFO".to_string(),
        file_enabled: true,
        file_path: dir.path().join("orders.log"),
        file_max_backups: 2,
        file_rotation: FileRotation::Never,
    };

    let guard = init_logger(&config, "orders", "3.2.1").expect("first install succeeds");

    guard.span().in_scope(|| {
        info!(order_id = 17, "order accepted");
        debug!("filtered out at info level");
    });
    info!("outside the service span");
    futures::executor::block_on(guard.instrument(async {
        info!(order_id = 18, "order shipped");
    }));

    let second = init_logger(&config, "orders", "3.2.1");
    assert!(matches!(second, Err(TelemetryError::AlreadyInitialized)));

    // Must not panic with a logger already installed.
    init_test_logger();

    drop(guard);

    let contents = fs::read_to_string(dir.path().join("orders.log")).unwrap();
    let line = contents
        .lines()
        .find(|l| l.contains("order accepted"))
        .unwrap_or_else(|| panic!("event missing from file sink: {contents}"));

    assert!(line.contains("\"level\":\"INFO\""), "{line}");
    assert!(line.contains("\"order_id\":17"), "{line}");
    assert!(line.contains("\"service\":\"orders\""), "{line}");
    assert!(line.contains("\"version\":\"3.2.1\""), "{line}");
    assert!(line.contains("\"hostname\":"), "{line}");
    assert!(line.contains("Z\""), "UTC timestamp expected: {line}");
    assert!(!contents.contains("filtered out"), "{contents}");

    let shipped = contents
        .lines()
        .find(|l| l.contains("order shipped"))
        .unwrap_or_else(|| panic!("instrumented event missing: {contents}"));
    assert!(shipped.contains("\"service\":\"orders\""), "{shipped}");

    let outside = contents
        .lines()
        .find(|l| l.contains("outside the service span"))
        .unwrap_or_else(|| panic!("unscoped event missing: {contents}"));
    assert!(!outside.contains("\"service\":\"orders\""), "{outside}");
}
