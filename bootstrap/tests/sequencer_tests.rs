//! End-to-end tests for the bootstrap sequence.
//!
//! These drive the real sequencer against real sockets and real child
//! processes: a loopback listener stands in for PostgreSQL, and small `sh`
//! commands stand in for the migration and server commands, recording their
//! invocations in marker files.

#![cfg(unix)]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use competitions_bootstrap::{BootstrapConfig, BootstrapError, CommandSpec};
use tokio::net::TcpListener;

/// Unique marker file path per test, safe under parallel test execution.
fn marker_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "competitions-bootstrap-{tag}-{}",
        std::process::id()
    ))
}

/// A command that appends `word` to `path` and exits 0.
fn append_command(path: &Path, word: &str) -> CommandSpec {
    CommandSpec::from_argv(vec![
        "sh".to_string(),
        "-c".to_string(),
        format!("echo {word} >> {}", path.display()),
    ])
    .unwrap()
}

fn fast_config(port: u16) -> BootstrapConfig {
    BootstrapConfig::default()
        .with_host("127.0.0.1".to_string())
        .with_port(port)
        .with_wait_timeout(Duration::from_millis(500))
        .with_retry_interval(Duration::from_millis(50))
        .with_connect_timeout(Duration::from_millis(200))
}

/// Learn a loopback port number that nothing is listening on.
async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn steps_run_in_order_when_database_is_reachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let marker = marker_path("order");
    let _ = std::fs::remove_file(&marker);

    let migration = append_command(&marker, "migrate");
    let server = append_command(&marker, "serve");

    let code = competitions_bootstrap::run(&fast_config(port), &migration, &server)
        .await
        .unwrap();

    assert_eq!(code, 0);
    let recorded = std::fs::read_to_string(&marker).unwrap();
    assert_eq!(recorded, "migrate\nserve\n");

    let _ = std::fs::remove_file(&marker);
}

#[tokio::test]
async fn reachability_timeout_never_invokes_migration() {
    let port = free_port().await;

    let marker = marker_path("timeout");
    let _ = std::fs::remove_file(&marker);

    let migration = append_command(&marker, "migrate");
    let server = append_command(&marker, "serve");

    let config = fast_config(port)
        .with_wait_timeout(Duration::from_millis(250))
        .with_retry_interval(Duration::from_millis(50));

    let started = Instant::now();
    let err = competitions_bootstrap::run(&config, &migration, &server)
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    match err {
        BootstrapError::DependencyUnavailable { host, port: p, waited } => {
            assert_eq!(host, "127.0.0.1");
            assert_eq!(p, port);
            assert!(waited >= Duration::from_millis(250));
        }
        other => panic!("expected DependencyUnavailable, got {other:?}"),
    }

    // Approximately the deadline: within one retry interval plus scheduling slack.
    assert!(elapsed >= Duration::from_millis(250));
    assert!(elapsed < Duration::from_secs(2), "gave up far too late: {elapsed:?}");

    assert!(!marker.exists(), "migration ran despite the timeout");
}

#[tokio::test]
async fn migration_failure_blocks_the_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let marker = marker_path("migration-failure");
    let _ = std::fs::remove_file(&marker);

    let migration = CommandSpec::from_argv(vec![
        "sh".to_string(),
        "-c".to_string(),
        "exit 3".to_string(),
    ])
    .unwrap();
    let server = append_command(&marker, "serve");

    let err = competitions_bootstrap::run(&fast_config(port), &migration, &server)
        .await
        .unwrap_err();

    assert!(matches!(
        &err,
        BootstrapError::StepFailed {
            step: "migrate",
            status: Some(3),
        }
    ));
    assert_eq!(err.exit_code(), 3);
    assert!(!marker.exists(), "server ran despite the failed migration");
}

#[tokio::test]
async fn server_exit_status_is_forwarded() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let migration = CommandSpec::parse("true").unwrap();
    let server = CommandSpec::from_argv(vec![
        "sh".to_string(),
        "-c".to_string(),
        "exit 7".to_string(),
    ])
    .unwrap();

    let code = competitions_bootstrap::run(&fast_config(port), &migration, &server)
        .await
        .unwrap();

    assert_eq!(code, 7);
}

#[tokio::test]
async fn server_arguments_are_passed_verbatim() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let marker = marker_path("argv");
    let _ = std::fs::remove_file(&marker);

    let migration = CommandSpec::parse("true").unwrap();
    // `$@` reproduces the argument vector exactly; an argument containing a
    // space must come through as one line, not two.
    let server = CommandSpec::from_argv(vec![
        "sh".to_string(),
        "-c".to_string(),
        format!("printf '%s\\n' \"$@\" > {}", marker.display()),
        "sh".to_string(),
        "--workers".to_string(),
        "two words".to_string(),
    ])
    .unwrap();

    let code = competitions_bootstrap::run(&fast_config(port), &migration, &server)
        .await
        .unwrap();

    assert_eq!(code, 0);
    let recorded = std::fs::read_to_string(&marker).unwrap();
    assert_eq!(recorded, "--workers\ntwo words\n");

    let _ = std::fs::remove_file(&marker);
}

#[tokio::test]
async fn database_becoming_reachable_unblocks_startup_exactly_once() {
    let port = free_port().await;

    let marker = marker_path("late-bind");
    let _ = std::fs::remove_file(&marker);

    // Bind the listener only after the sequencer has failed a few probes.
    let listener_task = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
        // Hold the listener open until the test finishes.
        let _listener = listener;
        std::future::pending::<()>().await;
    });

    let migration = append_command(&marker, "migrate");
    let server = CommandSpec::parse("true").unwrap();

    let config = fast_config(port)
        .with_wait_timeout(Duration::from_secs(5))
        .with_retry_interval(Duration::from_millis(40));

    let code = competitions_bootstrap::run(&config, &migration, &server)
        .await
        .unwrap();

    assert_eq!(code, 0);
    let recorded = std::fs::read_to_string(&marker).unwrap();
    assert_eq!(recorded, "migrate\n", "migration must run exactly once");

    listener_task.abort();
    let _ = std::fs::remove_file(&marker);
}
