mod common;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{hosts, Event, RecordingReporter, ScriptBody};
use volley_core::configs::parse_volley_config;
use volley_core::execution::{CancelState, CancellationController, ProcessOrchestrator, SignalKind};
use volley_core::hosts::LOCAL_HOST;
use volley_core::results::ExecutionOutcome;
use volley_core::{TaskManager, VolleyError};

fn manager(yaml: &str, root: PathBuf) -> TaskManager {
    TaskManager::from_config(parse_volley_config(yaml).unwrap(), root)
}

#[tokio::test]
async fn test_deploy_to_two_hosts_spawns_and_reaps_both() {
    let manager = manager(
        r#"
tasks:
  deploy:
    command: "true"
    options:
      hosts: [web1, web2]
"#,
        PathBuf::from("."),
    );
    let reporter = Arc::new(RecordingReporter::new());
    let body = ScriptBody::new();

    let outcome = manager
        .execute_with("deploy", &body, reporter.clone(), CancellationController::new())
        .await
        .unwrap();

    let ExecutionOutcome::Completed { reports } = &outcome else {
        panic!("expected a completed run, got {:?}", outcome);
    };
    assert_eq!(reports.len(), 2);
    assert_eq!(reporter.spawned().len(), 2);
    assert_eq!(reporter.reaped().len(), 2);
    assert_eq!(outcome.exit_code(), 0);

    let spawned_hosts: Vec<String> = reporter.spawned().into_iter().map(|h| h.host).collect();
    assert_eq!(spawned_hosts, vec!["web1", "web2"], "hosts spawn in resolved order");
    assert!(body.contexts().iter().all(|c| !c.local_run));
    assert_eq!(reporter.events().last(), Some(&Event::Completed("deploy".to_string())));
}

#[tokio::test]
async fn test_restart_through_role_spawns_three_workers() {
    let manager = manager(
        r#"
roles:
  web: [web1, web2, web3]
tasks:
  restart:
    command: "true"
    options:
      roles: [web]
"#,
        PathBuf::from("."),
    );
    let reporter = Arc::new(RecordingReporter::new());
    let body = ScriptBody::new();

    let outcome = manager
        .execute_with("restart", &body, reporter.clone(), CancellationController::new())
        .await
        .unwrap();

    assert!(!outcome.is_cancelled());
    assert_eq!(body.contexts().len(), 3);
    assert_eq!(reporter.reaped().len(), 3);
}

#[tokio::test]
async fn test_unconfigured_task_runs_once_locally() {
    let temp_dir = tempfile::tempdir().unwrap();
    let manager = manager(
        r#"
tasks:
  check:
    command: 'echo "$VOLLEY_HOST $VOLLEY_LOCAL_RUN $VOLLEY_TASK"'
"#,
        temp_dir.path().to_path_buf(),
    );
    let reporter = Arc::new(RecordingReporter::new());

    let outcome = manager.execute("check", reporter.clone()).await.unwrap();

    assert!(!outcome.is_cancelled());
    assert_eq!(reporter.spawned().len(), 1);
    assert_eq!(reporter.spawned()[0].host, LOCAL_HOST);
    assert!(reporter.events().iter().any(|e| matches!(
        e,
        Event::HostsResolved(resolution) if resolution.local_run
    )));
    assert_eq!(
        reporter.output(),
        vec![(LOCAL_HOST.to_string(), format!("{} 1 check", LOCAL_HOST))]
    );
}

#[tokio::test]
async fn test_local_run_flag_reaches_task_body() {
    let manager = manager("tasks:\n  check:\n    command: uptime\n", PathBuf::from("."));
    let body = ScriptBody::new();

    manager
        .execute_with(
            "check",
            &body,
            Arc::new(RecordingReporter::new()),
            CancellationController::new(),
        )
        .await
        .unwrap();

    let contexts = body.contexts();
    assert_eq!(contexts.len(), 1);
    assert!(contexts[0].local_run);
    assert_eq!(contexts[0].task_name, "check");
}

#[tokio::test]
async fn test_cancellation_signals_only_outstanding_workers() {
    let controller = CancellationController::new();
    let reporter = Arc::new(RecordingReporter::cancel_after_reaps(1, controller.handle()));
    let body = ScriptBody::new()
        .script("slow1", "sleep 30")
        .script("slow2", "sleep 30");
    let mut orchestrator = ProcessOrchestrator::new(reporter.clone(), controller);

    let started = Instant::now();
    let outcome = orchestrator
        .run(&hosts(&["fast", "slow1", "slow2"]), "deploy", &body, false)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(20), "run should stop waiting promptly");
    let ExecutionOutcome::Cancelled { signal, signalled } = &outcome else {
        panic!("expected a cancelled run, got {:?}", outcome);
    };
    assert_eq!(*signal, SignalKind::Interrupt);
    assert_eq!(outcome.exit_code(), 130);

    let mut signalled_hosts: Vec<&str> = signalled.iter().map(|h| h.host.as_str()).collect();
    signalled_hosts.sort();
    assert_eq!(signalled_hosts, vec!["slow1", "slow2"]);
    assert_eq!(reporter.signalled(), *signalled);
    assert_eq!(reporter.reaped().len(), 1);
    assert_eq!(reporter.reaped()[0].host, "fast");
    assert!(reporter.events().contains(&Event::SignalReceived(SignalKind::Interrupt)));

    assert_eq!(orchestrator.registry().len(), 2, "cancelled workers are never reaped");
    assert_eq!(orchestrator.cancellation().state(), CancelState::Terminated);
}

#[tokio::test]
async fn test_cancellation_before_spawning_spawns_nothing() {
    let controller = CancellationController::new();
    controller.trigger(SignalKind::Terminate);
    let reporter = Arc::new(RecordingReporter::new());
    let body = ScriptBody::new();
    let mut orchestrator = ProcessOrchestrator::new(reporter.clone(), controller);

    let outcome = orchestrator
        .run(&hosts(&["web1", "web2"]), "deploy", &body, false)
        .await
        .unwrap();

    assert!(outcome.is_cancelled());
    assert_eq!(outcome.exit_code(), 143);
    assert!(reporter.spawned().is_empty());
    assert!(body.contexts().is_empty());
}

#[tokio::test]
async fn test_cancellation_between_spawns_stops_the_spawn_loop() {
    let controller = CancellationController::new();
    let reporter = Arc::new(RecordingReporter::cancel_after_spawns(1, controller.handle()));
    let body = ScriptBody::new()
        .script("web1", "sleep 30")
        .script("web2", "sleep 30")
        .script("web3", "sleep 30");
    let mut orchestrator = ProcessOrchestrator::new(reporter.clone(), controller);

    let started = Instant::now();
    let outcome = orchestrator
        .run(&hosts(&["web1", "web2", "web3"]), "deploy", &body, false)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(20));
    let ExecutionOutcome::Cancelled { signal, signalled } = &outcome else {
        panic!("expected a cancelled run, got {:?}", outcome);
    };
    assert_eq!(*signal, SignalKind::Interrupt);

    let spawned: Vec<String> = reporter.spawned().into_iter().map(|h| h.host).collect();
    assert_eq!(spawned, vec!["web1"]);
    let signalled_hosts: Vec<&str> = signalled.iter().map(|h| h.host.as_str()).collect();
    assert_eq!(signalled_hosts, vec!["web1"]);
    assert_eq!(body.contexts().len(), 1, "web2 and web3 are never spawned");
    assert_eq!(orchestrator.cancellation().state(), CancelState::Terminated);
}

#[tokio::test]
async fn test_exited_worker_with_open_output_is_reaped_not_signalled() {
    let controller = CancellationController::new();
    let handle = controller.handle();
    let reporter = Arc::new(RecordingReporter::new());
    // web1 exits at once but a background sleep keeps its output pipes open
    let body = ScriptBody::new()
        .script("web1", "sleep 3 & exit 0")
        .script("web2", "sleep 30");
    let mut orchestrator = ProcessOrchestrator::new(reporter.clone(), controller);

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(400)).await;
        handle.trigger(SignalKind::Interrupt);
    });
    let outcome = orchestrator
        .run(&hosts(&["web1", "web2"]), "deploy", &body, false)
        .await
        .unwrap();
    canceller.await.unwrap();

    let ExecutionOutcome::Cancelled { signalled, .. } = &outcome else {
        panic!("expected a cancelled run, got {:?}", outcome);
    };
    let signalled_hosts: Vec<&str> = signalled.iter().map(|h| h.host.as_str()).collect();
    assert_eq!(signalled_hosts, vec!["web2"]);
    let reported: Vec<String> = reporter.signalled().into_iter().map(|h| h.host).collect();
    assert_eq!(reported, vec!["web2"]);
    let reaped: Vec<String> = reporter.reaped().into_iter().map(|h| h.host).collect();
    assert_eq!(reaped, vec!["web1"]);

    let outstanding: Vec<String> = orchestrator
        .registry()
        .handles()
        .into_iter()
        .map(|h| h.host)
        .collect();
    assert_eq!(outstanding, vec!["web2"]);
}

#[tokio::test]
async fn test_failed_host_does_not_stop_the_others() {
    let reporter = Arc::new(RecordingReporter::new());
    let body = ScriptBody::new().script("web2", "exit 3");
    let mut orchestrator = ProcessOrchestrator::new(reporter.clone(), CancellationController::new());

    let outcome = orchestrator
        .run(&hosts(&["web1", "web2", "web3"]), "deploy", &body, false)
        .await
        .unwrap();

    let failed: Vec<&str> = outcome.failed_hosts().into_iter().map(|r| r.host()).collect();
    assert_eq!(failed, vec!["web2"]);
    assert_eq!(failed_code(&outcome, "web2"), Some(3));
    assert_eq!(reporter.reaped().len(), 3);
    assert_eq!(outcome.exit_code(), 0);
    assert!(orchestrator.registry().is_empty());
}

fn failed_code(outcome: &ExecutionOutcome, host: &str) -> Option<i32> {
    outcome
        .failed_hosts()
        .into_iter()
        .find(|r| r.host() == host)
        .and_then(|r| r.status.code())
}

#[tokio::test]
async fn test_empty_host_set_is_rejected_before_spawning() {
    let reporter = Arc::new(RecordingReporter::new());
    let body = ScriptBody::new();
    let mut orchestrator = ProcessOrchestrator::new(reporter.clone(), CancellationController::new());

    let err = orchestrator
        .run(&hosts(&[]), "noop", &body, false)
        .await
        .unwrap_err();

    assert!(matches!(err, VolleyError::NoHosts(task) if task == "noop"));
    assert!(reporter.events().is_empty());
}

#[tokio::test]
async fn test_explicitly_empty_targets_fail_through_task_manager() {
    let manager = manager(
        "tasks:\n  noop:\n    command: 'true'\n    options:\n      hosts: []\n      roles: []\n",
        PathBuf::from("."),
    );
    let reporter = Arc::new(RecordingReporter::new());

    let err = manager.execute("noop", reporter.clone()).await.unwrap_err();

    assert!(matches!(err, VolleyError::NoHosts(_)));
    assert!(matches!(reporter.events().last(), Some(Event::Fatal(_))));
}

#[tokio::test]
async fn test_spawn_failure_aborts_and_signals_spawned_workers() {
    let reporter = Arc::new(RecordingReporter::new());
    let body = ScriptBody::new().script("web1", "sleep 30").unspawnable("web2");
    let mut orchestrator = ProcessOrchestrator::new(reporter.clone(), CancellationController::new());

    let started = Instant::now();
    let err = orchestrator
        .run(&hosts(&["web1", "web2", "web3"]), "deploy", &body, false)
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(20));
    assert!(matches!(err, VolleyError::Spawn { ref host, .. } if host == "web2"));
    let signalled: Vec<String> = reporter.signalled().into_iter().map(|h| h.host).collect();
    assert_eq!(signalled, vec!["web1"]);
    assert_eq!(body.contexts().len(), 2, "web3 is never spawned");
}

#[tokio::test]
async fn test_unknown_task_is_reported() {
    let manager = manager("tasks: {}\n", PathBuf::from("."));
    let reporter = Arc::new(RecordingReporter::new());

    let err = manager.execute("deploy", reporter.clone()).await.unwrap_err();

    assert!(matches!(err, VolleyError::UnknownTask(_)));
    assert_eq!(
        reporter.events(),
        vec![Event::Fatal("Task 'deploy' is not defined".to_string())]
    );
}

#[tokio::test]
async fn test_worker_output_is_prefixed_by_host() {
    let reporter = Arc::new(RecordingReporter::new());
    let body = ScriptBody::new()
        .script("web1", "echo one; echo two >&2")
        .script("web2", "echo three");
    let mut orchestrator = ProcessOrchestrator::new(reporter.clone(), CancellationController::new());

    orchestrator
        .run(&hosts(&["web1", "web2"]), "deploy", &body, false)
        .await
        .unwrap();

    let mut output = reporter.output();
    output.sort();
    assert_eq!(
        output,
        vec![
            ("web1".to_string(), "one".to_string()),
            ("web1".to_string(), "two".to_string()),
            ("web2".to_string(), "three".to_string()),
        ]
    );
}
