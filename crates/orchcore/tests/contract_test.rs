// crates/orchcore/tests/contract_test.rs

use orchcore::{
    codes, execute_with_timeout, validate_required_fields, validate_structure, AdapterError,
    Connections, ExecutionContext, ExecutionResult, GraphNode, ResourceUsage, StepRecord,
    StepStatus,
};
use serde_json::json;
use tokio::time::{sleep, Duration, Instant};

#[tokio::test]
async fn test_execute_with_timeout_expires() {
    let started = Instant::now();

    let result: Result<(), AdapterError> = execute_with_timeout(
        async {
            sleep(Duration::from_millis(5000)).await;
            Ok(())
        },
        50,
        "exec-1",
    )
    .await;

    let elapsed = started.elapsed();
    match result {
        Err(AdapterError::Timeout {
            timeout_ms,
            execution_id,
        }) => {
            assert_eq!(timeout_ms, 50);
            assert_eq!(execution_id, "exec-1");
        }
        other => panic!("Expected timeout, got {:?}", other),
    }
    assert!(elapsed >= Duration::from_millis(50), "Returned before the deadline");
    assert!(elapsed < Duration::from_millis(1000), "Blocked past the deadline: {:?}", elapsed);
}

#[tokio::test]
async fn test_execute_with_timeout_passes_result_through() {
    let value = execute_with_timeout(async { Ok::<_, AdapterError>(42) }, 1000, "exec-2")
        .await
        .unwrap();
    assert_eq!(value, 42);

    let err = execute_with_timeout(
        async { Err::<(), _>(AdapterError::Runtime("boom".to_string())) },
        1000,
        "exec-3",
    )
    .await
    .unwrap_err();
    assert_eq!(err, AdapterError::Runtime("boom".to_string()));
}

#[tokio::test]
async fn test_execute_with_timeout_drops_operation() {
    let (tx, mut rx) = tokio::sync::oneshot::channel::<()>();

    let _ = execute_with_timeout(
        async move {
            sleep(Duration::from_millis(500)).await;
            let _ = tx.send(());
            Ok::<_, AdapterError>(())
        },
        20,
        "exec-4",
    )
    .await;

    // Sender was dropped with the operation, so nothing is ever sent.
    sleep(Duration::from_millis(600)).await;
    assert!(matches!(
        rx.try_recv(),
        Err(tokio::sync::oneshot::error::TryRecvError::Closed)
    ));
}

#[test]
fn test_failure_envelope_serialization() {
    let result = ExecutionResult::failure("Execution timeout after 50ms", codes::EXECUTION_TIMEOUT, 51);
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["success"], json!(false));
    assert_eq!(json["output"], json!(null));
    assert_eq!(json["executionTimeMs"], json!(51));
    assert_eq!(json["resourceUsage"], json!({"cpuTimeMs": 0, "memoryPeakBytes": 0}));
    assert_eq!(json["steps"], json!([]));
    assert_eq!(json["error"]["code"], json!("EXECUTION_TIMEOUT"));
    assert_eq!(result.error_code(), Some(codes::EXECUTION_TIMEOUT));
}

#[test]
fn test_success_envelope_serialization() {
    let mut step = StepRecord::pending("node_1", "Execute Fetch");
    step.start();
    step.complete(json!({"ok": true}));
    assert_eq!(step.status, StepStatus::Completed);
    assert!(step.duration_ms.is_some());

    let result = ExecutionResult::success(
        json!({"answer": 42}),
        12,
        vec![step],
        ResourceUsage {
            cpu_time_ms: 10,
            memory_peak_bytes: 2048,
        },
    );
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["success"], json!(true));
    assert_eq!(json["error"], json!(null), "Error must serialize as null");
    assert_eq!(json["resourceUsage"]["memoryPeakBytes"], json!(2048));
    assert_eq!(json["steps"][0]["status"], json!("completed"));
    assert_eq!(result.error_code(), None);
}

#[test]
fn test_failed_step_records_error() {
    let mut step = StepRecord::pending("node_2", "Execute Agent");
    step.fail("Execution cancelled");

    assert_eq!(step.status, StepStatus::Failed);
    assert_eq!(step.error.as_deref(), Some("Execution cancelled"));
    assert!(step.started_at.is_some());
    assert!(step.completed_at.is_some());
}

#[test]
fn test_validate_required_fields() {
    let data = json!({"id": "n1", "type": "webhook"});
    let missing = validate_required_fields(&data, &["id", "type", "parameters"]);
    assert_eq!(missing, vec!["Missing required field: parameters".to_string()]);

    let missing = validate_required_fields(&json!("not an object"), &["id"]);
    assert_eq!(missing.len(), 1);
}

#[test]
fn test_validate_structure() {
    assert!(validate_structure(&json!({"nodes": []})).valid);
    assert!(!validate_structure(&json!(null)).valid);

    let check = validate_structure(&json!([1, 2]));
    assert!(!check.valid);
    assert_eq!(check.errors, vec!["Workflow data must be an object".to_string()]);
}

#[test]
fn test_connection_edges() {
    let raw = json!({
        "Webhook": { "main": [[ { "node": "Fetch", "type": "main", "index": 0 } ]] },
        "Fetch": { "main": [[ { "node": "Store", "type": "main", "index": 0 },
                              { "node": "Notify", "type": "main", "index": 1 } ]] },
        "Broken": "not a mapping",
    });
    let connections = Connections::new(raw.as_object().unwrap().clone());
    let edges = connections.edges();

    assert_eq!(edges.len(), 3, "Malformed entries are skipped");
    assert_eq!(edges[0].source, "Webhook");
    assert_eq!(edges[0].target, "Fetch");
    assert_eq!(edges[2].target, "Notify");
    assert_eq!(edges[2].index, Some(1));
    assert_eq!(edges[2].kind, "main");
}

#[test]
fn test_graph_node_accessors() {
    let node = GraphNode::new(json!({
        "id": 7,
        "type": "n8n-nodes-base.webhook",
        "name": "Incoming",
        "parameters": { "path": "hook" }
    }));

    assert_eq!(node.id().as_deref(), Some("7"));
    assert_eq!(node.node_type(), Some("n8n-nodes-base.webhook"));
    assert!(node.is_referenced_by("7"));
    assert!(node.is_referenced_by("Incoming"));
    assert_eq!(node.parameter("path"), Some(&json!("hook")));

    let odd = GraphNode::new(json!("just a string"));
    assert_eq!(odd.id(), None);
    assert_eq!(odd.parameters(), None);
}

#[test]
fn test_context_timeout_builder() {
    let ctx = ExecutionContext::new("corr-1")
        .with_workflow("wf-1")
        .with_agent("agent-1")
        .with_timeout(250);

    assert_eq!(ctx.timeout_ms(), Some(250));
    assert_eq!(ctx.correlation_id, "corr-1");
    assert!(!ctx.is_cancelled());
    ctx.cancellation.cancel();
    assert!(ctx.is_cancelled());
}
