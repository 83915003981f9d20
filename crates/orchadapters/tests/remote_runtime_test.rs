// crates/orchadapters/tests/remote_runtime_test.rs

use orchadapters::{GraphAgentAdapter, LANGGRAPH_EXECUTION_ERROR};
use orchcore::{ExecutionContext, FrameworkAdapter, Parameters, ParsedWorkflow};
use orchruntime::WorkflowParser;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Stand-in framework runtime: `/health` answers 200, `/execute` answers
/// with `execute_reply`.
async fn mock_runtime(execute_reply: Value) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/execute"))
        .respond_with(ResponseTemplate::new(200).set_body_json(execute_reply))
        .mount(&server)
        .await;

    server
}

async fn execute_requests(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/execute")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

fn workflow() -> ParsedWorkflow {
    let doc = json!({
        "nodes": [
            { "id": "plan", "type": "llm", "parameters": { "prompt": "{{ $json.topic }}" } },
            { "id": "write", "type": "llm", "parameters": {} }
        ],
        "connections": { "plan": { "main": [[ { "node": "write" } ]] } }
    });
    WorkflowParser::default().parse_str(&doc.to_string()).unwrap()
}

#[tokio::test]
async fn test_remote_execution() {
    let server = mock_runtime(json!({
        "output": { "article": "done" },
        "resourceUsage": { "cpuTimeMs": 7, "memoryPeakBytes": 4096 }
    }))
    .await;

    let adapter = GraphAgentAdapter::new();
    adapter
        .initialize(&json!({ "runtime_url": server.uri() }))
        .await
        .unwrap();

    let params: Parameters = [("topic".to_string(), json!("rust"))].into_iter().collect();
    let ctx = ExecutionContext::new("corr-remote");
    let result = adapter.execute(&workflow(), &params, &ctx).await;

    assert!(result.success, "Unexpected failure: {:?}", result.error);
    assert_eq!(result.output, json!({ "article": "done" }));
    assert_eq!(result.resource_usage.memory_peak_bytes, 4096);
    assert_eq!(result.steps.len(), 3);

    let requests = execute_requests(&server).await;
    assert_eq!(requests.len(), 1, "Exactly one execute call is forwarded");
    let request = &requests[0];
    assert_eq!(request["inputs"]["topic"], json!("rust"));
    assert_eq!(request["executionId"], json!(ctx.execution_id.to_string()));
    assert_eq!(request["config"]["nodes"][0]["id"], json!("plan"));
}

#[tokio::test]
async fn test_remote_error_becomes_failed_envelope() {
    let server = mock_runtime(json!({ "error": "model overloaded" })).await;

    let adapter = GraphAgentAdapter::new();
    adapter
        .initialize(&json!({ "runtime_url": server.uri() }))
        .await
        .unwrap();

    let result = adapter
        .execute(&workflow(), &Parameters::new(), &ExecutionContext::new("corr-remote-err"))
        .await;

    assert!(!result.success);
    assert_eq!(result.error_code(), Some(LANGGRAPH_EXECUTION_ERROR));
    assert!(result.error.unwrap().message.contains("model overloaded"));
}

#[tokio::test]
async fn test_unhealthy_runtime_fails_initialization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let adapter = GraphAgentAdapter::new();
    let err = adapter
        .initialize(&json!({ "runtime_url": server.uri() }))
        .await
        .unwrap_err();

    assert!(matches!(err, orchcore::AdapterError::Initialization(_)));
}
