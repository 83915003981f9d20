// crates/orchadapters/tests/adapters_test.rs

use orchadapters::{
    plan_steps, register_all, AgentAdapter, CrewAdapter, GraphAgentAdapter, VisualFlowAdapter,
    N8N_EXECUTION_ERROR,
};
use orchcore::{
    codes, AdapterError, ExecutionContext, FrameworkAdapter, FrameworkType, Parameters,
    ParsedWorkflow, StepStatus,
};
use orchruntime::{FrameworkRegistry, WorkflowParser};
use serde_json::{json, Value};
use tokio::time::{sleep, Duration, Instant};

fn parse(doc: Value) -> ParsedWorkflow {
    WorkflowParser::default().parse_str(&doc.to_string()).unwrap()
}

fn n8n_workflow() -> ParsedWorkflow {
    parse(json!({
        "nodes": [
            { "id": "1", "name": "Webhook", "type": "n8n-nodes-base.webhook", "parameters": { "path": "in" } },
            { "id": "2", "name": "Store", "type": "n8n-nodes-base.postgres", "parameters": { "table": "t" } },
            { "id": "3", "name": "Fetch", "type": "n8n-nodes-base.httpRequest", "parameters": { "url": "{{ $json.endpoint }}" } }
        ],
        "connections": {
            "Webhook": { "main": [[ { "node": "Fetch", "type": "main", "index": 0 } ]] },
            "Fetch": { "main": [[ { "node": "Store", "type": "main", "index": 0 } ]] }
        }
    }))
}

#[tokio::test]
async fn test_plan_follows_connections() {
    let plan = plan_steps(&n8n_workflow()).unwrap();
    let ids: Vec<_> = plan.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3", "2"]);
    assert_eq!(plan[1].name, "Execute Fetch");
}

#[tokio::test]
async fn test_plan_rejects_cycles() {
    let workflow = parse(json!({
        "nodes": [ { "id": "a", "type": "start" }, { "id": "b", "type": "llm" } ],
        "connections": {
            "a": { "main": [[ { "node": "b" } ]] },
            "b": { "main": [[ { "node": "a" } ]] }
        }
    }));
    let err = plan_steps(&workflow).unwrap_err();
    assert!(err.contains("cycle"));
}

#[tokio::test]
async fn test_dry_run_execution() {
    let adapter = VisualFlowAdapter::new();
    adapter.initialize(&json!({})).await.unwrap();

    let params: Parameters = [("endpoint".to_string(), json!("https://example.com"))]
        .into_iter()
        .collect();
    let ctx = ExecutionContext::new("corr-dry");
    let result = adapter.execute(&n8n_workflow(), &params, &ctx).await;

    assert!(result.success, "Unexpected failure: {:?}", result.error);
    assert_eq!(result.steps.len(), 4, "One init step plus one step per node");
    assert_eq!(result.steps[0].id, "workflow_init");
    assert!(result.steps.iter().all(|s| s.status == StepStatus::Completed));
    assert_eq!(result.output["summary"]["executedNodes"], json!(3));
    assert_eq!(result.output["results"][0]["nodeType"], json!("n8n-nodes-base.webhook"));
}

#[tokio::test]
async fn test_execute_before_initialize_fails() {
    let adapter = GraphAgentAdapter::new();
    let ctx = ExecutionContext::new("corr-uninit");

    let workflow = parse(json!({ "nodes": [ { "id": "a", "type": "llm" } ] }));
    let result = adapter.execute(&workflow, &Default::default(), &ctx).await;

    assert!(!result.success);
    assert_eq!(result.error_code(), Some("LANGGRAPH_EXECUTION_ERROR"));
}

#[tokio::test]
async fn test_invalid_workflow_is_not_executed() {
    let adapter = VisualFlowAdapter::new();
    adapter.initialize(&Value::Null).await.unwrap();

    let workflow = parse(json!({ "nodes": [ { "id": "x", "type": "n8n-nodes-base.set" } ] }));
    let result = adapter
        .execute(&workflow, &Default::default(), &ExecutionContext::new("corr-invalid"))
        .await;

    assert_eq!(result.error_code(), Some(codes::WORKFLOW_INVALID));
    assert!(result.steps.is_empty());
}

#[tokio::test]
async fn test_dry_run_honors_cancellation() {
    let adapter = CrewAdapter::new();
    adapter.initialize(&json!({ "step_delay_ms": 200 })).await.unwrap();
    let workflow = parse(json!({
        "nodes": [
            { "id": "r", "type": "crew.agent", "parameters": { "role": "r", "goal": "g", "backstory": "b" } },
            { "id": "t", "type": "crew.task", "parameters": { "description": "write" } }
        ]
    }));
    let ctx = ExecutionContext::new("corr-cancel");
    let token = ctx.cancellation.clone();

    tokio::spawn(async move {
        sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let started = Instant::now();
    let result = adapter.execute(&workflow, &Default::default(), &ctx).await;

    assert_eq!(result.error_code(), Some(codes::EXECUTION_CANCELLED));
    assert!(started.elapsed() < Duration::from_millis(200));
}

#[tokio::test]
async fn test_n8n_validation() {
    let adapter = VisualFlowAdapter::new();
    assert!(adapter.validate(&n8n_workflow()).await.valid);

    let workflow = parse(json!({
        "nodes": [
            { "id": "1", "type": "n8n-nodes-base.manual", "parameters": {} },
            { "id": "2", "type": "@n8n/n8n-nodes-langchain.openai", "parameters": { "model": "gpt" } },
            { "type": "n8n-nodes-base.set" }
        ],
        "connections": {
            "1": { "main": [[ { "node": "ghost", "type": "main", "index": 0 } ]] }
        }
    }));
    let check = adapter.validate(&workflow).await;

    assert!(!check.valid);
    assert!(check.errors.iter().any(|e| e == "AI node 2 is missing API key"));
    assert!(check.errors.iter().any(|e| e.starts_with("Node unknown is missing required fields")));
    assert!(check.errors.iter().any(|e| e.contains("ghost")));
    assert!(!check.errors.iter().any(|e| e.contains("start node")));
}

#[tokio::test]
async fn test_langgraph_validation() {
    let adapter = GraphAgentAdapter::new();

    let cyclic = parse(json!({
        "nodes": [ { "id": "a", "type": "llm" }, { "id": "b", "type": "tool" } ],
        "connections": {
            "a": { "main": [[ { "node": "b" } ]] },
            "b": { "main": [[ { "node": "a" } ]] }
        }
    }));
    let check = adapter.validate(&cyclic).await;
    assert!(!check.valid);
    assert!(check.errors[0].contains("cycle"));

    let dangling = parse(json!({
        "nodes": [ { "id": "a", "type": "llm" } ],
        "connections": { "a": { "main": [[ { "node": "z" } ]] } }
    }));
    let check = adapter.validate(&dangling).await;
    assert_eq!(check.errors, vec!["Edge references unknown node z".to_string()]);
}

#[tokio::test]
async fn test_crewai_validation() {
    let adapter = CrewAdapter::new();

    let no_agents = parse(json!({ "nodes": [ { "id": "t", "type": "crew.task", "parameters": {} } ] }));
    let check = adapter.validate(&no_agents).await;
    assert!(check.errors.contains(&"Crew must have at least one agent".to_string()));
    assert!(check.errors.contains(&"Task t is missing description".to_string()));

    let incomplete = parse(json!({
        "nodes": [ { "id": "w", "name": "Writer", "type": "crew.agent", "parameters": { "role": "writer" } } ]
    }));
    let check = adapter.validate(&incomplete).await;
    assert_eq!(
        check.errors,
        vec!["Agent Writer is missing required fields (role, goal, backstory)".to_string()]
    );
}

#[tokio::test]
async fn test_agno_validation_and_resources() {
    let adapter = AgentAdapter::new();

    let check = adapter
        .validate(&parse(json!({ "nodes": [ { "id": "x", "type": "tool" } ] })))
        .await;
    assert_eq!(check.errors, vec!["Workflow must contain an agent configuration".to_string()]);

    let workflow = parse(json!({
        "nodes": [ { "id": "a", "type": "agno.agent", "parameters": {
            "model": "gpt-4o",
            "tools": "search",
            "multiModal": true,
            "memory": { "type": "vector" }
        } } ]
    }));
    let check = adapter.validate(&workflow).await;
    assert_eq!(check.errors, vec!["Tools must be an array".to_string()]);

    let requirements = adapter.resource_requirements(&workflow).await;
    assert_eq!(requirements.cpu, 6.0);
    assert_eq!(requirements.memory_mb, 4096 + 2048 + 2048);
    assert_eq!(requirements.gpu, Some(2));
}

#[tokio::test]
async fn test_resource_requirements_scale() {
    let nodes: Vec<Value> = (0..12)
        .map(|i| json!({ "id": format!("n{}", i), "type": "n8n-nodes-base.aggregate", "parameters": {} }))
        .collect();
    let workflow = parse(json!({ "nodes": nodes }));

    let n8n = VisualFlowAdapter::new().resource_requirements(&workflow).await;
    assert_eq!(n8n.cpu, 4.0, "2 base + 1 for size + 0.5 heavy, rounded up");
    assert_eq!(n8n.memory_mb, 2048 + 256);
    assert_eq!(n8n.gpu, None);

    let crew = parse(json!({
        "nodes": [
            { "id": "a", "type": "crew.agent", "parameters": { "tools": [ { "type": "llm-search" } ] } },
            { "id": "b", "type": "crew.agent", "parameters": {} }
        ]
    }));
    let requirements = CrewAdapter::new().resource_requirements(&crew).await;
    assert_eq!(requirements.cpu, 4.0);
    assert_eq!(requirements.memory_mb, 3072 + 1024);
    assert_eq!(requirements.gpu, Some(1));
}

#[tokio::test]
async fn test_unreachable_runtime_fails_initialization() {
    let adapter = GraphAgentAdapter::new();
    let err = adapter
        .initialize(&json!({ "runtime_url": "http://127.0.0.1:1", "init_timeout_ms": 2000 }))
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::Initialization(_)));

    let err = adapter
        .initialize(&json!({ "runtime_url": "ftp://runtime" }))
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::Configuration(_)));

    let err = adapter
        .initialize(&json!({ "step_delay_ms": "slow" }))
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::Configuration(_)));
}

#[tokio::test]
async fn test_register_all() {
    let registry = FrameworkRegistry::new();
    register_all(&registry).unwrap();

    let names: Vec<_> = registry.list().iter().map(|f| f.to_string()).collect();
    assert_eq!(names, vec!["agno", "crewai", "langgraph", "n8n"]);

    let n8n = registry.metadata(&FrameworkType::new(FrameworkType::N8N)).unwrap();
    assert!(n8n.capabilities.supports_visual_builder);
    assert_eq!(n8n.capabilities.max_concurrent_executions, 15);

    assert!(register_all(&registry).is_err(), "Built-ins cannot be registered twice");
    assert_eq!(N8N_EXECUTION_ERROR, "N8N_EXECUTION_ERROR");
}
