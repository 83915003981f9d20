// crates/orchcli/src/main.rs

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use orchcore::{
    ExecutionContext, ExecutionEvent, FrameworkType, OrchError, Parameters, ParsedWorkflow,
};
use orchruntime::{inference, ExecutionRequest, FrameworkRegistry, Orchestrator, RuntimeConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "orch")]
#[command(about = "Workflow orchestration CLI", long_about = None)]
struct Cli {
    /// Runtime configuration (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow on a framework backend
    Run {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Target framework (n8n, langgraph, crewai, agno)
        #[arg(long, default_value = FrameworkType::N8N)]
        framework: String,

        /// Parameter values as a JSON object
        #[arg(short, long)]
        params: Option<String>,

        /// Hard execution time bound in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Parse a workflow and print its template parameters and triggers
    Parse {
        file: PathBuf,
    },

    /// Print the inferred parameter catalog of a workflow
    Params {
        file: PathBuf,
    },

    /// Check a workflow against a framework backend's rules
    Validate {
        file: PathBuf,

        #[arg(long, default_value = FrameworkType::N8N)]
        framework: String,
    },

    /// List available framework backends
    Frameworks,
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => RuntimeConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RuntimeConfig::default(),
    };
    tracing::debug!(
        max_document_bytes = config.max_document_bytes,
        default_timeout_ms = config.default_timeout_ms,
        adapters = config.adapters.len(),
        "Loaded runtime config"
    );

    match cli.command {
        Commands::Run {
            file,
            framework,
            params,
            timeout_ms,
        } => run_workflow(config, &file, framework.into(), params, timeout_ms).await?,
        Commands::Parse { file } => parse_workflow(&orchestrator(config)?, &file)?,
        Commands::Params { file } => list_params(&orchestrator(config)?, &file)?,
        Commands::Validate { file, framework } => {
            validate_workflow(config, &file, framework.into()).await?
        }
        Commands::Frameworks => list_frameworks(config)?,
    }

    Ok(())
}

/// Orchestrator over every built-in backend
fn orchestrator(config: RuntimeConfig) -> Result<Orchestrator> {
    let registry = FrameworkRegistry::new();
    orchadapters::register_all(&registry)?;
    Ok(Orchestrator::with_registry(Arc::new(registry), config))
}

fn load(orchestrator: &Orchestrator, file: &Path) -> Result<ParsedWorkflow> {
    let raw = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    Ok(orchestrator.parse(&raw)?)
}

fn parse_params(raw: Option<String>) -> Result<Parameters> {
    let Some(raw) = raw else {
        return Ok(Parameters::new());
    };
    match serde_json::from_str::<serde_json::Value>(&raw)? {
        serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
        _ => bail!("Parameters must be a JSON object"),
    }
}

async fn run_workflow(
    config: RuntimeConfig,
    file: &Path,
    framework: FrameworkType,
    params: Option<String>,
    timeout_ms: Option<u64>,
) -> Result<()> {
    let orchestrator = orchestrator(config)?;
    println!("🚀 Loading workflow from: {}", file.display());
    let workflow = load(&orchestrator, file)?;
    let parameters = parse_params(params)?;

    println!("📋 Workflow");
    println!("   Nodes: {}", workflow.nodes().len());
    println!("   Connections: {}", workflow.connections().len());
    println!("   Parameters: {}", workflow.parameters().len());
    println!();

    orchestrator.start().await?;

    let mut events = orchestrator.subscribe_events();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ExecutionEvent::ExecutionStarted { framework, tags, .. } => {
                    println!("▶️  Execution {} started on {}", tags.execution_id, framework);
                }
                ExecutionEvent::ExecutionCompleted {
                    success,
                    duration_ms,
                    error_code,
                    ..
                } => {
                    if success {
                        println!("✨ Execution completed successfully in {}ms", duration_ms);
                    } else {
                        println!(
                            "💥 Execution failed after {}ms ({})",
                            duration_ms,
                            error_code.unwrap_or_default()
                        );
                    }
                }
                ExecutionEvent::ExecutionCancelled { tags, .. } => {
                    println!("⏹️  Execution {} cancelled", tags.execution_id);
                }
            }
        }
    });

    let mut context = ExecutionContext::new(file.display().to_string());
    if let Some(timeout_ms) = timeout_ms {
        context = context.with_timeout(timeout_ms);
    }

    let catalog = inference::catalog(&workflow);
    let request = ExecutionRequest::new(framework, Arc::new(workflow), context)
        .with_parameters(parameters)
        .with_parameter_configs(catalog);

    let outcome = orchestrator.execute(request).await;

    // Let the event listener drain before the summary.
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    event_task.abort();
    orchestrator.shutdown().await;

    let result = match outcome {
        Ok(result) => result,
        Err(OrchError::ValidationFailed(validation)) => {
            println!("❌ Parameters rejected:");
            for error in &validation.errors {
                println!("   {}: {} ({})", error.field, error.message, error.rule);
            }
            bail!("{} parameter error(s)", validation.errors.len());
        }
        Err(e) => return Err(e.into()),
    };

    println!();
    println!("📊 Execution Summary:");
    println!("   Success: {}", result.success);
    println!("   Time: {}ms", result.execution_time_ms);
    for step in &result.steps {
        println!("   • {} [{:?}]", step.name, step.status);
    }
    if let Some(error) = &result.error {
        println!("   Error: {} ({})", error.message, error.code);
    }

    println!();
    println!("📤 Output:");
    println!("{}", serde_json::to_string_pretty(&result.output)?);

    if !result.success {
        bail!("execution failed");
    }
    Ok(())
}

fn parse_workflow(orchestrator: &Orchestrator, file: &Path) -> Result<()> {
    println!("🔍 Parsing workflow: {}", file.display());
    let workflow = load(orchestrator, file)?;

    println!("✅ Parsed {} node(s)", workflow.nodes().len());
    println!();
    println!("Template parameters:");
    for param in workflow.parameters() {
        println!("  • {} ← {}", param.name, param.resolution_path);
    }
    println!();
    println!("Triggers:");
    for trigger in workflow.triggers() {
        println!(
            "  • {} ({})",
            trigger.node_id.as_deref().unwrap_or("?"),
            trigger.node_type
        );
    }
    Ok(())
}

fn list_params(orchestrator: &Orchestrator, file: &Path) -> Result<()> {
    let workflow = load(orchestrator, file)?;
    let catalog = inference::catalog(&workflow);

    if catalog.is_empty() {
        println!("No template parameters found");
        return Ok(());
    }

    println!("{}", serde_json::to_string_pretty(&catalog)?);
    Ok(())
}

async fn validate_workflow(config: RuntimeConfig, file: &Path, framework: FrameworkType) -> Result<()> {
    let orchestrator = orchestrator(config)?;
    println!("🔍 Validating workflow for {}: {}", framework, file.display());
    let workflow = load(&orchestrator, file)?;

    let check = orchestrator.validate_workflow(&framework, &workflow).await?;
    let requirements = orchestrator.resource_requirements(&framework, &workflow).await?;

    if check.valid {
        println!("✅ Workflow is valid");
    } else {
        println!("❌ Workflow is invalid:");
        for error in &check.errors {
            println!("   {}", error);
        }
    }
    println!(
        "   Requires: {} CPU, {} MB memory, {} GPU",
        requirements.cpu,
        requirements.memory_mb,
        requirements.gpu.unwrap_or(0)
    );

    if !check.valid {
        bail!("{} validation error(s)", check.errors.len());
    }
    Ok(())
}

fn list_frameworks(config: RuntimeConfig) -> Result<()> {
    println!("📦 Available Frameworks:");
    println!();

    let orchestrator = orchestrator(config)?;
    for framework in orchestrator.supported_frameworks() {
        if let Some(metadata) = orchestrator.registry().metadata(&framework) {
            println!("  • {} ({} v{})", framework, metadata.name, metadata.version);
            println!("    {}", metadata.description);
        } else {
            println!("  • {}", framework);
        }
    }
    Ok(())
}
