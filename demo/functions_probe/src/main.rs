mod config;
use blaxel_toolkit::control_plane::StoreFunctionParameter;
use blaxel_toolkit::{
    FunctionRegistry, GetFunctionsOptions, Handler, LocalFunction, Settings, ToolkitContext,
};
use config::ProbeConfig;
use serde_json::json;
use tracing::{info, warn};

fn local_examples() -> FunctionRegistry {
    let mut registry = FunctionRegistry::new();
    registry.register_function(
        LocalFunction::new(
            "Hello World",
            Handler::sync(|args| {
                let name = args["name"].as_str().unwrap_or("world");
                Ok(json!(format!("Hello, {}!", name)))
            }),
        )
        .description("Greet someone by name")
        .parameter(StoreFunctionParameter::new("name", "string").description("Who to greet")),
    );
    registry
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load()?;

    // Logging / tracing
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        format!(
            "{},blaxel_toolkit={}",
            settings.log_level, settings.log_level
        )
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cfg = ProbeConfig::load(&args);
    info!(
        target: "functions_probe",
        workspace = %settings.workspace,
        remote = cfg.remote_functions.len(),
        local = cfg.local_functions.len(),
        chain = cfg.chain.len(),
        "Resolving functions"
    );

    let ctx = ToolkitContext::new(settings);
    let options = GetFunctionsOptions {
        registry: cfg.with_local_examples.then(local_examples),
        remote_functions: cfg.remote_functions.clone(),
        local_functions: cfg.local_functions.clone(),
        chain: cfg.chain.clone(),
        warning: cfg.warning,
    };
    let tools = blaxel_toolkit::get_functions(ctx, options).await;
    if tools.is_empty() {
        warn!(target: "functions_probe", "No functions resolved");
    }

    let catalog: Vec<_> = tools.iter().map(|t| t.to_openai_schema()).collect();
    println!("{}", serde_json::to_string_pretty(&catalog)?);

    if let Some(hello) = tools.iter().find(|t| t.name == "hello-world") {
        let reply = hello.invoke(json!({"name": "probe"})).await?;
        info!(target: "functions_probe", reply = %reply, "Local function check");
    }
    Ok(())
}
