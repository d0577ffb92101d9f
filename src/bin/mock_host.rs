//! Mock host binary for integration testing
//!
//! Serves the resource channel without a real game runtime: it reports a
//! fixed set of resources and pretends to execute files in them.

use clap::Parser;
use serde_json::{json, Value};

use resource_pipe::common::{logging, paths};
use resource_pipe::ipc::{Command, FrameServer};

#[derive(Parser)]
#[command(name = "mock-host", about = "Mock host for the resource channel")]
struct Args {
    /// Channel name or socket path to listen on
    #[arg(long, default_value = paths::CHANNEL_NAME)]
    channel: String,

    /// Resource to report (repeatable)
    #[arg(long = "resource", short = 'r')]
    resources: Vec<String>,
}

#[tokio::main]
async fn main() {
    logging::init_host();

    let args = Args::parse();

    let server = match FrameServer::bind(&args.channel).await {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let resources = args.resources;
    let handler = move |request: Value| Some(respond(&resources, request));
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    if let Err(e) = server.serve(handler, shutdown).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn respond(resources: &[String], request: Value) -> Value {
    let command: Command = match serde_json::from_value(request) {
        Ok(command) => command,
        Err(e) => return json!({ "error": format!("unknown command: {}", e) }),
    };
    tracing::debug!(cmd = command.name(), "Handling request");

    match command {
        Command::ListResourcesWithRuntimes => Value::Array(
            resources
                .iter()
                .map(|name| json!({ "resource": name }))
                .collect(),
        ),
        Command::ExecuteInResource {
            resource,
            script_file_path,
        } => {
            let known = resources.contains(&resource);
            tracing::info!(%resource, %script_file_path, known, "Execute request");
            let message = if known {
                format!("executed {}", script_file_path)
            } else {
                format!("no runtime in resource {}", resource)
            };
            json!({
                "success": known,
                "resource": resource,
                "message": message,
            })
        }
    }
}
