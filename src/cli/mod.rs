//! CLI command handling
//!
//! Connects to the host, sends one command and formats the output. This is
//! the caller side of the session: it resolves files, degrades a missing
//! listing to an empty one and decides how failures are shown.

use serde_json::Value;
use std::path::Path;

use crate::commands::{Commands, ConnectionArgs};
use crate::common::{config::Config, Error, Result};
use crate::ipc::{protocol, PipeSession, ResourceChannel};

/// Dispatch a CLI command
pub async fn dispatch(args: ConnectionArgs, command: Commands) -> Result<()> {
    let mut config = Config::load()?;
    apply_overrides(&mut config, &args);

    let mut session: PipeSession = PipeSession::from_config(&config);
    session.connect(config.connect_timeout()).await?;

    match command {
        Commands::List => {
            let names = list_names(&mut session).await?;

            if names.is_empty() {
                println!("No resources");
            } else {
                for name in &names {
                    println!("{}", name);
                }
            }
        }

        Commands::Exec { resource, file } => {
            let response = execute_file(&mut session, &resource, &file).await?;
            print_response(response.as_ref())?;
        }

        Commands::Raw { json } => {
            let command = parse_raw_command(&json)?;
            let response = session.request(&command).await?;
            print_response(response.as_ref())?;
        }
    }

    session.close();
    Ok(())
}

/// Apply command-line flags on top of the loaded configuration
fn apply_overrides(config: &mut Config, args: &ConnectionArgs) {
    if let Some(channel) = &args.channel {
        config.channel.name = channel.clone();
    }
    if let Some(ms) = args.connect_timeout_ms {
        config.timeouts.connect_ms = ms;
    }
    if let Some(secs) = args.request_timeout_secs {
        config.timeouts.request_secs = secs;
    }
}

/// Names of resources that have a runtime
///
/// A host that hangs up without answering yields an empty list.
pub async fn list_names<C>(channel: &mut C) -> Result<Vec<String>>
where
    C: ResourceChannel + ?Sized,
{
    Ok(channel
        .list_resources()
        .await?
        .map(|response| protocol::resource_names(&response))
        .unwrap_or_default())
}

/// Resolve `file` to an absolute path and execute it inside `resource`
pub async fn execute_file<C>(channel: &mut C, resource: &str, file: &Path) -> Result<Option<Value>>
where
    C: ResourceChannel + ?Sized,
{
    if resource.is_empty() {
        return Err(Error::invalid_argument("resource name must not be empty"));
    }

    if !file.is_file() {
        return Err(Error::FileRead {
            path: file.display().to_string(),
            error: "not an existing file".to_string(),
        });
    }

    let absolute = std::path::absolute(file).map_err(|e| Error::FileRead {
        path: file.display().to_string(),
        error: e.to_string(),
    })?;
    let path = absolute
        .to_str()
        .ok_or_else(|| Error::invalid_argument("file path is not valid UTF-8"))?;

    tracing::info!(resource, path, "Executing file");
    channel.execute_in_resource(resource, path).await
}

/// Parse a raw command; it must be an object with a string `cmd` field
fn parse_raw_command(json: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(json)?;

    match value.get("cmd") {
        Some(Value::String(_)) => Ok(value),
        _ => Err(Error::invalid_argument(
            "raw command must be a JSON object with a string \"cmd\" field",
        )),
    }
}

fn print_response(response: Option<&Value>) -> Result<()> {
    match response {
        Some(response) => println!("{}", serde_json::to_string_pretty(response)?),
        None => println!("Host closed the connection without responding"),
    }
    Ok(())
}
