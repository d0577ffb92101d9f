//! IPC protocol message types
//!
//! Requests are JSON objects tagged by their `cmd` field. Responses are
//! opaque JSON documents; only the resource listing has a shape the
//! client relies on.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Commands that can be sent to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Enumerate resources that currently have a script runtime
    ListResourcesWithRuntimes,

    /// Load and execute a file inside the named resource's runtime
    ExecuteInResource {
        resource: String,
        #[serde(rename = "scriptFilePath")]
        script_file_path: String,
    },
}

impl Command {
    /// Wire name of the command
    pub fn name(&self) -> &'static str {
        match self {
            Self::ListResourcesWithRuntimes => "list_resources_with_runtimes",
            Self::ExecuteInResource { .. } => "execute_in_resource",
        }
    }
}

/// One entry of the `list_resources_with_runtimes` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub resource: String,
}

/// Extract resource names from a `list_resources_with_runtimes` response
///
/// Entries without a string `resource` field are skipped. A response that
/// is not an array yields an empty list.
pub fn resource_names(response: &Value) -> Vec<String> {
    let Some(entries) = response.as_array() else {
        tracing::warn!(%response, "Resource listing is not an array");
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match ResourceInfo::deserialize(entry) {
            Ok(info) => Some(info.resource),
            Err(e) => {
                tracing::warn!(%entry, "Skipping malformed resource entry: {}", e);
                None
            }
        })
        .collect()
}
