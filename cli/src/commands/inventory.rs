use clap::Subcommand;
use ledger_core::reference::ResourceKind;
use serde_json::{Map, Value, json};

use crate::api::HttpApi;
use crate::render;
use crate::util::{confirm, exit_error, report_api_error};

#[derive(Subcommand)]
pub enum InventoryCommands {
    /// List agents, tools or tags
    List {
        /// agents, tools or tags
        kind: ResourceKind,
        /// Print the raw rows as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create an agent, tool or tag
    Create {
        /// agents, tools or tags
        kind: ResourceKind,
        /// Display name
        #[arg(long)]
        name: String,
        /// Agent operating system (agents only)
        #[arg(long)]
        os_type: Option<String>,
        /// Agent VM hostname (agents only)
        #[arg(long)]
        vm_hostname: Option<String>,
        /// Tool type, e.g. binary, sdk, docker_image (tools only)
        #[arg(long = "type")]
        tool_type: Option<String>,
        /// Tool category, e.g. build_tool, container (tools only)
        #[arg(long)]
        category: Option<String>,
    },
    /// Delete an agent, tool or tag
    Delete {
        /// agents, tools or tags
        kind: ResourceKind,
        /// Row ID
        id: i64,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

/// Request body for a create, keeping only the fields of `kind`.
fn create_body(
    kind: ResourceKind,
    name: &str,
    os_type: Option<String>,
    vm_hostname: Option<String>,
    tool_type: Option<String>,
    category: Option<String>,
) -> Result<Value, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("--name must not be empty".to_string());
    }
    let mut body = Map::new();
    body.insert("name".to_string(), json!(name));
    let extras = match kind {
        ResourceKind::Agents => vec![("os_type", os_type), ("vm_hostname", vm_hostname)],
        ResourceKind::Tools => vec![
            ("type", Some(tool_type.unwrap_or_else(|| "other".to_string()))),
            ("category", Some(category.unwrap_or_else(|| "other".to_string()))),
        ],
        ResourceKind::Tags => Vec::new(),
    };
    for (key, value) in extras {
        if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
            body.insert(key.to_string(), json!(v.trim()));
        }
    }
    Ok(Value::Object(body))
}

pub async fn run(api_url: &str, token: Option<&str>, command: InventoryCommands) -> i32 {
    let api = HttpApi::new(api_url, token.map(str::to_string));
    match command {
        InventoryCommands::List { kind, json } => match api.list_inventory(kind).await {
            Ok(items) => {
                if json {
                    println!("{}", serde_json::to_string_pretty(&items).unwrap_or_default());
                } else {
                    print!("{}", render::inventory(&items));
                }
                0
            }
            Err(e) => report_api_error(&e),
        },
        InventoryCommands::Create {
            kind,
            name,
            os_type,
            vm_hostname,
            tool_type,
            category,
        } => {
            let body = match create_body(kind, &name, os_type, vm_hostname, tool_type, category) {
                Ok(b) => b,
                Err(e) => exit_error(&e, None),
            };
            match api.create_inventory(kind, &body).await {
                Ok(item) => {
                    tracing::info!(kind = %item.kind(), id = item.id(), "inventory item created");
                    println!("{}", serde_json::to_string_pretty(&item).unwrap_or_default());
                    0
                }
                Err(e) => report_api_error(&e),
            }
        }
        InventoryCommands::Delete { kind, id, yes } => {
            if !yes && !confirm(&format!("Delete {kind} #{id}?")) {
                eprintln!("Cancelled.");
                return 0;
            }
            match api.delete_inventory(kind, id).await {
                Ok(()) => {
                    println!("{}", json!({"status": "deleted", "kind": kind.as_str(), "id": id}));
                    0
                }
                Err(e) => report_api_error(&e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_keeps_only_kind_fields() {
        let body = create_body(
            ResourceKind::Tags,
            " prod ",
            Some("linux".to_string()),
            None,
            Some("sdk".to_string()),
            None,
        )
        .unwrap();
        assert_eq!(body, json!({"name": "prod"}));

        let body = create_body(ResourceKind::Tools, "gradle", None, None, Some("binary".to_string()), None).unwrap();
        assert_eq!(body, json!({"name": "gradle", "type": "binary", "category": "other"}));

        let body = create_body(ResourceKind::Agents, "runner-7", Some("linux".to_string()), Some(" ".to_string()), None, None)
            .unwrap();
        assert_eq!(body, json!({"name": "runner-7", "os_type": "linux"}));
    }

    #[test]
    fn blank_name_is_rejected() {
        assert!(create_body(ResourceKind::Tags, "  ", None, None, None, None).is_err());
    }
}
