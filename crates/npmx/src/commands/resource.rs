use anyhow::{Context, Result};
use camino::Utf8Path;
use clap::Subcommand;
use log::info;
use npmx_client::{Operation, ResourceCall, ResourceKind, ResourceSummary, dispatch};
use npmx_config::Config;
use serde_json::Value;

use crate::commands::{connect, ensure_authenticated, session_store};
use crate::utils::styles::{fmt_cyan, fmt_success};

/// Verbs shared by proxy, redirection and 404 hosts.
#[derive(Debug, Clone, Subcommand)]
pub enum HostAction {
    /// List entries
    List {
        /// Comma-separated related objects to inline, e.g. "owner,certificate"
        #[arg(long)]
        expand: Option<String>,
    },
    /// Fetch one entry
    Get {
        /// Upstream id of the entry
        id: u64,
    },
    /// Create an entry from a JSON object
    Create {
        /// Fields the upstream expects for this kind, as JSON
        json: String,
    },
    /// Update an entry from a JSON object
    Update {
        /// Upstream id of the entry
        id: u64,
        /// Fields to change, as JSON
        json: String,
    },
    /// Delete an entry
    Delete {
        /// Upstream id of the entry
        id: u64,
    },
    /// Enable an entry
    Enable {
        /// Upstream id of the entry
        id: u64,
    },
    /// Disable an entry
    Disable {
        /// Upstream id of the entry
        id: u64,
    },
}

impl HostAction {
    pub(crate) fn into_call(self, kind: ResourceKind) -> Result<ResourceCall> {
        match self {
            Self::List { expand } => {
                Ok(ResourceCall::new(kind, Operation::List).with_expand(expand))
            }
            Self::Get { id } => Ok(ResourceCall::new(kind, Operation::Get).with_id(id)),
            Self::Create { json } => {
                Ok(ResourceCall::new(kind, Operation::Create).with_payload(parse_payload(&json)?))
            }
            Self::Update { id, json } => Ok(ResourceCall::new(kind, Operation::Update)
                .with_id(id)
                .with_payload(parse_payload(&json)?)),
            Self::Delete { id } => Ok(ResourceCall::new(kind, Operation::Delete).with_id(id)),
            Self::Enable { id } => Ok(ResourceCall::new(kind, Operation::Enable).with_id(id)),
            Self::Disable { id } => Ok(ResourceCall::new(kind, Operation::Disable).with_id(id)),
        }
    }
}

/// Access lists have no single fetch and no enabled flag upstream.
#[derive(Debug, Clone, Subcommand)]
pub enum AccessAction {
    /// List access lists
    List {
        /// Comma-separated related objects to inline, e.g. "owner,items"
        #[arg(long)]
        expand: Option<String>,
    },
    /// Create an access list from a JSON object
    Create {
        /// Fields the upstream expects, as JSON
        json: String,
    },
    /// Update an access list from a JSON object
    Update {
        /// Upstream id of the access list
        id: u64,
        /// Fields to change, as JSON
        json: String,
    },
    /// Delete an access list
    Delete {
        /// Upstream id of the access list
        id: u64,
    },
}

impl AccessAction {
    pub(crate) fn into_call(self) -> Result<ResourceCall> {
        let kind = ResourceKind::AccessList;
        match self {
            Self::List { expand } => {
                Ok(ResourceCall::new(kind, Operation::List).with_expand(expand))
            }
            Self::Create { json } => {
                Ok(ResourceCall::new(kind, Operation::Create).with_payload(parse_payload(&json)?))
            }
            Self::Update { id, json } => Ok(ResourceCall::new(kind, Operation::Update)
                .with_id(id)
                .with_payload(parse_payload(&json)?)),
            Self::Delete { id } => Ok(ResourceCall::new(kind, Operation::Delete).with_id(id)),
        }
    }
}

/// Certificates are immutable upstream; they are replaced or renewed, never
/// updated.
#[derive(Debug, Clone, Subcommand)]
pub enum CertAction {
    /// List certificates
    List {
        /// Comma-separated related objects to inline, e.g. "owner"
        #[arg(long)]
        expand: Option<String>,
    },
    /// Request or upload a certificate from a JSON object
    Create {
        /// Fields the upstream expects, as JSON
        json: String,
    },
    /// Delete a certificate
    Delete {
        /// Upstream id of the certificate
        id: u64,
    },
    /// Renew a certificate
    Renew {
        /// Upstream id of the certificate
        id: u64,
    },
}

impl CertAction {
    pub(crate) fn into_call(self) -> Result<ResourceCall> {
        let kind = ResourceKind::Certificate;
        match self {
            Self::List { expand } => {
                Ok(ResourceCall::new(kind, Operation::List).with_expand(expand))
            }
            Self::Create { json } => {
                Ok(ResourceCall::new(kind, Operation::Create).with_payload(parse_payload(&json)?))
            }
            Self::Delete { id } => Ok(ResourceCall::new(kind, Operation::Delete).with_id(id)),
            Self::Renew { id } => Ok(ResourceCall::new(kind, Operation::Renew).with_id(id)),
        }
    }
}

/// Runs one resolved call against the upstream and prints the outcome.
pub(crate) async fn run(cfg: Config, config_path: &Utf8Path, call: ResourceCall) -> Result<()> {
    let mut gateway = connect(&cfg)?;
    ensure_authenticated(&mut gateway, &cfg, &mut session_store(config_path)).await?;

    let kind = call.kind;
    let operation = call.operation;
    let id = call.id;
    let result = dispatch(&gateway, call).await?;

    match operation {
        Operation::Delete | Operation::Enable | Operation::Disable => {
            let entry = id.map_or_else(String::new, |id| format!(" #{id}"));
            info!("{}", fmt_success(&format!("{kind}{entry} {operation}d")));
        }
        Operation::Create => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            if let Some(summary) = ResourceSummary::from_value(&result) {
                info!(
                    "{}",
                    fmt_success(&format!(
                        "Created {kind} #{id}: {label}",
                        id = summary.id,
                        label = fmt_cyan(&summary.label()),
                    ))
                );
            }
        }
        _ => println!("{}", serde_json::to_string_pretty(&result)?),
    }
    Ok(())
}

fn parse_payload(json: &str) -> Result<Value> {
    serde_json::from_str(json).context("Payload is not valid JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_host_actions_map_onto_calls() {
        let call = HostAction::Get { id: 7 }
            .into_call(ResourceKind::ProxyHost)
            .unwrap();
        assert_eq!(call.kind, ResourceKind::ProxyHost);
        assert_eq!(call.operation, Operation::Get);
        assert_eq!(call.id, Some(7));

        let call = HostAction::List {
            expand: Some("owner".into()),
        }
        .into_call(ResourceKind::DeadHost)
        .unwrap();
        assert_eq!(call.operation, Operation::List);
        assert_eq!(call.expand.as_deref(), Some("owner"));

        let call = HostAction::Create {
            json: r#"{"domain_names":["a.example.com"]}"#.into(),
        }
        .into_call(ResourceKind::RedirectionHost)
        .unwrap();
        assert_eq!(call.payload, Some(json!({"domain_names": ["a.example.com"]})));
    }

    #[test]
    fn test_fixed_kind_actions_use_their_kind() {
        let call = AccessAction::Delete { id: 3 }.into_call().unwrap();
        assert_eq!(call.kind, ResourceKind::AccessList);
        assert_eq!(call.operation, Operation::Delete);

        let call = CertAction::Renew { id: 12 }.into_call().unwrap();
        assert_eq!(call.kind, ResourceKind::Certificate);
        assert_eq!(call.operation, Operation::Renew);
        assert_eq!(call.id, Some(12));
    }

    #[test]
    fn test_malformed_payloads_fail_before_any_call() {
        let err = HostAction::Create {
            json: "{not json".into(),
        }
        .into_call(ResourceKind::ProxyHost)
        .expect_err("payload is not JSON");
        assert!(err.to_string().contains("not valid JSON"));
    }
}
