use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DispatchError, GatewayError};
use crate::gateway::Gateway;
use crate::views::CertificateRef;

/// Upstream entity categories this adapter fronts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    ProxyHost,
    RedirectionHost,
    DeadHost,
    AccessList,
    Certificate,
}

/// Verbs the dispatcher understands; the endpoint table decides which of
/// them apply to which kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
    Enable,
    Disable,
    Renew,
}

/// One row of the endpoint table.
#[derive(Debug, Clone, Copy)]
pub struct EndpointSpec {
    pub base_path: &'static str,
    pub operations: &'static [Operation],
    /// Boolean fields the upstream insists on receiving as 0/1 for this kind.
    pub bool_to_int_fields: &'static [&'static str],
}

impl EndpointSpec {
    pub fn supports(&self, operation: Operation) -> bool {
        self.operations.contains(&operation)
    }
}

use Operation::{Create, Delete, Disable, Enable, Get, List, Renew, Update};

const HOST_OPERATIONS: &[Operation] = &[List, Get, Create, Update, Delete, Enable, Disable];

impl ResourceKind {
    pub const ALL: [Self; 5] = [
        Self::ProxyHost,
        Self::RedirectionHost,
        Self::DeadHost,
        Self::AccessList,
        Self::Certificate,
    ];

    /// The endpoint-table row for this kind.
    pub const fn spec(self) -> EndpointSpec {
        match self {
            Self::ProxyHost => EndpointSpec {
                base_path: "/nginx/proxy-hosts",
                operations: HOST_OPERATIONS,
                bool_to_int_fields: &[],
            },
            Self::RedirectionHost => EndpointSpec {
                base_path: "/nginx/redirection-hosts",
                operations: HOST_OPERATIONS,
                bool_to_int_fields: &[],
            },
            // Dead hosts are the one kind whose flags the upstream rejects
            // as true/false; they must go out as 0/1.
            Self::DeadHost => EndpointSpec {
                base_path: "/nginx/dead-hosts",
                operations: HOST_OPERATIONS,
                bool_to_int_fields: &[
                    "ssl_forced",
                    "hsts_enabled",
                    "hsts_subdomains",
                    "http2_support",
                ],
            },
            Self::AccessList => EndpointSpec {
                base_path: "/nginx/access-lists",
                operations: &[List, Create, Update, Delete],
                bool_to_int_fields: &[],
            },
            Self::Certificate => EndpointSpec {
                base_path: "/nginx/certificates",
                operations: &[List, Create, Delete, Renew],
                bool_to_int_fields: &[],
            },
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProxyHost => "proxy-host",
            Self::RedirectionHost => "redirection-host",
            Self::DeadHost => "dead-host",
            Self::AccessList => "access-list",
            Self::Certificate => "certificate",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::List => "list",
            Self::Get => "get",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::Renew => "renew",
        };
        f.write_str(name)
    }
}

/// One invocation to resolve against the endpoint table.
#[derive(Debug, Clone)]
pub struct ResourceCall {
    pub kind: ResourceKind,
    pub operation: Operation,
    pub id: Option<u64>,
    pub payload: Option<Value>,
    pub expand: Option<String>,
}

impl ResourceCall {
    pub fn new(kind: ResourceKind, operation: Operation) -> Self {
        Self {
            kind,
            operation,
            id: None,
            payload: None,
            expand: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    #[must_use]
    pub fn with_expand(mut self, expand: Option<String>) -> Self {
        self.expand = expand;
        self
    }
}

/// Resolves one `(kind, operation, id?, payload?)` call to a single Gateway
/// request, per the endpoint table.
///
/// # Errors
///
/// Locally, before any network traffic: [`DispatchError::Unsupported`] for
/// pairs outside the table, [`DispatchError::MissingId`] and
/// [`DispatchError::InvalidPayload`] for malformed calls. Everything else
/// comes from the [`Gateway`] untouched.
pub async fn dispatch(gateway: &Gateway, call: ResourceCall) -> Result<Value, DispatchError> {
    let spec = call.kind.spec();
    if !spec.supports(call.operation) {
        return Err(DispatchError::Unsupported {
            kind: call.kind,
            operation: call.operation,
        });
    }

    let base = spec.base_path;
    match call.operation {
        List => {
            let query: Vec<(&str, &str)> = call
                .expand
                .as_deref()
                .map(|expand| ("expand", expand))
                .into_iter()
                .collect();
            Ok(gateway.get(base, &query).await?)
        }
        Get => {
            let id = require_id(&call)?;
            Ok(gateway.get(&format!("{base}/{id}"), &[]).await?)
        }
        Create => {
            let payload = shaped_payload(&call)?;
            Ok(gateway.post(base, Some(&payload)).await?)
        }
        Update => {
            let id = require_id(&call)?;
            let payload = shaped_payload(&call)?;
            Ok(gateway.put(&format!("{base}/{id}"), Some(&payload)).await?)
        }
        Delete => {
            let id = require_id(&call)?;
            Ok(gateway.delete(&format!("{base}/{id}")).await?)
        }
        Enable => {
            let id = require_id(&call)?;
            Ok(gateway.post(&format!("{base}/{id}/enable"), None).await?)
        }
        Disable => {
            let id = require_id(&call)?;
            Ok(gateway.post(&format!("{base}/{id}/disable"), None).await?)
        }
        Renew => {
            let id = require_id(&call)?;
            Ok(gateway.post(&format!("{base}/{id}/renew"), None).await?)
        }
    }
}

/// Host counts by kind, from `GET /reports/hosts`.
///
/// # Errors
///
/// See [`Gateway::request`].
pub async fn hosts_report(gateway: &Gateway) -> Result<Value, GatewayError> {
    gateway.get("/reports/hosts", &[]).await
}

/// The upstream audit trail, from `GET /audit-log`.
///
/// # Errors
///
/// See [`Gateway::request`].
pub async fn audit_log(gateway: &Gateway) -> Result<Value, GatewayError> {
    gateway.get("/audit-log", &[]).await
}

fn require_id(call: &ResourceCall) -> Result<u64, DispatchError> {
    call.id.ok_or(DispatchError::MissingId {
        operation: call.operation,
    })
}

/// Client-side shaping before a create/update goes out: the payload must be
/// a JSON object, a present `certificate_id` must be an integer or `"new"`,
/// and the kind's quirk fields are rewritten from booleans to 0/1. Callers
/// always submit booleans; everything else passes through untouched.
fn shaped_payload(call: &ResourceCall) -> Result<Value, DispatchError> {
    let Some(payload) = &call.payload else {
        return Err(DispatchError::InvalidPayload {
            reason: format!("'{}' requires a JSON payload", call.operation),
        });
    };
    let Value::Object(fields) = payload else {
        return Err(DispatchError::InvalidPayload {
            reason: "payload must be a JSON object".into(),
        });
    };

    if let Some(reference) = fields.get("certificate_id") {
        if CertificateRef::from_value(reference).is_none() {
            return Err(DispatchError::InvalidPayload {
                reason: format!("certificate_id must be an integer or \"new\", got {reference}"),
            });
        }
    }

    let mut shaped = fields.clone();
    for field in call.kind.spec().bool_to_int_fields {
        let flag = match shaped.get(*field) {
            Some(Value::Bool(b)) => Some(*b),
            _ => None,
        };
        if let Some(flag) = flag {
            shaped.insert((*field).to_string(), Value::from(u8::from(flag)));
        }
    }

    Ok(Value::Object(shaped))
}
