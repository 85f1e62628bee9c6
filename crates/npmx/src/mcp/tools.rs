use std::sync::Arc;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    schemars, tool, tool_handler, tool_router,
};
use serde_json::Value;
use tokio::sync::RwLock;

use npmx_client::{DispatchError, Gateway, Operation, ResourceCall, ResourceKind, dispatch};

type McpResult<T> = Result<T, McpError>;

/// Every tool this server advertises, in router order.
pub(crate) static TOOL_NAMES: [&str; 12] = [
    "authenticate",
    "auth_status",
    "list_resources",
    "get_resource",
    "create_resource",
    "update_resource",
    "delete_resource",
    "enable_resource",
    "disable_resource",
    "renew_certificate",
    "hosts_report",
    "audit_log",
];

#[derive(Clone)]
pub(crate) struct NpmxTools {
    gateway: Arc<RwLock<Gateway>>,
    tool_router: ToolRouter<NpmxTools>,
}

#[tool_router]
impl NpmxTools {
    pub(crate) fn new(gateway: Arc<RwLock<Gateway>>) -> Self {
        Self {
            gateway,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        title = "Authenticate",
        description = "Authenticate with Nginx Proxy Manager. Call this once before any other tool; the session is shared and expires after about an hour"
    )]
    async fn authenticate(
        &self,
        Parameters(AuthenticateInput { identity, secret }): Parameters<AuthenticateInput>,
    ) -> McpResult<CallToolResult> {
        let mut gateway = self.gateway.write().await;
        match gateway.authenticate(&identity, &secret).await {
            Ok(()) => {
                let expiry = gateway
                    .auth_status()
                    .expires_at
                    .unwrap_or_else(|| "unknown".into());
                Ok(CallToolResult::success(vec![Content::text(format!(
                    "Authentication successful. Session expires at {expiry}"
                ))]))
            }
            Err(err) => Ok(tool_error(&err.into())),
        }
    }

    #[tool(
        title = "Authentication Status",
        description = "Report whether a session is active and when it expires. Local check only, no network traffic"
    )]
    async fn auth_status(&self) -> McpResult<CallToolResult> {
        let gateway = self.gateway.read().await;
        let status = serde_json::to_value(gateway.auth_status())
            .map_err(|err| McpError::internal_error(err.to_string(), None))?;
        Ok(render(&status))
    }

    #[tool(
        title = "List Resources",
        description = "List all entries of one resource kind: proxy-host, redirection-host, dead-host, access-list or certificate"
    )]
    async fn list_resources(
        &self,
        Parameters(ListResourcesInput { kind, expand }): Parameters<ListResourcesInput>,
    ) -> McpResult<CallToolResult> {
        self.dispatch_call(ResourceCall::new(kind.into(), Operation::List).with_expand(expand))
            .await
    }

    #[tool(
        title = "Get Resource",
        description = "Fetch one entry by id. Supported for proxy-host, redirection-host and dead-host"
    )]
    async fn get_resource(
        &self,
        Parameters(ResourceIdInput { kind, id }): Parameters<ResourceIdInput>,
    ) -> McpResult<CallToolResult> {
        self.dispatch_call(ResourceCall::new(kind.into(), Operation::Get).with_id(id))
            .await
    }

    #[tool(
        title = "Create Resource",
        description = "Create an entry of the given kind from a JSON payload with the fields the upstream expects, e.g. domain_names and forward_host/forward_port for a proxy-host"
    )]
    async fn create_resource(
        &self,
        Parameters(CreateResourceInput { kind, payload }): Parameters<CreateResourceInput>,
    ) -> McpResult<CallToolResult> {
        self.dispatch_call(ResourceCall::new(kind.into(), Operation::Create).with_payload(payload))
            .await
    }

    #[tool(
        title = "Update Resource",
        description = "Update an entry by id from a JSON payload with the fields to change. Certificates cannot be updated"
    )]
    async fn update_resource(
        &self,
        Parameters(UpdateResourceInput { kind, id, payload }): Parameters<UpdateResourceInput>,
    ) -> McpResult<CallToolResult> {
        self.dispatch_call(
            ResourceCall::new(kind.into(), Operation::Update)
                .with_id(id)
                .with_payload(payload),
        )
        .await
    }

    #[tool(title = "Delete Resource", description = "Delete an entry by id")]
    async fn delete_resource(
        &self,
        Parameters(ResourceIdInput { kind, id }): Parameters<ResourceIdInput>,
    ) -> McpResult<CallToolResult> {
        self.dispatch_call(ResourceCall::new(kind.into(), Operation::Delete).with_id(id))
            .await
    }

    #[tool(
        title = "Enable Resource",
        description = "Enable a host entry by id. Supported for proxy-host, redirection-host and dead-host"
    )]
    async fn enable_resource(
        &self,
        Parameters(ResourceIdInput { kind, id }): Parameters<ResourceIdInput>,
    ) -> McpResult<CallToolResult> {
        self.dispatch_call(ResourceCall::new(kind.into(), Operation::Enable).with_id(id))
            .await
    }

    #[tool(
        title = "Disable Resource",
        description = "Disable a host entry by id without deleting it. Supported for proxy-host, redirection-host and dead-host"
    )]
    async fn disable_resource(
        &self,
        Parameters(ResourceIdInput { kind, id }): Parameters<ResourceIdInput>,
    ) -> McpResult<CallToolResult> {
        self.dispatch_call(ResourceCall::new(kind.into(), Operation::Disable).with_id(id))
            .await
    }

    #[tool(
        title = "Renew Certificate",
        description = "Ask the upstream to renew a certificate now"
    )]
    async fn renew_certificate(
        &self,
        Parameters(CertificateIdInput { id }): Parameters<CertificateIdInput>,
    ) -> McpResult<CallToolResult> {
        self.dispatch_call(
            ResourceCall::new(ResourceKind::Certificate, Operation::Renew).with_id(id),
        )
        .await
    }

    #[tool(
        title = "Hosts Report",
        description = "Host counts by kind as reported by the upstream"
    )]
    async fn hosts_report(&self) -> McpResult<CallToolResult> {
        let gateway = self.gateway.read().await;
        match npmx_client::hosts_report(&gateway).await {
            Ok(report) => Ok(render(&report)),
            Err(err) => Ok(tool_error(&err.into())),
        }
    }

    #[tool(
        title = "Audit Log",
        description = "The upstream audit trail of configuration changes"
    )]
    async fn audit_log(&self) -> McpResult<CallToolResult> {
        let gateway = self.gateway.read().await;
        match npmx_client::audit_log(&gateway).await {
            Ok(log) => Ok(render(&log)),
            Err(err) => Ok(tool_error(&err.into())),
        }
    }

    async fn dispatch_call(&self, call: ResourceCall) -> McpResult<CallToolResult> {
        let gateway = self.gateway.read().await;
        match dispatch(&gateway, call).await {
            Ok(value) => Ok(render(&value)),
            Err(err) => Ok(tool_error(&err)),
        }
    }
}

/// Upstream failures come back as tool errors with the message intact, so
/// the model can react (e.g. authenticate again) instead of the call
/// failing at the protocol level.
fn tool_error(err: &DispatchError) -> CallToolResult {
    let mut message = err.to_string();
    // A bare 401 line does not say what to do next.
    if err.requires_authentication() && !message.contains("authenticate") {
        message.push_str(". Call the authenticate tool to start a new session");
    }
    CallToolResult::error(vec![Content::text(message)])
}

fn render(value: &Value) -> CallToolResult {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    CallToolResult::success(vec![Content::text(text)])
}

/// [`ResourceKind`] restated for tool schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum ResourceKindArg {
    ProxyHost,
    RedirectionHost,
    DeadHost,
    AccessList,
    Certificate,
}

impl From<ResourceKindArg> for ResourceKind {
    fn from(kind: ResourceKindArg) -> Self {
        match kind {
            ResourceKindArg::ProxyHost => Self::ProxyHost,
            ResourceKindArg::RedirectionHost => Self::RedirectionHost,
            ResourceKindArg::DeadHost => Self::DeadHost,
            ResourceKindArg::AccessList => Self::AccessList,
            ResourceKindArg::Certificate => Self::Certificate,
        }
    }
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub(crate) struct AuthenticateInput {
    /// Login identity, usually the admin email address
    pub identity: String,
    /// Login secret (password)
    pub secret: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub(crate) struct ListResourcesInput {
    /// Which resource collection to list
    pub kind: ResourceKindArg,
    /// Comma-separated related objects to inline, e.g. "owner,certificate"
    pub expand: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub(crate) struct ResourceIdInput {
    /// Which resource collection the entry belongs to
    pub kind: ResourceKindArg,
    /// Upstream id of the entry
    pub id: u64,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub(crate) struct CreateResourceInput {
    /// Which resource collection to create the entry in
    pub kind: ResourceKindArg,
    /// JSON object with the fields the upstream expects for this kind
    pub payload: Value,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub(crate) struct UpdateResourceInput {
    /// Which resource collection the entry belongs to
    pub kind: ResourceKindArg,
    /// Upstream id of the entry
    pub id: u64,
    /// JSON object with the fields to change
    pub payload: Value,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub(crate) struct CertificateIdInput {
    /// Upstream id of the certificate to renew
    pub id: u64,
}

#[tool_handler]
impl ServerHandler for NpmxTools {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "This server administers a Nginx Proxy Manager instance: proxy hosts, \
                 redirection hosts, 404 hosts, access lists and certificates. \
                 Call the authenticate tool once before using any other tool."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn tools_for(url: &str) -> NpmxTools {
        let gateway = Gateway::new(Url::parse(url).unwrap()).unwrap();
        NpmxTools::new(Arc::new(RwLock::new(gateway)))
    }

    #[test]
    fn test_kind_argument_covers_every_kind() {
        let pairs = [
            (ResourceKindArg::ProxyHost, ResourceKind::ProxyHost),
            (
                ResourceKindArg::RedirectionHost,
                ResourceKind::RedirectionHost,
            ),
            (ResourceKindArg::DeadHost, ResourceKind::DeadHost),
            (ResourceKindArg::AccessList, ResourceKind::AccessList),
            (ResourceKindArg::Certificate, ResourceKind::Certificate),
        ];
        for (arg, kind) in pairs {
            assert_eq!(ResourceKind::from(arg), kind);
        }
    }

    #[test]
    fn test_kind_argument_reads_kebab_case() {
        let kind: ResourceKindArg = serde_json::from_str("\"proxy-host\"").unwrap();
        assert_eq!(kind, ResourceKindArg::ProxyHost);
        let kind: ResourceKindArg = serde_json::from_str("\"access-list\"").unwrap();
        assert_eq!(kind, ResourceKindArg::AccessList);
        assert!(serde_json::from_str::<ResourceKindArg>("\"ProxyHost\"").is_err());
    }

    #[tokio::test]
    async fn test_calls_error_as_content_not_protocol_failures() {
        let tools = tools_for("http://127.0.0.1:1/api");

        let status = tools.auth_status().await.unwrap();
        assert_eq!(status.is_error, Some(false));

        let listing = tools
            .list_resources(Parameters(ListResourcesInput {
                kind: ResourceKindArg::ProxyHost,
                expand: None,
            }))
            .await
            .unwrap();
        assert_eq!(
            listing.is_error,
            Some(true),
            "No session yet, so the tool reports the error in-band"
        );
    }
}
