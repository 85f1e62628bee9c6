pub(crate) mod tools;

use std::sync::Arc;

use anyhow::Result;
use log::{debug, info};
use rmcp::ServiceExt;
use rmcp::transport::{
    StreamableHttpServerConfig, stdio,
    streamable_http_server::{StreamableHttpService, session::local::LocalSessionManager},
};
use tokio::sync::RwLock;

use crate::mcp::tools::NpmxTools;
use crate::utils::styles::{fmt_bold, fmt_cyan, fmt_green};
use npmx_client::Gateway;

pub(crate) struct NpmxMcp {
    gateway: Arc<RwLock<Gateway>>,
}

impl NpmxMcp {
    pub(crate) fn new(gateway: Gateway) -> Self {
        Self {
            gateway: Arc::new(RwLock::new(gateway)),
        }
    }

    /// Serves MCP on stdin/stdout until the client disconnects. stdout
    /// belongs to the protocol here; logging stays on stderr.
    pub(crate) async fn serve_stdio(&self) -> Result<()> {
        debug!("Serving MCP over stdio");
        let service = NpmxTools::new(Arc::clone(&self.gateway))
            .serve(stdio())
            .await?;
        service.waiting().await?;
        Ok(())
    }

    pub(crate) async fn serve_http(&self, host: &str, port: u16) -> Result<()> {
        Self::log_banner(host, port);

        let gateway = Arc::clone(&self.gateway);
        let service = StreamableHttpService::new(
            move || Ok(NpmxTools::new(Arc::clone(&gateway))),
            LocalSessionManager::default().into(),
            StreamableHttpServerConfig {
                stateful_mode: false,
                ..Default::default()
            },
        );

        let router = axum::Router::new().nest_service("/mcp", service);
        let tcp_listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;

        let _ = axum::serve(tcp_listener, router)
            .with_graceful_shutdown(async {
                tokio::signal::ctrl_c()
                    .await
                    .expect("failed graceful shutdown");
            })
            .await;

        info!("Shutting down...");
        Ok(())
    }

    fn log_banner(host: &str, port: u16) {
        info!(
            "Listening at {}",
            fmt_cyan(&format!("http://{host}:{port}/mcp"))
        );
        info!(
            "{}: {}",
            fmt_bold("Tools"),
            tools::TOOL_NAMES
                .iter()
                .map(|name| fmt_green(name))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
}
