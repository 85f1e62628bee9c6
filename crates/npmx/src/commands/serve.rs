use anyhow::Result;
use clap::Parser;
use npmx_config::Config;

use crate::commands::connect;
use crate::mcp::NpmxMcp;

#[derive(Debug, Clone, Parser)]
pub struct ServeCmd {
    /// Serve over streamable HTTP instead of stdio
    #[arg(long)]
    pub http: bool,

    /// Port to listen on with --http
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Host address to bind to (use 0.0.0.0 for external access)
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,
}

impl ServeCmd {
    /// The server starts unauthenticated; clients call the authenticate
    /// tool before anything else.
    pub(crate) async fn handle(&self, cfg: Config) -> Result<()> {
        let mcp = NpmxMcp::new(connect(&cfg)?);
        if self.http {
            mcp.serve_http(&self.host, self.port).await
        } else {
            mcp.serve_stdio().await
        }
    }
}
