pub mod commands;
pub mod mcp;
pub mod utils;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

use crate::commands::{
    audit::AuditCmd,
    auth::AuthCmd,
    config::ConfigCmd,
    logout::LogoutCmd,
    report::ReportCmd,
    resource::{AccessAction, CertAction, HostAction},
    serve::ServeCmd,
    status::StatusCmd,
};
use npmx_client::ResourceKind;
use npmx_config::Config;

#[derive(Parser)]
#[command(name = "npmx")]
#[command(version)]
#[command(about = "NPMX - Nginx Proxy Manager over MCP")]
#[command(
    long_about = "NPMX administers a Nginx Proxy Manager instance from the command line and exposes the \
same operations as MCP tools, sharing one authenticated session across every call."
)]
#[command(after_help = "EXAMPLES:\n  \
    npmx auth\n  \
    npmx proxy list --expand owner,certificate\n  \
    npmx proxy create '{\"domain_names\":[\"app.example.com\"],\"forward_host\":\"10.0.0.5\",\"forward_port\":8080}'\n  \
    npmx cert renew 12\n  \
    npmx serve --http --port 8080\n\
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path, defaults to ~/.npmx/config.toml
    #[arg(long, short = 'c', global = true, default_value_t = Config::default_path())]
    pub config: Utf8PathBuf,

    /// No logging except for errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Verbose logging (-v) or trace logging (-vv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl Cli {
    #[allow(clippy::missing_errors_doc)]
    pub async fn handle(&self) -> anyhow::Result<()> {
        let cfg = Config::load(&self.config);

        match &self.command {
            Commands::Config(cmd) => cmd.handle(cfg?, &self.config),
            Commands::Auth(cmd) => cmd.handle(cfg?, &self.config).await,
            Commands::Status(cmd) => cmd.handle(&cfg?, &self.config),
            Commands::Logout(cmd) => cmd.handle(&self.config),
            Commands::Proxy(action) => {
                let call = action.clone().into_call(ResourceKind::ProxyHost)?;
                commands::resource::run(cfg?, &self.config, call).await
            }
            Commands::Redirect(action) => {
                let call = action.clone().into_call(ResourceKind::RedirectionHost)?;
                commands::resource::run(cfg?, &self.config, call).await
            }
            Commands::Dead(action) => {
                let call = action.clone().into_call(ResourceKind::DeadHost)?;
                commands::resource::run(cfg?, &self.config, call).await
            }
            Commands::Access(action) => {
                let call = action.clone().into_call()?;
                commands::resource::run(cfg?, &self.config, call).await
            }
            Commands::Cert(action) => {
                let call = action.clone().into_call()?;
                commands::resource::run(cfg?, &self.config, call).await
            }
            Commands::Report(cmd) => cmd.handle(cfg?, &self.config).await,
            Commands::Audit(cmd) => cmd.handle(cfg?, &self.config).await,
            Commands::Serve(cmd) => cmd.handle(cfg?).await,
        }
    }
}

#[derive(Debug, Subcommand)]
#[command(styles=utils::styles::get_styles())]
pub enum Commands {
    /// Show or change the stored configuration
    #[command(long_about = "Show or change the configuration at ~/.npmx/config.toml.")]
    Config(ConfigCmd),

    /// Sign in to the upstream and save the session
    #[command(
        long_about = "Trade credentials for an API token and save the session for later commands."
    )]
    Auth(AuthCmd),

    /// Show connection and session status
    Status(StatusCmd),

    /// Forget the saved session
    Logout(LogoutCmd),

    /// Manage proxy hosts
    #[command(subcommand)]
    Proxy(HostAction),

    /// Manage redirection hosts
    #[command(subcommand)]
    Redirect(HostAction),

    /// Manage 404 hosts
    #[command(subcommand)]
    Dead(HostAction),

    /// Manage access lists
    #[command(subcommand)]
    Access(AccessAction),

    /// Manage certificates
    #[command(subcommand)]
    Cert(CertAction),

    /// Host statistics from the upstream
    Report(ReportCmd),

    /// Upstream audit log
    Audit(AuditCmd),

    /// Run the MCP server
    #[command(
        long_about = "Run the MCP server over stdio, or over streamable HTTP with --http (exposes /mcp)."
    )]
    Serve(ServeCmd),
}
