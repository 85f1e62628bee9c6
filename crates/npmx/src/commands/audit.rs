use anyhow::Result;
use camino::Utf8Path;
use clap::Parser;
use npmx_config::Config;

use crate::commands::{connect, ensure_authenticated, session_store};

#[derive(Debug, Clone, Parser)]
pub struct AuditCmd;

impl AuditCmd {
    pub(crate) async fn handle(&self, cfg: Config, config_path: &Utf8Path) -> Result<()> {
        let mut gateway = connect(&cfg)?;
        ensure_authenticated(&mut gateway, &cfg, &mut session_store(config_path)).await?;

        let log = npmx_client::audit_log(&gateway).await?;
        println!("{}", serde_json::to_string_pretty(&log)?);
        Ok(())
    }
}
