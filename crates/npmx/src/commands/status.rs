use anyhow::Result;
use camino::Utf8Path;
use clap::Parser;
use npmx_client::{AuthStatus, SessionStore};
use npmx_config::Config;
use serde_json::json;

use crate::commands::session_store;

#[derive(Debug, Clone, Parser)]
pub struct StatusCmd;

impl StatusCmd {
    /// Purely local: reads the saved session and the clock, never the
    /// network.
    pub(crate) fn handle(&self, cfg: &Config, config_path: &Utf8Path) -> Result<()> {
        let saved = session_store(config_path).load()?;
        let status = match &saved {
            Some(saved) if saved.matches_base(&cfg.base_url) => {
                AuthStatus::of(Some(&saved.session))
            }
            _ => AuthStatus::of(None),
        };

        let report = json!({
            "base_url": cfg.base_url.as_str(),
            "authenticated": status.authenticated,
            "expires_at": status.expires_at,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}
