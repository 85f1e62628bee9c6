use anyhow::Result;
use camino::Utf8Path;
use clap::Parser;
use log::info;
use npmx_client::SessionStore;

use crate::commands::session_store;
use crate::utils::styles::fmt_success;

#[derive(Debug, Clone, Parser)]
pub struct LogoutCmd;

impl LogoutCmd {
    /// Forgets the saved session. The token itself stays valid upstream
    /// until it expires.
    pub(crate) fn handle(&self, config_path: &Utf8Path) -> Result<()> {
        session_store(config_path).clear()?;
        info!("{}", fmt_success("Session cleared"));
        Ok(())
    }
}
