use anyhow::Result;
use camino::Utf8Path;
use clap::Parser;
use log::info;
use npmx_config::{Config, secret};

use crate::commands::{connect, persist_session, session_store};
use crate::utils::styles::{fmt_bold, fmt_dimmed, fmt_success};

#[derive(Debug, Clone, Parser)]
pub struct AuthCmd {
    /// Login identity (admin email), prompted for when omitted
    #[arg(long, short)]
    pub identity: Option<String>,

    /// Secret or secret reference, prompted for when omitted
    #[arg(long, short)]
    pub secret: Option<String>,

    /// Also write the identity and secret reference into the config file
    #[arg(long)]
    pub save: bool,
}

impl AuthCmd {
    pub(crate) async fn handle(&self, mut cfg: Config, config_path: &Utf8Path) -> Result<()> {
        let identity = match self.identity.clone().or_else(|| cfg.identity.clone()) {
            Some(identity) => identity,
            None => inquire::Text::new("Identity (email):")
                .with_validator(inquire::required!("identity is required"))
                .prompt()?,
        };
        let reference = match self.secret.clone().or_else(|| cfg.secret.clone()) {
            Some(reference) => reference,
            None => inquire::Password::new("Secret:")
                .without_confirmation()
                .prompt()?,
        };
        let resolved = secret::resolve(&reference).await?;

        let mut gateway = connect(&cfg)?;
        gateway.authenticate(&identity, &resolved).await?;
        persist_session(&gateway, &mut session_store(config_path));

        if self.save {
            cfg.identity = Some(identity.clone());
            cfg.secret = Some(reference);
            cfg.save(config_path)?;
        }

        let expiry = gateway
            .auth_status()
            .expires_at
            .unwrap_or_else(|| "unknown".into());
        info!(
            "{}",
            fmt_success(&format!(
                "Authenticated as {identity}, session valid until {expiry}",
                identity = fmt_bold(&identity),
                expiry = fmt_dimmed(&expiry),
            ))
        );
        Ok(())
    }
}
