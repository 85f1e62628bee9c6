use anyhow::Result;
use camino::Utf8Path;
use clap::Parser;
use log::info;
use npmx_config::Config;
use serde_json::json;
use url::Url;

use crate::utils::styles::{fmt_dimmed, fmt_success};

#[derive(Debug, Clone, Parser)]
pub struct ConfigCmd {
    /// Set the upstream API address, e.g. http://localhost:81/api
    #[arg(long, short)]
    pub url: Option<Url>,

    /// Set the login identity (admin email)
    #[arg(long, short)]
    pub identity: Option<String>,

    /// Set the secret reference: a literal secret, ${VAR},
    /// keychain://service/account or command://...
    #[arg(long, short)]
    pub secret: Option<String>,

    /// Set the fallback token lifetime in seconds
    #[arg(long)]
    pub token_ttl: Option<u64>,
}

impl ConfigCmd {
    pub(crate) fn handle(&self, mut cfg: Config, path: &Utf8Path) -> Result<()> {
        let changes = self.url.is_some()
            || self.identity.is_some()
            || self.secret.is_some()
            || self.token_ttl.is_some();

        if !changes {
            let shown = json!({
                "base_url": cfg.base_url.as_str(),
                "identity": cfg.identity,
                "secret": cfg.secret.as_deref().map(displayable_secret),
                "token_ttl_secs": cfg.token_ttl_secs,
            });
            println!("{}", serde_json::to_string_pretty(&shown)?);
            return Ok(());
        }

        if let Some(url) = &self.url {
            cfg.base_url = url.clone();
        }
        if let Some(identity) = &self.identity {
            cfg.identity = Some(identity.clone());
        }
        if let Some(secret) = &self.secret {
            cfg.secret = Some(secret.clone());
        }
        if let Some(ttl) = self.token_ttl {
            cfg.token_ttl_secs = Some(ttl);
        }

        cfg.save(path)?;
        info!(
            "{}",
            fmt_success(&format!(
                "Configuration saved to {path}",
                path = fmt_dimmed(path.as_str())
            ))
        );
        Ok(())
    }
}

/// Secret references point somewhere else and are safe to print; a literal
/// secret is not.
fn displayable_secret(reference: &str) -> &str {
    if reference.starts_with("${")
        || reference.starts_with("keychain://")
        || reference.starts_with("command://")
    {
        reference
    } else {
        "<hidden>"
    }
}
