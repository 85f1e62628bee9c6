use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;

/// Resolve a secret reference to its actual value
///
/// Supports multiple storage backends:
/// - `${VAR_NAME}` - Environment variable
/// - `keychain://service/account` - System keychain
/// - `command://shell command` - External command output
/// - Any other value - Treated as the literal secret
///
/// # Errors
///
/// Returns an error when the referenced backend cannot produce a value.
pub async fn resolve(reference: &str) -> Result<String> {
    match reference {
        // Environment variable: ${VAR_NAME}
        ref_str if ref_str.starts_with("${") && ref_str.ends_with("}") => {
            let var_name = &ref_str[2..ref_str.len() - 1];
            std::env::var(var_name)
                .with_context(|| format!("Environment variable '{var_name}' not found"))
        }

        // Keychain: keychain://service/account
        ref_str if ref_str.starts_with("keychain://") => {
            let path = &ref_str[11..];
            let parts: Vec<&str> = path.split('/').collect();
            if parts.len() != 2 {
                anyhow::bail!(
                    "Invalid keychain reference format: '{ref_str}'. Expected 'keychain://service/account'"
                );
            }
            let entry = keyring::Entry::new(parts[0], parts[1])
                .context("Failed to create keychain entry")?;
            entry.get_password().with_context(|| {
                format!(
                    "Failed to retrieve password from keychain (service: '{}', account: '{}')",
                    parts[0], parts[1]
                )
            })
        }

        // External command: command://shell command here
        ref_str if ref_str.starts_with("command://") => {
            let command = &ref_str[10..];

            let output = Command::new("sh")
                .arg("-c")
                .arg(command)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .spawn()
                .context("Failed to spawn secret command")?
                .wait_with_output()
                .await
                .context("Failed to wait for secret command")?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                anyhow::bail!("Secret command failed: {}", stderr.trim());
            }

            let secret = String::from_utf8(output.stdout)
                .context("Secret command output is not valid UTF-8")?
                .trim()
                .to_string();

            if secret.is_empty() {
                anyhow::bail!("Secret command returned empty output");
            }

            Ok(secret)
        }

        // Otherwise, treat as the literal secret
        ref_str => Ok(ref_str.to_string()),
    }
}
