pub mod audit;
pub mod auth;
pub mod config;
pub mod logout;
pub mod report;
pub mod resource;
pub mod serve;
pub mod status;

use anyhow::{Context, Result};
use camino::Utf8Path;
use log::{debug, warn};
use npmx_client::{FileSessionStore, Gateway, PersistedSession, SessionStore};
use npmx_config::Config;

/// Builds a gateway pointed at the configured upstream.
pub(crate) fn connect(cfg: &Config) -> Result<Gateway> {
    let mut gateway = Gateway::new(cfg.base_url.clone())?;
    if let Some(ttl) = cfg.token_ttl() {
        gateway = gateway.with_token_ttl(ttl);
    }
    Ok(gateway)
}

pub(crate) fn session_store(config_path: &Utf8Path) -> FileSessionStore {
    FileSessionStore::new(npmx_config::session_path(config_path).as_std_path())
}

/// Makes the gateway ready for authenticated calls: restores the saved
/// session when it is still valid for this base address, otherwise signs in
/// with the configured credentials and saves the fresh session.
pub(crate) async fn ensure_authenticated(
    gateway: &mut Gateway,
    cfg: &Config,
    store: &mut dyn SessionStore,
) -> Result<()> {
    if let Some(saved) = store.load()? {
        if saved.matches_base(gateway.base_address()) && saved.session.is_valid() {
            gateway.restore_session(saved.session);
            return Ok(());
        }
        debug!("Saved session is stale or for a different upstream, signing in again");
    }

    let identity = cfg
        .identity
        .clone()
        .context("No credentials available. Run 'npmx auth' or put identity/secret in the config")?;
    let reference = cfg
        .secret
        .clone()
        .context("No secret configured. Run 'npmx auth' or put identity/secret in the config")?;
    let secret = npmx_config::secret::resolve(&reference).await?;

    gateway.authenticate(&identity, &secret).await?;
    persist_session(gateway, store);
    Ok(())
}

/// Best effort: a session that cannot be written is an inconvenience, not a
/// failed command.
pub(crate) fn persist_session(gateway: &Gateway, store: &mut dyn SessionStore) {
    let Some(session) = gateway.session() else {
        return;
    };
    let persisted = PersistedSession {
        base_url: gateway.base_address().clone(),
        session: session.clone(),
    };
    if let Err(err) = store.save(&persisted) {
        warn!("Failed to save session: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use npmx_client::{MemorySessionStore, Session};
    use serde_json::json;
    use url::Url;

    fn config_for(server: &mockito::ServerGuard) -> Config {
        Config {
            base_url: Url::parse(&format!("{}/api", server.url())).unwrap(),
            identity: Some("admin@example.com".into()),
            secret: Some("changeme".into()),
            token_ttl_secs: None,
        }
    }

    fn saved_session(base_url: &Url, expires_in: i64) -> PersistedSession {
        let now = unix_now();
        PersistedSession {
            base_url: base_url.clone(),
            session: Session {
                token: "saved-token".into(),
                issued_at: now,
                expires_at: now + expires_in,
            },
        }
    }

    fn unix_now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs() as i64)
    }

    #[tokio::test]
    async fn test_valid_saved_session_skips_the_token_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let tokens = server
            .mock("POST", "/api/tokens")
            .expect(0)
            .create_async()
            .await;

        let cfg = config_for(&server);
        let mut store = MemorySessionStore::new();
        store.save(&saved_session(&cfg.base_url, 3600)).unwrap();

        let mut gateway = connect(&cfg).unwrap();
        ensure_authenticated(&mut gateway, &cfg, &mut store)
            .await
            .unwrap();

        assert!(gateway.is_authenticated());
        assert_eq!(gateway.session().unwrap().token, "saved-token");
        tokens.assert_async().await;
    }

    #[tokio::test]
    async fn test_expired_saved_session_triggers_a_fresh_sign_in() {
        let mut server = mockito::Server::new_async().await;
        let tokens = server
            .mock("POST", "/api/tokens")
            .match_body(mockito::Matcher::Json(json!({
                "identity": "admin@example.com",
                "secret": "changeme"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"token": "fresh-token"}).to_string())
            .expect(1)
            .create_async()
            .await;

        let cfg = config_for(&server);
        let mut store = MemorySessionStore::new();
        store.save(&saved_session(&cfg.base_url, -60)).unwrap();

        let mut gateway = connect(&cfg).unwrap();
        ensure_authenticated(&mut gateway, &cfg, &mut store)
            .await
            .unwrap();

        assert!(gateway.is_authenticated());
        assert_eq!(gateway.session().unwrap().token, "fresh-token");
        let persisted = store.load().unwrap().expect("fresh session was saved");
        assert_eq!(persisted.session.token, "fresh-token");
        tokens.assert_async().await;
    }

    #[tokio::test]
    async fn test_session_for_another_upstream_is_not_reused() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/tokens")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"token": "fresh-token"}).to_string())
            .expect(1)
            .create_async()
            .await;

        let cfg = config_for(&server);
        let mut store = MemorySessionStore::new();
        let other_base = Url::parse("http://somewhere-else:81/api").unwrap();
        store.save(&saved_session(&other_base, 3600)).unwrap();

        let mut gateway = connect(&cfg).unwrap();
        ensure_authenticated(&mut gateway, &cfg, &mut store)
            .await
            .unwrap();

        assert_eq!(gateway.session().unwrap().token, "fresh-token");
    }

    #[tokio::test]
    async fn test_missing_credentials_is_a_clear_error() {
        let server = mockito::Server::new_async().await;
        let cfg = Config {
            identity: None,
            secret: None,
            ..config_for(&server)
        };

        let mut store = MemorySessionStore::new();
        let mut gateway = connect(&cfg).unwrap();
        let err = ensure_authenticated(&mut gateway, &cfg, &mut store)
            .await
            .expect_err("nothing to sign in with");
        assert!(err.to_string().contains("npmx auth"));
    }
}
