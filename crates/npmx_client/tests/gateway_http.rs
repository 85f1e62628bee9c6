use std::time::Duration;

use mockito::{Matcher, Server, ServerGuard};
use npmx_client::{Gateway, GatewayError, Session};
use serde_json::json;
use url::Url;

fn base(server: &ServerGuard) -> Url {
    Url::parse(&format!("{}/api", server.url())).unwrap()
}

fn live_session(token: &str) -> Session {
    let now = chrono::Utc::now().timestamp();
    Session {
        token: token.to_string(),
        issued_at: now,
        expires_at: now + 3600,
    }
}

#[tokio::test]
async fn test_authenticate_stores_a_usable_session() {
    let mut server = Server::new_async().await;
    let token_mock = server
        .mock("POST", "/api/tokens")
        .match_body(Matcher::Json(json!({
            "identity": "admin@example.com",
            "secret": "changeme"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"token": "tok-1", "expires": "2099-01-01T00:00:00.000Z"}).to_string(),
        )
        .create_async()
        .await;
    let list_mock = server
        .mock("GET", "/api/nginx/proxy-hosts")
        .match_header("authorization", "Bearer tok-1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .create_async()
        .await;

    let mut gateway = Gateway::new(base(&server)).unwrap();
    assert!(!gateway.is_authenticated());

    gateway
        .authenticate("admin@example.com", "changeme")
        .await
        .expect("token endpoint is up");
    assert!(gateway.is_authenticated());

    let listing = gateway.get("/nginx/proxy-hosts", &[]).await.unwrap();
    assert_eq!(listing, json!([]));

    token_mock.assert_async().await;
    list_mock.assert_async().await;
}

#[tokio::test]
async fn test_server_declared_expiry_wins_over_the_fallback() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/tokens")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"token": "stale", "expires": "2001-01-01T00:00:00.000Z"}).to_string(),
        )
        .create_async()
        .await;

    let mut gateway = Gateway::new(base(&server)).unwrap();
    gateway.authenticate("admin@example.com", "changeme").await.unwrap();

    // The server dated the token in the past, so the hour-long local
    // fallback must not resurrect it.
    assert!(!gateway.is_authenticated());
}

#[tokio::test]
async fn test_requests_fail_fast_without_a_session() {
    let mut server = Server::new_async().await;
    let catch_all = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let gateway = Gateway::new(base(&server)).unwrap();
    let err = gateway
        .get("/nginx/proxy-hosts", &[])
        .await
        .expect_err("there is no session");

    assert!(matches!(err, GatewayError::NotAuthenticated));
    assert!(err.requires_authentication());
    catch_all.assert_async().await;
}

#[tokio::test]
async fn test_an_expired_session_is_as_good_as_none() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/tokens")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"token": "tok-2"}).to_string())
        .create_async()
        .await;
    let catch_all = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    // No expiry in the response and a zero fallback: the session dies the
    // moment it is issued.
    let mut gateway = Gateway::new(base(&server))
        .unwrap()
        .with_token_ttl(Duration::ZERO);
    gateway.authenticate("admin@example.com", "changeme").await.unwrap();

    assert!(!gateway.is_authenticated());
    let err = gateway
        .get("/nginx/proxy-hosts", &[])
        .await
        .expect_err("expired sessions never reach the network");
    assert!(matches!(err, GatewayError::NotAuthenticated));
    catch_all.assert_async().await;
}

#[tokio::test]
async fn test_upstream_401_is_authoritative() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/nginx/proxy-hosts")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(json!({"error": {"code": 401, "message": "Token expired"}}).to_string())
        .expect(1)
        .create_async()
        .await;

    let mut gateway = Gateway::new(base(&server)).unwrap();
    gateway.restore_session(live_session("revoked-on-the-server"));

    let err = gateway
        .get("/nginx/proxy-hosts", &[])
        .await
        .expect_err("the upstream rejected the token");

    assert!(matches!(err, GatewayError::Upstream { status: 401, .. }));
    assert!(err.requires_authentication());
    assert_eq!(err.to_string(), "API error (401): Token expired");
    // Exactly one hit: a 401 is never retried.
}

#[tokio::test]
async fn test_upstream_errors_carry_the_extracted_message() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/nginx/proxy-hosts/99")
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(json!({"error": {"code": 404, "message": "Host not found"}}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/api/nginx/certificates")
        .with_status(500)
        .with_body("")
        .create_async()
        .await;

    let mut gateway = Gateway::new(base(&server)).unwrap();
    gateway.restore_session(live_session("tok-3"));

    let err = gateway.get("/nginx/proxy-hosts/99", &[]).await.unwrap_err();
    assert_eq!(err.to_string(), "API error (404): Host not found");
    assert!(!err.requires_authentication());

    let err = gateway.get("/nginx/certificates", &[]).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "API error (500): request failed with status 500",
        "An empty body falls back to the generic message"
    );
}

#[tokio::test]
async fn test_transport_failures_surface_as_network_errors() {
    // Bind and drop a listener so the port is known to be closed.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let mut gateway =
        Gateway::new(Url::parse(&format!("http://127.0.0.1:{port}/api")).unwrap()).unwrap();
    gateway.restore_session(live_session("tok-4"));

    let err = gateway
        .get("/nginx/proxy-hosts", &[])
        .await
        .expect_err("nothing is listening");
    assert!(matches!(err, GatewayError::Network(_)));
    assert!(!err.requires_authentication());
}

#[tokio::test]
async fn test_failed_authentication_clears_any_prior_session() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/tokens")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(json!({"error": {"code": 401, "message": "Bad credentials"}}).to_string())
        .create_async()
        .await;

    let mut gateway = Gateway::new(base(&server)).unwrap();
    gateway.restore_session(live_session("previously-fine"));
    assert!(gateway.is_authenticated());

    let err = gateway
        .authenticate("admin@example.com", "wrong")
        .await
        .expect_err("credentials were rejected");
    assert!(matches!(err, GatewayError::Auth { .. }));
    assert!(
        !gateway.is_authenticated(),
        "A failed authentication must not leave the old session behind"
    );
}

#[tokio::test]
async fn test_changing_the_base_address_keeps_the_session() {
    let mut old_upstream = Server::new_async().await;
    let mut new_upstream = Server::new_async().await;

    old_upstream
        .mock("POST", "/api/tokens")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"token": "portable"}).to_string())
        .create_async()
        .await;
    let old_list = old_upstream
        .mock("GET", "/api/nginx/proxy-hosts")
        .match_header("authorization", "Bearer portable")
        .with_status(200)
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;
    let new_list = new_upstream
        .mock("GET", "/api/nginx/proxy-hosts")
        .match_header("authorization", "Bearer portable")
        .with_status(200)
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let mut gateway = Gateway::new(base(&old_upstream)).unwrap();
    gateway.authenticate("admin@example.com", "changeme").await.unwrap();
    gateway.get("/nginx/proxy-hosts", &[]).await.unwrap();

    gateway.update_base_address(base(&new_upstream));
    assert!(gateway.is_authenticated(), "Rebasing does not log out");
    gateway.get("/nginx/proxy-hosts", &[]).await.unwrap();

    old_list.assert_async().await;
    new_list.assert_async().await;
}

#[tokio::test]
async fn test_non_json_success_bodies_pass_through_as_text() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/audit-log")
        .with_status(200)
        .with_body("plain text payload")
        .create_async()
        .await;

    let mut gateway = Gateway::new(base(&server)).unwrap();
    gateway.restore_session(live_session("tok-5"));

    let value = gateway.get("/audit-log", &[]).await.unwrap();
    assert_eq!(value, json!("plain text payload"));
}
