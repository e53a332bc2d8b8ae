//! lotdeck server - HTTP API for the operator dashboard.
//!
//! ## Endpoints
//!
//! - `POST /api/auth/login` - Verify operator credentials and get a session token
//! - `POST /api/auth/logout` - End a session
//! - `GET /api/lots` - Lots owned by the operator
//! - `GET /api/lots/{id}` - Lot detail
//! - `PUT /api/lots/{id}/pricing` - Update the global hourly rate and daily cap
//! - `GET /api/lots/{id}/advanced-pricing` - Weekly schedule for the editor
//! - `PUT /api/lots/{id}/advanced-pricing` - Save all seven days
//! - `POST /api/lots/{id}/advanced-pricing/disable` - Discard advanced pricing
//! - `GET /api/lots/{id}/rate` - Effective rate at a day and time
//! - `POST /api/pricing/mode-change` - Apply an editor mode selection
//!
//! Reads authenticate with `Authorization: Bearer <token>`; writes carry
//! `session_token` in the body.
//!
//! ## Example
//!
//! ```no_run
//! use lotdeck_server::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = Server::new(ServerConfig::default()).await.unwrap();
//!     server.run().await.unwrap();
//! }
//! ```

pub mod error;
mod handlers;
pub mod models;
pub mod state;

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use lotdeck_storage::Database;

pub use error::{ApiError, Result};
pub use state::AppState;

/// Default server port.
pub const DEFAULT_PORT: u16 = 48780;

/// Default server host (localhost only).
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (default: 127.0.0.1).
    pub host: String,
    /// Port to bind to (default: 48780).
    pub port: u16,
    /// Database path (None = in-memory).
    pub db_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            db_path: None,
        }
    }
}

impl ServerConfig {
    /// Creates a config with a specific database path.
    pub fn with_db_path(path: impl Into<String>) -> Self {
        Self {
            db_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Server error types.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind to {0}: {1}")]
    BindError(SocketAddr, std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] lotdeck_storage::StorageError),

    /// Server runtime error.
    #[error("server error: {0}")]
    Runtime(String),
}

/// Builds the API router over `state`.
pub fn router(state: AppState) -> Router {
    // The dashboard SPA is served from another origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/lots", get(handlers::list_lots))
        .route("/api/lots/{id}", get(handlers::get_lot))
        .route(
            "/api/lots/{id}/pricing",
            axum::routing::put(handlers::update_pricing),
        )
        .route(
            "/api/lots/{id}/advanced-pricing",
            get(handlers::get_advanced_pricing).put(handlers::save_advanced_pricing),
        )
        .route(
            "/api/lots/{id}/advanced-pricing/disable",
            post(handlers::disable_advanced_pricing),
        )
        .route("/api/lots/{id}/rate", get(handlers::get_rate))
        .route("/api/pricing/mode-change", post(handlers::mode_change))
        .layer(cors)
        .with_state(state)
}

/// The HTTP API server.
pub struct Server {
    router: Router,
    addr: SocketAddr,
}

impl Server {
    /// Creates a new server with the given configuration.
    pub async fn new(config: ServerConfig) -> std::result::Result<Self, ServerError> {
        let db = if let Some(ref path) = config.db_path {
            Database::with_path(path)?
        } else {
            Database::in_memory()?
        };

        Self::with_database(config, db)
    }

    /// Creates a server with an existing database.
    pub fn with_database(
        config: ServerConfig,
        db: Database,
    ) -> std::result::Result<Self, ServerError> {
        Self::with_state(config, AppState::new(db))
    }

    /// Creates a server with custom application state.
    pub fn with_state(
        config: ServerConfig,
        state: AppState,
    ) -> std::result::Result<Self, ServerError> {
        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| ServerError::Runtime(format!("invalid address: {}", e)))?;

        Ok(Self {
            router: router(state),
            addr,
        })
    }

    /// Returns the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Runs the server until shutdown.
    pub async fn run(self) -> std::result::Result<(), ServerError> {
        info!("Starting lotdeck API server on {}", self.addr);

        let domain = if self.addr.is_ipv6() {
            Domain::IPV6
        } else {
            Domain::IPV4
        };
        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        // Rebind quickly after a restart while old sockets sit in TIME_WAIT.
        socket
            .set_reuse_address(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        socket
            .bind(&self.addr.into())
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .listen(128)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        // Required before handing the socket to tokio.
        socket
            .set_nonblocking(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        let std_listener: std::net::TcpListener = socket.into();
        let listener = tokio::net::TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        axum::serve(listener, self.router)
            .await
            .map_err(|e| ServerError::Runtime(e.to_string()))?;

        Ok(())
    }

    /// Returns the router for testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use lotdeck_storage::{NewLot, NewOperator};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const PASSWORD: &str = "lot-owner-pass";

    struct TestApp {
        app: Router,
        state: AppState,
        lot_id: i64,
    }

    fn create_test_app() -> TestApp {
        let state = AppState::in_memory().unwrap();
        let password_hash = state.auth.hash_password(PASSWORD).unwrap();
        let operator_id = state
            .db
            .create_operator(NewOperator {
                email: "owner@example.com".to_string(),
                password_hash,
                display_name: Some("Owner".to_string()),
            })
            .unwrap();
        let lot_id = state
            .db
            .create_lot(
                operator_id,
                NewLot {
                    name: "Central".to_string(),
                    address: Some("1 Main St".to_string()),
                    capacity: 50,
                    hourly_rate: Some(2.0),
                    daily_maximum_price: Some(15.0),
                },
            )
            .unwrap();

        TestApp {
            app: router(state.clone()),
            state,
            lot_id,
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn login(app: &Router) -> String {
        let (status, json) = send(
            app,
            json_request(
                "POST",
                "/api/auth/login",
                json!({"email": "Owner@Example.com", "password": PASSWORD}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        json["session_token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_login_and_logout() {
        let test = create_test_app();
        let token = login(&test.app).await;
        assert_eq!(test.state.auth.active_session_count(), 1);

        let (status, json) = send(
            &test.app,
            json_request("POST", "/api/auth/logout", json!({"session_token": token})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);

        let (status, _) = send(&test.app, get_request("/api/lots", &token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let test = create_test_app();
        for body in [
            json!({"email": "owner@example.com", "password": "not-the-password"}),
            json!({"email": "nobody@example.com", "password": PASSWORD}),
        ] {
            let (status, json) =
                send(&test.app, json_request("POST", "/api/auth/login", body)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(json["code"], "invalid_credentials");
        }
    }

    #[tokio::test]
    async fn test_lots_require_auth() {
        let test = create_test_app();

        let request = Request::builder()
            .method("GET")
            .uri("/api/lots")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(&test.app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["code"], "unauthorized");

        let (status, json) = send(&test.app, get_request("/api/lots", "bogus")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["code"], "session_expired");
    }

    #[tokio::test]
    async fn test_list_and_get_lots() {
        let test = create_test_app();
        let token = login(&test.app).await;

        let (status, json) = send(&test.app, get_request("/api/lots", &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["lots"].as_array().unwrap().len(), 1);
        assert_eq!(json["lots"][0]["name"], "Central");

        let uri = format!("/api/lots/{}", test.lot_id);
        let (status, json) = send(&test.app, get_request(&uri, &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["capacity"], 50);

        let (status, _) = send(&test.app, get_request("/api/lots/999", &token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_other_operators_lot_is_hidden() {
        let test = create_test_app();
        let other = test
            .state
            .db
            .create_operator(NewOperator {
                email: "rival@example.com".to_string(),
                password_hash: test.state.auth.hash_password("rival-pass").unwrap(),
                display_name: None,
            })
            .unwrap();
        let token = test.state.auth.create_session(other);

        let uri = format!("/api/lots/{}", test.lot_id);
        let (status, _) = send(&test.app, get_request(&uri, token.as_str())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_pricing_sanitizes_text() {
        let test = create_test_app();
        let token = login(&test.app).await;
        let uri = format!("/api/lots/{}/pricing", test.lot_id);

        let (status, json) = send(
            &test.app,
            json_request(
                "PUT",
                &uri,
                json!({"session_token": token, "hourly_rate": "$3.50", "daily_maximum_price": "20"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["hourly_rate"], 3.5);
        assert_eq!(json["daily_maximum_price"], 20.0);

        let (status, json) = send(
            &test.app,
            json_request(
                "PUT",
                &uri,
                json!({"session_token": token, "hourly_rate": "abc", "daily_maximum_price": "20"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "bad_request");
    }

    #[tokio::test]
    async fn test_update_pricing_requires_session() {
        let test = create_test_app();
        let uri = format!("/api/lots/{}/pricing", test.lot_id);

        let (status, _) = send(
            &test.app,
            json_request(
                "PUT",
                &uri,
                json!({"session_token": "invalid", "hourly_rate": "1", "daily_maximum_price": "2"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_advanced_pricing_disabled_by_default() {
        let test = create_test_app();
        let token = login(&test.app).await;
        let uri = format!("/api/lots/{}/advanced-pricing", test.lot_id);

        let (status, json) = send(&test.app, get_request(&uri, &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["enabled"], false);
        assert_eq!(json["days"]["MONDAY"][0]["mode"], "default");
        assert_eq!(json["days"]["MONDAY"][0]["rate"], 2.0);
        assert_eq!(json["days"]["SUNDAY"][1]["mode"], "newBlock");
    }

    #[tokio::test]
    async fn test_save_and_reload_advanced_pricing() {
        let test = create_test_app();
        let token = login(&test.app).await;
        let uri = format!("/api/lots/{}/advanced-pricing", test.lot_id);

        let body = json!({
            "session_token": token,
            "days": {
                "MONDAY": [
                    {"mode": "setTime", "startTime": "00:00", "endTime": "12:00", "rate": "3"},
                    {"mode": "setTime", "startTime": "12:00", "endTime": "00:00"},
                    {"mode": "default"}
                ],
                "SATURDAY": [
                    {"mode": "allDay", "rate": 1, "maxAmount": 5},
                    {"mode": "newBlock"},
                    {"mode": "newBlock"}
                ]
            }
        });
        let (status, json) = send(&test.app, json_request("PUT", &uri, body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["enabled"], true);
        assert_eq!(json["days"]["MONDAY"][2]["mode"], "noTime");

        let (status, json) = send(&test.app, get_request(&uri, &token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["enabled"], true);
        let monday = &json["days"]["MONDAY"];
        assert_eq!(monday[0]["mode"], "setTime");
        assert_eq!(monday[0]["rate"], 3.0);
        assert_eq!(monday[0]["maxAmount"], 15.0);
        assert_eq!(monday[1]["startTime"], "12:00");
        assert_eq!(monday[1]["rate"], 2.0);
        assert_eq!(monday[2]["mode"], "noTime");
        assert_eq!(json["days"]["SATURDAY"][0]["mode"], "allDay");
        assert_eq!(json["days"]["TUESDAY"][0]["mode"], "default");

        let stored = test.state.db.get_pricing_blocks(test.lot_id).unwrap();
        assert_eq!(stored.len(), 3);
    }

    #[tokio::test]
    async fn test_overlapping_blocks_rejected() {
        let test = create_test_app();
        let token = login(&test.app).await;
        let uri = format!("/api/lots/{}/advanced-pricing", test.lot_id);

        let body = json!({
            "session_token": token,
            "days": {
                "WEDNESDAY": [
                    {"mode": "setTime", "startTime": "08:00", "endTime": "14:00"},
                    {"mode": "setTime", "startTime": "12:00", "endTime": "18:00"},
                    {"mode": "default"}
                ]
            }
        });
        let (status, json) = send(&test.app, json_request("PUT", &uri, body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("WEDNESDAY"));

        assert!(test.state.db.get_pricing_blocks(test.lot_id).unwrap().is_empty());
        let lot = test.state.db.get_lot(test.lot_id).unwrap().unwrap();
        assert!(!lot.advanced_pricing_enabled);
    }

    #[tokio::test]
    async fn test_malformed_layout_rejected() {
        let test = create_test_app();
        let token = login(&test.app).await;
        let uri = format!("/api/lots/{}/advanced-pricing", test.lot_id);

        let below_default = json!({
            "session_token": token,
            "days": {
                "MONDAY": [
                    {"mode": "default"},
                    {"mode": "setTime", "startTime": "08:00", "endTime": "09:00", "rate": 9},
                    {"mode": "newBlock"}
                ]
            }
        });
        let (status, json) = send(&test.app, json_request("PUT", &uri, below_default)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("MONDAY"));

        let gap_in_slots = json!({
            "session_token": token,
            "days": {
                "TUESDAY": [
                    {"mode": "setTime", "startTime": "08:00", "endTime": "09:00"},
                    {"mode": "default"},
                    {"mode": "setTime", "startTime": "13:00", "endTime": "14:00"}
                ]
            }
        });
        let (status, json) = send(&test.app, json_request("PUT", &uri, gap_in_slots)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("TUESDAY"));

        assert!(test.state.db.get_pricing_blocks(test.lot_id).unwrap().is_empty());
        let lot = test.state.db.get_lot(test.lot_id).unwrap().unwrap();
        assert!(!lot.advanced_pricing_enabled);
    }

    #[tokio::test]
    async fn test_disable_advanced_pricing() {
        let test = create_test_app();
        let token = login(&test.app).await;
        let uri = format!("/api/lots/{}/advanced-pricing", test.lot_id);

        let body = json!({
            "session_token": token,
            "days": {
                "FRIDAY": [
                    {"mode": "allDay", "rate": 4},
                    {"mode": "newBlock"},
                    {"mode": "newBlock"}
                ]
            }
        });
        let (status, _) = send(&test.app, json_request("PUT", &uri, body)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = send(
            &test.app,
            json_request(
                "POST",
                &format!("{uri}/disable"),
                json!({"session_token": token}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);

        let (_, json) = send(&test.app, get_request(&uri, &token)).await;
        assert_eq!(json["enabled"], false);
        assert_eq!(json["days"]["FRIDAY"][0]["mode"], "default");
        assert!(test.state.db.get_pricing_blocks(test.lot_id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_effective_rate() {
        let test = create_test_app();
        let token = login(&test.app).await;
        let uri = format!("/api/lots/{}/advanced-pricing", test.lot_id);

        let body = json!({
            "session_token": token,
            "days": {
                "TUESDAY": [
                    {"mode": "setTime", "startTime": "22:00", "endTime": "06:00", "rate": 1.5},
                    {"mode": "default"},
                    {"mode": "newBlock"}
                ]
            }
        });
        let (status, _) = send(&test.app, json_request("PUT", &uri, body)).await;
        assert_eq!(status, StatusCode::OK);

        let rate_uri = format!("/api/lots/{}/rate", test.lot_id);
        let (status, json) = send(
            &test.app,
            get_request(&format!("{rate_uri}?day=tuesday&time=23:30"), &token),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["day"], "TUESDAY");
        assert_eq!(json["hourly_rate"], 1.5);
        assert_eq!(json["slot"], 0);

        let (_, json) = send(
            &test.app,
            get_request(&format!("{rate_uri}?day=TUESDAY&time=12:00"), &token),
        )
        .await;
        assert_eq!(json["hourly_rate"], 2.0);
        assert!(json.get("slot").is_none());

        let (status, _) = send(
            &test.app,
            get_request(&format!("{rate_uri}?day=FUNDAY&time=12:00"), &token),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_mode_change_cascades() {
        let test = create_test_app();

        let body = json!({
            "schedule": [
                {"mode": "default"},
                {"mode": "newBlock"},
                {"mode": "newBlock"}
            ],
            "slot": 0,
            "mode": "setTime",
            "hourly_rate": "2.50",
            "daily_maximum_price": 12
        });
        let (status, json) = send(
            &test.app,
            json_request("POST", "/api/pricing/mode-change", body),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["schedule"][0]["mode"], "setTime");
        assert_eq!(json["schedule"][1]["mode"], "default");
        assert_eq!(json["schedule"][1]["rate"], 2.5);
        assert_eq!(json["schedule"][2]["mode"], "newBlock");
        assert_eq!(json["fully_covered"], false);
    }

    #[tokio::test]
    async fn test_mode_change_rejects_unselectable() {
        let test = create_test_app();

        let body = json!({
            "schedule": [
                {"mode": "setTime", "startTime": "08:00", "endTime": "12:00"},
                {"mode": "default"},
                {"mode": "newBlock"}
            ],
            "slot": 1,
            "mode": "allDay",
            "hourly_rate": 2,
            "daily_maximum_price": 15
        });
        let (status, json) = send(
            &test.app,
            json_request("POST", "/api/pricing/mode-change", body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "invalid_pricing");
    }

    #[tokio::test]
    async fn test_mode_change_rejects_malformed_schedule() {
        let test = create_test_app();

        let body = json!({
            "schedule": [
                {"mode": "allDay"},
                {"mode": "setTime", "startTime": "08:00", "endTime": "12:00"},
                {"mode": "newBlock"}
            ],
            "slot": 0,
            "mode": "setTime",
            "hourly_rate": 2,
            "daily_maximum_price": 15
        });
        let (status, json) = send(
            &test.app,
            json_request("POST", "/api/pricing/mode-change", body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "invalid_pricing");
    }

    #[tokio::test]
    async fn test_mode_change_requires_rates() {
        let test = create_test_app();

        let body = json!({
            "schedule": [
                {"mode": "default"},
                {"mode": "newBlock"},
                {"mode": "newBlock"}
            ],
            "slot": 0,
            "mode": "setTime",
            "hourly_rate": "2.50"
        });
        let (status, json) = send(
            &test.app,
            json_request("POST", "/api/pricing/mode-change", body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "bad_request");
        assert!(json["error"]
            .as_str()
            .unwrap()
            .contains("daily_maximum_price"));
    }

    #[test]
    fn test_server_config() {
        let config = ServerConfig::with_db_path("/tmp/lotdeck.db")
            .with_host("0.0.0.0")
            .with_port(9000);
        assert_eq!(config.db_path.as_deref(), Some("/tmp/lotdeck.db"));

        let server = Server::with_state(config, AppState::in_memory().unwrap()).unwrap();
        assert_eq!(server.addr().port(), 9000);

        let bad = ServerConfig::default().with_host("not an address");
        assert!(Server::with_state(bad, AppState::in_memory().unwrap()).is_err());
    }
}
