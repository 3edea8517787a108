use axum::http::{header, Method};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::api::handlers;
use crate::state::AppState;
use crate::system;
use crate::system::middleware::request_logger::request_logger;

/// All application routes. Everything except health and login/logout
/// sits behind `require_session`.
pub fn configure_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION]);

    let protected = Router::new()
        .route("/api/auth/me", get(system::handlers::auth::me))
        // D100 Consumption Lookup
        .route(
            "/api/d100/search_modes",
            get(handlers::d100_consumption_lookup::search_modes),
        )
        .route(
            "/api/d100/lookup",
            post(handlers::d100_consumption_lookup::lookup),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            system::auth::middleware::require_session,
        ));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/auth/login", post(system::handlers::auth::login))
        .route("/api/auth/logout", post(system::handlers::auth::logout))
        .merge(protected)
        .with_state(state)
        .layer(middleware::from_fn(request_logger))
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use contracts::dashboards::d100_consumption_lookup::{LookupResponse, LookupStatus};
    use contracts::system::auth::LoginResponse;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    use crate::dashboards::d100_consumption_lookup::service::tests::settings;
    use crate::dashboards::d100_consumption_lookup::LookupService;
    use crate::shared::config::{CookieConfig, EmbeddedUser};
    use crate::shared::warehouse::sqlite::tests::seed_warehouse;
    use crate::shared::warehouse::sqlite::SqliteWarehouse;
    use crate::system::auth::jwt::SessionKeys;
    use crate::system::auth::password::{salted_digest, Verifier};
    use crate::system::users::{UserDirectory, UserSource};

    const SALT: &str = "pepper";

    async fn app(dir: &std::path::Path) -> Router {
        let users = UserSource::Embedded(vec![
            EmbeddedUser {
                role: "lector".to_string(),
                username: "41000000".to_string(),
                name: "Luis Rojas".to_string(),
                credential: None,
            },
            EmbeddedUser {
                role: "supervisor".to_string(),
                username: "42000000".to_string(),
                name: "Rosa Huaman".to_string(),
                credential: None,
            },
        ]);
        let verifier = Verifier::SaltedDigest {
            salt: SALT.to_string(),
            length: 8,
        };
        let path = seed_warehouse(dir).await;
        let warehouse = SqliteWarehouse::open(&path, 5).await.unwrap();

        configure_routes(AppState {
            sessions: Arc::new(SessionKeys::from_config(&CookieConfig {
                name: "maestro_session".to_string(),
                key: Some("test-key".to_string()),
                expiry_days: 30,
            })),
            users: Arc::new(UserDirectory::new(
                users,
                verifier,
                Duration::from_secs(3600),
            )),
            lookup: Arc::new(LookupService::new(Arc::new(warehouse), settings())),
        })
    }

    fn post_json(uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Logs in and returns the `name=value` pair of the session cookie
    async fn login(app: &Router, username: &str) -> String {
        let code = salted_digest(username, SALT, 8);
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/auth/login",
                json!({"username": username, "password": code}),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.split(';').next())
            .unwrap()
            .to_string();

        let body: LoginResponse = json_body(response).await;
        assert_eq!(body.session.username, username);
        cookie
    }

    #[tokio::test]
    async fn test_lookup_requires_session() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;

        let response = app
            .oneshot(post_json(
                "/api/d100/lookup",
                json!({"search_mode": "Suministro", "search_value": 500100}),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_wrong_secret_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;

        let response = app
            .oneshot(post_json(
                "/api/auth/login",
                json!({"identifier": "41000000", "secret": "00000000"}),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body: Value = json_body(response).await;
        assert_eq!(body["level"], "error");
        assert_eq!(body["message"], "Usuario/contraseña incorrectos");
    }

    #[tokio::test]
    async fn test_login_then_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;
        let cookie = login(&app, "41000000").await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/d100/lookup",
                json!({"search_mode": "Suministro", "search_value": 500100}),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: LookupResponse = json_body(response).await;
        assert_eq!(body.status, LookupStatus::Ok);
        assert_eq!(body.statistics.len(), 13);
        assert_eq!(body.series.map(|s| s.len()), Some(13));
    }

    #[tokio::test]
    async fn test_role_gating_and_empty_value() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;
        let lector = login(&app, "41000000").await;
        let supervisor = login(&app, "42000000").await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/d100/lookup",
                json!({"search_mode": "SED", "search_value": "X1"}),
                Some(&lector),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/d100/lookup",
                json!({"search_mode": "SED", "search_value": "X1"}),
                Some(&supervisor),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/d100/lookup",
                json!({"search_mode": "Suministro", "search_value": "  "}),
                Some(&supervisor),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = json_body(response).await;
        assert_eq!(body["level"], "warning");
        assert_eq!(body["message"], "Por favor ingrese un valor para buscar");
    }

    #[tokio::test]
    async fn test_me_and_search_modes() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;
        let cookie = login(&app, "42000000").await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/d100/search_modes")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let modes: Value = json_body(response).await;
        assert_eq!(modes, json!(["Suministro", "SED"]));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/auth/me")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let me: Value = json_body(response).await;
        assert_eq!(me["display_name"], "Rosa Huaman");
        assert_eq!(me["role"], "SUPERVISOR");
    }

    #[tokio::test]
    async fn test_malformed_body_gets_json_warning() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;
        let cookie = login(&app, "42000000").await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/d100/lookup",
                json!({"search_mode": "Cuenta", "search_value": 500100}),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body: Value = json_body(response).await;
        assert_eq!(body["level"], "warning");
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Solicitud inválida"));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{\"username\": "))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = json_body(response).await;
        assert_eq!(body["level"], "warning");
    }

    #[tokio::test]
    async fn test_whole_float_account_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;
        let cookie = login(&app, "41000000").await;

        let response = app
            .oneshot(post_json(
                "/api/d100/lookup",
                json!({"search_mode": "Suministro", "search_value": 500100.0}),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: LookupResponse = json_body(response).await;
        assert_eq!(body.status, LookupStatus::Ok);
    }

    #[tokio::test]
    async fn test_logout_expires_cookie() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path()).await;
        let cookie = login(&app, "41000000").await;

        let response = app
            .clone()
            .oneshot(post_json("/api/auth/logout", json!({}), Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|h| h.to_str().ok())
            .unwrap();
        assert!(set_cookie.starts_with("maestro_session=;"));
        assert!(set_cookie.ends_with("Max-Age=0"));
        assert!(set_cookie.contains("HttpOnly"));
    }
}
