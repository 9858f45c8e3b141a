use std::net::SocketAddr;

use axum::{extract::State, http::HeaderValue, routing::get, Json, Router};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::error::ApiError;
use crate::state::AppState;
use crate::{auth, users};

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origins);
    Router::new()
        .nest("/api/auth", auth::router())
        .nest("/api/users", users::router())
        .route("/health", get(health))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let list: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(list))
        .allow_methods(Any)
        .allow_headers(Any)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    message: String,
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    sqlx::query("SELECT 1").execute(&state.db).await.map_err(|e| {
        error!(error = %e, "health check failed");
        ApiError::internal("Database connection failed")
    })?;
    Ok(Json(HealthResponse {
        message: "Server and database connected!".into(),
    }))
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "3001".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn body_json(res: axum::response::Response) -> serde_json::Value {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn protected_route_without_token_is_unauthorized() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(Request::get("/api/users/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(res).await;
        assert_eq!(json["kind"], "unauthorized");
        assert_eq!(json["message"], "No token provided");
    }

    #[tokio::test]
    async fn protected_route_with_wrong_scheme_is_unauthorized() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(
                Request::get("/api/users/")
                    .header(header::AUTHORIZATION, "Basic abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(res).await;
        assert_eq!(json["message"], "Invalid Authorization header");
    }

    #[tokio::test]
    async fn protected_route_with_garbage_token_is_unauthorized() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(
                Request::get("/api/auth/me")
                    .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(res).await;
        assert_eq!(json["kind"], "unauthorized");
        assert_eq!(json["message"], "Invalid token provided");
    }

    #[tokio::test]
    async fn lowercase_bearer_scheme_reaches_token_verification() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(
                Request::get("/api/auth/me")
                    .header(header::AUTHORIZATION, "bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        // Scheme accepted; the rejection comes from the token check.
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(res).await;
        assert_eq!(json["message"], "Invalid token provided");
    }

    #[tokio::test]
    async fn bulk_action_requires_token_before_touching_the_store() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(
                Request::post("/api/users/block")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"userIds":[]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_with_missing_fields_is_bad_request() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(
                Request::post("/api/auth/register")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name":"","email":"","password":""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let json = body_json(res).await;
        assert_eq!(json["kind"], "validation");
        assert_eq!(json["message"], "All fields are required");
    }

    #[tokio::test]
    async fn register_with_absent_field_is_bad_request() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(
                Request::post("/api/auth/register")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"email":"a@x.com","password":"longenough"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let json = body_json(res).await;
        assert_eq!(json["kind"], "validation");
        assert_eq!(json["message"], "All fields are required");
    }

    #[tokio::test]
    async fn login_with_absent_field_is_unauthorized() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(
                Request::post("/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"email":"a@x.com"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(res).await;
        assert_eq!(json["kind"], "unauthorized");
        assert_eq!(json["message"], "All fields are required");
    }

    #[tokio::test]
    async fn register_with_malformed_email_is_bad_request() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(
                Request::post("/api/auth/register")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"name":"A","email":"not-an-email","password":"longenough"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let json = body_json(res).await;
        assert_eq!(json["message"], "Invalid email");
    }

    #[tokio::test]
    async fn login_with_missing_fields_is_unauthorized() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(
                Request::post("/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"email":"","password":""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(res).await;
        assert_eq!(json["message"], "All fields are required");
    }

    #[test]
    fn cors_layer_accepts_origin_lists() {
        // Just ensure both construction paths are exercised.
        let _ = cors_layer(&[]);
        let _ = cors_layer(&["https://admin.example".to_string()]);
    }
}
