use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::state::AppState;
use crate::{analytics, auth, cart, currencies, notifications, orders, products, suppliers, support};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(products::router())
                .merge(suppliers::router())
                .merge(cart::router())
                .merge(orders::router())
                .merge(currencies::router())
                .merge(support::router())
                .merge(notifications::router())
                .merge(analytics::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let ms = latency.as_millis();
                        if status.is_server_error() {
                            tracing::error!(%status, ms, "response");
                        } else if status.is_client_error() {
                            tracing::warn!(%status, ms, "response");
                        } else {
                            tracing::info!(%status, ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        extract::FromRef,
        http::{header, Method, Request, StatusCode},
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::auth::{dto::JwtKeys, Role};

    fn token_for(state: &AppState, role: Role) -> String {
        JwtKeys::from_ref(state)
            .sign_access(Uuid::new_v4(), role)
            .unwrap()
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = build_app(AppState::fake());
        let resp = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"ok");
    }

    #[tokio::test]
    async fn protected_routes_need_a_token() {
        for path in ["/api/cart", "/api/orders", "/api/notifications", "/api/auth/me"] {
            let app = build_app(AppState::fake());
            let (status, body) = send(app, Request::get(path).body(Body::empty()).unwrap()).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{path}");
            assert_eq!(body["status"], "fail");
        }
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_token() {
        let state = AppState::fake();
        let refresh = JwtKeys::from_ref(&state)
            .sign_refresh(Uuid::new_v4(), Role::Admin)
            .unwrap();
        let req = Request::get("/api/admin/analytics/dashboard")
            .header(header::AUTHORIZATION, format!("Bearer {refresh}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(build_app(state), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_routes_reject_regular_users() {
        let product = Uuid::new_v4();
        let requests = [
            (Method::GET, "/api/admin/users".to_string()),
            (Method::GET, "/api/admin/orders".to_string()),
            (Method::GET, "/api/suppliers".to_string()),
            (Method::POST, "/api/products".to_string()),
            (Method::POST, format!("/api/products/{product}/stock")),
            (Method::GET, format!("/api/products/{product}/inventory")),
            (Method::POST, "/api/currencies/update-rates".to_string()),
            (Method::GET, "/api/admin/support/stats".to_string()),
            (Method::POST, "/api/admin/faqs".to_string()),
            (Method::GET, "/api/admin/analytics/sales".to_string()),
        ];
        for (method, path) in requests {
            let state = AppState::fake();
            let token = token_for(&state, Role::User);
            let req = Request::builder()
                .method(method.clone())
                .uri(path.as_str())
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap();
            let (status, body) = send(build_app(state), req).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{method} {path}");
            assert_eq!(body["error"], "Access denied");
        }
    }

    #[tokio::test]
    async fn register_validates_before_touching_the_database() {
        let app = build_app(AppState::fake());
        let req = Request::post("/api/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"username":"shopper","email":"not-an-email","password":"secret123"}"#,
            ))
            .unwrap();
        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "fail");
    }

    #[tokio::test]
    async fn cart_rejects_zero_quantity() {
        let state = AppState::fake();
        let token = token_for(&state, Role::User);
        let req = Request::post("/api/cart/items")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(format!(
                r#"{{"product_id":"{}","quantity":0}}"#,
                Uuid::new_v4()
            )))
            .unwrap();
        let (status, body) = send(build_app(state), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Quantity must be at least 1");
    }

    #[tokio::test]
    async fn dates_past_the_calendar_end_are_a_bad_request() {
        let app = build_app(AppState::fake());
        let req = Request::get("/api/currencies/EUR/history?end_date=9999-12-31")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "end_date out of range");

        let state = AppState::fake();
        let token = token_for(&state, Role::Admin);
        let req = Request::get("/api/admin/analytics/sales?start_date=9999-12-01&end_date=9999-12-31")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(build_app(state), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn faq_search_needs_a_term() {
        let app = build_app(AppState::fake());
        let req = Request::get("/api/faqs/search?q=%20")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "q is required");
    }

    #[tokio::test]
    async fn unknown_routes_are_404() {
        let app = build_app(AppState::fake());
        let resp = app
            .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
