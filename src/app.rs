use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, meals};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(meals::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::JwtKeys;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn get_with_token(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut req = Request::builder().uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        req.body(Body::empty()).unwrap()
    }

    async fn json_body(res: axum::response::Response) -> serde_json::Value {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_app(AppState::fake());
        let res = app.oneshot(get_with_token("/api/health", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn meals_require_a_token() {
        let app = build_app(AppState::fake());
        let res = app.oneshot(get_with_token("/api/meals", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(res).await;
        assert_eq!(body["error"], "unauthorized");
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_token() {
        let state = AppState::fake();
        let keys = JwtKeys::from(&state.config.jwt);
        let refresh = keys.sign_refresh(Uuid::new_v4()).unwrap();

        let app = build_app(state);
        let res = app
            .oneshot(get_with_token("/api/meals", Some(&refresh)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_endpoint_validates_token_before_lookup() {
        let state = AppState::fake();
        let access = JwtKeys::from(&state.config.jwt)
            .sign_access(Uuid::new_v4())
            .unwrap();

        let cases = [
            (serde_json::json!({ "refresh_token": "  " }), StatusCode::BAD_REQUEST),
            (serde_json::json!({ "refresh_token": access }), StatusCode::UNAUTHORIZED),
        ];
        for (body, expected) in cases {
            let req = Request::builder()
                .method("POST")
                .uri("/api/auth/refresh")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap();
            let res = build_app(state.clone()).oneshot(req).await.unwrap();
            assert_eq!(res.status(), expected);
        }
    }

    #[tokio::test]
    async fn food_search_goes_through_the_search_backend() {
        let state = AppState::fake();
        let keys = JwtKeys::from(&state.config.jwt);
        let token = keys.sign_access(Uuid::new_v4()).unwrap();

        let app = build_app(state);
        let res = app
            .oneshot(get_with_token("/api/meals/search?query=apple&page_size=5", Some(&token)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = json_body(res).await;
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["name"], "apple #0");
        assert_eq!(items[0]["nutrition"]["calories"], 50.0);
    }

    #[tokio::test]
    async fn blank_food_query_is_rejected() {
        let state = AppState::fake();
        let token = JwtKeys::from(&state.config.jwt)
            .sign_access(Uuid::new_v4())
            .unwrap();

        let app = build_app(state);
        let res = app
            .oneshot(get_with_token("/api/meals/search?query=%20%20", Some(&token)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = json_body(res).await;
        assert!(body["fields"]["query"].is_string());
    }

    #[tokio::test]
    async fn out_of_range_tz_offset_is_rejected_before_any_query() {
        let state = AppState::fake();
        let token = JwtKeys::from(&state.config.jwt)
            .sign_access(Uuid::new_v4())
            .unwrap();

        for uri in [
            "/api/meals/summary?tz_offset=2000",
            "/api/meals/weekly-stats?tz_offset=-900",
            "/api/meals/history?tz_offset=841",
        ] {
            let res = build_app(state.clone())
                .oneshot(get_with_token(uri, Some(&token)))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    fn post_json(uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
        let mut req = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        req.body(Body::from(body.to_string())).unwrap()
    }

    async fn assert_field_error(res: axum::response::Response, field: &str) {
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let content_type = res.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with("application/json"), "{content_type}");
        let body = json_body(res).await;
        assert_eq!(body["error"], "validation_error");
        assert!(body["fields"][field].is_string(), "{body}");
    }

    #[tokio::test]
    async fn malformed_bodies_use_the_error_body() {
        let state = AppState::fake();
        let token = JwtKeys::from(&state.config.jwt)
            .sign_access(Uuid::new_v4())
            .unwrap();

        let res = build_app(state.clone())
            .oneshot(post_json(
                "/api/auth/register",
                None,
                r#"{"name": "Ada", "email": "ada@example.com"}"#,
            ))
            .await
            .unwrap();
        assert_field_error(res, "body").await;

        let res = build_app(state.clone())
            .oneshot(post_json("/api/meals", Some(&token), r#"{"name": "Soup", "calories": "lots"}"#))
            .await
            .unwrap();
        assert_field_error(res, "body").await;

        let res = build_app(state.clone())
            .oneshot(post_json("/api/auth/login", None, "{not json"))
            .await
            .unwrap();
        assert_field_error(res, "body").await;

        let req = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .body(Body::from(r#"{"email": "a@b.co", "password": "x"}"#))
            .unwrap();
        let res = build_app(state).oneshot(req).await.unwrap();
        assert_field_error(res, "content_type").await;
    }

    #[tokio::test]
    async fn malformed_query_and_path_use_the_error_body() {
        let state = AppState::fake();
        let token = JwtKeys::from(&state.config.jwt)
            .sign_access(Uuid::new_v4())
            .unwrap();

        for uri in [
            "/api/meals/summary?tz_offset=abc",
            "/api/meals/history?tz_offset=99999999999",
            "/api/meals?limit=many",
        ] {
            let res = build_app(state.clone())
                .oneshot(get_with_token(uri, Some(&token)))
                .await
                .unwrap();
            assert_field_error(res, "query").await;
        }

        let res = build_app(state)
            .oneshot(get_with_token("/api/meals/not-a-uuid", Some(&token)))
            .await
            .unwrap();
        assert_field_error(res, "path").await;
    }

    #[tokio::test]
    async fn extreme_tz_offsets_are_rejected() {
        let state = AppState::fake();
        let token = JwtKeys::from(&state.config.jwt)
            .sign_access(Uuid::new_v4())
            .unwrap();

        for uri in [
            "/api/meals/history?tz_offset=-2147483648",
            "/api/meals/summary?tz_offset=2147483647",
            "/api/meals/weekly-stats?tz_offset=-2147483647",
        ] {
            let res = build_app(state.clone())
                .oneshot(get_with_token(uri, Some(&token)))
                .await
                .unwrap();
            assert_field_error(res, "tz_offset").await;
        }
    }

    #[tokio::test]
    async fn calendar_edge_dates_are_rejected() {
        let state = AppState::fake();
        let token = JwtKeys::from(&state.config.jwt)
            .sign_access(Uuid::new_v4())
            .unwrap();

        let cases = [
            ("/api/meals/summary?date=9999-12-31", "date"),
            ("/api/meals/summary?date=9999-12-31&tz_offset=840", "date"),
            ("/api/meals/weekly-stats?end=9999-12-31", "end"),
            ("/api/meals/weekly-stats?end=-9999-01-02", "end"),
        ];
        for (uri, field) in cases {
            let res = build_app(state.clone())
                .oneshot(get_with_token(uri, Some(&token)))
                .await
                .unwrap();
            assert_field_error(res, field).await;
        }
    }

    #[tokio::test]
    async fn history_days_out_of_range_is_rejected() {
        let state = AppState::fake();
        let token = JwtKeys::from(&state.config.jwt)
            .sign_access(Uuid::new_v4())
            .unwrap();

        let res = build_app(state)
            .oneshot(get_with_token("/api/meals/history?days=0", Some(&token)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
