use std::net::SocketAddr;

use axum::{middleware, routing::get, Router};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::config::RunMode;
use crate::error::{expose_error_detail, not_found_fallback, panic_response};
use crate::state::AppState;
use crate::{admin, auth, profiles};

pub fn build_app(state: AppState) -> Router {
    let mode = state.config.run_mode;
    let router = Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .route("/health", get(|| async { "ok" })),
        )
        .merge(profiles::router())
        .nest("/api/v1/admin", admin::router())
        .fallback(not_found_fallback)
        .with_state(state);
    with_layers(router, mode)
}

/// Panic capture, error detail exposure, tracing and CORS, innermost first.
pub fn with_layers(router: Router, mode: RunMode) -> Router {
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn_with_state(mode, expose_error_detail))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
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
        .layer(CorsLayer::permissive())
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
