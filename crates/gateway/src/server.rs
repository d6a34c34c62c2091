use std::{sync::Arc, time::Duration};

use {
    axum::{
        Router,
        extract::{State, rejection::JsonRejection},
        http::StatusCode,
        response::{Html, IntoResponse, Json, Response},
        routing::{get, post},
    },
    saju_agents::DispatchResult,
    saju_config::SajuConfig,
    serde::Deserialize,
    serde_json::json,
    tokio::net::TcpListener,
    tokio_util::sync::CancellationToken,
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::{debug, info, warn},
};

use crate::{
    prompt::{BirthInfo, DatePart, INVALID_REQUEST_MESSAGE, Language, build_prompt, today_kst},
    state::{GatewayState, NotifierHandle, build_dispatcher},
};

const INDEX_HTML: &str = include_str!("../assets/index.html");

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<GatewayState>,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/analyze", post(analyze_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { gateway: state })
}

/// Start the HTTP server and run until Ctrl-C / SIGTERM.
pub async fn start_gateway(config: &SajuConfig) -> anyhow::Result<()> {
    let notifier = NotifierHandle::from_config(&config.notify);
    let dispatcher = build_dispatcher(config, Arc::clone(&notifier.notifier));
    let shutdown = CancellationToken::new();
    let state = GatewayState::new(dispatcher);

    info!(
        credentials = state.dispatcher.credentials().len(),
        models = ?state.dispatcher.models().as_slice(),
        "dispatcher ready"
    );

    let app = build_gateway_app(Arc::clone(&state));
    let listener = bind_listener(&config.server.bind, config.server.port).await?;
    let addr = listener.local_addr()?;
    info!(%addr, version = %state.version, "gateway listening");

    spawn_signal_listener(shutdown.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    info!("gateway stopped, flushing notifications");
    drop(state);
    notifier
        .drain(Duration::from_secs(config.notify.timeout_secs.max(1) + 1))
        .await;
    Ok(())
}

/// Bind `host:port`. `host` may be an IPv4 or IPv6 literal or a hostname.
async fn bind_listener(host: &str, port: u16) -> std::io::Result<TcpListener> {
    TcpListener::bind((host, port)).await
}

fn spawn_signal_listener(shutdown: CancellationToken) {
    let on_ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl-C, shutting down");
        }
        on_ctrl_c.cancel();
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                if term.recv().await.is_some() {
                    info!("received SIGTERM, shutting down");
                    shutdown.cancel();
                }
            },
            Err(e) => warn!(error = %e, "could not install SIGTERM handler"),
        }
    });
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let dispatcher = &state.gateway.dispatcher;
    Json(json!({
        "status": "ok",
        "version": state.gateway.version,
        "credentials": dispatcher.credentials().len(),
        "models": dispatcher.models().as_slice(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub year: DatePart,
    pub month: DatePart,
    pub day: DatePart,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

async fn analyze_handler(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => {
            debug!(error = %rejection.body_text(), "rejecting analyze request");
            return invalid_request();
        },
    };

    let language = req
        .language
        .as_deref()
        .map(Language::from_code)
        .unwrap_or_default();
    let info = match BirthInfo::new(&req.year, &req.month, &req.day, req.time.as_deref()) {
        Ok(info) => info,
        Err(e) => {
            debug!(error = %e, "rejecting analyze request");
            return invalid_request();
        },
    };

    let prompt = build_prompt(&info, language, today_kst());

    // Only a dropped handler (client gone) cancels the dispatch. Server
    // shutdown waits for in-flight requests instead.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    match state.gateway.dispatcher.dispatch(&prompt, &cancel).await {
        DispatchResult::Success { text, .. } => Json(json!({ "result": text })).into_response(),
        DispatchResult::Failure {
            last_error,
            attempts,
        } => Json(json!({
            "result": language.apology(),
            "error": {
                "kind": last_error.kind().as_str(),
                "attempts": attempts,
            },
        }))
        .into_response(),
    }
}

fn invalid_request() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "result": INVALID_REQUEST_MESSAGE,
            "error": { "kind": "invalid_request" },
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binds_ipv4_literal_with_ephemeral_port() {
        let listener = bind_listener("127.0.0.1", 0).await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert!(addr.is_ipv4());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn binds_bare_ipv6_literal() {
        // Hosts without IPv6 cannot bind `::1`; only a parse error is a bug.
        match bind_listener("::1", 0).await {
            Ok(listener) => assert!(listener.local_addr().unwrap().is_ipv6()),
            Err(e) => assert_ne!(e.kind(), std::io::ErrorKind::InvalidInput, "{e}"),
        }
    }

    #[tokio::test]
    async fn binds_hostname() {
        let listener = bind_listener("localhost", 0).await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());
    }
}
