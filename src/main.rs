//! TRAPI workbench web server.
//!
//! The library is organized into the following modules:
//!
//! - `query_graph` / `editor`: the session's query graph and its editors
//! - `dispatch` / `stream` / `aggregator`: query submission and progress tracking
//! - `response` / `render`: response classification and view models
//! - `templates`: HTML/CSS/JS rendering
//! - `handlers`: HTTP route handlers
//!
//! Configuration comes from `TRAPI_*` environment variables; see `config`.

use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use trapi_workbench::{handlers, AppState, Config};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "trapi_workbench=info,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let bind = config.bind.clone();
    tracing::info!(
        base = %config.base,
        aggregator = config.aggregator_url.as_deref().unwrap_or("disabled"),
        "starting workbench"
    );

    let state = match AppState::new(config) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return;
        }
    };

    let app = handlers::app(state).layer(TraceLayer::new_for_http());

    let listener = match tokio::net::TcpListener::bind(&bind).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%bind, error = %e, "failed to bind");
            return;
        }
    };
    tracing::info!("workbench running at http://{}", bind);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server error");
    }
}
