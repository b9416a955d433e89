//! TRAPI workbench library - re-exports for testing and external use.
//!
//! The workbench composes knowledge-graph queries, sends them to TRAPI
//! reasoning services and renders what comes back. Everything the HTTP layer
//! does is reachable from here so it can be tested without a browser.

use std::sync::{Arc, Mutex};

pub mod aggregator;
pub mod autocomplete;
pub mod config;
pub mod dispatch;
pub mod editor;
pub mod error;
pub mod graph_view;
pub mod handlers;
pub mod lists;
pub mod meta_kg;
pub mod models;
pub mod query_graph;
pub mod render;
pub mod response;
pub mod session;
pub mod stream;
pub mod templates;
pub mod url_validator;

// ============================================================================
// Configuration
// ============================================================================

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_QUERY_ENDPOINT: &str = "/query";
pub const DEFAULT_HISTOGRAM_SOURCE: &str = "ARAX";
pub const DEFAULT_POLL_SECONDS: u64 = 5;
pub const DEFAULT_POLL_MAX: u32 = 120;
pub const DEFAULT_MAX_STREAM_BUFFER: usize = 256 * 1024 * 1024;
pub const DEFAULT_SESSION_TTL_HOURS: u64 = 24;

// ============================================================================
// Application State
// ============================================================================

pub struct AppState {
    pub config: Config,
    pub dispatcher: Dispatcher,
    pub sessions: SessionStore,
    /// Built from the provider's meta knowledge graph on first use.
    catalog: Mutex<Option<Arc<PredicateCatalog>>>,
}

impl AppState {
    pub fn new(config: Config) -> ClientResult<Self> {
        let dispatcher = Dispatcher::new(config.clone())?;
        let sessions = SessionStore::with_ttl(config.session_ttl);
        Ok(Self {
            config,
            dispatcher,
            sessions,
            catalog: Mutex::new(None),
        })
    }

    /// The predicate catalog, fetched once. A failed fetch yields an empty
    /// catalog for this call and is retried on the next one.
    pub async fn catalog(&self) -> Arc<PredicateCatalog> {
        let cached = session::lock(&self.catalog).clone();
        if let Some(c) = cached {
            return c;
        }
        match self.dispatcher.fetch_meta_knowledge_graph().await {
            Ok(meta) => {
                let catalog = Arc::new(PredicateCatalog::from_meta_kg(&meta));
                tracing::info!(predicates = catalog.all_predicates().len(), "predicate catalog loaded");
                *session::lock(&self.catalog) = Some(catalog.clone());
                catalog
            }
            Err(e) => {
                tracing::warn!(error = %e, "meta knowledge graph unavailable");
                Arc::new(PredicateCatalog::default())
            }
        }
    }

    pub fn set_catalog(&self, catalog: PredicateCatalog) {
        *session::lock(&self.catalog) = Some(Arc::new(catalog));
    }
}

// Re-export commonly used types
pub use config::Config;
pub use dispatch::{build_request_body, Dispatcher, QueryKind, Target};
pub use error::{ClientError, ClientResult};
pub use meta_kg::PredicateCatalog;
pub use query_graph::GraphState;
pub use response::{classify_response, ResponseOutcome};
pub use session::{Session, SessionStore, SESSION_COOKIE};
pub use stream::{JsonStreamParser, Progress, RunStatus, StreamEvent};
