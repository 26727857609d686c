//! HTTP front end.
//!
//! ## Endpoints
//!
//! - `GET /search?query=<text>` returns the merged, price-sorted product list
//!   as a JSON array
//! - every other path is served from the static asset directory

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use pricehound_search::{Orchestrator, ProductSource, SearchError};
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::error::Result;

/// Query string of `GET /search`.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Free-text query. A missing parameter is treated as empty.
    #[serde(default)]
    pub query: String,
}

/// Shared state for the router.
pub struct AppState<A, B> {
    orchestrator: Arc<Orchestrator<A, B>>,
}

impl<A, B> Clone for AppState<A, B> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: Arc::clone(&self.orchestrator),
        }
    }
}

/// Build the service router.
pub fn router<A, B>(orchestrator: Arc<Orchestrator<A, B>>, static_dir: &Path) -> Router
where
    A: ProductSource + 'static,
    B: ProductSource + 'static,
{
    let state = AppState { orchestrator };
    Router::new()
        .route("/search", get(handle_search::<A, B>))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `listener` and serve until `shutdown` resolves.
///
/// # Errors
///
/// Returns [`ServiceError::Io`](crate::error::ServiceError::Io) if the server
/// fails.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "listening");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn handle_search<A, B>(
    State(state): State<AppState<A, B>>,
    Query(params): Query<SearchParams>,
) -> Response
where
    A: ProductSource + 'static,
    B: ProductSource + 'static,
{
    match state.orchestrator.search(&params.query).await {
        Ok(products) => Json(products).into_response(),
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                tracing::error!(error = %e, "search failed");
            }
            (status, e.to_string()).into_response()
        }
    }
}

/// HTTP status for a search failure.
pub fn status_for(error: &SearchError) -> StatusCode {
    match error {
        SearchError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
