//! HTTP server
//!
//! Exposes the orchestrator over JSON and SSE:
//! - GET /api/status - Health check and active budgets
//! - POST /api/query - Run a query and return the terminal record
//! - POST /api/query/stream - Run a query as a Server-Sent Events stream

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use agentic_rag::{Orchestrator, QueryResponse};

// ============================================================================
// Request Types
// ============================================================================

/// Query request body
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    /// Restrict internal retrieval to this session's documents
    #[serde(default)]
    pub session_id: Option<String>,
}

impl QueryRequest {
    fn validated(self) -> Result<Self, (StatusCode, String)> {
        if self.query.trim().is_empty() {
            return Err((StatusCode::BAD_REQUEST, "query cannot be empty".to_string()));
        }
        Ok(self)
    }
}

// ============================================================================
// Server State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
}

// ============================================================================
// Routes
// ============================================================================

/// Create the router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/query", post(query_handler))
        .route("/api/query/stream", post(query_stream_handler))
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(addr: SocketAddr, orchestrator: Orchestrator) -> Result<()> {
    let app = create_router(AppState { orchestrator });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

async fn status_handler(State(state): State<AppState>) -> Json<Value> {
    let orchestrator = &state.orchestrator;

    Json(json!({
        "status": "ok",
        "llm_provider": orchestrator.llm().primary_kind().as_str(),
        "llm_fallback": orchestrator.llm().has_fallback(),
        "config": orchestrator.config(),
    }))
}

async fn query_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, (StatusCode, String)> {
    let request = request.validated()?;

    let response = state
        .orchestrator
        .run_with_session(&request.query, request.session_id.as_deref())
        .await;

    Ok(Json(response))
}

async fn query_stream_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, String)> {
    let request = request.validated()?;

    let mut events = state
        .orchestrator
        .stream(request.query, request.session_id);

    let stream = async_stream::stream! {
        while let Some(event) = events.next().await {
            yield Ok(Event::default()
                .event(event.event_type())
                .data(event.data().to_string()));
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

// ============================================================================
// Tests
// ============================================================================
