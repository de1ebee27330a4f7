//! turnline - conversational client core
//!
//! Serializes user turns against a chat session, gates input while a turn
//! is in flight, and keeps a transcript in sync with the session history.

mod api;
mod llm;
mod render;
mod runtime;
mod state_machine;

use api::{create_router, AppState};
use llm::{ChatConfig, GeminiChat, LoggingService};
use runtime::{ChatSession, ConversationService};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "turnline=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = ChatConfig::from_env()?;
    let history = config.seed_history()?;
    tracing::info!(
        model = %config.model,
        gateway = config.gateway.is_some(),
        seed_turns = history.len(),
        "Starting chat session"
    );

    let gemini = GeminiChat::new(&config, history)?;
    let service: Arc<dyn ConversationService> = Arc::new(LoggingService::new(Arc::new(gemini)));

    // One session for the lifetime of the process
    let session = ChatSession::new(service);
    let _sync = session.start();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(AppState::new(session))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("turnline listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
