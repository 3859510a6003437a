//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{Router, routing::get};
use tokio::{net::TcpListener, task::JoinHandle};
use tower_http::trace::TraceLayer;

use super::{
    handler::{
        edge_handler, federation_handler, get_federation, get_presence, health_check,
        presence_handler, resonance_handler, threshold_handler, weave_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// Real-time coordination server
///
/// Serves every space and the federation endpoint on one listener, and runs
/// the fade sweepers and the federation heartbeat alongside.
///
/// # Example
///
/// ```ignore
/// let server = Server::new(app_state);
/// server.run("127.0.0.1".to_string(), 3333).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Every route of the server. Unknown paths fall through to 404.
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/presence", get(presence_handler))
            .route("/edge-ws", get(edge_handler))
            .route("/weave-ws", get(weave_handler))
            .route("/resonance-ws", get(resonance_handler))
            .route("/threshold-ws", get(threshold_handler))
            .route("/federation", get(federation_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/federation", get(get_federation))
            .route("/api/presence", get(get_presence))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind to `host:port` and serve until Ctrl+C or SIGTERM
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Between server listening on {}", listener.local_addr()?);
        tracing::info!(
            "Federation instance '{}' ({})",
            self.state.federation.instance().name,
            self.state.federation.instance().id
        );
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// Connected peers are sent `goodbye` before the listener closes.
    pub async fn serve<S>(self, listener: TcpListener, shutdown: S) -> std::io::Result<()>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let background = self.spawn_background_tasks();
        let federation = self.state.federation.clone();
        let app = self.router();

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                federation.farewell().await;
            })
            .await;

        for task in background {
            task.abort();
        }
        result
    }

    fn spawn_background_tasks(&self) -> Vec<JoinHandle<()>> {
        vec![
            self.state.edge.clone().spawn_sweeper(),
            self.state.weave.clone().spawn_sweeper(),
            self.state.resonance.clone().spawn_sweeper(),
            self.state.federation.clone().spawn_heartbeat(),
        ]
    }

    /// Shared state, for wiring start-up work such as dialling peers
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }
}
