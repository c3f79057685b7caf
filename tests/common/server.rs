//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own problem database, an
//! in-memory status store and fake upstream sources.

use super::constants::*;
use super::fixtures::{FakeMetadataApi, FakeProblemSite};
use problem_collector::collector::{
    create_collector, CollectorContext, CollectorMetrics, PacingController,
};
use problem_collector::config::CollectorSettings;
use problem_collector::problem_store::SqliteProblemStore;
use problem_collector::server::{make_app, RequestsLoggingLevel, ServerState};
use problem_collector::status_store::InMemoryJobStatusStore;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Test server instance with an isolated problem database
///
/// When dropped, the server and the job executor shut down and temp
/// resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Problem store for direct database access in tests
    pub problem_store: Arc<SqliteProblemStore>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    shutdown_token: CancellationToken,
}

impl TestServer {
    /// Spawns a new test server on a random port, with pacing disabled
    pub async fn spawn() -> Self {
        Self::spawn_with_settings(CollectorSettings::default()).await
    }

    pub async fn spawn_with_settings(settings: CollectorSettings) -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp dir");
        let problem_store = Arc::new(
            SqliteProblemStore::new(temp_db_dir.path().join("problems.db"))
                .expect("Failed to open problem store"),
        );
        let metrics = Arc::new(CollectorMetrics::new().expect("Failed to create metrics"));

        let ctx = CollectorContext::new(
            Arc::new(InMemoryJobStatusStore::new()),
            problem_store.clone(),
            Arc::new(FakeMetadataApi::new()),
            Arc::new(FakeProblemSite::new()),
            metrics.clone(),
            settings,
        )
        .with_pacing(PacingController::disabled());

        let shutdown_token = CancellationToken::new();
        let (mut executor, handle) = create_collector(ctx, shutdown_token.child_token());
        tokio::spawn(async move { executor.run().await });

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let app = make_app(ServerState::new(RequestsLoggingLevel::None, handle, metrics));
        let server_shutdown = shutdown_token.child_token();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            problem_store,
            _temp_db_dir: temp_db_dir,
            shutdown_token,
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}
