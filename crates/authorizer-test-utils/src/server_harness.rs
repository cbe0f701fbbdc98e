//! Test server harness for E2E testing
//!
//! Provides `TestAuthorizerServer` for spawning real authorizer instances in
//! tests, wired to a mock issuer.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use todo_authorizer::config::Config;
use todo_authorizer::observability::metrics::init_metrics_recorder;
use todo_authorizer::routes::{self, AppState};
use tokio::task::JoinHandle;

static TEST_METRICS_HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> =
    OnceLock::new();

/// The Prometheus recorder can only be installed once per process.
fn test_metrics_handle() -> metrics_exporter_prometheus::PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder().unwrap_or_else(|_| {
                metrics_exporter_prometheus::PrometheusBuilder::new()
                    .build_recorder()
                    .handle()
            })
        })
        .clone()
}

/// Test harness for spawning the authorizer in E2E tests.
///
/// # Example
/// ```rust,ignore
/// let idp = MockIssuer::start(&[TestSigningKey::primary("abc")]).await;
/// let server = TestAuthorizerServer::spawn(&idp.issuer()).await?;
///
/// let response = reqwest::get(format!("{}/health", server.url())).await?;
/// assert_eq!(response.status(), 200);
/// ```
pub struct TestAuthorizerServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    _handle: JoinHandle<()>,
}

impl TestAuthorizerServer {
    /// Spawn a server trusting `issuer`, with default settings.
    pub async fn spawn(issuer: &str) -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(issuer, HashMap::new()).await
    }

    /// Spawn a server trusting `issuer`, with extra environment variables.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn_with_vars(
        issuer: &str,
        extra_vars: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            ("AUTH_ISSUER".to_string(), issuer.to_string()),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "2".to_string()),
        ]);
        vars.extend(extra_vars);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = Arc::new(AppState::new(config));

        // Build routes using the service's real route builder
        let app = routes::build_routes(state.clone(), test_metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shared application state, including the key cache.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.state.config
    }
}

impl Drop for TestAuthorizerServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
