//! Sigil Server - a `whoami` endpoint behind request-signature authentication.
//!
//! Every request is authenticated by the Sigil middleware and answered with
//! the identity it resolved to, which makes the server useful for checking
//! client signing code end to end.
//!
//! # Usage
//!
//! ```text
//! SIGIL_CREDENTIALS=2a241ea1e4672ee9:s3cr3t:user-42 sigil-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SIGIL_LISTEN` | `0.0.0.0:8080` | Bind address |
//! | `SIGIL_CREDENTIALS` | *(empty)* | Comma-separated `id:secret:identity` entries |
//! | `SIGIL_NAMESPACE` | `sigil` | Header namespace |
//! | `SIGIL_MAX_CLOCK_SKEW_SECS` | `300` | Freshness window |
//! | `SIGIL_REJECT_UNAUTHENTICATED` | `false` | Answer `401` instead of forwarding anonymously |
//! | `SIGIL_EXPOSE_REASONS` | `false` | Include rejection reasons in `401` bodies |
//! | `SIGIL_MAX_BODY_BYTES` | `10485760` | Request body limit |
//! | `SIGIL_REPLAY_PROTECTION` | `false` | Reject reused signatures |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod credentials;
mod gateway;
mod handler;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sigil_auth::{SignatureVerifier, StaticCredentialProvider, VerifierConfig};
use sigil_http::{AuthLayerConfig, AuthService};

use crate::credentials::load_credentials;
use crate::gateway::GatewayService;
use crate::handler::WhoAmIHandler;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve(
    listener: TcpListener,
    service: GatewayService<StaticCredentialProvider, WhoAmIHandler>,
) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    // Wait for in-flight requests to complete.
    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Probe the health endpoint of a running server.
///
/// Exits with code 0 if the response is 200 OK, 1 otherwise.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request =
        format!("GET /_sigil/health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    // Keep the write half open: hyper aborts the exchange on a half-closed peer.

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains("200 OK") && response.contains("\"running\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

/// Read the listen address from the environment.
fn listen_addr() -> String {
    std::env::var("SIGIL_LISTEN").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
}

/// Read the log level from the environment.
fn log_level() -> String {
    std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let listen_addr = listen_addr();

    // Handle --health-check flag for Docker HEALTHCHECK.
    if std::env::args().any(|a| a == "--health-check") {
        let addr = listen_addr.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&log_level())?;

    let verifier_config = VerifierConfig::from_env().context("invalid verifier configuration")?;
    let layer_config = AuthLayerConfig::from_env().context("invalid middleware configuration")?;

    let credentials = load_credentials()?;
    if credentials.is_empty() {
        warn!("SIGIL_CREDENTIALS is empty, no request can authenticate");
    }
    info!(
        credential_ids = ?credentials.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
        "loaded credentials",
    );

    info!(
        namespace = %verifier_config.namespace,
        max_clock_skew_secs = verifier_config.max_clock_skew_secs,
        reject_unauthenticated = layer_config.reject_unauthenticated,
        replay_protection = layer_config.replay_protection,
        "initializing authentication",
    );
    let verifier =
        SignatureVerifier::new(StaticCredentialProvider::new(credentials), verifier_config);
    let auth = AuthService::new(verifier, Arc::new(WhoAmIHandler), layer_config);
    let gateway = GatewayService::new(auth);

    let addr: SocketAddr = listen_addr
        .parse()
        .with_context(|| format!("invalid bind address: {listen_addr}"))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, version = VERSION, "starting Sigil Server");

    serve(listener, gateway).await
}
