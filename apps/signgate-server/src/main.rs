//! SignGate Server - authenticating reverse proxy.
//!
//! Accepts HTTP requests signed with a shared-secret HMAC, verifies the
//! signature and body digest, and forwards verified requests to a single
//! upstream. Everything else is refused with a JSON error body.
//!
//! # Usage
//!
//! ```text
//! CREDENTIALS_PATH=/etc/signgate/credentials.json UPSTREAM_PORT=3000 signgate-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:8080` | Bind address |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `LOG_FORMAT` | `text` | `text` or `json` |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |
//! | `CORRELATION_ENABLE` | `true` | Propagate or generate correlation ids |
//! | `CORRELATION_HEADER` | `X-Request-Identifier` | Correlation header name |
//! | `CREDENTIALS_PATH` | `credentials.json` | JSON object of identity to secret |
//! | `CREDENTIALS_RELOAD` | `signal` | `signal` (SIGHUP), `none`, or seconds between reloads |
//! | `SIGNING_ALGORITHM` | `hmac-sha256` | `hmac-sha256` or `hmac-sha512` |
//! | `SIGNING_SCHEME` | `HMAC` | `Authorization` scheme token |
//! | `SIGNING_SKEW_MILLIS` | `300000` | Allowed clock skew |
//! | `UPSTREAM_HOSTNAME` | `127.0.0.1` | Upstream host |
//! | `UPSTREAM_PORT` | `3000` | Upstream port |
//! | `UPSTREAM_TIMEOUT_MS` | `10000` | Upstream exchange timeout |
//! | `REQUEST_TIMEOUT_MS` | `30000` | Whole-request deadline |
//! | `MAX_BODY_BYTES` | `10485760` | Largest body accepted for verification |
//! | `HEALTH_PATH` | `/_gateway/health` | Health endpoint path (empty disables it) |

mod reload;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use signgate_auth::CredentialStore;
use signgate_core::{GatewayConfig, LogFormat};
use signgate_http::{GatewayService, Pipeline};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How long `--health-check` waits for the gateway to answer.
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialize the tracing subscriber.
fn init_tracing(log_level: &str, format: LogFormat) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }

    Ok(())
}

/// Resolve when the process is asked to stop (Ctrl-C, or SIGTERM on unix).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
                return;
            }
            Err(e) => warn!(error = %e, "cannot listen for SIGTERM, using Ctrl-C only"),
        }
    }

    tokio::signal::ctrl_c().await.ok();
}

/// Accept connections until `shutdown` resolves, then drain.
///
/// In-flight requests are bounded by the request deadline, so the drain waits
/// at most `drain_timeout` before giving up on stragglers.
async fn serve(
    listener: TcpListener,
    service: GatewayService,
    shutdown: impl Future<Output = ()>,
    drain_timeout: Duration,
) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());
    tokio::pin!(shutdown);

    loop {
        let (stream, peer_addr) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "failed to accept connection");
                    continue;
                }
            },
            () = &mut shutdown => break,
        };

        let conn = http
            .serve_connection(TokioIo::new(stream), service.clone())
            .into_owned();
        let conn = graceful.watch(conn);
        tokio::spawn(async move {
            match conn.await {
                Ok(()) => debug!(%peer_addr, "connection closed"),
                Err(e) => error!(%peer_addr, error = %e, "connection error"),
            }
        });
    }

    info!(
        drain_timeout_ms = u64::try_from(drain_timeout.as_millis()).unwrap_or(u64::MAX),
        "draining connections"
    );
    if tokio::time::timeout(drain_timeout, graceful.shutdown())
        .await
        .is_err()
    {
        warn!("drain timed out, dropping remaining connections");
    } else {
        info!("all connections drained");
    }

    Ok(())
}

/// Address a local health probe should connect to for `listen`.
fn health_check_addr(listen: &str) -> String {
    listen.replace("0.0.0.0", "127.0.0.1")
}

/// Ask a running gateway for its health report.
///
/// Succeeds only for a `200` whose JSON body says `"status": "running"`.
async fn run_health_check(addr: &str, path: &str) -> Result<()> {
    let probe = async {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("cannot connect to {addr}"))?;
        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .context("HTTP handshake failed")?;
        tokio::spawn(conn);

        let request = http::Request::get(path)
            .header(http::header::HOST, addr)
            .body(Empty::<Bytes>::new())?;
        let response = sender.send_request(request).await?;
        let status = response.status();
        let body = response.into_body().collect().await?.to_bytes();
        anyhow::Ok((status, body))
    };

    let (status, body) = tokio::time::timeout(HEALTH_CHECK_TIMEOUT, probe)
        .await
        .with_context(|| format!("no answer from {addr}"))??;
    if status != http::StatusCode::OK {
        anyhow::bail!("health endpoint on {addr} returned {status}");
    }
    let report: serde_json::Value =
        serde_json::from_slice(&body).context("health report is not JSON")?;
    if report["status"] != "running" {
        anyhow::bail!("gateway on {addr} reports {}", report["status"]);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = GatewayConfig::from_env().context("invalid configuration")?;

    // Handle --health-check flag for container health probes.
    if std::env::args().any(|a| a == "--health-check") {
        let addr = health_check_addr(&config.listen);
        let healthy = match config.health_path.as_deref() {
            Some(path) => run_health_check(&addr, path).await.is_ok(),
            None => false,
        };
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&config.log_level, config.log_format)?;

    let store = CredentialStore::load(&config.credentials.path)
        .await
        .with_context(|| {
            format!(
                "failed to load credentials from {}",
                config.credentials.path.display()
            )
        })?;
    let store = Arc::new(store);

    let pipeline = Pipeline::from_config(&config, store.clone())
        .context("invalid pipeline configuration")?;
    let stages = pipeline.stage_names();
    let service =
        GatewayService::new(pipeline, &config).with_credential_status(Arc::clone(&store));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reload_task = tokio::spawn(reload::run(
        Arc::clone(&store),
        config.credentials.reload_trigger,
        shutdown_rx,
    ));

    let addr = config.listen_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(
        %addr,
        stages = ?stages,
        upstream = %config.upstream.authority(),
        identities = store.status().identities,
        version = VERSION,
        "starting SignGate Server",
    );

    let shutdown = async {
        shutdown_signal().await;
        info!("received shutdown signal");
    };
    serve(listener, service, shutdown, config.request_timeout()).await?;

    shutdown_tx.send(true).ok();
    reload_task.await.ok();

    Ok(())
}
