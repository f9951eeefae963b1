//! Credential reload triggers.
//!
//! The store only knows how to `reload()`. This task decides when: on SIGHUP,
//! on a fixed interval, or never. It exits when the shutdown flag flips.

use std::sync::Arc;
use std::time::Duration;

use signgate_auth::CredentialStore;
use signgate_core::ReloadTrigger;
use tokio::sync::watch;
use tracing::{info, warn};

/// Drive reloads of `store` according to `trigger` until shutdown.
pub async fn run(
    store: Arc<CredentialStore>,
    trigger: ReloadTrigger,
    mut shutdown: watch::Receiver<bool>,
) {
    match trigger {
        ReloadTrigger::Disabled => {
            info!("credential reload disabled");
        }
        ReloadTrigger::Interval { seconds } => {
            info!(seconds, "reloading credentials on an interval");
            let mut ticker = tokio::time::interval(Duration::from_secs(seconds));
            // The first tick completes immediately; the store is already loaded.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        store.reload().await.ok();
                    }
                    _ = shutdown.changed() => break,
                }
            }
        }
        ReloadTrigger::Signal => run_on_signal(&store, &mut shutdown).await,
    }
}

#[cfg(unix)]
async fn run_on_signal(store: &CredentialStore, shutdown: &mut watch::Receiver<bool>) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(e) => {
            warn!(error = %e, "cannot listen for SIGHUP, credential reload disabled");
            return;
        }
    };
    info!("reloading credentials on SIGHUP");

    loop {
        tokio::select! {
            received = hangup.recv() => {
                if received.is_none() {
                    break;
                }
                info!("received SIGHUP, reloading credentials");
                store.reload().await.ok();
            }
            _ = shutdown.changed() => break,
        }
    }
}

#[cfg(not(unix))]
async fn run_on_signal(_store: &CredentialStore, _shutdown: &mut watch::Receiver<bool>) {
    warn!("SIGHUP is not available on this platform, credential reload disabled");
}
