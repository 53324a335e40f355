//! Network reachability capability.
//!
//! The fetcher asks [`Reachability::is_reachable`] before every fetch and
//! never caches the answer. How reachability is determined is up to the
//! implementation: [`ManualReachability`] is a flag set by the caller,
//! [`ConnectivityMonitor`] probes the tile host in the background.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Answers "is the network currently reachable?".
pub trait Reachability: Send + Sync {
    fn is_reachable(&self) -> bool;
}

/// Reachability flag controlled by the caller.
#[derive(Debug)]
pub struct ManualReachability {
    reachable: AtomicBool,
}

impl ManualReachability {
    pub fn new(reachable: bool) -> Self {
        Self {
            reachable: AtomicBool::new(reachable),
        }
    }

    pub fn online() -> Self {
        Self::new(true)
    }

    pub fn offline() -> Self {
        Self::new(false)
    }

    pub fn set(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }
}

impl Reachability for ManualReachability {
    fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }
}

/// Default interval between background probes.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(15);

/// Default connect timeout of a single probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Reachability derived from periodic TCP connects to the tile host.
///
/// The probe loop runs until the cancellation token fires.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    target: String,
    reachable: Arc<AtomicBool>,
}

impl ConnectivityMonitor {
    /// Probes `target` (`host:port`) once, then keeps probing every
    /// `interval` in a background task.
    pub async fn start(
        target: impl Into<String>,
        interval: Duration,
        probe_timeout: Duration,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        let target = target.into();
        let initial = probe(&target, probe_timeout).await;
        info!(target = %target, reachable = initial, "Connectivity monitor started");

        let monitor = Arc::new(Self {
            target: target.clone(),
            reachable: Arc::new(AtomicBool::new(initial)),
        });

        let flag = Arc::clone(&monitor.reachable);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!(target = %target, "Connectivity monitor stopped");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        let now = probe(&target, probe_timeout).await;
                        let before = flag.swap(now, Ordering::SeqCst);
                        if before != now {
                            info!(target = %target, reachable = now, "Network reachability changed");
                        }
                    }
                }
            }
        });

        monitor
    }

    /// The `host:port` being probed.
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl Reachability for ConnectivityMonitor {
    fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }
}

/// Derives a `host:port` probe target from a base or tile URL.
///
/// Returns `None` if the URL cannot be parsed or has no host.
pub fn probe_target(base_url: &str) -> Option<String> {
    let url = reqwest::Url::parse(base_url).ok()?;
    let host = url.host_str()?;
    let port = url.port_or_known_default()?;
    Some(format!("{}:{}", host, port))
}

async fn probe(target: &str, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(timeout, TcpStream::connect(target)).await,
        Ok(Ok(_))
    )
}
