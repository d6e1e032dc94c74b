use crate::error::AppError;
use crate::models::AppSettings;
use photo_queue::{ConnectivityMonitor, UploadSession};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Handles of the probe loop and the draining loop
pub struct BackgroundSync {
    probe: Option<JoinHandle<()>>,
    drainer: JoinHandle<()>,
}

impl BackgroundSync {
    /// Stops both loops. A drain in progress is abandoned; its current
    /// record stays queued.
    pub fn stop(self) {
        if let Some(probe) = self.probe {
            probe.abort();
        }
        self.drainer.abort();
        log::info!("Background sync stopped");
    }
}

/// Any HTTP answer counts as reachable; only transport errors mean offline
pub async fn probe_once(client: &reqwest::Client, url: &str) -> bool {
    match client.head(url).send().await {
        Ok(response) => {
            log::trace!("Probe {} answered {}", url, response.status());
            true
        }
        Err(e) => {
            log::debug!("Probe {} failed: {}", url, e);
            false
        }
    }
}

/// Feeds `monitor` with the reachability of `url` every `interval`
pub async fn run_connectivity_probe(
    monitor: ConnectivityMonitor,
    client: reqwest::Client,
    url: String,
    interval: Duration,
) {
    log::info!(
        "Starting connectivity probe of {} every {} seconds",
        url,
        interval.as_secs()
    );

    loop {
        let online = probe_once(&client, &url).await;
        monitor.set_online(online);
        tokio::time::sleep(interval).await;
    }
}

pub fn probe_client(settings: &AppSettings) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.connectivity.probe_timeout_secs.max(1)))
        .build()
        .map_err(|e| AppError::Other(format!("HTTP client error: {}", e)))
}

/// Starts the probe and the connectivity-driven drain loop.
///
/// Without a probe URL the device is assumed to be online for the whole
/// session.
pub fn start_background_sync(
    session: Arc<UploadSession>,
    settings: &AppSettings,
) -> Result<BackgroundSync, AppError> {
    let probe = match settings.probe_url() {
        Some(url) => {
            let client = probe_client(settings)?;
            let interval = Duration::from_secs(settings.connectivity.probe_interval_secs.max(1));
            Some(tokio::spawn(run_connectivity_probe(
                session.connectivity().clone(),
                client,
                url.to_string(),
                interval,
            )))
        }
        None => {
            log::warn!("No probe URL configured, assuming the device stays online");
            session.connectivity().set_online(true);
            None
        }
    };

    let drainer = tokio::spawn(session.run());

    Ok(BackgroundSync { probe, drainer })
}
