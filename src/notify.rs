//! Management-surface notifier.
//!
//! The management process runs separately and must never reach into this
//! worker's stores; its entire view of the worker is the domain-event
//! feed. The notifier subscribes to the bus and forwards each event as a
//! JSON POST to the management `/api/notify` endpoint, fire-and-forget:
//! a dead or slow management process costs nothing on the send path.

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::events::EventBus;

/// Spawn the forwarding task. Stops on its own when the bus closes.
pub fn spawn_notifier(bus: &EventBus, management_url: String) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    let endpoint = format!("{}/api/notify", management_url.trim_end_matches('/'));
    let client = reqwest::Client::new();

    tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Notifier lagged; skipping events");
                    continue;
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            };

            match client.post(&endpoint).json(&event).send().await {
                Ok(resp) if resp.status().is_success() => {}
                Ok(resp) => {
                    debug!(status = %resp.status(), "Management notify rejected");
                }
                Err(e) => {
                    debug!("Management notify failed: {}", e);
                }
            }
        }
    })
}
