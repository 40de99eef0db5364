use std::time::Duration;

use crate::error::RegistryError;

/// Sends one heartbeat synchronously (so a misconfigured registry URL fails
/// fast, here, rather than silently in a background task), then keeps
/// renewing every `period` in the background for as long as the process
/// runs. `period` of zero uses [`georpc_protocol::default_heartbeat_period`].
pub async fn heartbeat(
    registry_url: impl Into<String>,
    addr: impl Into<String>,
    period: Duration,
) -> Result<(), RegistryError> {
    let registry_url = registry_url.into();
    let addr = addr.into();
    let period = if period.is_zero() {
        georpc_protocol::default_heartbeat_period()
    } else {
        period
    };
    let client = reqwest::Client::new();
    send_heartbeat(&client, &registry_url, &addr).await?;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // first tick fires immediately; we already sent one above
        loop {
            interval.tick().await;
            if let Err(e) = send_heartbeat(&client, &registry_url, &addr).await {
                tracing::warn!(registry = %registry_url, error = %e, "heartbeat failed");
            }
        }
    });
    Ok(())
}

async fn send_heartbeat(
    client: &reqwest::Client,
    registry_url: &str,
    addr: &str,
) -> Result<(), RegistryError> {
    tracing::debug!(addr, registry = registry_url, "sending heartbeat");
    client
        .post(registry_url)
        .header("X-Geerpc-Server", addr)
        .send()
        .await?;
    Ok(())
}
