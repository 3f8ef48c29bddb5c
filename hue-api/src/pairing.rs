//! Application key creation via the bridge's link button

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tokio::time::Instant;
use url::Url;

use crate::client::insecure_client;
use crate::error::{ApiError, Result};

/// Bridge error code for "link button not pressed"
const LINK_BUTTON_NOT_PRESSED: u32 = 101;

/// Credentials returned by a successful pairing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppKey {
    /// Sent as `hue-application-key` on every request
    pub username: String,
    pub client_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PairingResponse {
    success: Option<PairingSuccess>,
    error: Option<PairingError>,
}

#[derive(Debug, Deserialize)]
struct PairingSuccess {
    username: String,
    #[serde(default)]
    clientkey: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PairingError {
    #[serde(rename = "type")]
    kind: u32,
    #[serde(default)]
    description: String,
}

/// Settings for a pairing attempt
#[derive(Debug, Clone)]
pub struct PairingOptions {
    /// Shown in the bridge's app list, `app#device`
    pub device_type: String,
    /// Give up after this long
    pub timeout: Duration,
    /// Delay between attempts while waiting for the button
    pub retry_interval: Duration,
}

impl PairingOptions {
    pub fn new(app_name: &str, timeout: Duration) -> Self {
        Self {
            device_type: format!("{}#{}", app_name, device_name()),
            timeout,
            retry_interval: Duration::from_secs(1),
        }
    }
}

/// Create an application key on the bridge at `host`
///
/// Polls until the link button is pressed or `timeout` elapses.
pub async fn create_app_key(host: &str, app_name: &str, timeout: Duration) -> Result<AppKey> {
    let base_url = Url::parse(&format!("https://{}/", host))?;
    create_app_key_at(&base_url, &PairingOptions::new(app_name, timeout)).await
}

/// Same as [`create_app_key`] against an explicit base URL
pub async fn create_app_key_at(base_url: &Url, options: &PairingOptions) -> Result<AppKey> {
    let http = insecure_client()?;
    let url = base_url.join("api")?;
    let body = json!({"devicetype": options.device_type, "generateclientkey": true});
    let deadline = Instant::now() + options.timeout;

    tracing::info!(%url, "waiting for link button");

    while Instant::now() < deadline {
        match try_pair(&http, &url, &body).await {
            Ok(key) => {
                tracing::info!("pairing succeeded");
                return Ok(key);
            }
            Err(ApiError::LinkButtonNotPressed) => {
                tracing::debug!("link button not pressed yet");
            }
            Err(ApiError::NetworkError(e)) => {
                tracing::debug!("pairing request failed, retrying: {}", e);
            }
            Err(e) => return Err(e),
        }
        tokio::time::sleep(options.retry_interval).await;
    }

    Err(ApiError::PairingTimeout)
}

async fn try_pair(http: &reqwest::Client, url: &Url, body: &serde_json::Value) -> Result<AppKey> {
    let response = http.post(url.clone()).json(body).send().await?;
    let responses: Vec<PairingResponse> = response.json().await?;

    let first = responses
        .into_iter()
        .next()
        .ok_or(ApiError::LinkButtonNotPressed)?;

    if let Some(success) = first.success {
        return Ok(AppKey {
            username: success.username,
            client_key: success.clientkey,
        });
    }

    match first.error {
        Some(err) if err.kind == LINK_BUTTON_NOT_PRESSED => Err(ApiError::LinkButtonNotPressed),
        Some(err) => Err(ApiError::Bridge(format!("pairing error: {}", err.description))),
        None => Err(ApiError::LinkButtonNotPressed),
    }
}

fn device_name() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "terminal".to_string())
}
