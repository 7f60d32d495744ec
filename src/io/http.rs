use async_trait::async_trait;
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::HandleResolver;
use anyhow::{Result, bail};

/// Fetches HTTP(S) handles with a single GET request
pub struct HttpResolver {
    client: Client,
    transferred_bytes: AtomicU64,
}

impl HttpResolver {
    pub fn new() -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self::from_client(client))
    }

    /// Use a preconfigured client (proxy, TLS roots, timeouts)
    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            transferred_bytes: AtomicU64::new(0),
        }
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl HandleResolver for HttpResolver {
    async fn resolve(&self, handle: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(handle).send().await?;

        if !resp.status().is_success() {
            bail!("HTTP request failed with status: {}", resp.status());
        }

        let bytes = resp.bytes().await?;
        self.transferred_bytes
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);

        Ok(bytes.to_vec())
    }
}
