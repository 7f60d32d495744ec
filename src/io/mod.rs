mod data_url;
mod http;
mod local;

pub use data_url::DataUrlResolver;
pub use http::HttpResolver;
pub use local::LocalFileResolver;

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::path::PathBuf;

/// Trait for turning an image handle into raw bytes
#[async_trait]
pub trait HandleResolver: Send + Sync {
    /// Resolve the handle to the bytes it refers to
    async fn resolve(&self, handle: &str) -> Result<Vec<u8>>;
}

/// Resolver that picks a backend from the handle's scheme.
///
/// - `data:` handles are decoded in-process
/// - `http://` and `https://` handles are fetched
/// - `blob:` handles are rejected; they only exist inside a browser
/// - anything else is read from the local filesystem
pub struct SchemeResolver {
    data: DataUrlResolver,
    http: HttpResolver,
    local: LocalFileResolver,
}

impl SchemeResolver {
    /// Relative file handles resolve against `root` when given.
    pub fn new(root: Option<PathBuf>) -> Result<Self> {
        Ok(Self {
            data: DataUrlResolver,
            http: HttpResolver::new()?,
            local: LocalFileResolver::new(root),
        })
    }

    pub fn http(&self) -> &HttpResolver {
        &self.http
    }
}

#[async_trait]
impl HandleResolver for SchemeResolver {
    async fn resolve(&self, handle: &str) -> Result<Vec<u8>> {
        let scheme = handle
            .split_once(':')
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .unwrap_or_default();

        match scheme.as_str() {
            "data" => self.data.resolve(handle).await,
            "http" | "https" => self.http.resolve(handle).await,
            "blob" => bail!("blob handles can only be resolved inside a browser"),
            _ => self.local.resolve(handle).await,
        }
    }
}
