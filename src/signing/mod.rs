// Object-storage URL signing interface. The real signer lives with the
// storage provider; this crate only holds (bucket, path) pairs and an
// injected, explicitly-invalidatable TTL cache in front of the signer.
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignError {
    #[error("signer unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait UrlSigner: Send + Sync {
    async fn sign_download(
        &self,
        bucket: &str,
        path: &str,
        ttl: Duration,
    ) -> Result<SignedUrl, SignError>;
}

/// Deterministic signer for tests and local development.
pub struct StaticSigner {
    pub base: String,
}

#[async_trait]
impl UrlSigner for StaticSigner {
    async fn sign_download(
        &self,
        bucket: &str,
        path: &str,
        ttl: Duration,
    ) -> Result<SignedUrl, SignError> {
        Ok(SignedUrl {
            url: format!("{}/{}/{}?sig=static", self.base, bucket, path),
            expires_at: Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default(),
        })
    }
}

/// TTL cache over a [`UrlSigner`]. Entries are evicted an expiry margin ahead
/// of their real deadline so a cached URL still has useful life when handed
/// out. Injected rather than global, so tests can pin time-free fakes.
pub struct SignedUrlCache {
    entries: Mutex<HashMap<(String, String), SignedUrl>>,
    expiry_margin: chrono::Duration,
}

impl SignedUrlCache {
    pub fn new(expiry_margin_secs: u64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            expiry_margin: chrono::Duration::seconds(expiry_margin_secs as i64),
        }
    }

    pub fn get(&self, bucket: &str, path: &str) -> Option<SignedUrl> {
        let mut entries = self.entries.lock().unwrap();
        let key = (bucket.to_string(), path.to_string());
        match entries.get(&key) {
            Some(entry) if entry.expires_at - self.expiry_margin > Utc::now() => {
                Some(entry.clone())
            }
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, bucket: &str, path: &str, signed: SignedUrl) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert((bucket.to_string(), path.to_string()), signed);
    }

    /// Explicit invalidation, e.g. after an object is replaced.
    pub fn invalidate(&self, bucket: &str, path: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(&(bucket.to_string(), path.to_string()));
    }

    /// Cache-through fetch.
    pub async fn sign_download(
        &self,
        signer: &dyn UrlSigner,
        bucket: &str,
        path: &str,
        ttl: Duration,
    ) -> Result<SignedUrl, SignError> {
        if let Some(hit) = self.get(bucket, path) {
            return Ok(hit);
        }
        let signed = signer.sign_download(bucket, path, ttl).await?;
        self.put(bucket, path, signed.clone());
        Ok(signed)
    }
}
