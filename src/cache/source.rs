//! Usage Source Module
//!
//! Where the poll task pulls usage signals from: the local reporter, or a
//! remote service exposing `GET /events-cache/keys`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cache::EvictionPolicy;
use crate::error::{CacheError, Result};

/// Keys touched since the last pull, with the policy they were reported under.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageBatch {
    pub keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<EvictionPolicy>,
}

/// A pollable supply of usage signals.
#[async_trait]
pub trait UsageSource: Send + Sync {
    /// Label used in logs.
    fn name(&self) -> &str;

    async fn pull(&self) -> Result<UsageBatch>;

    /// Takes back a pulled batch that could not be applied, so a later pull
    /// returns it again. Sources that cannot hold it drop it.
    async fn restore(&self, _batch: UsageBatch) {}
}

/// Pulls usage from a remote `/events-cache/keys` endpoint.
pub struct HttpUsageSource {
    client: reqwest::Client,
    url: String,
}

impl HttpUsageSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CacheError::Internal(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl UsageSource for HttpUsageSource {
    fn name(&self) -> &str {
        &self.url
    }

    async fn pull(&self) -> Result<UsageBatch> {
        let unavailable = |e: reqwest::Error| CacheError::StoreUnavailable(format!("{}: {}", self.url, e));

        self.client
            .get(&self.url)
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?
            .json::<UsageBatch>()
            .await
            .map_err(unavailable)
    }
}
