//! Eviction Policy Module
//!
//! The closed set of eviction policies and the victim selection that each
//! one implies.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::{CacheMetrics, KeyOrder};
use crate::error::CacheError;
use crate::store::KeyTtl;

// == Eviction Policy ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Evict the key closest to expiry
    #[default]
    Ttl,
    /// Evict the least recently touched key, using remaining TTL as the
    /// recency proxy since every hit restarts the countdown
    Lru,
    /// Evict the most recently admitted key
    Lifo,
}

impl EvictionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionPolicy::Ttl => "ttl",
            EvictionPolicy::Lru => "lru",
            EvictionPolicy::Lifo => "lifo",
        }
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            EvictionPolicy::Ttl => 0,
            EvictionPolicy::Lru => 1,
            EvictionPolicy::Lifo => 2,
        }
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => EvictionPolicy::Lru,
            2 => EvictionPolicy::Lifo,
            _ => EvictionPolicy::Ttl,
        }
    }

    /// Parses `raw`, falling back to [`EvictionPolicy::Ttl`] on unknown input.
    ///
    /// The fallback is logged and counted in `metrics`.
    pub fn resolve(raw: &str, metrics: &CacheMetrics) -> Self {
        match raw.parse() {
            Ok(policy) => policy,
            Err(err) => {
                warn!("{}, falling back to ttl", err);
                metrics.record_policy_fallback();
                EvictionPolicy::Ttl
            }
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvictionPolicy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ttl" => Ok(EvictionPolicy::Ttl),
            "lru" => Ok(EvictionPolicy::Lru),
            "lifo" => Ok(EvictionPolicy::Lifo),
            other => Err(CacheError::PolicyUnknown(other.to_string())),
        }
    }
}

// == Victim Selection ==
/// A resident key and its remaining lifetime at selection time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub key: String,
    pub ttl: KeyTtl,
}

impl Candidate {
    pub fn new(key: impl Into<String>, ttl: KeyTtl) -> Self {
        Self {
            key: key.into(),
            ttl,
        }
    }

    /// Sort rank for expiry order; persistent keys rank last.
    fn expiry_rank(&self) -> Duration {
        match self.ttl {
            KeyTtl::Expires(remaining) => remaining,
            KeyTtl::Persistent | KeyTtl::Missing => Duration::MAX,
        }
    }
}

/// Picks the key to evict under `policy`.
///
/// `order` is the insertion order of admitted keys, consulted only by LIFO.
/// Returns None when no candidate is resident.
pub fn select_victim(
    policy: EvictionPolicy,
    candidates: &[Candidate],
    order: &KeyOrder,
) -> Option<String> {
    match policy {
        EvictionPolicy::Ttl | EvictionPolicy::Lru => soonest_to_expire(candidates),
        EvictionPolicy::Lifo => {
            newest_admitted(candidates, order).or_else(|| soonest_to_expire(candidates))
        }
    }
}

fn soonest_to_expire(candidates: &[Candidate]) -> Option<String> {
    candidates
        .iter()
        .filter(|c| c.ttl != KeyTtl::Missing)
        .min_by(|a, b| match a.expiry_rank().cmp(&b.expiry_rank()) {
            Ordering::Equal => a.key.cmp(&b.key),
            unequal => unequal,
        })
        .map(|c| c.key.clone())
}

fn newest_admitted(candidates: &[Candidate], order: &KeyOrder) -> Option<String> {
    order
        .iter_newest_first()
        .find(|key| {
            candidates
                .iter()
                .any(|c| &c.key == *key && c.ttl != KeyTtl::Missing)
        })
        .cloned()
}
