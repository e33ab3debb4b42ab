//! Recency Log Module
//!
//! Bounded, ordered record of recently touched keys. Once it reaches its
//! threshold the log hands a batch to the caller for delivery to the
//! capacity controller.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::KeyOrder;

/// What the recency log does when it reaches its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlushMode {
    /// Flush every key and start over empty
    #[default]
    Clear,
    /// Keep a sliding window of the newest keys, flushing a copy every threshold appends
    Slide,
}

impl FromStr for FlushMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clear" => Ok(FlushMode::Clear),
            "slide" => Ok(FlushMode::Slide),
            other => Err(format!("unknown flush mode: {}", other)),
        }
    }
}

// == Recency Log ==
/// Ordered log of at most `threshold` distinct keys.
#[derive(Debug)]
pub struct RecencyLog {
    keys: KeyOrder,
    threshold: usize,
    mode: FlushMode,
    /// Appends since the last flush (slide mode)
    since_flush: usize,
}

impl RecencyLog {
    /// Creates an empty log. A zero threshold is treated as one.
    pub fn new(threshold: usize, mode: FlushMode) -> Self {
        Self {
            keys: KeyOrder::new(),
            threshold: threshold.max(1),
            mode,
            since_flush: 0,
        }
    }

    // == Append ==
    /// Records `key` as newest. Returns a batch when the log flushes.
    ///
    /// Re-appending a key already in the log moves it rather than
    /// duplicating it.
    pub fn append(&mut self, key: &str) -> Option<Vec<String>> {
        self.keys.touch(key);
        self.since_flush += 1;

        match self.mode {
            FlushMode::Clear => {
                if self.keys.len() >= self.threshold {
                    self.since_flush = 0;
                    Some(self.keys.drain())
                } else {
                    None
                }
            }
            FlushMode::Slide => {
                while self.keys.len() > self.threshold {
                    self.keys.pop_oldest();
                }
                if self.since_flush >= self.threshold {
                    self.since_flush = 0;
                    Some(self.keys.to_vec())
                } else {
                    None
                }
            }
        }
    }

    /// Current keys, oldest first.
    pub fn snapshot(&self) -> Vec<String> {
        self.keys.to_vec()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("event:{}", i)).collect()
    }

    #[test]
    fn test_clear_mode_flushes_and_resets_at_threshold() {
        let mut log = RecencyLog::new(3, FlushMode::Clear);

        assert_eq!(log.append("event:0"), None);
        assert_eq!(log.append("event:1"), None);
        assert_eq!(log.append("event:2"), Some(keys(3)));

        assert!(log.is_empty());
    }

    #[test]
    fn test_clear_mode_duplicate_does_not_grow() {
        let mut log = RecencyLog::new(3, FlushMode::Clear);

        log.append("event:0");
        log.append("event:1");
        assert_eq!(log.append("event:0"), None);

        assert_eq!(log.snapshot(), vec!["event:1".to_string(), "event:0".to_string()]);
    }

    #[test]
    fn test_slide_mode_keeps_newest_window() {
        let mut log = RecencyLog::new(3, FlushMode::Slide);

        for key in keys(5) {
            log.append(&key);
            assert!(log.len() <= 3);
        }

        assert_eq!(log.snapshot(), keys(5)[2..].to_vec());
    }

    #[test]
    fn test_slide_mode_flushes_every_threshold_appends() {
        let mut log = RecencyLog::new(2, FlushMode::Slide);

        assert_eq!(log.append("event:0"), None);
        assert_eq!(log.append("event:1"), Some(keys(2)));
        assert_eq!(log.append("event:2"), None);
        assert_eq!(
            log.append("event:3"),
            Some(vec!["event:2".to_string(), "event:3".to_string()])
        );
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_zero_threshold_is_one() {
        let mut log = RecencyLog::new(0, FlushMode::Clear);
        assert_eq!(log.append("event:0"), Some(keys(1)));
        assert!(log.is_empty());
    }

    #[test]
    fn test_flush_mode_from_str() {
        assert_eq!("clear".parse::<FlushMode>(), Ok(FlushMode::Clear));
        assert_eq!("slide".parse::<FlushMode>(), Ok(FlushMode::Slide));
        assert!("ring".parse::<FlushMode>().is_err());
    }
}
