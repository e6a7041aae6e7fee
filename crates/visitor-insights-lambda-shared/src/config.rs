//! Handler configuration read once at cold start.
//!
//! # Environment Variables
//!
//! - `WAF_LOG_GROUP_NAME`: CloudWatch log group holding the WAF logs (required by
//!   the `waf` action only)
//! - `WAF_LOG_REGION`: Region of the log group (default: `us-east-1`, where
//!   CloudFront-scoped WAF logs always live)
//! - `EDGE_LOCATION_STRATEGY`: `pop-header` (default) or `correlation-id-prefix`
//! - `WAF_POLL_INTERVAL_MS`: Delay before each query status poll (default: 1000)
//! - `WAF_MAX_POLL_ATTEMPTS`: Status polls allowed before giving up (default: 25)

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Region the CloudWatch Logs client is bound to unless overridden.
pub const DEFAULT_LOG_REGION: &str = "us-east-1";

/// How the edge location (POP) of a request is derived from its headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeLocationStrategy {
    /// Read the dedicated `x-amz-cf-pop` header.
    #[default]
    PopHeader,
    /// Take the prefix of `x-amz-cf-id` before its first hyphen.
    CorrelationIdPrefix,
}

impl EdgeLocationStrategy {
    /// Parse a strategy name, ignoring ASCII case and surrounding whitespace.
    /// Returns `None` for anything but `pop-header` or `correlation-id-prefix`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pop-header" => Some(Self::PopHeader),
            "correlation-id-prefix" => Some(Self::CorrelationIdPrefix),
            _ => None,
        }
    }
}

/// Bounds on the query status polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay before each status request.
    pub interval: Duration,
    /// Maximum number of status requests per query.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 25,
        }
    }
}

/// Configuration for the visitor insights handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    /// Log group queried by the `waf` action. `None` or blank means unconfigured.
    pub waf_log_group: Option<String>,
    /// Region of the WAF log group.
    pub log_region: String,
    /// Edge location derivation for the `location` action.
    pub edge_location: EdgeLocationStrategy,
    /// Polling bounds for the `waf` action.
    pub poll: PollPolicy,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            waf_log_group: None,
            log_region: DEFAULT_LOG_REGION.to_string(),
            edge_location: EdgeLocationStrategy::default(),
            poll: PollPolicy::default(),
        }
    }
}

impl HandlerConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// Unparseable values fall back to their defaults with a warning rather
    /// than failing the cold start.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let waf_log_group = lookup("WAF_LOG_GROUP_NAME").filter(|v| !v.trim().is_empty());

        let log_region = lookup("WAF_LOG_REGION")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.log_region);

        let edge_location = match lookup("EDGE_LOCATION_STRATEGY") {
            Some(raw) => EdgeLocationStrategy::parse(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "unrecognized EDGE_LOCATION_STRATEGY, using default");
                defaults.edge_location
            }),
            None => defaults.edge_location,
        };

        let interval = parse_or_default(&lookup, "WAF_POLL_INTERVAL_MS", 1000u64);
        let max_attempts = parse_or_default(&lookup, "WAF_MAX_POLL_ATTEMPTS", 25u32).max(1);

        Self {
            waf_log_group,
            log_region,
            edge_location,
            poll: PollPolicy {
                interval: Duration::from_millis(interval),
                max_attempts,
            },
        }
    }

    /// Set the WAF log group.
    pub fn with_waf_log_group(mut self, log_group: impl Into<String>) -> Self {
        self.waf_log_group = Some(log_group.into());
        self
    }

    /// Set the edge location strategy.
    pub fn with_edge_location(mut self, strategy: EdgeLocationStrategy) -> Self {
        self.edge_location = strategy;
        self
    }

    /// Set the polling bounds.
    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// The configured log group, if it is non-blank.
    pub fn waf_log_group(&self) -> Option<&str> {
        self.waf_log_group
            .as_deref()
            .filter(|group| !group.trim().is_empty())
    }
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "invalid numeric configuration, using default");
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_empty() {
        let config = HandlerConfig::from_lookup(lookup(&[]));
        assert_eq!(config, HandlerConfig::default());
        assert_eq!(config.log_region, "us-east-1");
        assert_eq!(config.edge_location, EdgeLocationStrategy::PopHeader);
        assert_eq!(config.poll.interval, Duration::from_secs(1));
        assert!(config.waf_log_group().is_none());
    }

    #[test]
    fn test_reads_all_values() {
        let config = HandlerConfig::from_lookup(lookup(&[
            ("WAF_LOG_GROUP_NAME", "aws-waf-logs-site"),
            ("WAF_LOG_REGION", "eu-west-1"),
            ("EDGE_LOCATION_STRATEGY", "correlation-id-prefix"),
            ("WAF_POLL_INTERVAL_MS", "250"),
            ("WAF_MAX_POLL_ATTEMPTS", "8"),
        ]));

        assert_eq!(config.waf_log_group(), Some("aws-waf-logs-site"));
        assert_eq!(config.log_region, "eu-west-1");
        assert_eq!(config.edge_location, EdgeLocationStrategy::CorrelationIdPrefix);
        assert_eq!(config.poll.interval, Duration::from_millis(250));
        assert_eq!(config.poll.max_attempts, 8);
    }

    #[test]
    fn test_blank_log_group_is_unconfigured() {
        let config = HandlerConfig::from_lookup(lookup(&[("WAF_LOG_GROUP_NAME", "   ")]));
        assert!(config.waf_log_group().is_none());

        let config = HandlerConfig::default().with_waf_log_group("");
        assert!(config.waf_log_group().is_none());
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = HandlerConfig::from_lookup(lookup(&[
            ("EDGE_LOCATION_STRATEGY", "guess"),
            ("WAF_POLL_INTERVAL_MS", "soon"),
            ("WAF_MAX_POLL_ATTEMPTS", "0"),
        ]));

        assert_eq!(config.edge_location, EdgeLocationStrategy::PopHeader);
        assert_eq!(config.poll.interval, Duration::from_secs(1));
        assert_eq!(config.poll.max_attempts, 1);
    }

    #[test]
    fn test_strategy_accepts_only_documented_names() {
        assert_eq!(
            EdgeLocationStrategy::parse(" POP-HEADER "),
            Some(EdgeLocationStrategy::PopHeader)
        );
        assert_eq!(
            EdgeLocationStrategy::parse("Correlation-Id-Prefix"),
            Some(EdgeLocationStrategy::CorrelationIdPrefix)
        );
        for value in ["header", "cf-id", "pop", "nope", ""] {
            assert_eq!(EdgeLocationStrategy::parse(value), None, "{value}");
        }
    }

    #[test]
    fn test_former_shorthand_falls_back_to_default() {
        let config = HandlerConfig::from_lookup(lookup(&[("EDGE_LOCATION_STRATEGY", "cf-id")]));
        assert_eq!(config.edge_location, EdgeLocationStrategy::PopHeader);
    }
}
