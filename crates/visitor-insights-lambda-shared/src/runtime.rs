//! Lambda runtime state shared across invocations.
//!
//! The handler configuration and the CloudWatch Logs client are created once at
//! cold start and reused by every invocation handled by the same execution
//! environment. Handlers receive the state by reference, so tests can build a
//! [`LambdaRuntime`] around a scripted query service instead of the global one.

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use tracing::{info, warn};

use crate::cloudwatch::CloudWatchLogsService;
use crate::config::HandlerConfig;
use crate::query::{Clock, LogQueryService, SystemClock};

/// Process-wide runtime state.
static RUNTIME: OnceLock<LambdaRuntime> = OnceLock::new();

/// Dependencies handed to the handler on every invocation.
#[derive(Clone)]
pub struct LambdaRuntime {
    config: HandlerConfig,
    log_queries: Arc<dyn LogQueryService>,
    clock: Arc<dyn Clock>,
}

impl LambdaRuntime {
    /// Assemble runtime state from explicit dependencies, using the system clock.
    pub fn new(config: HandlerConfig, log_queries: Arc<dyn LogQueryService>) -> Self {
        Self {
            config,
            log_queries,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used to anchor query windows.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Handler configuration.
    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Log query service used by the `waf` action.
    pub fn log_queries(&self) -> &dyn LogQueryService {
        self.log_queries.as_ref()
    }

    /// Wall clock.
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}

impl std::fmt::Debug for LambdaRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LambdaRuntime")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Initialize the process-wide runtime from the environment.
///
/// Reads [`HandlerConfig::from_env`] and binds a CloudWatch Logs client to the
/// configured region. Subsequent calls return the already-initialized state.
pub async fn init_runtime() -> &'static LambdaRuntime {
    if let Some(runtime) = RUNTIME.get() {
        return runtime;
    }

    let start = Instant::now();
    let config = HandlerConfig::from_env();

    if config.waf_log_group().is_none() {
        warn!("WAF_LOG_GROUP_NAME is not set; the waf action will report a configuration error");
    }

    let logs = CloudWatchLogsService::for_region(config.log_region.clone()).await;

    info!(
        log_region = %config.log_region,
        waf_log_group = config.waf_log_group().unwrap_or(""),
        edge_location = ?config.edge_location,
        poll_interval_ms = config.poll.interval.as_millis() as u64,
        max_poll_attempts = config.poll.max_attempts,
        init_ms = start.elapsed().as_millis() as u64,
        "Lambda runtime initialization complete"
    );

    RUNTIME.get_or_init(|| LambdaRuntime::new(config, Arc::new(logs)))
}
